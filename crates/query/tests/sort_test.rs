#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Sort-clause visitor tests.
//!
//! Builder resolution caching and location context sensitivity.

use std::sync::Arc;

use trovato_query::{
    CriteriaConverter, Criterion, EngineConfig, QueryError, SortClause, SortClauseVisitor,
    SortDirection, schema,
};
use trovato_test_utils::{RecordingSortBuilder, assert, custom_sort};

fn default_visitor() -> SortClauseVisitor {
    SortClauseVisitor::with_default_builders(&EngineConfig::default())
}

#[test]
fn test_builder_resolved_once_per_kind() {
    let rating = RecordingSortBuilder::new("rating", "c.rating").shared();
    let mut visitor = default_visitor();
    visitor.register(rating.clone());
    let mut query = schema::content_query();

    visitor
        .build_query(&mut query, &custom_sort("rating", SortDirection::Desc))
        .unwrap();
    let probes_after_first = rating.probes();
    visitor
        .build_query(&mut query, &custom_sort("rating", SortDirection::Asc))
        .unwrap();

    assert_eq!(probes_after_first, 1);
    assert_eq!(rating.probes(), 1);
    assert::contains(&query.get_sql(), "ORDER BY c.rating DESC, c.rating ASC");
}

#[test]
fn test_custom_kinds_are_cached_by_name() {
    let rating = RecordingSortBuilder::new("rating", "c.rating").shared();
    let score = RecordingSortBuilder::new("score", "c.score").shared();
    let mut visitor = SortClauseVisitor::new(Vec::new());
    visitor.register(rating.clone());
    visitor.register(score.clone());
    let mut query = schema::content_query();

    visitor
        .visit_all(
            &mut query,
            &[
                custom_sort("rating", SortDirection::Asc),
                custom_sort("score", SortDirection::Asc),
                custom_sort("score", SortDirection::Desc),
            ],
        )
        .unwrap();

    assert_eq!(visitor.resolved_kinds(), 2);
    // rating: probed for rating and score; score: probed once for score.
    assert_eq!(rating.probes(), 2);
    assert_eq!(score.probes(), 1);
}

#[test]
fn test_unknown_sort_clause_fails() {
    let visitor = default_visitor();
    let mut query = schema::content_query();

    let err = visitor
        .build_query(&mut query, &custom_sort("rating", SortDirection::Asc))
        .unwrap_err();

    assert!(matches!(err, QueryError::NoHandler { ref kind, .. } if kind == "custom:rating"));
    assert_eq!(visitor.resolved_kinds(), 0);
}

#[test]
fn test_location_sort_in_location_context_adds_no_join() {
    let visitor = default_visitor();
    let mut query = schema::location_query().unwrap();
    let joins_before = query.joins().len();

    visitor
        .build_query(&mut query, &SortClause::LocationDepth(SortDirection::Asc))
        .unwrap();

    let sql = query.get_sql();
    assert_eq!(query.joins().len(), joins_before);
    assert::contains(&sql, "location.depth AS sort_column_location_depth");
    assert::contains(&sql, "ORDER BY sort_column_location_depth ASC");
    assert::not_contains(&sql, "sort_location");
}

#[test]
fn test_location_sort_in_content_context_adds_one_join() {
    let visitor = default_visitor();
    let mut query = schema::content_query();

    visitor
        .visit_all(
            &mut query,
            &[
                SortClause::LocationPriority(SortDirection::Desc),
                SortClause::LocationPriority(SortDirection::Desc),
            ],
        )
        .unwrap();

    let sql = query.get_sql();
    assert_eq!(query.joins().len(), 1);
    assert::occurrences(&sql, "INNER JOIN location sort_location", 1);
    assert::contains(
        &sql,
        "sort_location.priority AS sort_column_sort_location_priority",
    );
    assert::contains(
        &sql,
        "ORDER BY sort_column_sort_location_priority DESC, sort_column_sort_location_priority DESC",
    );
}

#[test]
fn test_location_sort_after_location_criterion_reuses_its_join() {
    let converter = CriteriaConverter::with_default_handlers();
    let visitor = default_visitor();
    let mut query = schema::content_query();

    converter
        .apply(&mut query, &Criterion::Subtree(vec!["/1/".to_string()]))
        .unwrap();
    visitor
        .build_query(&mut query, &SortClause::LocationPath(SortDirection::Asc))
        .unwrap();

    let sql = query.get_sql();
    assert_eq!(query.joins().len(), 1);
    assert::contains(&sql, "location.path_string AS sort_column_location_path_string");
}

#[test]
fn test_sort_location_alias_from_config() {
    let config = EngineConfig {
        sort_location_alias: "main_location".to_string(),
        sort_column_prefix: "s_".to_string(),
        ..EngineConfig::default()
    };
    let visitor = SortClauseVisitor::with_default_builders(&config);
    let mut query = schema::content_query();

    visitor
        .build_query(&mut query, &SortClause::LocationId(SortDirection::Asc))
        .unwrap();

    let sql = query.get_sql();
    assert::contains(&sql, "INNER JOIN location main_location");
    assert::contains(&sql, "main_location.node_id AS s_main_location_node_id");
}

#[test]
fn test_visitor_shared_between_threads() {
    let visitor = Arc::new(default_visitor());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let visitor = Arc::clone(&visitor);
            std::thread::spawn(move || {
                let clause = if i % 2 == 0 {
                    SortClause::ContentName(SortDirection::Asc)
                } else {
                    SortClause::LocationDepth(SortDirection::Desc)
                };
                let mut query = schema::content_query();
                visitor.build_query(&mut query, &clause).unwrap();
                query.get_sql()
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(visitor.resolved_kinds(), 2);
}
