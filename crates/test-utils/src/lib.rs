//! Trovato test utilities.
//!
//! Helpers for integration testing the criterion compiler: query starters,
//! recording handlers and sort builders that count how often the dispatchers
//! probe them, and assertion utilities for generated SQL.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use trovato_query::criteria::CriterionKind;
use trovato_query::sort::SortClauseKind;
use trovato_query::sql::{ParameterValue, SqlExpression};
use trovato_query::{
    CriteriaConverter, Criterion, CriterionHandler, JoinAwareQueryBuilder, QueryResult,
    SortClause, SortClauseQueryBuilder, SortDirection,
};

/// `SELECT f.id FROM foo f`.
pub fn foo_query() -> JoinAwareQueryBuilder {
    let mut query = JoinAwareQueryBuilder::new();
    query.select(["f.id"]).from("foo", Some("f"));
    query
}

/// `SELECT DISTINCT someField FROM someTable WHERE someCondition = :condition`,
/// with `condition` bound.
pub fn some_query() -> JoinAwareQueryBuilder {
    let mut query = JoinAwareQueryBuilder::new();
    query
        .select(["DISTINCT someField"])
        .from("someTable", None)
        .where_clause(SqlExpression::raw("someCondition = :condition"))
        .set_parameter("condition", "someValue");
    query
}

/// A custom criterion named `name`.
pub fn custom(name: &str) -> Criterion {
    Criterion::Custom {
        name: name.to_string(),
        value: ParameterValue::Boolean(true),
    }
}

/// A custom sort clause named `name`.
pub fn custom_sort(name: &str, direction: SortDirection) -> SortClause {
    SortClause::Custom {
        name: name.to_string(),
        direction,
    }
}

/// Criterion handler that claims one custom criterion name and returns a
/// fixed fragment, optionally after joining a table.
#[derive(Debug)]
pub struct RecordingHandler {
    name: String,
    fragment: String,
    join: Option<JoinSpec>,
    calls: AtomicUsize,
}

/// Join a `RecordingHandler` requests before returning its fragment.
#[derive(Debug, Clone)]
pub struct JoinSpec {
    pub from_alias: String,
    pub table: String,
    pub alias: String,
    pub condition: String,
}

impl RecordingHandler {
    /// Claim `custom(name)` and compile it to `fragment`.
    pub fn new(name: &str, fragment: &str) -> Self {
        Self {
            name: name.to_string(),
            fragment: fragment.to_string(),
            join: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Join `table alias ON condition` from `from_alias` on every call.
    pub fn with_join(mut self, from_alias: &str, table: &str, alias: &str, condition: &str) -> Self {
        self.join = Some(JoinSpec {
            from_alias: from_alias.to_string(),
            table: table.to_string(),
            alias: alias.to_string(),
            condition: condition.to_string(),
        });
        self
    }

    /// Share it with a converter.
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// How many times `handle` ran.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CriterionHandler for RecordingHandler {
    fn accepts(&self, criterion: &Criterion) -> bool {
        criterion.kind() == CriterionKind::Custom(self.name.clone())
    }

    fn handle(
        &self,
        _converter: &CriteriaConverter,
        query: &mut JoinAwareQueryBuilder,
        _criterion: &Criterion,
    ) -> QueryResult<SqlExpression> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(join) = &self.join {
            query.join_once(&join.from_alias, &join.table, &join.alias, &join.condition)?;
        }
        Ok(SqlExpression::raw(self.fragment.clone()))
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// Sort builder that claims one custom sort name, orders by a fixed
/// expression and counts how often it is probed.
#[derive(Debug)]
pub struct RecordingSortBuilder {
    kind: SortClauseKind,
    expression: String,
    probes: AtomicUsize,
}

impl RecordingSortBuilder {
    /// Claim `custom_sort(name, _)` and order by `expression`.
    pub fn new(name: &str, expression: &str) -> Self {
        Self {
            kind: SortClauseKind::Custom(name.to_string()),
            expression: expression.to_string(),
            probes: AtomicUsize::new(0),
        }
    }

    /// Share it with a visitor.
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// How many times `accepts` ran.
    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

impl SortClauseQueryBuilder for RecordingSortBuilder {
    fn accepts(&self, clause: &SortClause) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        clause.kind() == self.kind
    }

    fn build_query(&self, query: &mut JoinAwareQueryBuilder, clause: &SortClause) -> QueryResult<()> {
        query.add_order_by(&self.expression, clause.direction().as_sql());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording_sort"
    }
}

/// Assertion helpers for generated SQL.
pub mod assert {
    /// Assert that a string contains a substring.
    pub fn contains(haystack: &str, needle: &str) {
        assert!(
            haystack.contains(needle),
            "Expected SQL to contain '{needle}'\nActual: {haystack}"
        );
    }

    /// Assert that a string does not contain a substring.
    pub fn not_contains(haystack: &str, needle: &str) {
        assert!(
            !haystack.contains(needle),
            "Expected SQL to NOT contain '{needle}'\nActual: {haystack}"
        );
    }

    /// Assert that `needle` occurs exactly `expected` times.
    pub fn occurrences(haystack: &str, needle: &str, expected: usize) {
        let actual = haystack.matches(needle).count();
        assert_eq!(
            actual, expected,
            "Expected '{needle}' {expected} time(s), found {actual}\nActual: {haystack}"
        );
    }
}

#[cfg(test)]
// Tests are allowed to use unwrap/expect freely.
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn recording_handler_claims_its_name_only() {
        let handler = RecordingHandler::new("foo", "fooExpr");
        assert!(handler.accepts(&custom("foo")));
        assert!(!handler.accepts(&custom("bar")));
        assert!(!handler.accepts(&Criterion::MatchAll));
    }

    #[test]
    fn recording_handler_joins_and_counts() {
        let handler = RecordingHandler::new("foo", "fooExpr")
            .with_join("f", "bar", "b", "f.id = b.foo_id");
        let converter = CriteriaConverter::new(vec![]);
        let mut query = foo_query();

        let expr = handler.handle(&converter, &mut query, &custom("foo")).unwrap();

        assert_eq!(expr.as_str(), "fooExpr");
        assert_eq!(handler.calls(), 1);
        assert_eq!(
            query.get_sql(),
            "SELECT f.id FROM foo f INNER JOIN bar b ON f.id = b.foo_id"
        );
    }

    #[test]
    fn recording_sort_builder_counts_probes() {
        let builder = RecordingSortBuilder::new("rating", "f.rating");
        assert!(builder.accepts(&custom_sort("rating", SortDirection::Asc)));
        assert!(!builder.accepts(&SortClause::ContentId(SortDirection::Asc)));
        assert_eq!(builder.probes(), 2);
    }

    #[test]
    fn sql_assertions() {
        let sql = some_query().get_sql();
        assert::contains(&sql, "someCondition = :condition");
        assert::not_contains(&sql, "LIMIT");
        assert::occurrences(&sql, "someField", 1);
    }
}
