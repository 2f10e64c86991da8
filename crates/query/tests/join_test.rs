#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Join-once bookkeeping tests.

use trovato_query::QueryError;
use trovato_test_utils::{assert, foo_query};

#[test]
fn test_identical_join_added_once() {
    let mut query = foo_query();
    query.join_once("f", "bar", "b", "f.id = b.foo_id").unwrap();
    query.join_once("f", "bar", "b", "f.id = b.foo_id").unwrap();

    let sql = query.get_sql();
    assert::occurrences(&sql, "INNER JOIN bar b ON f.id = b.foo_id", 1);
    assert_eq!(sql, "SELECT f.id FROM foo f INNER JOIN bar b ON f.id = b.foo_id");
}

#[test]
fn test_distinct_alias_is_independent_join() {
    let mut query = foo_query();
    query.join_once("f", "bar", "b", "f.id = b.foo_id").unwrap();
    query.join_once("f", "bar", "b2", "f.id = b2.foo_id").unwrap();

    assert_eq!(query.joins().len(), 2);
    assert_eq!(
        query.get_sql(),
        "SELECT f.id FROM foo f INNER JOIN bar b ON f.id = b.foo_id \
         INNER JOIN bar b2 ON f.id = b2.foo_id"
    );
}

#[test]
fn test_conflicting_condition_rejected() {
    let mut query = foo_query();
    query.join_once("f", "bar", "b", "f.id = b.foo_id").unwrap();

    let err = query.join_once("f", "bar", "b", "f.bar_id = b.id").unwrap_err();

    let message = err.to_string();
    assert!(message.contains("'b'"));
    assert!(message.contains("f.id = b.foo_id"));
    assert!(message.contains("f.bar_id = b.id"));
    assert!(matches!(err, QueryError::JoinConflict { .. }));
    assert_eq!(query.joins().len(), 1);
}

#[test]
fn test_same_alias_with_other_table_rejected() {
    let mut query = foo_query();
    query.join_once("f", "bar", "b", "f.id = b.foo_id").unwrap();

    let err = query.join_once("f", "baz", "b", "f.id = b.foo_id").unwrap_err();

    assert!(matches!(err, QueryError::JoinConflict { ref alias, .. } if alias == "b"));
    assert!(err.to_string().contains("baz"));
    assert_eq!(query.joins().len(), 1);
    assert_eq!(query.joins()[0].table, "bar");
}

#[test]
fn test_join_from_unknown_alias_rejected() {
    let mut query = foo_query();
    let err = query.join_once("x", "bar", "b", "x.id = b.x_id").unwrap_err();
    assert!(matches!(err, QueryError::UnknownAlias { ref alias } if alias == "x"));
}
