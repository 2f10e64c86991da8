//! Join-aware query builder.
//!
//! Wraps a `SelectQuery` and owns the join bookkeeping for it. Handlers only
//! ever add joins through `join_once`, so two handlers needing the same table
//! share one physical join, and two handlers disagreeing about what an alias
//! means fail loudly instead of producing a wrong result set.

use crate::error::{QueryError, QueryResult};
use crate::sql::{FromSource, Join, JoinKind, ParameterValue, Parameters, SelectQuery, SqlExpression};

/// Query under construction, shared by the criteria converter and the
/// sort-clause visitor for exactly one query.
#[derive(Debug, Clone, Default)]
pub struct JoinAwareQueryBuilder {
    query: SelectQuery,
}

impl JoinAwareQueryBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing query. Joins already present count as registered.
    pub fn from_query(query: SelectQuery) -> Self {
        Self { query }
    }

    /// Add an `INNER JOIN table alias ON condition` attached to `from_alias`,
    /// unless the exact same join is already present.
    ///
    /// Fails with `JoinConflict` if `alias` is already in use with a
    /// different parent, table or condition (or names a FROM source), and
    /// with `UnknownAlias`
    /// if `from_alias` is not part of the query yet.
    pub fn join_once(
        &mut self,
        from_alias: &str,
        table: &str,
        alias: &str,
        condition: &str,
    ) -> QueryResult<&mut Self> {
        let existing = self
            .query
            .joins()
            .iter()
            .find(|j| j.alias == alias)
            .cloned();
        if let Some(existing) = existing {
            if existing.from_alias == from_alias
                && existing.table == table
                && existing.condition == condition
            {
                tracing::trace!(alias, table, "join already present");
                return Ok(self);
            }
            let (existing, requested) =
                if existing.from_alias == from_alias && existing.table == table {
                    (existing.condition, condition.to_string())
                } else {
                    (
                        describe_join(&existing.from_alias, &existing.table, &existing.condition),
                        describe_join(from_alias, table, condition),
                    )
                };
            tracing::warn!(
                alias,
                existing = %existing,
                requested = %requested,
                "conflicting join requested for alias"
            );
            return Err(QueryError::JoinConflict {
                alias: alias.to_string(),
                existing,
                requested,
            });
        }

        let shadowed = self
            .query
            .from_sources()
            .iter()
            .find(|f| f.reference() == alias)
            .map(|f| f.table.clone());
        if let Some(table) = shadowed {
            return Err(QueryError::JoinConflict {
                alias: alias.to_string(),
                existing: format!("FROM {table}"),
                requested: condition.to_string(),
            });
        }

        if !self.query.has_alias(from_alias) {
            return Err(QueryError::UnknownAlias {
                alias: from_alias.to_string(),
            });
        }

        tracing::debug!(from_alias, table, alias, "adding join");
        self.query.push_join(Join {
            kind: JoinKind::Inner,
            from_alias: from_alias.to_string(),
            table: table.to_string(),
            alias: alias.to_string(),
            condition: condition.to_string(),
        });
        Ok(self)
    }

    /// Whether the FROM or JOIN set already uses `alias`.
    pub fn has_alias(&self, alias: &str) -> bool {
        self.query.has_alias(alias)
    }

    /// FROM sources in insertion order.
    pub fn from_sources(&self) -> &[FromSource] {
        self.query.from_sources()
    }

    /// Joins registered so far.
    pub fn joins(&self) -> &[Join] {
        self.query.joins()
    }

    /// Replace the select list.
    pub fn select<S: Into<String>>(&mut self, columns: impl IntoIterator<Item = S>) -> &mut Self {
        self.query.select(columns);
        self
    }

    /// Append to the select list.
    pub fn add_select(&mut self, column: impl Into<String>) -> &mut Self {
        self.query.add_select(column);
        self
    }

    /// Add a FROM source.
    pub fn from(&mut self, table: &str, alias: Option<&str>) -> &mut Self {
        self.query.from(table, alias);
        self
    }

    /// Replace the WHERE clause.
    pub fn where_clause(&mut self, condition: SqlExpression) -> &mut Self {
        self.query.where_clause(condition);
        self
    }

    /// AND a condition into the WHERE clause.
    pub fn and_where(&mut self, condition: SqlExpression) -> &mut Self {
        self.query.and_where(condition);
        self
    }

    /// OR a condition into the WHERE clause.
    pub fn or_where(&mut self, condition: SqlExpression) -> &mut Self {
        self.query.or_where(condition);
        self
    }

    /// Replace the GROUP BY list.
    pub fn group_by<S: Into<String>>(&mut self, columns: impl IntoIterator<Item = S>) -> &mut Self {
        self.query.group_by(columns);
        self
    }

    /// Append to the GROUP BY list.
    pub fn add_group_by(&mut self, column: impl Into<String>) -> &mut Self {
        self.query.add_group_by(column);
        self
    }

    /// Replace the HAVING clause.
    pub fn having(&mut self, condition: SqlExpression) -> &mut Self {
        self.query.having(condition);
        self
    }

    /// Replace the ORDER BY list.
    pub fn order_by(&mut self, expression: &str, direction: &str) -> &mut Self {
        self.query.order_by(expression, direction);
        self
    }

    /// Append an ORDER BY entry.
    pub fn add_order_by(&mut self, expression: &str, direction: &str) -> &mut Self {
        self.query.add_order_by(expression, direction);
        self
    }

    /// Remove every ORDER BY entry.
    pub fn clear_order_by(&mut self) -> &mut Self {
        self.query.clear_order_by();
        self
    }

    /// Set the OFFSET.
    pub fn set_first_result(&mut self, first_result: u64) -> &mut Self {
        self.query.set_first_result(first_result);
        self
    }

    /// Set the LIMIT; `None` removes it.
    pub fn set_max_results(&mut self, max_results: Option<u64>) -> &mut Self {
        self.query.set_max_results(max_results);
        self
    }

    /// Bind a value to a named parameter.
    pub fn set_parameter(
        &mut self,
        name: impl Into<String>,
        value: impl Into<ParameterValue>,
    ) -> &mut Self {
        self.query.set_parameter(name, value);
        self
    }

    /// Replace all parameters.
    pub fn set_parameters(&mut self, parameters: Parameters) -> &mut Self {
        self.query.set_parameters(parameters);
        self
    }

    /// Bind a value under a generated name and return its placeholder.
    pub fn create_named_parameter(&mut self, value: impl Into<ParameterValue>) -> String {
        self.query.create_named_parameter(value)
    }

    /// Bound parameters.
    pub fn parameters(&self) -> &Parameters {
        self.query.parameters()
    }

    /// Render the statement.
    pub fn get_sql(&self) -> String {
        self.query.get_sql()
    }

    /// Borrow the underlying query.
    pub fn query(&self) -> &SelectQuery {
        &self.query
    }

    /// Unwrap into the underlying query.
    pub fn into_query(self) -> SelectQuery {
        self.query
    }
}

fn describe_join(from_alias: &str, table: &str, condition: &str) -> String {
    format!("{table} from {from_alias} ON {condition}")
}

#[cfg(test)]
// Tests are allowed to use unwrap/expect freely.
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn foo_query() -> JoinAwareQueryBuilder {
        let mut qb = JoinAwareQueryBuilder::new();
        qb.select(["f.id"]).from("foo", Some("f"));
        qb
    }

    #[test]
    fn join_once_is_idempotent() {
        let mut qb = foo_query();
        qb.join_once("f", "bar", "b", "f.id = b.foo_id").unwrap();
        qb.join_once("f", "bar", "b", "f.id = b.foo_id").unwrap();

        assert_eq!(qb.joins().len(), 1);
        assert_eq!(
            qb.get_sql(),
            "SELECT f.id FROM foo f INNER JOIN bar b ON f.id = b.foo_id"
        );
    }

    #[test]
    fn distinct_alias_is_an_independent_join() {
        let mut qb = foo_query();
        qb.join_once("f", "bar", "b", "f.id = b.foo_id").unwrap();
        qb.join_once("f", "bar", "b2", "f.id = b2.foo_id").unwrap();

        assert_eq!(qb.joins().len(), 2);
        assert_eq!(
            qb.get_sql(),
            "SELECT f.id FROM foo f INNER JOIN bar b ON f.id = b.foo_id \
             INNER JOIN bar b2 ON f.id = b2.foo_id"
        );
    }

    #[test]
    fn conflicting_condition_fails() {
        let mut qb = foo_query();
        qb.join_once("f", "bar", "b", "f.id = b.foo_id").unwrap();
        let err = qb.join_once("f", "bar", "b", "f.bar_id = b.id").unwrap_err();

        match err {
            QueryError::JoinConflict {
                alias,
                existing,
                requested,
            } => {
                assert_eq!(alias, "b");
                assert_eq!(existing, "f.id = b.foo_id");
                assert_eq!(requested, "f.bar_id = b.id");
            }
            other => panic!("expected JoinConflict, got {other:?}"),
        }
        assert_eq!(qb.joins().len(), 1);
    }

    #[test]
    fn same_alias_on_other_table_fails() {
        let mut qb = foo_query();
        qb.join_once("f", "bar", "b", "f.id = b.foo_id").unwrap();
        let err = qb.join_once("f", "baz", "b", "f.id = b.foo_id").unwrap_err();

        match err {
            QueryError::JoinConflict {
                alias,
                existing,
                requested,
            } => {
                assert_eq!(alias, "b");
                assert_eq!(existing, "bar from f ON f.id = b.foo_id");
                assert_eq!(requested, "baz from f ON f.id = b.foo_id");
            }
            other => panic!("expected JoinConflict, got {other:?}"),
        }
        assert_eq!(qb.joins().len(), 1);
    }

    #[test]
    fn alias_shadowing_from_source_fails() {
        let mut qb = foo_query();
        let err = qb.join_once("f", "bar", "f", "f.id = f.foo_id").unwrap_err();
        assert!(matches!(err, QueryError::JoinConflict { ref alias, .. } if alias == "f"));
    }

    #[test]
    fn unknown_from_alias_fails() {
        let mut qb = foo_query();
        let err = qb.join_once("x", "bar", "b", "x.id = b.x_id").unwrap_err();
        assert!(matches!(err, QueryError::UnknownAlias { ref alias } if alias == "x"));
        assert!(qb.joins().is_empty());
    }

    #[test]
    fn joins_can_chain_from_joined_alias() {
        let mut qb = foo_query();
        qb.join_once("f", "bar", "b", "f.id = b.foo_id")
            .unwrap()
            .join_once("b", "baz", "z", "b.id = z.bar_id")
            .unwrap();
        assert!(qb.has_alias("z"));
        assert!(qb.get_sql().ends_with("INNER JOIN baz z ON b.id = z.bar_id"));
    }

    #[test]
    fn wrapping_existing_query_keeps_its_joins() {
        let mut qb = foo_query();
        qb.join_once("f", "bar", "b", "f.id = b.foo_id").unwrap();
        let mut rewrapped = JoinAwareQueryBuilder::from_query(qb.into_query());
        rewrapped.join_once("f", "bar", "b", "f.id = b.foo_id").unwrap();
        assert_eq!(rewrapped.joins().len(), 1);
    }
}
