//! Bounded count queries.
//!
//! Answers "are there at least N matches" without counting every row: the
//! finished query is limited to N rows inside a sub-select and only those are
//! counted.

use crate::config::EngineConfig;
use crate::error::{QueryError, QueryResult};
use crate::query_builder::JoinAwareQueryBuilder;
use crate::sql::SelectQuery;

/// Wraps finished queries into `SELECT COUNT(1) FROM (...) <alias>`.
#[derive(Debug, Clone)]
pub struct BoundedCountWrapper {
    subquery_alias: String,
}

impl Default for BoundedCountWrapper {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl BoundedCountWrapper {
    /// Create a wrapper using the configured sub-select alias.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            subquery_alias: config.count_subquery_alias.clone(),
        }
    }

    /// Alias given to the wrapped sub-select.
    pub fn subquery_alias(&self) -> &str {
        &self.subquery_alias
    }

    /// Wrap `query` so it counts at most `limit` rows of `counted_field`.
    ///
    /// `None` means an exact count is wanted and `query` comes back
    /// untouched. A limit of zero or below is rejected with
    /// `InvalidArgument`; callers holding user input can check
    /// `limit > 0` up front.
    ///
    /// The inner select list is replaced by `counted_field` and its LIMIT by
    /// `limit`. The inner ORDER BY is dropped since it may name select
    /// aliases that no longer exist. Parameters move to the outer query
    /// unchanged.
    pub fn wrap(
        &self,
        query: JoinAwareQueryBuilder,
        counted_field: &str,
        limit: Option<i64>,
    ) -> QueryResult<JoinAwareQueryBuilder> {
        let Some(limit) = limit else {
            return Ok(query);
        };
        let bound = u64::try_from(limit)
            .ok()
            .filter(|bound| *bound > 0)
            .ok_or_else(|| {
                QueryError::invalid_argument(format!(
                    "count limit must be greater than zero, got {limit}"
                ))
            })?;

        tracing::debug!(
            counted_field,
            limit = bound,
            alias = %self.subquery_alias,
            "wrapping query in bounded count"
        );
        Ok(self.count_rows(query, counted_field, Some(bound)))
    }

    /// Wrap `query` into an exact `COUNT(1)` over `counted_field`.
    pub fn exact(&self, query: JoinAwareQueryBuilder, counted_field: &str) -> JoinAwareQueryBuilder {
        self.count_rows(query, counted_field, None)
    }

    fn count_rows(
        &self,
        query: JoinAwareQueryBuilder,
        counted_field: &str,
        bound: Option<u64>,
    ) -> JoinAwareQueryBuilder {
        let mut inner = query.into_query();
        inner.select([counted_field]).clear_order_by();
        if bound.is_some() {
            inner.set_max_results(bound);
        }

        let mut outer = SelectQuery::new();
        outer
            .select(["COUNT(1)"])
            .from(format!("({})", inner.get_sql()), Some(self.subquery_alias.as_str()))
            .set_parameters(inner.parameters().clone());
        JoinAwareQueryBuilder::from_query(outer)
    }
}
