//! Sort-clause visitor: dispatches each clause to the first registered
//! builder that accepts its kind, memoizing the resolution per kind.

use std::sync::Arc;

use dashmap::DashMap;

use super::builders::{ContentColumnSortBuilder, LocationSortBuilder};
use super::types::{SortClause, SortClauseKind};
use crate::config::EngineConfig;
use crate::error::{QueryError, QueryResult};
use crate::query_builder::JoinAwareQueryBuilder;

/// Adds the SELECT projection and ORDER BY entry for a subset of sort clauses.
///
/// `accepts` must depend only on the clause's kind, never on its direction
/// or other data: the visitor caches the answer per `SortClauseKind`.
pub trait SortClauseQueryBuilder: Send + Sync {
    /// Whether this builder handles `clause`.
    fn accepts(&self, clause: &SortClause) -> bool;

    /// Append the sort expression for `clause` to `query`.
    fn build_query(&self, query: &mut JoinAwareQueryBuilder, clause: &SortClause)
    -> QueryResult<()>;

    /// Name used in logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Ordered sort-clause builder registry with a per-kind resolution cache.
///
/// Build one visitor per registry and share it; the cache is what makes
/// sharing worthwhile. Concurrent first lookups of the same kind may both
/// scan the builders, and both store the same index.
pub struct SortClauseVisitor {
    builders: Vec<Arc<dyn SortClauseQueryBuilder>>,
    resolved: DashMap<SortClauseKind, usize>,
}

impl SortClauseVisitor {
    /// Create a visitor over an explicit, ordered builder list.
    pub fn new(builders: Vec<Arc<dyn SortClauseQueryBuilder>>) -> Self {
        Self {
            builders,
            resolved: DashMap::new(),
        }
    }

    /// Create a visitor with the built-in content and location builders.
    pub fn with_default_builders(config: &EngineConfig) -> Self {
        let prefix = config.sort_column_prefix.as_str();
        Self::new(vec![
            Arc::new(ContentColumnSortBuilder::content_id(prefix)),
            Arc::new(ContentColumnSortBuilder::content_name(prefix)),
            Arc::new(ContentColumnSortBuilder::date_published(prefix)),
            Arc::new(ContentColumnSortBuilder::date_modified(prefix)),
            Arc::new(ContentColumnSortBuilder::section_id(prefix)),
            Arc::new(LocationSortBuilder::new(
                prefix,
                &config.sort_location_alias,
            )),
        ])
    }

    /// Append a builder. It is probed after every builder already present.
    ///
    /// Clears the resolution cache: a kind that previously failed to resolve
    /// may now have a builder.
    pub fn register(&mut self, builder: Arc<dyn SortClauseQueryBuilder>) {
        self.builders.push(builder);
        self.resolved.clear();
    }

    /// Number of kinds resolved so far.
    pub fn resolved_kinds(&self) -> usize {
        self.resolved.len()
    }

    /// Apply one sort clause to `query`.
    ///
    /// Fails with `NoHandler` if no registered builder accepts the clause.
    pub fn build_query(
        &self,
        query: &mut JoinAwareQueryBuilder,
        clause: &SortClause,
    ) -> QueryResult<()> {
        let builder = self.resolve(clause)?;
        tracing::debug!(
            sort_clause = %clause.kind(),
            builder = builder.name(),
            direction = clause.direction().as_sql(),
            "applying sort clause"
        );
        builder.build_query(query, clause)
    }

    /// Apply sort clauses in order.
    pub fn visit_all(
        &self,
        query: &mut JoinAwareQueryBuilder,
        clauses: &[SortClause],
    ) -> QueryResult<()> {
        for clause in clauses {
            self.build_query(query, clause)?;
        }
        Ok(())
    }

    fn resolve(&self, clause: &SortClause) -> QueryResult<&Arc<dyn SortClauseQueryBuilder>> {
        let kind = clause.kind();
        // Copy the index out so no map guard is held while the builder runs.
        let cached = self.resolved.get(&kind).map(|entry| *entry.value());
        if let Some(builder) = cached.and_then(|index| self.builders.get(index)) {
            return Ok(builder);
        }

        let Some(index) = self.builders.iter().position(|b| b.accepts(clause)) else {
            tracing::error!(sort_clause = %kind, "no sort clause builder registered");
            return Err(QueryError::no_sort_clause_builder(kind));
        };
        self.resolved.insert(kind, index);
        self.builders
            .get(index)
            .ok_or_else(|| QueryError::no_sort_clause_builder(clause.kind()))
    }
}
