//! One-shot compilation of a query request.
//!
//! Ties the criteria converter, the sort-clause visitor and the bounded-count
//! wrapper together for callers that hold a whole request at once, such as
//! the `trovato-query` binary. Build one `QueryCompiler` and share it; each
//! `compile` call gets a fresh query builder.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::count::BoundedCountWrapper;
use crate::criteria::{CriteriaConverter, Criterion};
use crate::error::{QueryError, QueryResult};
use crate::query_builder::JoinAwareQueryBuilder;
use crate::schema;
use crate::sort::{SortClause, SortClauseVisitor};

/// Table a search starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryRoot {
    /// `content c`: one row per content object.
    #[default]
    Content,
    /// `location location`: one row per tree node.
    Location,
}

impl FromStr for QueryRoot {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "content" => Ok(QueryRoot::Content),
            "location" => Ok(QueryRoot::Location),
            other => Err(QueryError::invalid_argument(format!(
                "unknown query root '{other}', expected 'content' or 'location'"
            ))),
        }
    }
}

/// A search: filter, ordering and paging.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Filter; `None` matches everything.
    #[serde(default)]
    pub criterion: Option<Criterion>,
    /// Sort clauses, most significant first.
    #[serde(default)]
    pub sort_clauses: Vec<SortClause>,
    /// Maximum rows to return.
    #[serde(default)]
    pub limit: Option<u64>,
    /// Rows to skip.
    #[serde(default)]
    pub offset: u64,
}

/// Shared registries plus the count wrapper.
pub struct QueryCompiler {
    converter: CriteriaConverter,
    visitor: SortClauseVisitor,
    counter: BoundedCountWrapper,
}

impl QueryCompiler {
    /// Create a compiler from explicit registries.
    pub fn new(
        converter: CriteriaConverter,
        visitor: SortClauseVisitor,
        counter: BoundedCountWrapper,
    ) -> Self {
        Self {
            converter,
            visitor,
            counter,
        }
    }

    /// Create a compiler with every built-in handler and builder.
    pub fn with_defaults(config: &EngineConfig) -> Self {
        Self::new(
            CriteriaConverter::with_default_handlers(),
            SortClauseVisitor::with_default_builders(config),
            BoundedCountWrapper::new(config),
        )
    }

    /// Criterion handler registry.
    pub fn converter(&self) -> &CriteriaConverter {
        &self.converter
    }

    /// Sort-clause builder registry.
    pub fn visitor(&self) -> &SortClauseVisitor {
        &self.visitor
    }

    /// Compile `request` into a query rooted at `root`.
    pub fn compile(
        &self,
        root: QueryRoot,
        request: &QueryRequest,
    ) -> QueryResult<JoinAwareQueryBuilder> {
        let mut query = match root {
            QueryRoot::Content => schema::content_query(),
            QueryRoot::Location => schema::location_query()?,
        };

        if let Some(criterion) = &request.criterion {
            self.converter.apply(&mut query, criterion)?;
        }
        self.visitor.visit_all(&mut query, &request.sort_clauses)?;
        query
            .set_max_results(request.limit)
            .set_first_result(request.offset);

        tracing::debug!(
            ?root,
            joins = query.joins().len(),
            parameters = query.parameters().len(),
            "compiled query"
        );
        Ok(query)
    }

    /// Compile `request` as a count of at most `limit` matches.
    ///
    /// Sorting and paging do not change a count, so they are skipped.
    pub fn compile_count(
        &self,
        root: QueryRoot,
        request: &QueryRequest,
        limit: Option<i64>,
    ) -> QueryResult<JoinAwareQueryBuilder> {
        let filter_only = QueryRequest {
            criterion: request.criterion.clone(),
            ..QueryRequest::default()
        };
        let query = self.compile(root, &filter_only)?;
        let counted_field = match root {
            QueryRoot::Content => "DISTINCT c.id",
            QueryRoot::Location => "location.node_id",
        };
        match limit {
            Some(_) => self.counter.wrap(query, counted_field, limit),
            None => Ok(self.counter.exact(query, counted_field)),
        }
    }
}
