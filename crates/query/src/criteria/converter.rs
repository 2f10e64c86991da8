//! Criteria converter: dispatches a criterion to the first registered
//! handler that accepts it.

use std::sync::Arc;

use super::handlers;
use super::types::Criterion;
use crate::error::{QueryError, QueryResult};
use crate::query_builder::JoinAwareQueryBuilder;
use crate::sql::SqlExpression;

/// Compiles a subset of criteria into SQL boolean fragments.
///
/// Handlers are probed in registration order and the first one whose
/// `accepts` returns true wins, so a handler must not accept anything a
/// more specific handler registered after it is meant to compile.
pub trait CriterionHandler: Send + Sync {
    /// Whether this handler compiles `criterion`.
    fn accepts(&self, criterion: &Criterion) -> bool;

    /// Compile `criterion`, adding any joins it needs through
    /// `JoinAwareQueryBuilder::join_once` and recursing into children
    /// through `converter`.
    fn handle(
        &self,
        converter: &CriteriaConverter,
        query: &mut JoinAwareQueryBuilder,
        criterion: &Criterion,
    ) -> QueryResult<SqlExpression>;

    /// Name used in logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Ordered criterion handler registry.
pub struct CriteriaConverter {
    handlers: Vec<Arc<dyn CriterionHandler>>,
}

impl Default for CriteriaConverter {
    fn default() -> Self {
        Self::with_default_handlers()
    }
}

impl CriteriaConverter {
    /// Create a converter over an explicit, ordered handler list.
    pub fn new(handlers: Vec<Arc<dyn CriterionHandler>>) -> Self {
        Self { handlers }
    }

    /// Create a converter with the built-in handlers: composites first,
    /// then content leaves, then location leaves.
    pub fn with_default_handlers() -> Self {
        Self::new(vec![
            Arc::new(handlers::LogicalAndHandler),
            Arc::new(handlers::LogicalOrHandler),
            Arc::new(handlers::LogicalNotHandler),
            Arc::new(handlers::MatchAllHandler),
            Arc::new(handlers::MatchNoneHandler),
            Arc::new(handlers::ContentColumnInHandler::content_id()),
            Arc::new(handlers::ContentColumnInHandler::content_type_id()),
            Arc::new(handlers::ContentColumnInHandler::section_id()),
            Arc::new(handlers::DateMetadataHandler),
            Arc::new(handlers::LocationColumnInHandler::location_id()),
            Arc::new(handlers::LocationColumnInHandler::parent_location_id()),
            Arc::new(handlers::SubtreeHandler),
            Arc::new(handlers::VisibilityHandler),
        ])
    }

    /// Append a handler. It is probed after every handler already present.
    pub fn register(&mut self, handler: Arc<dyn CriterionHandler>) {
        self.handlers.push(handler);
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Compile `criterion` into a boolean SQL fragment.
    ///
    /// Fails with `NoHandler` if no registered handler accepts it or any of
    /// its children. On any error the query is restored to its state before
    /// the call, so joins and parameters added by siblings that compiled
    /// first do not leak.
    pub fn convert(
        &self,
        query: &mut JoinAwareQueryBuilder,
        criterion: &Criterion,
    ) -> QueryResult<SqlExpression> {
        let snapshot = query.clone();
        self.dispatch(query, criterion).inspect_err(|_| {
            *query = snapshot;
        })
    }

    fn dispatch(
        &self,
        query: &mut JoinAwareQueryBuilder,
        criterion: &Criterion,
    ) -> QueryResult<SqlExpression> {
        let Some(handler) = self.handlers.iter().find(|h| h.accepts(criterion)) else {
            let kind = criterion.kind();
            tracing::error!(criterion = %kind, "no criterion handler registered");
            return Err(QueryError::no_criterion_handler(kind));
        };

        tracing::debug!(
            criterion = %criterion.kind(),
            handler = handler.name(),
            "converting criterion"
        );
        handler.handle(self, query, criterion)
    }

    /// Compile `criterion` and AND it into the query's WHERE clause.
    pub fn apply(
        &self,
        query: &mut JoinAwareQueryBuilder,
        criterion: &Criterion,
    ) -> QueryResult<()> {
        let expression = self.convert(query, criterion)?;
        query.and_where(expression);
        Ok(())
    }
}
