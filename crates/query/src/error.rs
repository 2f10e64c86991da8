//! Query compilation error types.
//!
//! Every variant is fatal for the query being compiled. Nothing here is
//! retried or downgraded to a default fragment.

use thiserror::Error;

/// What kind of input a dispatcher failed to find a handler for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerTarget {
    /// A filter criterion given to the criteria converter.
    Criterion,
    /// A sort clause given to the sort-clause visitor.
    SortClause,
}

impl std::fmt::Display for HandlerTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HandlerTarget::Criterion => f.write_str("criterion"),
            HandlerTarget::SortClause => f.write_str("sort clause"),
        }
    }
}

/// Errors raised while compiling or executing a query.
#[derive(Debug, Error)]
pub enum QueryError {
    /// No registered handler claims the input. Always a registration defect.
    #[error("no handler registered for {target} '{kind}'")]
    NoHandler { target: HandlerTarget, kind: String },

    /// The same join alias was requested for two different joins.
    #[error(
        "join alias '{alias}' is already joined on '{existing}', cannot join it again on '{requested}'"
    )]
    JoinConflict {
        alias: String,
        existing: String,
        requested: String,
    },

    /// A join was attached to an alias that is not part of any FROM or JOIN.
    #[error("alias '{alias}' is not part of any FROM or JOIN clause")]
    UnknownAlias { alias: String },

    /// A caller-supplied value is out of range or malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The database driver failed while executing a compiled query.
    #[error("database error")]
    Database(#[from] sqlx::Error),
}

impl QueryError {
    /// Create a missing criterion handler error.
    pub fn no_criterion_handler(kind: impl std::fmt::Display) -> Self {
        Self::NoHandler {
            target: HandlerTarget::Criterion,
            kind: kind.to_string(),
        }
    }

    /// Create a missing sort-clause builder error.
    pub fn no_sort_clause_builder(kind: impl std::fmt::Display) -> Self {
        Self::NoHandler {
            target: HandlerTarget::SortClause,
            kind: kind.to_string(),
        }
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

/// Result type alias using QueryError.
pub type QueryResult<T> = Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_conflict_names_both_conditions() {
        let err = QueryError::JoinConflict {
            alias: "b".to_string(),
            existing: "f.id = b.foo_id".to_string(),
            requested: "f.bar_id = b.id".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("'b'"));
        assert!(msg.contains("f.id = b.foo_id"));
        assert!(msg.contains("f.bar_id = b.id"));
    }

    #[test]
    fn no_handler_mentions_target_and_kind() {
        let msg = QueryError::no_sort_clause_builder("location_depth").to_string();
        assert_eq!(msg, "no handler registered for sort clause 'location_depth'");

        let msg = QueryError::no_criterion_handler("custom:geo").to_string();
        assert!(msg.contains("criterion 'custom:geo'"));
    }
}
