//! Trovato criterion compiler
//!
//! Turns a tree of filter criteria and a list of sort clauses into one SQL
//! query, keeping every join unique per alias. Compilation is synchronous
//! and performs no I/O; `executor` runs the result when a database is at
//! hand. The `trovato-query` binary wraps all of it for the command line.

pub mod compiler;
pub mod config;
pub mod count;
pub mod criteria;
pub mod error;
pub mod executor;
pub mod query_builder;
pub mod schema;
pub mod sort;
pub mod sql;

pub use compiler::{QueryCompiler, QueryRequest, QueryRoot};
pub use config::EngineConfig;
pub use count::BoundedCountWrapper;
pub use criteria::{CriteriaConverter, Criterion, CriterionHandler};
pub use error::{QueryError, QueryResult};
pub use query_builder::JoinAwareQueryBuilder;
pub use sort::{SortClause, SortClauseQueryBuilder, SortClauseVisitor, SortDirection};
pub use sql::SqlExpression;
