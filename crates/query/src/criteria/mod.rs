//! Criterion compilation.
//!
//! This module provides:
//! - Criterion: the filter AST callers build
//! - CriterionHandler: the `{accepts, handle}` capability handlers implement
//! - CriteriaConverter: ordered first-match dispatch over handlers
//! - handlers: the built-in content and location handlers

mod converter;
pub mod handlers;
mod types;

pub use converter::{CriteriaConverter, CriterionHandler};
pub use types::{Criterion, CriterionKind, DateTarget, Operator};
