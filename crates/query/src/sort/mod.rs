//! Sort clause compilation.
//!
//! Each sort clause becomes a SELECT projection plus an ORDER BY entry on
//! the query. Builders are chosen by `SortClauseVisitor`, which remembers
//! the builder it picked for every clause kind.

pub mod builders;
mod types;
mod visitor;

pub use builders::{ContentColumnSortBuilder, LocationSortBuilder, SortColumn};
pub use types::{SortClause, SortClauseKind, SortDirection};
pub use visitor::{SortClauseQueryBuilder, SortClauseVisitor};
