//! Built-in sort-clause builders.

use super::types::{SortClause, SortClauseKind, SortDirection};
use super::visitor::SortClauseQueryBuilder;
use crate::error::{QueryError, QueryResult};
use crate::query_builder::JoinAwareQueryBuilder;
use crate::schema::{CONTENT_ALIAS, LOCATION_ALIAS, LOCATION_TABLE, main_location_condition};

/// A column to sort on. The alias is chosen per query, never substituted
/// into rendered text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortColumn {
    pub table_alias: String,
    pub column: String,
}

impl SortColumn {
    pub fn new(table_alias: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table_alias: table_alias.into(),
            column: column.into(),
        }
    }

    /// `alias.column`.
    pub fn expression(&self) -> String {
        format!("{}.{}", self.table_alias, self.column)
    }

    /// SELECT alias: the expression with `.` replaced by `_`, prefixed.
    pub fn select_alias(&self, prefix: &str) -> String {
        format!("{prefix}{}_{}", self.table_alias, self.column)
    }
}

/// Append `SELECT <expr> AS <alias>` and `ORDER BY <alias> <direction>`.
pub fn apply_sort_column(
    query: &mut JoinAwareQueryBuilder,
    column: &SortColumn,
    prefix: &str,
    direction: SortDirection,
) {
    let alias = column.select_alias(prefix);
    query.add_select(format!("{} AS {alias}", column.expression()));
    query.add_order_by(&alias, direction.as_sql());
}

// ---------------------------------------------------------------------------
// Content columns
// ---------------------------------------------------------------------------

/// Sorts on a column of the content row, which every query root exposes as
/// `c`.
pub struct ContentColumnSortBuilder {
    kind: SortClauseKind,
    column: &'static str,
    prefix: String,
}

impl ContentColumnSortBuilder {
    fn new(kind: SortClauseKind, column: &'static str, prefix: &str) -> Self {
        Self {
            kind,
            column,
            prefix: prefix.to_string(),
        }
    }

    pub fn content_id(prefix: &str) -> Self {
        Self::new(SortClauseKind::ContentId, "id", prefix)
    }

    pub fn content_name(prefix: &str) -> Self {
        Self::new(SortClauseKind::ContentName, "name", prefix)
    }

    pub fn date_published(prefix: &str) -> Self {
        Self::new(SortClauseKind::DatePublished, "published", prefix)
    }

    pub fn date_modified(prefix: &str) -> Self {
        Self::new(SortClauseKind::DateModified, "modified", prefix)
    }

    pub fn section_id(prefix: &str) -> Self {
        Self::new(SortClauseKind::SectionId, "section_id", prefix)
    }
}

impl SortClauseQueryBuilder for ContentColumnSortBuilder {
    fn accepts(&self, clause: &SortClause) -> bool {
        clause.kind() == self.kind
    }

    fn build_query(
        &self,
        query: &mut JoinAwareQueryBuilder,
        clause: &SortClause,
    ) -> QueryResult<()> {
        let column = SortColumn::new(CONTENT_ALIAS, self.column);
        apply_sort_column(query, &column, &self.prefix, clause.direction());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "content_column_sort"
    }
}

// ---------------------------------------------------------------------------
// Location columns
// ---------------------------------------------------------------------------

/// Sorts on a location column.
///
/// In a location filtering context (the query already has the `location`
/// alias) the column is read from that alias. In a content context the
/// content's main location is joined under its own alias first, so sorting
/// never interferes with location joins added by criteria.
pub struct LocationSortBuilder {
    prefix: String,
    sort_location_alias: String,
}

impl LocationSortBuilder {
    pub fn new(prefix: &str, sort_location_alias: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            sort_location_alias: sort_location_alias.to_string(),
        }
    }

    fn column(clause: &SortClause) -> Option<&'static str> {
        match clause {
            SortClause::LocationId(_) => Some("node_id"),
            SortClause::LocationPriority(_) => Some("priority"),
            SortClause::LocationDepth(_) => Some("depth"),
            SortClause::LocationPath(_) => Some("path_string"),
            _ => None,
        }
    }

    fn location_alias(&self, query: &mut JoinAwareQueryBuilder) -> QueryResult<String> {
        if query.has_alias(LOCATION_ALIAS) {
            return Ok(LOCATION_ALIAS.to_string());
        }
        query.join_once(
            CONTENT_ALIAS,
            LOCATION_TABLE,
            &self.sort_location_alias,
            &main_location_condition(&self.sort_location_alias),
        )?;
        Ok(self.sort_location_alias.clone())
    }
}

impl SortClauseQueryBuilder for LocationSortBuilder {
    fn accepts(&self, clause: &SortClause) -> bool {
        Self::column(clause).is_some()
    }

    fn build_query(
        &self,
        query: &mut JoinAwareQueryBuilder,
        clause: &SortClause,
    ) -> QueryResult<()> {
        let column = Self::column(clause)
            .ok_or_else(|| QueryError::no_sort_clause_builder(clause.kind()))?;
        let alias = self.location_alias(query)?;
        apply_sort_column(
            query,
            &SortColumn::new(alias, column),
            &self.prefix,
            clause.direction(),
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "location_sort"
    }
}
