//! Sort clause AST.

use serde::{Deserialize, Serialize};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending order.
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

impl SortDirection {
    /// SQL keyword.
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// A sortable dimension and its direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortClause {
    ContentId(SortDirection),
    ContentName(SortDirection),
    DatePublished(SortDirection),
    DateModified(SortDirection),
    SectionId(SortDirection),
    LocationId(SortDirection),
    LocationPriority(SortDirection),
    LocationDepth(SortDirection),
    LocationPath(SortDirection),
    /// Dimension defined outside the kernel; sorted by whichever registered
    /// builder claims `name`.
    Custom {
        name: String,
        #[serde(default)]
        direction: SortDirection,
    },
}

/// Runtime type of a sort clause; the key of the visitor's builder cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SortClauseKind {
    ContentId,
    ContentName,
    DatePublished,
    DateModified,
    SectionId,
    LocationId,
    LocationPriority,
    LocationDepth,
    LocationPath,
    Custom(String),
}

impl std::fmt::Display for SortClauseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SortClauseKind::ContentId => "content_id",
            SortClauseKind::ContentName => "content_name",
            SortClauseKind::DatePublished => "date_published",
            SortClauseKind::DateModified => "date_modified",
            SortClauseKind::SectionId => "section_id",
            SortClauseKind::LocationId => "location_id",
            SortClauseKind::LocationPriority => "location_priority",
            SortClauseKind::LocationDepth => "location_depth",
            SortClauseKind::LocationPath => "location_path",
            SortClauseKind::Custom(name) => return write!(f, "custom:{name}"),
        };
        f.write_str(name)
    }
}

impl SortClause {
    /// Runtime type of this clause.
    pub fn kind(&self) -> SortClauseKind {
        match self {
            SortClause::ContentId(_) => SortClauseKind::ContentId,
            SortClause::ContentName(_) => SortClauseKind::ContentName,
            SortClause::DatePublished(_) => SortClauseKind::DatePublished,
            SortClause::DateModified(_) => SortClauseKind::DateModified,
            SortClause::SectionId(_) => SortClauseKind::SectionId,
            SortClause::LocationId(_) => SortClauseKind::LocationId,
            SortClause::LocationPriority(_) => SortClauseKind::LocationPriority,
            SortClause::LocationDepth(_) => SortClauseKind::LocationDepth,
            SortClause::LocationPath(_) => SortClauseKind::LocationPath,
            SortClause::Custom { name, .. } => SortClauseKind::Custom(name.clone()),
        }
    }

    /// Requested direction.
    pub fn direction(&self) -> SortDirection {
        match self {
            SortClause::ContentId(d)
            | SortClause::ContentName(d)
            | SortClause::DatePublished(d)
            | SortClause::DateModified(d)
            | SortClause::SectionId(d)
            | SortClause::LocationId(d)
            | SortClause::LocationPriority(d)
            | SortClause::LocationDepth(d)
            | SortClause::LocationPath(d) => *d,
            SortClause::Custom { direction, .. } => *direction,
        }
    }
}
