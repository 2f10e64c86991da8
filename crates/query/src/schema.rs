//! Table and alias names of the content repository schema, plus the two
//! query roots searches start from.
//!
//! Content search is rooted at `content c`; location search is rooted at
//! `location location` with the content row joined as `c`, so every handler
//! can reference content columns through `c` in both contexts.

use crate::error::QueryResult;
use crate::query_builder::JoinAwareQueryBuilder;

/// Content object table.
pub const CONTENT_TABLE: &str = "content";
/// Alias of the content table in every query.
pub const CONTENT_ALIAS: &str = "c";
/// Location (tree node) table.
pub const LOCATION_TABLE: &str = "location";
/// Alias that marks a location filtering context.
pub const LOCATION_ALIAS: &str = "location";

/// Join condition attaching the location alias to a content row (any of
/// its locations).
pub fn content_location_condition(location_alias: &str) -> String {
    format!("{location_alias}.content_id = {CONTENT_ALIAS}.id")
}

/// Join condition attaching a location alias to the content's main location.
pub fn main_location_condition(location_alias: &str) -> String {
    format!(
        "{location_alias}.content_id = {CONTENT_ALIAS}.id AND {location_alias}.node_id = {location_alias}.main_node_id"
    )
}

/// `SELECT DISTINCT c.id FROM content c`.
pub fn content_query() -> JoinAwareQueryBuilder {
    let mut query = JoinAwareQueryBuilder::new();
    query
        .select([format!("DISTINCT {CONTENT_ALIAS}.id")])
        .from(CONTENT_TABLE, Some(CONTENT_ALIAS));
    query
}

/// `SELECT location.node_id, location.content_id FROM location location
/// INNER JOIN content c ON c.id = location.content_id`.
pub fn location_query() -> QueryResult<JoinAwareQueryBuilder> {
    let mut query = JoinAwareQueryBuilder::new();
    query
        .select([
            format!("{LOCATION_ALIAS}.node_id"),
            format!("{LOCATION_ALIAS}.content_id"),
        ])
        .from(LOCATION_TABLE, Some(LOCATION_ALIAS));
    query.join_once(
        LOCATION_ALIAS,
        CONTENT_TABLE,
        CONTENT_ALIAS,
        &format!("{CONTENT_ALIAS}.id = {LOCATION_ALIAS}.content_id"),
    )?;
    Ok(query)
}

#[cfg(test)]
// Tests are allowed to use unwrap/expect freely.
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn content_root() {
        let query = content_query();
        assert_eq!(query.get_sql(), "SELECT DISTINCT c.id FROM content c");
        assert!(!query.has_alias(LOCATION_ALIAS));
    }

    #[test]
    fn location_root_joins_content() {
        let query = location_query().unwrap();
        assert_eq!(
            query.get_sql(),
            "SELECT location.node_id, location.content_id FROM location location \
             INNER JOIN content c ON c.id = location.content_id"
        );
        assert!(query.has_alias(LOCATION_ALIAS));
        assert!(query.has_alias(CONTENT_ALIAS));
    }
}
