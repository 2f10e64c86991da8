//! Built-in criterion handlers.
//!
//! Composite handlers only combine what the converter returns for their
//! children. Leaf handlers bind every value as a named parameter and add
//! tables through `join_once`.

use super::converter::{CriteriaConverter, CriterionHandler};
use super::types::{Criterion, CriterionKind, Operator};
use crate::error::{QueryError, QueryResult};
use crate::query_builder::JoinAwareQueryBuilder;
use crate::schema::{
    CONTENT_ALIAS, LOCATION_ALIAS, LOCATION_TABLE, content_location_condition,
};
use crate::sql::{ParameterValue, SqlExpression, escape_like_wildcards};

/// Error for a handler invoked on a criterion it does not accept.
fn not_accepted(criterion: &Criterion) -> QueryError {
    QueryError::no_criterion_handler(criterion.kind())
}

/// Make the location alias available to a content-rooted query.
///
/// A location-rooted query already has it. Otherwise the location table is
/// joined from the content alias; every location criterion uses this same
/// condition, so they all share one join.
pub fn ensure_location_alias(query: &mut JoinAwareQueryBuilder) -> QueryResult<&'static str> {
    if !query.has_alias(LOCATION_ALIAS) {
        query.join_once(
            CONTENT_ALIAS,
            LOCATION_TABLE,
            LOCATION_ALIAS,
            &content_location_condition(LOCATION_ALIAS),
        )?;
    }
    Ok(LOCATION_ALIAS)
}

/// `column IN (:param)`, or no match for an empty id set.
fn membership(query: &mut JoinAwareQueryBuilder, column: &str, ids: &[i64]) -> SqlExpression {
    if ids.is_empty() {
        return SqlExpression::never();
    }
    let placeholder = query.create_named_parameter(ParameterValue::list(ids.iter().copied()));
    SqlExpression::raw(format!("{column} IN ({placeholder})"))
}

// ---------------------------------------------------------------------------
// Composites
// ---------------------------------------------------------------------------

/// Compiles `LogicalAnd` as `(a) AND (b) ...`.
pub struct LogicalAndHandler;

impl CriterionHandler for LogicalAndHandler {
    fn accepts(&self, criterion: &Criterion) -> bool {
        matches!(criterion, Criterion::LogicalAnd(_))
    }

    fn handle(
        &self,
        converter: &CriteriaConverter,
        query: &mut JoinAwareQueryBuilder,
        criterion: &Criterion,
    ) -> QueryResult<SqlExpression> {
        let Criterion::LogicalAnd(children) = criterion else {
            return Err(not_accepted(criterion));
        };
        let parts = children
            .iter()
            .map(|child| converter.convert(query, child))
            .collect::<QueryResult<Vec<_>>>()?;
        Ok(SqlExpression::all(parts))
    }
}

/// Compiles `LogicalOr` as `(a) OR (b) ...`.
pub struct LogicalOrHandler;

impl CriterionHandler for LogicalOrHandler {
    fn accepts(&self, criterion: &Criterion) -> bool {
        matches!(criterion, Criterion::LogicalOr(_))
    }

    fn handle(
        &self,
        converter: &CriteriaConverter,
        query: &mut JoinAwareQueryBuilder,
        criterion: &Criterion,
    ) -> QueryResult<SqlExpression> {
        let Criterion::LogicalOr(children) = criterion else {
            return Err(not_accepted(criterion));
        };
        let parts = children
            .iter()
            .map(|child| converter.convert(query, child))
            .collect::<QueryResult<Vec<_>>>()?;
        Ok(SqlExpression::any(parts))
    }
}

/// Compiles `LogicalNot` as `NOT (a)`.
pub struct LogicalNotHandler;

impl CriterionHandler for LogicalNotHandler {
    fn accepts(&self, criterion: &Criterion) -> bool {
        matches!(criterion, Criterion::LogicalNot(_))
    }

    fn handle(
        &self,
        converter: &CriteriaConverter,
        query: &mut JoinAwareQueryBuilder,
        criterion: &Criterion,
    ) -> QueryResult<SqlExpression> {
        let Criterion::LogicalNot(child) = criterion else {
            return Err(not_accepted(criterion));
        };
        Ok(converter.convert(query, child)?.not())
    }
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Compiles `MatchAll` as `1 = 1`.
pub struct MatchAllHandler;

impl CriterionHandler for MatchAllHandler {
    fn accepts(&self, criterion: &Criterion) -> bool {
        matches!(criterion, Criterion::MatchAll)
    }

    fn handle(
        &self,
        _converter: &CriteriaConverter,
        _query: &mut JoinAwareQueryBuilder,
        _criterion: &Criterion,
    ) -> QueryResult<SqlExpression> {
        Ok(SqlExpression::always())
    }
}

/// Compiles `MatchNone` as `1 = 0`.
pub struct MatchNoneHandler;

impl CriterionHandler for MatchNoneHandler {
    fn accepts(&self, criterion: &Criterion) -> bool {
        matches!(criterion, Criterion::MatchNone)
    }

    fn handle(
        &self,
        _converter: &CriteriaConverter,
        _query: &mut JoinAwareQueryBuilder,
        _criterion: &Criterion,
    ) -> QueryResult<SqlExpression> {
        Ok(SqlExpression::never())
    }
}

// ---------------------------------------------------------------------------
// Content leaves
// ---------------------------------------------------------------------------

/// Identifier-set membership on a content column.
pub struct ContentColumnInHandler {
    kind: CriterionKind,
    column: &'static str,
}

impl ContentColumnInHandler {
    pub fn content_id() -> Self {
        Self {
            kind: CriterionKind::ContentId,
            column: "id",
        }
    }

    pub fn content_type_id() -> Self {
        Self {
            kind: CriterionKind::ContentTypeId,
            column: "content_type_id",
        }
    }

    pub fn section_id() -> Self {
        Self {
            kind: CriterionKind::SectionId,
            column: "section_id",
        }
    }
}

impl CriterionHandler for ContentColumnInHandler {
    fn accepts(&self, criterion: &Criterion) -> bool {
        criterion.kind() == self.kind
    }

    fn handle(
        &self,
        _converter: &CriteriaConverter,
        query: &mut JoinAwareQueryBuilder,
        criterion: &Criterion,
    ) -> QueryResult<SqlExpression> {
        let ids = criterion
            .identifiers()
            .ok_or_else(|| not_accepted(criterion))?;
        Ok(membership(
            query,
            &format!("{CONTENT_ALIAS}.{}", self.column),
            ids,
        ))
    }

    fn name(&self) -> &'static str {
        "content_column_in"
    }
}

/// Range comparison on a content timestamp.
pub struct DateMetadataHandler;

impl CriterionHandler for DateMetadataHandler {
    fn accepts(&self, criterion: &Criterion) -> bool {
        matches!(criterion, Criterion::DateMetadata { .. })
    }

    fn handle(
        &self,
        _converter: &CriteriaConverter,
        query: &mut JoinAwareQueryBuilder,
        criterion: &Criterion,
    ) -> QueryResult<SqlExpression> {
        let Criterion::DateMetadata {
            target,
            operator,
            values,
        } = criterion
        else {
            return Err(not_accepted(criterion));
        };
        let column = format!("{CONTENT_ALIAS}.{}", target.column());

        match operator {
            Operator::In => Ok(membership(query, &column, values)),
            Operator::Between => {
                let [low, high] = values.as_slice() else {
                    return Err(QueryError::invalid_argument(format!(
                        "date_metadata between expects exactly 2 values, got {}",
                        values.len()
                    )));
                };
                let low = query.create_named_parameter(*low);
                let high = query.create_named_parameter(*high);
                Ok(SqlExpression::raw(format!(
                    "{column} BETWEEN {low} AND {high}"
                )))
            }
            single => {
                let [value] = values.as_slice() else {
                    return Err(QueryError::invalid_argument(format!(
                        "date_metadata {single:?} expects exactly 1 value, got {}",
                        values.len()
                    )));
                };
                let sql_operator = single.sql().ok_or_else(|| {
                    QueryError::invalid_argument(format!("unsupported operator {single:?}"))
                })?;
                let placeholder = query.create_named_parameter(*value);
                Ok(SqlExpression::raw(format!(
                    "{column} {sql_operator} {placeholder}"
                )))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Location leaves
// ---------------------------------------------------------------------------

/// Identifier-set membership on a location column.
pub struct LocationColumnInHandler {
    kind: CriterionKind,
    column: &'static str,
}

impl LocationColumnInHandler {
    pub fn location_id() -> Self {
        Self {
            kind: CriterionKind::LocationId,
            column: "node_id",
        }
    }

    pub fn parent_location_id() -> Self {
        Self {
            kind: CriterionKind::ParentLocationId,
            column: "parent_node_id",
        }
    }
}

impl CriterionHandler for LocationColumnInHandler {
    fn accepts(&self, criterion: &Criterion) -> bool {
        criterion.kind() == self.kind
    }

    fn handle(
        &self,
        _converter: &CriteriaConverter,
        query: &mut JoinAwareQueryBuilder,
        criterion: &Criterion,
    ) -> QueryResult<SqlExpression> {
        let ids = criterion
            .identifiers()
            .ok_or_else(|| not_accepted(criterion))?;
        let alias = ensure_location_alias(query)?;
        Ok(membership(query, &format!("{alias}.{}", self.column), ids))
    }

    fn name(&self) -> &'static str {
        "location_column_in"
    }
}

/// Path-string prefix match: the location lies in one of the subtrees.
pub struct SubtreeHandler;

impl CriterionHandler for SubtreeHandler {
    fn accepts(&self, criterion: &Criterion) -> bool {
        matches!(criterion, Criterion::Subtree(_))
    }

    fn handle(
        &self,
        _converter: &CriteriaConverter,
        query: &mut JoinAwareQueryBuilder,
        criterion: &Criterion,
    ) -> QueryResult<SqlExpression> {
        let Criterion::Subtree(paths) = criterion else {
            return Err(not_accepted(criterion));
        };
        if paths.is_empty() {
            return Ok(SqlExpression::never());
        }
        let alias = ensure_location_alias(query)?;
        let parts: Vec<SqlExpression> = paths
            .iter()
            .map(|path| {
                let placeholder =
                    query.create_named_parameter(format!("{}%", escape_like_wildcards(path)));
                SqlExpression::raw(format!("{alias}.path_string LIKE {placeholder}"))
            })
            .collect();
        Ok(SqlExpression::any(parts))
    }
}

/// Location visibility flag.
pub struct VisibilityHandler;

impl CriterionHandler for VisibilityHandler {
    fn accepts(&self, criterion: &Criterion) -> bool {
        matches!(criterion, Criterion::Visibility(_))
    }

    fn handle(
        &self,
        _converter: &CriteriaConverter,
        query: &mut JoinAwareQueryBuilder,
        criterion: &Criterion,
    ) -> QueryResult<SqlExpression> {
        let Criterion::Visibility(visible) = criterion else {
            return Err(not_accepted(criterion));
        };
        let alias = ensure_location_alias(query)?;
        let placeholder = query.create_named_parameter(!*visible);
        Ok(SqlExpression::raw(format!(
            "{alias}.is_invisible = {placeholder}"
        )))
    }
}
