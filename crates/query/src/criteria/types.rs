//! Criterion AST.
//!
//! Provides the value types callers build filters from:
//! - Criterion: leaf predicates and boolean combinators
//! - Operator: comparison operators for range criteria
//! - CriterionKind: runtime type of a criterion, for dispatch diagnostics

use serde::{Deserialize, Serialize};

use crate::sql::ParameterValue;

/// A filter predicate or boolean combination of predicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    /// Content id is one of the given ids.
    ContentId(Vec<i64>),
    /// Content type id is one of the given ids.
    ContentTypeId(Vec<i64>),
    /// Section id is one of the given ids.
    SectionId(Vec<i64>),
    /// Location id is one of the given ids.
    LocationId(Vec<i64>),
    /// Parent location id is one of the given ids.
    ParentLocationId(Vec<i64>),
    /// Location path string starts with one of the given paths (e.g. "/1/2/").
    Subtree(Vec<String>),
    /// Location visibility.
    Visibility(bool),
    /// Comparison against a content timestamp.
    DateMetadata {
        target: DateTarget,
        operator: Operator,
        values: Vec<i64>,
    },
    /// Matches every row.
    MatchAll,
    /// Matches no row.
    MatchNone,
    /// All children must match.
    LogicalAnd(Vec<Criterion>),
    /// At least one child must match.
    LogicalOr(Vec<Criterion>),
    /// The child must not match.
    LogicalNot(Box<Criterion>),
    /// Predicate defined outside the kernel; compiled by whichever
    /// registered handler claims `name`.
    Custom { name: String, value: ParameterValue },
}

/// Timestamp column targeted by `DateMetadata`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateTarget {
    Published,
    Modified,
}

impl DateTarget {
    /// Column on the content table.
    pub fn column(self) -> &'static str {
        match self {
            DateTarget::Published => "published",
            DateTarget::Modified => "modified",
        }
    }
}

/// Comparison operators for range criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    /// Exact match.
    Eq,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Value in list.
    In,
    /// Inclusive range of exactly two values.
    Between,
}

impl Operator {
    /// SQL comparison operator for single-value operators.
    pub fn sql(self) -> Option<&'static str> {
        match self {
            Operator::Eq => Some("="),
            Operator::Gt => Some(">"),
            Operator::Gte => Some(">="),
            Operator::Lt => Some("<"),
            Operator::Lte => Some("<="),
            Operator::In | Operator::Between => None,
        }
    }
}

/// Runtime type of a criterion.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CriterionKind {
    ContentId,
    ContentTypeId,
    SectionId,
    LocationId,
    ParentLocationId,
    Subtree,
    Visibility,
    DateMetadata,
    MatchAll,
    MatchNone,
    LogicalAnd,
    LogicalOr,
    LogicalNot,
    Custom(String),
}

impl std::fmt::Display for CriterionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CriterionKind::ContentId => "content_id",
            CriterionKind::ContentTypeId => "content_type_id",
            CriterionKind::SectionId => "section_id",
            CriterionKind::LocationId => "location_id",
            CriterionKind::ParentLocationId => "parent_location_id",
            CriterionKind::Subtree => "subtree",
            CriterionKind::Visibility => "visibility",
            CriterionKind::DateMetadata => "date_metadata",
            CriterionKind::MatchAll => "match_all",
            CriterionKind::MatchNone => "match_none",
            CriterionKind::LogicalAnd => "logical_and",
            CriterionKind::LogicalOr => "logical_or",
            CriterionKind::LogicalNot => "logical_not",
            CriterionKind::Custom(name) => return write!(f, "custom:{name}"),
        };
        f.write_str(name)
    }
}

impl Criterion {
    /// Runtime type of this criterion.
    pub fn kind(&self) -> CriterionKind {
        match self {
            Criterion::ContentId(_) => CriterionKind::ContentId,
            Criterion::ContentTypeId(_) => CriterionKind::ContentTypeId,
            Criterion::SectionId(_) => CriterionKind::SectionId,
            Criterion::LocationId(_) => CriterionKind::LocationId,
            Criterion::ParentLocationId(_) => CriterionKind::ParentLocationId,
            Criterion::Subtree(_) => CriterionKind::Subtree,
            Criterion::Visibility(_) => CriterionKind::Visibility,
            Criterion::DateMetadata { .. } => CriterionKind::DateMetadata,
            Criterion::MatchAll => CriterionKind::MatchAll,
            Criterion::MatchNone => CriterionKind::MatchNone,
            Criterion::LogicalAnd(_) => CriterionKind::LogicalAnd,
            Criterion::LogicalOr(_) => CriterionKind::LogicalOr,
            Criterion::LogicalNot(_) => CriterionKind::LogicalNot,
            Criterion::Custom { name, .. } => CriterionKind::Custom(name.clone()),
        }
    }

    /// Identifier set of membership criteria.
    pub fn identifiers(&self) -> Option<&[i64]> {
        match self {
            Criterion::ContentId(ids)
            | Criterion::ContentTypeId(ids)
            | Criterion::SectionId(ids)
            | Criterion::LocationId(ids)
            | Criterion::ParentLocationId(ids) => Some(ids),
            _ => None,
        }
    }

    /// AND all the given criteria.
    pub fn and(criteria: impl IntoIterator<Item = Criterion>) -> Self {
        Criterion::LogicalAnd(criteria.into_iter().collect())
    }

    /// OR all the given criteria.
    pub fn or(criteria: impl IntoIterator<Item = Criterion>) -> Self {
        Criterion::LogicalOr(criteria.into_iter().collect())
    }

    /// Negate a criterion.
    pub fn not(criterion: Criterion) -> Self {
        Criterion::LogicalNot(Box::new(criterion))
    }
}

#[cfg(test)]
// Tests are allowed to use unwrap/expect freely.
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn criterion_deserializes_from_json() {
        let json = r#"{
            "logical_and": [
                {"content_type_id": [2, 3]},
                {"subtree": ["/1/2/"]},
                {"logical_not": {"visibility": false}},
                {"date_metadata": {"target": "published", "operator": "gte", "values": [1700000000]}}
            ]
        }"#;
        let criterion: Criterion = serde_json::from_str(json).unwrap();

        let Criterion::LogicalAnd(children) = &criterion else {
            panic!("expected logical_and, got {criterion:?}");
        };
        assert_eq!(children.len(), 4);
        assert_eq!(children[0], Criterion::ContentTypeId(vec![2, 3]));
        assert_eq!(children[2], Criterion::not(Criterion::Visibility(false)));
        assert_eq!(
            children[3],
            Criterion::DateMetadata {
                target: DateTarget::Published,
                operator: Operator::Gte,
                values: vec![1_700_000_000],
            }
        );
    }

    #[test]
    fn unit_variants_are_plain_strings() {
        let json = serde_json::to_string(&Criterion::MatchAll).unwrap();
        assert_eq!(json, "\"match_all\"");
    }

    #[test]
    fn custom_criterion_serde() {
        let criterion = Criterion::Custom {
            name: "author".to_string(),
            value: ParameterValue::Integer(14),
        };
        let json = serde_json::to_string(&criterion).unwrap();
        assert_eq!(json, r#"{"custom":{"name":"author","value":14}}"#);
        assert_eq!(criterion.kind().to_string(), "custom:author");
    }

    #[test]
    fn identifiers_only_for_membership_criteria() {
        assert_eq!(Criterion::LocationId(vec![5]).identifiers(), Some(&[5][..]));
        assert_eq!(Criterion::Visibility(true).identifiers(), None);
    }

    #[test]
    fn kind_names() {
        assert_eq!(CriterionKind::ParentLocationId.to_string(), "parent_location_id");
        assert_eq!(Criterion::or([]).kind(), CriterionKind::LogicalOr);
    }
}
