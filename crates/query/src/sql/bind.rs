//! Named-parameter binding.
//!
//! Handlers emit `:name` placeholders. PostgreSQL wants `$1..$n`, so before
//! execution the SQL is rewritten and the values collected in placeholder
//! order. `::type` casts and quoted literals are left alone.

use regex::{Captures, Regex};
use sea_query::{PostgresQueryBuilder, QueryBuilder, Value};
use std::sync::LazyLock;

use super::{ParameterValue, Parameters};
use crate::error::{QueryError, QueryResult};

/// Matches, in priority order: a quoted literal, a `::` cast, a `:name`
/// placeholder. Only the last one has a capture group.
///
/// # Panics
///
/// Panics if the hard-coded regex literal is invalid (impossible in practice).
#[allow(clippy::expect_used)]
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"'(?:[^']|'')*'|::|:([A-Za-z_][A-Za-z0-9_]*)").expect("valid regex literal")
});

/// SQL with positional placeholders and the values to bind, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionalQuery {
    pub sql: String,
    pub values: Vec<ParameterValue>,
}

/// Rewrite `:name` placeholders to `$n`, expanding list parameters to one
/// placeholder per element (an empty list becomes `NULL`).
pub fn bind_named(sql: &str, parameters: &Parameters) -> QueryResult<PositionalQuery> {
    let mut values = Vec::new();
    let mut missing = Vec::new();

    let rewritten = PLACEHOLDER.replace_all(sql, |caps: &Captures| {
        let Some(name) = caps.get(1) else {
            return caps[0].to_string();
        };
        match parameters.get(name.as_str()) {
            Some(ParameterValue::List(items)) if items.is_empty() => "NULL".to_string(),
            Some(ParameterValue::List(items)) => items
                .iter()
                .map(|item| {
                    values.push(item.clone());
                    format!("${}", values.len())
                })
                .collect::<Vec<_>>()
                .join(", "),
            Some(value) => {
                values.push(value.clone());
                format!("${}", values.len())
            }
            None => {
                missing.push(name.as_str().to_string());
                caps[0].to_string()
            }
        }
    });

    if !missing.is_empty() {
        return Err(QueryError::invalid_argument(format!(
            "no value bound for parameter(s): {}",
            missing.join(", ")
        )));
    }
    if values.iter().any(ParameterValue::is_list) {
        return Err(QueryError::invalid_argument(
            "nested list parameters cannot be bound",
        ));
    }

    Ok(PositionalQuery {
        sql: rewritten.into_owned(),
        values,
    })
}

/// Render the SQL with parameter values inlined as PostgreSQL literals.
///
/// For logging and the explain CLI only; executed SQL always goes through
/// `bind_named`. Unknown placeholders are left as they are.
pub fn inline(sql: &str, parameters: &Parameters) -> String {
    PLACEHOLDER
        .replace_all(sql, |caps: &Captures| match caps.get(1) {
            Some(name) => match parameters.get(name.as_str()) {
                Some(value) => literal(value),
                None => caps[0].to_string(),
            },
            None => caps[0].to_string(),
        })
        .into_owned()
}

fn literal(value: &ParameterValue) -> String {
    match value {
        ParameterValue::List(items) if items.is_empty() => "NULL".to_string(),
        ParameterValue::List(items) => items.iter().map(literal).collect::<Vec<_>>().join(", "),
        scalar => PostgresQueryBuilder.value_to_string(&to_sea_value(scalar)),
    }
}

fn to_sea_value(value: &ParameterValue) -> Value {
    match value {
        ParameterValue::Boolean(b) => Value::from(*b),
        ParameterValue::Integer(i) => Value::from(*i),
        ParameterValue::Float(f) => Value::from(*f),
        ParameterValue::Uuid(u) => Value::from(*u),
        ParameterValue::String(s) => Value::from(s.clone()),
        ParameterValue::List(_) => Value::from(literal(value)),
    }
}

#[cfg(test)]
// Tests are allowed to use unwrap/expect freely.
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn params(entries: &[(&str, ParameterValue)]) -> Parameters {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn rewrites_in_order_of_appearance() {
        let p = params(&[
            ("b", ParameterValue::Integer(2)),
            ("a", ParameterValue::String("x".into())),
        ]);
        let bound = bind_named("SELECT * FROM t WHERE a = :a AND b > :b", &p).unwrap();
        assert_eq!(bound.sql, "SELECT * FROM t WHERE a = $1 AND b > $2");
        assert_eq!(
            bound.values,
            vec![ParameterValue::String("x".into()), ParameterValue::Integer(2)]
        );
    }

    #[test]
    fn expands_lists() {
        let p = params(&[("ids", ParameterValue::list([4i64, 5, 6]))]);
        let bound = bind_named("c.id IN (:ids)", &p).unwrap();
        assert_eq!(bound.sql, "c.id IN ($1, $2, $3)");
        assert_eq!(bound.values.len(), 3);
    }

    #[test]
    fn empty_list_matches_nothing() {
        let p = params(&[("ids", ParameterValue::List(Vec::new()))]);
        let bound = bind_named("c.id IN (:ids)", &p).unwrap();
        assert_eq!(bound.sql, "c.id IN (NULL)");
        assert!(bound.values.is_empty());
    }

    #[test]
    fn skips_casts_and_literals() {
        let p = params(&[("id", ParameterValue::Integer(1))]);
        let bound = bind_named(
            "SELECT ':not_a_param', 'it''s :quoted', x::text FROM t WHERE id = :id",
            &p,
        )
        .unwrap();
        assert_eq!(
            bound.sql,
            "SELECT ':not_a_param', 'it''s :quoted', x::text FROM t WHERE id = $1"
        );
        assert_eq!(bound.values, vec![ParameterValue::Integer(1)]);
    }

    #[test]
    fn repeated_placeholder_binds_twice() {
        let p = params(&[("v", ParameterValue::Integer(3))]);
        let bound = bind_named("a = :v OR b = :v", &p).unwrap();
        assert_eq!(bound.sql, "a = $1 OR b = $2");
        assert_eq!(bound.values.len(), 2);
    }

    #[test]
    fn missing_parameter_is_rejected() {
        let err = bind_named("a = :missing", &Parameters::new()).unwrap_err();
        assert!(matches!(err, QueryError::InvalidArgument(ref m) if m.contains("missing")));
    }

    #[test]
    fn nested_list_is_rejected() {
        let p = params(&[(
            "ids",
            ParameterValue::List(vec![ParameterValue::list([1i64])]),
        )]);
        assert!(matches!(
            bind_named("x IN (:ids)", &p),
            Err(QueryError::InvalidArgument(_))
        ));
    }

    #[test]
    fn inline_renders_literals() {
        let p = params(&[
            ("name", ParameterValue::String("news".into())),
            ("ids", ParameterValue::list([1i64, 2])),
        ]);
        let sql = inline("name = :name AND id IN (:ids) AND x = :other", &p);
        assert_eq!(sql, "name = 'news' AND id IN (1, 2) AND x = :other");
    }
}
