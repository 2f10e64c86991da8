//! String-fragment SELECT builder.
//!
//! Mirrors the shape of a classic SQL query builder: select list, FROM
//! sources with aliases, joins attached to an alias, a WHERE tree built from
//! `SqlExpression`s, GROUP BY/HAVING/ORDER BY and LIMIT/OFFSET. Values are
//! never interpolated; handlers register them as named parameters.

use std::collections::{BTreeMap, HashSet};

use super::{ParameterValue, SqlExpression};

/// Named parameters bound to a query, keyed without the leading colon.
pub type Parameters = BTreeMap<String, ParameterValue>;

/// A table (or parenthesized sub-select) in the FROM clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FromSource {
    /// Table name or `(subquery)` text.
    pub table: String,
    /// Alias the rest of the query refers to it by.
    pub alias: Option<String>,
}

impl FromSource {
    /// Name other clauses use to reference this source.
    pub fn reference(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.table)
    }
}

/// Join flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

impl JoinKind {
    fn keyword(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
        }
    }
}

/// A join attached to an existing FROM or JOIN alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub kind: JoinKind,
    pub from_alias: String,
    pub table: String,
    pub alias: String,
    pub condition: String,
}

/// Mutable SELECT statement under construction.
#[derive(Debug, Clone, Default)]
pub struct SelectQuery {
    select: Vec<String>,
    from: Vec<FromSource>,
    joins: Vec<Join>,
    where_clause: Option<SqlExpression>,
    group_by: Vec<String>,
    having: Option<SqlExpression>,
    order_by: Vec<String>,
    first_result: u64,
    max_results: Option<u64>,
    parameters: Parameters,
    parameter_counter: usize,
}

impl SelectQuery {
    /// Create an empty SELECT.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the select list.
    pub fn select<S: Into<String>>(&mut self, columns: impl IntoIterator<Item = S>) -> &mut Self {
        self.select = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Append to the select list.
    pub fn add_select(&mut self, column: impl Into<String>) -> &mut Self {
        self.select.push(column.into());
        self
    }

    /// Add a FROM source.
    pub fn from(&mut self, table: impl Into<String>, alias: Option<&str>) -> &mut Self {
        self.from.push(FromSource {
            table: table.into(),
            alias: alias.map(str::to_string),
        });
        self
    }

    /// Attach a join without any bookkeeping. Callers that need join-once
    /// semantics go through `JoinAwareQueryBuilder`.
    pub(crate) fn push_join(&mut self, join: Join) -> &mut Self {
        self.joins.push(join);
        self
    }

    /// Replace the WHERE clause.
    pub fn where_clause(&mut self, condition: SqlExpression) -> &mut Self {
        self.where_clause = Some(condition);
        self
    }

    /// AND a condition into the WHERE clause.
    pub fn and_where(&mut self, condition: SqlExpression) -> &mut Self {
        self.where_clause = Some(match self.where_clause.take() {
            Some(existing) => SqlExpression::all([existing, condition]),
            None => condition,
        });
        self
    }

    /// OR a condition into the WHERE clause.
    pub fn or_where(&mut self, condition: SqlExpression) -> &mut Self {
        self.where_clause = Some(match self.where_clause.take() {
            Some(existing) => SqlExpression::any([existing, condition]),
            None => condition,
        });
        self
    }

    /// Replace the GROUP BY list.
    pub fn group_by<S: Into<String>>(&mut self, columns: impl IntoIterator<Item = S>) -> &mut Self {
        self.group_by = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Append to the GROUP BY list.
    pub fn add_group_by(&mut self, column: impl Into<String>) -> &mut Self {
        self.group_by.push(column.into());
        self
    }

    /// Replace the HAVING clause.
    pub fn having(&mut self, condition: SqlExpression) -> &mut Self {
        self.having = Some(condition);
        self
    }

    /// Replace the ORDER BY list with a single entry.
    pub fn order_by(&mut self, expression: &str, direction: &str) -> &mut Self {
        self.order_by = vec![format!("{expression} {direction}")];
        self
    }

    /// Append an ORDER BY entry.
    pub fn add_order_by(&mut self, expression: &str, direction: &str) -> &mut Self {
        self.order_by.push(format!("{expression} {direction}"));
        self
    }

    /// Remove every ORDER BY entry.
    pub fn clear_order_by(&mut self) -> &mut Self {
        self.order_by.clear();
        self
    }

    /// Set the OFFSET.
    pub fn set_first_result(&mut self, first_result: u64) -> &mut Self {
        self.first_result = first_result;
        self
    }

    /// Set the LIMIT; `None` removes it.
    pub fn set_max_results(&mut self, max_results: Option<u64>) -> &mut Self {
        self.max_results = max_results;
        self
    }

    /// Bind a value to a named parameter (name given without the colon).
    pub fn set_parameter(
        &mut self,
        name: impl Into<String>,
        value: impl Into<ParameterValue>,
    ) -> &mut Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    /// Replace all parameters.
    pub fn set_parameters(&mut self, parameters: Parameters) -> &mut Self {
        self.parameters = parameters;
        self
    }

    /// Bind a value under a generated name and return its placeholder
    /// (e.g. `:param_1`) for use inside a fragment.
    pub fn create_named_parameter(&mut self, value: impl Into<ParameterValue>) -> String {
        let name = loop {
            self.parameter_counter += 1;
            let candidate = format!("param_{}", self.parameter_counter);
            if !self.parameters.contains_key(&candidate) {
                break candidate;
            }
        };
        let placeholder = format!(":{name}");
        self.parameters.insert(name, value.into());
        placeholder
    }

    /// Bound parameters.
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// FROM sources in insertion order.
    pub fn from_sources(&self) -> &[FromSource] {
        &self.from
    }

    /// Joins in insertion order.
    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    /// Current select list.
    pub fn select_list(&self) -> &[String] {
        &self.select
    }

    /// Current ORDER BY entries.
    pub fn order_by_list(&self) -> &[String] {
        &self.order_by
    }

    /// Current WHERE clause.
    pub fn where_expression(&self) -> Option<&SqlExpression> {
        self.where_clause.as_ref()
    }

    /// Whether any FROM source or join is referenced by `alias`.
    pub fn has_alias(&self, alias: &str) -> bool {
        self.from.iter().any(|f| f.reference() == alias) || self.joins.iter().any(|j| j.alias == alias)
    }

    /// Render the statement.
    pub fn get_sql(&self) -> String {
        let mut sql = String::from("SELECT ");
        sql.push_str(&self.select.join(", "));

        if !self.from.is_empty() {
            let mut rendered = HashSet::new();
            let sources: Vec<String> = self
                .from
                .iter()
                .map(|source| {
                    let mut part = match &source.alias {
                        Some(alias) => format!("{} {alias}", source.table),
                        None => source.table.clone(),
                    };
                    self.render_joins(source.reference(), &mut part, &mut rendered);
                    part
                })
                .collect();
            sql.push_str(" FROM ");
            sql.push_str(&sources.join(", "));
        }

        if let Some(condition) = &self.where_clause {
            sql.push_str(" WHERE ");
            sql.push_str(condition.as_str());
        }
        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.group_by.join(", "));
        }
        if let Some(condition) = &self.having {
            sql.push_str(" HAVING ");
            sql.push_str(condition.as_str());
        }
        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by.join(", "));
        }
        if let Some(limit) = self.max_results {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if self.first_result > 0 {
            sql.push_str(&format!(" OFFSET {}", self.first_result));
        }
        sql
    }

    /// Append joins hanging off `alias`, then joins hanging off those.
    fn render_joins(&self, alias: &str, out: &mut String, rendered: &mut HashSet<String>) {
        for join in self.joins.iter().filter(|j| j.from_alias == alias) {
            if !rendered.insert(join.alias.clone()) {
                continue;
            }
            out.push_str(&format!(
                " {} {} {} ON {}",
                join.kind.keyword(),
                join.table,
                join.alias,
                join.condition
            ));
            self.render_joins(&join.alias, out, rendered);
        }
    }
}

impl std::fmt::Display for SelectQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.get_sql())
    }
}
