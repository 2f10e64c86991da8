//! Executes compiled queries against PostgreSQL.
//!
//! Compilation never touches the database; this is the optional last step
//! for callers that want rows or a count rather than SQL text.

use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::Arguments;
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions};

use crate::config::EngineConfig;
use crate::error::{QueryError, QueryResult};
use crate::query_builder::JoinAwareQueryBuilder;
use crate::sql::ParameterValue;
use crate::sql::bind::{PositionalQuery, bind_named};

/// Create a PostgreSQL connection pool from `DATABASE_URL`.
pub async fn create_pool(config: &EngineConfig) -> Result<PgPool> {
    let url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL is required to execute queries")?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(url)
        .await
        .context("failed to connect to PostgreSQL")?;

    Ok(pool)
}

/// Runs compiled queries inside a transaction with a statement timeout.
#[derive(Clone)]
pub struct QueryExecutor {
    pool: PgPool,
    statement_timeout: Duration,
}

impl QueryExecutor {
    /// Create an executor over an existing pool.
    pub fn new(pool: PgPool, config: &EngineConfig) -> Self {
        Self {
            pool,
            statement_timeout: config.statement_timeout,
        }
    }

    /// Fetch every row of `query` as a JSON object.
    pub async fn fetch_rows(
        &self,
        query: &JoinAwareQueryBuilder,
    ) -> QueryResult<Vec<serde_json::Value>> {
        let positional = bind_named(&query.get_sql(), query.parameters())?;
        let sql = format!("SELECT row_to_json(t) FROM ({}) t", positional.sql);
        let arguments = arguments(&positional)?;

        let mut tx = self.begin().await?;
        let rows: Vec<serde_json::Value> = sqlx::query_scalar_with(&sql, arguments)
            .fetch_all(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::debug!(rows = rows.len(), "query executed");
        Ok(rows)
    }

    /// Run a query returning a single integer, such as a bounded count.
    pub async fn fetch_count(&self, query: &JoinAwareQueryBuilder) -> QueryResult<i64> {
        let positional = bind_named(&query.get_sql(), query.parameters())?;
        let arguments = arguments(&positional)?;

        let mut tx = self.begin().await?;
        let count: i64 = sqlx::query_scalar_with(&positional.sql, arguments)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::debug!(count, "count query executed");
        Ok(count)
    }

    /// Begin a transaction so `SET LOCAL` resets on commit or rollback.
    async fn begin(&self) -> QueryResult<sqlx::Transaction<'static, sqlx::Postgres>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(&format!(
            "SET LOCAL statement_timeout = '{}ms'",
            self.statement_timeout.as_millis()
        ))
        .execute(&mut *tx)
        .await?;
        Ok(tx)
    }
}

/// Collect positional values into driver arguments.
fn arguments(query: &PositionalQuery) -> QueryResult<PgArguments> {
    tracing::debug!(sql = %query.sql, params = query.values.len(), "binding query");

    let mut arguments = PgArguments::default();
    for value in &query.values {
        let added = match value {
            ParameterValue::Boolean(b) => arguments.add(*b),
            ParameterValue::Integer(i) => arguments.add(*i),
            ParameterValue::Float(f) => arguments.add(*f),
            ParameterValue::Uuid(u) => arguments.add(*u),
            ParameterValue::String(s) => arguments.add(s.clone()),
            ParameterValue::List(_) => {
                return Err(QueryError::invalid_argument(
                    "list parameters must be expanded before binding",
                ));
            }
        };
        added.map_err(|e| QueryError::invalid_argument(format!("cannot bind parameter: {e}")))?;
    }
    Ok(arguments)
}

#[cfg(test)]
// Tests are allowed to use unwrap/expect freely.
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn arguments_reject_unexpanded_lists() {
        let query = PositionalQuery {
            sql: "SELECT $1".to_string(),
            values: vec![ParameterValue::list([1i64, 2])],
        };
        let err = arguments(&query).unwrap_err();
        assert!(matches!(err, QueryError::InvalidArgument(_)));
    }

    #[test]
    fn arguments_accept_scalars() {
        let query = PositionalQuery {
            sql: "SELECT $1, $2, $3".to_string(),
            values: vec![
                ParameterValue::from(1i64),
                ParameterValue::from("news"),
                ParameterValue::from(true),
            ],
        };
        assert!(arguments(&query).is_ok());
    }

    #[tokio::test]
    async fn create_pool_requires_database_url() {
        let err = create_pool(&EngineConfig::default()).await.unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }
}
