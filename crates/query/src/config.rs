//! Engine configuration loaded from environment variables.

use std::env;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use crate::sql::is_safe_identifier;

/// Query engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Alias of the sub-select in bounded count queries (default: csub).
    pub count_subquery_alias: String,

    /// Prefix of SELECT aliases emitted for sort expressions
    /// (default: sort_column_).
    pub sort_column_prefix: String,

    /// Alias used when a location sort needs its own join onto the
    /// content's main location (default: sort_location).
    pub sort_location_alias: String,

    /// Statement timeout applied by the executor (default: 10s).
    pub statement_timeout: Duration,

    /// PostgreSQL connection URL, only needed to execute queries.
    pub database_url: Option<String>,

    /// Maximum database connections in pool (default: 5).
    pub database_max_connections: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            count_subquery_alias: "csub".to_string(),
            sort_column_prefix: "sort_column_".to_string(),
            sort_location_alias: "sort_location".to_string(),
            statement_timeout: Duration::from_secs(10),
            database_url: None,
            database_max_connections: 5,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let count_subquery_alias =
            lookup("QUERY_COUNT_ALIAS").unwrap_or(defaults.count_subquery_alias);

        let sort_column_prefix =
            lookup("QUERY_SORT_COLUMN_PREFIX").unwrap_or(defaults.sort_column_prefix);

        let sort_location_alias =
            lookup("QUERY_SORT_LOCATION_ALIAS").unwrap_or(defaults.sort_location_alias);

        let statement_timeout = match lookup("QUERY_STATEMENT_TIMEOUT_MS") {
            Some(ms) => Duration::from_millis(
                ms.parse()
                    .context("QUERY_STATEMENT_TIMEOUT_MS must be a valid u64")?,
            ),
            None => defaults.statement_timeout,
        };

        let database_url = lookup("DATABASE_URL");

        let database_max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(n) => n
                .parse()
                .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?,
            None => defaults.database_max_connections,
        };

        let config = Self {
            count_subquery_alias,
            sort_column_prefix,
            sort_location_alias,
            statement_timeout,
            database_url,
            database_max_connections,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject aliases that would need quoting to be valid SQL.
    pub fn validate(&self) -> Result<()> {
        if !is_safe_identifier(&self.count_subquery_alias) {
            bail!(
                "QUERY_COUNT_ALIAS '{}' is not a safe SQL identifier",
                self.count_subquery_alias
            );
        }
        if !is_safe_identifier(&self.sort_location_alias) {
            bail!(
                "QUERY_SORT_LOCATION_ALIAS '{}' is not a safe SQL identifier",
                self.sort_location_alias
            );
        }
        // The prefix is glued in front of `<alias>_<column>`, so only the
        // start-character rule differs from a full identifier.
        let probe = format!("{}x", self.sort_column_prefix);
        if !is_safe_identifier(&probe) {
            bail!(
                "QUERY_SORT_COLUMN_PREFIX '{}' is not a safe SQL identifier prefix",
                self.sort_column_prefix
            );
        }
        Ok(())
    }
}

#[cfg(test)]
// Tests are allowed to use unwrap/expect freely.
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = EngineConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.count_subquery_alias, "csub");
        assert_eq!(config.statement_timeout, Duration::from_secs(10));
    }

    #[test]
    fn overrides_from_variables() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            ("QUERY_COUNT_ALIAS", "bounded"),
            ("QUERY_SORT_COLUMN_PREFIX", "s_"),
            ("QUERY_STATEMENT_TIMEOUT_MS", "2500"),
            ("DATABASE_URL", "postgres://localhost/trovato"),
        ]))
        .unwrap();
        assert_eq!(config.count_subquery_alias, "bounded");
        assert_eq!(config.sort_column_prefix, "s_");
        assert_eq!(config.statement_timeout, Duration::from_millis(2500));
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/trovato")
        );
    }

    #[test]
    fn rejects_unsafe_alias() {
        let err = EngineConfig::from_lookup(lookup_from(&[("QUERY_COUNT_ALIAS", "c sub")]))
            .unwrap_err();
        assert!(err.to_string().contains("QUERY_COUNT_ALIAS"));
    }

    #[test]
    fn rejects_bad_timeout() {
        let err = EngineConfig::from_lookup(lookup_from(&[(
            "QUERY_STATEMENT_TIMEOUT_MS",
            "soon",
        )]))
        .unwrap_err();
        assert!(err.to_string().contains("QUERY_STATEMENT_TIMEOUT_MS"));
    }
}
