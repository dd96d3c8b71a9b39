use std::{collections::BTreeMap, fmt};

use crate::{Result, TestDbError};

pub const PIPELINE_URL: &str = "pipeline_url";
pub const TOKEN: &str = "token";
pub const DATABASE: &str = "database";
pub const HOST: &str = "host";

const KNOWN_OPTIONS: [&str; 4] = [PIPELINE_URL, TOKEN, DATABASE, HOST];

/// Named connection options.
///
/// Only the keys in this module are accepted; values are kept as plain
/// strings and interpreted when a connection is opened.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ConnectionConfig {
    options: BTreeMap<String, String>,
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (key, value) in &self.options {
            if key == TOKEN {
                map.entry(key, &"<redacted>");
            } else {
                map.entry(key, value);
            }
        }
        map.finish()
    }
}

impl ConnectionConfig {
    /// Creates a config pointing at a gateway pipeline URL with an access token.
    pub fn new(pipeline_url: impl Into<String>, token: impl Into<String>) -> Self {
        let mut options = BTreeMap::new();
        options.insert(PIPELINE_URL.to_owned(), pipeline_url.into());
        options.insert(TOKEN.to_owned(), token.into());
        Self { options }
    }

    /// Reads the config from environment variables.
    ///
    /// Reads:
    /// - `MSSQL_TESTDB_PIPELINE_URL` (required)
    /// - `MSSQL_TESTDB_TOKEN` (required, Bearer prefix optional)
    /// - `MSSQL_TESTDB_DATABASE`
    /// - `MSSQL_TESTDB_HOST`
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        for key in KNOWN_OPTIONS {
            let var = format!("MSSQL_TESTDB_{}", key.to_ascii_uppercase());
            if let Ok(value) = std::env::var(&var) {
                if value.trim().is_empty() {
                    return Err(TestDbError::Config(format!("{var} is set but empty")));
                }
                config.options.insert(key.to_owned(), value);
            }
        }
        config.require(PIPELINE_URL)?;
        config.require(TOKEN)?;
        Ok(config)
    }

    /// Sets a named option, rejecting keys this crate does not know.
    pub fn with_option(mut self, key: &str, value: impl Into<String>) -> Result<Self> {
        if !KNOWN_OPTIONS.contains(&key) {
            return Err(TestDbError::Config(format!(
                "invalid connection option specified: {key}"
            )));
        }
        self.options.insert(key.to_owned(), value.into());
        Ok(self)
    }

    /// Targets a specific database once the connection is open.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.options.insert(DATABASE.to_owned(), database.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    pub(crate) fn require(&self, key: &str) -> Result<&str> {
        match self.get(key) {
            Some(value) if !value.trim().is_empty() => Ok(value),
            Some(_) => Err(TestDbError::Config(format!("option '{key}' is empty"))),
            None => Err(TestDbError::Config(format!("missing option '{key}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{config, ConnectionConfig, TestDbError};

    #[test]
    fn unknown_option_is_rejected() {
        let err = ConnectionConfig::new("http://gw/v2/pipeline", "t")
            .with_option("colour", "blue")
            .expect_err("must reject");
        assert!(matches!(err, TestDbError::Config(message) if message.contains("colour")));
    }

    #[test]
    fn known_option_is_stored() {
        let config = ConnectionConfig::new("http://gw/v2/pipeline", "t")
            .with_option(config::HOST, "ci-runner-7")
            .expect("host is a known option");
        assert_eq!(config.get(config::HOST), Some("ci-runner-7"));
    }

    #[test]
    fn require_reports_missing_and_empty() {
        let config = ConnectionConfig::new("  ", "t");
        assert!(config.require(config::PIPELINE_URL).is_err());
        assert!(config.require(config::DATABASE).is_err());
        assert_eq!(config.require(config::TOKEN).expect("present"), "t");
    }

    #[test]
    fn debug_redacts_token() {
        let config = ConnectionConfig::new("http://gw/v2/pipeline", "secret-token");
        let debug = format!("{config:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("secret-token"));
    }
}
