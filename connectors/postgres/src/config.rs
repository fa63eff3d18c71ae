//! PostgreSQL connection configuration.

use std::time::Duration;

use tidewire_engine::Variables;
use tidewire_types::ConnectorError;

use crate::identifier::validate_pg_identifier;

/// Connection settings shared by every PostgreSQL adapter.
///
/// | Variable | Default |
/// |----------|---------|
/// | `HOST` | required |
/// | `PORT` | `5432` |
/// | `USERNAME` | required |
/// | `PASSWORD` | empty |
/// | `DATABASE` | required |
/// | `SCHEMA` | `public` |
/// | `TIMEOUT` | `10` (seconds, connect and statement timeout) |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub schema: String,
    pub timeout: Duration,
}

impl Config {
    /// # Errors
    ///
    /// Fatal config error for missing or invalid variables.
    pub fn from_variables(vars: &Variables) -> Result<Self, ConnectorError> {
        let timeout_secs: u64 = vars.parse_or("TIMEOUT", 10)?;
        let config = Self {
            host: vars.require("HOST")?.to_string(),
            port: vars.parse_or("PORT", 5432)?,
            user: vars.require("USERNAME")?.to_string(),
            password: vars.get_or("PASSWORD", "").to_string(),
            database: vars.require("DATABASE")?.to_string(),
            schema: vars.get_or("SCHEMA", "public").to_string(),
            timeout: Duration::from_secs(timeout_secs),
        };
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Fatal config error when the schema name is not a plain identifier.
    pub fn validate(&self) -> Result<(), ConnectorError> {
        validate_pg_identifier(&self.schema)
            .map_err(|e| ConnectorError::config("INVALID_CONFIG", format!("SCHEMA: {e}")))
    }
}
