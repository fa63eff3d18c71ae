//! Insert sink: one row per `insert` call.

use tidewire_engine::{Adapter, SinkAdapter, Variables};
use tidewire_types::{CommitState, ConnectorError, Record};
use tokio_postgres::Client;

use crate::client::{self, classify, qualified_name};
use crate::config::Config;
use crate::identifier::validate_pg_identifier;

/// Inserts records into `TABLE` (required) in `SCHEMA`.
///
/// The record is sent as a single JSON parameter and expanded server-side
/// with `json_populate_record`, so values are cast to the column types and
/// fields missing from the record become NULL.
pub struct PostgresSink {
    config: Config,
    table: String,
}

impl PostgresSink {
    /// # Errors
    ///
    /// Fatal config error when `table` is not a plain identifier.
    pub fn new(config: Config, table: impl Into<String>) -> Result<Self, ConnectorError> {
        let table = table.into();
        validate_pg_identifier(&table)
            .map_err(|e| ConnectorError::config("INVALID_CONFIG", format!("TABLE: {e}")))?;
        Ok(Self { config, table })
    }

    /// # Errors
    ///
    /// Fatal config error for missing or invalid variables.
    pub fn from_variables(vars: &Variables) -> Result<Self, ConnectorError> {
        let config = Config::from_variables(vars)?;
        Self::new(config, vars.require("TABLE")?)
    }
}

impl Adapter for PostgresSink {
    type Handle = Client;

    fn name(&self) -> &str {
        "postgres-sink"
    }

    async fn connect(&mut self) -> Result<Client, ConnectorError> {
        client::connect(&self.config).await
    }

    async fn disconnect(&mut self, handle: Client) {
        drop(handle);
    }
}

impl SinkAdapter for PostgresSink {
    async fn put_one(&mut self, handle: &mut Client, record: &Record) -> Result<(), ConnectorError> {
        if record.is_empty() {
            return Err(ConnectorError::data("EMPTY_RECORD", "Record has no fields to insert"));
        }

        let sql = insert_statement(&qualified_name(&self.config.schema, &self.table), record);
        let payload = serde_json::Value::Object(record.clone()).to_string();

        handle.execute(&sql, &[&payload]).await.map_err(|e| {
            let state = if e.code().is_some() {
                CommitState::BeforeCommit
            } else {
                CommitState::AfterCommitUnknown
            };
            classify(&e, "INSERT_FAILED", "Failed to insert data").with_commit_state(state)
        })?;

        tracing::info!(table = %self.table, fields = record.len(), "Data inserted successfully");
        Ok(())
    }
}

/// `INSERT INTO t (a, b) SELECT a, b FROM json_populate_record(NULL::t, $1)`
/// over the record's fields, in record order.
fn insert_statement(qualified_table: &str, record: &Record) -> String {
    let columns = record
        .keys()
        .map(|k| pg_escape::quote_identifier(k).into_owned())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {qualified_table} ({columns}) \
         SELECT {columns} FROM json_populate_record(NULL::{qualified_table}, $1::text::json)"
    )
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;

    fn config() -> Config {
        Config {
            host: "localhost".into(),
            port: 5432,
            user: "writer".into(),
            password: String::new(),
            database: "shop".into(),
            schema: "public".into(),
            timeout: Duration::from_secs(10),
        }
    }

    #[test]
    fn statement_lists_record_columns() {
        let record = json!({"Price": 2.5, "Name": "tea"}).as_object().cloned().unwrap();
        let sql = insert_statement("\"Raw\".\"Products\"", &record);
        assert!(sql.starts_with("INSERT INTO \"Raw\".\"Products\" ("));
        assert!(sql.contains("\"Price\""));
        assert!(sql.contains("\"Name\""));
        assert!(sql.ends_with("json_populate_record(NULL::\"Raw\".\"Products\", $1::text::json)"));
    }

    #[test]
    fn table_validated() {
        assert!(PostgresSink::new(config(), "products").is_ok());
        let err = PostgresSink::new(config(), "products\"; --").err().unwrap();
        assert_eq!(err.code, "INVALID_CONFIG");
    }

    #[test]
    fn table_variable_required() {
        let vars = Variables::from_pairs([
            ("HOST", "localhost"),
            ("USERNAME", "writer"),
            ("DATABASE", "shop"),
        ]);
        let err = PostgresSink::from_variables(&vars).err().unwrap();
        assert!(err.message.contains("TABLE"));
    }
}
