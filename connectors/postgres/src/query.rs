//! Query source: run one configured query per `retrieve` call.

use pg_escape::quote_identifier;
use tidewire_engine::{Adapter, QueryAdapter, Variables};
use tidewire_types::record::lowercase_fields;
use tidewire_types::{ConnectorError, Record};
use tokio_postgres::Client;

use crate::client::{self, classify};
use crate::config::Config;

/// Runs `QUERY` (required) inside `SCHEMA` and returns one record per row.
///
/// Rows are rendered by the server with `row_to_json`, so column types need
/// no client-side mapping. Column names are lower-cased.
pub struct PostgresQuery {
    config: Config,
    query: String,
}

impl PostgresQuery {
    pub fn new(config: Config, query: impl Into<String>) -> Self {
        Self {
            config,
            query: query.into(),
        }
    }

    /// # Errors
    ///
    /// Fatal config error for missing or invalid variables.
    pub fn from_variables(vars: &Variables) -> Result<Self, ConnectorError> {
        let config = Config::from_variables(vars)?;
        let query = vars.require("QUERY")?;
        Ok(Self::new(config, query))
    }
}

impl Adapter for PostgresQuery {
    type Handle = Client;

    fn name(&self) -> &str {
        "postgres-query"
    }

    async fn connect(&mut self) -> Result<Client, ConnectorError> {
        client::connect(&self.config).await
    }

    async fn disconnect(&mut self, handle: Client) {
        drop(handle);
    }
}

impl QueryAdapter for PostgresQuery {
    async fn query(&mut self, handle: &mut Client) -> Result<Vec<Record>, ConnectorError> {
        handle
            .batch_execute(&format!(
                "SET search_path TO {}",
                quote_identifier(&self.config.schema)
            ))
            .await
            .map_err(|e| classify(&e, "SET_SCHEMA_FAILED", "Invalid query or schema error"))?;

        let rows = handle
            .query(&wrap_query(&self.query), &[])
            .await
            .map_err(|e| classify(&e, "QUERY_FAILED", "Error while fetching data"))?;

        rows.iter()
            .map(|row| {
                let text: String = row.try_get(0).map_err(|e| {
                    ConnectorError::data("DECODE_FAILED", format!("Failed to read row: {e}"))
                })?;
                decode_row(&text)
            })
            .collect()
    }
}

/// Wrap a user query so every row comes back as a single JSON text column.
fn wrap_query(query: &str) -> String {
    let body = query.trim().trim_end_matches(';').trim_end();
    format!("SELECT row_to_json(q)::text FROM ({body}) AS q")
}

fn decode_row(text: &str) -> Result<Record, ConnectorError> {
    serde_json::from_str::<Record>(text)
        .map(lowercase_fields)
        .map_err(|e| ConnectorError::internal("DECODE_FAILED", format!("Invalid row JSON: {e}")))
}
