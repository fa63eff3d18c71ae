//! Queue source backed by a table of pending messages.
//!
//! The table needs an orderable `id` and a `payload` column:
//!
//! ```sql
//! CREATE TABLE input_connector (id bigserial PRIMARY KEY, payload text NOT NULL);
//! ```
//!
//! Fetching opens a transaction and locks the oldest unlocked row;
//! acknowledging deletes it and commits. Once committed the message is gone.

use tidewire_engine::{Adapter, PullAdapter, Variables};
use tidewire_types::record::message_record;
use tidewire_types::{ConnectorError, Record};
use tokio_postgres::Client;

use crate::client::{self, classify, qualified_name};
use crate::config::Config;
use crate::identifier::validate_pg_identifier;

/// A locked, not yet deleted queue row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    pub id: i64,
    pub payload: String,
}

/// Pulls from `QUEUE_TABLE` (default `input_connector`) in `SCHEMA`.
pub struct PostgresQueue {
    config: Config,
    select_sql: String,
    delete_sql: String,
}

impl PostgresQueue {
    /// # Errors
    ///
    /// Fatal config error when `table` is not a plain identifier.
    pub fn new(config: Config, table: &str) -> Result<Self, ConnectorError> {
        validate_pg_identifier(table)
            .map_err(|e| ConnectorError::config("INVALID_CONFIG", format!("QUEUE_TABLE: {e}")))?;
        let qualified = qualified_name(&config.schema, table);
        Ok(Self {
            select_sql: format!(
                "SELECT id::bigint, payload::text FROM {qualified} \
                 ORDER BY id LIMIT 1 FOR UPDATE SKIP LOCKED"
            ),
            delete_sql: format!("DELETE FROM {qualified} WHERE id = $1::bigint"),
            config,
        })
    }

    /// # Errors
    ///
    /// Fatal config error for missing or invalid variables.
    pub fn from_variables(vars: &Variables) -> Result<Self, ConnectorError> {
        let config = Config::from_variables(vars)?;
        Self::new(config, vars.get_or("QUEUE_TABLE", "input_connector"))
    }
}

/// A row that cannot become a message fails the same way on every attempt.
fn invalid_message(reason: &str) -> ConnectorError {
    ConnectorError::data(
        "INVALID_MESSAGE",
        format!("Failed to decode message: {reason}"),
    )
}

fn decode_message(id: i64, payload: Option<String>) -> Result<QueueMessage, ConnectorError> {
    match payload {
        Some(payload) => Ok(QueueMessage { id, payload }),
        None => Err(invalid_message(&format!("message {id} has a NULL payload"))
            .with_details(serde_json::json!({ "id": id }))),
    }
}

/// Best-effort rollback so a kept connection is not left in a failed transaction.
async fn abandon(handle: &Client) {
    if let Err(e) = handle.batch_execute("ROLLBACK").await {
        tracing::debug!(error = %e, "Rollback after failed queue step failed");
    }
}

impl Adapter for PostgresQueue {
    type Handle = Client;

    fn name(&self) -> &str {
        "postgres-queue"
    }

    async fn connect(&mut self) -> Result<Client, ConnectorError> {
        client::connect(&self.config).await
    }

    async fn disconnect(&mut self, handle: Client) {
        abandon(&handle).await;
        drop(handle);
    }
}

impl PullAdapter for PostgresQueue {
    type Message = QueueMessage;

    async fn fetch_one(&mut self, handle: &mut Client) -> Result<Option<QueueMessage>, ConnectorError> {
        handle
            .batch_execute("BEGIN")
            .await
            .map_err(|e| classify(&e, "FETCH_FAILED", "Failed to retrieve message"))?;

        let row = match handle.query_opt(&self.select_sql, &[]).await {
            Ok(row) => row,
            Err(e) => {
                abandon(handle).await;
                return Err(classify(&e, "FETCH_FAILED", "Failed to retrieve message"));
            }
        };

        let Some(row) = row else {
            abandon(handle).await;
            return Ok(None);
        };

        let decoded = row
            .try_get::<_, i64>(0)
            .and_then(|id| row.try_get::<_, Option<String>>(1).map(|payload| (id, payload)));
        let result = match decoded {
            Ok((id, payload)) => decode_message(id, payload),
            Err(e) => Err(invalid_message(&e.to_string())),
        };
        if result.is_err() {
            abandon(handle).await;
        }
        result.map(Some)
    }

    async fn acknowledge(&mut self, handle: &mut Client, message: &QueueMessage) -> Result<(), ConnectorError> {
        let result = match handle.execute(&self.delete_sql, &[&message.id]).await {
            Ok(_) => handle.batch_execute("COMMIT").await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            abandon(handle).await;
            return Err(classify(&e, "ACK_FAILED", "Failed to acknowledge message"));
        }
        Ok(())
    }

    fn into_record(&self, message: QueueMessage) -> Record {
        message_record(message.payload)
    }
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
            user: "reader".into(),
            password: String::new(),
            database: "queue".into(),
            schema: "public".into(),
            timeout: Duration::from_secs(10),
        }
    }

    #[test]
    fn statements_target_queue_table() {
        let queue = PostgresQueue::new(config(), "pending").unwrap();
        assert!(queue.select_sql.contains("FOR UPDATE SKIP LOCKED"));
        assert!(queue.select_sql.contains("pending"));
        assert!(queue.delete_sql.starts_with("DELETE FROM"));
    }

    #[test]
    fn invalid_table_rejected() {
        let err = PostgresQueue::new(config(), "pending; DROP").err().unwrap();
        assert!(err.is_fatal());
    }

    #[test]
    fn null_payload_is_fatal() {
        let err = decode_message(4, None).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(err.code, "INVALID_MESSAGE");
        assert_eq!(err.details, Some(json!({"id": 4})));
        assert_eq!(
            decode_message(5, Some("ok-1".into())).unwrap(),
            QueueMessage {
                id: 5,
                payload: "ok-1".into()
            }
        );
    }

    #[test]
    fn undecodable_row_is_fatal() {
        let err = invalid_message("error deserializing column 1");
        assert!(err.is_fatal());
        assert!(err.message.contains("error deserializing column 1"));
    }

    #[test]
    fn record_wraps_payload() {
        let queue = PostgresQueue::new(config(), "pending").unwrap();
        let record = queue.into_record(QueueMessage {
            id: 7,
            payload: "{\"a\":1}".into(),
        });
        assert_eq!(record["message"], json!("{\"a\":1}"));
    }
}
