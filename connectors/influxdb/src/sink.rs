//! Line-protocol writes over HTTP.

use reqwest::StatusCode;
use tidewire_engine::{Adapter, SinkAdapter, Variables};
use tidewire_types::{ConnectorError, Record};

use crate::config::InfluxConfig;
use crate::point::Point;

/// Writes one point per record to `BUCKET`.
///
/// The HTTP client is the connection handle; it is rebuilt after a
/// recoverable write failure.
pub struct InfluxSink {
    config: InfluxConfig,
    write_url: String,
}

impl InfluxSink {
    pub fn new(config: InfluxConfig) -> Self {
        Self {
            write_url: config.write_url(),
            config,
        }
    }

    /// # Errors
    ///
    /// Fatal config error for missing or invalid variables.
    pub fn from_variables(vars: &Variables) -> Result<Self, ConnectorError> {
        InfluxConfig::from_variables(vars).map(Self::new)
    }
}

impl Adapter for InfluxSink {
    type Handle = reqwest::Client;

    fn name(&self) -> &str {
        "influxdb"
    }

    async fn connect(&mut self) -> Result<reqwest::Client, ConnectorError> {
        reqwest::Client::builder()
            .timeout(self.config.timeout)
            .build()
            .map_err(|e| {
                ConnectorError::config(
                    "CLIENT_BUILD_FAILED",
                    format!("Failed to build HTTP client: {e}"),
                )
            })
    }

    async fn disconnect(&mut self, handle: reqwest::Client) {
        drop(handle);
    }
}

impl SinkAdapter for InfluxSink {
    async fn put_one(
        &mut self,
        handle: &mut reqwest::Client,
        record: &Record,
    ) -> Result<(), ConnectorError> {
        let point = Point::from_record(record)?;
        let response = handle
            .post(&self.write_url)
            .query(&[
                ("org", self.config.organization.as_str()),
                ("bucket", self.config.bucket.as_str()),
                ("precision", point.precision.as_str()),
            ])
            .header("Authorization", format!("Token {}", self.config.token))
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(point.to_line())
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        let status = response.status();
        if status.is_success() {
            tracing::info!(measurement = %point.measurement, "Data inserted successfully");
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, body.trim()))
    }
}

fn transport_error(err: &reqwest::Error) -> ConnectorError {
    let message = format!("Failed to insert data: {err}");
    if err.is_timeout() {
        ConnectorError::timeout("WRITE_TIMEOUT", message)
    } else if err.is_connect() {
        ConnectorError::connection("CONNECT_FAILED", message)
    } else {
        ConnectorError::network("WRITE_FAILED", message)
    }
}

/// Rate limiting and server errors are retried; any other rejection is fatal.
fn status_error(status: StatusCode, body: &str) -> ConnectorError {
    let message = if body.is_empty() {
        format!("Failed to insert data: HTTP {status}")
    } else {
        format!("Failed to insert data: HTTP {status}: {body}")
    };
    match status.as_u16() {
        429 | 500..=599 => ConnectorError::backend("WRITE_REJECTED", message),
        401 | 403 => ConnectorError::auth("UNAUTHORIZED", message),
        404 => ConnectorError::schema("BUCKET_NOT_FOUND", message),
        400 | 413 | 422 => ConnectorError::data("INVALID_POINT", message),
        _ => ConnectorError::internal("WRITE_REJECTED", message),
    }
}
