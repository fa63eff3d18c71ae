use anyhow::{bail, Result};
use connector_blob::BlobSink;
use connector_influxdb::InfluxSink;
use connector_postgres::{PostgresQuery, PostgresQueue, PostgresSink};
use tidewire_engine::connector::check_connection;
use tidewire_engine::{ConnectorError, Variables};

use crate::registry::ConnectorKind;

/// Execute the `check` command: validate configuration and connectivity.
pub async fn execute(kind: ConnectorKind) -> Result<()> {
    let vars = Variables::from_env();
    let result = check(kind, &vars).await;

    println!("{:18} {}", format!("{}:", kind.name()), status(&result));
    match result {
        Ok(()) => {
            println!("\nAll checks passed.");
            Ok(())
        }
        Err(e) => {
            println!("  {e}");
            bail!("Check failed for {}", kind.name())
        }
    }
}

async fn check(kind: ConnectorKind, vars: &Variables) -> Result<(), ConnectorError> {
    match kind {
        ConnectorKind::PostgresQuery => check_connection(PostgresQuery::from_variables(vars)?).await,
        ConnectorKind::PostgresQueue => check_connection(PostgresQueue::from_variables(vars)?).await,
        ConnectorKind::Postgres => check_connection(PostgresSink::from_variables(vars)?).await,
        ConnectorKind::Blob => check_connection(BlobSink::from_variables(vars)?).await,
        ConnectorKind::Influxdb => check_connection(InfluxSink::from_variables(vars)?).await,
    }
}

fn status(result: &Result<(), ConnectorError>) -> &'static str {
    match result {
        Ok(()) => "OK",
        Err(e) if e.is_recoverable() => "UNREACHABLE",
        Err(_) => "FAILED",
    }
}
