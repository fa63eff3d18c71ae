//! Connector selection by name.
//!
//! Connector traits use `async fn`, so dispatch goes through enums rather
//! than trait objects.

use clap::ValueEnum;
use connector_blob::BlobSink;
use connector_influxdb::InfluxSink;
use connector_postgres::{PostgresQuery, PostgresQueue, PostgresSink};
use tidewire_engine::{
    ConnectorError, Destination, QuerySource, QueueSource, Record, Settings, Sink, Source,
    Variables,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    PostgresQuery,
    PostgresQueue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DestinationKind {
    Postgres,
    Blob,
    Influxdb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConnectorKind {
    PostgresQuery,
    PostgresQueue,
    Postgres,
    Blob,
    Influxdb,
}

impl SourceKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::PostgresQuery => "postgres-query",
            Self::PostgresQueue => "postgres-queue",
        }
    }
}

impl DestinationKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Blob => "blob",
            Self::Influxdb => "influxdb",
        }
    }
}

impl ConnectorKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::PostgresQuery => SourceKind::PostgresQuery.name(),
            Self::PostgresQueue => SourceKind::PostgresQueue.name(),
            Self::Postgres => DestinationKind::Postgres.name(),
            Self::Blob => DestinationKind::Blob.name(),
            Self::Influxdb => DestinationKind::Influxdb.name(),
        }
    }
}

/// Listing for the `connectors` command: name, direction, description.
pub const CATALOG: &[(&str, &str, &str)] = &[
    (
        "postgres-query",
        "Source",
        "Run QUERY in SCHEMA and return every row",
    ),
    (
        "postgres-queue",
        "Source",
        "Pull up to MAX_OUTPUT messages from QUEUE_TABLE, deleting each as it is acknowledged",
    ),
    ("postgres", "Destination", "Insert each record into TABLE"),
    (
        "blob",
        "Destination",
        "Upload the file named by each record's 'blob' field to PROVIDER",
    ),
    (
        "influxdb",
        "Destination",
        "Write each record as one line-protocol point to BUCKET",
    ),
];

pub enum AnySource {
    Query(QuerySource<PostgresQuery>),
    Queue(QueueSource<PostgresQueue>),
}

impl AnySource {
    pub fn from_variables(kind: SourceKind, vars: &Variables) -> Result<Self, ConnectorError> {
        let settings = Settings::from_variables(vars)?;
        Ok(match kind {
            SourceKind::PostgresQuery => {
                Self::Query(QuerySource::new(PostgresQuery::from_variables(vars)?, &settings))
            }
            SourceKind::PostgresQueue => {
                Self::Queue(QueueSource::new(PostgresQueue::from_variables(vars)?, &settings))
            }
        })
    }
}

impl Source for AnySource {
    async fn retrieve(&mut self) -> Result<Vec<Record>, ConnectorError> {
        match self {
            Self::Query(source) => source.retrieve().await,
            Self::Queue(source) => source.retrieve().await,
        }
    }

    async fn stop(&mut self) {
        match self {
            Self::Query(source) => source.stop().await,
            Self::Queue(source) => source.stop().await,
        }
    }
}

pub enum AnyDestination {
    Postgres(Sink<PostgresSink>),
    Blob(Sink<BlobSink>),
    Influxdb(Sink<InfluxSink>),
}

impl AnyDestination {
    pub fn from_variables(kind: DestinationKind, vars: &Variables) -> Result<Self, ConnectorError> {
        let settings = Settings::from_variables(vars)?;
        Ok(match kind {
            DestinationKind::Postgres => {
                Self::Postgres(Sink::new(PostgresSink::from_variables(vars)?, &settings))
            }
            DestinationKind::Blob => Self::Blob(Sink::new(BlobSink::from_variables(vars)?, &settings)),
            DestinationKind::Influxdb => {
                Self::Influxdb(Sink::new(InfluxSink::from_variables(vars)?, &settings))
            }
        })
    }
}

impl Destination for AnyDestination {
    async fn insert(&mut self, record: &Record) -> Result<(), ConnectorError> {
        match self {
            Self::Postgres(sink) => sink.insert(record).await,
            Self::Blob(sink) => sink.insert(record).await,
            Self::Influxdb(sink) => sink.insert(record).await,
        }
    }

    async fn stop(&mut self) {
        match self {
            Self::Postgres(sink) => sink.stop().await,
            Self::Blob(sink) => sink.stop().await,
            Self::Influxdb(sink) => sink.stop().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_match_value_enum() {
        for kind in ConnectorKind::value_variants() {
            let value = kind.to_possible_value().unwrap();
            assert_eq!(value.get_name(), kind.name());
            assert!(CATALOG.iter().any(|(name, _, _)| *name == kind.name()));
        }
    }

    #[test]
    fn missing_settings_fail_before_connecting() {
        let vars = Variables::from_pairs([("PROVIDER", "local")]);
        let err = AnyDestination::from_variables(DestinationKind::Blob, &vars)
            .err()
            .unwrap();
        assert!(err.is_fatal());
        assert!(err.message.contains("ROOT"));
    }

    #[test]
    fn influxdb_requires_token() {
        let vars = Variables::from_pairs([("URL", "http://localhost:8086")]);
        let err = AnyDestination::from_variables(DestinationKind::Influxdb, &vars)
            .err()
            .unwrap();
        assert!(err.is_fatal());
        assert!(err.message.contains("TOKEN"));
    }
}
