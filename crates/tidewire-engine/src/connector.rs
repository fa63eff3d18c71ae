//! Caller-facing connector surfaces.
//!
//! Each connector owns a [`ConnectionLifecycle`] (never a global) and routes
//! every call through [`retry::execute`](crate::retry::execute).

use tidewire_types::{ConnectorError, Record, RetryPolicy};

use crate::accumulator::PullBatch;
use crate::adapter::{Adapter, PullAdapter, QueryAdapter, SinkAdapter};
use crate::config::Settings;
use crate::lifecycle::ConnectionLifecycle;
use crate::retry::{execute, Operation, Outcome};

/// Inbound connector lifecycle.
#[allow(async_fn_in_trait)]
pub trait Source {
    /// Retrieve one batch of records.
    ///
    /// # Errors
    ///
    /// Fatal errors immediately; recoverable errors once retries are exhausted
    /// and nothing has been acknowledged.
    async fn retrieve(&mut self) -> Result<Vec<Record>, ConnectorError>;

    /// Release the connection. Safe to call at any time, never fails.
    async fn stop(&mut self);
}

/// Outbound connector lifecycle.
#[allow(async_fn_in_trait)]
pub trait Destination {
    /// Write one record.
    ///
    /// # Errors
    ///
    /// Fatal errors immediately; recoverable errors once retries are exhausted.
    async fn insert(&mut self, record: &Record) -> Result<(), ConnectorError>;

    /// Release the connection. Safe to call at any time, never fails.
    async fn stop(&mut self);
}

/// Inbound connector over a pull/acknowledge backend.
pub struct QueueSource<A: PullAdapter> {
    lifecycle: ConnectionLifecycle<A>,
    policy: RetryPolicy,
    max_batch_size: usize,
}

impl<A: PullAdapter> QueueSource<A> {
    pub fn new(adapter: A, settings: &Settings) -> Self {
        Self {
            lifecycle: ConnectionLifecycle::new(adapter),
            policy: settings.retry,
            max_batch_size: settings.max_batch_size,
        }
    }

    pub fn lifecycle(&self) -> &ConnectionLifecycle<A> {
        &self.lifecycle
    }
}

impl<A: PullAdapter> Source for QueueSource<A> {
    async fn retrieve(&mut self) -> Result<Vec<Record>, ConnectorError> {
        let mut operation = PullBatch::new(self.max_batch_size);
        execute(&mut self.lifecycle, &self.policy, &mut operation).await
    }

    async fn stop(&mut self) {
        self.lifecycle.disconnect().await;
    }
}

struct RunQuery;

impl<A: QueryAdapter> Operation<A> for RunQuery {
    type Output = Vec<Record>;

    fn name(&self) -> &'static str {
        "retrieve"
    }

    async fn run(
        &mut self,
        adapter: &mut A,
        handle: &mut A::Handle,
    ) -> Result<Outcome<Vec<Record>>, ConnectorError> {
        let records = adapter.query(handle).await?;
        tracing::info!(
            backend = adapter.name(),
            rows = records.len(),
            "Retrieved {} rows",
            records.len()
        );
        Ok(Outcome::Complete(records))
    }
}

/// Inbound connector over a query backend. A result set is read-only at the
/// backend, so a failed query is simply retried whole.
pub struct QuerySource<A: QueryAdapter> {
    lifecycle: ConnectionLifecycle<A>,
    policy: RetryPolicy,
}

impl<A: QueryAdapter> QuerySource<A> {
    pub fn new(adapter: A, settings: &Settings) -> Self {
        Self {
            lifecycle: ConnectionLifecycle::new(adapter),
            policy: settings.retry,
        }
    }

    pub fn lifecycle(&self) -> &ConnectionLifecycle<A> {
        &self.lifecycle
    }
}

impl<A: QueryAdapter> Source for QuerySource<A> {
    async fn retrieve(&mut self) -> Result<Vec<Record>, ConnectorError> {
        execute(&mut self.lifecycle, &self.policy, &mut RunQuery).await
    }

    async fn stop(&mut self) {
        self.lifecycle.disconnect().await;
    }
}

struct PutRecord<'r> {
    record: &'r Record,
}

impl<A: SinkAdapter> Operation<A> for PutRecord<'_> {
    type Output = ();

    fn name(&self) -> &'static str {
        "insert"
    }

    async fn run(
        &mut self,
        adapter: &mut A,
        handle: &mut A::Handle,
    ) -> Result<Outcome<()>, ConnectorError> {
        adapter.put_one(handle, self.record).await?;
        Ok(Outcome::Complete(()))
    }
}

/// Outbound connector writing one record per call.
///
/// No buffering and no deduplication: a retried insert after a recoverable
/// failure may duplicate a write the backend had already committed.
pub struct Sink<A: SinkAdapter> {
    lifecycle: ConnectionLifecycle<A>,
    policy: RetryPolicy,
}

impl<A: SinkAdapter> Sink<A> {
    pub fn new(adapter: A, settings: &Settings) -> Self {
        Self {
            lifecycle: ConnectionLifecycle::new(adapter),
            policy: settings.retry,
        }
    }

    pub fn lifecycle(&self) -> &ConnectionLifecycle<A> {
        &self.lifecycle
    }
}

impl<A: SinkAdapter> Destination for Sink<A> {
    async fn insert(&mut self, record: &Record) -> Result<(), ConnectorError> {
        execute(&mut self.lifecycle, &self.policy, &mut PutRecord { record }).await
    }

    async fn stop(&mut self) {
        self.lifecycle.disconnect().await;
    }
}

/// Connect once and disconnect again, without retries.
///
/// # Errors
///
/// Returns the adapter's connect error.
pub async fn check_connection<A: Adapter>(adapter: A) -> Result<(), ConnectorError> {
    let mut lifecycle = ConnectionLifecycle::new(adapter);
    let result = lifecycle.ensure_connected().await.map(|_| ());
    lifecycle.disconnect().await;
    result
}
