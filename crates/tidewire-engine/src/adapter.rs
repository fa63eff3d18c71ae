//! Backend adapter capability contract.
//!
//! An adapter knows how to talk to exactly one backend. It never lets a
//! backend library error escape: every failure is mapped to a
//! [`ConnectorError`] of the right kind at the adapter boundary.

use tidewire_types::{ConnectorError, Record};

/// Connection establishment and teardown for one backend.
#[allow(async_fn_in_trait)]
pub trait Adapter {
    /// Live connection state. Owned by [`ConnectionLifecycle`](crate::ConnectionLifecycle).
    type Handle;

    /// Short backend name used in log fields.
    fn name(&self) -> &str;

    /// Open a new connection.
    ///
    /// # Errors
    ///
    /// Fatal for unrecoverable setup problems (bad credentials, bad
    /// configuration), recoverable for transient network or setup failures.
    async fn connect(&mut self) -> Result<Self::Handle, ConnectorError>;

    /// Close a connection. Best-effort: teardown failures are swallowed.
    async fn disconnect(&mut self, handle: Self::Handle);
}

/// Queue-style inbound backend: records are pulled and acknowledged one at a time.
///
/// Once acknowledged, a message is gone from the backend.
#[allow(async_fn_in_trait)]
pub trait PullAdapter: Adapter {
    type Message;

    /// Pull the next message, or `None` when the backend has nothing available.
    ///
    /// # Errors
    ///
    /// Recoverable on any backend failure.
    async fn fetch_one(
        &mut self,
        handle: &mut Self::Handle,
    ) -> Result<Option<Self::Message>, ConnectorError>;

    /// Acknowledge a pulled message so the backend discards it.
    ///
    /// # Errors
    ///
    /// Recoverable on any backend failure; the message is then not spent.
    async fn acknowledge(
        &mut self,
        handle: &mut Self::Handle,
        message: &Self::Message,
    ) -> Result<(), ConnectorError>;

    /// Convert an acknowledged message into the record handed to the caller.
    fn into_record(&self, message: Self::Message) -> Record;
}

/// Query-style inbound backend: one call returns a full result set.
#[allow(async_fn_in_trait)]
pub trait QueryAdapter: Adapter {
    /// # Errors
    ///
    /// Fatal for malformed queries or missing schema objects, recoverable for
    /// transient failures.
    async fn query(&mut self, handle: &mut Self::Handle) -> Result<Vec<Record>, ConnectorError>;
}

/// Outbound backend writing one record per call.
#[allow(async_fn_in_trait)]
pub trait SinkAdapter: Adapter {
    /// # Errors
    ///
    /// Fatal for malformed input or schema problems, recoverable for transient
    /// write failures.
    async fn put_one(&mut self, handle: &mut Self::Handle, record: &Record)
        -> Result<(), ConnectorError>;
}
