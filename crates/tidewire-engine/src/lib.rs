//! Resilient-operation engine for tidewire connectors.
//!
//! A connector pairs a backend [`adapter`] with a [`lifecycle`] controller
//! that owns the connection handle. Every caller-facing call runs through
//! [`retry::execute`], which reconnects before retrying recoverable failures
//! and stops immediately on fatal ones. Queue sources additionally use the
//! [`accumulator`] so acknowledged records survive a mid-batch failure.

pub mod accumulator;
pub mod adapter;
pub mod config;
pub mod connector;
pub mod lifecycle;
pub mod retry;
pub mod shared;

pub use adapter::{Adapter, PullAdapter, QueryAdapter, SinkAdapter};
pub use config::{Settings, Variables};
pub use connector::{Destination, QuerySource, QueueSource, Sink, Source};
pub use lifecycle::{ConnectionLifecycle, ConnectionState};
pub use retry::{execute, Operation, Outcome};
pub use shared::Shared;
pub use tidewire_types::{ConnectorError, ErrorKind, Record, RetryPolicy};
