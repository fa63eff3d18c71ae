//! Shared tidewire types: the connector error taxonomy, records and retry policy.
//!
//! This crate has no runtime dependencies so that both the engine and every
//! connector crate can depend on it.

pub mod error;
pub mod policy;
pub mod record;

pub use error::{CommitState, ConnectorError, ErrorCategory, ErrorKind};
pub use policy::{Backoff, RetryPolicy, DEFAULT_MAX_ATTEMPTS};
pub use record::Record;
