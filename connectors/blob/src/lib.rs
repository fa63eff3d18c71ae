//! Object storage sink.
//!
//! Each inserted record names a local file in its `blob` field; the file is
//! uploaded to `PATH_PREFIX/<file name>` in the configured store.

pub mod config;
mod error;
pub mod sink;

pub use config::{BlobConfig, Provider};
pub use sink::BlobSink;
