//! PostgreSQL adapters.
//!
//! - [`PostgresQuery`]: runs a configured query and returns every row.
//! - [`PostgresQueue`]: pulls rows from a queue table one at a time, deleting
//!   each as its acknowledgement.
//! - [`PostgresSink`]: inserts one record per call into a table.

mod client;
pub mod config;
mod identifier;
pub mod query;
pub mod queue;
pub mod sink;

pub use config::Config;
pub use query::PostgresQuery;
pub use queue::PostgresQueue;
pub use sink::PostgresSink;
