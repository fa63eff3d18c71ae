//! InfluxDB v2 sink.
//!
//! Each record describes one point: `measurement`, `fields` and optional
//! `tags`, `time` and `write_precision`. Points are written with the HTTP
//! `/api/v2/write` endpoint in line protocol.

pub mod config;
pub mod point;
pub mod sink;

pub use config::InfluxConfig;
pub use point::{Point, Precision};
pub use sink::InfluxSink;
