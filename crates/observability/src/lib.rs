//! Tracing and logging setup shared by the binaries and tests.

pub mod tracing;

pub use self::tracing::{LogFormat, LoggingConfig, init};
