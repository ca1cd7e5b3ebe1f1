//! tabload common library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Pieces shared across the tabload workspace. Today that is the logging
//! setup: one place that turns a [`logging::LogConfig`] into a global
//! `tracing` subscriber.
//!
//! # Example
//!
//! ```no_run
//! use tabload_common::logging::{init_logging, LogConfig, LogLevel};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = LogConfig::builder().level(LogLevel::Debug).build();
//!     let _guard = init_logging(&config)?;
//!     tracing::info!("ready");
//!     Ok(())
//! }
//! ```

pub mod logging;

pub use logging::{init_logging, LogConfig, LogFormat, LogGuard, LogLevel, LogOutput};
