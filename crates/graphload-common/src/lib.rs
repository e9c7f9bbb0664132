//! Graphload Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared error handling and logging setup for the graphload workspace.
//!
//! - **Error Handling**: [`GraphLoadError`] for fatal setup failures
//! - **Logging**: `tracing` subscriber initialisation driven by [`logging::LogConfig`]
//!
//! # Example
//!
//! ```no_run
//! use graphload_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_logging(&LogConfig::from_env()?)?;
//!     tracing::info!("ready");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{GraphLoadError, Result};
