//! Graphload Ingest Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Bulk loader that pushes tab-separated node and edge files into a remote
//! graph store.
//!
//! # Pipeline
//!
//! - **Schema**: node and edge types read from a JSON graph config
//! - **Reader**: one field-array per line of every file in an entity's data directory
//! - **Identity**: composite internal key built from the primary attributes
//! - **Existence index**: identities already stored, fetched once per entity type
//! - **Scheduler**: bounded concurrency across entity types, nodes before edges
//! - **Executor**: per-record insert or skip, failures collected instead of raised
//!
//! # Example
//!
//! ```no_run
//! use graphload_ingest::config::UploaderConfig;
//! use graphload_ingest::schema::GraphSchema;
//! use graphload_ingest::store::memory::InMemoryGraphStore;
//! use graphload_ingest::uploader::Uploader;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = UploaderConfig::from_env()?;
//!     let schema = GraphSchema::from_file(&config.graph_config_file)?;
//!     let store = InMemoryGraphStore::new();
//!
//!     let summary = Uploader::new(&store, &config).run(&schema).await?;
//!     println!("{}", summary);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod existence;
pub mod identity;
pub mod progress;
pub mod reader;
pub mod scheduler;
pub mod schema;
pub mod sink;
pub mod store;
pub mod uploader;
