//! Graphload - bulk graph upload tool

use anyhow::{Context, Result};
use clap::Parser;
use graphload_common::logging::{init_logging, LogConfig, LogLevel};
use graphload_ingest::config::{parse_delimiter, parse_quote, UploaderConfig};
use graphload_ingest::schema::GraphSchema;
use graphload_ingest::store::gremlin::GremlinHttpStore;
use graphload_ingest::store::memory::InMemoryGraphStore;
use graphload_ingest::store::GraphStore;
use graphload_ingest::uploader::Uploader;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "graphload")]
#[command(author, version, about = "Upload node and edge files into a graph store")]
struct Cli {
    /// Graph config file describing node and edge types
    #[arg(short, long)]
    graph_config: Option<PathBuf>,

    /// Gremlin Server HTTP endpoint
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Maximum number of entity types uploaded at once
    #[arg(long)]
    max_tasks: Option<usize>,

    /// File collecting per-record upload errors
    #[arg(long)]
    error_log: Option<PathBuf>,

    /// Field delimiter of the data files (`tab` or a single character)
    #[arg(long)]
    delimiter: Option<String>,

    /// Text qualifier of the data files (a single character, or `none`)
    #[arg(long)]
    quote: Option<String>,

    /// Insert attempts per record on transport failure
    #[arg(long)]
    insert_attempts: Option<u32>,

    /// Upload into an in-memory store instead of the endpoint
    #[arg(long)]
    dry_run: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn apply(&self, config: &mut UploaderConfig) -> Result<()> {
        if let Some(path) = &self.graph_config {
            config.graph_config_file = path.clone();
        }
        if let Some(endpoint) = &self.endpoint {
            config.store.endpoint = endpoint.clone();
        }
        if let Some(max_tasks) = self.max_tasks {
            config.max_tasks = max_tasks;
        }
        if let Some(path) = &self.error_log {
            config.error_log_path = path.clone();
        }
        if let Some(delimiter) = &self.delimiter {
            config.delimiter = parse_delimiter(delimiter)?;
        }
        if let Some(quote) = &self.quote {
            config.quote = parse_quote(quote)?;
        }
        if let Some(attempts) = self.insert_attempts {
            config.retry.max_attempts = attempts;
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence over the flag
    let log_config = LogConfig::builder().level(log_level).build().merge_env()?;
    let _guard = init_logging(&log_config)?;

    let mut config = UploaderConfig::load()?;
    cli.apply(&mut config)?;
    config.validate()?;

    let schema = GraphSchema::from_file(&config.graph_config_file).with_context(|| {
        format!(
            "Failed to load graph config '{}'",
            config.graph_config_file.display()
        )
    })?;
    info!(
        nodes = schema.nodes().count(),
        edges = schema.edges().count(),
        "Loaded graph config"
    );

    let store: Box<dyn GraphStore> = if cli.dry_run {
        warn!("Dry run: uploading into an in-memory store");
        Box::new(InMemoryGraphStore::new())
    } else {
        let store = GremlinHttpStore::new(&config.store)?;
        store
            .ping()
            .await
            .with_context(|| format!("Cannot reach graph store at {}", store.endpoint()))?;
        info!(endpoint = %store.endpoint(), "Connected to graph store");
        Box::new(store)
    };

    let summary = Uploader::new(store.as_ref(), &config)
        .with_status_line()
        .run(&schema)
        .await?;

    for entity in summary.nodes.types.iter().chain(summary.edges.types.iter()) {
        info!("{}", entity);
    }
    info!(run_id = %summary.run_id, "{}", summary);
    Ok(())
}
