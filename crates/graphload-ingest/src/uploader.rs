//! Run orchestration
//!
//! One run uploads every node type, waits for all of them, then uploads every
//! edge type. Edge inserts look endpoints up by node properties, so the node
//! phase must be complete before the first edge is sent.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::config::UploaderConfig;
use crate::executor::{EntityPlan, UploadContext, UploadSummary};
use crate::progress::{ProgressCounters, ProgressSnapshot};
use crate::scheduler::run_phase;
use crate::schema::GraphSchema;
use crate::sink::ErrorSink;
use crate::store::GraphStore;

/// Totals of one phase (all node types, or all edge types)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhaseSummary {
    pub inserted: u64,
    pub existing: u64,
    pub failed: u64,
    /// Entity types that completed, in completion order
    pub types: Vec<UploadSummary>,
}

impl PhaseSummary {
    fn new(counts: ProgressSnapshot, types: Vec<UploadSummary>) -> Self {
        Self {
            inserted: counts.inserted,
            existing: counts.existing,
            failed: types.iter().map(|t| t.failed).sum(),
            types,
        }
    }

    pub fn entity(&self, name: &str) -> Option<&UploadSummary> {
        self.types.iter().find(|t| t.entity == name)
    }
}

/// Outcome of a whole run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub nodes: PhaseSummary,
    pub edges: PhaseSummary,
    /// Messages written to the error log
    pub errors: usize,
    pub error_log: PathBuf,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Graph uploaded in {:.1}s: {} nodes inserted ({} existing), {} edges inserted ({} existing)",
            self.elapsed.as_secs_f64(),
            self.nodes.inserted,
            self.nodes.existing,
            self.edges.inserted,
            self.edges.existing
        )?;
        if self.errors > 0 {
            write!(
                f,
                ". There were {} errors, see {}",
                self.errors,
                self.error_log.display()
            )?;
        }
        Ok(())
    }
}

/// Uploads a graph schema's data into a store
pub struct Uploader<'a, S: ?Sized> {
    store: &'a S,
    config: &'a UploaderConfig,
    counters: ProgressCounters,
    sink: ErrorSink,
}

impl<'a, S> Uploader<'a, S>
where
    S: GraphStore + ?Sized,
{
    /// Uploader without terminal status output
    pub fn new(store: &'a S, config: &'a UploaderConfig) -> Self {
        Self {
            store,
            config,
            counters: ProgressCounters::hidden(),
            sink: ErrorSink::new(),
        }
    }

    /// Show a live "Uploaded N ..." status line while running
    pub fn with_status_line(mut self) -> Self {
        self.counters = ProgressCounters::with_status_line();
        self
    }

    /// Upload all node types, then all edge types, then write the error log
    pub async fn run(&self, schema: &GraphSchema) -> Result<RunSummary> {
        let run_id = Uuid::new_v4();
        let span = info_span!("upload_run", %run_id);
        self.run_inner(run_id, schema).instrument(span).await
    }

    async fn run_inner(&self, run_id: Uuid, schema: &GraphSchema) -> Result<RunSummary> {
        let started_at = Utc::now();
        let clock = Instant::now();
        let ctx = UploadContext {
            store: self.store,
            counters: &self.counters,
            sink: &self.sink,
            profile: self.config.profile(),
            retry: self.config.retry,
        };

        info!("Starting node upload");
        self.counters.set_noun("nodes");
        let node_plans: Vec<EntityPlan<'_>> = schema.nodes().map(EntityPlan::Node).collect();
        let node_types = run_phase(&ctx, node_plans, self.config.max_tasks).await;
        let nodes = PhaseSummary::new(self.counters.reset(), node_types);
        info!(
            inserted = nodes.inserted,
            existing = nodes.existing,
            failed = nodes.failed,
            "Uploaded nodes"
        );

        info!("Starting edge upload");
        self.counters.set_noun("edges");
        let edge_plans = schema
            .edges()
            .map(|edge| EntityPlan::edge(schema, edge))
            .collect::<Result<Vec<_>>>()?;
        let edge_types = run_phase(&ctx, edge_plans, self.config.max_tasks).await;
        self.counters.finish();
        let edges = PhaseSummary::new(self.counters.reset(), edge_types);
        info!(
            inserted = edges.inserted,
            existing = edges.existing,
            failed = edges.failed,
            "Uploaded edges"
        );

        let error_log = self.config.error_log_path.clone();
        self.sink
            .flush_to(&error_log)
            .with_context(|| format!("Failed to write error log '{}'", error_log.display()))?;

        Ok(RunSummary {
            run_id,
            started_at,
            elapsed: clock.elapsed(),
            nodes,
            edges,
            errors: self.sink.len(),
            error_log,
        })
    }
}
