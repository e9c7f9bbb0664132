//! Upload executor
//!
//! Uploads one entity type: builds its existence index, then walks every
//! record of every data file in order, inserting records whose identity is
//! not yet known. Record failures are returned as [`UploadOutcome::Failed`]
//! and never stop the loop.

use anyhow::{Context, Result};
use std::fmt;
use tracing::{debug, info, instrument, warn};

use crate::config::RetryPolicy;
use crate::error::RecordError;
use crate::existence::ExistenceIndex;
use crate::identity::{check_arity, compute_identity, resolve_endpoint_key};
use crate::progress::ProgressCounters;
use crate::reader::{list_data_files, Record, TabularProfile};
use crate::schema::{EdgeType, EntityType, GraphSchema, NodeType};
use crate::sink::ErrorSink;
use crate::store::{ElementKind, EndpointMatch, GraphStore, InsertResult, Properties, StoreError};

/// Result of processing a single record
#[derive(Debug)]
pub enum UploadOutcome {
    Inserted,
    AlreadyExists,
    Failed {
        reason: RecordError,
        values: Vec<String>,
    },
}

/// Tallies for one entity type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadSummary {
    pub entity: String,
    pub files: usize,
    pub records: u64,
    pub inserted: u64,
    pub existing: u64,
    pub failed: u64,
}

impl UploadSummary {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            ..Self::default()
        }
    }

    fn tally(&mut self, outcome: &UploadOutcome) {
        self.records += 1;
        match outcome {
            UploadOutcome::Inserted => self.inserted += 1,
            UploadOutcome::AlreadyExists => self.existing += 1,
            UploadOutcome::Failed { .. } => self.failed += 1,
        }
    }
}

impl fmt::Display for UploadSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} records in {} files, {} inserted, {} existing, {} failed",
            self.entity, self.records, self.files, self.inserted, self.existing, self.failed
        )
    }
}

/// State shared by every upload task of a run
pub struct UploadContext<'a, S: ?Sized> {
    pub store: &'a S,
    pub counters: &'a ProgressCounters,
    pub sink: &'a ErrorSink,
    pub profile: TabularProfile,
    pub retry: RetryPolicy,
}

impl<S: ?Sized> UploadContext<'_, S> {
    /// Feed an outcome into the shared counters or the error sink
    fn apply(&self, entity: &str, outcome: &UploadOutcome) {
        match outcome {
            UploadOutcome::Inserted => self.counters.record_inserted(),
            UploadOutcome::AlreadyExists => self.counters.record_existing(),
            UploadOutcome::Failed { reason, values } => {
                self.sink.record_failure(entity, reason, values)
            },
        }
    }
}

/// Insert request built from one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedInsert {
    pub identity: String,
    pub properties: Properties,
    /// Source and destination matches, for edges
    pub endpoints: Option<(EndpointMatch, EndpointMatch)>,
}

/// How records of one entity type map onto store elements
#[derive(Debug, Clone)]
pub enum EntityPlan<'a> {
    Node(&'a NodeType),
    Edge {
        edge: &'a EdgeType,
        source: &'a NodeType,
        destination: &'a NodeType,
    },
}

impl<'a> EntityPlan<'a> {
    /// Plan for an edge type, resolving its endpoint node types
    pub fn edge(schema: &'a GraphSchema, edge: &'a EdgeType) -> Result<Self> {
        let (source, destination) = schema.endpoints(edge)?;
        Ok(EntityPlan::Edge {
            edge,
            source,
            destination,
        })
    }

    pub fn entity(&self) -> &'a EntityType {
        match *self {
            EntityPlan::Node(node) => &node.entity,
            EntityPlan::Edge { edge, .. } => &edge.entity,
        }
    }

    pub fn name(&self) -> &'a str {
        &self.entity().name
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            EntityPlan::Node(_) => ElementKind::Vertex,
            EntityPlan::Edge { .. } => ElementKind::Edge,
        }
    }

    /// Label the elements are stored under
    pub fn label(&self) -> String {
        match self {
            EntityPlan::Node(node) => node.name().to_string(),
            EntityPlan::Edge { edge, .. } => edge.label(),
        }
    }

    /// Build the identity and insert payload for a record
    pub fn prepare(&self, record: &Record) -> Result<PreparedInsert, RecordError> {
        let entity = self.entity();
        check_arity(entity, record)?;

        let identity = compute_identity(entity, record)?;

        let mut properties: Properties = entity
            .attributes
            .iter()
            .zip(record.fields.iter())
            .map(|(attribute, value)| (attribute.clone(), value.clone()))
            .collect();
        properties.push((self.kind().identity_key().to_string(), identity.clone()));

        let endpoints = match self {
            EntityPlan::Node(_) => None,
            EntityPlan::Edge {
                edge,
                source,
                destination,
            } => {
                let source_attribute = edge.source_attribute(source);
                let destination_attribute = edge.destination_attribute(destination);
                Some((
                    EndpointMatch::new(
                        &source.identity_attribute,
                        resolve_endpoint_key(entity, source_attribute, record)?,
                    ),
                    EndpointMatch::new(
                        &destination.identity_attribute,
                        resolve_endpoint_key(entity, destination_attribute, record)?,
                    ),
                ))
            },
        };

        Ok(PreparedInsert {
            identity,
            properties,
            endpoints,
        })
    }
}

/// Send an insert, re-sending on transport failure as the retry policy allows
async fn submit<S>(
    ctx: &UploadContext<'_, S>,
    label: &str,
    prepared: &PreparedInsert,
) -> Result<InsertResult, StoreError>
where
    S: GraphStore + ?Sized,
{
    let mut attempt = 1;
    loop {
        let result = match &prepared.endpoints {
            None => ctx.store.insert_node(label, &prepared.properties).await,
            Some((source, destination)) => {
                ctx.store
                    .insert_edge(label, source, destination, &prepared.properties)
                    .await
            },
        };

        match result {
            Err(e) if attempt < ctx.retry.max_attempts => {
                warn!(
                    identity = %prepared.identity,
                    attempt,
                    error = %e,
                    "Insert failed, retrying"
                );
                attempt += 1;
                tokio::time::sleep(ctx.retry.delay()).await;
            },
            other => return other,
        }
    }
}

async fn try_upload<S>(
    ctx: &UploadContext<'_, S>,
    plan: &EntityPlan<'_>,
    label: &str,
    index: &mut ExistenceIndex,
    record: &Record,
) -> Result<UploadOutcome, RecordError>
where
    S: GraphStore + ?Sized,
{
    let prepared = plan.prepare(record)?;

    if index.contains(&prepared.identity) {
        return Ok(UploadOutcome::AlreadyExists);
    }

    let result = submit(ctx, label, &prepared).await?;
    if !result.created() {
        return Err(RecordError::InsertRejected(plan.kind().noun()));
    }

    index.insert(prepared.identity);
    Ok(UploadOutcome::Inserted)
}

/// Process one record against the existence index
pub async fn upload_record<S>(
    ctx: &UploadContext<'_, S>,
    plan: &EntityPlan<'_>,
    label: &str,
    index: &mut ExistenceIndex,
    record: &Record,
) -> UploadOutcome
where
    S: GraphStore + ?Sized,
{
    match try_upload(ctx, plan, label, index, record).await {
        Ok(outcome) => outcome,
        Err(reason) => UploadOutcome::Failed {
            reason,
            values: record.fields.clone(),
        },
    }
}

/// Upload every record of one entity type
///
/// Fails only when the type as a whole cannot be processed: the existence
/// index cannot be fetched or the data directory cannot be listed.
#[instrument(skip_all, fields(entity = %plan.name()))]
pub async fn upload_entity<S>(ctx: &UploadContext<'_, S>, plan: &EntityPlan<'_>) -> Result<UploadSummary>
where
    S: GraphStore + ?Sized,
{
    let entity = plan.entity();
    let label = plan.label();
    let mut summary = UploadSummary::new(&entity.name);

    let mut index = ExistenceIndex::build(ctx.store, plan.kind(), &label)
        .await
        .with_context(|| format!("Failed to fetch existing identities for '{}'", entity.name))?;

    let files = list_data_files(&entity.data_dir).with_context(|| {
        format!("Failed to list data directory '{}'", entity.data_dir.display())
    })?;

    if files.is_empty() {
        warn!(dir = %entity.data_dir.display(), "No data files found");
    }

    for path in files {
        let reader = match ctx.profile.open(&path) {
            Ok(reader) => reader,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Skipping unreadable data file");
                ctx.sink.push(format!(
                    "{} (cannot open '{}': {}) : []",
                    entity.name,
                    path.display(),
                    e
                ));
                continue;
            },
        };
        summary.files += 1;
        debug!(file = %path.display(), "Reading data file");

        for item in reader {
            let outcome = match item {
                Ok(record) => {
                    let outcome = upload_record(ctx, plan, &label, &mut index, &record).await;
                    if let UploadOutcome::Failed { reason, .. } = &outcome {
                        debug!(file = %path.display(), line = record.line, error = %reason, "Record failed");
                    }
                    outcome
                },
                Err(reason) => UploadOutcome::Failed {
                    reason,
                    values: Vec::new(),
                },
            };

            ctx.apply(&entity.name, &outcome);
            summary.tally(&outcome);
        }
    }

    info!(
        inserted = summary.inserted,
        existing = summary.existing,
        failed = summary.failed,
        "Finished uploading {}",
        entity.name
    );

    Ok(summary)
}
