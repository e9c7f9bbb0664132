//! In-process graph store
//!
//! Follows the same match semantics as the Gremlin adapter: an edge insert
//! creates one edge per (source, destination) pair of matching vertices and
//! returns nothing when either side matches no vertex. Every call is appended
//! to an operation log so callers can inspect what was sent and in which
//! order. Used for `--dry-run` and tests.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use super::{ElementKind, EndpointMatch, GraphStore, InsertResult, StoreError};

/// A request received by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Query {
        kind: ElementKind,
        label: String,
    },
    InsertNode {
        label: String,
        properties: Vec<(String, String)>,
    },
    InsertEdge {
        label: String,
        source: EndpointMatch,
        destination: EndpointMatch,
        properties: Vec<(String, String)>,
    },
}

#[derive(Debug, Clone)]
struct Vertex {
    label: String,
    properties: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
struct Edge {
    label: String,
    properties: BTreeMap<String, String>,
}

#[derive(Debug, Default)]
struct State {
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    operations: Vec<Operation>,
    rejected_labels: HashSet<String>,
    unavailable_for: usize,
}

impl State {
    fn take_outage(&mut self) -> Result<(), StoreError> {
        if self.unavailable_for > 0 {
            self.unavailable_for -= 1;
            return Err(StoreError::Status {
                code: 503,
                message: "store unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn matching(&self, endpoint: &EndpointMatch) -> usize {
        self.vertices
            .iter()
            .filter(|v| v.properties.get(&endpoint.attribute) == Some(&endpoint.value))
            .count()
    }
}

#[derive(Debug, Default)]
pub struct InMemoryGraphStore {
    state: Mutex<State>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Inserts with this label are answered with zero returned elements
    pub fn reject_label(&self, label: impl Into<String>) {
        self.lock().rejected_labels.insert(label.into());
    }

    /// Fail the next `requests` calls with a 503 status
    pub fn fail_next_requests(&self, requests: usize) {
        self.lock().unavailable_for = requests;
    }

    /// Add a vertex directly, bypassing the operation log
    pub fn seed_vertex(&self, label: &str, properties: &[(&str, &str)]) {
        self.lock().vertices.push(Vertex {
            label: label.to_string(),
            properties: properties
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        });
    }

    pub fn operations(&self) -> Vec<Operation> {
        self.lock().operations.clone()
    }

    pub fn vertex_count(&self, label: &str) -> usize {
        self.lock().vertices.iter().filter(|v| v.label == label).count()
    }

    pub fn edge_count(&self, label: &str) -> usize {
        self.lock().edges.iter().filter(|e| e.label == label).count()
    }

    /// Property maps of all vertices with a label
    pub fn vertices(&self, label: &str) -> Vec<BTreeMap<String, String>> {
        self.lock()
            .vertices
            .iter()
            .filter(|v| v.label == label)
            .map(|v| v.properties.clone())
            .collect()
    }

    /// Property maps of all edges with a label
    pub fn edges(&self, label: &str) -> Vec<BTreeMap<String, String>> {
        self.lock()
            .edges
            .iter()
            .filter(|e| e.label == label)
            .map(|e| e.properties.clone())
            .collect()
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.lock().take_outage()
    }

    async fn existing_identities(
        &self,
        kind: ElementKind,
        label: &str,
    ) -> Result<Vec<String>, StoreError> {
        let mut state = self.lock();
        state.take_outage()?;
        state.operations.push(Operation::Query {
            kind,
            label: label.to_string(),
        });

        let key = kind.identity_key();
        let properties: Vec<&BTreeMap<String, String>> = match kind {
            ElementKind::Vertex => state
                .vertices
                .iter()
                .filter(|v| v.label == label)
                .map(|v| &v.properties)
                .collect(),
            ElementKind::Edge => state
                .edges
                .iter()
                .filter(|e| e.label == label)
                .map(|e| &e.properties)
                .collect(),
        };

        Ok(properties
            .into_iter()
            .filter_map(|p| p.get(key).cloned())
            .collect())
    }

    async fn insert_node(
        &self,
        label: &str,
        properties: &[(String, String)],
    ) -> Result<InsertResult, StoreError> {
        let mut state = self.lock();
        state.take_outage()?;
        state.operations.push(Operation::InsertNode {
            label: label.to_string(),
            properties: properties.to_vec(),
        });

        if state.rejected_labels.contains(label) {
            return Ok(InsertResult::new(0));
        }

        state.vertices.push(Vertex {
            label: label.to_string(),
            properties: properties.iter().cloned().collect(),
        });
        Ok(InsertResult::new(1))
    }

    async fn insert_edge(
        &self,
        label: &str,
        source: &EndpointMatch,
        destination: &EndpointMatch,
        properties: &[(String, String)],
    ) -> Result<InsertResult, StoreError> {
        let mut state = self.lock();
        state.take_outage()?;
        state.operations.push(Operation::InsertEdge {
            label: label.to_string(),
            source: source.clone(),
            destination: destination.clone(),
            properties: properties.to_vec(),
        });

        if state.rejected_labels.contains(label) {
            return Ok(InsertResult::new(0));
        }

        let created = state.matching(source) * state.matching(destination);
        for _ in 0..created {
            state.edges.push(Edge {
                label: label.to_string(),
                properties: properties.iter().cloned().collect(),
            });
        }
        Ok(InsertResult::new(created))
    }
}
