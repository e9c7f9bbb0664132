//! Graph store abstraction
//!
//! The ingestion engine talks to the store only through [`GraphStore`]:
//! one identity query per entity type, then one insert per new record.

pub mod gremlin;
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::identity::{EDGE_IDENTITY_KEY, NODE_IDENTITY_KEY};

/// Property name/value pairs of an element, in declaration order
pub type Properties = Vec<(String, String)>;

/// Kind of graph element an entity type maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Vertex,
    Edge,
}

impl ElementKind {
    /// Property holding the internal identity for this kind
    pub fn identity_key(self) -> &'static str {
        match self {
            ElementKind::Vertex => NODE_IDENTITY_KEY,
            ElementKind::Edge => EDGE_IDENTITY_KEY,
        }
    }

    pub fn noun(self) -> &'static str {
        match self {
            ElementKind::Vertex => "node",
            ElementKind::Edge => "edge",
        }
    }
}

/// Locates an edge endpoint by one of the node's own properties
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointMatch {
    pub attribute: String,
    pub value: String,
}

impl EndpointMatch {
    pub fn new(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            value: value.into(),
        }
    }
}

/// Outcome of an insert request the store answered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InsertResult {
    /// Number of elements the store returned for the insert traversal
    pub returned: usize,
}

impl InsertResult {
    pub fn new(returned: usize) -> Self {
        Self { returned }
    }

    /// A response with no returned elements means nothing was created
    pub fn created(&self) -> bool {
        self.returned > 0
    }
}

/// Failure to talk to the store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("store answered with status {code}: {message}")]
    Status { code: u16, message: String },

    #[error("unexpected store response: {0}")]
    Decode(String),
}

/// Narrow interface onto a remote graph store
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Verify the session is usable before ingestion starts
    async fn ping(&self) -> Result<(), StoreError>;

    /// All internal identities currently stored for elements with this label
    async fn existing_identities(
        &self,
        kind: ElementKind,
        label: &str,
    ) -> Result<Vec<String>, StoreError>;

    async fn insert_node(
        &self,
        label: &str,
        properties: &[(String, String)],
    ) -> Result<InsertResult, StoreError>;

    /// Connect every node matching `source` to every node matching `destination`
    async fn insert_edge(
        &self,
        label: &str,
        source: &EndpointMatch,
        destination: &EndpointMatch,
        properties: &[(String, String)],
    ) -> Result<InsertResult, StoreError>;
}
