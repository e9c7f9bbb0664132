//! Graph schema: node and edge type declarations
//!
//! The graph config is a JSON document with a `nodes` and an `edges` list:
//!
//! ```json
//! {
//!   "nodes": [
//!     { "name": "Person", "pathToData": "data/person",
//!       "attributes": ["id", "name"], "primaryAttributes": ["id"],
//!       "identityAttribute": "id" }
//!   ],
//!   "edges": [
//!     { "name": "Knows", "pathToData": "data/knows",
//!       "attributes": ["id", "since"], "primaryAttributes": ["id", "since"],
//!       "sourceNode": "Person", "destinationNode": "Person" }
//!   ]
//! }
//! ```
//!
//! Relative `pathToData` values are resolved against the working directory.

use graphload_common::{GraphLoadError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Fields shared by node and edge declarations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityType {
    pub name: String,

    /// Directory holding the tab-separated data files for this entity
    #[serde(rename = "pathToData")]
    pub data_dir: PathBuf,

    /// Field names, in the positional order of the data files
    pub attributes: Vec<String>,

    /// Attributes that together form the entity's identity
    pub primary_attributes: BTreeSet<String>,
}

impl EntityType {
    pub fn new(
        name: impl Into<String>,
        data_dir: impl Into<PathBuf>,
        attributes: &[&str],
        primary_attributes: &[&str],
    ) -> Self {
        Self {
            name: name.into(),
            data_dir: data_dir.into(),
            attributes: attributes.iter().map(|a| a.to_string()).collect(),
            primary_attributes: primary_attributes.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Position of an attribute in the record layout
    pub fn position(&self, attribute: &str) -> Option<usize> {
        self.attributes.iter().position(|a| a == attribute)
    }

    pub fn is_primary(&self, attribute: &str) -> bool {
        self.primary_attributes.contains(attribute)
    }

    fn validate(&self, kind: &str) -> Result<()> {
        if self.name.is_empty() {
            return Err(GraphLoadError::schema(format!("{} with an empty name", kind)));
        }

        if self.attributes.is_empty() {
            return Err(GraphLoadError::schema(format!(
                "{} '{}' declares no attributes",
                kind, self.name
            )));
        }

        let unique: BTreeSet<&String> = self.attributes.iter().collect();
        if unique.len() != self.attributes.len() {
            return Err(GraphLoadError::schema(format!(
                "{} '{}' declares the same attribute twice",
                kind, self.name
            )));
        }

        if self.primary_attributes.is_empty() {
            return Err(GraphLoadError::schema(format!(
                "{} '{}' has no primary attributes",
                kind, self.name
            )));
        }

        if let Some(unknown) = self
            .primary_attributes
            .iter()
            .find(|p| self.position(p).is_none())
        {
            return Err(GraphLoadError::schema(format!(
                "{} '{}' primary attribute '{}' is not a declared attribute",
                kind, self.name, unknown
            )));
        }

        Ok(())
    }
}

/// A vertex type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeType {
    #[serde(flatten)]
    pub entity: EntityType,

    /// Attribute edges use to locate this node
    #[serde(alias = "nodeIdAttribute")]
    pub identity_attribute: String,
}

impl NodeType {
    pub fn new(entity: EntityType, identity_attribute: impl Into<String>) -> Self {
        Self {
            entity,
            identity_attribute: identity_attribute.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.entity.name
    }
}

/// A directed edge type between two node types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeType {
    #[serde(flatten)]
    pub entity: EntityType,

    pub source_node: String,

    pub destination_node: String,

    /// Stored edge label; defaults to the source and destination names joined
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Edge attribute carrying the source key; defaults to the source node's identity attribute
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_attribute: Option<String>,

    /// Edge attribute carrying the destination key; defaults to the destination node's identity attribute
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_attribute: Option<String>,
}

impl EdgeType {
    pub fn new(
        entity: EntityType,
        source_node: impl Into<String>,
        destination_node: impl Into<String>,
    ) -> Self {
        Self {
            entity,
            source_node: source_node.into(),
            destination_node: destination_node.into(),
            label: None,
            source_attribute: None,
            destination_attribute: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.entity.name
    }

    pub fn label(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| format!("{}{}", self.source_node, self.destination_node))
    }

    pub fn source_attribute<'a>(&'a self, source: &'a NodeType) -> &'a str {
        self.source_attribute
            .as_deref()
            .unwrap_or(&source.identity_attribute)
    }

    pub fn destination_attribute<'a>(&'a self, destination: &'a NodeType) -> &'a str {
        self.destination_attribute
            .as_deref()
            .unwrap_or(&destination.identity_attribute)
    }
}

#[derive(Debug, Deserialize)]
struct GraphConfig {
    #[serde(default)]
    nodes: Vec<NodeType>,
    #[serde(default)]
    edges: Vec<EdgeType>,
}

/// Validated set of node and edge types, keyed by name
#[derive(Debug, Clone, Default)]
pub struct GraphSchema {
    nodes: BTreeMap<String, NodeType>,
    edges: BTreeMap<String, EdgeType>,
}

impl GraphSchema {
    /// Build and validate a schema
    pub fn new(nodes: Vec<NodeType>, edges: Vec<EdgeType>) -> Result<Self> {
        let mut schema = Self::default();

        for node in nodes {
            node.entity.validate("node")?;
            if node.entity.position(&node.identity_attribute).is_none() {
                return Err(GraphLoadError::schema(format!(
                    "node '{}' identity attribute '{}' is not a declared attribute",
                    node.name(),
                    node.identity_attribute
                )));
            }

            let name = node.name().to_string();
            if schema.nodes.insert(name.clone(), node).is_some() {
                return Err(GraphLoadError::schema(format!("duplicate node '{}'", name)));
            }
        }

        for edge in edges {
            edge.entity.validate("edge")?;

            let (source, destination) = schema.endpoints(&edge)?;
            for attribute in [
                edge.source_attribute(source),
                edge.destination_attribute(destination),
            ] {
                if edge.entity.position(attribute).is_none() {
                    return Err(GraphLoadError::schema(format!(
                        "edge '{}' has no attribute '{}' to locate its endpoint",
                        edge.name(),
                        attribute
                    )));
                }
            }

            let name = edge.name().to_string();
            if schema.edges.insert(name.clone(), edge).is_some() {
                return Err(GraphLoadError::schema(format!("duplicate edge '{}'", name)));
            }
        }

        Ok(schema)
    }

    /// Parse a graph config document
    pub fn from_json(json: &str) -> Result<Self> {
        let config: GraphConfig = serde_json::from_str(json)?;
        Self::new(config.nodes, config.edges)
    }

    /// Read and parse a graph config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            GraphLoadError::config(format!(
                "cannot read graph config '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&text)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeType> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &EdgeType> {
        self.edges.values()
    }

    pub fn node(&self, name: &str) -> Option<&NodeType> {
        self.nodes.get(name)
    }

    pub fn edge(&self, name: &str) -> Option<&EdgeType> {
        self.edges.get(name)
    }

    /// Resolve an edge's source and destination node types
    pub fn endpoints(&self, edge: &EdgeType) -> Result<(&NodeType, &NodeType)> {
        let lookup = |name: &str| {
            self.nodes.get(name).ok_or_else(|| {
                GraphLoadError::schema(format!(
                    "edge '{}' references unknown node '{}'",
                    edge.name(),
                    name
                ))
            })
        };

        Ok((lookup(&edge.source_node)?, lookup(&edge.destination_node)?))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"{
        "nodes": [
            { "name": "Person", "pathToData": "data/person",
              "attributes": ["id", "name"], "primaryAttributes": ["id"],
              "nodeIdAttribute": "id" },
            { "name": "City", "pathToData": "data/city",
              "attributes": ["code", "label"], "primaryAttributes": ["code"],
              "identityAttribute": "code" }
        ],
        "edges": [
            { "name": "LivesIn", "pathToData": "data/lives_in",
              "attributes": ["id", "code", "since"], "primaryAttributes": ["id", "code"],
              "sourceNode": "Person", "destinationNode": "City" }
        ]
    }"#;

    fn person() -> NodeType {
        NodeType::new(
            EntityType::new("Person", "data/person", &["id", "name"], &["id"]),
            "id",
        )
    }

    #[test]
    fn test_parse_graph_config() {
        let schema = GraphSchema::from_json(CONFIG).unwrap();

        let person = schema.node("Person").unwrap();
        assert_eq!(person.identity_attribute, "id");
        assert_eq!(person.entity.data_dir, PathBuf::from("data/person"));

        let edge = schema.edge("LivesIn").unwrap();
        assert_eq!(edge.label(), "PersonCity");
        let (source, destination) = schema.endpoints(edge).unwrap();
        assert_eq!(edge.source_attribute(source), "id");
        assert_eq!(edge.destination_attribute(destination), "code");
    }

    #[test]
    fn test_primary_attribute_must_be_declared() {
        let node = NodeType::new(
            EntityType::new("Person", "p", &["id", "name"], &["ssn"]),
            "id",
        );
        let err = GraphSchema::new(vec![node], vec![]).unwrap_err();
        assert!(err.to_string().contains("'ssn'"));
    }

    #[test]
    fn test_primary_attributes_required() {
        let node = NodeType::new(EntityType::new("Person", "p", &["id"], &[]), "id");
        assert!(GraphSchema::new(vec![node], vec![]).is_err());
    }

    #[test]
    fn test_identity_attribute_must_be_declared() {
        let node = NodeType::new(EntityType::new("Person", "p", &["id"], &["id"]), "uuid");
        assert!(GraphSchema::new(vec![node], vec![]).is_err());
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let err = GraphSchema::new(vec![person(), person()], vec![]).unwrap_err();
        assert!(err.to_string().contains("duplicate node"));
    }

    #[test]
    fn test_edge_unknown_endpoint_rejected() {
        let edge = EdgeType::new(
            EntityType::new("Owns", "o", &["id", "tag"], &["id", "tag"]),
            "Person",
            "Pet",
        );
        let err = GraphSchema::new(vec![person()], vec![edge]).unwrap_err();
        assert!(err.to_string().contains("unknown node 'Pet'"));
    }

    #[test]
    fn test_edge_endpoint_attribute_overrides() {
        let mut edge = EdgeType::new(
            EntityType::new("Knows", "k", &["from", "to"], &["from", "to"]),
            "Person",
            "Person",
        );
        assert!(GraphSchema::new(vec![person()], vec![edge.clone()]).is_err());

        edge.source_attribute = Some("from".to_string());
        edge.destination_attribute = Some("to".to_string());
        edge.label = Some("knows".to_string());
        let schema = GraphSchema::new(vec![person()], vec![edge]).unwrap();

        let edge = schema.edge("Knows").unwrap();
        let (source, destination) = schema.endpoints(edge).unwrap();
        assert_eq!(edge.source_attribute(source), "from");
        assert_eq!(edge.destination_attribute(destination), "to");
        assert_eq!(edge.label(), "knows");
    }

    #[test]
    fn test_missing_config_file() {
        let err = GraphSchema::from_file("/nonexistent/graph.json").unwrap_err();
        assert!(matches!(err, GraphLoadError::Config(_)));
    }
}
