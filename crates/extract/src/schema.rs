use ingest::Document;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Free-form properties attached to nodes and relationships.
pub type Properties = BTreeMap<String, serde_json::Value>;

/// Type given to nodes synthesized for unresolved relationship endpoints.
pub const PLACEHOLDER_TYPE: &str = "Entity";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub properties: Properties,
}

impl Node {
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            properties: Properties::new(),
        }
    }

    pub fn with_property(mut self, key: &str, value: serde_json::Value) -> Self {
        self.properties.insert(key.to_string(), value);
        self
    }

    /// Generic node standing in for an endpoint that was never defined.
    pub fn placeholder(id: impl Into<String>) -> Self {
        Self::new(id, PLACEHOLDER_TYPE)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    pub source: Node,
    pub target: Node,
    pub rel_type: String,
    pub properties: Properties,
}

impl Relationship {
    pub fn new(source: Node, target: Node, rel_type: impl Into<String>) -> Self {
        Self {
            source,
            target,
            rel_type: rel_type.into(),
            properties: Properties::new(),
        }
    }
}

/// Nodes and relationships extracted from one source document.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphDocument {
    pub nodes: Vec<Node>,
    pub relationships: Vec<Relationship>,
    pub source: Document,
}

impl GraphDocument {
    pub fn new(nodes: Vec<Node>, relationships: Vec<Relationship>, source: Document) -> Self {
        Self {
            nodes,
            relationships,
            source,
        }
    }
}

/// Graph shape the model is asked to return.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawGraph {
    #[serde(default)]
    pub nodes: Vec<RawNode>,
    #[serde(default)]
    pub relationships: Vec<RawRelationship>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawNode {
    #[serde(default)]
    pub id: serde_json::Value,
    #[serde(rename = "type", default)]
    pub node_type: Option<String>,
    #[serde(default)]
    pub properties: Option<Properties>,
}

/// Any field may be absent or null; such relationships are dropped later
/// rather than failing the whole response.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRelationship {
    #[serde(default)]
    pub source_node_id: serde_json::Value,
    #[serde(default)]
    pub source_node_type: Option<String>,
    #[serde(default)]
    pub target_node_id: serde_json::Value,
    #[serde(default)]
    pub target_node_type: Option<String>,
    #[serde(rename = "type", default)]
    pub rel_type: Option<String>,
    #[serde(default)]
    pub properties: Option<Properties>,
}
