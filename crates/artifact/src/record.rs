use extract::{GraphDocument, Node, Properties};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One GraphDocument as stored in the artifact file.
///
/// Relationship endpoints are stored as bare ids and the source document
/// keeps only its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphRecord {
    pub nodes: Vec<Node>,
    pub relationships: Vec<RelationshipRecord>,
    pub source: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipRecord {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub rel_type: String,
    #[serde(default)]
    pub properties: Properties,
}

impl From<&GraphDocument> for GraphRecord {
    fn from(document: &GraphDocument) -> Self {
        Self {
            nodes: document.nodes.clone(),
            relationships: document
                .relationships
                .iter()
                .map(|rel| RelationshipRecord {
                    source: rel.source.id.clone(),
                    target: rel.target.id.clone(),
                    rel_type: rel.rel_type.clone(),
                    properties: rel.properties.clone(),
                })
                .collect(),
            source: document.source.metadata.clone(),
        }
    }
}
