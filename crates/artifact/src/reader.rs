use extract::{GraphDocument, Node, Relationship};
use ingest::Document;
use std::collections::HashMap;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

use crate::error::{ArtifactError, Result};
use crate::record::GraphRecord;

/// Read the artifact at `path` and rebuild its GraphDocuments.
pub async fn read_artifact(path: &Path) -> Result<Vec<GraphDocument>> {
    let json = match fs::read_to_string(path).await {
        Ok(json) => json,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ArtifactError::Missing(path.to_path_buf()));
        }
        Err(source) => {
            return Err(ArtifactError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let records: Vec<GraphRecord> = serde_json::from_str(&json).map_err(|source| ArtifactError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let documents = reconstruct(records);
    info!(path = %path.display(), documents = documents.len(), "Loaded graph artifact");
    Ok(documents)
}

/// Rebuild GraphDocuments from artifact records.
///
/// Relationship endpoints resolve against the record's own nodes. An id with
/// no matching node becomes a placeholder `Entity` node with no properties.
pub fn reconstruct(records: Vec<GraphRecord>) -> Vec<GraphDocument> {
    records.into_iter().map(reconstruct_record).collect()
}

fn reconstruct_record(record: GraphRecord) -> GraphDocument {
    let node_map: HashMap<&str, &Node> = record
        .nodes
        .iter()
        .map(|node| (node.id.as_str(), node))
        .collect();

    let resolve = |id: &str| -> Node {
        match node_map.get(id) {
            Some(node) => (*node).clone(),
            None => {
                debug!(id, "Relationship endpoint not among nodes, using placeholder");
                Node::placeholder(id)
            }
        }
    };

    let relationships = record
        .relationships
        .into_iter()
        .map(|rel| Relationship {
            source: resolve(&rel.source),
            target: resolve(&rel.target),
            rel_type: rel.rel_type,
            properties: rel.properties,
        })
        .collect();

    GraphDocument::new(
        record.nodes,
        relationships,
        Document::new(String::new(), record.source),
    )
}
