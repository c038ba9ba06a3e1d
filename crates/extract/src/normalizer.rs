use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

use crate::schema::{Node, PLACEHOLDER_TYPE, RawGraph, Relationship};

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Node ids are title-cased: "acme corp" -> "Acme Corp".
pub fn format_node_id(id: &str) -> String {
    let mut formatted = String::with_capacity(id.len());
    let mut previous_cased = false;

    for c in id.trim().chars() {
        if c.is_alphabetic() {
            if previous_cased {
                formatted.extend(c.to_lowercase());
            } else {
                formatted.extend(c.to_uppercase());
            }
            previous_cased = true;
        } else {
            formatted.push(c);
            previous_cased = false;
        }
    }

    formatted
}

/// Node types are capitalized: "ORGANIZATION" -> "Organization".
pub fn format_node_type(node_type: &str) -> String {
    let mut chars = node_type.trim().chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => PLACEHOLDER_TYPE.to_string(),
    }
}

/// Relationship types are upper snake case: "works at" -> "WORKS_AT".
pub fn format_relationship_type(rel_type: &str) -> String {
    WHITESPACE
        .replace_all(rel_type.trim(), "_")
        .to_uppercase()
}

fn value_to_id(value: &serde_json::Value) -> Option<String> {
    let id = match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        _ => return None,
    };
    let id = format_node_id(&id);
    (!id.is_empty()).then_some(id)
}

/// Turn the model's raw graph into formatted nodes and relationships.
///
/// Nodes without an id and relationships without endpoints or a type are
/// dropped. A relationship endpoint with no declared type borrows the type of
/// the node with the same id, or falls back to the placeholder type.
pub fn normalize_graph(raw: RawGraph) -> (Vec<Node>, Vec<Relationship>) {
    let mut nodes = Vec::with_capacity(raw.nodes.len());
    for raw_node in raw.nodes {
        let Some(id) = value_to_id(&raw_node.id) else {
            continue;
        };
        nodes.push(Node {
            id,
            node_type: format_node_type(raw_node.node_type.as_deref().unwrap_or_default()),
            properties: raw_node.properties.unwrap_or_default(),
        });
    }

    let known_types: HashMap<&str, &str> = nodes
        .iter()
        .map(|n| (n.id.as_str(), n.node_type.as_str()))
        .collect();

    let endpoint = |id: String, declared_type: &str| -> Node {
        let node_type = if declared_type.trim().is_empty() {
            known_types
                .get(id.as_str())
                .map(|t| t.to_string())
                .unwrap_or_else(|| PLACEHOLDER_TYPE.to_string())
        } else {
            format_node_type(declared_type)
        };
        Node::new(id, node_type)
    };

    let mut relationships = Vec::with_capacity(raw.relationships.len());
    for raw_rel in raw.relationships {
        let (Some(source_id), Some(target_id)) = (
            value_to_id(&raw_rel.source_node_id),
            value_to_id(&raw_rel.target_node_id),
        ) else {
            continue;
        };
        let rel_type = format_relationship_type(raw_rel.rel_type.as_deref().unwrap_or_default());
        if rel_type.is_empty() {
            continue;
        }

        relationships.push(Relationship {
            source: endpoint(source_id, raw_rel.source_node_type.as_deref().unwrap_or_default()),
            target: endpoint(target_id, raw_rel.target_node_type.as_deref().unwrap_or_default()),
            rel_type,
            properties: raw_rel.properties.unwrap_or_default(),
        });
    }

    (nodes, relationships)
}
