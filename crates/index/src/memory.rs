use anyhow::Result;
use async_trait::async_trait;
use extract::{Node, Properties, Relationship};
use ingest::Document;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use crate::store::{BASE_ENTITY_LABEL, GraphStats, GraphStore, PersistOptions};

/// Key a node is merged on: the merge label and the node id.
pub type NodeKey = (String, String);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredNode {
    pub labels: BTreeSet<String>,
    pub properties: Properties,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryGraph {
    pub nodes: BTreeMap<NodeKey, StoredNode>,
    /// (source key, relationship type, target key) -> properties
    pub relationships: BTreeMap<(NodeKey, String, NodeKey), Properties>,
    pub documents: BTreeMap<String, BTreeMap<String, String>>,
    pub mentions: BTreeSet<(String, NodeKey)>,
    /// Every merge call, in order, including repeats of the same id.
    pub node_merges: Vec<String>,
    pub relationship_merges: Vec<(String, String, String)>,
}

/// In-process store with the same merge semantics as the Neo4j store.
///
/// Backs dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    graph: Mutex<MemoryGraph>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current graph.
    pub fn snapshot(&self) -> MemoryGraph {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryGraph> {
        // A panic while holding the lock cannot leave a merge half-applied
        self.graph.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn merge_key(node: &Node, options: &PersistOptions) -> NodeKey {
    let label = if options.base_entity_label {
        BASE_ENTITY_LABEL.to_string()
    } else {
        node.node_type.clone()
    };
    (label, node.id.clone())
}

fn merge_endpoint(graph: &mut MemoryGraph, node: &Node, options: &PersistOptions) -> NodeKey {
    let key = merge_key(node, options);
    graph.nodes.entry(key.clone()).or_insert_with(|| StoredNode {
        labels: [key.0.clone(), node.node_type.clone()].into_iter().collect(),
        properties: Properties::new(),
    });
    key
}

#[async_trait]
impl GraphStore for MemoryStore {
    async fn init_schema(&self, _options: &PersistOptions) -> Result<()> {
        Ok(())
    }

    async fn merge_node(&self, node: &Node, options: &PersistOptions) -> Result<()> {
        let mut graph = self.lock();
        let key = merge_key(node, options);

        let stored = graph.nodes.entry(key.clone()).or_default();
        stored.labels.insert(key.0);
        stored.labels.insert(node.node_type.clone());
        stored.properties.extend(
            node.properties
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), v.clone())),
        );

        graph.node_merges.push(node.id.clone());
        Ok(())
    }

    async fn merge_relationship(
        &self,
        relationship: &Relationship,
        options: &PersistOptions,
    ) -> Result<()> {
        let mut graph = self.lock();
        let source = merge_endpoint(&mut graph, &relationship.source, options);
        let target = merge_endpoint(&mut graph, &relationship.target, options);

        graph
            .relationships
            .entry((source, relationship.rel_type.clone(), target))
            .or_default()
            .extend(
                relationship
                    .properties
                    .iter()
                    .filter(|(_, v)| !v.is_null())
                    .map(|(k, v)| (k.clone(), v.clone())),
            );

        graph.relationship_merges.push((
            relationship.source.id.clone(),
            relationship.rel_type.clone(),
            relationship.target.id.clone(),
        ));
        Ok(())
    }

    async fn merge_source_document(
        &self,
        document_id: &str,
        source: &Document,
        nodes: &[Node],
        options: &PersistOptions,
    ) -> Result<()> {
        let mut graph = self.lock();
        graph
            .documents
            .entry(document_id.to_string())
            .or_default()
            .extend(source.metadata.clone());

        for node in nodes {
            let key = merge_key(node, options);
            if graph.nodes.contains_key(&key) {
                graph.mentions.insert((document_id.to_string(), key));
            }
        }
        Ok(())
    }

    async fn stats(&self) -> Result<GraphStats> {
        let graph = self.lock();
        Ok(GraphStats {
            entity_count: graph.nodes.len(),
            relation_count: graph.relationships.len(),
            document_count: graph.documents.len(),
        })
    }
}
