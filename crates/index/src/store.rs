use anyhow::Result;
use async_trait::async_trait;
use extract::{Node, Relationship};
use ingest::Document;
use serde::Serialize;

/// Label added to every extracted node when a common index is requested.
pub const BASE_ENTITY_LABEL: &str = "__Entity__";

/// Label of the node representing a source document.
pub const DOCUMENT_LABEL: &str = "Document";

/// Relationship type linking a source document to the nodes it mentions.
pub const MENTIONS: &str = "MENTIONS";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistOptions {
    /// Tag every node with [`BASE_ENTITY_LABEL`] and merge on it.
    pub base_entity_label: bool,
    /// Link every node to a node for its source document.
    pub include_source: bool,
}

impl Default for PersistOptions {
    fn default() -> Self {
        Self {
            base_entity_label: true,
            include_source: true,
        }
    }
}

/// Additive, merge-based graph database writes.
///
/// Conflict resolution on duplicate ids or relationships belongs to the
/// backing database.
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn init_schema(&self, options: &PersistOptions) -> Result<()>;

    async fn merge_node(&self, node: &Node, options: &PersistOptions) -> Result<()>;

    /// Merge a relationship, creating missing endpoint nodes.
    async fn merge_relationship(
        &self,
        relationship: &Relationship,
        options: &PersistOptions,
    ) -> Result<()>;

    /// Merge the source document node and link it to `nodes`.
    async fn merge_source_document(
        &self,
        document_id: &str,
        source: &Document,
        nodes: &[Node],
        options: &PersistOptions,
    ) -> Result<()>;

    async fn stats(&self) -> Result<GraphStats>;
}

#[async_trait]
impl<S: GraphStore + ?Sized> GraphStore for std::sync::Arc<S> {
    async fn init_schema(&self, options: &PersistOptions) -> Result<()> {
        (**self).init_schema(options).await
    }

    async fn merge_node(&self, node: &Node, options: &PersistOptions) -> Result<()> {
        (**self).merge_node(node, options).await
    }

    async fn merge_relationship(
        &self,
        relationship: &Relationship,
        options: &PersistOptions,
    ) -> Result<()> {
        (**self).merge_relationship(relationship, options).await
    }

    async fn merge_source_document(
        &self,
        document_id: &str,
        source: &Document,
        nodes: &[Node],
        options: &PersistOptions,
    ) -> Result<()> {
        (**self).merge_source_document(document_id, source, nodes, options).await
    }

    async fn stats(&self) -> Result<GraphStats> {
        (**self).stats().await
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub entity_count: usize,
    pub relation_count: usize,
    pub document_count: usize,
}
