pub mod memory;
pub mod neo4j_index;
pub mod store;

pub use memory::{MemoryGraph, MemoryStore};
pub use neo4j_index::Neo4jStore;
pub use store::{BASE_ENTITY_LABEL, DOCUMENT_LABEL, GraphStats, GraphStore, MENTIONS, PersistOptions};

use anyhow::Result;
use extract::GraphDocument;
use tracing::{info, warn};

/// A document whose write failed. `index` is 0-based; documents before it
/// are already written, so it is also the resume index.
#[derive(Debug, thiserror::Error)]
#[error("Failed to persist document {} ({source_id}): {error:#}", .index + 1)]
pub struct PersistenceError {
    pub index: usize,
    pub source_id: String,
    pub error: anyhow::Error,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct WriteStats {
    pub documents: usize,
    pub nodes: usize,
    pub relationships: usize,
    pub mentions: usize,
}

impl WriteStats {
    fn add(&mut self, other: WriteStats) {
        self.documents += other.documents;
        self.nodes += other.nodes;
        self.relationships += other.relationships;
        self.mentions += other.mentions;
    }
}

/// Writes GraphDocuments into a [`GraphStore`].
pub struct GraphPersister<S> {
    store: S,
    options: PersistOptions,
}

impl<S: GraphStore> GraphPersister<S> {
    pub fn new(store: S, options: PersistOptions) -> Self {
        Self { store, options }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn options(&self) -> &PersistOptions {
        &self.options
    }

    pub async fn init(&self) -> Result<()> {
        self.store.init_schema(&self.options).await
    }

    /// Upsert one document: nodes, then relationships, then the source link.
    pub async fn persist_document(&self, document: &GraphDocument) -> Result<WriteStats> {
        for node in &document.nodes {
            self.store.merge_node(node, &self.options).await?;
        }

        for relationship in &document.relationships {
            self.store.merge_relationship(relationship, &self.options).await?;
        }

        let mut mentions = 0;
        if self.options.include_source {
            self.store
                .merge_source_document(&document.source.id(), &document.source, &document.nodes, &self.options)
                .await?;
            mentions = document.nodes.len();
        }

        Ok(WriteStats {
            documents: 1,
            nodes: document.nodes.len(),
            relationships: document.relationships.len(),
            mentions,
        })
    }

    /// Upsert `documents` in order, starting at `start_index`.
    ///
    /// Stops at the first failing document; re-running with its index as
    /// `start_index` resumes the batch.
    pub async fn persist_all(
        &self,
        documents: &[GraphDocument],
        start_index: usize,
    ) -> std::result::Result<WriteStats, PersistenceError> {
        let total = documents.len();
        let mut stats = WriteStats::default();

        if start_index > 0 {
            info!(skipped = start_index.min(total), "Resuming upsert");
        }

        for (index, document) in documents.iter().enumerate().skip(start_index) {
            let source_id = document
                .source
                .source()
                .map(str::to_string)
                .unwrap_or_else(|| document.source.id());

            match self.persist_document(document).await {
                Ok(written) => {
                    info!(
                        document = index + 1,
                        total,
                        source = %source_id,
                        nodes = written.nodes,
                        relationships = written.relationships,
                        "Upserted document"
                    );
                    stats.add(written);
                }
                Err(error) => {
                    warn!(
                        document = index + 1,
                        total,
                        resume_from = index,
                        source = %source_id,
                        error = %error,
                        "Upsert failed"
                    );
                    return Err(PersistenceError { index, source_id, error });
                }
            }
        }

        Ok(stats)
    }

    pub async fn get_stats(&self) -> Result<GraphStats> {
        self.store.stats().await
    }
}
