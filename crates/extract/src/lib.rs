pub mod error;
pub mod llm;
pub mod normalizer;
pub mod prompt;
pub mod schema;
pub mod transformer;

pub use error::LlmError;
pub use llm::{ChatClient, Message, Role};
pub use schema::{GraphDocument, Node, PLACEHOLDER_TYPE, Properties, Relationship};
pub use transformer::{GraphTransformer, LlmGraphTransformer, parse_graph_response};

use anyhow::Result;
use futures_util::stream::{self, StreamExt};
use ingest::Document;
use tracing::{info, warn};

/// A document whose extraction failed; the rest of the batch continues.
#[derive(Debug)]
pub struct ExtractionFailure {
    pub index: usize,
    pub source: Option<String>,
    pub error: anyhow::Error,
}

#[derive(Debug, Default)]
pub struct ExtractionReport {
    /// Successful extractions, in input order.
    pub documents: Vec<GraphDocument>,
    pub failures: Vec<ExtractionFailure>,
}

impl ExtractionReport {
    pub fn node_count(&self) -> usize {
        self.documents.iter().map(|d| d.nodes.len()).sum()
    }

    pub fn relationship_count(&self) -> usize {
        self.documents.iter().map(|d| d.relationships.len()).sum()
    }
}

pub struct Extractor<T> {
    transformer: T,
}

impl<T: GraphTransformer> Extractor<T> {
    pub fn new(transformer: T) -> Self {
        Self { transformer }
    }

    pub fn transformer(&self) -> &T {
        &self.transformer
    }

    /// Extract the graph of a single document
    pub async fn extract_document(&self, document: &Document) -> Result<GraphDocument> {
        self.transformer.convert(document).await
    }

    /// Extract every document, isolating failures per document.
    ///
    /// At most `concurrency` extractions are in flight; results keep input order.
    pub async fn extract_all(&self, documents: &[Document], concurrency: usize) -> ExtractionReport {
        let total = documents.len();

        let results: Vec<(usize, Result<GraphDocument>)> = stream::iter(documents.iter().enumerate())
            .map(|(index, document)| async move {
                (index, self.extract_document(document).await)
            })
            .buffered(concurrency.max(1))
            .collect()
            .await;

        let mut report = ExtractionReport::default();

        for (index, result) in results {
            let source = documents[index].source().map(str::to_string);
            match result {
                Ok(graph) => {
                    info!(
                        document = index + 1,
                        total,
                        source = source.as_deref().unwrap_or("-"),
                        nodes = graph.nodes.len(),
                        relationships = graph.relationships.len(),
                        "Extracted graph"
                    );
                    report.documents.push(graph);
                }
                Err(error) => {
                    warn!(
                        document = index + 1,
                        total,
                        source = source.as_deref().unwrap_or("-"),
                        error = %error,
                        "Extraction failed, skipping document"
                    );
                    report.failures.push(ExtractionFailure { index, source, error });
                }
            }
        }

        report
    }
}
