use anyhow::{Context, Result};
use async_trait::async_trait;
use ingest::Document;

use crate::llm::ChatClient;
use crate::normalizer::normalize_graph;
use crate::prompt;
use crate::schema::{GraphDocument, RawGraph};

/// Text-to-graph extraction capability.
///
/// Implementations may be non-deterministic; callers impose no schema on
/// the node and relationship types returned.
#[async_trait]
pub trait GraphTransformer: Send + Sync {
    async fn convert(&self, document: &Document) -> Result<GraphDocument>;
}

/// Graph extraction backed by a chat-completions model.
pub struct LlmGraphTransformer {
    client: ChatClient,
    max_json_attempts: usize,
}

impl LlmGraphTransformer {
    pub fn new(client: ChatClient) -> Self {
        Self {
            client,
            max_json_attempts: 3,
        }
    }

    pub fn with_max_json_attempts(mut self, max_json_attempts: usize) -> Self {
        self.max_json_attempts = max_json_attempts;
        self
    }

    /// Upper bound on HTTP requests for one document: every invalid answer
    /// but the last is followed by a correction request.
    pub fn max_requests_per_document(&self) -> usize {
        2 * self.max_json_attempts.max(1) - 1
    }
}

#[async_trait]
impl GraphTransformer for LlmGraphTransformer {
    async fn convert(&self, document: &Document) -> Result<GraphDocument> {
        let messages = prompt::build_messages(&document.text);

        let json_str = self.client
            .generate_json_with_retry(&messages, self.max_json_attempts)
            .await
            .context("Failed to extract graph after retries")?;

        parse_graph_response(&json_str, document.clone())
    }
}

/// Parse a model response into a formatted [`GraphDocument`] for `source`.
pub fn parse_graph_response(json_str: &str, source: Document) -> Result<GraphDocument> {
    let raw: RawGraph = serde_json::from_str(json_str)
        .context("Failed to parse extraction result")?;

    let (nodes, relationships) = normalize_graph(raw);
    Ok(GraphDocument::new(nodes, relationships, source))
}
