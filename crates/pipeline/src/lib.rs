pub mod config;
pub mod error;
pub mod report;
pub mod retry;
pub mod stages;

pub use config::{ConfigError, PipelineConfig};
pub use error::PipelineError;
pub use retry::{Retrying, RetryPolicy};
pub use stages::{ExtractionOutcome, UpsertOutcome, run_extraction, run_upsert};

use extract::{ChatClient, Extractor, LlmGraphTransformer};
use index::{MemoryStore, Neo4jStore};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber; `RUST_LOG` overrides the default `info` level.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Extractor backed by the configured chat model, with retries per document.
pub fn build_llm_extractor(
    config: &PipelineConfig,
) -> Result<Extractor<Retrying<LlmGraphTransformer>>, PipelineError> {
    let api_key = config.require_model()?;

    let client = ChatClient::new(
        config.model.endpoint.clone(),
        api_key.to_string(),
        config.model.name.clone(),
        Duration::from_secs(config.retry.request_timeout_secs),
    )
    .map_err(PipelineError::Client)?;

    let transformer = LlmGraphTransformer::new(client);
    let policy = extraction_policy(config, transformer.max_requests_per_document());
    Ok(Extractor::new(Retrying::new(transformer, policy)))
}

/// The request timeout bounds a single HTTP call; one extraction attempt may
/// make several, so its budget is scaled accordingly.
fn extraction_policy(config: &PipelineConfig, requests_per_attempt: usize) -> RetryPolicy {
    let policy = RetryPolicy::from_config(&config.retry);
    let requests = u32::try_from(requests_per_attempt.max(1)).unwrap_or(u32::MAX);
    policy.with_attempt_timeout(policy.attempt_timeout().saturating_mul(requests))
}

pub async fn connect_neo4j(config: &PipelineConfig) -> anyhow::Result<Neo4jStore> {
    let (uri, user, password) = config.require_graph_db()?;
    Neo4jStore::connect(uri, user, password).await
}

/// Run the upsert stage against Neo4j, or an in-memory graph on dry runs.
pub async fn upsert_configured(config: &PipelineConfig) -> Result<UpsertOutcome, PipelineError> {
    if config.dry_run {
        run_upsert(config, || async { Ok(MemoryStore::new()) }).await
    } else {
        run_upsert(config, || connect_neo4j(config)).await
    }
}
