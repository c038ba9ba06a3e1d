use artifact::ArtifactError;
use index::PersistenceError;

use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to load documents: {0:#}")]
    Load(anyhow::Error),

    #[error("Failed to build model client: {0:#}")]
    Client(anyhow::Error),

    #[error("Extraction failed for all {failed} documents")]
    AllExtractionsFailed { failed: usize },

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("Failed to connect to graph database: {0:#}")]
    Connect(anyhow::Error),

    #[error("Failed to prepare graph schema: {0:#}")]
    Schema(anyhow::Error),

    #[error("{0} (resume with GRAPH_RESUME_FROM={index})", index = .0.index)]
    Persistence(#[from] PersistenceError),
}
