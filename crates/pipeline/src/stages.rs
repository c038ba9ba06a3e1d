use artifact::ArtifactError;
use extract::{ExtractionReport, Extractor, GraphTransformer};
use index::{GraphPersister, GraphStats, GraphStore, PersistOptions, WriteStats};
use ingest::{DocumentLoader, LoaderOptions};
use std::future::Future;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::report;
use crate::retry::{Retrying, RetryPolicy};

#[derive(Debug)]
pub struct ExtractionSummary {
    pub documents_loaded: usize,
    pub report: ExtractionReport,
    pub artifact: PathBuf,
}

#[derive(Debug)]
pub enum ExtractionOutcome {
    /// No matching input files; nothing was extracted or written.
    EmptyInput { input_dir: PathBuf },
    Completed(ExtractionSummary),
}

#[derive(Debug)]
pub struct UpsertSummary {
    pub documents_in_artifact: usize,
    pub resumed_from: usize,
    pub written: WriteStats,
    pub graph: Option<GraphStats>,
}

#[derive(Debug)]
pub enum UpsertOutcome {
    /// The artifact does not exist; the database was not touched.
    MissingArtifact(PathBuf),
    Completed(UpsertSummary),
}

pub fn loader_options(config: &PipelineConfig) -> LoaderOptions {
    LoaderOptions {
        extension: config.paths.extension.clone(),
        recursive: config.paths.recursive,
        silent_errors: false,
    }
}

pub fn persist_options(config: &PipelineConfig) -> PersistOptions {
    PersistOptions {
        base_entity_label: config.upsert.base_entity_label,
        include_source: config.upsert.include_source,
    }
}

/// Load documents, extract a graph from each and write the artifact.
pub async fn run_extraction<T: GraphTransformer>(
    config: &PipelineConfig,
    extractor: &Extractor<T>,
) -> Result<ExtractionOutcome, PipelineError> {
    let input_dir = &config.paths.input_dir;

    let documents = DocumentLoader::new(loader_options(config))
        .load_directory(input_dir)
        .await
        .map_err(PipelineError::Load)?;

    if documents.is_empty() {
        info!(input_dir = %input_dir.display(), "No input documents found");
        return Ok(ExtractionOutcome::EmptyInput {
            input_dir: input_dir.clone(),
        });
    }

    info!(documents = documents.len(), input_dir = %input_dir.display(), "Loaded documents");

    let report = extractor
        .extract_all(&documents, config.concurrency.max_concurrent_extractions)
        .await;

    if report.documents.is_empty() {
        return Err(PipelineError::AllExtractionsFailed {
            failed: report.failures.len(),
        });
    }

    artifact::write_artifact(&config.paths.artifact, &report.documents).await?;

    Ok(ExtractionOutcome::Completed(ExtractionSummary {
        documents_loaded: documents.len(),
        report,
        artifact: config.paths.artifact.clone(),
    }))
}

/// Read the artifact and upsert it into the store returned by `connect`.
///
/// `connect` is only called once the artifact has been read.
pub async fn run_upsert<S, F, Fut>(
    config: &PipelineConfig,
    connect: F,
) -> Result<UpsertOutcome, PipelineError>
where
    S: GraphStore,
    F: FnOnce() -> Fut,
    Fut: Future<Output = anyhow::Result<S>>,
{
    let documents = match artifact::read_artifact(&config.paths.artifact).await {
        Ok(documents) => documents,
        Err(ArtifactError::Missing(path)) => {
            info!(path = %path.display(), "Artifact not found");
            return Ok(UpsertOutcome::MissingArtifact(path));
        }
        Err(e) => return Err(e.into()),
    };
    report::print_upsert_started();

    let store = connect().await.map_err(PipelineError::Connect)?;
    let policy = RetryPolicy::from_config(&config.retry);
    let persister = GraphPersister::new(Retrying::new(store, policy), persist_options(config));

    persister.init().await.map_err(PipelineError::Schema)?;

    let resumed_from = config.upsert.resume_from;
    let written = persister.persist_all(&documents, resumed_from).await?;

    let graph = match persister.get_stats().await {
        Ok(stats) => Some(stats),
        Err(e) => {
            warn!(error = %e, "Failed to read graph statistics");
            None
        }
    };

    Ok(UpsertOutcome::Completed(UpsertSummary {
        documents_in_artifact: documents.len(),
        resumed_from,
        written,
        graph,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use extract::{GraphDocument, Node, Relationship};
    use index::{BASE_ENTITY_LABEL, MemoryStore};
    use ingest::Document;
    use serde_json::json;
    use std::path::Path;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Deterministic extraction keyed by file name.
    #[derive(Default)]
    struct FixedGraphs {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl GraphTransformer for FixedGraphs {
        async fn convert(&self, document: &Document) -> Result<GraphDocument> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let file_name = document
                .source()
                .and_then(|s| Path::new(s).file_name())
                .and_then(|n| n.to_str())
                .unwrap_or_default();

            let (person, rel_type) = match file_name {
                "a.txt" => ("Alice", "WORKS_AT"),
                "b.txt" => ("Bob", "FOUNDED"),
                other => anyhow::bail!("no fixture for {}", other),
            };

            let person = Node::new(person, "Person");
            let acme = Node::new("Acme", "Org");
            Ok(GraphDocument::new(
                vec![person.clone(), acme.clone()],
                vec![Relationship::new(person, acme, rel_type)],
                document.clone(),
            ))
        }
    }

    fn test_config(root: &Path) -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.paths.input_dir = root.join("raw");
        config.paths.artifact = root.join("preprocessed").join("graph_data.json");
        config.retry.max_retries = 0;
        config
    }

    fn write_inputs(config: &PipelineConfig) {
        std::fs::create_dir_all(&config.paths.input_dir).unwrap();
        std::fs::write(config.paths.input_dir.join("a.txt"), "Alice works at Acme.").unwrap();
        std::fs::write(config.paths.input_dir.join("b.txt"), "Bob founded Acme.").unwrap();
    }

    #[tokio::test]
    async fn test_end_to_end_with_stub_extractor() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        write_inputs(&config);

        let extractor = Extractor::new(FixedGraphs::default());
        let outcome = run_extraction(&config, &extractor).await.unwrap();
        let ExtractionOutcome::Completed(summary) = outcome else {
            panic!("expected completed extraction");
        };
        assert_eq!(summary.documents_loaded, 2);
        assert!(summary.report.failures.is_empty());

        let artifact: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&config.paths.artifact).unwrap()).unwrap();
        let records = artifact.as_array().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0]["nodes"],
            json!([
                {"id": "Alice", "type": "Person", "properties": {}},
                {"id": "Acme", "type": "Org", "properties": {}}
            ])
        );
        assert_eq!(
            records[0]["relationships"],
            json!([{"source": "Alice", "target": "Acme", "type": "WORKS_AT", "properties": {}}])
        );
        assert_eq!(
            records[1]["relationships"],
            json!([{"source": "Bob", "target": "Acme", "type": "FOUNDED", "properties": {}}])
        );
        assert_eq!(
            records[1]["source"]["source"],
            config.paths.input_dir.join("b.txt").to_string_lossy().to_string()
        );

        let store = Arc::new(MemoryStore::new());
        let handle = Arc::clone(&store);
        let outcome = run_upsert(&config, || async move { Ok(handle) }).await.unwrap();
        let UpsertOutcome::Completed(summary) = outcome else {
            panic!("expected completed upsert");
        };

        let graph = store.snapshot();
        assert_eq!(summary.documents_in_artifact, 2);
        assert_eq!(graph.node_merges, vec!["Alice", "Acme", "Bob", "Acme"]);
        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.relationship_merges.len(), 2);
        assert_eq!(graph.relationships.len(), 2);
        assert_eq!(graph.documents.len(), 2);
        assert!(graph.nodes.contains_key(&(BASE_ENTITY_LABEL.to_string(), "Acme".to_string())));

        let stats = summary.graph.unwrap();
        assert_eq!(stats.entity_count, 3);
        assert_eq!(stats.relation_count, 2);
    }

    #[tokio::test]
    async fn test_empty_input_skips_extraction() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        std::fs::create_dir_all(&config.paths.input_dir).unwrap();
        std::fs::write(config.paths.input_dir.join("notes.md"), "not a text file").unwrap();

        let extractor = Extractor::new(FixedGraphs::default());
        let outcome = run_extraction(&config, &extractor).await.unwrap();

        assert!(matches!(outcome, ExtractionOutcome::EmptyInput { .. }));
        assert_eq!(extractor.transformer().calls.load(Ordering::SeqCst), 0);
        assert!(!config.paths.artifact.exists());
    }

    #[tokio::test]
    async fn test_missing_artifact_makes_no_writes() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let counter = AtomicUsize::new(0);
        let connects = &counter;

        let outcome = run_upsert(&config, move || async move {
            connects.fetch_add(1, Ordering::SeqCst);
            Ok(MemoryStore::new())
        })
        .await
        .unwrap();

        assert!(matches!(outcome, UpsertOutcome::MissingArtifact(p) if p == config.paths.artifact));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_partial_extraction_writes_successful_documents() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        write_inputs(&config);
        std::fs::write(config.paths.input_dir.join("c.txt"), "Carol is unknown.").unwrap();

        let extractor = Extractor::new(FixedGraphs::default());
        let ExtractionOutcome::Completed(summary) = run_extraction(&config, &extractor).await.unwrap() else {
            panic!("expected completed extraction");
        };

        assert_eq!(summary.report.documents.len(), 2);
        assert_eq!(summary.report.failures.len(), 1);
        assert_eq!(summary.report.failures[0].index, 2);

        let restored = artifact::read_artifact(&config.paths.artifact).await.unwrap();
        assert_eq!(restored.len(), 2);
    }

    #[tokio::test]
    async fn test_all_failures_leave_artifact_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        std::fs::create_dir_all(&config.paths.input_dir).unwrap();
        std::fs::write(config.paths.input_dir.join("z.txt"), "No fixture.").unwrap();

        let extractor = Extractor::new(FixedGraphs::default());
        let err = run_extraction(&config, &extractor).await.unwrap_err();

        assert!(matches!(err, PipelineError::AllExtractionsFailed { failed: 1 }));
        assert!(!config.paths.artifact.exists());
    }

    #[tokio::test]
    async fn test_resume_from_skips_written_documents() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        write_inputs(&config);

        let extractor = Extractor::new(FixedGraphs::default());
        run_extraction(&config, &extractor).await.unwrap();

        config.upsert.resume_from = 1;
        let store = Arc::new(MemoryStore::new());
        let handle = Arc::clone(&store);
        let UpsertOutcome::Completed(summary) = run_upsert(&config, || async move { Ok(handle) }).await.unwrap() else {
            panic!("expected completed upsert");
        };

        assert_eq!(summary.resumed_from, 1);
        assert_eq!(summary.written.documents, 1);
        assert_eq!(store.snapshot().node_merges, vec!["Bob", "Acme"]);
    }
}
