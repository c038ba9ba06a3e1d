//! Console status lines for the binaries.

use crate::stages::{ExtractionOutcome, UpsertOutcome};

pub fn print_extraction(outcome: &ExtractionOutcome) {
    match outcome {
        ExtractionOutcome::EmptyInput { input_dir } => {
            println!(
                "File location {} is empty. Add data first.",
                input_dir.display()
            );
        }
        ExtractionOutcome::Completed(summary) => {
            let report = &summary.report;
            println!(
                "Extracted {} nodes and {} relationships from {} of {} documents.",
                report.node_count(),
                report.relationship_count(),
                report.documents.len(),
                summary.documents_loaded
            );
            for failure in &report.failures {
                println!(
                    "  failed: document {} ({}): {:#}",
                    failure.index + 1,
                    failure.source.as_deref().unwrap_or("-"),
                    failure.error
                );
            }
            println!("Graph data saved to {}", summary.artifact.display());
        }
    }
}

pub fn print_upsert_started() {
    println!("Process initiated....");
}

pub fn print_upsert(outcome: &UpsertOutcome) {
    match outcome {
        UpsertOutcome::MissingArtifact(path) => {
            println!(
                "File {} not found. Please run the extraction step first.",
                path.display()
            );
        }
        UpsertOutcome::Completed(summary) => {
            if summary.resumed_from > 0 {
                println!(
                    "Skipped {} documents already written (GRAPH_RESUME_FROM={}).",
                    summary.resumed_from.min(summary.documents_in_artifact),
                    summary.resumed_from
                );
            }
            println!(
                "Successfully updated the graph with {} of {} documents ({} nodes, {} relationships).",
                summary.written.documents,
                summary.documents_in_artifact,
                summary.written.nodes,
                summary.written.relationships
            );
            if let Some(stats) = &summary.graph {
                println!(
                    "Graph now holds {} entities, {} relationships, {} source documents.",
                    stats.entity_count, stats.relation_count, stats.document_count
                );
            }
        }
    }
}
