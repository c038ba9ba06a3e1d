use extract::GraphDocument;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

use crate::error::{ArtifactError, Result};
use crate::record::GraphRecord;

pub fn to_records(documents: &[GraphDocument]) -> Vec<GraphRecord> {
    documents.iter().map(GraphRecord::from).collect()
}

/// Serialize documents to the artifact JSON text.
///
/// Field order is fixed by the record structs and property maps are sorted,
/// so identical input always yields identical bytes.
pub fn to_json_string(documents: &[GraphDocument]) -> Result<String> {
    let mut json = serde_json::to_string_pretty(&to_records(documents))?;
    json.push('\n');
    Ok(json)
}

/// Write the artifact, replacing any existing file at `path`.
pub async fn write_artifact(path: &Path, documents: &[GraphDocument]) -> Result<()> {
    let json = to_json_string(documents)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|source| io_error(parent, source))?;
    }

    // Write next to the target, then rename over it
    let tmp_path = temp_path(path);
    fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|source| io_error(&tmp_path, source))?;
    fs::rename(&tmp_path, path)
        .await
        .map_err(|source| io_error(path, source))?;

    info!(
        path = %path.display(),
        documents = documents.len(),
        bytes = json.len(),
        "Wrote graph artifact"
    );
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn io_error(path: &Path, source: std::io::Error) -> ArtifactError {
    ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    }
}
