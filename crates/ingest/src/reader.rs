use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::document::Document;

#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// File extension to match, without the leading dot.
    pub extension: String,
    /// Descend into sub-directories.
    pub recursive: bool,
    /// Skip files that cannot be read as UTF-8 instead of failing the load.
    pub silent_errors: bool,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            extension: "txt".to_string(),
            recursive: false,
            silent_errors: false,
        }
    }
}

pub struct DocumentLoader {
    options: LoaderOptions,
}

impl DocumentLoader {
    pub fn new(options: LoaderOptions) -> Self {
        Self { options }
    }

    pub async fn read_file(path: &Path) -> Result<Document> {
        let content = fs::read_to_string(path)
            .await
            .context(format!("Failed to read file: {:?}", path))?;
        let path_str = path.to_string_lossy().to_string();
        Ok(Document::from_file(&path_str, content))
    }

    /// Load every matching file under `dir`, sorted by path.
    ///
    /// An empty result is not an error; a missing directory is.
    pub async fn load_directory(&self, dir: &Path) -> Result<Vec<Document>> {
        if !fs::metadata(dir)
            .await
            .context(format!("Input directory not found: {:?}", dir))?
            .is_dir()
        {
            anyhow::bail!("Input path is not a directory: {:?}", dir);
        }

        let mut documents = Vec::new();

        for path in self.matching_files(dir)? {
            match Self::read_file(&path).await {
                Ok(document) => {
                    debug!(path = %path.display(), bytes = document.text.len(), "Loaded document");
                    documents.push(document);
                }
                Err(e) if self.options.silent_errors => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable file");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(documents)
    }

    fn matching_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let max_depth = if self.options.recursive { usize::MAX } else { 1 };

        let mut files = Vec::new();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(max_depth)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = entry.context(format!("Failed to walk directory: {:?}", dir))?;
            let path = entry.path();

            if entry.file_type().is_file() && self.matches_extension(path) {
                files.push(path.to_path_buf());
            }
        }

        files.sort();
        Ok(files)
    }

    fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| ext == self.options.extension)
            .unwrap_or(false)
    }
}

impl Default for DocumentLoader {
    fn default() -> Self {
        Self::new(LoaderOptions::default())
    }
}
