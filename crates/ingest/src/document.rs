use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Metadata key holding the file path a document was loaded from.
pub const SOURCE_KEY: &str = "source";

/// Metadata key that, when present, overrides the derived document id.
pub const ID_KEY: &str = "id";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    pub metadata: BTreeMap<String, String>,
}

impl Document {
    pub fn new(text: String, metadata: BTreeMap<String, String>) -> Self {
        Self { text, metadata }
    }

    /// Document loaded from a file: `metadata["source"]` is the path.
    pub fn from_file(path: &str, text: String) -> Self {
        let mut metadata = BTreeMap::new();
        metadata.insert(SOURCE_KEY.to_string(), path.to_string());
        Self::new(text, metadata)
    }

    pub fn source(&self) -> Option<&str> {
        self.metadata.get(SOURCE_KEY).map(String::as_str)
    }

    /// Stable id for this document.
    ///
    /// Uses `metadata["id"]` when present, otherwise hashes the metadata
    /// entries in key order. Text is deliberately not part of the hash: after
    /// a round-trip through the artifact only metadata survives.
    pub fn id(&self) -> String {
        if let Some(id) = self.metadata.get(ID_KEY) {
            return id.clone();
        }
        Self::generate_doc_id(&self.metadata)
    }

    fn generate_doc_id(metadata: &BTreeMap<String, String>) -> String {
        let mut hasher = Sha256::new();
        for (key, value) in metadata {
            hasher.update(key.as_bytes());
            hasher.update([0u8]);
            hasher.update(value.as_bytes());
            hasher.update([0u8]);
        }
        let result = hasher.finalize();
        hex::encode(&result[..16]) // Use first 16 bytes (32 hex chars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_is_stable_and_ignores_text() {
        let a = Document::from_file("data/raw/a.txt", "Alice works at Acme.".to_string());
        let b = Document::from_file("data/raw/a.txt", String::new());

        assert_eq!(a.id(), b.id());
        assert_eq!(a.id().len(), 32);
    }

    #[test]
    fn test_id_differs_per_source() {
        let a = Document::from_file("data/raw/a.txt", String::new());
        let b = Document::from_file("data/raw/b.txt", String::new());

        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_explicit_id_wins() {
        let mut doc = Document::from_file("data/raw/a.txt", String::new());
        doc.metadata.insert(ID_KEY.to_string(), "doc-1".to_string());

        assert_eq!(doc.id(), "doc-1");
        assert_eq!(doc.source(), Some("data/raw/a.txt"));
    }
}
