//! JSON artifact between the extraction and upsert stages.

pub mod error;
pub mod reader;
pub mod record;
pub mod writer;

pub use error::ArtifactError;
pub use reader::{read_artifact, reconstruct};
pub use record::{GraphRecord, RelationshipRecord};
pub use writer::{to_json_string, to_records, write_artifact};

/// Default artifact location, relative to the working directory.
pub const DEFAULT_ARTIFACT_PATH: &str = "data/preprocessed/graph_data.json";

#[cfg(test)]
mod tests {
    use super::*;
    use extract::{GraphDocument, Node, PLACEHOLDER_TYPE, Relationship};
    use ingest::Document;
    use serde_json::json;

    fn sample() -> Vec<GraphDocument> {
        let alice = Node::new("Alice", "Person").with_property("age", json!(34));
        let acme = Node::new("Acme", "Org").with_property("aliases", json!(["ACME", "Acme Inc"]));
        let mut works_at = Relationship::new(alice.clone(), acme.clone(), "WORKS_AT");
        works_at.properties.insert("since".to_string(), json!(2020));

        let bob = Node::new("Bob", "Person");
        let founded = Relationship::new(bob.clone(), Node::new("Acme", "Org"), "FOUNDED");

        vec![
            GraphDocument::new(
                vec![alice, acme],
                vec![works_at],
                Document::from_file("data/raw/a.txt", "Alice works at Acme.".to_string()),
            ),
            GraphDocument::new(
                vec![bob, Node::new("Acme", "Org")],
                vec![founded],
                Document::from_file("data/raw/b.txt", "Bob founded Acme.".to_string()),
            ),
        ]
    }

    #[test]
    fn test_artifact_shape() {
        let value: serde_json::Value = serde_json::from_str(&to_json_string(&sample()).unwrap()).unwrap();

        assert_eq!(
            value[0],
            json!({
                "nodes": [
                    {"id": "Alice", "type": "Person", "properties": {"age": 34}},
                    {"id": "Acme", "type": "Org", "properties": {"aliases": ["ACME", "Acme Inc"]}}
                ],
                "relationships": [
                    {"source": "Alice", "target": "Acme", "type": "WORKS_AT", "properties": {"since": 2020}}
                ],
                "source": {"source": "data/raw/a.txt"}
            })
        );
    }

    #[test]
    fn test_output_is_reproducible() {
        let first = to_json_string(&sample()).unwrap();
        let second = to_json_string(&sample()).unwrap();

        assert_eq!(first, second);
        assert!(first.find("\"nodes\"").unwrap() < first.find("\"relationships\"").unwrap());
        assert!(first.ends_with('\n'));
    }

    #[tokio::test]
    async fn test_round_trip_drops_text_keeps_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preprocessed").join("graph_data.json");
        let original = sample();

        write_artifact(&path, &original).await.unwrap();
        let restored = read_artifact(&path).await.unwrap();

        assert_eq!(restored.len(), original.len());
        for (before, after) in original.iter().zip(&restored) {
            assert_eq!(after.nodes, before.nodes);
            assert_eq!(after.relationships, before.relationships);
            assert_eq!(after.source.metadata, before.source.metadata);
            assert!(after.source.text.is_empty());
        }
    }

    #[tokio::test]
    async fn test_write_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph_data.json");
        std::fs::write(&path, "stale content that is much longer than an empty array").unwrap();

        write_artifact(&path, &[]).await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]\n");
        assert!(!dir.path().join("graph_data.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph_data.json");

        let err = read_artifact(&path).await.unwrap_err();
        assert!(matches!(err, ArtifactError::Missing(p) if p == path));
    }

    #[tokio::test]
    async fn test_malformed_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph_data.json");
        std::fs::write(&path, "{\"nodes\": ").unwrap();

        let err = read_artifact(&path).await.unwrap_err();
        assert!(matches!(err, ArtifactError::Parse { .. }));
    }

    #[test]
    fn test_unresolved_endpoint_becomes_placeholder() {
        let records: Vec<GraphRecord> = serde_json::from_value(json!([{
            "nodes": [{"id": "Alice", "type": "Person", "properties": {"age": 34}}],
            "relationships": [{"source": "Alice", "target": "Globex", "type": "WORKS_AT"}],
            "source": {"source": "data/raw/c.txt"}
        }]))
        .unwrap();

        let documents = reconstruct(records);
        let rel = &documents[0].relationships[0];

        assert_eq!(rel.source.node_type, "Person");
        assert_eq!(rel.source.properties["age"], 34);
        assert_eq!(rel.target.id, "Globex");
        assert_eq!(rel.target.node_type, PLACEHOLDER_TYPE);
        assert!(rel.target.properties.is_empty());
        assert!(rel.properties.is_empty());
        assert_eq!(documents[0].nodes.len(), 1);
    }

    #[test]
    fn test_node_map_is_scoped_per_record() {
        let records: Vec<GraphRecord> = serde_json::from_value(json!([
            {
                "nodes": [{"id": "Acme", "type": "Org", "properties": {}}],
                "relationships": [],
                "source": {"source": "a.txt"}
            },
            {
                "nodes": [{"id": "Bob", "type": "Person", "properties": {}}],
                "relationships": [{"source": "Bob", "target": "Acme", "type": "FOUNDED", "properties": {}}],
                "source": {"source": "b.txt"}
            }
        ]))
        .unwrap();

        let documents = reconstruct(records);

        assert_eq!(documents[1].relationships[0].target, Node::placeholder("Acme"));
    }
}
