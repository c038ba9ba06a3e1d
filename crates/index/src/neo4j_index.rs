use anyhow::{Context, Result};
use async_trait::async_trait;
use extract::{Node, PLACEHOLDER_TYPE, Properties, Relationship};
use ingest::Document;
use neo4rs::{BoltList, BoltMap, BoltString, BoltType, Graph, Query};
use serde_json::Value;
use tracing::{debug, info};

use crate::store::{BASE_ENTITY_LABEL, DOCUMENT_LABEL, GraphStats, GraphStore, MENTIONS, PersistOptions};

pub struct Neo4jStore {
    graph: Graph,
}

impl Neo4jStore {
    pub fn new(graph: Graph) -> Self {
        Self { graph }
    }

    pub async fn connect(uri: &str, user: &str, password: &str) -> Result<Self> {
        let graph = Graph::new(uri, user, password)
            .await
            .context("Failed to connect to Neo4j")?;

        Ok(Self::new(graph))
    }

    async fn count(&self, cypher: &str) -> Result<usize> {
        let mut result = self.graph.execute(Query::new(cypher.to_string())).await?;
        let count = if let Some(row) = result.next().await? {
            row.get::<i64>("count").unwrap_or(0) as usize
        } else {
            0
        };
        Ok(count)
    }
}

#[async_trait]
impl GraphStore for Neo4jStore {
    /// Create the constraint backing lookups by id
    async fn init_schema(&self, options: &PersistOptions) -> Result<()> {
        let mut statements = vec![format!(
            "CREATE CONSTRAINT document_id_unique IF NOT EXISTS FOR (d:{}) REQUIRE d.id IS UNIQUE",
            quote_name(DOCUMENT_LABEL)
        )];
        if options.base_entity_label {
            statements.push(format!(
                "CREATE CONSTRAINT entity_id_unique IF NOT EXISTS FOR (e:{}) REQUIRE e.id IS UNIQUE",
                quote_name(BASE_ENTITY_LABEL)
            ));
        }

        for statement in statements {
            self.graph.run(Query::new(statement.clone())).await
                .context(format!("Failed to create constraint: {}", statement))?;
        }

        info!("Neo4j constraints ensured");
        Ok(())
    }

    async fn merge_node(&self, node: &Node, options: &PersistOptions) -> Result<()> {
        let query = Query::new(merge_node_cypher(node, options))
            .param("id", node.id.clone())
            .param("props", properties_to_bolt(&node.properties));

        self.graph.run(query).await
            .context(format!("Failed to merge node {:?}", node.id))?;

        Ok(())
    }

    async fn merge_relationship(
        &self,
        relationship: &Relationship,
        options: &PersistOptions,
    ) -> Result<()> {
        let query = Query::new(merge_relationship_cypher(relationship, options))
            .param("source_id", relationship.source.id.clone())
            .param("target_id", relationship.target.id.clone())
            .param("props", properties_to_bolt(&relationship.properties));

        self.graph.run(query).await
            .context(format!(
                "Failed to merge relationship {:?}-[{}]->{:?}",
                relationship.source.id, relationship.rel_type, relationship.target.id
            ))?;

        Ok(())
    }

    async fn merge_source_document(
        &self,
        document_id: &str,
        source: &Document,
        nodes: &[Node],
        options: &PersistOptions,
    ) -> Result<()> {
        let mut metadata = BoltMap::new();
        for (key, value) in &source.metadata {
            metadata.put(BoltString::from(key.as_str()), BoltType::from(value.clone()));
        }
        if !source.text.is_empty() {
            metadata.put(BoltString::from("text"), BoltType::from(source.text.clone()));
        }

        let query = Query::new(format!(
            "MERGE (d:{} {{id: $doc_id}}) SET d += $metadata",
            quote_name(DOCUMENT_LABEL)
        ))
        .param("doc_id", document_id.to_string())
        .param("metadata", BoltType::Map(metadata));

        self.graph.run(query).await
            .context(format!("Failed to merge source document {}", document_id))?;

        if options.base_entity_label {
            let node_ids: Vec<String> = nodes.iter().map(|n| n.id.clone()).collect();
            let query = Query::new(format!(
                r#"
                MATCH (d:{doc} {{id: $doc_id}})
                UNWIND $node_ids AS node_id
                MATCH (n:{entity} {{id: node_id}})
                MERGE (d)-[:{mentions}]->(n)
                "#,
                doc = quote_name(DOCUMENT_LABEL),
                entity = quote_name(BASE_ENTITY_LABEL),
                mentions = quote_name(MENTIONS),
            ))
            .param("doc_id", document_id.to_string())
            .param("node_ids", node_ids);

            self.graph.run(query).await
                .context(format!("Failed to link nodes to document {}", document_id))?;
        } else {
            for node in nodes {
                let query = Query::new(format!(
                    r#"
                    MATCH (d:{doc} {{id: $doc_id}})
                    MATCH (n:{label} {{id: $id}})
                    MERGE (d)-[:{mentions}]->(n)
                    "#,
                    doc = quote_name(DOCUMENT_LABEL),
                    label = node_label(&node.node_type),
                    mentions = quote_name(MENTIONS),
                ))
                .param("doc_id", document_id.to_string())
                .param("id", node.id.clone());

                self.graph.run(query).await
                    .context(format!("Failed to link node {:?} to document {}", node.id, document_id))?;
            }
        }

        debug!(document_id, nodes = nodes.len(), "Linked nodes to source document");
        Ok(())
    }

    /// Get graph statistics
    async fn stats(&self) -> Result<GraphStats> {
        let entity_count = self
            .count(&format!(
                "MATCH (n) WHERE NOT n:{} RETURN count(n) as count",
                quote_name(DOCUMENT_LABEL)
            ))
            .await?;
        let relation_count = self
            .count(&format!(
                "MATCH ()-[r]->() WHERE type(r) <> '{}' RETURN count(r) as count",
                MENTIONS
            ))
            .await?;
        let document_count = self
            .count(&format!(
                "MATCH (d:{}) RETURN count(d) as count",
                quote_name(DOCUMENT_LABEL)
            ))
            .await?;

        Ok(GraphStats {
            entity_count,
            relation_count,
            document_count,
        })
    }
}

/// Quote a label or relationship type for interpolation into Cypher.
///
/// Labels and types cannot be passed as query parameters.
pub fn quote_name(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Label for a node type; a blank type falls back to the placeholder type.
fn node_label(node_type: &str) -> String {
    if node_type.trim().is_empty() {
        quote_name(PLACEHOLDER_TYPE)
    } else {
        quote_name(node_type)
    }
}

pub fn merge_node_cypher(node: &Node, options: &PersistOptions) -> String {
    if options.base_entity_label {
        format!(
            "MERGE (n:{} {{id: $id}}) SET n:{} SET n += $props",
            quote_name(BASE_ENTITY_LABEL),
            node_label(&node.node_type)
        )
    } else {
        format!(
            "MERGE (n:{} {{id: $id}}) SET n += $props",
            node_label(&node.node_type)
        )
    }
}

pub fn merge_relationship_cypher(relationship: &Relationship, options: &PersistOptions) -> String {
    let endpoints = if options.base_entity_label {
        let entity = quote_name(BASE_ENTITY_LABEL);
        format!(
            "MERGE (source:{entity} {{id: $source_id}}) ON CREATE SET source:{source_type} \
             MERGE (target:{entity} {{id: $target_id}}) ON CREATE SET target:{target_type}",
            source_type = node_label(&relationship.source.node_type),
            target_type = node_label(&relationship.target.node_type),
        )
    } else {
        format!(
            "MERGE (source:{} {{id: $source_id}}) MERGE (target:{} {{id: $target_id}})",
            node_label(&relationship.source.node_type),
            node_label(&relationship.target.node_type),
        )
    };

    format!(
        "{} MERGE (source)-[r:{}]->(target) SET r += $props",
        endpoints,
        quote_name(&relationship.rel_type)
    )
}

/// Convert properties into a Bolt map.
///
/// Nulls are skipped, scalars and homogeneous scalar lists map directly,
/// anything nested is stored as a JSON string.
pub fn properties_to_bolt(properties: &Properties) -> BoltType {
    let mut map = BoltMap::new();
    for (key, value) in properties {
        if let Some(bolt) = value_to_bolt(value) {
            map.put(BoltString::from(key.as_str()), bolt);
        }
    }
    BoltType::Map(map)
}

fn value_to_bolt(value: &Value) -> Option<BoltType> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(BoltType::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(BoltType::from(i)),
            None => n.as_f64().map(BoltType::from),
        },
        Value::String(s) => Some(BoltType::from(s.clone())),
        Value::Array(items) if is_homogeneous_scalar_list(items) => {
            let mut list = BoltList::new();
            for item in items {
                if let Some(bolt) = value_to_bolt(item) {
                    list.push(bolt);
                }
            }
            Some(BoltType::List(list))
        }
        nested => Some(BoltType::from(nested.to_string())),
    }
}

fn is_homogeneous_scalar_list(items: &[Value]) -> bool {
    fn kind(value: &Value) -> Option<u8> {
        match value {
            Value::Bool(_) => Some(0),
            Value::Number(n) if n.is_i64() => Some(1),
            Value::Number(_) => Some(2),
            Value::String(_) => Some(3),
            _ => None,
        }
    }

    let mut kinds = items.iter().map(kind);
    match kinds.next() {
        None => true,
        Some(None) => false,
        Some(first) => kinds.all(|k| k == first),
    }
}
