use crate::llm::Message;

pub const SYSTEM_PROMPT: &str = r#"You are a top-tier algorithm designed for extracting information in structured formats to build a knowledge graph.
Capture as much information from the text as possible without sacrificing accuracy.
Do not add any information that is not explicitly mentioned in the text.

NODES represent entities and concepts.
- Use basic, elementary types for node labels (for example "Person", not "Mathematician").
- Use human-readable names as node ids, never integers or generated identifiers.
- Always refer to the same entity by the same id, even if the text uses a different name or pronoun.

RELATIONSHIPS represent connections between entities.
- Use general, timeless relationship types such as "WORKS_AT" or "FOUNDED".
- Every relationship endpoint must also appear in the nodes list.

Output ONLY a JSON object, no markdown, no explanations, with this exact schema:
{
  "nodes": [
    {"id": "Alice", "type": "Person", "properties": {}}
  ],
  "relationships": [
    {"source_node_id": "Alice", "source_node_type": "Person", "target_node_id": "Acme", "target_node_type": "Organization", "type": "WORKS_AT", "properties": {}}
  ]
}"#;

pub fn build_extraction_prompt(document_text: &str) -> String {
    format!(
        r#"Tip: Make sure to answer in the correct format and do not include any explanations.
Use the given format to extract information from the following input:

{}"#,
        document_text
    )
}

pub fn build_retry_prompt(invalid_json: &str) -> String {
    format!(
        r#"The following JSON is invalid:

{}

Fix this JSON. Output only valid JSON with no markdown formatting, no code blocks, no explanations. Just the raw JSON object."#,
        invalid_json
    )
}

pub fn build_messages(document_text: &str) -> Vec<Message> {
    vec![
        Message::system(SYSTEM_PROMPT),
        Message::user(build_extraction_prompt(document_text)),
    ]
}
