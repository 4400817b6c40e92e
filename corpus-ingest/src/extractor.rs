//! LLM entity extraction guided by the ontology.
//!
//! The completion backend is asked for a JSON array of entities. Items whose
//! type is not in the ontology are dropped; the rest are annotated with a
//! JSON-LD block naming the type's schema.org mapping and query tools.

use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde_json::{json, Value};

use corpus_core::completion::{CompletionBackend, CompletionError};
use corpus_core::entity::{clamp_confidence, ExtractedEntity, RelationshipRef, DEFAULT_CONFIDENCE};
use corpus_core::generators::jsonld::{KG_NAMESPACE, MCP_NAMESPACE, SCHEMA_ORG};
use corpus_core::ontology::{common_properties, NodeType, Ontology};
use corpus_core::value::{decode_properties, PropertyMap};

/// Key properties listed per type in the prompt.
const MAX_PROMPT_PROPERTIES: usize = 5;

/// Longest completion excerpt logged when output cannot be parsed.
const LOG_EXCERPT_CHARS: usize = 500;

/// Body of a Markdown code fence, or the whole output when there is none.
fn strip_code_fence(output: &str) -> &str {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    let fence = FENCE.get_or_init(|| Regex::new(r"(?s)^\s*```[A-Za-z]*\s*\n?(.*?)\s*```\s*$").ok());

    fence
        .as_ref()
        .and_then(|re| re.captures(output))
        .and_then(|c| c.get(1))
        .map_or(output, |m| m.as_str())
}

/// Decode completion output into raw entity objects.
///
/// Accepts a JSON array, optionally wrapped in a Markdown code fence, or an
/// object whose `entities` field is such an array. Anything else is `None`.
pub fn parse_completion(output: &str) -> Option<Vec<Value>> {
    let body = strip_code_fence(output).trim();

    match serde_json::from_str::<Value>(body).ok()? {
        Value::Array(items) => Some(items),
        Value::Object(mut obj) => match obj.remove("entities") {
            Some(Value::Array(items)) => Some(items),
            _ => None,
        },
        _ => None,
    }
}

pub struct EntityExtractor {
    ontology: Arc<Ontology>,
    backend: Arc<dyn CompletionBackend>,
}

impl EntityExtractor {
    pub fn new(ontology: Arc<Ontology>, backend: Arc<dyn CompletionBackend>) -> Self {
        Self { ontology, backend }
    }

    fn type_descriptions(&self) -> String {
        let common: Vec<String> = common_properties().into_iter().map(|p| p.name).collect();

        self.ontology
            .node_types()
            .map(|node| {
                let props: Vec<String> = node
                    .properties
                    .iter()
                    .filter(|p| !common.contains(&p.name))
                    .take(MAX_PROMPT_PROPERTIES)
                    .map(|p| format!("  - {}: {}", p.name, p.description))
                    .collect();

                if props.is_empty() {
                    format!("{}: {}", node.name, node.description)
                } else {
                    format!(
                        "{}:\n  Description: {}\n  Key properties:\n{}",
                        node.name,
                        node.description,
                        props.join("\n")
                    )
                }
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Prompt listing the ontology's types and the expected response shape.
    pub fn build_prompt(&self, text: &str) -> String {
        let type_names: Vec<&str> = self.ontology.node_types().map(|n| n.name.as_str()).collect();

        format!(
            r#"You are an expert at extracting structured entities from text.

Extract all entities from the following text. For each entity, identify:
1. The entity type (one of: {types})
2. Key properties that can be extracted from the text
3. Relationships to other entities mentioned

Entity Type Definitions:
{descriptions}

TEXT TO ANALYZE:
{text}

Respond with a JSON array of extracted entities. Each entity should have:
- "type": the entity type
- "properties": object with extracted property values
- "relationships": array of {{"target_type", "target_id", "relationship_type"}}
- "confidence": number 0-1 indicating extraction confidence
- "source_span": the text span this was extracted from

JSON RESPONSE:"#,
            types = type_names.join(", "),
            descriptions = self.type_descriptions(),
        )
    }

    /// Extract entities from `text`.
    ///
    /// Only a failed completion call is an error; output that is not a JSON
    /// array of entities yields an empty result.
    pub async fn extract(&self, text: &str) -> Result<Vec<ExtractedEntity>, CompletionError> {
        let prompt = self.build_prompt(text);
        let output = self.backend.complete(&prompt).await?;

        let Some(items) = parse_completion(&output) else {
            let excerpt: String = output.chars().take(LOG_EXCERPT_CHARS).collect();
            tracing::error!(response = %excerpt, "Completion is not a JSON array of entities");
            return Ok(Vec::new());
        };

        let entities: Vec<ExtractedEntity> =
            items.into_iter().filter_map(|raw| self.annotate(raw)).collect();

        tracing::info!(count = entities.len(), backend = self.backend.name(), "Entities extracted");
        Ok(entities)
    }

    fn annotate(&self, raw: Value) -> Option<ExtractedEntity> {
        let Value::Object(mut raw) = raw else {
            tracing::debug!("Dropping non-object extraction item");
            return None;
        };

        let entity_type = raw.get("type").and_then(Value::as_str)?.to_string();
        let Some(node_type) = self.ontology.get_node_type(&entity_type) else {
            tracing::debug!(entity_type = %entity_type, "Dropping entity of unknown type");
            return None;
        };

        let properties = match raw.remove("properties") {
            Some(Value::Object(map)) => decode_properties(map),
            _ => PropertyMap::new(),
        };
        let relationships = match raw.remove("relationships") {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|r| serde_json::from_value::<RelationshipRef>(r).ok())
                .collect(),
            _ => Vec::new(),
        };
        let confidence = raw
            .get("confidence")
            .and_then(Value::as_f64)
            .map(|c| clamp_confidence(c as f32))
            .unwrap_or(DEFAULT_CONFIDENCE);
        let source_span = raw
            .get("source_span")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Some(ExtractedEntity {
            jsonld_schema: self.annotation(node_type),
            entity_type,
            properties,
            relationships,
            confidence,
            source_span,
            domain: self.ontology.domain().to_string(),
            embedding: None,
        })
    }

    fn annotation(&self, node_type: &NodeType) -> Value {
        let mut schema = json!({
            "@context": {
                "@vocab": SCHEMA_ORG,
                "mcp": MCP_NAMESPACE,
                "kg": KG_NAMESPACE,
            },
            "@type": node_type.schema_org_type.as_deref().unwrap_or("Thing"),
            "kg:entityType": node_type.name,
            "kg:domain": self.ontology.domain(),
        });

        if !node_type.query_tools.is_empty() {
            let tools: Vec<Value> = node_type
                .query_tools
                .iter()
                .map(|tool| {
                    json!({
                        "name": tool.name,
                        "description": tool.description,
                        "cypher": tool.cypher_template,
                        "parameters": tool.parameters,
                    })
                })
                .collect();
            schema["mcp:tools"] = Value::Array(tools);
        }
        schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_array() {
        let items = parse_completion(r#"[{"type": "Bill"}]"#).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn parses_fenced_array() {
        let output = "```json\n[{\"type\": \"Bill\"}, {\"type\": \"Member\"}]\n```";
        assert_eq!(parse_completion(output).unwrap().len(), 2);

        let output = "```\n[]\n```\n";
        assert_eq!(parse_completion(output).unwrap().len(), 0);
    }

    #[test]
    fn unwraps_entities_object() {
        let items = parse_completion(r#"{"entities": [{"type": "Bill"}]}"#).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn rejects_malformed_output() {
        assert!(parse_completion("not json").is_none());
        assert!(parse_completion(r#"{"type": "Bill"}"#).is_none());
        assert!(parse_completion("42").is_none());
    }
}
