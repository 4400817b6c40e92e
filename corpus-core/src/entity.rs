use serde::{Deserialize, Serialize};

use crate::value::{deserialize_properties, properties_to_json, PropertyMap, PropertyValue};

pub const DEFAULT_CONFIDENCE: f32 = 0.5;

fn default_confidence() -> f32 {
    DEFAULT_CONFIDENCE
}

fn default_entity_domain() -> String {
    "generic".to_string()
}

/// Outgoing edge named by an extracted entity. `target_id` is the identity
/// of the other endpoint as already stored in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipRef {
    pub target_type: String,
    pub target_id: String,
    pub relationship_type: String,
    #[serde(default, deserialize_with = "deserialize_properties")]
    pub properties: PropertyMap,
}

impl RelationshipRef {
    pub fn new(
        relationship_type: impl Into<String>,
        target_type: impl Into<String>,
        target_id: impl Into<String>,
    ) -> Self {
        Self {
            target_type: target_type.into(),
            target_id: target_id.into(),
            relationship_type: relationship_type.into(),
            properties: PropertyMap::new(),
        }
    }
}

/// Candidate entity produced by the extractor (or decoded from JSON lines)
/// and consumed by the loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEntity {
    pub entity_type: String,
    #[serde(default, deserialize_with = "deserialize_properties")]
    pub properties: PropertyMap,
    #[serde(default)]
    pub relationships: Vec<RelationshipRef>,
    #[serde(default = "default_confidence")]
    pub confidence: f32,
    #[serde(default)]
    pub source_span: String,
    #[serde(default = "default_entity_domain")]
    pub domain: String,
    /// Linked-data annotation attached by the extractor
    #[serde(default)]
    pub jsonld_schema: serde_json::Value,
    /// Set by the loader
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl ExtractedEntity {
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            properties: PropertyMap::new(),
            relationships: Vec::new(),
            confidence: DEFAULT_CONFIDENCE,
            source_span: String::new(),
            domain: default_entity_domain(),
            jsonld_schema: serde_json::Value::Null,
            embedding: None,
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_relationship(mut self, relationship: RelationshipRef) -> Self {
        self.relationships.push(relationship);
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    /// Confidence is always kept inside `[0, 1]`; NaN becomes the default.
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = clamp_confidence(confidence);
        self
    }

    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Property map as written to the graph store, minus identity and
    /// embedding, which the loader adds.
    pub fn to_graph_properties(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut props = properties_to_json(&self.properties);
        let annotation = if self.jsonld_schema.is_null() {
            "{}".to_string()
        } else {
            self.jsonld_schema.to_string()
        };
        props.insert("jsonld_schema".to_string(), annotation.into());
        props.insert("domain".to_string(), self.domain.clone().into());
        props.insert(
            "confidence".to_string(),
            serde_json::Value::from(f64::from(clamp_confidence(self.confidence))),
        );
        props
    }
}

pub fn clamp_confidence(confidence: f32) -> f32 {
    if confidence.is_nan() {
        DEFAULT_CONFIDENCE
    } else {
        confidence.clamp(0.0, 1.0)
    }
}
