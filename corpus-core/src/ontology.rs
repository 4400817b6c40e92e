//! Ontology metamodel
//!
//! Node types, property definitions, relationship types and query tools for a
//! single domain. Every generator and the graph loader read from one
//! `Ontology`; it is built at startup and only shared read-only afterwards
//! (wrap it in an `Arc` to hand it to async code).

use crate::error::{CorpusError, DefinitionError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

/// Property names of the shared identity/embedding/audit block.
pub const IDENTITY_PROPERTY: &str = "id";
pub const EMBEDDING_PROPERTY: &str = "embedding";
pub const AUDIT_PROPERTIES: [&str; 2] = ["created_at", "updated_at"];

// ============================================================================
// PropertyType
// ============================================================================

/// Storage type of a property.
///
/// Type names that are not recognised are kept as `Other` so that ontology
/// documents written for newer tooling still load; generators map `Other` to
/// their default (string) representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PropertyType {
    String,
    Integer,
    Float,
    Boolean,
    Datetime,
    Date,
    /// Long text, usually full-text indexed
    Text,
    /// Embedding vector
    Vector,
    Other(String),
}

impl PropertyType {
    pub fn as_str(&self) -> &str {
        match self {
            PropertyType::String => "string",
            PropertyType::Integer => "integer",
            PropertyType::Float => "float",
            PropertyType::Boolean => "boolean",
            PropertyType::Datetime => "datetime",
            PropertyType::Date => "date",
            PropertyType::Text => "text",
            PropertyType::Vector => "vector",
            PropertyType::Other(name) => name,
        }
    }

    pub fn is_vector(&self) -> bool {
        matches!(self, PropertyType::Vector)
    }
}

impl From<String> for PropertyType {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "string" => PropertyType::String,
            "integer" => PropertyType::Integer,
            "float" => PropertyType::Float,
            "boolean" => PropertyType::Boolean,
            "datetime" => PropertyType::Datetime,
            "date" => PropertyType::Date,
            "text" => PropertyType::Text,
            "vector" => PropertyType::Vector,
            _ => PropertyType::Other(value),
        }
    }
}

impl From<PropertyType> for String {
    fn from(value: PropertyType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Definitions
// ============================================================================

/// Property definition with type and constraint flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDef {
    pub name: String,
    #[serde(rename = "type")]
    pub prop_type: PropertyType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub indexed: bool,
    #[serde(default)]
    pub fulltext: bool,
    #[serde(default)]
    pub description: String,
}

impl PropertyDef {
    pub fn new(name: impl Into<String>, prop_type: PropertyType) -> Self {
        Self {
            name: name.into(),
            prop_type,
            required: false,
            unique: false,
            indexed: false,
            fulltext: false,
            description: String::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    pub fn fulltext(mut self) -> Self {
        self.fulltext = true;
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Relationship between two node types. Endpoint names are not checked
/// against the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipType {
    pub name: String,
    pub from_node: String,
    pub to_node: String,
    #[serde(default)]
    pub properties: Vec<PropertyDef>,
    #[serde(default)]
    pub description: String,
}

impl RelationshipType {
    pub fn new(
        name: impl Into<String>,
        from_node: impl Into<String>,
        to_node: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            from_node: from_node.into(),
            to_node: to_node.into(),
            properties: Vec::new(),
            description: String::new(),
        }
    }

    pub fn property(mut self, property: PropertyDef) -> Self {
        self.properties.push(property);
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Query tool advertised for a node type: a Cypher template with `$name`
/// placeholders and the primitive type of each placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryTool {
    pub name: String,
    pub description: String,
    pub cypher_template: String,
    #[serde(default)]
    pub parameters: IndexMap<String, String>,
}

impl QueryTool {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        cypher_template: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            cypher_template: cypher_template.into(),
            parameters: IndexMap::new(),
        }
    }

    pub fn param(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), type_name.into());
        self
    }

    /// Distinct `$placeholder` names in template order.
    pub fn placeholders(&self) -> Vec<&str> {
        let template = self.cypher_template.as_str();
        let mut seen = Vec::new();
        let mut chars = template.char_indices().peekable();

        while let Some((i, c)) = chars.next() {
            if c != '$' {
                continue;
            }
            let start = i + 1;
            let mut end = start;
            while let Some(&(j, next)) = chars.peek() {
                if next.is_ascii_alphanumeric() || next == '_' {
                    end = j + next.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            if end > start {
                let name = &template[start..end];
                if !seen.contains(&name) {
                    seen.push(name);
                }
            }
        }

        seen
    }
}

fn default_domain() -> String {
    "generic".to_string()
}

/// Node type definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeType {
    pub name: String,
    pub properties: Vec<PropertyDef>,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_domain")]
    pub domain: String,
    /// schema.org mapping
    #[serde(default)]
    pub schema_org_type: Option<String>,
    /// Extra labels written on every instance
    #[serde(default)]
    pub additional_labels: Vec<String>,
    #[serde(default)]
    pub query_tools: Vec<QueryTool>,
    /// Natural-key properties tried in order when an entity has no `id`.
    /// Empty means the loader's default priority list.
    #[serde(default)]
    pub identity_keys: Vec<String>,
}

impl NodeType {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
            description: description.into(),
            domain: default_domain(),
            schema_org_type: None,
            additional_labels: Vec::new(),
            query_tools: Vec::new(),
            identity_keys: Vec::new(),
        }
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    pub fn schema_org(mut self, schema_org_type: impl Into<String>) -> Self {
        self.schema_org_type = Some(schema_org_type.into());
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.additional_labels.push(label.into());
        self
    }

    pub fn property(mut self, property: PropertyDef) -> Self {
        self.properties.push(property);
        self
    }

    pub fn properties(mut self, properties: impl IntoIterator<Item = PropertyDef>) -> Self {
        self.properties.extend(properties);
        self
    }

    pub fn tool(mut self, tool: QueryTool) -> Self {
        self.query_tools.push(tool);
        self
    }

    pub fn identity_key(mut self, key: impl Into<String>) -> Self {
        self.identity_keys.push(key.into());
        self
    }

    pub fn get_property(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// First vector-typed property; embeddings are stored there.
    pub fn vector_property(&self) -> Option<&PropertyDef> {
        self.properties.iter().find(|p| p.prop_type.is_vector())
    }

    /// Primary label followed by the additional labels.
    pub fn labels(&self) -> Vec<&str> {
        std::iter::once(self.name.as_str())
            .chain(self.additional_labels.iter().map(String::as_str))
            .collect()
    }
}

/// Shared identity/embedding/audit block most node types start with.
pub fn common_properties() -> Vec<PropertyDef> {
    vec![
        PropertyDef::new(IDENTITY_PROPERTY, PropertyType::String)
            .required()
            .unique()
            .describe("Unique identifier"),
        PropertyDef::new(EMBEDDING_PROPERTY, PropertyType::Vector)
            .describe("Semantic embedding vector for similarity search"),
        PropertyDef::new(AUDIT_PROPERTIES[0], PropertyType::Datetime)
            .describe("When the entity was ingested"),
        PropertyDef::new(AUDIT_PROPERTIES[1], PropertyType::Datetime)
            .describe("Last update timestamp"),
        PropertyDef::new("source_url", PropertyType::String).describe("Source URL"),
    ]
}

// ============================================================================
// Ontology registry
// ============================================================================

/// Registry of node and relationship types for one domain.
///
/// Registration is keyed by name: re-registering a name replaces the
/// definition but keeps its original position, so iteration order (and with
/// it every generated artifact) only depends on first registration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Ontology {
    domain: String,
    version: String,
    description: String,
    nodes: IndexMap<String, NodeType>,
    relationships: IndexMap<String, RelationshipType>,
}

/// Serializable form of an ontology, e.g. an `ontology.json` file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OntologyDocument {
    pub domain: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub node_types: Vec<NodeType>,
    #[serde(default)]
    pub relationship_types: Vec<RelationshipType>,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

impl Ontology {
    pub fn new(domain: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            version: version.into(),
            description: String::new(),
            nodes: IndexMap::new(),
            relationships: IndexMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn register_node_type(&mut self, node_type: NodeType) {
        self.nodes.insert(node_type.name.clone(), node_type);
    }

    pub fn register_relationship_type(&mut self, rel_type: RelationshipType) {
        self.relationships.insert(rel_type.name.clone(), rel_type);
    }

    pub fn get_node_type(&self, name: &str) -> Option<&NodeType> {
        self.nodes.get(name)
    }

    pub fn require_node_type(&self, name: &str) -> Result<&NodeType, DefinitionError> {
        self.get_node_type(name)
            .ok_or_else(|| DefinitionError::UnknownNodeType(name.to_string()))
    }

    pub fn get_relationship_type(&self, name: &str) -> Option<&RelationshipType> {
        self.relationships.get(name)
    }

    /// Node types in registration order.
    pub fn node_types(&self) -> impl Iterator<Item = &NodeType> {
        self.nodes.values()
    }

    /// Relationship types in registration order.
    pub fn relationship_types(&self) -> impl Iterator<Item = &RelationshipType> {
        self.relationships.values()
    }

    pub fn relationship_names(&self) -> HashSet<String> {
        self.relationships.keys().cloned().collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }

    /// Check the definitions for programming errors.
    ///
    /// Relationship endpoints are not resolved: a relationship
    /// may point at a node type owned by another ontology.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        for node in self.nodes.values() {
            if node.name.trim().is_empty() {
                return Err(DefinitionError::EmptyTypeName);
            }
            check_properties(&node.name, &node.properties)?;

            for tool in &node.query_tools {
                for placeholder in tool.placeholders() {
                    if !tool.parameters.contains_key(placeholder) {
                        return Err(DefinitionError::UndeclaredPlaceholder {
                            tool: tool.name.clone(),
                            placeholder: placeholder.to_string(),
                        });
                    }
                }
            }

            for key in &node.identity_keys {
                if node.get_property(key).is_none() {
                    return Err(DefinitionError::UnknownIdentityKey {
                        node_type: node.name.clone(),
                        key: key.clone(),
                    });
                }
            }
        }

        for rel in self.relationships.values() {
            if rel.name.trim().is_empty() {
                return Err(DefinitionError::EmptyTypeName);
            }
            check_properties(&rel.name, &rel.properties)?;
        }

        Ok(())
    }

    /// Build an ontology from a document. Unlike `register_*`, a document
    /// naming the same type twice is rejected.
    pub fn from_document(doc: OntologyDocument) -> Result<Self, DefinitionError> {
        let mut ontology =
            Ontology::new(doc.domain, doc.version).with_description(doc.description);

        for node in doc.node_types {
            if ontology.nodes.contains_key(&node.name) {
                return Err(DefinitionError::DuplicateNodeType(node.name));
            }
            ontology.register_node_type(node);
        }
        for rel in doc.relationship_types {
            if ontology.relationships.contains_key(&rel.name) {
                return Err(DefinitionError::DuplicateRelationshipType(rel.name));
            }
            ontology.register_relationship_type(rel);
        }

        ontology.validate()?;
        Ok(ontology)
    }

    pub fn to_document(&self) -> OntologyDocument {
        OntologyDocument {
            domain: self.domain.clone(),
            version: self.version.clone(),
            description: self.description.clone(),
            node_types: self.nodes.values().cloned().collect(),
            relationship_types: self.relationships.values().cloned().collect(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, CorpusError> {
        let doc: OntologyDocument = serde_json::from_str(json)?;
        Ok(Self::from_document(doc)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CorpusError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

fn check_properties(owner: &str, properties: &[PropertyDef]) -> Result<(), DefinitionError> {
    let mut seen = HashSet::new();
    for prop in properties {
        if prop.name.trim().is_empty() {
            return Err(DefinitionError::EmptyPropertyName {
                owner: owner.to_string(),
            });
        }
        if !seen.insert(prop.name.as_str()) {
            return Err(DefinitionError::DuplicateProperty {
                owner: owner.to_string(),
                property: prop.name.clone(),
            });
        }
    }
    Ok(())
}
