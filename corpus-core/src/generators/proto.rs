//! proto3 interface for the knowledge-graph query service.

use std::collections::HashSet;

use crate::ontology::{NodeType, Ontology, PropertyType};

const RULE: &str =
    "// ============================================================================";

/// Messages used by the service definition. Node types with one of these
/// names get a `Node` suffix.
pub const GENERIC_MESSAGES: [&str; 12] = [
    "Empty",
    "Tool",
    "ToolList",
    "SchemaRequest",
    "JsonLdSchema",
    "QueryRequest",
    "QueryResult",
    "SearchRequest",
    "EntityRequest",
    "FilterRequest",
    "EntityList",
    "Entity",
];

const SERVICE: &str = r#"service KnowledgeGraph {
  // Discover available query tools from all domains
  rpc DiscoverTools(Empty) returns (ToolList);

  // Get the JSON-LD schema for an entity type
  rpc GetSchema(SchemaRequest) returns (JsonLdSchema);

  // Execute a registered Cypher query template
  rpc ExecuteQuery(QueryRequest) returns (QueryResult);

  // Semantic search using embeddings
  rpc SemanticSearch(SearchRequest) returns (EntityList);

  // Get an entity by id
  rpc GetEntity(EntityRequest) returns (Entity);

  // Stream entities matching a filter
  rpc StreamEntities(FilterRequest) returns (stream Entity);
}"#;

const GENERIC_MESSAGE_DEFS: &str = r#"message Empty {}

message Tool {
  string name = 1;
  string description = 2;
  string cypher_template = 3;
  map<string, string> parameters = 4;
  string domain = 5;
  string entity_type = 6;
}

message ToolList {
  repeated Tool tools = 1;
}

message SchemaRequest {
  string entity_type = 1;
}

message JsonLdSchema {
  string entity_type = 1;
  string context = 2;  // JSON-LD @context as a JSON string
  string schema = 3;   // Full schema as a JSON string
}

message QueryRequest {
  string tool_name = 1;
  map<string, string> parameters = 2;
}

message QueryResult {
  bool success = 1;
  string data = 2;  // JSON serialized rows
  string error = 3;
  int64 count = 4;
}

message SearchRequest {
  string query = 1;
  int32 limit = 2;
  string entity_type = 3;  // Optional type filter
  string domain = 4;       // Optional domain filter
}

message EntityRequest {
  string id = 1;
  string entity_type = 2;
}

message FilterRequest {
  string entity_type = 1;
  map<string, string> filters = 2;
  int32 limit = 3;
  int32 offset = 4;
}

message EntityList {
  repeated Entity entities = 1;
  int64 total_count = 2;
}

message Entity {
  string id = 1;
  string entity_type = 2;
  string domain = 3;
  map<string, string> properties = 4;
  string json_data = 5;            // Full entity as JSON
  repeated float embedding = 6;
}"#;

fn section(lines: &mut Vec<String>, title: &str) {
    lines.push(RULE.to_string());
    lines.push(format!("// {title}"));
    lines.push(RULE.to_string());
    lines.push(String::new());
}

/// proto3 wire type for a property type.
pub fn proto_type(prop_type: &PropertyType) -> &'static str {
    match prop_type {
        PropertyType::Integer => "int64",
        PropertyType::Float => "double",
        PropertyType::Boolean => "bool",
        PropertyType::Vector => "repeated float",
        // ISO-8601 strings for datetime/date
        _ => "string",
    }
}

/// Replace every character that is not valid in a proto identifier with `_`
/// and make sure the result starts with a letter.
pub fn sanitize_ident(name: &str) -> String {
    let mut ident: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if !ident.starts_with(|c: char| c.is_ascii_alphabetic()) {
        ident.insert_str(0, "f_");
    }
    ident
}

/// Package name derived from the ontology domain, e.g. `corpus.congressional`.
pub fn package_name(domain: &str) -> String {
    format!("corpus.{}", sanitize_ident(&domain.to_lowercase()))
}

/// Message name used for a node type.
pub fn message_name(node_type: &str) -> String {
    let name = sanitize_ident(node_type);
    if GENERIC_MESSAGES.contains(&name.as_str()) {
        format!("{name}Node")
    } else {
        name
    }
}

fn node_message(node: &NodeType) -> Vec<String> {
    let mut lines = Vec::new();
    if !node.description.is_empty() {
        lines.push(format!("// {}", node.description));
    }
    lines.push(format!("message {} {{", message_name(&node.name)));

    let mut used = HashSet::new();
    for (i, prop) in node.properties.iter().enumerate() {
        let mut field = sanitize_ident(&prop.name);
        if !used.insert(field.clone()) {
            let mut n = 2;
            while used.contains(&format!("{field}_{n}")) {
                n += 1;
            }
            field = format!("{field}_{n}");
            used.insert(field.clone());
        }

        let mut line = format!("  {} {} = {};", proto_type(&prop.prop_type), field, i + 1);
        if !prop.description.is_empty() {
            line.push_str(&format!("  // {}", prop.description));
        }
        lines.push(line);
    }

    lines.push("}".to_string());
    lines
}

/// Render the proto3 file for an ontology.
pub fn generate_proto(ontology: &Ontology) -> String {
    let mut lines = vec![
        "// Auto-generated gRPC proto from ontology".to_string(),
        "// DO NOT EDIT - regenerate with `corpus generate`".to_string(),
        format!("// Ontology: {} v{}", ontology.domain(), ontology.version()),
        String::new(),
        "syntax = \"proto3\";".to_string(),
        String::new(),
        format!("package {};", package_name(ontology.domain())),
        String::new(),
    ];

    section(&mut lines, "Service Definition");
    lines.push(SERVICE.to_string());
    lines.push(String::new());

    section(&mut lines, "Common Messages");
    lines.push(GENERIC_MESSAGE_DEFS.to_string());
    lines.push(String::new());

    section(&mut lines, "Entity Messages (generated from ontology)");
    for node in ontology.node_types() {
        lines.extend(node_message(node));
        lines.push(String::new());
    }

    lines.join("\n")
}
