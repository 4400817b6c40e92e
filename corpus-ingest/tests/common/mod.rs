//! In-memory collaborators for loader and extractor tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use corpus_core::completion::{CompletionBackend, CompletionError};
use corpus_core::embeddings::{EmbeddingBackend, EmbeddingError};
use corpus_core::graph::{GraphError, GraphSession, Record};
use corpus_core::ontology::{
    common_properties, NodeType, Ontology, PropertyDef, PropertyType, QueryTool, RelationshipType,
};

#[derive(Debug, Clone)]
pub struct StoredNode {
    pub labels: Vec<String>,
    pub props: Map<String, Value>,
}

#[derive(Debug, Clone)]
pub struct StoredEdge {
    pub from: String,
    pub kind: String,
    pub to: String,
    pub props: Map<String, Value>,
}

/// Graph session that understands the loader's node and relationship
/// merges and answers vector queries from canned hits.
#[derive(Default)]
pub struct MemorySession {
    pub nodes: Mutex<BTreeMap<String, StoredNode>>,
    pub edges: Mutex<Vec<StoredEdge>>,
    pub statements: Mutex<Vec<(String, Value)>>,
    /// index name -> records returned by `db.index.vector.queryNodes`
    pub vector_hits: Mutex<HashMap<String, Vec<Record>>>,
    /// Statements containing this text fail with a query error
    pub fail_on: Mutex<Option<String>>,
}

fn between<'a>(text: &'a str, start: &str, end: &str) -> &'a str {
    let from = text.find(start).map(|i| i + start.len()).unwrap_or(0);
    let rest = &text[from..];
    let to = rest.find(end).unwrap_or(rest.len());
    &rest[..to]
}

fn unquote(label: &str) -> String {
    label.trim_matches('`').to_string()
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: &str) -> Option<StoredNode> {
        self.nodes.lock().unwrap().get(id).cloned()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.lock().unwrap().len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.lock().unwrap().len()
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().unwrap().iter().map(|(s, _)| s.clone()).collect()
    }

    pub fn fail_on(&self, fragment: &str) {
        *self.fail_on.lock().unwrap() = Some(fragment.to_string());
    }

    pub fn add_vector_hit(&self, index: &str, id: &str, score: f64, props: Value) {
        let record: Record = serde_json::from_value(json!({
            "id": id,
            "domain": "test",
            "score": score,
            "properties": props,
        }))
        .unwrap();
        self.vector_hits
            .lock()
            .unwrap()
            .entry(index.to_string())
            .or_default()
            .push(record);
    }

    fn merge_node(&self, query: &str, params: &Value) -> Vec<Record> {
        let labels = between(query, "MERGE (n:", " {id:")
            .split(':')
            .map(unquote)
            .collect();
        let id = params["id"].as_str().unwrap().to_string();
        let props = params["props"].as_object().cloned().unwrap_or_default();

        let mut nodes = self.nodes.lock().unwrap();
        let node = nodes.entry(id.clone()).or_insert_with(|| StoredNode {
            labels,
            props: Map::new(),
        });
        for (k, v) in props {
            node.props.insert(k, v);
        }

        vec![serde_json::from_value(json!({ "id": id })).unwrap()]
    }

    fn merge_edge(&self, query: &str, params: &Value) -> Vec<Record> {
        let from_label = unquote(between(query, "MATCH (a:", " {"));
        let to_label = unquote(between(query, "MATCH (b:", " {"));
        let kind = unquote(between(query, "[r:", "]"));
        let from = params["from_id"].as_str().unwrap().to_string();
        let to = params["to_id"].as_str().unwrap().to_string();

        let nodes = self.nodes.lock().unwrap();
        let has = |id: &str, label: &str| {
            nodes
                .get(id)
                .map(|n| n.labels.iter().any(|l| l == label))
                .unwrap_or(false)
        };
        if !has(&from, &from_label) || !has(&to, &to_label) {
            return Vec::new();
        }

        let props = params["props"].as_object().cloned().unwrap_or_default();
        let mut edges = self.edges.lock().unwrap();
        match edges
            .iter_mut()
            .find(|e| e.from == from && e.kind == kind && e.to == to)
        {
            Some(edge) => edge.props.extend(props),
            None => edges.push(StoredEdge {
                from,
                kind: kind.clone(),
                to,
                props,
            }),
        }

        vec![serde_json::from_value(json!({ "type": kind })).unwrap()]
    }

    fn vector_query(&self, params: &Value) -> Vec<Record> {
        let index = params["index_name"].as_str().unwrap();
        let limit = params["limit"].as_u64().unwrap() as usize;
        self.vector_hits
            .lock()
            .unwrap()
            .get(index)
            .map(|hits| hits.iter().take(limit).cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl GraphSession for MemorySession {
    async fn run(&self, query: &str, params: Value) -> Result<Vec<Record>, GraphError> {
        self.statements
            .lock()
            .unwrap()
            .push((query.to_string(), params.clone()));

        if let Some(fragment) = self.fail_on.lock().unwrap().as_deref() {
            if query.contains(fragment) {
                return Err(GraphError::Query {
                    code: "Neo.ClientError.Statement.SyntaxError".to_string(),
                    message: "injected failure".to_string(),
                });
            }
        }

        let records = if query.starts_with("MERGE (n:") {
            self.merge_node(query, &params)
        } else if query.starts_with("MATCH (a:") {
            self.merge_edge(query, &params)
        } else if query.starts_with("CALL db.index.vector.queryNodes") {
            self.vector_query(&params)
        } else {
            Vec::new()
        };
        Ok(records)
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Embedding backend returning a fixed vector, "unavailable", or an error.
pub enum StaticEmbedding {
    Vector(Vec<f32>),
    Unavailable,
    Failing,
}

#[async_trait]
impl EmbeddingBackend for StaticEmbedding {
    async fn embed(&self, _text: &str) -> Result<Option<Vec<f32>>, EmbeddingError> {
        match self {
            StaticEmbedding::Vector(v) => Ok(Some(v.clone())),
            StaticEmbedding::Unavailable => Ok(None),
            StaticEmbedding::Failing => Err(EmbeddingError::MissingEmbedding),
        }
    }

    fn dimensions(&self) -> usize {
        match self {
            StaticEmbedding::Vector(v) => v.len(),
            _ => 3,
        }
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Completion backend returning a canned response and recording prompts.
pub struct StaticCompletion {
    pub response: Result<String, u16>,
    pub prompts: Mutex<Vec<String>>,
}

impl StaticCompletion {
    pub fn ok(response: &str) -> Self {
        Self {
            response: Ok(response.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(code: u16) -> Self {
        Self {
            response: Err(code),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl CompletionBackend for StaticCompletion {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.response {
            Ok(text) => Ok(text.clone()),
            Err(code) => Err(CompletionError::Api {
                code: *code,
                message: "unavailable".to_string(),
            }),
        }
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Bill/Member/Committee ontology with one vector property per type.
pub fn test_ontology() -> Ontology {
    let mut ontology = Ontology::new("test", "1.0.0");
    ontology.register_node_type(
        NodeType::new("Bill", "A legislative bill")
            .schema_org("Legislation")
            .identity_key("number")
            .properties(common_properties())
            .property(
                PropertyDef::new("number", PropertyType::String)
                    .required()
                    .unique()
                    .describe("Bill number"),
            )
            .property(
                PropertyDef::new("title", PropertyType::Text)
                    .required()
                    .fulltext()
                    .describe("Bill title"),
            )
            .tool(
                QueryTool::new(
                    "get_bill",
                    "Get a bill",
                    "MATCH (b:Bill {number: $number}) RETURN b",
                )
                .param("number", "string"),
            ),
    );
    ontology.register_node_type(
        NodeType::new("Member", "A member of Congress")
            .schema_org("Person")
            .label("Person")
            .identity_key("bioguide_id")
            .properties(common_properties())
            .property(PropertyDef::new("bioguide_id", PropertyType::String).unique())
            .property(PropertyDef::new("name", PropertyType::String).describe("Full name")),
    );
    ontology.register_node_type(
        NodeType::new("Topic", "Untyped subject without embeddings")
            .property(PropertyDef::new("name", PropertyType::String)),
    );
    ontology.register_relationship_type(RelationshipType::new("SPONSORS", "Member", "Bill"));
    ontology
}
