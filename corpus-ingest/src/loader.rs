//! Graph loader: validated, idempotent upserts into the graph store
//!
//! Per entity:
//! - Resolve the node type (unknown types are skipped)
//! - Derive a deterministic identity
//! - Attach an embedding when the type has a vector property and a backend
//!   is configured
//! - `MERGE` the node, then each relationship independently
//!
//! Every write is a single `MERGE`, so re-running a batch is safe and a
//! failed relationship never rolls back its node.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use corpus_core::embeddings::{EmbeddingBackend, EmbeddingError};
use corpus_core::entity::{ExtractedEntity, RelationshipRef};
use corpus_core::error::ValidationError;
use corpus_core::generators::{generate_cypher_schema, index_name, schema_statements, IndexKind};
use corpus_core::graph::{GraphError, GraphSession, Record};
use corpus_core::ontology::{NodeType, Ontology, IDENTITY_PROPERTY};
use corpus_core::value::properties_to_json;

use crate::identity::derive_identity;
use crate::report::LoadReport;

/// Properties whose values make up the text that gets embedded.
pub const TEXT_PROPERTIES: [&str; 6] = ["name", "title", "number", "summary", "description", "content"];

#[derive(Error, Debug)]
pub enum LoadError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Graph store error: {0}")]
    Graph(#[from] GraphError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("{relationship} from {from_type} '{from_id}' to {to_type} '{to_id}' not written: endpoint missing")]
    MissingEndpoint {
        relationship: String,
        from_type: String,
        from_id: String,
        to_type: String,
        to_id: String,
    },

    #[error("Graph store returned no id for {entity_type} '{id}'")]
    NoResult { entity_type: String, id: String },
}

impl LoadError {
    /// Validation failures are skipped; everything else may succeed on retry.
    pub fn is_validation(&self) -> bool {
        matches!(self, LoadError::Validation(_))
    }
}

/// One similarity-search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub domain: String,
    pub score: f64,
    pub properties: serde_json::Map<String, Value>,
}

/// Result of loading one entity together with its relationships.
#[derive(Debug)]
pub struct EntityLoad {
    pub id: String,
    pub relationships_loaded: usize,
    pub relationship_errors: Vec<LoadError>,
}

/// Quote a label or relationship type for interpolation into Cypher.
fn quote_identifier(name: &str) -> Result<String, ValidationError> {
    if name.trim().is_empty() || name.contains('`') {
        return Err(ValidationError::InvalidLabel(name.to_string()));
    }
    Ok(format!("`{name}`"))
}

/// Text embedded for an entity: its type followed by the values of the
/// `TEXT_PROPERTIES` it has.
pub fn text_representation(entity: &ExtractedEntity) -> String {
    let mut parts = vec![entity.entity_type.clone()];
    for key in TEXT_PROPERTIES {
        if let Some(value) = entity.property(key) {
            parts.push(value.to_string());
        }
    }
    parts.join(" ")
}

pub struct GraphLoader {
    ontology: Arc<Ontology>,
    session: Arc<dyn GraphSession>,
    embeddings: Option<Arc<dyn EmbeddingBackend>>,
    registry: HashSet<String>,
}

impl GraphLoader {
    /// Loader whose relationship registry is the ontology's relationship names.
    pub fn new(ontology: Arc<Ontology>, session: Arc<dyn GraphSession>) -> Self {
        let registry = ontology.relationship_names();
        Self {
            ontology,
            session,
            embeddings: None,
            registry,
        }
    }

    pub fn with_embeddings(mut self, backend: Arc<dyn EmbeddingBackend>) -> Self {
        self.embeddings = Some(backend);
        self
    }

    /// Replace the relationship registry. An empty registry accepts every
    /// relationship kind.
    pub fn with_relationship_registry<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.registry = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn ontology(&self) -> &Ontology {
        &self.ontology
    }

    pub fn registry(&self) -> &HashSet<String> {
        &self.registry
    }

    async fn attach_embedding(&self, node_type: &NodeType, entity: &mut ExtractedEntity) {
        if entity.embedding.is_some() || node_type.vector_property().is_none() {
            return;
        }
        let Some(backend) = &self.embeddings else {
            return;
        };

        match backend.embed(&text_representation(entity)).await {
            Ok(Some(vector)) => entity.embedding = Some(vector),
            Ok(None) => {
                tracing::debug!(entity_type = %entity.entity_type, "Embedding unavailable, storing node without vector");
            }
            Err(e) => {
                tracing::warn!(
                    entity_type = %entity.entity_type,
                    backend = backend.name(),
                    error = %e,
                    "Embedding failed, storing node without vector"
                );
            }
        }
    }

    /// Upsert a single node and return its id.
    ///
    /// # Constraints
    /// * Unknown entity type → `ValidationError`, nothing written
    /// * Labels are the entity type plus the type's additional labels
    /// * Embedding failures are logged; the node is written without a vector
    /// * Loading the same identity twice updates the existing node
    pub async fn load_entity(&self, entity: &mut ExtractedEntity) -> Result<String, LoadError> {
        let node_type = self
            .ontology
            .get_node_type(&entity.entity_type)
            .ok_or_else(|| ValidationError::UnknownEntityType(entity.entity_type.clone()))?;

        let labels = node_type
            .labels()
            .into_iter()
            .map(quote_identifier)
            .collect::<Result<Vec<_>, _>>()?
            .join(":");

        let id = derive_identity(&entity.entity_type, Some(node_type), &entity.properties);
        self.attach_embedding(node_type, entity).await;

        let mut props = entity.to_graph_properties();
        if let (Some(vector), Some(prop)) = (&entity.embedding, node_type.vector_property()) {
            props.insert(prop.name.clone(), json!(vector));
        }
        props.insert(IDENTITY_PROPERTY.to_string(), Value::from(id.as_str()));

        let query = format!("MERGE (n:{labels} {{id: $id}}) SET n += $props RETURN n.id AS id");
        let records = self
            .session
            .run(&query, json!({ "id": id, "props": props }))
            .await?;

        let stored = records
            .first()
            .and_then(|r| r.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| LoadError::NoResult {
                entity_type: entity.entity_type.clone(),
                id: id.clone(),
            })?;

        tracing::debug!(id = %stored, entity_type = %entity.entity_type, "Entity loaded");
        Ok(stored)
    }

    /// Create or update one relationship from an already-loaded node.
    ///
    /// # Constraints
    /// * A kind missing from a non-empty registry → `ValidationError`, no write
    /// * Both endpoints must already exist; otherwise `MissingEndpoint`
    pub async fn load_relationship(
        &self,
        from_type: &str,
        from_id: &str,
        relationship: &RelationshipRef,
    ) -> Result<(), LoadError> {
        let kind = &relationship.relationship_type;
        if !self.registry.is_empty() && !self.registry.contains(kind) {
            tracing::warn!(relationship = %kind, "Relationship kind not in registry, skipping");
            return Err(ValidationError::UnknownRelationshipType(kind.clone()).into());
        }

        let query = format!(
            "MATCH (a:{} {{id: $from_id}}) \
             MATCH (b:{} {{id: $to_id}}) \
             MERGE (a)-[r:{}]->(b) \
             SET r += $props \
             RETURN type(r) AS type",
            quote_identifier(from_type)?,
            quote_identifier(&relationship.target_type)?,
            quote_identifier(kind)?,
        );
        let params = json!({
            "from_id": from_id,
            "to_id": relationship.target_id,
            "props": properties_to_json(&relationship.properties),
        });

        let records = self.session.run(&query, params).await?;
        if records.is_empty() {
            return Err(LoadError::MissingEndpoint {
                relationship: kind.clone(),
                from_type: from_type.to_string(),
                from_id: from_id.to_string(),
                to_type: relationship.target_type.clone(),
                to_id: relationship.target_id.clone(),
            });
        }

        tracing::debug!(from_id, to_id = %relationship.target_id, relationship = %kind, "Relationship created");
        Ok(())
    }

    /// Load the node, then each of its relationships. Relationship failures
    /// are collected; they never undo the node write.
    pub async fn load_entity_with_relationships(
        &self,
        entity: &mut ExtractedEntity,
    ) -> Result<EntityLoad, LoadError> {
        let id = self.load_entity(entity).await?;

        let mut outcome = EntityLoad {
            id,
            relationships_loaded: 0,
            relationship_errors: Vec::new(),
        };
        for relationship in &entity.relationships {
            match self
                .load_relationship(&entity.entity_type, &outcome.id, relationship)
                .await
            {
                Ok(()) => outcome.relationships_loaded += 1,
                Err(e) => outcome.relationship_errors.push(e),
            }
        }
        Ok(outcome)
    }

    /// Load a batch sequentially. Failures are counted in the report and the
    /// batch carries on.
    pub async fn load_entities(&self, entities: Vec<ExtractedEntity>) -> LoadReport {
        let mut report = LoadReport {
            attempted: entities.len(),
            ..Default::default()
        };

        for mut entity in entities {
            match self.load_entity_with_relationships(&mut entity).await {
                Ok(outcome) => {
                    report.loaded += 1;
                    report.relationships_loaded += outcome.relationships_loaded;
                    report.relationships_failed += outcome.relationship_errors.len();
                    for e in outcome.relationship_errors {
                        report.errors.push(format!("{}: {e}", entity.entity_type));
                    }
                    report.ids.push(outcome.id);
                }
                Err(e) => {
                    if e.is_validation() {
                        tracing::warn!(entity_type = %entity.entity_type, error = %e, "Entity skipped");
                    } else {
                        tracing::error!(entity_type = %entity.entity_type, error = %e, "Entity load failed");
                    }
                    report.failed += 1;
                    report.errors.push(format!("{}: {e}", entity.entity_type));
                }
            }
        }

        tracing::info!(
            attempted = report.attempted,
            loaded = report.loaded,
            failed = report.failed,
            "Batch loaded"
        );
        report
    }

    /// Search nodes by embedding similarity.
    ///
    /// # Arguments
    /// * `query` - Free text, embedded with `embed_query`
    /// * `entity_type` - Restrict to one node type; `None` searches every
    ///   type that declares a vector property
    /// * `limit` - Maximum number of hits
    ///
    /// # Returns
    /// Hits ordered by descending score. Empty when no embedding backend is
    /// configured, the backend reports the embedding as unavailable, or the
    /// requested type has no vector property.
    pub async fn semantic_search(
        &self,
        query: &str,
        entity_type: Option<&str>,
        limit: usize,
    ) -> Result<Vec<SearchHit>, LoadError> {
        let query = query.trim();
        if query.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let Some(backend) = &self.embeddings else {
            tracing::warn!("Embedding backend not configured, semantic search unavailable");
            return Ok(Vec::new());
        };

        let targets: Vec<&NodeType> = match entity_type {
            Some(name) => {
                let node = self
                    .ontology
                    .get_node_type(name)
                    .ok_or_else(|| ValidationError::UnknownEntityType(name.to_string()))?;
                vec![node]
            }
            None => self.ontology.node_types().collect(),
        };
        let targets: Vec<(&NodeType, String)> = targets
            .into_iter()
            .filter_map(|n| n.vector_property().map(|p| (n, p.name.clone())))
            .collect();
        if targets.is_empty() {
            return Ok(Vec::new());
        }

        let vector = match backend.embed_query(query).await? {
            Some(v) => v,
            None => {
                tracing::warn!("Embedding unavailable for query, returning no results");
                return Ok(Vec::new());
            }
        };

        let mut hits = Vec::new();
        for (node, vector_prop) in targets {
            let statement = format!(
                "CALL db.index.vector.queryNodes($index_name, $limit, $embedding) \
                 YIELD node, score \
                 WHERE node:{} \
                 RETURN node.id AS id, node.domain AS domain, score, properties(node) AS properties",
                quote_identifier(&node.name)?
            );
            let params = json!({
                "index_name": index_name(&node.name, &vector_prop, IndexKind::Vector),
                "limit": limit,
                "embedding": vector,
            });

            let records = self.session.run(&statement, params).await?;
            hits.extend(
                records
                    .into_iter()
                    .filter_map(|r| search_hit(&node.name, &vector_prop, r)),
            );
        }

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit);
        Ok(hits)
    }

    /// Run an arbitrary statement.
    pub async fn run_query(&self, query: &str, params: Value) -> Result<Vec<Record>, GraphError> {
        self.session.run(query, params).await
    }

    /// Create the ontology's constraints and indexes. Returns the number of
    /// statements executed.
    pub async fn apply_schema(&self) -> Result<usize, GraphError> {
        let statements = schema_statements(&generate_cypher_schema(&self.ontology));
        for statement in &statements {
            self.session.run(statement, json!({})).await?;
        }
        tracing::info!(
            domain = self.ontology.domain(),
            statements = statements.len(),
            "Schema applied"
        );
        Ok(statements.len())
    }
}

fn search_hit(entity_type: &str, vector_prop: &str, mut record: Record) -> Option<SearchHit> {
    let id = record.get("id")?.as_str()?.to_string();
    let score = record.get("score")?.as_f64()?;
    let domain = record
        .get("domain")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let mut properties = match record.remove("properties") {
        Some(Value::Object(map)) => map,
        _ => serde_json::Map::new(),
    };
    properties.remove(vector_prop);

    Some(SearchHit {
        id,
        entity_type: entity_type.to_string(),
        domain,
        score,
        properties,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_representation_uses_type_and_key_properties() {
        let entity = ExtractedEntity::new("Bill")
            .with_property("summary", "Funds roads")
            .with_property("number", "H.R.1")
            .with_property("title", "Infrastructure Act")
            .with_property("congress", 118i64);

        assert_eq!(
            text_representation(&entity),
            "Bill Infrastructure Act H.R.1 Funds roads"
        );
    }

    #[test]
    fn identifiers_are_backtick_quoted() {
        assert_eq!(quote_identifier("Bill").unwrap(), "`Bill`");
        assert_eq!(quote_identifier("Legal Entity").unwrap(), "`Legal Entity`");
        assert!(matches!(
            quote_identifier("Bad`Label"),
            Err(ValidationError::InvalidLabel(_))
        ));
        assert!(quote_identifier(" ").is_err());
    }

    #[test]
    fn search_hit_strips_vector() {
        let record: Record = serde_json::from_value(json!({
            "id": "abc",
            "domain": "congressional",
            "score": 0.9,
            "properties": {"id": "abc", "embedding": [0.1, 0.2], "title": "x"}
        }))
        .unwrap();

        let hit = search_hit("Bill", "embedding", record).unwrap();
        assert_eq!(hit.entity_type, "Bill");
        assert!(!hit.properties.contains_key("embedding"));
        assert_eq!(hit.properties["title"], json!("x"));
    }
}
