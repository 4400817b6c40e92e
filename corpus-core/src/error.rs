use thiserror::Error;

use crate::completion::CompletionError;
use crate::embeddings::EmbeddingError;
use crate::graph::GraphError;

/// Defects in the ontology itself. Always surfaced to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("type name must not be empty")]
    EmptyTypeName,

    #[error("node type '{0}' is defined more than once")]
    DuplicateNodeType(String),

    #[error("relationship type '{0}' is defined more than once")]
    DuplicateRelationshipType(String),

    #[error("unknown node type '{0}'")]
    UnknownNodeType(String),

    #[error("'{owner}' has a property with an empty name")]
    EmptyPropertyName { owner: String },

    #[error("'{owner}' declares property '{property}' more than once")]
    DuplicateProperty { owner: String, property: String },

    #[error("query tool '{tool}' uses placeholder '${placeholder}' without declaring it")]
    UndeclaredPlaceholder { tool: String, placeholder: String },

    #[error("node type '{node_type}' uses identity key '{key}' which is not one of its properties")]
    UnknownIdentityKey { node_type: String, key: String },
}

/// An entity or relationship that does not fit the ontology.
/// Skipped per entity; the batch carries on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unknown entity type '{0}'")]
    UnknownEntityType(String),

    #[error("unknown relationship type '{0}'")]
    UnknownRelationshipType(String),

    #[error("invalid graph label '{0}'")]
    InvalidLabel(String),
}

#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("Definition error: {0}")]
    Definition(#[from] DefinitionError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Graph store error: {0}")]
    Graph(#[from] GraphError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Completion error: {0}")]
    Completion(#[from] CompletionError),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
