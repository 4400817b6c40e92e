pub mod completion;
pub mod config;
pub mod domains;
pub mod embeddings;
pub mod entity;
pub mod error;
pub mod generators;
pub mod graph;
pub mod ontology;
pub mod value;

pub use completion::{
    CompletionBackend, CompletionClientConfig, CompletionError, OllamaCompletionClient,
};
pub use config::CorpusConfig;
pub use embeddings::{
    create_backend, BackendConfig, EmbeddingBackend, EmbeddingClientConfig, EmbeddingError,
    FallbackEmbeddingClient, OllamaEmbeddingClient, DEFAULT_DIMENSIONS,
};
pub use entity::{ExtractedEntity, RelationshipRef};
pub use error::{CorpusError, DefinitionError, ValidationError};
pub use graph::{GraphError, GraphSession, Neo4jConfig, Neo4jHttpSession, Record};
pub use ontology::{
    common_properties, NodeType, Ontology, OntologyDocument, PropertyDef, PropertyType,
    QueryTool, RelationshipType,
};
pub use value::{PropertyMap, PropertyValue};
