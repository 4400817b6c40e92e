//! Schema generators
//!
//! Pure functions from an `Ontology` to the three target artifacts. Output
//! depends only on the registration order of the ontology and never on the
//! clock, so repeated builds are byte-identical.

pub mod cypher;
pub mod jsonld;
pub mod proto;

use std::path::{Path, PathBuf};

use crate::error::CorpusError;
use crate::ontology::Ontology;

pub use cypher::{generate_cypher_schema, index_name, schema_statements, IndexKind};
pub use jsonld::{generate_jsonld_context, jsonld_context_document};
pub use proto::generate_proto;

pub const CYPHER_FILE: &str = "schema.cypher";
pub const PROTO_FILE: &str = "knowledge_graph.proto";
pub const JSONLD_FILE: &str = "context.jsonld";

/// Paths written by `write_artifacts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub cypher: PathBuf,
    pub proto: PathBuf,
    pub jsonld: PathBuf,
}

/// Write all three artifacts into `dir`, creating it if needed. Files are
/// written one after another; a failure can leave a partial set behind.
pub fn write_artifacts(ontology: &Ontology, dir: impl AsRef<Path>) -> Result<ArtifactPaths, CorpusError> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let paths = ArtifactPaths {
        cypher: dir.join(CYPHER_FILE),
        proto: dir.join(PROTO_FILE),
        jsonld: dir.join(JSONLD_FILE),
    };

    std::fs::write(&paths.cypher, generate_cypher_schema(ontology))?;
    std::fs::write(&paths.proto, generate_proto(ontology))?;
    std::fs::write(&paths.jsonld, generate_jsonld_context(ontology))?;

    tracing::info!(
        domain = ontology.domain(),
        dir = %dir.display(),
        node_types = ontology.node_count(),
        relationship_types = ontology.relationship_count(),
        "Schema artifacts written"
    );

    Ok(paths)
}
