//! Deterministic entity identity.
//!
//! The same entity extracted twice, from different documents or on different
//! machines, maps to the same node without a central id allocator.

use sha2::{Digest, Sha256};

use corpus_core::ontology::{NodeType, IDENTITY_PROPERTY};
use corpus_core::value::{properties_to_json, PropertyMap};

/// Natural keys tried in order when a node type does not name its own.
pub const DEFAULT_IDENTITY_KEYS: [&str; 7] = [
    "number",
    "bioguide_id",
    "system_code",
    "cik",
    "accession_number",
    "name",
    "title",
];

/// Hex characters kept from the SHA-256 digest.
pub const IDENTITY_HEX_LEN: usize = 16;

fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(IDENTITY_HEX_LEN);
    hex
}

/// Identity of an entity of `entity_type` with the given properties.
///
/// # Constraints
/// * A non-blank `id` property is used verbatim; a blank one counts as absent
/// * Otherwise the first present key among the node type's `identity_keys`
///   (or `DEFAULT_IDENTITY_KEYS`) gives `sha256("{type}:{value}")[..16]`
/// * With no key present, the hash covers `"{type}:"` followed by the
///   canonical JSON of all properties
pub fn derive_identity(
    entity_type: &str,
    node_type: Option<&NodeType>,
    properties: &PropertyMap,
) -> String {
    if let Some(id) = properties
        .get(IDENTITY_PROPERTY)
        .map(ToString::to_string)
        .filter(|id| !id.trim().is_empty())
    {
        return id;
    }

    let configured: Vec<&str> = node_type
        .map(|n| n.identity_keys.iter().map(String::as_str).collect())
        .unwrap_or_default();
    let keys: &[&str] = if configured.is_empty() {
        &DEFAULT_IDENTITY_KEYS[..]
    } else {
        &configured[..]
    };

    if let Some(value) = keys.iter().find_map(|k| properties.get(*k)) {
        return short_hash(&format!("{entity_type}:{value}"));
    }

    // BTreeMap keeps keys sorted, so this is canonical.
    let canonical = serde_json::Value::Object(properties_to_json(properties)).to_string();
    tracing::debug!(entity_type, "No natural key present, hashing all properties");
    short_hash(&format!("{entity_type}:{canonical}"))
}
