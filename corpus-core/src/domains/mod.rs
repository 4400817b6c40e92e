//! Built-in domain ontologies.

pub mod congress;
pub mod edgar;

use crate::ontology::Ontology;

/// Names accepted by `by_name`.
pub const BUILTIN_DOMAINS: [&str; 2] = [congress::DOMAIN, edgar::DOMAIN];

/// Built-in ontology by domain name. `congress` is accepted as an alias.
pub fn by_name(name: &str) -> Option<Ontology> {
    match name {
        "congressional" | "congress" => Some(congress::ontology()),
        "edgar" => Some(edgar::ontology()),
        _ => None,
    }
}
