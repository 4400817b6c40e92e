//! Neo4j constraint and index script.

use std::borrow::Cow;

use crate::embeddings::DEFAULT_DIMENSIONS;
use crate::ontology::Ontology;

const RULE: &str =
    "// ============================================================================";

/// Kind of schema object created for a property; determines the name suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Unique,
    Exists,
    Range,
    Fulltext,
    Vector,
}

impl IndexKind {
    pub fn suffix(self) -> &'static str {
        match self {
            IndexKind::Unique => "unique",
            IndexKind::Exists => "exists",
            IndexKind::Range => "idx",
            IndexKind::Fulltext => "fulltext",
            IndexKind::Vector => "vector",
        }
    }
}

/// Name of the constraint or index generated for `type_name.property`.
/// The loader uses this to address vector indexes.
pub fn index_name(type_name: &str, property: &str, kind: IndexKind) -> String {
    format!("{}_{}_{}", type_name.to_lowercase(), property, kind.suffix())
}

/// Name as written into Cypher. Plain identifiers are kept as they are;
/// anything else is backtick-quoted with embedded backticks doubled.
fn cypher_name(name: &str) -> Cow<'_, str> {
    let mut chars = name.chars();
    let plain = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("`{}`", name.replace('`', "``")))
    }
}

fn section(lines: &mut Vec<String>, title: &str) {
    lines.push(RULE.to_string());
    lines.push(format!("// {title}"));
    lines.push(RULE.to_string());
    lines.push(String::new());
}

/// Render the full constraint/index script for an ontology.
pub fn generate_cypher_schema(ontology: &Ontology) -> String {
    let mut lines = vec![
        "// Auto-generated Neo4j schema from ontology".to_string(),
        "// DO NOT EDIT - regenerate with `corpus generate`".to_string(),
        format!("// Ontology: {} v{}", ontology.domain(), ontology.version()),
        String::new(),
    ];

    section(&mut lines, "Constraints");
    for node in ontology.node_types() {
        lines.push(format!("// {} constraints", node.name));
        for prop in &node.properties {
            if prop.unique {
                lines.push(format!(
                    "CREATE CONSTRAINT {} IF NOT EXISTS FOR (n:{}) REQUIRE n.{} IS UNIQUE;",
                    cypher_name(&index_name(&node.name, &prop.name, IndexKind::Unique)),
                    cypher_name(&node.name),
                    cypher_name(&prop.name)
                ));
            } else if prop.required {
                lines.push(format!(
                    "CREATE CONSTRAINT {} IF NOT EXISTS FOR (n:{}) REQUIRE n.{} IS NOT NULL;",
                    cypher_name(&index_name(&node.name, &prop.name, IndexKind::Exists)),
                    cypher_name(&node.name),
                    cypher_name(&prop.name)
                ));
            }
        }
        lines.push(String::new());
    }

    section(&mut lines, "Indexes");
    for node in ontology.node_types() {
        lines.push(format!("// {} indexes", node.name));
        for prop in &node.properties {
            // A uniqueness constraint already backs an index.
            if prop.indexed && !prop.unique {
                lines.push(format!(
                    "CREATE INDEX {} IF NOT EXISTS FOR (n:{}) ON (n.{});",
                    cypher_name(&index_name(&node.name, &prop.name, IndexKind::Range)),
                    cypher_name(&node.name),
                    cypher_name(&prop.name)
                ));
            } else if prop.fulltext {
                lines.push(format!(
                    "CREATE FULLTEXT INDEX {} IF NOT EXISTS FOR (n:{}) ON EACH [n.{}];",
                    cypher_name(&index_name(&node.name, &prop.name, IndexKind::Fulltext)),
                    cypher_name(&node.name),
                    cypher_name(&prop.name)
                ));
            } else if prop.prop_type.is_vector() {
                lines.push(format!(
                    "CREATE VECTOR INDEX {} IF NOT EXISTS FOR (n:{}) ON (n.{}) \
                     OPTIONS {{indexConfig: {{`vector.dimensions`: {}, \
                     `vector.similarity_function`: 'cosine'}}}};",
                    cypher_name(&index_name(&node.name, &prop.name, IndexKind::Vector)),
                    cypher_name(&node.name),
                    cypher_name(&prop.name),
                    DEFAULT_DIMENSIONS
                ));
            }
        }
        lines.push(String::new());
    }

    section(&mut lines, "Relationship Indexes");
    for rel in ontology.relationship_types() {
        for prop in rel.properties.iter().filter(|p| p.indexed) {
            lines.push(format!(
                "CREATE INDEX {} IF NOT EXISTS FOR ()-[r:{}]-() ON (r.{});",
                cypher_name(&index_name(&rel.name, &prop.name, IndexKind::Range)),
                cypher_name(&rel.name),
                cypher_name(&prop.name)
            ));
        }
    }

    lines.join("\n")
}

/// Split a generated script into executable statements, dropping comments
/// and the trailing semicolons.
pub fn schema_statements(script: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();

    for line in script.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(line);

        if let Some(stmt) = current.strip_suffix(';') {
            statements.push(stmt.trim().to_string());
            current.clear();
        }
    }

    if !current.trim().is_empty() {
        statements.push(current.trim().to_string());
    }
    statements
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ontology::{
        common_properties, NodeType, PropertyDef, PropertyType, RelationshipType,
    };

    fn bill_ontology() -> Ontology {
        let mut ontology = Ontology::new("congressional", "1.0.0");
        ontology.register_node_type(
            NodeType::new("Bill", "A bill")
                .properties(common_properties())
                .property(
                    PropertyDef::new("number", PropertyType::String)
                        .required()
                        .unique(),
                )
                .property(
                    PropertyDef::new("title", PropertyType::Text)
                        .required()
                        .fulltext(),
                )
                .property(PropertyDef::new("congress", PropertyType::Integer).indexed()),
        );
        ontology.register_relationship_type(
            RelationshipType::new("SPONSORS", "Member", "Bill")
                .property(PropertyDef::new("date", PropertyType::Date).indexed())
                .property(PropertyDef::new("note", PropertyType::String)),
        );
        ontology
    }

    #[test]
    fn unique_property_gets_constraint_but_no_range_index() {
        let script = generate_cypher_schema(&bill_ontology());

        assert!(script.contains(
            "CREATE CONSTRAINT bill_number_unique IF NOT EXISTS FOR (n:Bill) REQUIRE n.number IS UNIQUE;"
        ));
        assert!(!script.contains("bill_number_idx"));
        assert!(!script.contains("bill_number_exists"));
        assert_eq!(script.matches("bill_number_unique").count(), 1);
    }

    #[test]
    fn required_fulltext_property() {
        let script = generate_cypher_schema(&bill_ontology());

        assert!(script.contains(
            "CREATE CONSTRAINT bill_title_exists IF NOT EXISTS FOR (n:Bill) REQUIRE n.title IS NOT NULL;"
        ));
        assert!(script.contains(
            "CREATE FULLTEXT INDEX bill_title_fulltext IF NOT EXISTS FOR (n:Bill) ON EACH [n.title];"
        ));
        assert!(!script.contains("bill_title_idx"));
    }

    #[test]
    fn vector_and_range_indexes() {
        let script = generate_cypher_schema(&bill_ontology());

        assert!(script.contains(
            "CREATE INDEX bill_congress_idx IF NOT EXISTS FOR (n:Bill) ON (n.congress);"
        ));
        assert!(script.contains(
            "CREATE VECTOR INDEX bill_embedding_vector IF NOT EXISTS FOR (n:Bill) ON (n.embedding) \
             OPTIONS {indexConfig: {`vector.dimensions`: 384, `vector.similarity_function`: 'cosine'}};"
        ));
    }

    #[test]
    fn relationship_indexes_only_for_indexed_properties() {
        let script = generate_cypher_schema(&bill_ontology());

        assert!(script.contains(
            "CREATE INDEX sponsors_date_idx IF NOT EXISTS FOR ()-[r:SPONSORS]-() ON (r.date);"
        ));
        assert!(!script.contains("sponsors_note"));
    }

    #[test]
    fn output_is_deterministic() {
        let ontology = bill_ontology();
        assert_eq!(
            generate_cypher_schema(&ontology),
            generate_cypher_schema(&ontology.clone())
        );
        assert!(generate_cypher_schema(&ontology).starts_with(
            "// Auto-generated Neo4j schema from ontology"
        ));
        assert!(generate_cypher_schema(&ontology).contains("// Ontology: congressional v1.0.0"));
    }

    #[test]
    fn empty_ontology_still_has_sections() {
        let script = generate_cypher_schema(&Ontology::new("empty", "0.1.0"));
        assert!(script.contains("// Constraints"));
        assert!(script.contains("// Indexes"));
        assert!(script.contains("// Relationship Indexes"));
        assert!(schema_statements(&script).is_empty());
    }

    #[test]
    fn statements_are_split_without_comments() {
        let script = generate_cypher_schema(&bill_ontology());
        let statements = schema_statements(&script);

        assert!(statements.iter().all(|s| !s.starts_with("//") && !s.ends_with(';')));
        assert_eq!(
            statements[0],
            "CREATE CONSTRAINT bill_id_unique IF NOT EXISTS FOR (n:Bill) REQUIRE n.id IS UNIQUE"
        );
        // id, number unique; title exists; congress idx; title fulltext; embedding vector; sponsors date
        assert_eq!(statements.len(), 7);
    }

    #[test]
    fn index_name_lowercases_type_only() {
        assert_eq!(
            index_name("Bill", "latestAction", IndexKind::Range),
            "bill_latestAction_idx"
        );
    }

    #[test]
    fn names_that_are_not_identifiers_are_quoted() {
        assert_eq!(cypher_name("Bill"), "Bill");
        assert_eq!(cypher_name("_private2"), "_private2");
        assert_eq!(cypher_name("Legal Entity"), "`Legal Entity`");
        assert_eq!(cypher_name("2fa"), "`2fa`");
        assert_eq!(cypher_name("odd`name"), "`odd``name`");

        let mut ontology = Ontology::new("test", "1.0.0");
        ontology.register_node_type(
            NodeType::new("Legal Entity", "")
                .property(PropertyDef::new("tax id", PropertyType::String).unique()),
        );
        ontology.register_relationship_type(
            RelationshipType::new("OWNED BY", "Legal Entity", "Legal Entity")
                .property(PropertyDef::new("since", PropertyType::Date).indexed()),
        );

        let statements = schema_statements(&generate_cypher_schema(&ontology));
        assert_eq!(
            statements,
            vec![
                "CREATE CONSTRAINT `legal entity_tax id_unique` IF NOT EXISTS \
                 FOR (n:`Legal Entity`) REQUIRE n.`tax id` IS UNIQUE",
                "CREATE INDEX `owned by_since_idx` IF NOT EXISTS \
                 FOR ()-[r:`OWNED BY`]-() ON (r.since)",
            ]
        );
    }
}
