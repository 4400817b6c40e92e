//! JSON-LD context for query-tool discovery.

use serde_json::{json, Map, Value};

use crate::ontology::{
    NodeType, Ontology, PropertyType, AUDIT_PROPERTIES, EMBEDDING_PROPERTY, IDENTITY_PROPERTY,
};

pub const SCHEMA_ORG: &str = "https://schema.org/";
pub const XSD: &str = "http://www.w3.org/2001/XMLSchema#";
pub const MCP_NAMESPACE: &str = "https://mcp.anthropic.com/schema/";
pub const KG_NAMESPACE: &str = "https://knowledge-graph.local/";

/// XSD (or schema.org) type for a property type.
pub fn xsd_type(prop_type: &PropertyType) -> &'static str {
    match prop_type {
        PropertyType::Integer => "xsd:integer",
        PropertyType::Float => "xsd:decimal",
        PropertyType::Boolean => "xsd:boolean",
        PropertyType::Datetime => "xsd:dateTime",
        PropertyType::Date => "xsd:date",
        PropertyType::Vector => "schema:ItemList",
        PropertyType::String | PropertyType::Text | PropertyType::Other(_) => "xsd:string",
    }
}

/// Identity, embedding and audit properties are not advertised.
fn is_internal(name: &str) -> bool {
    name == IDENTITY_PROPERTY || name == EMBEDDING_PROPERTY || AUDIT_PROPERTIES.contains(&name)
}

/// Query tools of a node type in their linked-data form.
pub fn tools_jsonld(node: &NodeType) -> Vec<Value> {
    node.query_tools
        .iter()
        .map(|tool| {
            let parameters: Map<String, Value> = tool
                .parameters
                .iter()
                .map(|(name, ty)| (name.clone(), json!({ "@type": format!("xsd:{ty}") })))
                .collect();

            json!({
                "mcp:name": tool.name,
                "mcp:description": tool.description,
                "mcp:cypher": tool.cypher_template,
                "mcp:parameters": parameters,
            })
        })
        .collect()
}

fn node_entry(node: &NodeType) -> Value {
    let properties: Map<String, Value> = node
        .properties
        .iter()
        .filter(|p| !is_internal(&p.name))
        .map(|p| {
            (
                p.name.clone(),
                json!({
                    "@type": xsd_type(&p.prop_type),
                    "kg:required": p.required,
                    "kg:indexed": p.indexed,
                    "kg:description": p.description,
                }),
            )
        })
        .collect();

    json!({
        "@type": node.schema_org_type.as_deref().unwrap_or("Thing"),
        "@id": format!("kg:{}", node.name),
        "kg:domain": node.domain,
        "kg:description": node.description,
        "kg:properties": properties,
        "mcp:tools": tools_jsonld(node),
    })
}

/// The context document as a JSON value.
pub fn jsonld_context_document(ontology: &Ontology) -> Value {
    let mut context = Map::new();
    context.insert("@vocab".to_string(), SCHEMA_ORG.into());
    context.insert("xsd".to_string(), XSD.into());
    context.insert("schema".to_string(), SCHEMA_ORG.into());
    context.insert("mcp".to_string(), MCP_NAMESPACE.into());
    context.insert("kg".to_string(), KG_NAMESPACE.into());
    context.insert(
        ontology.domain().to_string(),
        format!("https://{}.local/", ontology.domain()).into(),
    );

    let graph: Vec<Value> = ontology.node_types().map(node_entry).collect();

    json!({
        "@context": context,
        "@graph": graph,
    })
}

/// The context document, pretty-printed with two-space indentation.
pub fn generate_jsonld_context(ontology: &Ontology) -> String {
    let doc = jsonld_context_document(ontology);
    // Serializing a `Value` cannot fail.
    serde_json::to_string_pretty(&doc).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ontology::{common_properties, PropertyDef, QueryTool};

    fn ontology() -> Ontology {
        let mut ontology = Ontology::new("congressional", "1.0.0");
        ontology.register_node_type(
            NodeType::new("Bill", "A legislative bill")
                .domain("congressional")
                .schema_org("Legislation")
                .properties(common_properties())
                .property(PropertyDef::new("number", PropertyType::String).required().indexed())
                .property(PropertyDef::new("congress", PropertyType::Integer))
                .tool(
                    QueryTool::new(
                        "get_bill",
                        "Get a bill",
                        "MATCH (b:Bill {number: $number, congress: $congress}) RETURN b",
                    )
                    .param("number", "string")
                    .param("congress", "integer"),
                ),
        );
        ontology.register_node_type(NodeType::new("Note", "Free text"));
        ontology
    }

    #[test]
    fn context_namespaces() {
        let doc = jsonld_context_document(&ontology());
        let ctx = &doc["@context"];

        assert_eq!(ctx["@vocab"], "https://schema.org/");
        assert_eq!(ctx["xsd"], "http://www.w3.org/2001/XMLSchema#");
        assert_eq!(ctx["mcp"], "https://mcp.anthropic.com/schema/");
        assert_eq!(ctx["kg"], "https://knowledge-graph.local/");
        assert_eq!(ctx["congressional"], "https://congressional.local/");
    }

    #[test]
    fn graph_entry_for_bill() {
        let doc = jsonld_context_document(&ontology());
        let bill = &doc["@graph"][0];

        assert_eq!(bill["@type"], "Legislation");
        assert_eq!(bill["@id"], "kg:Bill");
        assert_eq!(bill["kg:domain"], "congressional");

        let props = bill["kg:properties"].as_object().unwrap();
        assert!(!props.contains_key("id"));
        assert!(!props.contains_key("embedding"));
        assert!(!props.contains_key("created_at"));
        assert!(!props.contains_key("updated_at"));
        assert!(props.contains_key("source_url"));
        assert_eq!(props["number"]["@type"], "xsd:string");
        assert_eq!(props["number"]["kg:required"], true);
        assert_eq!(props["congress"]["@type"], "xsd:integer");

        let tool = &bill["mcp:tools"][0];
        assert_eq!(tool["mcp:name"], "get_bill");
        assert_eq!(tool["mcp:parameters"]["congress"]["@type"], "xsd:integer");
    }

    #[test]
    fn missing_schema_org_type_is_thing() {
        let doc = jsonld_context_document(&ontology());
        assert_eq!(doc["@graph"][1]["@type"], "Thing");
        assert_eq!(doc["@graph"][1]["mcp:tools"], json!([]));
    }

    #[test]
    fn rendered_text_keeps_key_order() {
        let text = generate_jsonld_context(&ontology());
        let context_at = text.find("\"@context\"").unwrap();
        let graph_at = text.find("\"@graph\"").unwrap();
        assert!(context_at < graph_at);
        assert!(text.find("\"@vocab\"").unwrap() < text.find("\"kg\"").unwrap());
        assert_eq!(text, generate_jsonld_context(&ontology()));
    }

    #[test]
    fn vector_and_other_types_map() {
        assert_eq!(xsd_type(&PropertyType::Vector), "schema:ItemList");
        assert_eq!(xsd_type(&PropertyType::Other("uuid".into())), "xsd:string");
        assert_eq!(xsd_type(&PropertyType::Datetime), "xsd:dateTime");
    }
}
