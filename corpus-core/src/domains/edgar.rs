//! SEC EDGAR: registered companies and their filings.

use crate::ontology::{
    common_properties, NodeType, Ontology, PropertyDef, PropertyType as T, QueryTool,
    RelationshipType,
};

pub const DOMAIN: &str = "edgar";

fn company() -> NodeType {
    NodeType::new("Company", "SEC registered company")
        .domain(DOMAIN)
        .schema_org("Corporation")
        .label("Organization")
        .identity_key("cik")
        .properties(common_properties())
        .properties([
            PropertyDef::new("cik", T::String)
                .required()
                .unique()
                .describe("Central Index Key (SEC identifier)"),
            PropertyDef::new("ticker", T::String).indexed().describe("Stock ticker symbol"),
            PropertyDef::new("name", T::String).required().fulltext().describe("Company name"),
            PropertyDef::new("sic", T::String)
                .indexed()
                .describe("Standard Industrial Classification code"),
            PropertyDef::new("sic_description", T::String).describe("SIC industry description"),
            PropertyDef::new("state", T::String).indexed().describe("State of incorporation"),
            PropertyDef::new("fiscal_year_end", T::String).describe("Fiscal year end (MMDD)"),
        ])
        .tool(
            QueryTool::new(
                "get_company",
                "Get a company by its Central Index Key",
                "MATCH (c:Company {cik: $cik}) RETURN c",
            )
            .param("cik", "string"),
        )
        .tool(
            QueryTool::new(
                "company_by_ticker",
                "Find a company by stock ticker",
                "MATCH (c:Company {ticker: $ticker}) RETURN c",
            )
            .param("ticker", "string"),
        )
        .tool(
            QueryTool::new(
                "company_filings",
                "List a company's filings of one form type, newest first",
                "MATCH (c:Company {cik: $cik})-[:FILED]->(f:Filing {form_type: $form_type}) \
                 RETURN f ORDER BY f.filing_date DESC LIMIT $limit",
            )
            .param("cik", "string")
            .param("form_type", "string")
            .param("limit", "integer"),
        )
}

fn filing() -> NodeType {
    NodeType::new("Filing", "SEC filing (10-K, 10-Q, 8-K, etc.)")
        .domain(DOMAIN)
        .schema_org("DigitalDocument")
        .label("Document")
        .identity_key("accession_number")
        .properties(common_properties())
        .properties([
            PropertyDef::new("accession_number", T::String)
                .required()
                .unique()
                .describe("Unique filing accession number"),
            PropertyDef::new("cik", T::String).required().indexed().describe("Company CIK"),
            PropertyDef::new("form_type", T::String)
                .required()
                .indexed()
                .describe("Form type (10-K, 10-Q, 8-K, etc.)"),
            PropertyDef::new("filing_date", T::Date).indexed().describe("Date filed with SEC"),
            PropertyDef::new("period_of_report", T::Date).describe("Reporting period end date"),
            PropertyDef::new("company_name", T::String).fulltext().describe("Company name"),
            PropertyDef::new("primary_document", T::String)
                .describe("Primary document filename"),
            PropertyDef::new("document_url", T::String).describe("URL to filing document"),
        ])
        .tool(
            QueryTool::new(
                "get_filing",
                "Get a filing by accession number",
                "MATCH (f:Filing {accession_number: $accession_number}) RETURN f",
            )
            .param("accession_number", "string"),
        )
        .tool(
            QueryTool::new(
                "recent_filings",
                "Most recent filings of a form type across all companies",
                "MATCH (f:Filing {form_type: $form_type}) RETURN f ORDER BY f.filing_date DESC LIMIT $limit",
            )
            .param("form_type", "string")
            .param("limit", "integer"),
        )
}

pub fn ontology() -> Ontology {
    let mut ontology =
        Ontology::new(DOMAIN, "1.0.0").with_description("Companies and filings from SEC EDGAR");

    ontology.register_node_type(company());
    ontology.register_node_type(filing());

    ontology.register_relationship_type(
        RelationshipType::new("FILED", "Company", "Filing")
            .describe("Company submitted the filing")
            .property(PropertyDef::new("filing_date", T::Date).indexed().describe("Date filed")),
    );
    ontology.register_relationship_type(
        RelationshipType::new("AMENDS_FILING", "Filing", "Filing")
            .describe("Amendment (e.g. 10-K/A) of an earlier filing"),
    );
    ontology
}
