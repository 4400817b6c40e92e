//! Congressional legislation: bills, members and committees.

use crate::ontology::{
    common_properties, NodeType, Ontology, PropertyDef, PropertyType as T, QueryTool,
    RelationshipType,
};

pub const DOMAIN: &str = "congressional";

fn bill() -> NodeType {
    NodeType::new("Bill", "A legislative bill introduced in Congress")
        .domain(DOMAIN)
        .schema_org("Legislation")
        .identity_key("number")
        .properties(common_properties())
        .properties([
            PropertyDef::new("number", T::String)
                .required()
                .indexed()
                .describe("Bill number (e.g., H.R.1234)"),
            PropertyDef::new("title", T::Text)
                .required()
                .fulltext()
                .describe("Bill title"),
            PropertyDef::new("short_title", T::String).describe("Short title if available"),
            PropertyDef::new("congress", T::Integer)
                .required()
                .indexed()
                .describe("Congress number (e.g., 118)"),
            PropertyDef::new("chamber", T::String).indexed().describe("House or Senate"),
            PropertyDef::new("bill_type", T::String)
                .indexed()
                .describe("Type: hr, s, hjres, sjres, etc."),
            PropertyDef::new("introduced_date", T::Date).indexed().describe("Date introduced"),
            PropertyDef::new("latest_action_date", T::Date).describe("Date of most recent action"),
            PropertyDef::new("latest_action_text", T::Text).describe("Text of most recent action"),
            PropertyDef::new("policy_area", T::String).indexed().describe("Primary policy area"),
            PropertyDef::new("summary", T::Text).fulltext().describe("Bill summary text"),
        ])
        .tool(
            QueryTool::new(
                "get_bill",
                "Get detailed information about a specific bill",
                "MATCH (b:Bill {number: $number, congress: $congress}) RETURN b",
            )
            .param("number", "string")
            .param("congress", "integer"),
        )
        .tool(
            QueryTool::new(
                "find_sponsors",
                "Find all sponsors and cosponsors of a bill",
                "MATCH (m:Member)-[r:SPONSORS|COSPONSORS]->(b:Bill {number: $number, congress: $congress}) \
                 RETURN m, type(r) AS relationship",
            )
            .param("number", "string")
            .param("congress", "integer"),
        )
        .tool(
            QueryTool::new(
                "related_bills",
                "Find bills related to a given bill",
                "MATCH (b:Bill {number: $number, congress: $congress})-[:RELATED_TO]-(r:Bill) RETURN r",
            )
            .param("number", "string")
            .param("congress", "integer"),
        )
        .tool(
            QueryTool::new(
                "bills_by_policy",
                "Find bills in a specific policy area",
                "MATCH (b:Bill {policy_area: $policy_area, congress: $congress}) RETURN b LIMIT $limit",
            )
            .param("policy_area", "string")
            .param("congress", "integer")
            .param("limit", "integer"),
        )
}

fn member() -> NodeType {
    NodeType::new("Member", "A member of Congress (Representative or Senator)")
        .domain(DOMAIN)
        .schema_org("Person")
        .label("Person")
        .identity_key("bioguide_id")
        .properties(common_properties())
        .properties([
            PropertyDef::new("bioguide_id", T::String)
                .required()
                .unique()
                .indexed()
                .describe("Bioguide ID"),
            PropertyDef::new("name", T::String).required().fulltext().describe("Full name"),
            PropertyDef::new("first_name", T::String).describe("First name"),
            PropertyDef::new("last_name", T::String).indexed().describe("Last name"),
            PropertyDef::new("party", T::String).indexed().describe("Political party (D, R, I)"),
            PropertyDef::new("state", T::String).indexed().describe("State represented"),
            PropertyDef::new("district", T::String).describe("District number (House only)"),
            PropertyDef::new("chamber", T::String).indexed().describe("House or Senate"),
            PropertyDef::new("terms_served", T::Integer).describe("Number of terms served"),
            PropertyDef::new("current_term_start", T::Date).describe("Start of current term"),
            PropertyDef::new("current_term_end", T::Date).describe("End of current term"),
            PropertyDef::new("url", T::String).describe("Official website URL"),
        ])
        .tool(
            QueryTool::new(
                "get_member",
                "Get detailed information about a specific member of Congress",
                "MATCH (m:Member {bioguide_id: $bioguide_id}) RETURN m",
            )
            .param("bioguide_id", "string"),
        )
        .tool(
            QueryTool::new(
                "member_bills",
                "Find all bills sponsored by a member",
                "MATCH (m:Member {bioguide_id: $bioguide_id})-[:SPONSORS]->(b:Bill) \
                 RETURN b ORDER BY b.introduced_date DESC LIMIT $limit",
            )
            .param("bioguide_id", "string")
            .param("limit", "integer"),
        )
        .tool(
            QueryTool::new(
                "members_by_state",
                "Find all members representing a state",
                "MATCH (m:Member {state: $state}) RETURN m",
            )
            .param("state", "string"),
        )
        .tool(
            QueryTool::new(
                "member_committees",
                "Find all committees a member serves on",
                "MATCH (m:Member {bioguide_id: $bioguide_id})-[r:SERVES_ON]->(c:Committee) \
                 RETURN c, r.role AS role",
            )
            .param("bioguide_id", "string"),
        )
}

fn committee() -> NodeType {
    NodeType::new("Committee", "A congressional committee or subcommittee")
        .domain(DOMAIN)
        .schema_org("Organization")
        .label("Organization")
        .identity_key("system_code")
        .properties(common_properties())
        .properties([
            PropertyDef::new("system_code", T::String)
                .required()
                .unique()
                .indexed()
                .describe("Committee system code"),
            PropertyDef::new("name", T::String).required().fulltext().describe("Committee name"),
            PropertyDef::new("chamber", T::String).indexed().describe("House, Senate, or Joint"),
            PropertyDef::new("committee_type", T::String)
                .indexed()
                .describe("Standing, Select, Joint, etc."),
            PropertyDef::new("parent_committee", T::String)
                .describe("Parent committee code (for subcommittees)"),
            PropertyDef::new("jurisdiction", T::Text).describe("Committee jurisdiction description"),
            PropertyDef::new("url", T::String).describe("Committee website URL"),
        ])
        .tool(
            QueryTool::new(
                "get_committee",
                "Get detailed information about a committee",
                "MATCH (c:Committee {system_code: $system_code}) RETURN c",
            )
            .param("system_code", "string"),
        )
        .tool(
            QueryTool::new(
                "committee_bills",
                "Find bills referred to a committee",
                "MATCH (b:Bill)-[:REFERRED_TO]->(c:Committee {system_code: $system_code}) \
                 RETURN b ORDER BY b.introduced_date DESC LIMIT $limit",
            )
            .param("system_code", "string")
            .param("limit", "integer"),
        )
        .tool(
            QueryTool::new(
                "subcommittees",
                "Find subcommittees of a committee",
                "MATCH (c:Committee {parent_committee: $system_code}) RETURN c",
            )
            .param("system_code", "string"),
        )
}

fn relationships() -> Vec<RelationshipType> {
    vec![
        RelationshipType::new("SPONSORS", "Member", "Bill")
            .describe("Member is the primary sponsor of a bill")
            .property(PropertyDef::new("date", T::Date).describe("Date of sponsorship")),
        RelationshipType::new("COSPONSORS", "Member", "Bill")
            .describe("Member is a cosponsor of a bill")
            .property(PropertyDef::new("date", T::Date).describe("Date of cosponsorship"))
            .property(
                PropertyDef::new("withdrawn", T::Boolean)
                    .describe("Whether cosponsorship was withdrawn"),
            ),
        RelationshipType::new("SERVES_ON", "Member", "Committee")
            .describe("Member serves on a committee")
            .property(
                PropertyDef::new("role", T::String).describe("Role (Chair, Ranking Member, Member)"),
            )
            .property(PropertyDef::new("start_date", T::Date).describe("Start of service")),
        RelationshipType::new("REFERRED_TO", "Bill", "Committee")
            .describe("Bill was referred to a committee")
            .property(PropertyDef::new("date", T::Date).describe("Date of referral")),
        RelationshipType::new("RELATED_TO", "Bill", "Bill")
            .describe("Bills are related (companion, identical, etc.)")
            .property(
                PropertyDef::new("relationship_type", T::String).describe("Type of relationship"),
            ),
        RelationshipType::new("AMENDS", "Bill", "Bill").describe("Bill amends another bill"),
        RelationshipType::new("SUBCOMMITTEE_OF", "Committee", "Committee")
            .describe("Subcommittee belongs to parent committee"),
    ]
}

pub fn ontology() -> Ontology {
    let mut ontology = Ontology::new(DOMAIN, "1.0.0")
        .with_description("Bills, members and committees of the U.S. Congress");

    for node in [bill(), member(), committee()] {
        ontology.register_node_type(node);
    }
    for rel in relationships() {
        ontology.register_relationship_type(rel);
    }
    ontology
}
