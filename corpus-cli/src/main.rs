//! corpus: compile ontologies into graph, IDL and JSON-LD artifacts and load
//! extracted entities into a Neo4j knowledge graph
//!
//! # Subcommands
//! - `generate [--out <dir>]`                 write all three artifacts
//! - `schema <cypher|proto|jsonld>`           print one artifact
//! - `apply-schema`                           create constraints and indexes
//! - `load <file.jsonl>`                      load entities, one JSON object per line
//! - `extract <file> [--load]`                extract entities from text with the LLM
//! - `search <query> [-t <type>] [-n <limit>]` semantic search
//! - `status`                                 graph store and ontology summary

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, EnvFilter};

use corpus_core::config::CorpusConfig;
use corpus_core::domains::{self, BUILTIN_DOMAINS};
use corpus_core::embeddings::{create_backend, BackendConfig};
use corpus_core::generators::{
    generate_cypher_schema, generate_jsonld_context, generate_proto, write_artifacts,
};
use corpus_core::{ExtractedEntity, Neo4jHttpSession, OllamaCompletionClient, Ontology};
use corpus_ingest::{ingest_text, EntityExtractor, GraphLoader, LoadReport, SearchHit};

const DEFAULT_CONFIG: &str = "corpus.toml";

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "corpus",
    version,
    about = "Ontology-driven schema compiler and knowledge-graph loader"
)]
struct Cli {
    /// Config file; a missing file falls back to defaults
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG)]
    config: String,

    /// Built-in domain (overrides service.domain)
    #[arg(long, global = true)]
    domain: Option<String>,

    /// Ontology JSON document (overrides --domain and service.ontology_path)
    #[arg(long, global = true)]
    ontology: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Write schema.cypher, knowledge_graph.proto and context.jsonld
    Generate {
        /// Output directory (overrides output.dir)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Print one generated artifact to stdout
    Schema {
        #[arg(value_enum)]
        format: ArtifactFormat,
    },

    /// Create the ontology's constraints and indexes in the graph store
    ApplySchema,

    /// Load entities from a JSON lines file
    Load {
        file: PathBuf,
    },

    /// Extract entities from a text file
    Extract {
        file: PathBuf,

        /// Load the extracted entities instead of printing them
        #[arg(long)]
        load: bool,
    },

    /// Semantic search over embedded nodes
    Search {
        query: String,

        /// Restrict to one entity type
        #[arg(short = 't', long = "type")]
        entity_type: Option<String>,

        /// Maximum number of results (overrides loader.search_limit)
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Output results as a JSON array
        #[arg(long)]
        json: bool,
    },

    /// Show graph store health and the active ontology
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ArtifactFormat {
    Cypher,
    Proto,
    Jsonld,
}

// ============================================================================
// Setup
// ============================================================================

/// `RUST_LOG` wins over the configured level. Logs go to stderr so artifact
/// output on stdout stays clean.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn resolve_ontology(cli: &Cli, config: &CorpusConfig) -> anyhow::Result<Ontology> {
    let path = cli
        .ontology
        .clone()
        .or_else(|| config.service.ontology_path.as_ref().map(PathBuf::from));
    if let Some(path) = path {
        return Ontology::load(&path)
            .with_context(|| format!("failed to load ontology from {}", path.display()));
    }

    let domain = cli.domain.as_deref().unwrap_or(&config.service.domain);
    match domains::by_name(domain) {
        Some(ontology) => Ok(ontology),
        None => bail!(
            "unknown domain '{}' (built-in: {})",
            domain,
            BUILTIN_DOMAINS.join(", ")
        ),
    }
}

fn build_loader(config: &CorpusConfig, ontology: Arc<Ontology>) -> anyhow::Result<GraphLoader> {
    let session = Arc::new(Neo4jHttpSession::new(config.graph.to_neo4j_config())?);
    let mut loader = GraphLoader::new(ontology, session);

    if config.embedding.is_disabled() {
        tracing::info!("Embeddings disabled, nodes are stored without vectors");
    } else {
        let backend = create_backend(BackendConfig::from_name(
            &config.embedding.backend,
            config.embedding.to_client_config(),
        )?)?;
        loader = loader.with_embeddings(Arc::from(backend));
    }

    if let Some(registry) = &config.loader.relationship_registry {
        loader = loader.with_relationship_registry(registry.iter().cloned());
    }
    Ok(loader)
}

/// One entity per non-blank line. Lines that do not decode come back as
/// `"line {n}: {error}"` so the rest of the file still loads.
fn parse_entities(text: &str) -> (Vec<ExtractedEntity>, Vec<String>) {
    let mut entities = Vec::new();
    let mut rejected = Vec::new();

    for (n, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ExtractedEntity>(line) {
            Ok(entity) => entities.push(entity),
            Err(e) => {
                tracing::warn!(line = n + 1, error = %e, "Skipping undecodable entity");
                rejected.push(format!("line {}: {}", n + 1, e));
            }
        }
    }
    (entities, rejected)
}

/// Load every decodable line; the others are reported as failed entities.
async fn load_lines(loader: &GraphLoader, text: &str) -> LoadReport {
    let (entities, rejected) = parse_entities(text);
    let mut report = loader.load_entities(entities).await;
    for error in rejected {
        report.record_rejected(error);
    }
    report
}

fn read_file(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

// ============================================================================
// Commands
// ============================================================================

fn do_generate(ontology: &Ontology, dir: &Path) -> anyhow::Result<()> {
    let paths = write_artifacts(ontology, dir)?;
    println!("{}", paths.cypher.display());
    println!("{}", paths.proto.display());
    println!("{}", paths.jsonld.display());
    Ok(())
}

fn render_artifact(ontology: &Ontology, format: ArtifactFormat) -> String {
    match format {
        ArtifactFormat::Cypher => generate_cypher_schema(ontology),
        ArtifactFormat::Proto => generate_proto(ontology),
        ArtifactFormat::Jsonld => generate_jsonld_context(ontology),
    }
}

async fn do_apply_schema(loader: &GraphLoader) -> anyhow::Result<()> {
    let applied = loader.apply_schema().await?;
    println!("applied {applied} schema statements");
    Ok(())
}

async fn do_load(loader: &GraphLoader, file: &Path) -> anyhow::Result<()> {
    let report = load_lines(loader, &read_file(file)?).await;

    println!("{report}");
    for error in &report.errors {
        eprintln!("  {error}");
    }
    Ok(())
}

async fn do_extract(
    config: &CorpusConfig,
    ontology: Arc<Ontology>,
    file: &Path,
    load: bool,
) -> anyhow::Result<()> {
    let text = read_file(file)?;
    let backend = Arc::new(OllamaCompletionClient::new(config.completion.to_client_config())?);
    let extractor = EntityExtractor::new(ontology.clone(), backend);

    if load {
        let loader = build_loader(config, ontology)?;
        let report = ingest_text(&extractor, &loader, &text).await?;
        println!("{report}");
        for error in &report.errors {
            eprintln!("  {error}");
        }
    } else {
        let entities = extractor.extract(&text).await?;
        println!("{}", serde_json::to_string_pretty(&entities)?);
    }
    Ok(())
}

fn print_hits(query: &str, hits: &[SearchHit]) {
    if hits.is_empty() {
        eprintln!("No results found for: {query}");
        return;
    }
    for hit in hits {
        let label = ["name", "title", "number"]
            .iter()
            .find_map(|k| hit.properties.get(*k).and_then(|v| v.as_str()))
            .unwrap_or("");
        println!("{} {} {}", hit.entity_type, hit.id, label);
        println!("Score:  {:.0}%\n", hit.score * 100.0);
    }
}

async fn do_search(
    loader: &GraphLoader,
    query: &str,
    entity_type: Option<&str>,
    limit: usize,
    json_output: bool,
) -> anyhow::Result<()> {
    let hits = loader.semantic_search(query, entity_type, limit).await?;
    if json_output {
        println!("{}", serde_json::to_string_pretty(&hits)?);
    } else {
        print_hits(query, &hits);
    }
    Ok(())
}

async fn do_status(config: &CorpusConfig, ontology: &Ontology) -> anyhow::Result<()> {
    println!(
        "Ontology:     {} v{} ({} node types, {} relationship types)",
        ontology.domain(),
        ontology.version(),
        ontology.node_count(),
        ontology.relationship_count()
    );
    println!(
        "Embeddings:   {} ({}, {} dims)",
        config.embedding.backend, config.embedding.model, config.embedding.dimensions
    );

    let session = Neo4jHttpSession::new(config.graph.to_neo4j_config())?;
    match session.health_check().await {
        Ok(version) => println!("Neo4j:        {version} at {}", config.graph.url),
        Err(e) => {
            eprintln!("corpus: cannot reach Neo4j at {}: {}", config.graph.url, e);
            std::process::exit(1);
        }
    }
    Ok(())
}

// ============================================================================
// Main
// ============================================================================

async fn run(cli: Cli, config: CorpusConfig) -> anyhow::Result<()> {
    let ontology = Arc::new(resolve_ontology(&cli, &config)?);
    tracing::debug!(
        domain = ontology.domain(),
        node_types = ontology.node_count(),
        "Ontology resolved"
    );

    match cli.command {
        Commands::Generate { out } => {
            let dir = out.unwrap_or_else(|| PathBuf::from(&config.output.dir));
            do_generate(&ontology, &dir)
        }
        Commands::Schema { format } => {
            print!("{}", render_artifact(&ontology, format));
            Ok(())
        }
        Commands::ApplySchema => do_apply_schema(&build_loader(&config, ontology)?).await,
        Commands::Load { file } => do_load(&build_loader(&config, ontology)?, &file).await,
        Commands::Extract { file, load } => do_extract(&config, ontology, &file, load).await,
        Commands::Search {
            query,
            entity_type,
            limit,
            json,
        } => {
            let limit = limit.unwrap_or(config.loader.search_limit);
            let loader = build_loader(&config, ontology)?;
            do_search(&loader, &query, entity_type.as_deref(), limit, json).await
        }
        Commands::Status => do_status(&config, &ontology).await,
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = match CorpusConfig::load_or_default(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", cli.config, e);
            std::process::exit(1);
        }
    };

    init_logging(&config.service.log_level);

    if let Err(e) = run(cli, config).await {
        eprintln!("corpus: {e:#}");
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use corpus_core::Neo4jConfig;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("corpus").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_parse_entities_skips_blank_lines() {
        let text = r#"{"entity_type": "Bill", "properties": {"number": "H.R.1"}}

{"entity_type": "Member", "properties": {"name": "Ada"}, "confidence": 0.9}
"#;
        let (entities, rejected) = parse_entities(text);

        assert!(rejected.is_empty());
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].entity_type, "Bill");
        assert_eq!(entities[0].confidence, 0.5);
        assert_eq!(entities[1].domain, "generic");
    }

    #[test]
    fn test_parse_entities_reports_line_number() {
        let text = "{\"entity_type\": \"Bill\"}\nnot json\n";
        let (entities, rejected) = parse_entities(text);

        assert_eq!(entities.len(), 1);
        assert_eq!(rejected.len(), 1);
        assert!(rejected[0].starts_with("line 2: "));
    }

    #[tokio::test]
    async fn test_load_lines_survives_null_values_and_garbage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/db/neo4j/tx/commit"))
            .and(body_string_contains("H.R.1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{"columns": ["id"], "data": [{"row": ["bill-1"]}]}],
                "errors": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut graph = Neo4jConfig::new(server.uri(), "neo4j", Some("secret".to_string()));
        graph.max_retries = 0;
        let session = Arc::new(Neo4jHttpSession::new(graph).unwrap());
        let ontology = Arc::new(domains::by_name("congressional").unwrap());
        let loader = GraphLoader::new(ontology, session);

        let text = r#"{"entity_type":"Bill","properties":{"number":"H.R.1","sponsor":null}}
{"entity_type": "Bill", "properties": {"number": "H.R.2"
"#;
        let report = load_lines(&loader, text).await;

        assert!(report.to_string().starts_with("loaded 1 of 2 entities (1 failed)"));
        assert_eq!(report.ids, vec!["bill-1"]);
        assert!(report.errors[0].starts_with("line 2: "));
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = parse(&["schema", "proto", "--domain", "edgar"]);
        assert_eq!(cli.domain.as_deref(), Some("edgar"));
        assert!(matches!(
            cli.command,
            Commands::Schema {
                format: ArtifactFormat::Proto
            }
        ));
        assert_eq!(cli.config, DEFAULT_CONFIG);
    }

    #[test]
    fn test_search_arguments() {
        let cli = parse(&["search", "clean energy", "-t", "Bill", "-n", "3", "--json"]);
        match cli.command {
            Commands::Search {
                query,
                entity_type,
                limit,
                json,
            } => {
                assert_eq!(query, "clean energy");
                assert_eq!(entity_type.as_deref(), Some("Bill"));
                assert_eq!(limit, Some(3));
                assert!(json);
            }
            other => panic!("Expected search, got {other:?}"),
        }
    }

    #[test]
    fn test_resolve_ontology_prefers_flag_over_config() {
        let config = CorpusConfig::default();

        let ontology = resolve_ontology(&parse(&["status"]), &config).unwrap();
        assert_eq!(ontology.domain(), "congressional");

        let ontology = resolve_ontology(&parse(&["status", "--domain", "edgar"]), &config).unwrap();
        assert_eq!(ontology.domain(), "edgar");

        let err = resolve_ontology(&parse(&["status", "--domain", "reddit"]), &config).unwrap_err();
        assert!(err.to_string().contains("congressional, edgar"));
    }

    #[test]
    fn test_render_artifact_matches_generators() {
        let ontology = domains::by_name("edgar").unwrap();
        assert_eq!(
            render_artifact(&ontology, ArtifactFormat::Cypher),
            generate_cypher_schema(&ontology)
        );
        assert!(render_artifact(&ontology, ArtifactFormat::Jsonld).starts_with('{'));
    }
}
