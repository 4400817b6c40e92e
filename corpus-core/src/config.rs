use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::completion::{CompletionClientConfig, DEFAULT_COMPLETION_MODEL};
use crate::embeddings::{EmbeddingClientConfig, DEFAULT_DIMENSIONS, DEFAULT_EMBEDDING_MODEL};
use crate::graph::Neo4jConfig;

/// Application configuration: `corpus.toml` overlaid with
/// `CORPUS__SECTION__KEY` environment variables.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct CorpusConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub loader: LoaderConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServiceConfig {
    pub log_level: String,
    /// Built-in domain used when no ontology document is given
    pub domain: String,
    /// Optional ontology JSON document; takes precedence over `domain`
    pub ontology_path: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            domain: "congressional".to_string(),
            ontology_path: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GraphConfig {
    pub url: String,
    pub database: String,
    pub user: String,
    pub timeout_seconds: u64,
    pub max_retries: usize,
    pub retry_delay_ms: u64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:7474".to_string(),
            database: "neo4j".to_string(),
            user: "neo4j".to_string(),
            timeout_seconds: 30,
            max_retries: 3,
            retry_delay_ms: 500,
        }
    }
}

impl GraphConfig {
    /// Session settings; the password is read from `NEO4J_PASSWORD`.
    pub fn to_neo4j_config(&self) -> Neo4jConfig {
        let mut config = Neo4jConfig::new(self.url.clone(), self.user.clone(), None);
        config.database = self.database.clone();
        config.timeout_seconds = self.timeout_seconds;
        config.max_retries = self.max_retries;
        config.retry_delay_ms = self.retry_delay_ms;
        config
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// `ollama`, `ollama-fallback` or `none`
    pub backend: String,
    pub url: String,
    pub model: String,
    pub dimensions: usize,
    pub timeout_seconds: u64,
    pub max_retries: usize,
    pub retry_delay_ms: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: "ollama-fallback".to_string(),
            url: "http://localhost:11434".to_string(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimensions: DEFAULT_DIMENSIONS,
            timeout_seconds: 60,
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

impl EmbeddingConfig {
    pub fn is_disabled(&self) -> bool {
        self.backend.eq_ignore_ascii_case("none")
    }

    pub fn to_client_config(&self) -> EmbeddingClientConfig {
        EmbeddingClientConfig {
            base_url: self.url.clone(),
            model: self.model.clone(),
            dimensions: self.dimensions,
            timeout_seconds: self.timeout_seconds,
            max_retries: self.max_retries,
            retry_delay_ms: self.retry_delay_ms,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CompletionConfig {
    pub url: String,
    pub model: String,
    pub json_mode: bool,
    pub temperature: f32,
    pub timeout_seconds: u64,
    pub max_retries: usize,
    pub retry_delay_ms: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:11434".to_string(),
            model: DEFAULT_COMPLETION_MODEL.to_string(),
            json_mode: true,
            temperature: 0.0,
            timeout_seconds: 120,
            max_retries: 2,
            retry_delay_ms: 1000,
        }
    }
}

impl CompletionConfig {
    pub fn to_client_config(&self) -> CompletionClientConfig {
        CompletionClientConfig {
            base_url: self.url.clone(),
            model: self.model.clone(),
            json_mode: self.json_mode,
            temperature: self.temperature,
            timeout_seconds: self.timeout_seconds,
            max_retries: self.max_retries,
            retry_delay_ms: self.retry_delay_ms,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoaderConfig {
    /// Overrides the ontology's relationship names. An empty list accepts
    /// every relationship kind.
    pub relationship_registry: Option<Vec<String>>,
    pub search_limit: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            relationship_registry: None,
            search_limit: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: "generated".to_string(),
        }
    }
}

fn environment() -> Environment {
    Environment::with_prefix("CORPUS")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

impl CorpusConfig {
    /// Load from a config file (extension optional), then apply environment
    /// overrides.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        Self::build(path, true, environment())
    }

    /// Like `load`, but a missing file falls back to defaults.
    pub fn load_or_default(path: &str) -> Result<Self, ConfigError> {
        Self::build(path, false, environment())
    }

    fn build(path: &str, required: bool, env: Environment) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path).required(required))
            .add_source(env)
            .build()?;
        s.try_deserialize()
    }
}
