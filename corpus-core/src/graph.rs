//! Graph store sessions
//!
//! The loader only needs `run(query, params) -> records`. `Neo4jHttpSession`
//! implements it against Neo4j's HTTP transactional endpoint; tests plug in
//! in-memory sessions.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;

/// One result row, keyed by column name.
pub type Record = serde_json::Map<String, Value>;

/// Executes parameterised Cypher statements.
#[async_trait]
pub trait GraphSession: Send + Sync {
    /// Run a single statement in its own transaction.
    async fn run(&self, query: &str, params: Value) -> Result<Vec<Record>, GraphError>;

    /// Session name for logging.
    fn name(&self) -> &str;
}

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Graph store returned HTTP {code}: {message}")]
    Status { code: u16, message: String },

    #[error("Query failed ({code}): {message}")]
    Query { code: String, message: String },

    #[error("Malformed graph store response: {0}")]
    MalformedResponse(String),
}

impl GraphError {
    /// Whether retrying the same statement may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            GraphError::Http(_) => true,
            GraphError::Status { code, .. } => *code == 429 || *code >= 500,
            GraphError::Query { code, .. } => code.starts_with("Neo.TransientError"),
            GraphError::MalformedResponse(_) => false,
        }
    }
}

// ============================================================================
// Neo4j HTTP session
// ============================================================================

/// Connection settings for `Neo4jHttpSession`.
#[derive(Debug, Clone)]
pub struct Neo4jConfig {
    /// Base URL, e.g. `http://localhost:7474`
    pub url: String,
    pub database: String,
    pub user: String,
    pub password: String,
    pub timeout_seconds: u64,
    pub max_retries: usize,
    pub retry_delay_ms: u64,
}

impl Neo4jConfig {
    pub fn new(url: impl Into<String>, user: impl Into<String>, password: Option<String>) -> Self {
        let password = password
            .or_else(|| std::env::var("NEO4J_PASSWORD").ok())
            .unwrap_or_default();

        Self {
            url: url.into(),
            database: "neo4j".to_string(),
            user: user.into(),
            password,
            timeout_seconds: 30,
            max_retries: 3,
            retry_delay_ms: 500,
        }
    }
}

#[derive(Debug, Serialize)]
struct TxRequest<'a> {
    statements: Vec<TxStatement<'a>>,
}

#[derive(Debug, Serialize)]
struct TxStatement<'a> {
    statement: &'a str,
    parameters: &'a Value,
}

#[derive(Debug, Deserialize)]
struct TxResponse {
    #[serde(default)]
    results: Vec<TxResult>,
    #[serde(default)]
    errors: Vec<TxError>,
}

#[derive(Debug, Deserialize)]
struct TxResult {
    columns: Vec<String>,
    #[serde(default)]
    data: Vec<TxRow>,
}

#[derive(Debug, Deserialize)]
struct TxRow {
    row: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct TxError {
    code: String,
    message: String,
}

/// Neo4j session over the HTTP API (`POST /db/{database}/tx/commit`).
///
/// Every call is an auto-commit transaction. Transient failures are retried
/// with exponential backoff; the loader's statements are idempotent merges so
/// a retried write cannot duplicate data.
#[derive(Debug, Clone)]
pub struct Neo4jHttpSession {
    client: Client,
    config: Neo4jConfig,
}

impl Neo4jHttpSession {
    pub fn new(config: Neo4jConfig) -> Result<Self, GraphError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self { client, config })
    }

    fn commit_url(&self) -> String {
        format!(
            "{}/db/{}/tx/commit",
            self.config.url.trim_end_matches('/'),
            self.config.database
        )
    }

    async fn run_once(&self, query: &str, params: &Value) -> Result<Vec<Record>, GraphError> {
        let body = TxRequest {
            statements: vec![TxStatement {
                statement: query,
                parameters: params,
            }],
        };

        let response = self
            .client
            .post(self.commit_url())
            .basic_auth(&self.config.user, Some(&self.config.password))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::error!(code = status.as_u16(), message = %message, "Neo4j HTTP error");
            return Err(GraphError::Status {
                code: status.as_u16(),
                message,
            });
        }

        let tx: TxResponse = response.json().await?;

        if let Some(err) = tx.errors.into_iter().next() {
            return Err(GraphError::Query {
                code: err.code,
                message: err.message,
            });
        }

        let result = match tx.results.into_iter().next() {
            Some(r) => r,
            None => return Ok(Vec::new()),
        };

        result
            .data
            .into_iter()
            .map(|row| {
                if row.row.len() != result.columns.len() {
                    return Err(GraphError::MalformedResponse(format!(
                        "expected {} columns, got {}",
                        result.columns.len(),
                        row.row.len()
                    )));
                }
                let record: Record = result.columns.iter().cloned().zip(row.row).collect();
                Ok(record)
            })
            .collect()
    }

    /// Server name and version, e.g. `Neo4j Kernel 5.15.0 (community)`.
    pub async fn health_check(&self) -> Result<String, GraphError> {
        let records = self
            .run(
                "CALL dbms.components() YIELD name, versions, edition \
                 RETURN name, versions[0] AS version, edition",
                Value::Object(Record::new()),
            )
            .await?;

        let record = records
            .first()
            .ok_or_else(|| GraphError::MalformedResponse("no components reported".to_string()))?;
        let field = |key: &str| record.get(key).and_then(Value::as_str).unwrap_or("?").to_string();

        Ok(format!(
            "{} {} ({})",
            field("name"),
            field("version"),
            field("edition")
        ))
    }
}

#[async_trait]
impl GraphSession for Neo4jHttpSession {
    async fn run(&self, query: &str, params: Value) -> Result<Vec<Record>, GraphError> {
        let retry_strategy = ExponentialBackoff::from_millis(self.config.retry_delay_ms)
            .max_delay(Duration::from_secs(10))
            .map(jitter)
            .take(self.config.max_retries);

        let result = RetryIf::spawn(
            retry_strategy,
            || self.run_once(query, &params),
            GraphError::is_transient,
        )
        .await;

        if let Err(e) = &result {
            tracing::warn!(error = %e, transient = e.is_transient(), "Graph statement failed");
        }
        result
    }

    fn name(&self) -> &str {
        "neo4j-http"
    }
}

// ============================================================================
// TESTS
// ============================================================================
