//! Embedding backends
//!
//! `EmbeddingBackend` abstracts the external `text -> vector` function used by
//! the loader. Implementations:
//! - **Ollama**: `POST /api/embeddings` on a local or remote Ollama server
//! - **Ollama-fallback**: same client, but failures degrade to `Ok(None)`

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;

/// Dimensions of the generated vector indexes (all-MiniLM-L6-v2 family).
pub const DEFAULT_DIMENSIONS: usize = 384;

pub const DEFAULT_EMBEDDING_MODEL: &str = "all-minilm";

// ============================================================================
// EmbeddingBackend trait
// ============================================================================

/// Abstraction over embedding providers.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Embed a single text. Returns `None` if embedding is unavailable
    /// (fallback mode).
    async fn embed(&self, text: &str) -> Result<Option<Vec<f32>>, EmbeddingError>;

    /// Embed a search query. Defaults to `embed()`.
    async fn embed_query(&self, text: &str) -> Result<Option<Vec<f32>>, EmbeddingError> {
        self.embed(text).await
    }

    fn dimensions(&self) -> usize;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

// ============================================================================
// Error types
// ============================================================================

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Invalid response: expected {expected} dimensions, got {actual}")]
    InvalidDimensions { expected: usize, actual: usize },

    #[error("Missing embedding in response")]
    MissingEmbedding,

    #[error("All {attempts} retry attempts failed")]
    RetryExhausted { attempts: usize },

    #[error("Unknown embedding backend '{0}'")]
    UnknownBackend(String),
}

impl EmbeddingError {
    /// Whether the same request may succeed on retry.
    pub fn is_transient(&self) -> bool {
        match self {
            EmbeddingError::Http(_) => true,
            EmbeddingError::Api { code, .. } => *code == 429 || *code >= 500,
            _ => false,
        }
    }
}

// ============================================================================
// Config types
// ============================================================================

#[derive(Debug, Clone)]
pub struct EmbeddingClientConfig {
    pub base_url: String,
    pub model: String,
    pub dimensions: usize,
    pub timeout_seconds: u64,
    pub max_retries: usize,
    pub retry_delay_ms: u64,
}

impl Default for EmbeddingClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimensions: DEFAULT_DIMENSIONS,
            timeout_seconds: 60,
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

pub enum BackendConfig {
    Ollama(EmbeddingClientConfig),
    OllamaFallback(EmbeddingClientConfig),
}

impl BackendConfig {
    /// Map a backend name from configuration (`ollama`, `ollama-fallback`).
    pub fn from_name(name: &str, config: EmbeddingClientConfig) -> Result<Self, EmbeddingError> {
        match name {
            "ollama" => Ok(BackendConfig::Ollama(config)),
            "ollama-fallback" => Ok(BackendConfig::OllamaFallback(config)),
            other => Err(EmbeddingError::UnknownBackend(other.to_string())),
        }
    }
}

pub fn create_backend(config: BackendConfig) -> Result<Box<dyn EmbeddingBackend>, EmbeddingError> {
    match config {
        BackendConfig::Ollama(c) => Ok(Box::new(OllamaEmbeddingClient::new(c)?)),
        BackendConfig::OllamaFallback(c) => Ok(Box::new(FallbackEmbeddingClient::new(c)?)),
    }
}

// ============================================================================
// Ollama API structs (private)
// ============================================================================

#[derive(Debug, Serialize)]
struct OllamaEmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbeddingResponse {
    #[serde(default)]
    embedding: Option<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct OllamaErrorResponse {
    error: String,
}

// ============================================================================
// OllamaEmbeddingClient
// ============================================================================

#[derive(Debug, Clone)]
pub struct OllamaEmbeddingClient {
    client: Client,
    config: EmbeddingClientConfig,
}

impl OllamaEmbeddingClient {
    pub fn new(config: EmbeddingClientConfig) -> Result<Self, EmbeddingError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self { client, config })
    }

    /// Generate an embedding, retrying transient failures with exponential
    /// backoff. Other failures are returned as they are.
    pub async fn embed_raw(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let retry_strategy = ExponentialBackoff::from_millis(self.config.retry_delay_ms)
            .max_delay(Duration::from_secs(10))
            .map(jitter)
            .take(self.config.max_retries);

        match RetryIf::spawn(
            retry_strategy,
            || self.embed_once(text),
            EmbeddingError::is_transient,
        )
        .await
        {
            Ok(vec) => Ok(vec),
            Err(e) if !e.is_transient() => Err(e),
            Err(e) => {
                tracing::error!(
                    attempts = self.config.max_retries,
                    error = %e,
                    "All embedding retry attempts failed"
                );
                Err(EmbeddingError::RetryExhausted {
                    attempts: self.config.max_retries,
                })
            }
        }
    }

    async fn embed_once(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let url = format!("{}/api/embeddings", self.config.base_url.trim_end_matches('/'));
        let request = OllamaEmbeddingRequest {
            model: &self.config.model,
            prompt: text,
        };

        let response = self.client.post(&url).json(&request).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<OllamaErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);

            tracing::error!(code = status.as_u16(), message = %message, "Ollama embedding API error");

            return Err(EmbeddingError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let values = response
            .json::<OllamaEmbeddingResponse>()
            .await?
            .embedding
            .filter(|v| !v.is_empty())
            .ok_or(EmbeddingError::MissingEmbedding)?;

        if values.len() != self.config.dimensions {
            return Err(EmbeddingError::InvalidDimensions {
                expected: self.config.dimensions,
                actual: values.len(),
            });
        }

        Ok(values)
    }
}

#[async_trait]
impl EmbeddingBackend for OllamaEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Option<Vec<f32>>, EmbeddingError> {
        self.embed_raw(text).await.map(Some)
    }

    fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

// ============================================================================
// FallbackEmbeddingClient
// ============================================================================

/// Wraps `OllamaEmbeddingClient`. On any error, logs a warning and returns
/// `Ok(None)` so entities are stored without a vector.
pub struct FallbackEmbeddingClient {
    inner: OllamaEmbeddingClient,
}

impl FallbackEmbeddingClient {
    pub fn new(config: EmbeddingClientConfig) -> Result<Self, EmbeddingError> {
        Ok(Self {
            inner: OllamaEmbeddingClient::new(config)?,
        })
    }
}

#[async_trait]
impl EmbeddingBackend for FallbackEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Option<Vec<f32>>, EmbeddingError> {
        match self.inner.embed_raw(text).await {
            Ok(v) => Ok(Some(v)),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Ollama embedding failed, continuing without a vector"
                );
                Ok(None)
            }
        }
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn name(&self) -> &str {
        "ollama-fallback"
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: String) -> EmbeddingClientConfig {
        EmbeddingClientConfig {
            base_url,
            model: "all-minilm".to_string(),
            dimensions: DEFAULT_DIMENSIONS,
            timeout_seconds: 5,
            max_retries: 3,
            retry_delay_ms: 10,
        }
    }

    fn mock_embedding_response() -> serde_json::Value {
        let values: Vec<f32> = (0..DEFAULT_DIMENSIONS).map(|i| (i as f32) / 384.0).collect();
        serde_json::json!({ "embedding": values })
    }

    #[tokio::test]
    async fn test_embed_calls_api_and_returns_384_dim_vector() {
        let mock_server = MockServer::start().await;
        let client = OllamaEmbeddingClient::new(test_config(mock_server.uri()))
            .expect("Failed to create client");

        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .and(body_json(serde_json::json!({
                "model": "all-minilm",
                "prompt": "hello world"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(mock_embedding_response()))
            .mount(&mock_server)
            .await;

        let embedding = client.embed_raw("hello world").await.unwrap();
        assert_eq!(embedding.len(), DEFAULT_DIMENSIONS);
    }

    #[tokio::test]
    async fn test_embed_returns_retry_exhausted_on_500() {
        let mock_server = MockServer::start().await;
        let client = OllamaEmbeddingClient::new(test_config(mock_server.uri())).unwrap();

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(serde_json::json!({ "error": "model not loaded" })),
            )
            .mount(&mock_server)
            .await;

        match client.embed_raw("hello world").await {
            Err(EmbeddingError::RetryExhausted { attempts }) => assert_eq!(attempts, 3),
            other => panic!("Expected RetryExhausted error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_embed_retries_then_succeeds() {
        let mock_server = MockServer::start().await;
        let client = OllamaEmbeddingClient::new(test_config(mock_server.uri())).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(mock_embedding_response()))
            .mount(&mock_server)
            .await;

        let embedding = client.embed_raw("hello world").await.unwrap();
        assert_eq!(embedding.len(), DEFAULT_DIMENSIONS);
    }

    #[tokio::test]
    async fn test_wrong_dimensions_is_an_error() {
        let mock_server = MockServer::start().await;
        let mut config = test_config(mock_server.uri());
        config.max_retries = 0;
        let client = OllamaEmbeddingClient::new(config).unwrap();

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "embedding": [0.1, 0.2, 0.3] })),
            )
            .mount(&mock_server)
            .await;

        assert!(matches!(
            client.embed_raw("hello").await,
            Err(EmbeddingError::InvalidDimensions { expected: 384, actual: 3 })
        ));
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let mock_server = MockServer::start().await;
        let client = OllamaEmbeddingClient::new(test_config(mock_server.uri())).unwrap();

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(serde_json::json!({ "error": "model 'all-minilm' not found" })),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        match client.embed_raw("hello").await {
            Err(EmbeddingError::Api { code, message }) => {
                assert_eq!(code, 404);
                assert!(message.contains("not found"));
            }
            other => panic!("Expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fallback_returns_none_on_error() {
        let mock_server = MockServer::start().await;
        let mut config = test_config(mock_server.uri());
        config.max_retries = 1;
        let fallback = FallbackEmbeddingClient::new(config).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let result = fallback.embed("hello").await;
        assert!(result.is_ok(), "Fallback should not propagate errors");
        assert!(result.unwrap().is_none());
        assert_eq!(fallback.name(), "ollama-fallback");
    }

    #[test]
    fn test_backend_names() {
        let config = EmbeddingClientConfig::default();
        assert!(BackendConfig::from_name("ollama", config.clone()).is_ok());
        assert!(BackendConfig::from_name("ollama-fallback", config.clone()).is_ok());
        assert!(matches!(
            BackendConfig::from_name("gemini", config),
            Err(EmbeddingError::UnknownBackend(_))
        ));
    }
}
