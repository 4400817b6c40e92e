//! Text completion backends
//!
//! The extractor treats the LLM as an opaque `prompt -> text` function.
//! `OllamaCompletionClient` implements it with `POST /api/generate`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;

pub const DEFAULT_COMPLETION_MODEL: &str = "llama3.1";

#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Send a prompt and return the raw completion text.
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;

    fn name(&self) -> &str;
}

#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("All {attempts} retry attempts failed")]
    RetryExhausted { attempts: usize },
}

impl CompletionError {
    /// Whether the same request may succeed on retry.
    pub fn is_transient(&self) -> bool {
        match self {
            CompletionError::Http(_) => true,
            CompletionError::Api { code, .. } => *code == 429 || *code >= 500,
            CompletionError::RetryExhausted { .. } => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionClientConfig {
    pub base_url: String,
    pub model: String,
    /// Ask the server to constrain output to JSON.
    pub json_mode: bool,
    pub temperature: f32,
    pub timeout_seconds: u64,
    pub max_retries: usize,
    pub retry_delay_ms: u64,
}

impl Default for CompletionClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: DEFAULT_COMPLETION_MODEL.to_string(),
            json_mode: true,
            temperature: 0.0,
            timeout_seconds: 120,
            max_retries: 2,
            retry_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Debug, Deserialize)]
struct OllamaErrorResponse {
    error: String,
}

#[derive(Debug, Clone)]
pub struct OllamaCompletionClient {
    client: Client,
    config: CompletionClientConfig,
}

impl OllamaCompletionClient {
    pub fn new(config: CompletionClientConfig) -> Result<Self, CompletionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self { client, config })
    }

    async fn complete_once(&self, prompt: &str) -> Result<String, CompletionError> {
        let url = format!("{}/api/generate", self.config.base_url.trim_end_matches('/'));
        let request = GenerateRequest {
            model: &self.config.model,
            prompt,
            stream: false,
            format: self.config.json_mode.then_some("json"),
            options: GenerateOptions {
                temperature: self.config.temperature,
            },
        };

        let response = self.client.post(&url).json(&request).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<OllamaErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);

            return Err(CompletionError::Api {
                code: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<GenerateResponse>().await?.response)
    }
}

#[async_trait]
impl CompletionBackend for OllamaCompletionClient {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let retry_strategy = ExponentialBackoff::from_millis(self.config.retry_delay_ms)
            .max_delay(Duration::from_secs(10))
            .map(jitter)
            .take(self.config.max_retries);

        match RetryIf::spawn(
            retry_strategy,
            || self.complete_once(prompt),
            CompletionError::is_transient,
        )
        .await
        {
            Ok(text) => {
                tracing::debug!(model = %self.config.model, chars = text.len(), "Completion received");
                Ok(text)
            }
            Err(e) if !e.is_transient() => Err(e),
            Err(e) => {
                tracing::error!(
                    attempts = self.config.max_retries,
                    error = %e,
                    "All completion retry attempts failed"
                );
                Err(CompletionError::RetryExhausted {
                    attempts: self.config.max_retries,
                })
            }
        }
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

// ============================================================================
// TESTS
// ============================================================================
