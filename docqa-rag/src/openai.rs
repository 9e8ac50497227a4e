//! Embedding provider for OpenAI-compatible `/embeddings` endpoints.
//!
//! Works against OpenAI itself and against local servers that speak the same
//! protocol (Ollama, LM Studio, llama.cpp). This module is only available
//! when the `http` feature is enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// Default base URL: a local Ollama server's OpenAI-compatible API.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434/v1";

/// Default model: all-MiniLM-L6-v2 as published by Ollama.
pub const DEFAULT_MODEL: &str = "all-minilm";

/// Dimensionality of all-MiniLM-L6-v2.
pub const DEFAULT_DIMENSIONS: usize = 384;

const PROVIDER: &str = "openai-compat";

/// An [`EmbeddingProvider`] backed by an OpenAI-compatible embeddings API.
///
/// # Configuration
///
/// - `base_url` – defaults to a local Ollama server.
/// - `model` – defaults to `all-minilm`.
/// - `dimensions` – defaults to 384; every response is checked against it.
/// - `api_key` – optional bearer token (required by OpenAI, ignored by Ollama).
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::openai::OpenAiCompatEmbeddingProvider;
///
/// let provider = OpenAiCompatEmbeddingProvider::new(DEFAULT_BASE_URL)?;
/// let embedding = provider.embed("hello world").await?;
/// ```
#[derive(Debug, Clone)]
pub struct OpenAiCompatEmbeddingProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    dimensions: usize,
}

impl OpenAiCompatEmbeddingProvider {
    /// Create a provider for the given base URL with the default model.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        let base_url = base_url.as_ref().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(RagError::ConfigError("embedding base URL must not be empty".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            endpoint: format!("{base_url}/embeddings"),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            dimensions: DEFAULT_DIMENSIONS,
        })
    }

    /// Set the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the expected output dimensionality.
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// Set a bearer token for the API.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into()).filter(|k: &String| !k.is_empty());
        self
    }

    /// The full `/embeddings` URL requests are sent to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn failure(message: impl Into<String>) -> RagError {
        RagError::EmbeddingError { provider: PROVIDER.to_string(), message: message.into() }
    }
}

// ── API request/response types ─────────────────────────────────────

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

// ── EmbeddingProvider implementation ───────────────────────────────

#[async_trait]
impl EmbeddingProvider for OpenAiCompatEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, text_len = text.len(), "embedding single text");

        let results = self.embed_batch(&[text]).await?;
        results.into_iter().next().ok_or_else(|| Self::failure("API returned empty response"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(provider = PROVIDER, batch_size = texts.len(), model = %self.model, "embedding batch");

        let request_body = EmbeddingRequest { model: &self.model, input: texts.to_vec() };
        let mut request = self.client.post(&self.endpoint).json(&request_body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "request failed");
            Self::failure(format!("request failed: {e}"))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);

            error!(provider = PROVIDER, %status, "API error");
            return Err(Self::failure(format!("API returned {status}: {detail}")));
        }

        let parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            Self::failure(format!("failed to parse response: {e}"))
        })?;

        ordered_embeddings(parsed.data, texts.len(), self.dimensions)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}

/// Put response items back in request order and check their shape.
fn ordered_embeddings(
    mut data: Vec<EmbeddingData>,
    expected_count: usize,
    dimensions: usize,
) -> Result<Vec<Vec<f32>>> {
    if data.len() != expected_count {
        return Err(OpenAiCompatEmbeddingProvider::failure(format!(
            "expected {expected_count} embeddings, got {}",
            data.len()
        )));
    }
    if data.iter().all(|d| d.index.is_some()) {
        data.sort_by_key(|d| d.index);
    }
    if let Some(bad) = data.iter().find(|d| d.embedding.len() != dimensions) {
        return Err(OpenAiCompatEmbeddingProvider::failure(format!(
            "model returned {} dimensions, expected {dimensions}",
            bad.embedding.len()
        )));
    }
    Ok(data.into_iter().map(|d| d.embedding).collect())
}
