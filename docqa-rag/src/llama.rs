//! [`LanguageModel`] backed by a local llama.cpp server.
//!
//! Talks to the server's native `/completion` endpoint so the prompt is sent
//! verbatim, with no chat template applied on top. This module is only
//! available when the `llama-server` feature is enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{RagError, Result};
use crate::generation::LanguageModel;

/// Default address of `llama-server`.
pub const DEFAULT_LLAMA_URL: &str = "http://127.0.0.1:8080";

/// A model served by `llama-server` (for example a Mistral-7B-Instruct GGUF).
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::llama::LlamaServerModel;
///
/// let model = LlamaServerModel::new("http://127.0.0.1:8080")?;
/// let text = model.complete("Say hi", 16).await?;
/// ```
#[derive(Debug, Clone)]
pub struct LlamaServerModel {
    client: reqwest::Client,
    endpoint: String,
    name: String,
}

impl LlamaServerModel {
    /// Create a model for the server at `base_url`.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        let base_url = base_url.as_ref().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(RagError::ConfigError("llama server URL must not be empty".to_string()));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint: format!("{base_url}/completion"),
            name: format!("llama-server@{base_url}"),
        })
    }

    /// The full `/completion` URL requests are sent to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn failure(&self, message: impl Into<String>) -> RagError {
        RagError::GenerationError { model: self.name.clone(), message: message.into() }
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
    n_predict: usize,
    stream: bool,
}

#[derive(Deserialize)]
struct CompletionResponse {
    content: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

#[async_trait]
impl LanguageModel for LlamaServerModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, prompt: &str, max_tokens: usize) -> Result<String> {
        debug!(model = %self.name, max_tokens, "sending completion request");

        let body = CompletionRequest { prompt, n_predict: max_tokens, stream: false };
        let response = self.client.post(&self.endpoint).json(&body).send().await.map_err(|e| {
            error!(model = %self.name, error = %e, "request failed");
            self.failure(format!("request failed: {e}"))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            error!(model = %self.name, %status, "server error");
            return Err(self.failure(format!("server returned {status}: {detail}")));
        }

        let parsed: CompletionResponse = response.json().await.map_err(|e| {
            error!(model = %self.name, error = %e, "failed to parse response");
            self.failure(format!("failed to parse response: {e}"))
        })?;

        Ok(parsed.content)
    }
}
