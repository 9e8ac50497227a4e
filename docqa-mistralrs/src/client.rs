//! MistralRsModel - an in-process answer model implementing `LanguageModel`.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use docqa_rag::LanguageModel;
use mistralrs::{
    GgufModelBuilder, IsqType, PagedAttentionMetaBuilder, RequestBuilder, TextMessageRole,
    TextModelBuilder,
};
use tracing::{debug, info, instrument};

use crate::config::{MistralRsConfig, ModelSource, QuantizationLevel};
use crate::error::{MistralRsError, Result};

/// A mistral.rs model loaded once and served in-process.
///
/// Loading downloads (HuggingFace) or maps (GGUF) the weights, so construct
/// one at start-up and share it behind an `Arc`.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_mistralrs::MistralRsModel;
/// use docqa_rag::AnswerGenerator;
///
/// let model = MistralRsModel::from_gguf("models/phi-3.5-mini.Q4_K_M.gguf").await?;
/// let generator = AnswerGenerator::new(Arc::new(model));
/// ```
pub struct MistralRsModel {
    model: Arc<mistralrs::Model>,
    name: String,
    config: MistralRsConfig,
}

impl MistralRsModel {
    /// Load a model from configuration.
    #[instrument(skip(config), fields(model_source = ?config.model_source))]
    pub async fn new(config: MistralRsConfig) -> Result<Self> {
        let name = config.model_source.id();
        info!(model = %name, "loading mistral.rs model");

        let model = match &config.model_source {
            ModelSource::HuggingFace(id) => {
                let mut builder = TextModelBuilder::new(id.clone()).with_logging();
                if let Some(level) = config.isq {
                    builder = builder.with_isq(quantization_level_to_isq(level));
                    debug!(?level, "ISQ quantization enabled");
                }
                if config.paged_attention {
                    builder = builder
                        .with_paged_attn(|| PagedAttentionMetaBuilder::default().build())
                        .map_err(|e| MistralRsError::ModelLoad(e.to_string()))?;
                    debug!("PagedAttention enabled");
                }
                builder.build().await
            }
            ModelSource::Gguf { dir, file } => {
                let mut builder =
                    GgufModelBuilder::new(dir.display().to_string(), vec![file.clone()])
                        .with_logging();
                if config.paged_attention {
                    builder = builder
                        .with_paged_attn(|| PagedAttentionMetaBuilder::default().build())
                        .map_err(|e| MistralRsError::ModelLoad(e.to_string()))?;
                    debug!("PagedAttention enabled");
                }
                builder.build().await
            }
        }
        .map_err(|e| MistralRsError::ModelLoad(e.to_string()))?;

        info!(model = %name, "model loaded");
        Ok(Self { model: Arc::new(model), name, config })
    }

    /// Load a HuggingFace model with defaults.
    pub async fn from_hf(model_id: &str) -> Result<Self> {
        let config =
            MistralRsConfig::builder().model_source(ModelSource::huggingface(model_id)).build()?;
        Self::new(config).await
    }

    /// Load a local GGUF file.
    pub async fn from_gguf(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(MistralRsError::ModelNotFound { path: path.display().to_string() });
        }

        let config = MistralRsConfig::builder().model_source(ModelSource::gguf(path)).build()?;
        Self::new(config).await
    }

    /// Get the model configuration
    pub fn config(&self) -> &MistralRsConfig {
        &self.config
    }

    fn request(&self, prompt: &str, max_tokens: usize) -> RequestBuilder {
        let request = RequestBuilder::new()
            .add_message(TextMessageRole::User, prompt)
            .set_sampler_max_len(max_tokens);
        match self.config.temperature {
            Some(t) => request.set_sampler_temperature(t),
            None => request,
        }
    }

    async fn run(&self, prompt: &str, max_tokens: usize) -> Result<String> {
        let response = self
            .model
            .send_chat_request(self.request(prompt, max_tokens))
            .await
            .map_err(|e| MistralRsError::Inference(e.to_string()))?;

        debug!(
            prompt_tokens = response.usage.prompt_tokens,
            completion_tokens = response.usage.completion_tokens,
            "completion finished"
        );

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(MistralRsError::EmptyResponse)
    }
}

#[async_trait]
impl LanguageModel for MistralRsModel {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self, prompt), fields(model = %self.name, prompt_len = prompt.len()))]
    async fn complete(&self, prompt: &str, max_tokens: usize) -> docqa_rag::Result<String> {
        self.run(prompt, max_tokens).await.map_err(|e| e.into_rag(&self.name))
    }
}

fn quantization_level_to_isq(level: QuantizationLevel) -> IsqType {
    match level {
        QuantizationLevel::Q4_0 => IsqType::Q4_0,
        QuantizationLevel::Q5_0 => IsqType::Q5_0,
        QuantizationLevel::Q8_0 => IsqType::Q8_0,
        QuantizationLevel::Q4K => IsqType::Q4K,
        QuantizationLevel::Q5K => IsqType::Q5K,
        QuantizationLevel::Q6K => IsqType::Q6K,
    }
}

impl std::fmt::Debug for MistralRsModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MistralRsModel")
            .field("name", &self.name)
            .field("config", &self.config)
            .finish()
    }
}
