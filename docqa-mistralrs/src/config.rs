//! Configuration types for mistral.rs model loading.

use std::path::{Path, PathBuf};

use crate::error::{MistralRsError, Result};

/// Configuration for loading an answer model with mistral.rs.
#[derive(Debug, Clone)]
pub struct MistralRsConfig {
    /// Where the weights come from
    pub model_source: ModelSource,

    /// ISQ quantization applied at load time (HuggingFace sources only)
    pub isq: Option<QuantizationLevel>,

    /// Sampling temperature; the model default when unset
    pub temperature: Option<f64>,

    /// Enable PagedAttention
    pub paged_attention: bool,
}

impl MistralRsConfig {
    /// Create a new config builder
    pub fn builder() -> MistralRsConfigBuilder {
        MistralRsConfigBuilder::default()
    }
}

/// Builder for MistralRsConfig
#[derive(Debug, Clone, Default)]
pub struct MistralRsConfigBuilder {
    model_source: Option<ModelSource>,
    isq: Option<QuantizationLevel>,
    temperature: Option<f64>,
    paged_attention: bool,
}

impl MistralRsConfigBuilder {
    /// Set the model source
    pub fn model_source(mut self, source: ModelSource) -> Self {
        self.model_source = Some(source);
        self
    }

    /// Enable ISQ quantization
    pub fn isq(mut self, level: QuantizationLevel) -> Self {
        self.isq = Some(level);
        self
    }

    /// Set temperature
    pub fn temperature(mut self, temp: f64) -> Self {
        self.temperature = Some(temp);
        self
    }

    /// Enable PagedAttention
    pub fn paged_attention(mut self, enabled: bool) -> Self {
        self.paged_attention = enabled;
        self
    }

    /// Build the configuration.
    ///
    /// Fails when no source is set, the source is empty, the temperature is
    /// negative, or ISQ is requested for a pre-quantized GGUF file.
    pub fn build(self) -> Result<MistralRsConfig> {
        let model_source = self
            .model_source
            .ok_or_else(|| MistralRsError::InvalidConfig("model_source is required".to_string()))?;
        model_source.validate()?;

        if let Some(t) = self.temperature {
            if t.is_nan() || t < 0.0 {
                return Err(MistralRsError::InvalidConfig(format!(
                    "temperature must be non-negative, got {t}"
                )));
            }
        }
        if self.isq.is_some() && matches!(model_source, ModelSource::Gguf { .. }) {
            return Err(MistralRsError::InvalidConfig(
                "ISQ cannot be applied to an already quantized GGUF model".to_string(),
            ));
        }

        Ok(MistralRsConfig {
            model_source,
            isq: self.isq,
            temperature: self.temperature,
            paged_attention: self.paged_attention,
        })
    }
}

/// Where model weights are loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    /// HuggingFace Hub model ID, e.g. `microsoft/Phi-3.5-mini-instruct`
    HuggingFace(String),
    /// A local GGUF file, split into its directory and file name
    Gguf { dir: PathBuf, file: String },
}

impl ModelSource {
    /// Create a HuggingFace model source
    pub fn huggingface(model_id: impl Into<String>) -> Self {
        Self::HuggingFace(model_id.into())
    }

    /// Create a GGUF model source from the path of a `.gguf` file
    pub fn gguf(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file = path.file_name().map(|f| f.to_string_lossy().into_owned()).unwrap_or_default();
        Self::Gguf { dir, file }
    }

    /// Human-readable identifier, used as the model name.
    pub fn id(&self) -> String {
        match self {
            Self::HuggingFace(id) => id.clone(),
            Self::Gguf { dir, file } => dir.join(file).display().to_string(),
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            Self::HuggingFace(id) if id.trim().is_empty() => {
                Err(MistralRsError::InvalidConfig("HuggingFace model ID must not be empty".to_string()))
            }
            Self::Gguf { file, .. } if file.is_empty() => {
                Err(MistralRsError::InvalidConfig("GGUF path must name a file".to_string()))
            }
            _ => Ok(()),
        }
    }
}

/// Quantization levels for ISQ (In-Situ Quantization)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum QuantizationLevel {
    /// 4-bit quantization (variant 0)
    Q4_0,
    /// 5-bit quantization (variant 0)
    Q5_0,
    /// 8-bit quantization (variant 0)
    Q8_0,
    /// 4-bit K-quant
    Q4K,
    /// 5-bit K-quant
    Q5K,
    /// 6-bit K-quant
    Q6K,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gguf_source_splits_dir_and_file() {
        let source = ModelSource::gguf("/models/phi/phi-3.5-mini.Q4_K_M.gguf");
        assert_eq!(
            source,
            ModelSource::Gguf {
                dir: PathBuf::from("/models/phi"),
                file: "phi-3.5-mini.Q4_K_M.gguf".to_string()
            }
        );
    }

    #[test]
    fn bare_gguf_file_uses_current_dir() {
        let ModelSource::Gguf { dir, file } = ModelSource::gguf("model.gguf") else {
            panic!("expected GGUF source");
        };
        assert_eq!(dir, PathBuf::from("."));
        assert_eq!(file, "model.gguf");
    }

    #[test]
    fn source_is_required() {
        assert!(matches!(MistralRsConfig::builder().build(), Err(MistralRsError::InvalidConfig(_))));
    }

    #[test]
    fn isq_on_gguf_is_rejected() {
        let result = MistralRsConfig::builder()
            .model_source(ModelSource::gguf("/m/model.gguf"))
            .isq(QuantizationLevel::Q4K)
            .build();
        assert!(matches!(result, Err(MistralRsError::InvalidConfig(_))));
    }
}
