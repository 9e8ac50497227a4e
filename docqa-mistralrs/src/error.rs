//! Error types for docqa-mistralrs.

use docqa_rag::RagError;
use thiserror::Error;

/// Errors that can occur when loading or running a mistral.rs model.
#[derive(Debug, Error)]
pub enum MistralRsError {
    /// Model loading failed
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    /// Model file not found
    #[error("Model not found at path: {path}")]
    ModelNotFound { path: String },

    /// Inference failed
    #[error("Inference failed: {0}")]
    Inference(String),

    /// The model returned no choices or no message content
    #[error("Model returned an empty response")]
    EmptyResponse,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl MistralRsError {
    /// Convert into a pipeline error attributed to `model`.
    pub fn into_rag(self, model: &str) -> RagError {
        match self {
            MistralRsError::InvalidConfig(message) => RagError::ConfigError(message),
            other => {
                RagError::GenerationError { model: model.to_string(), message: other.to_string() }
            }
        }
    }
}

/// Result type alias for MistralRsError
pub type Result<T> = std::result::Result<T, MistralRsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inference_failure_becomes_generation_error() {
        let err = MistralRsError::Inference("sequence aborted".to_string()).into_rag("phi");
        match err {
            RagError::GenerationError { model, message } => {
                assert_eq!(model, "phi");
                assert!(message.contains("sequence aborted"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn invalid_config_stays_a_config_error() {
        let err = MistralRsError::InvalidConfig("empty model id".to_string()).into_rag("phi");
        assert!(matches!(err, RagError::ConfigError(_)));
    }

    #[test]
    fn load_failures_are_reported_against_the_model() {
        let cases = [
            MistralRsError::ModelLoad("bad weights".to_string()),
            MistralRsError::ModelNotFound { path: "/models/missing.gguf".to_string() },
            MistralRsError::EmptyResponse,
        ];
        for case in cases {
            let expected = case.to_string();
            match case.into_rag("local") {
                RagError::GenerationError { model, message } => {
                    assert_eq!(model, "local");
                    assert_eq!(message, expected);
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }
}
