//! Answer generation from retrieved context.
//!
//! A [`LanguageModel`] is the black-box local model; [`AnswerGenerator`]
//! renders the [`PromptTemplate`], enforces the token budget, and trims the
//! completion.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use crate::error::{RagError, Result};

/// Placeholder replaced by the retrieved context.
pub const CONTEXT_PLACEHOLDER: &str = "{context}";

/// Placeholder replaced by the user's question.
pub const QUESTION_PLACEHOLDER: &str = "{question}";

/// The default markdown-heading prompt.
pub const DEFAULT_TEMPLATE: &str = "Use the below context to answer the user's question strictly from the documents.

### Context:
{context}

### Question:
{question}

### Answer:";

/// A local text-completion model.
///
/// Implementations are loaded once and shared for the process lifetime.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Model name used in logs and errors.
    fn name(&self) -> &str;

    /// Complete `prompt`, generating at most `max_tokens` tokens.
    async fn complete(&self, prompt: &str, max_tokens: usize) -> Result<String>;
}

/// A prompt with one `{context}` and one `{question}` interpolation point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self { template: DEFAULT_TEMPLATE.to_string() }
    }
}

impl PromptTemplate {
    /// Create a template.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if either placeholder is missing.
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        for placeholder in [CONTEXT_PLACEHOLDER, QUESTION_PLACEHOLDER] {
            if !template.contains(placeholder) {
                return Err(RagError::ConfigError(format!(
                    "prompt template is missing the {placeholder} placeholder"
                )));
            }
        }
        Ok(Self { template })
    }

    /// The raw template text.
    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Substitute both placeholders in a single pass.
    ///
    /// Placeholder-like text inside `context` or `question` is copied
    /// verbatim, never expanded.
    pub fn render(&self, context: &str, question: &str) -> String {
        let mut out = String::with_capacity(self.template.len() + context.len() + question.len());
        let mut rest = self.template.as_str();

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let tail = &rest[open..];
            if let Some(after) = tail.strip_prefix(CONTEXT_PLACEHOLDER) {
                out.push_str(context);
                rest = after;
            } else if let Some(after) = tail.strip_prefix(QUESTION_PLACEHOLDER) {
                out.push_str(question);
                rest = after;
            } else {
                out.push('{');
                rest = &tail[1..];
            }
        }
        out.push_str(rest);
        out
    }
}

/// Produces answers from a context string and a question.
#[derive(Clone)]
pub struct AnswerGenerator {
    model: Arc<dyn LanguageModel>,
    template: PromptTemplate,
    max_tokens: usize,
}

impl AnswerGenerator {
    /// Create a generator with the default template and a 256-token budget.
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model, template: PromptTemplate::default(), max_tokens: 256 }
    }

    /// Use a custom prompt template.
    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    /// Set the maximum number of generated tokens.
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// The generation budget in tokens.
    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// The prompt template in use.
    pub fn template(&self) -> &PromptTemplate {
        &self.template
    }

    /// Render the prompt, call the model once, and trim the completion.
    ///
    /// # Errors
    ///
    /// Any model failure is returned as [`RagError::GenerationError`].
    pub async fn generate(&self, context: &str, question: &str) -> Result<String> {
        let prompt = self.template.render(context, question);
        debug!(model = self.model.name(), prompt_len = prompt.len(), max_tokens = self.max_tokens, "generating answer");

        let completion = self.model.complete(&prompt, self.max_tokens).await.map_err(|e| {
            error!(model = self.model.name(), error = %e, "generation failed");
            match e {
                RagError::GenerationError { .. } => e,
                other => RagError::GenerationError {
                    model: self.model.name().to_string(),
                    message: other.to_string(),
                },
            }
        })?;

        Ok(completion.trim().to_string())
    }
}

impl std::fmt::Debug for AnswerGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnswerGenerator")
            .field("model", &self.model.name())
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct EchoModel {
        seen: Mutex<Vec<(String, usize)>>,
    }

    #[async_trait]
    impl LanguageModel for EchoModel {
        fn name(&self) -> &str {
            "echo"
        }

        async fn complete(&self, prompt: &str, max_tokens: usize) -> Result<String> {
            self.seen.lock().unwrap().push((prompt.to_string(), max_tokens));
            Ok("  \n The answer. \n".to_string())
        }
    }

    struct BrokenModel;

    #[async_trait]
    impl LanguageModel for BrokenModel {
        fn name(&self) -> &str {
            "broken"
        }

        async fn complete(&self, _prompt: &str, _max_tokens: usize) -> Result<String> {
            Err(RagError::ConfigError("weights missing".to_string()))
        }
    }

    #[test]
    fn default_template_renders_context_and_question() {
        let prompt = PromptTemplate::default().render("CTX", "Q?");
        assert!(prompt.contains("### Context:\nCTX\n\n### Question:\nQ?\n\n### Answer:"));
    }

    #[test]
    fn render_does_not_expand_placeholders_in_values() {
        let template = PromptTemplate::new("[{context}] ({question}) {other}").unwrap();
        assert_eq!(template.render("{question}", "{context}"), "[{question}] ({context}) {other}");
    }

    #[test]
    fn template_requires_both_placeholders() {
        assert!(PromptTemplate::new("only {context}").is_err());
        assert!(PromptTemplate::new("only {question}").is_err());
    }

    #[tokio::test]
    async fn generate_trims_and_passes_budget() {
        let model = Arc::new(EchoModel { seen: Mutex::new(Vec::new()) });
        let generator = AnswerGenerator::new(model.clone()).with_max_tokens(64);

        let answer = generator.generate("some context", "a question").await.unwrap();
        assert_eq!(answer, "The answer.");

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].1, 64);
        assert!(seen[0].0.contains("some context"));
    }

    #[tokio::test]
    async fn model_failure_becomes_generation_error() {
        let generator = AnswerGenerator::new(Arc::new(BrokenModel));
        let result = generator.generate("ctx", "q").await;
        assert!(matches!(result, Err(RagError::GenerationError { model, .. }) if model == "broken"));
    }
}
