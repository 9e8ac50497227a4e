//! RAG pipeline orchestrator.
//!
//! The [`RagPipeline`] runs the two flows of the system:
//!
//! - **ingest**: extract → chunk → embed → store, reporting the chunk count
//! - **ask**: embed question → search → generate, or report no matches
//!
//! Every collaborator is injected through [`RagPipeline::builder()`].
//!
//! # Example
//!
//! ```rust,ignore
//! use docqa_rag::{AnswerGenerator, InMemoryVectorStore, RagConfig, RagPipeline};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(embedder))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .generator(AnswerGenerator::new(Arc::new(model)))
//!     .build()?;
//!
//! pipeline.init().await?;
//! let report = pipeline.ingest_file("handbook.pdf").await?;
//! let outcome = pipeline.ask("How many vacation days do I get?").await?;
//! ```

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::chunking::WordWindowChunker;
use crate::config::RagConfig;
use crate::document::SearchResult;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::AnswerGenerator;
use crate::reader::{DocumentFormat, DocumentReader, display_name};
use crate::vectorstore::VectorStore;

/// Separator placed between retrieved chunk texts in the context.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// Summary of a successful ingest.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    /// Name of the ingested file.
    pub filename: String,
    /// Number of page records extracted.
    pub pages: usize,
    /// Number of chunks stored.
    pub chunk_count: usize,
    /// Ids of the stored points, in chunk order.
    pub point_ids: Vec<Uuid>,
}

/// A generated answer with the material it was generated from.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    /// The trimmed model output.
    pub answer: String,
    /// Retrieved chunk texts joined in rank order.
    pub context: String,
    /// The retrieved chunks with their scores.
    pub sources: Vec<SearchResult>,
}

/// Result of asking a question.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QueryOutcome {
    /// Nothing was retrieved; the model was not called.
    NoMatches,
    /// The model answered from the retrieved context.
    Answered(Answer),
}

/// The RAG pipeline orchestrator. Construct one via [`RagPipeline::builder()`].
pub struct RagPipeline {
    config: RagConfig,
    reader: DocumentReader,
    chunker: WordWindowChunker,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    generator: AnswerGenerator,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the vector store.
    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    /// Ensure the configured collection exists.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::CollectionConfigMismatch`] if the collection exists
    /// with other parameters, or the store's error otherwise.
    pub async fn init(&self) -> Result<()> {
        let config = &self.config;
        self.vector_store
            .ensure_collection(&config.collection, config.dimensions, config.distance)
            .await
            .inspect_err(|e| {
                error!(collection = %config.collection, error = %e, "failed to ensure collection");
            })
    }

    /// Number of points currently stored in the configured collection.
    pub async fn indexed_count(&self) -> Result<usize> {
        self.init().await?;
        self.vector_store.count(&self.config.collection).await
    }

    /// Ingest a file from disk.
    ///
    /// The extension is checked before the file is read.
    pub async fn ingest_file(&self, path: impl AsRef<Path>) -> Result<IngestReport> {
        let path = path.as_ref();
        let filename = display_name(path);
        DocumentFormat::from_filename(&filename)?;
        let bytes = tokio::fs::read(path).await?;
        self.ingest_bytes(&filename, &bytes).await
    }

    /// Ingest an uploaded document: extract → chunk → embed → store.
    ///
    /// # Errors
    ///
    /// - [`RagError::UnsupportedFormat`] for extensions other than pdf/docx
    /// - [`RagError::ExtractionFailed`] if no text could be extracted
    /// - [`RagError::EmbeddingError`] if the embedder fails; nothing is stored
    pub async fn ingest_bytes(&self, filename: &str, bytes: &[u8]) -> Result<IngestReport> {
        // 1. Extract
        let pages = self.reader.read_bytes(filename, bytes).inspect_err(|e| {
            error!(filename, error = %e, "extraction failed");
        })?;
        if DocumentReader::full_text(&pages).trim().is_empty() {
            error!(filename, "no text extracted");
            return Err(RagError::ExtractionFailed {
                filename: filename.to_string(),
                message: "no text could be extracted".to_string(),
            });
        }

        // 2. Chunk
        let chunks = self.chunker.chunk(&pages)?;

        // 3. Embed every chunk before touching the store
        let texts: Vec<&str> = chunks.iter().map(|c| c.text()).collect();
        let embeddings = self.embedding_provider.embed_batch(&texts).await.map_err(|e| {
            error!(filename, error = %e, "embedding failed during ingestion");
            self.embedding_failure(e)
        })?;
        if embeddings.len() != chunks.len() {
            return Err(RagError::EmbeddingError {
                provider: self.embedding_provider.name().to_string(),
                message: format!("expected {} embeddings, got {}", chunks.len(), embeddings.len()),
            });
        }

        // 4. Store in one all-or-nothing upsert
        self.init().await?;
        let records: Vec<_> = embeddings.into_iter().zip(chunks).collect();
        let point_ids =
            self.vector_store.upsert(&self.config.collection, &records).await.inspect_err(|e| {
                error!(filename, error = %e, "upsert failed during ingestion");
            })?;

        let report = IngestReport {
            filename: filename.to_string(),
            pages: pages.len(),
            chunk_count: point_ids.len(),
            point_ids,
        };
        info!(filename, pages = report.pages, chunk_count = report.chunk_count, "ingested document");
        Ok(report)
    }

    /// Embed the question and return the top-k matching chunks.
    ///
    /// Results below the optional similarity threshold are dropped.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<SearchResult>> {
        let query_embedding = self.embedding_provider.embed(question).await.map_err(|e| {
            error!(error = %e, "embedding failed during query");
            self.embedding_failure(e)
        })?;

        self.init().await?;
        let results = self
            .vector_store
            .search(&self.config.collection, &query_embedding, self.config.top_k)
            .await
            .inspect_err(|e| {
                error!(collection = %self.config.collection, error = %e, "vector store search failed");
            })?;

        Ok(match self.config.similarity_threshold {
            Some(threshold) => results.into_iter().filter(|r| r.score >= threshold).collect(),
            None => results,
        })
    }

    /// Answer a question from the indexed documents.
    ///
    /// Returns [`QueryOutcome::NoMatches`] without calling the model when
    /// nothing is retrieved.
    pub async fn ask(&self, question: &str) -> Result<QueryOutcome> {
        let sources = self.retrieve(question).await?;
        if sources.is_empty() {
            info!(result_count = 0, "query completed without matches");
            return Ok(QueryOutcome::NoMatches);
        }

        let context = build_context(&sources);
        let answer = self.generator.generate(&context, question).await?;

        info!(result_count = sources.len(), answer_len = answer.len(), "query completed");
        Ok(QueryOutcome::Answered(Answer { answer, context, sources }))
    }

    fn embedding_failure(&self, e: RagError) -> RagError {
        match e {
            RagError::EmbeddingError { .. } => e,
            other => RagError::EmbeddingError {
                provider: self.embedding_provider.name().to_string(),
                message: other.to_string(),
            },
        }
    }
}

/// Join retrieved chunk texts in rank order.
pub fn build_context(results: &[SearchResult]) -> String {
    results.iter().map(|r| r.chunk.text()).collect::<Vec<_>>().join(CONTEXT_SEPARATOR)
}

/// Builder for constructing a [`RagPipeline`].
///
/// The embedding provider, vector store, and generator are required; config,
/// reader, and chunker fall back to defaults (the chunker defaults to the
/// config's chunk size and overlap). The generator's token budget is taken
/// from the config.
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    reader: Option<DocumentReader>,
    chunker: Option<WordWindowChunker>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    generator: Option<AnswerGenerator>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the document reader.
    pub fn reader(mut self, reader: DocumentReader) -> Self {
        self.reader = Some(reader);
        self
    }

    /// Set the chunker, overriding the config's chunk size and overlap.
    pub fn chunker(mut self, chunker: WordWindowChunker) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set the answer generator.
    pub fn generator(mut self, generator: AnswerGenerator) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Build the [`RagPipeline`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a required collaborator is missing
    /// or the embedder's dimensionality differs from the configured one.
    pub fn build(self) -> Result<RagPipeline> {
        let config = self.config.unwrap_or_default();
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::ConfigError("vector_store is required".to_string()))?;
        let generator =
            self.generator.ok_or_else(|| RagError::ConfigError("generator is required".to_string()))?;

        if embedding_provider.dimensions() != config.dimensions {
            return Err(RagError::ConfigError(format!(
                "embedding provider '{}' produces {} dimensions but collection '{}' is configured for {}",
                embedding_provider.name(),
                embedding_provider.dimensions(),
                config.collection,
                config.dimensions
            )));
        }

        let chunker = match self.chunker {
            Some(chunker) => chunker,
            None => WordWindowChunker::new(config.chunk_size, config.chunk_overlap)?,
        };

        let generator = generator.with_max_tokens(config.max_tokens);
        Ok(RagPipeline {
            config,
            reader: self.reader.unwrap_or_default(),
            chunker,
            embedding_provider,
            vector_store,
            generator,
        })
    }
}
