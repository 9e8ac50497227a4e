//! # docqa-rag
//!
//! Ask questions about your PDF and Word documents with a local model.
//!
//! Uploaded files are split into overlapping word windows, embedded, and
//! stored in a vector collection. A question is embedded the same way, the
//! nearest chunks are retrieved, and a local language model answers from
//! them.
//!
//! ## Components
//!
//! - [`DocumentReader`]: PDF (per page) and DOCX (whole document) text extraction
//! - [`WordWindowChunker`]: fixed-size word windows with overlap
//! - [`EmbeddingProvider`]: text → vector (`OpenAiCompatEmbeddingProvider` behind `http`)
//! - [`VectorStore`]: [`InMemoryVectorStore`] by default, Qdrant behind `qdrant`
//! - [`AnswerGenerator`]: prompt template + [`LanguageModel`] (`LlamaServerModel` behind `llama-server`)
//! - [`RagPipeline`]: the ingest and ask flows
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use docqa_rag::{AnswerGenerator, InMemoryVectorStore, QueryOutcome, RagPipeline};
//! use docqa_rag::llama::LlamaServerModel;
//! use docqa_rag::openai::OpenAiCompatEmbeddingProvider;
//!
//! let pipeline = RagPipeline::builder()
//!     .embedding_provider(Arc::new(OpenAiCompatEmbeddingProvider::new("http://localhost:11434/v1")?))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .generator(AnswerGenerator::new(Arc::new(LlamaServerModel::new("http://127.0.0.1:8080")?)))
//!     .build()?;
//!
//! pipeline.ingest_file("handbook.pdf").await?;
//! if let QueryOutcome::Answered(answer) = pipeline.ask("What is the refund policy?").await? {
//!     println!("{}", answer.answer);
//! }
//! ```

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod inmemory;
pub mod pipeline;
pub mod reader;
pub mod vectorstore;

#[cfg(feature = "llama-server")]
pub mod llama;
#[cfg(feature = "http")]
pub mod openai;
#[cfg(feature = "qdrant")]
pub mod qdrant;

pub use chunking::WordWindowChunker;
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Chunk, PageText, SearchResult};
pub use embedding::{EmbeddingProvider, HashEmbeddingProvider};
pub use error::{RagError, Result};
pub use generation::{AnswerGenerator, LanguageModel, PromptTemplate};
pub use inmemory::InMemoryVectorStore;
pub use pipeline::{Answer, IngestReport, QueryOutcome, RagPipeline, RagPipelineBuilder};
pub use reader::{DocumentFormat, DocumentReader};
pub use vectorstore::{Distance, VectorStore};
