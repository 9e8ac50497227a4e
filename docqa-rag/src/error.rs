//! Error types for the `docqa-rag` crate.

use thiserror::Error;

/// Errors that can occur while ingesting documents or answering questions.
#[derive(Debug, Error)]
pub enum RagError {
    /// No text could be obtained from an uploaded file.
    #[error("Extraction failed for '{filename}': {message}")]
    ExtractionFailed {
        /// The uploaded file's name.
        filename: String,
        /// A description of the failure.
        message: String,
    },

    /// The file extension is not one of the supported document formats.
    #[error("Unsupported format for '{filename}': only .pdf and .docx files are accepted")]
    UnsupportedFormat {
        /// The uploaded file's name.
        filename: String,
    },

    /// An existing collection was created with different parameters.
    #[error("Collection '{collection}' mismatch: expected {expected}, found {actual}")]
    CollectionConfigMismatch {
        /// The collection name.
        collection: String,
        /// The requested parameters.
        expected: String,
        /// The parameters the collection actually has.
        actual: String,
    },

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The language model call failed.
    #[error("Generation error ({model}): {message}")]
    GenerationError {
        /// The model that produced the error.
        model: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// An invalid chunk was constructed.
    #[error("Chunking error: {0}")]
    ChunkingError(String),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Reading an upload from disk failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A convenience result type for docqa operations.
pub type Result<T> = std::result::Result<T, RagError>;
