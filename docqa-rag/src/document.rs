//! Data types for extracted pages, chunks, and search results.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{RagError, Result};

/// Text extracted from one page of an uploaded document.
///
/// DOCX files have no page concept and always produce a single record with
/// `page == 1`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageText {
    /// The extracted text. Empty when extraction of this page failed.
    pub text: String,
    /// One-based page number.
    pub page: u32,
    /// Name of the uploaded file.
    pub filename: String,
}

/// A bounded word-count slice of a document, the unit of storage and retrieval.
///
/// Fields are private so that every chunk passes the checks in [`Chunk::new`],
/// including chunks deserialized from stored payloads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "ChunkFields")]
pub struct Chunk {
    text: String,
    filename: String,
    page: u32,
    chunk_index: usize,
}

impl Chunk {
    /// Create a validated chunk.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ChunkingError`] if the text is blank, the filename
    /// is empty, or `page` is zero.
    pub fn new(
        text: impl Into<String>,
        filename: impl Into<String>,
        page: u32,
        chunk_index: usize,
    ) -> Result<Self> {
        let text = text.into();
        let filename = filename.into();
        if text.trim().is_empty() {
            return Err(RagError::ChunkingError("chunk text must not be empty".to_string()));
        }
        if filename.is_empty() {
            return Err(RagError::ChunkingError("chunk filename must not be empty".to_string()));
        }
        if page == 0 {
            return Err(RagError::ChunkingError("page numbers start at 1".to_string()));
        }
        Ok(Self { text, filename, page, chunk_index })
    }

    /// The chunk's text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Name of the file the chunk came from.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// One-based page number the chunk came from.
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Position of the chunk within its document, starting at 0.
    pub fn chunk_index(&self) -> usize {
        self.chunk_index
    }
}

#[derive(Deserialize)]
struct ChunkFields {
    text: String,
    filename: String,
    page: u32,
    chunk_index: usize,
}

impl TryFrom<ChunkFields> for Chunk {
    type Error = RagError;

    fn try_from(fields: ChunkFields) -> Result<Self> {
        Chunk::new(fields.text, fields.filename, fields.page, fields.chunk_index)
    }
}

/// A retrieved [`Chunk`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The id the point was stored under.
    pub id: Uuid,
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// The similarity score (higher is more relevant).
    pub score: f32,
}
