//! Fixed-size word-window chunking.
//!
//! [`WordWindowChunker`] splits text on whitespace and emits overlapping
//! windows of `chunk_size` words. Boundaries are purely lexical: sentences
//! and paragraphs are not respected.

use crate::document::{Chunk, PageText};
use crate::error::{RagError, Result};

/// Splits text into overlapping windows of whitespace-delimited words.
///
/// # Example
///
/// ```rust
/// use docqa_rag::WordWindowChunker;
///
/// let chunker = WordWindowChunker::new(4, 1).unwrap();
/// assert_eq!(chunker.split("a b c d e f"), vec!["a b c d", "d e f"]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordWindowChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for WordWindowChunker {
    fn default() -> Self {
        Self { chunk_size: 300, chunk_overlap: 50 }
    }
}

impl WordWindowChunker {
    /// Create a new `WordWindowChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: number of words per chunk
    /// * `chunk_overlap`: number of words shared by consecutive chunks
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `chunk_size` is zero or
    /// `chunk_overlap >= chunk_size`; the window would never advance.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RagError::ConfigError("chunk_size must be greater than zero".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, chunk_overlap })
    }

    /// Words per chunk.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Words shared by consecutive chunks.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split text into word windows joined by single spaces.
    ///
    /// Returns an empty `Vec` for blank input. The window stops advancing once
    /// it has covered the last word, so no trailing chunk consists solely of
    /// overlap.
    pub fn split(&self, text: &str) -> Vec<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        let step = self.chunk_size - self.chunk_overlap;

        let mut chunks = Vec::new();
        let mut start = 0;
        while start < words.len() {
            let end = (start + self.chunk_size).min(words.len());
            chunks.push(words[start..end].join(" "));
            if end == words.len() {
                break;
            }
            start += step;
        }
        chunks
    }

    /// Chunk every page of a document.
    ///
    /// Each chunk keeps its page's filename and page number. `chunk_index`
    /// counts from 0 across the whole document. Pages without words produce
    /// no chunks.
    pub fn chunk(&self, pages: &[PageText]) -> Result<Vec<Chunk>> {
        let mut chunks = Vec::new();
        for page in pages {
            for text in self.split(&page.text) {
                let index = chunks.len();
                chunks.push(Chunk::new(text, page.filename.clone(), page.page, index)?);
            }
        }
        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(text: &str, page: u32) -> PageText {
        PageText { text: text.to_string(), page, filename: "doc.pdf".to_string() }
    }

    #[test]
    fn splits_with_overlap() {
        let chunker = WordWindowChunker::new(4, 1).unwrap();
        assert_eq!(chunker.split("a b c d e f"), vec!["a b c d", "d e f"]);
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        let chunker = WordWindowChunker::default();
        assert!(chunker.split("").is_empty());
        assert!(chunker.split(" \n\t ").is_empty());
    }

    #[test]
    fn short_text_yields_single_chunk() {
        let chunker = WordWindowChunker::default();
        assert_eq!(chunker.split("only a few words"), vec!["only a few words"]);
    }

    #[test]
    fn whitespace_is_normalized() {
        let chunker = WordWindowChunker::new(10, 2).unwrap();
        assert_eq!(chunker.split("  one\ttwo\n\nthree  "), vec!["one two three"]);
    }

    #[test]
    fn no_tail_chunk_made_only_of_overlap() {
        let chunker = WordWindowChunker::new(4, 1).unwrap();
        assert_eq!(chunker.split("a b c d"), vec!["a b c d"]);
        let chunker = WordWindowChunker::new(3, 1).unwrap();
        assert_eq!(chunker.split("a b c d"), vec!["a b c", "c d"]);
    }

    #[test]
    fn rejects_overlap_equal_to_size() {
        assert!(matches!(WordWindowChunker::new(5, 5), Err(RagError::ConfigError(_))));
        assert!(WordWindowChunker::new(5, 9).is_err());
        assert!(WordWindowChunker::new(0, 0).is_err());
    }

    #[test]
    fn chunk_indexes_run_across_pages() {
        let chunker = WordWindowChunker::new(2, 0).unwrap();
        let chunks = chunker.chunk(&[page("a b c", 1), page("", 2), page("d e", 3)]).unwrap();

        let summary: Vec<(&str, u32, usize)> =
            chunks.iter().map(|c| (c.text(), c.page(), c.chunk_index())).collect();
        assert_eq!(summary, vec![("a b", 1, 0), ("c", 1, 1), ("d e", 3, 2)]);
        assert!(chunks.iter().all(|c| c.filename() == "doc.pdf"));
    }
}
