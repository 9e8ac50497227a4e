//! Vector store trait for storing and searching chunk embeddings.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::document::{Chunk, SearchResult};
use crate::error::Result;

/// Distance metric a collection is created with.
///
/// Scores are always "higher is closer": cosine similarity, dot product, or
/// the negated Euclidean distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Distance {
    /// Cosine similarity.
    #[default]
    Cosine,
    /// Raw dot product.
    Dot,
    /// Negated Euclidean distance.
    Euclidean,
}

impl Distance {
    /// Score `a` against `b` under this metric.
    ///
    /// Cosine returns 0.0 if either vector has zero magnitude.
    pub fn score(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Distance::Cosine => {
                let dot = dot(a, b);
                let norm_a = dot_self(a).sqrt();
                let norm_b = dot_self(b).sqrt();
                if norm_a == 0.0 || norm_b == 0.0 {
                    return 0.0;
                }
                dot / (norm_a * norm_b)
            }
            Distance::Dot => dot(a, b),
            Distance::Euclidean => {
                let sum: f32 = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum();
                -sum.sqrt()
            }
        }
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn dot_self(a: &[f32]) -> f32 {
    dot(a, a)
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Distance::Cosine => "cosine",
            Distance::Dot => "dot",
            Distance::Euclidean => "euclidean",
        };
        f.write_str(name)
    }
}

/// A storage backend for chunk embeddings with similarity search.
///
/// Every point gets a freshly generated id on upsert, so storing the same
/// chunk twice creates two points.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{Distance, InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.ensure_collection("docs", 384, Distance::Cosine).await?;
/// store.upsert("docs", &records).await?;
/// let results = store.search("docs", &query_embedding, 5).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create a named collection if it does not exist.
    ///
    /// Returns [`RagError::CollectionConfigMismatch`](crate::RagError::CollectionConfigMismatch)
    /// if the collection exists with other dimensions or another metric.
    async fn ensure_collection(
        &self,
        name: &str,
        dimensions: usize,
        distance: Distance,
    ) -> Result<()>;

    /// Delete a named collection and all its points. No-op if absent.
    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// Store `(vector, chunk)` records, returning the id generated for each.
    ///
    /// Either every record is stored or none is.
    async fn upsert(&self, collection: &str, records: &[(Vec<f32>, Chunk)]) -> Result<Vec<Uuid>>;

    /// Search for the `top_k` chunks most similar to the given embedding.
    ///
    /// Returns results ordered by descending score; an empty `Vec` when the
    /// collection holds no points.
    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>>;

    /// Number of points stored in a collection.
    async fn count(&self, collection: &str) -> Result<usize>;
}
