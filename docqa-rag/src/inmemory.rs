//! In-memory vector store.
//!
//! [`InMemoryVectorStore`] keeps every collection for the lifetime of the
//! process. The collection registry sits behind a `tokio::sync::RwLock` and
//! each collection behind its own `tokio::sync::Mutex`, so concurrent ingest
//! and query against one collection are serialised while other collections
//! stay independent.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::document::{Chunk, SearchResult};
use crate::error::{RagError, Result};
use crate::vectorstore::{Distance, VectorStore};

const BACKEND: &str = "InMemory";

#[derive(Debug)]
struct StoredPoint {
    id: Uuid,
    vector: Vec<f32>,
    payload: Chunk,
}

#[derive(Debug)]
struct Collection {
    dimensions: usize,
    distance: Distance,
    // Insertion order; search relies on it for stable tie-breaking.
    points: Vec<StoredPoint>,
}

/// An in-memory vector store with per-collection locking.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{Distance, InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.ensure_collection("docs", 384, Distance::Cosine).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Arc<Mutex<Collection>>>>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }

    async fn collection(&self, name: &str) -> Result<Arc<Mutex<Collection>>> {
        let collections = self.collections.read().await;
        collections.get(name).cloned().ok_or_else(|| RagError::VectorStoreError {
            backend: BACKEND.to_string(),
            message: format!("collection '{name}' does not exist"),
        })
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn ensure_collection(
        &self,
        name: &str,
        dimensions: usize,
        distance: Distance,
    ) -> Result<()> {
        let mut collections = self.collections.write().await;
        if let Some(existing) = collections.get(name) {
            let existing = existing.lock().await;
            if existing.dimensions != dimensions || existing.distance != distance {
                return Err(RagError::CollectionConfigMismatch {
                    collection: name.to_string(),
                    expected: format!("{dimensions} dimensions, {distance}"),
                    actual: format!("{} dimensions, {}", existing.dimensions, existing.distance),
                });
            }
            return Ok(());
        }

        collections.insert(
            name.to_string(),
            Arc::new(Mutex::new(Collection { dimensions, distance, points: Vec::new() })),
        );
        debug!(collection = name, dimensions, %distance, "created in-memory collection");
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.remove(name);
        Ok(())
    }

    async fn upsert(&self, collection: &str, records: &[(Vec<f32>, Chunk)]) -> Result<Vec<Uuid>> {
        let handle = self.collection(collection).await?;
        let mut store = handle.lock().await;

        if let Some((vector, chunk)) = records.iter().find(|(v, _)| v.len() != store.dimensions) {
            return Err(RagError::VectorStoreError {
                backend: BACKEND.to_string(),
                message: format!(
                    "vector for chunk {} of '{}' has {} dimensions, collection '{collection}' expects {}",
                    chunk.chunk_index(),
                    chunk.filename(),
                    vector.len(),
                    store.dimensions
                ),
            });
        }

        let mut ids = Vec::with_capacity(records.len());
        for (vector, chunk) in records {
            let id = Uuid::new_v4();
            store.points.push(StoredPoint { id, vector: vector.clone(), payload: chunk.clone() });
            ids.push(id);
        }

        debug!(collection, count = ids.len(), "upserted points");
        Ok(ids)
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let handle = self.collection(collection).await?;
        let store = handle.lock().await;
        if embedding.len() != store.dimensions {
            return Err(RagError::VectorStoreError {
                backend: BACKEND.to_string(),
                message: format!(
                    "query has {} dimensions, collection '{collection}' expects {}",
                    embedding.len(),
                    store.dimensions
                ),
            });
        }

        let mut scored: Vec<SearchResult> = store
            .points
            .iter()
            .map(|point| SearchResult {
                id: point.id,
                chunk: point.payload.clone(),
                score: store.distance.score(&point.vector, embedding),
            })
            .collect();

        // Stable sort keeps insertion order among equal scores.
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let handle = self.collection(collection).await?;
        let store = handle.lock().await;
        Ok(store.points.len())
    }
}
