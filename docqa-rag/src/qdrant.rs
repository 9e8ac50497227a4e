//! Qdrant vector store backend.
//!
//! Provides [`QdrantVectorStore`] which implements [`VectorStore`] using
//! the [qdrant-client](https://docs.rs/qdrant-client) crate over gRPC.
//!
//! # Example
//!
//! ```rust,ignore
//! use docqa_rag::qdrant::QdrantVectorStore;
//!
//! let store = QdrantVectorStore::new("http://localhost:6334")?;
//! store.ensure_collection("rag_docs", 384, Distance::Cosine).await?;
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::vectors_config::Config as VectorsConfigKind;
use qdrant_client::qdrant::{
    CountPointsBuilder, CreateCollectionBuilder, Distance as QdrantDistance, PointStruct,
    ScoredPoint, SearchPointsBuilder, UpsertPointsBuilder, Value as QdrantValue,
    VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::document::{Chunk, SearchResult};
use crate::error::{RagError, Result};
use crate::vectorstore::{Distance, VectorStore};

/// A [`VectorStore`] backed by [Qdrant](https://qdrant.tech/).
///
/// Chunk fields are stored as the point payload (`text`, `filename`, `page`,
/// `chunk_index`). Persistence is whatever the Qdrant server provides.
pub struct QdrantVectorStore {
    client: Qdrant,
    // Distance code per collection, filled by `ensure_collection`.
    distances: RwLock<HashMap<String, i32>>,
}

impl QdrantVectorStore {
    /// Create a new Qdrant vector store connecting to the given URL.
    pub fn new(url: &str) -> Result<Self> {
        let client = Qdrant::from_url(url).build().map_err(Self::map_err)?;
        Ok(Self::from_client(client))
    }

    /// Create a new Qdrant vector store from an existing client.
    pub fn from_client(client: Qdrant) -> Self {
        Self { client, distances: RwLock::new(HashMap::new()) }
    }

    fn map_err(e: qdrant_client::QdrantError) -> RagError {
        RagError::VectorStoreError { backend: "qdrant".to_string(), message: e.to_string() }
    }

    /// Read the `(size, distance)` of an existing collection's unnamed vector.
    async fn vector_params(&self, name: &str) -> Result<Option<(u64, i32)>> {
        let info = self.client.collection_info(name).await.map_err(Self::map_err)?;
        let params = info
            .result
            .and_then(|info| info.config)
            .and_then(|config| config.params)
            .and_then(|params| params.vectors_config)
            .and_then(|vectors| vectors.config);

        Ok(match params {
            Some(VectorsConfigKind::Params(p)) => Some((p.size, p.distance)),
            _ => None,
        })
    }

    async fn remember_distance(&self, name: &str, distance: i32) {
        self.distances.write().await.insert(name.to_string(), distance);
    }

    /// The distance code of `name`, asking the server only on a cache miss.
    async fn distance_of(&self, name: &str) -> Result<i32> {
        if let Some(distance) = self.distances.read().await.get(name) {
            return Ok(*distance);
        }
        let distance = self.vector_params(name).await?.map(|(_, d)| d).unwrap_or_default();
        self.remember_distance(name, distance).await;
        Ok(distance)
    }
}

fn to_qdrant(distance: Distance) -> QdrantDistance {
    match distance {
        Distance::Cosine => QdrantDistance::Cosine,
        Distance::Dot => QdrantDistance::Dot,
        Distance::Euclidean => QdrantDistance::Euclid,
    }
}

fn extract_string(value: &QdrantValue) -> Option<String> {
    match &value.kind {
        Some(Kind::StringValue(s)) => Some(s.clone()),
        _ => None,
    }
}

fn extract_integer(value: &QdrantValue) -> Option<i64> {
    match &value.kind {
        Some(Kind::IntegerValue(n)) => Some(*n),
        _ => None,
    }
}

fn chunk_payload(chunk: &Chunk) -> Result<Payload> {
    Payload::try_from(serde_json::json!({
        "text": chunk.text(),
        "filename": chunk.filename(),
        "page": chunk.page(),
        "chunk_index": chunk.chunk_index(),
    }))
    .map_err(QdrantVectorStore::map_err)
}

fn scored_to_result(scored: ScoredPoint, distance: i32) -> Result<SearchResult> {
    let id = scored
        .id
        .as_ref()
        .and_then(|pid| match &pid.point_id_options {
            Some(PointIdOptions::Uuid(s)) => Uuid::parse_str(s).ok(),
            _ => None,
        })
        .unwrap_or_else(Uuid::nil);

    let text = scored.payload.get("text").and_then(extract_string).unwrap_or_default();
    let filename = scored.payload.get("filename").and_then(extract_string).unwrap_or_default();
    let page = scored.payload.get("page").and_then(extract_integer).unwrap_or(1);
    let chunk_index = scored.payload.get("chunk_index").and_then(extract_integer).unwrap_or(0);

    let chunk = Chunk::new(
        text,
        filename,
        u32::try_from(page).unwrap_or(1),
        usize::try_from(chunk_index).unwrap_or(0),
    )?;

    // Qdrant reports Euclidean as a distance; the trait promises higher-is-closer.
    let score = if distance == QdrantDistance::Euclid as i32 { -scored.score } else { scored.score };
    Ok(SearchResult { id, chunk, score })
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn ensure_collection(
        &self,
        name: &str,
        dimensions: usize,
        distance: Distance,
    ) -> Result<()> {
        let exists = self.client.collection_exists(name).await.map_err(Self::map_err)?;
        if exists {
            let expected = (dimensions as u64, to_qdrant(distance) as i32);
            return match self.vector_params(name).await? {
                Some(actual) if actual == expected => {
                    self.remember_distance(name, expected.1).await;
                    debug!(collection = name, "qdrant collection already exists, skipping creation");
                    Ok(())
                }
                actual => Err(RagError::CollectionConfigMismatch {
                    collection: name.to_string(),
                    expected: format!("{dimensions} dimensions, {distance}"),
                    actual: match actual {
                        Some((size, d)) => format!("{size} dimensions, distance code {d}"),
                        None => "named or missing vector configuration".to_string(),
                    },
                }),
            };
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(name)
                    .vectors_config(VectorParamsBuilder::new(dimensions as u64, to_qdrant(distance))),
            )
            .await
            .map_err(Self::map_err)?;
        self.remember_distance(name, to_qdrant(distance) as i32).await;

        debug!(collection = name, dimensions, %distance, "created qdrant collection");
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.distances.write().await.remove(name);
        let exists = self.client.collection_exists(name).await.map_err(Self::map_err)?;
        if exists {
            self.client.delete_collection(name).await.map_err(Self::map_err)?;
            debug!(collection = name, "deleted qdrant collection");
        }
        Ok(())
    }

    async fn upsert(&self, collection: &str, records: &[(Vec<f32>, Chunk)]) -> Result<Vec<Uuid>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::with_capacity(records.len());
        let mut points = Vec::with_capacity(records.len());
        for (vector, chunk) in records {
            let id = Uuid::new_v4();
            points.push(PointStruct::new(id.to_string(), vector.clone(), chunk_payload(chunk)?));
            ids.push(id);
        }

        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, points).wait(true))
            .await
            .map_err(Self::map_err)?;

        debug!(collection, count = ids.len(), "upserted chunks to qdrant");
        Ok(ids)
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let distance = self.distance_of(collection).await?;
        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(collection, embedding.to_vec(), top_k as u64)
                    .with_payload(true),
            )
            .await
            .map_err(Self::map_err)?;

        response.result.into_iter().map(|scored| scored_to_result(scored, distance)).collect()
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let response = self
            .client
            .count(CountPointsBuilder::new(collection).exact(true))
            .await
            .map_err(Self::map_err)?;
        Ok(response.result.map(|r| r.count as usize).unwrap_or(0))
    }
}
