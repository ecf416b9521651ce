use std::future::Future;
use std::sync::Arc;

use qdrant_client::Qdrant;
use qdrant_client::qdrant::SearchPointsBuilder;
use tracing::{debug, instrument};

use super::error::VectorDbError;
use super::model::NeighborHit;

#[derive(Clone)]
/// Qdrant nearest-neighbor search.
pub struct QdrantSearch {
    client: Qdrant,
    url: String,
}

impl std::fmt::Debug for QdrantSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QdrantSearch")
            .field("url", &self.url)
            .finish()
    }
}

impl QdrantSearch {
    /// Creates a client for `url` (no request is made until first use).
    pub fn new(url: &str) -> Result<Self, VectorDbError> {
        let client =
            Qdrant::from_url(url)
                .build()
                .map_err(|e| VectorDbError::ConnectionFailed {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    /// Returns the configured URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Performs a basic health check request.
    pub async fn health_check(&self) -> Result<(), VectorDbError> {
        self.client
            .health_check()
            .await
            .map_err(|e| VectorDbError::ConnectionFailed {
                url: self.url.clone(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    /// Returns `true` if the collection exists.
    pub async fn collection_exists(&self, name: &str) -> Result<bool, VectorDbError> {
        self.client
            .collection_exists(name)
            .await
            .map_err(|e| VectorDbError::ConnectionFailed {
                url: self.url.clone(),
                message: e.to_string(),
            })
    }

    /// Returns up to `limit` point ids closest to `vector`, best first.
    ///
    /// Payloads and stored vectors are never fetched.
    #[instrument(skip(self, vector), fields(dim = vector.len()))]
    pub async fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: u64,
    ) -> Result<Vec<NeighborHit>, VectorDbError> {
        let request = SearchPointsBuilder::new(collection, vector, limit)
            .with_payload(false)
            .with_vectors(false);

        let response = self
            .client
            .search_points(request)
            .await
            .map_err(|e| VectorDbError::SearchFailed {
                collection: collection.to_string(),
                message: e.to_string(),
            })?;

        let hits = response
            .result
            .into_iter()
            .map(|point| NeighborHit::from_scored_point(point, collection))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(hits = hits.len(), "Qdrant search complete");
        Ok(hits)
    }
}

/// Nearest-neighbor search used by the query pipeline.
pub trait NeighborSearch: Send + Sync {
    /// Ranked hits for `vector`, best first.
    fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: u64,
    ) -> impl Future<Output = Result<Vec<NeighborHit>, VectorDbError>> + Send;

    /// `Ok(())` when the backend can serve `collection`.
    fn is_ready(&self, collection: &str)
    -> impl Future<Output = Result<(), VectorDbError>> + Send;
}

impl NeighborSearch for QdrantSearch {
    async fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: u64,
    ) -> Result<Vec<NeighborHit>, VectorDbError> {
        self.search(collection, vector, limit).await
    }

    async fn is_ready(&self, collection: &str) -> Result<(), VectorDbError> {
        self.health_check().await?;
        if !self.collection_exists(collection).await? {
            return Err(VectorDbError::CollectionNotFound {
                collection: collection.to_string(),
            });
        }
        Ok(())
    }
}

impl<V: NeighborSearch> NeighborSearch for Arc<V> {
    fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: u64,
    ) -> impl Future<Output = Result<Vec<NeighborHit>, VectorDbError>> + Send {
        (**self).search(collection, vector, limit)
    }

    fn is_ready(&self, collection: &str) -> impl Future<Output = Result<(), VectorDbError>> + Send {
        (**self).is_ready(collection)
    }
}
