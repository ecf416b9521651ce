use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::vectordb::{NeighborHit, NeighborSearch, VectorDbError};

/// In-memory cosine search for tests.
#[derive(Default)]
pub struct MockVectorDbClient {
    collections: RwLock<HashMap<String, MockCollection>>,
    unavailable: AtomicBool,
}

#[derive(Default, Clone)]
struct MockCollection {
    vector_size: usize,
    points: Vec<(String, Vec<f32>)>,
}

impl MockVectorDbClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates `name` if missing.
    pub fn ensure_collection(&self, name: &str, vector_size: usize) {
        if let Ok(mut collections) = self.collections.write() {
            collections
                .entry(name.to_string())
                .or_insert_with(|| MockCollection {
                    vector_size,
                    points: Vec::new(),
                });
        }
    }

    /// Adds or replaces a point.
    pub fn upsert_point(
        &self,
        collection: &str,
        id: impl Into<String>,
        vector: Vec<f32>,
    ) -> Result<(), VectorDbError> {
        let mut collections =
            self.collections
                .write()
                .map_err(|_| VectorDbError::SearchFailed {
                    collection: collection.to_string(),
                    message: "lock poisoned".to_string(),
                })?;

        let coll =
            collections
                .get_mut(collection)
                .ok_or_else(|| VectorDbError::CollectionNotFound {
                    collection: collection.to_string(),
                })?;

        if vector.len() != coll.vector_size {
            return Err(VectorDbError::InvalidDimension {
                expected: coll.vector_size,
                actual: vector.len(),
            });
        }

        let id = id.into();
        coll.points.retain(|(existing, _)| *existing != id);
        coll.points.push((id, vector));
        Ok(())
    }

    pub fn point_count(&self, collection: &str) -> Option<usize> {
        self.collections
            .read()
            .ok()?
            .get(collection)
            .map(|c| c.points.len())
    }

    /// Makes every call fail as if the server were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), VectorDbError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(VectorDbError::ConnectionFailed {
                url: "mock://qdrant".to_string(),
                message: "connection refused".to_string(),
            });
        }
        Ok(())
    }
}

impl NeighborSearch for MockVectorDbClient {
    async fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: u64,
    ) -> Result<Vec<NeighborHit>, VectorDbError> {
        self.check_available()?;

        let collections = self
            .collections
            .read()
            .map_err(|_| VectorDbError::SearchFailed {
                collection: collection.to_string(),
                message: "lock poisoned".to_string(),
            })?;

        let coll =
            collections
                .get(collection)
                .ok_or_else(|| VectorDbError::CollectionNotFound {
                    collection: collection.to_string(),
                })?;

        if vector.len() != coll.vector_size {
            return Err(VectorDbError::InvalidDimension {
                expected: coll.vector_size,
                actual: vector.len(),
            });
        }

        let mut hits: Vec<NeighborHit> = coll
            .points
            .iter()
            .map(|(id, p)| NeighborHit::new(id.clone(), cosine_similarity(&vector, p)))
            .collect();

        hits.sort_by(|a, b| {
            b.weight
                .partial_cmp(&a.weight)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        hits.truncate(limit as usize);
        Ok(hits)
    }

    async fn is_ready(&self, collection: &str) -> Result<(), VectorDbError> {
        self.check_available()?;

        let exists = self
            .collections
            .read()
            .map(|c| c.contains_key(collection))
            .unwrap_or(false);

        if !exists {
            return Err(VectorDbError::CollectionNotFound {
                collection: collection.to_string(),
            });
        }
        Ok(())
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
