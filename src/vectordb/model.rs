use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::{PointId, ScoredPoint};
use serde::Serialize;

use super::VectorDbError;

/// One ranked search result. `weight` is a similarity: higher is closer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeighborHit {
    pub id: String,
    pub weight: f32,
}

impl NeighborHit {
    pub fn new(id: impl Into<String>, weight: f32) -> Self {
        Self {
            id: id.into(),
            weight,
        }
    }

    /// Converts a Qdrant hit; the id becomes the score store key.
    pub fn from_scored_point(point: ScoredPoint, collection: &str) -> Result<Self, VectorDbError> {
        let id = point
            .id
            .as_ref()
            .and_then(point_id_to_string)
            .ok_or_else(|| VectorDbError::MissingPointId {
                collection: collection.to_string(),
            })?;

        Ok(Self {
            id,
            weight: point.score,
        })
    }
}

/// UUID ids keep their string form; numeric ids become decimal strings.
pub fn point_id_to_string(id: &PointId) -> Option<String> {
    match id.point_id_options.as_ref()? {
        PointIdOptions::Uuid(uuid) => Some(uuid.clone()),
        PointIdOptions::Num(num) => Some(num.to_string()),
    }
}
