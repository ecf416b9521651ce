//! Score store record types.

use rkyv::rancor::Error as RkyvError;
use rkyv::util::AlignedVec;
use rkyv::{Archive, Deserialize, Serialize};

use crate::storage::error::{StoreError, StoreResult};

/// One `(target, score)` pair attached to a point.
#[derive(Archive, Deserialize, Serialize, Debug, PartialEq, Clone)]
pub struct TargetScore {
    /// Target identifier (e.g. a model name).
    pub target: String,
    /// Raw score for this target on the point's prompt.
    pub score: f32,
}

impl TargetScore {
    pub fn new(target: impl Into<String>, score: f32) -> Self {
        Self {
            target: target.into(),
            score,
        }
    }
}

/// Value stored per point UID.
///
/// `scores` keeps the order the ingestion input supplied, so repeated runs over
/// the same dataset produce identical bytes.
///
/// # Example
/// ```rust
/// use knn_router::{PointRecord, TargetScore};
///
/// let record = PointRecord {
///     category: "coding".to_string(),
///     scores: vec![TargetScore::new("gpt-4", 0.9)],
/// };
/// let bytes = record.to_bytes().unwrap();
/// assert_eq!(PointRecord::from_bytes("a", &bytes).unwrap(), record);
/// ```
#[derive(Archive, Deserialize, Serialize, Debug, PartialEq, Clone, Default)]
pub struct PointRecord {
    /// Category label shared by every row of the point.
    pub category: String,
    /// Target scores in ingestion order.
    pub scores: Vec<TargetScore>,
}

impl PointRecord {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            scores: Vec::new(),
        }
    }

    /// Serializes the record as an rkyv archive.
    pub fn to_bytes(&self) -> StoreResult<Vec<u8>> {
        rkyv::to_bytes::<RkyvError>(self)
            .map(|bytes| bytes.into_vec())
            .map_err(|e| StoreError::Serialization(format!("{:?}", e)))
    }

    /// Decodes a record previously written by [`PointRecord::to_bytes`].
    ///
    /// Values sit at arbitrary offsets inside the store file, so the bytes are
    /// copied into an aligned buffer before validation.
    pub fn from_bytes(uid: &str, bytes: &[u8]) -> StoreResult<Self> {
        let mut aligned = AlignedVec::<16>::with_capacity(bytes.len());
        aligned.extend_from_slice(bytes);

        rkyv::from_bytes::<PointRecord, RkyvError>(&aligned).map_err(|e| StoreError::Decode {
            uid: uid.to_string(),
            message: format!("{:?}", e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rkyv::access;

    fn sample() -> PointRecord {
        PointRecord {
            category: "math".to_string(),
            scores: vec![
                TargetScore::new("model-b", 0.25),
                TargetScore::new("model-a", 1.0),
            ],
        }
    }

    #[test]
    fn test_decode_preserves_score_order() {
        let record = sample();
        let bytes = record.to_bytes().expect("serialization should succeed");

        let decoded = PointRecord::from_bytes("p1", &bytes).expect("decode should succeed");

        assert_eq!(decoded, record);
        assert_eq!(decoded.scores[0].target, "model-b");
    }

    #[test]
    fn test_decode_from_unaligned_slice() {
        let bytes = sample().to_bytes().expect("serialization should succeed");
        let mut shifted = vec![0u8; 1];
        shifted.extend_from_slice(&bytes);

        let decoded = PointRecord::from_bytes("p1", &shifted[1..]).expect("decode should succeed");
        assert_eq!(decoded, sample());
    }

    #[test]
    fn test_decode_garbage_names_uid() {
        let err = PointRecord::from_bytes("broken-uid", &[1, 2, 3]).unwrap_err();

        assert!(matches!(err, StoreError::Decode { ref uid, .. } if uid == "broken-uid"));
        assert!(err.to_string().contains("broken-uid"));
    }

    #[test]
    fn test_archived_access() {
        let bytes = rkyv::to_bytes::<RkyvError>(&sample()).expect("serialization should succeed");
        let archived =
            access::<ArchivedPointRecord, RkyvError>(&bytes).expect("archive access should succeed");

        assert_eq!(archived.category.as_str(), "math");
        assert_eq!(archived.scores[1].score.to_native(), 1.0);
    }

    #[test]
    fn test_same_record_same_bytes() {
        assert_eq!(
            sample().to_bytes().expect("serialize"),
            sample().to_bytes().expect("serialize")
        );
    }
}
