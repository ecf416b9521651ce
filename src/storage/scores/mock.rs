use std::collections::HashMap;

use parking_lot::RwLock;

use super::PointLookup;
use crate::storage::error::{StoreError, StoreResult};
use crate::storage::model::{PointRecord, TargetScore};

/// In-memory [`PointLookup`] for tests.
#[derive(Debug, Default)]
pub struct MockScoreStore {
    records: RwLock<HashMap<String, PointRecord>>,
}

impl MockScoreStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, uid: impl Into<String>, record: PointRecord) {
        self.records.write().insert(uid.into(), record);
    }

    /// Inserts a record built from `(target, score)` pairs.
    pub fn insert_scores(&self, uid: &str, category: &str, scores: &[(&str, f32)]) {
        let record = PointRecord {
            category: category.to_string(),
            scores: scores
                .iter()
                .map(|(target, score)| TargetScore::new(*target, *score))
                .collect(),
        };
        self.insert(uid, record);
    }

    pub fn remove(&self, uid: &str) -> Option<PointRecord> {
        self.records.write().remove(uid)
    }
}

impl PointLookup for MockScoreStore {
    fn lookup(&self, uid: &str) -> StoreResult<PointRecord> {
        self.records
            .read()
            .get(uid)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                uid: uid.to_string(),
            })
    }

    fn point_count(&self) -> usize {
        self.records.read().len()
    }
}
