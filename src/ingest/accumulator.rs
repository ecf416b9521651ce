use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use super::error::{IngestError, IngestResult};
use super::rows::{CombinedRow, PointRow, ScoreRow};
use crate::storage::{PointRecord, TargetScore};

/// Folds dataset rows into one [`PointRecord`] per UID.
///
/// Lives only for one ingestion run; [`commit`](super::commit) consumes it.
#[derive(Debug, Default)]
pub struct PointAccumulator {
    points: BTreeMap<String, PointRecord>,
    scores: usize,
}

impl PointAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `uid` with `category`. Re-declaring with the same category is a no-op.
    pub fn declare(&mut self, uid: &str, category: &str) -> IngestResult<&mut PointRecord> {
        match self.points.entry(uid.to_string()) {
            Entry::Vacant(slot) => Ok(slot.insert(PointRecord::new(category))),
            Entry::Occupied(slot) => {
                let record = slot.into_mut();
                if record.category != category {
                    return Err(IngestError::ConflictingCategory {
                        uid: uid.to_string(),
                        expected: record.category.clone(),
                        actual: category.to_string(),
                    });
                }
                Ok(record)
            }
        }
    }

    /// Appends a score to an already declared point.
    pub fn add_score(&mut self, uid: &str, target: &str, score: f32) -> IngestResult<()> {
        let record = self
            .points
            .get_mut(uid)
            .ok_or_else(|| IngestError::UndeclaredPoint {
                uid: uid.to_string(),
            })?;

        record.scores.push(TargetScore::new(target, score));
        self.scores += 1;
        Ok(())
    }

    /// The first row for a UID fixes its category; later rows must agree.
    pub fn add_combined(&mut self, row: CombinedRow) -> IngestResult<()> {
        self.declare(&row.uid, &row.category)?
            .scores
            .push(TargetScore::new(row.target, row.score));
        self.scores += 1;
        Ok(())
    }

    pub fn add_point(&mut self, row: PointRow) -> IngestResult<()> {
        self.declare(&row.point_uid, &row.category).map(|_| ())
    }

    pub fn add_score_row(&mut self, row: ScoreRow) -> IngestResult<()> {
        self.add_score(&row.point_uid, &row.target, row.score)
    }

    pub fn get(&self, uid: &str) -> Option<&PointRecord> {
        self.points.get(uid)
    }

    /// Number of distinct points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of `(target, score)` pairs across all points.
    pub fn score_count(&self) -> usize {
        self.scores
    }

    pub fn records(&self) -> impl Iterator<Item = (&str, &PointRecord)> {
        self.points.iter().map(|(uid, record)| (uid.as_str(), record))
    }
}
