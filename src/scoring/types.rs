use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A neighbor as reported to the caller, in search rank order.
pub struct Hit {
    /// Point UID.
    pub id: String,
    /// Category recorded for the point.
    pub category: String,
    /// Search similarity (higher is closer).
    pub similarity: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Similarity-weighted score for one target, rounded to two decimals.
pub struct ScoreEntry {
    pub target: String,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
/// Result of one query.
pub struct QueryResponse {
    pub hits: Vec<Hit>,
    /// One entry per distinct target, sorted by target.
    pub scores: Vec<ScoreEntry>,
}

impl QueryResponse {
    /// Score for `target`, if any neighbor carried one.
    pub fn score_for(&self, target: &str) -> Option<f32> {
        self.scores
            .iter()
            .find(|entry| entry.target == target)
            .map(|entry| entry.score)
    }
}
