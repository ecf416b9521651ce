use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::constants::SCORE_DECIMALS;
use crate::storage::PointLookup;
use crate::vectordb::NeighborHit;

use super::error::AggregationError;
use super::types::{Hit, QueryResponse, ScoreEntry};

/// Blends the target scores of `hits` into one distribution.
///
/// Each target's score is `sum(score * weight) / sum(weight)` over all hits,
/// rounded half away from zero to two decimals. When the total weight is not
/// positive, the hits are returned with no scores.
pub fn aggregate<S>(hits: &[NeighborHit], store: &S) -> Result<QueryResponse, AggregationError>
where
    S: PointLookup + ?Sized,
{
    let mut weight_sum = 0.0f64;
    let mut weighted: BTreeMap<String, f64> = BTreeMap::new();
    let mut out_hits = Vec::with_capacity(hits.len());

    for hit in hits {
        let weight = f64::from(hit.weight);
        weight_sum += weight;

        let record = store.lookup(&hit.id)?;

        for entry in &record.scores {
            *weighted.entry(entry.target.clone()).or_insert(0.0) += f64::from(entry.score) * weight;
        }

        out_hits.push(Hit {
            id: hit.id.clone(),
            category: record.category,
            similarity: hit.weight,
        });
    }

    if !(weight_sum > 0.0 && weight_sum.is_finite()) {
        warn!(
            hits = out_hits.len(),
            weight_sum, "Total neighbor weight is not positive; returning no scores"
        );
        return Ok(QueryResponse {
            hits: out_hits,
            scores: Vec::new(),
        });
    }

    let scores: Vec<ScoreEntry> = weighted
        .into_iter()
        .map(|(target, sum)| ScoreEntry {
            target,
            score: normalize(sum, weight_sum),
        })
        .collect();

    debug!(
        hits = out_hits.len(),
        targets = scores.len(),
        weight_sum,
        "Aggregated neighbor scores"
    );

    Ok(QueryResponse {
        hits: out_hits,
        scores,
    })
}

/// `sum / weight_sum`, rounded half away from zero to [`SCORE_DECIMALS`] places.
pub fn normalize(sum: f64, weight_sum: f64) -> f32 {
    let scale = 10f64.powi(SCORE_DECIMALS);
    ((sum / weight_sum * scale).round() / scale) as f32
}
