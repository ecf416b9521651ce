use thiserror::Error;

use crate::embedding::EmbeddingError;
use crate::scoring::AggregationError;
use crate::truncate::TruncateError;
use crate::vectordb::VectorDbError;

/// Errors from one pass of the query pipeline.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("prompt must not be empty")]
    EmptyPrompt,

    #[error(transparent)]
    Truncate(#[from] TruncateError),

    #[error("embedding backend error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("vector search error: {0}")]
    VectorDb(#[from] VectorDbError),

    #[error(transparent)]
    Aggregation(#[from] AggregationError),
}
