//! Similarity-weighted score aggregation over nearest neighbors.

pub mod aggregator;
pub mod error;
pub mod types;


pub use aggregator::{aggregate, normalize};
pub use error::AggregationError;
pub use types::{Hit, QueryResponse, ScoreEntry};
