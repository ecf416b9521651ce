use thiserror::Error;

use crate::storage::StoreError;

#[derive(Debug, Error)]
pub enum AggregationError {
    /// A search hit has no record in the score store.
    #[error("point UID '{uid}' not found in score store")]
    MissingRecord { uid: String },

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for AggregationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { uid } => AggregationError::MissingRecord { uid },
            other => AggregationError::Store(other),
        }
    }
}
