use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TruncateError {
    #[error("unsupported truncate strategy: {value}")]
    UnsupportedStrategy { value: String },

    #[error("token budget must be greater than zero")]
    InvalidBudget,

    #[error("invalid token offsets at token {index}: {reason}")]
    InvalidTokenOffsets { index: usize, reason: String },
}
