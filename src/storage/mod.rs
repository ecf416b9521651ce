//! Storage: the snapshot KV engine and the score store built on it.

pub mod error;
pub mod kv;
pub mod mmap;
mod model;
pub mod scores;

pub use error::{StoreError, StoreResult};
pub use kv::{KvReader, KvWriter, WriteTxn};
pub use model::{ArchivedPointRecord, ArchivedTargetScore, PointRecord, TargetScore};
#[cfg(any(test, feature = "mock"))]
pub use scores::MockScoreStore;
pub use scores::{PointLookup, ScoreStore, ScoreStoreWriter, ScoreTxn};
