//! knn-router library crate (used by the server binary and integration tests).
//!
//! A prompt is routed by looking at its nearest reference points: every point
//! carries a score per target, and the scores of the neighbors are blended by
//! search similarity.
//!
//! # Public API Surface
//!
//! ## Query Pipeline
//! - [`KnnRouter`], [`QueryRequest`], [`QueryService`] - truncate, embed, search, aggregate
//! - [`truncate()`], [`TruncateStrategy`], [`TokenSpan`] - token-budget truncation
//! - [`aggregate`], [`QueryResponse`] - similarity-weighted score blending
//!
//! ## Score Store
//! - [`ScoreStore`] (read-only, mmap) and [`ScoreStoreWriter`] (exclusive, transactional)
//! - [`PointRecord`], [`TargetScore`] - rkyv storage format
//!
//! ## Ingestion
//! - [`ingest()`], [`Dataset`], [`PointAccumulator`] - combined or split JSONL datasets
//!
//! ## Collaborators
//! - [`TeiClient`], [`HfTokenizer`] - tokenization and embeddings
//! - [`QdrantSearch`] - nearest-neighbor search
//!
//! ## Test/Mock Support
//! Mock implementations are available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod config;
pub mod constants;
pub mod embedding;
pub mod ingest;
pub mod router;
pub mod scoring;
pub mod storage;
pub mod truncate;
pub mod vectordb;

pub use config::{Config, ConfigError};
pub use embedding::{
    EmbeddingError, HfTokenizer, PromptTokenizer, TeiClient, TextEmbedder, TextTokenizer,
};
pub use ingest::{
    Dataset, IngestError, IngestReport, PointAccumulator, ingest, ingest_collection,
};
pub use router::{
    KnnRouter, QueryRequest, QueryService, Readiness, RouterError, RouterSettings,
    resolve_max_sequence_length,
};
pub use scoring::{AggregationError, Hit, QueryResponse, ScoreEntry, aggregate};
pub use storage::{
    PointLookup, PointRecord, ScoreStore, ScoreStoreWriter, StoreError, TargetScore,
};
pub use truncate::{TokenSpan, TruncateError, TruncateStrategy, truncate};
pub use vectordb::{NeighborHit, NeighborSearch, QdrantSearch, VectorDbError};

#[cfg(any(test, feature = "mock"))]
pub use embedding::StubEmbedder;
#[cfg(any(test, feature = "mock"))]
pub use storage::MockScoreStore;
#[cfg(any(test, feature = "mock"))]
pub use vectordb::MockVectorDbClient;
