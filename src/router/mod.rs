//! The query pipeline: truncate, embed, search, aggregate.

pub mod error;


pub use error::RouterError;

use std::future::Future;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::embedding::{TextEmbedder, TextTokenizer};
use crate::scoring::{QueryResponse, aggregate};
use crate::storage::PointLookup;
use crate::truncate::{TruncateError, TruncateStrategy, truncate};
use crate::vectordb::NeighborSearch;

/// One query as received from a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    #[serde(alias = "text")]
    pub prompt: String,
    #[serde(default)]
    pub truncate_strategy: TruncateStrategy,
}

impl QueryRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            truncate_strategy: TruncateStrategy::default(),
        }
    }

    pub fn with_strategy(mut self, strategy: TruncateStrategy) -> Self {
        self.truncate_strategy = strategy;
        self
    }
}

/// Static pipeline settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterSettings {
    /// Collection searched and read from the score store.
    pub collection: String,
    /// Neighbors aggregated per query.
    pub top_k: u64,
    /// Token budget for prompts.
    pub max_sequence_length: usize,
}

/// Per-component readiness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Readiness {
    /// `Err` carries the vector backend's failure message.
    pub vector_db: Result<(), String>,
    /// Points available in the score store.
    pub score_store_points: usize,
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        self.vector_db.is_ok() && self.score_store_points > 0
    }
}

/// Answers queries with similarity-weighted target scores.
pub struct KnnRouter<T, E, V, S> {
    tokenizer: T,
    embedder: E,
    search: V,
    store: S,
    settings: RouterSettings,
}

impl<T, E, V, S> std::fmt::Debug for KnnRouter<T, E, V, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnnRouter")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl<T, E, V, S> KnnRouter<T, E, V, S>
where
    T: TextTokenizer,
    E: TextEmbedder,
    V: NeighborSearch,
    S: PointLookup,
{
    pub fn new(
        tokenizer: T,
        embedder: E,
        search: V,
        store: S,
        settings: RouterSettings,
    ) -> Result<Self, RouterError> {
        if settings.max_sequence_length == 0 {
            return Err(TruncateError::InvalidBudget.into());
        }

        info!(
            collection = %settings.collection,
            top_k = settings.top_k,
            max_sequence_length = settings.max_sequence_length,
            points = store.point_count(),
            "Router initialized"
        );

        Ok(Self {
            tokenizer,
            embedder,
            search,
            store,
            settings,
        })
    }

    pub fn settings(&self) -> &RouterSettings {
        &self.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs the full pipeline for one request.
    #[instrument(
        skip(self, request),
        fields(prompt_len = request.prompt.len(), strategy = %request.truncate_strategy)
    )]
    pub async fn query(&self, request: QueryRequest) -> Result<QueryResponse, RouterError> {
        if request.prompt.is_empty() {
            return Err(RouterError::EmptyPrompt);
        }

        let tokens = self.tokenizer.tokenize(&request.prompt).await?;
        let text = truncate(
            &request.prompt,
            &tokens,
            self.settings.max_sequence_length,
            request.truncate_strategy,
        )?;

        debug!(
            tokens = tokens.len(),
            truncated = (text.len() != request.prompt.len()),
            "Prompt prepared"
        );

        let vector = self.embedder.embed(&text, true).await?;
        let hits = self
            .search
            .search(&self.settings.collection, vector, self.settings.top_k)
            .await?;

        let response = aggregate(&hits, &self.store)?;

        debug!(
            hits = response.hits.len(),
            targets = response.scores.len(),
            "Query answered"
        );

        Ok(response)
    }

    /// Checks the vector backend and the score store.
    pub async fn readiness(&self) -> Readiness {
        let vector_db = self
            .search
            .is_ready(&self.settings.collection)
            .await
            .map_err(|e| e.to_string());

        Readiness {
            vector_db,
            score_store_points: self.store.point_count(),
        }
    }
}

/// Query operations exposed to the HTTP layer.
pub trait QueryService: Send + Sync + 'static {
    fn query(
        &self,
        request: QueryRequest,
    ) -> impl Future<Output = Result<QueryResponse, RouterError>> + Send;

    fn readiness(&self) -> impl Future<Output = Readiness> + Send;
}

impl<T, E, V, S> QueryService for KnnRouter<T, E, V, S>
where
    T: TextTokenizer + 'static,
    E: TextEmbedder + 'static,
    V: NeighborSearch + 'static,
    S: PointLookup + 'static,
{
    async fn query(&self, request: QueryRequest) -> Result<QueryResponse, RouterError> {
        KnnRouter::query(self, request).await
    }

    async fn readiness(&self) -> Readiness {
        KnnRouter::readiness(self).await
    }
}

/// Token budget to use: `configured` if set, otherwise the embedder's limit.
pub async fn resolve_max_sequence_length<E: TextEmbedder>(
    embedder: &E,
    configured: Option<usize>,
) -> Result<usize, RouterError> {
    let max = match configured {
        Some(max) => max,
        None => {
            let discovered = embedder.max_input_length().await?;
            info!(
                max_sequence_length = discovered,
                "Discovered token budget from embedding backend"
            );
            discovered
        }
    };

    if max == 0 {
        return Err(TruncateError::InvalidBudget.into());
    }
    Ok(max)
}
