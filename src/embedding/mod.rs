//! Tokenizer and embedder backends.
//!
//! - [`TeiClient`] talks to a text-embeddings-inference server over HTTP.
//! - [`HfTokenizer`] tokenizes locally from a `tokenizer.json`.
//! - `StubEmbedder` (tests / `mock` feature) is deterministic and offline.

mod error;
#[cfg(any(test, feature = "mock"))]
mod stub;
pub mod tei;
pub mod tokenizer;

pub use error::EmbeddingError;
#[cfg(any(test, feature = "mock"))]
pub use stub::StubEmbedder;
pub use tei::{TeiClient, TeiInfo};
pub use tokenizer::{HfTokenizer, load_tokenizer};

use std::future::Future;
use std::sync::Arc;

use crate::truncate::TokenSpan;

/// Produces token byte spans for a prompt.
pub trait TextTokenizer: Send + Sync {
    /// Tokenizes `text` without special tokens.
    fn tokenize(
        &self,
        text: &str,
    ) -> impl Future<Output = Result<Vec<TokenSpan>, EmbeddingError>> + Send;
}

/// Produces a dense vector for a prompt.
pub trait TextEmbedder: Send + Sync {
    /// Embeds `text`; with `truncate`, the backend clips inputs over its limit.
    fn embed(
        &self,
        text: &str,
        truncate: bool,
    ) -> impl Future<Output = Result<Vec<f32>, EmbeddingError>> + Send;

    /// Largest input, in tokens, the backend accepts.
    fn max_input_length(&self) -> impl Future<Output = Result<usize, EmbeddingError>> + Send;
}

impl<T: TextTokenizer> TextTokenizer for Arc<T> {
    fn tokenize(
        &self,
        text: &str,
    ) -> impl Future<Output = Result<Vec<TokenSpan>, EmbeddingError>> + Send {
        (**self).tokenize(text)
    }
}

impl<E: TextEmbedder> TextEmbedder for Arc<E> {
    fn embed(
        &self,
        text: &str,
        truncate: bool,
    ) -> impl Future<Output = Result<Vec<f32>, EmbeddingError>> + Send {
        (**self).embed(text, truncate)
    }

    fn max_input_length(&self) -> impl Future<Output = Result<usize, EmbeddingError>> + Send {
        (**self).max_input_length()
    }
}

/// Tokenizer chosen at startup: the embedding server or a local file.
#[derive(Debug, Clone)]
pub enum PromptTokenizer {
    Remote(TeiClient),
    Local(HfTokenizer),
}

impl PromptTokenizer {
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Remote(_) => "remote",
            Self::Local(_) => "local",
        }
    }
}

impl TextTokenizer for PromptTokenizer {
    async fn tokenize(&self, text: &str) -> Result<Vec<TokenSpan>, EmbeddingError> {
        match self {
            Self::Remote(client) => client.tokenize(text).await,
            Self::Local(tokenizer) => tokenizer.tokenize(text).await,
        }
    }
}
