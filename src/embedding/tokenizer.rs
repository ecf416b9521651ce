//! Local tokenization with the `tokenizers` crate.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokenizers::Tokenizer;
use tracing::info;

use super::{EmbeddingError, TextTokenizer};
use crate::truncate::TokenSpan;

/// Loads a tokenizer from a model directory or an explicit `tokenizer.json` path.
///
/// Truncation and padding configured in the file are switched off so every
/// token of the input is reported.
pub fn load_tokenizer(path: &Path) -> Result<Tokenizer, EmbeddingError> {
    let tokenizer_path: PathBuf = if path.is_dir() {
        path.join("tokenizer.json")
    } else {
        path.to_path_buf()
    };

    let load_err = |reason: String| EmbeddingError::TokenizerLoad {
        path: tokenizer_path.clone(),
        reason,
    };

    let mut tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|e| load_err(e.to_string()))?;
    tokenizer
        .with_truncation(None)
        .map_err(|e| load_err(format!("failed to disable truncation: {}", e)))?;
    tokenizer.with_padding(None);

    Ok(tokenizer)
}

/// [`TextTokenizer`] backed by a local `tokenizer.json`.
#[derive(Clone)]
pub struct HfTokenizer {
    inner: Arc<Tokenizer>,
}

impl std::fmt::Debug for HfTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HfTokenizer")
            .field("vocab_size", &self.inner.get_vocab_size(true))
            .finish()
    }
}

impl HfTokenizer {
    pub fn from_file(path: &Path) -> Result<Self, EmbeddingError> {
        let tokenizer = load_tokenizer(path)?;
        info!(
            path = %path.display(),
            vocab_size = tokenizer.get_vocab_size(true),
            "Loaded local tokenizer"
        );
        Ok(Self::new(tokenizer))
    }

    pub fn new(tokenizer: Tokenizer) -> Self {
        Self {
            inner: Arc::new(tokenizer),
        }
    }

    /// Byte spans of each token, special tokens excluded.
    pub fn spans(&self, text: &str) -> Result<Vec<TokenSpan>, EmbeddingError> {
        let encoding =
            self.inner
                .encode(text, false)
                .map_err(|e| EmbeddingError::TokenizationFailed {
                    reason: e.to_string(),
                })?;

        Ok(encoding
            .get_offsets()
            .iter()
            .map(|&(start, stop)| TokenSpan::new(start, stop))
            .collect())
    }
}

impl TextTokenizer for HfTokenizer {
    /// Encodes on the blocking pool.
    async fn tokenize(&self, text: &str) -> Result<Vec<TokenSpan>, EmbeddingError> {
        let tokenizer = self.clone();
        let text = text.to_string();

        tokio::task::spawn_blocking(move || tokenizer.spans(&text))
            .await
            .map_err(|e| EmbeddingError::TokenizationFailed {
                reason: format!("tokenizer task failed: {}", e),
            })?
    }
}
