use parking_lot::Mutex;

use super::{EmbeddingError, TextEmbedder, TextTokenizer};
use crate::truncate::TokenSpan;

/// Offline tokenizer + embedder for tests.
///
/// Tokens are whitespace-separated words. Embeddings are bag-of-words vectors
/// hashed into `dim` buckets and L2-normalized, so prompts that share words
/// land close together.
#[derive(Debug)]
pub struct StubEmbedder {
    dim: usize,
    max_input_length: usize,
    fail: bool,
    embedded: Mutex<Vec<String>>,
}

impl StubEmbedder {
    pub fn new(dim: usize, max_input_length: usize) -> Self {
        Self {
            dim,
            max_input_length,
            fail: false,
            embedded: Mutex::new(Vec::new()),
        }
    }

    /// A stub whose every call fails with a 503 from the backend.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(8, 512)
        }
    }

    /// Texts passed to [`TextEmbedder::embed`], in call order.
    pub fn embedded_texts(&self) -> Vec<String> {
        self.embedded.lock().clone()
    }

    /// Whitespace word spans of `text`.
    pub fn word_spans(text: &str) -> Vec<TokenSpan> {
        let mut spans = Vec::new();
        let mut start = None;

        for (idx, ch) in text.char_indices() {
            match (ch.is_whitespace(), start) {
                (false, None) => start = Some(idx),
                (true, Some(s)) => {
                    spans.push(TokenSpan::new(s, idx));
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = start {
            spans.push(TokenSpan::new(s, text.len()));
        }

        spans
    }

    /// Deterministic embedding of `text`.
    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dim.max(1)];
        for word in text.split_whitespace() {
            let bucket = fnv1a(word.to_lowercase().as_bytes()) as usize % vector.len();
            vector[bucket] += 1.0;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }

    fn check(&self, endpoint: &str) -> Result<(), EmbeddingError> {
        if self.fail {
            return Err(EmbeddingError::RequestFailed {
                endpoint: endpoint.to_string(),
                status: 503,
                body: "stub backend unavailable".to_string(),
            });
        }
        Ok(())
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, &b| {
        (hash ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
    })
}

impl TextTokenizer for StubEmbedder {
    async fn tokenize(&self, text: &str) -> Result<Vec<TokenSpan>, EmbeddingError> {
        self.check("stub/tokenize")?;
        Ok(Self::word_spans(text))
    }
}

impl TextEmbedder for StubEmbedder {
    async fn embed(&self, text: &str, _truncate: bool) -> Result<Vec<f32>, EmbeddingError> {
        self.check("stub/embed")?;
        self.embedded.lock().push(text.to_string());
        Ok(self.vector_for(text))
    }

    async fn max_input_length(&self) -> Result<usize, EmbeddingError> {
        self.check("stub/info")?;
        Ok(self.max_input_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_spans() {
        assert_eq!(
            StubEmbedder::word_spans("  ab  c "),
            vec![TokenSpan::new(2, 4), TokenSpan::new(6, 7)]
        );
    }

    #[test]
    fn test_vector_is_normalized_and_deterministic() {
        let stub = StubEmbedder::new(16, 512);
        let a = stub.vector_for("hello world");
        let b = stub.vector_for("Hello World");

        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_embed_records_text() {
        let stub = StubEmbedder::new(8, 4);
        stub.embed("some prompt", true).await.expect("embed");

        assert_eq!(stub.embedded_texts(), vec!["some prompt".to_string()]);
        assert_eq!(stub.max_input_length().await.expect("info"), 4);
    }

    #[tokio::test]
    async fn test_failing_stub() {
        let stub = StubEmbedder::failing();
        assert!(matches!(
            stub.embed("x", true).await,
            Err(EmbeddingError::RequestFailed { status: 503, .. })
        ));
        assert!(stub.tokenize("x").await.is_err());
    }
}
