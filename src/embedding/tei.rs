//! HTTP client for a text-embeddings-inference server.

use std::time::Duration;

use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{EmbeddingError, TextEmbedder, TextTokenizer};
use crate::truncate::TokenSpan;

const TOKENIZE_PATH: &str = "/tokenize";
const EMBED_PATH: &str = "/embed";
const INFO_PATH: &str = "/info";

/// Server metadata from `GET /info`. Only the fields used here are decoded.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TeiInfo {
    #[serde(default)]
    pub model_id: Option<String>,
    pub max_input_length: usize,
}

#[derive(Serialize)]
struct TokenizeRequest<'a> {
    inputs: &'a str,
    add_special_tokens: bool,
}

#[derive(Deserialize)]
struct TeiToken {
    #[serde(default)]
    start: Option<usize>,
    #[serde(default)]
    stop: Option<usize>,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    inputs: &'a str,
    truncate: bool,
}

/// Client for the `/tokenize`, `/embed` and `/info` routes.
#[derive(Debug, Clone)]
pub struct TeiClient {
    http: Client,
    base_url: String,
}

impl TeiClient {
    /// Creates a client for `base_url` with a per-request `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, EmbeddingError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EmbeddingError::InvalidConfig {
                reason: e.to_string(),
            })?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Returns byte spans for every token of `text`.
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    pub async fn tokenize(&self, text: &str) -> Result<Vec<TokenSpan>, EmbeddingError> {
        let endpoint = self.endpoint(TOKENIZE_PATH);
        let body = TokenizeRequest {
            inputs: text,
            add_special_tokens: false,
        };

        let response = self.send(self.http.post(&endpoint).json(&body), &endpoint).await?;
        let batches: Vec<Vec<TeiToken>> = decode(response, &endpoint).await?;
        let spans = parse_token_spans(batches, &endpoint)?;

        debug!(tokens = spans.len(), "Tokenized prompt");
        Ok(spans)
    }

    /// Embeds `text` as a single input.
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    pub async fn embed(&self, text: &str, truncate: bool) -> Result<Vec<f32>, EmbeddingError> {
        let endpoint = self.endpoint(EMBED_PATH);
        let body = EmbedRequest {
            inputs: text,
            truncate,
        };

        let response = self.send(self.http.post(&endpoint).json(&body), &endpoint).await?;
        let vectors: Vec<Vec<f32>> = decode(response, &endpoint).await?;

        vectors
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::InvalidResponse {
                endpoint,
                reason: "no embeddings returned".to_string(),
            })
    }

    pub async fn info(&self) -> Result<TeiInfo, EmbeddingError> {
        let endpoint = self.endpoint(INFO_PATH);
        let response = self.send(self.http.get(&endpoint), &endpoint).await?;
        decode(response, &endpoint).await
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        endpoint: &str,
    ) -> Result<Response, EmbeddingError> {
        let response = request
            .send()
            .await
            .map_err(|e| EmbeddingError::Transport {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::RequestFailed {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }
}

async fn decode<T: serde::de::DeserializeOwned>(
    response: Response,
    endpoint: &str,
) -> Result<T, EmbeddingError> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| EmbeddingError::Transport {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;

    serde_json::from_slice(&bytes).map_err(|e| EmbeddingError::InvalidResponse {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })
}

fn parse_token_spans(
    batches: Vec<Vec<TeiToken>>,
    endpoint: &str,
) -> Result<Vec<TokenSpan>, EmbeddingError> {
    let tokens = batches
        .into_iter()
        .next()
        .ok_or_else(|| EmbeddingError::InvalidResponse {
            endpoint: endpoint.to_string(),
            reason: "no token batch returned".to_string(),
        })?;

    tokens
        .into_iter()
        .enumerate()
        .map(|(idx, token)| match (token.start, token.stop) {
            (Some(start), Some(stop)) => Ok(TokenSpan::new(start, stop)),
            _ => Err(EmbeddingError::InvalidResponse {
                endpoint: endpoint.to_string(),
                reason: format!("token {} has no offsets", idx),
            }),
        })
        .collect()
}

impl TextTokenizer for TeiClient {
    async fn tokenize(&self, text: &str) -> Result<Vec<TokenSpan>, EmbeddingError> {
        self.tokenize(text).await
    }
}

impl TextEmbedder for TeiClient {
    async fn embed(&self, text: &str, truncate: bool) -> Result<Vec<f32>, EmbeddingError> {
        self.embed(text, truncate).await
    }

    async fn max_input_length(&self) -> Result<usize, EmbeddingError> {
        Ok(self.info().await?.max_input_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(json: serde_json::Value) -> Vec<Vec<TeiToken>> {
        serde_json::from_value(json).expect("token json")
    }

    #[test]
    fn test_parse_token_spans() {
        let batches = tokens(serde_json::json!([[
            {"id": 1, "text": "hello", "special": false, "start": 0, "stop": 5},
            {"id": 2, "text": "world", "special": false, "start": 6, "stop": 11}
        ]]));

        let spans = parse_token_spans(batches, "http://tei/tokenize").expect("spans");
        assert_eq!(spans, vec![TokenSpan::new(0, 5), TokenSpan::new(6, 11)]);
    }

    #[test]
    fn test_parse_token_spans_missing_offsets() {
        let batches = tokens(serde_json::json!([[
            {"id": 1, "text": "hello", "special": false, "start": 0, "stop": 5},
            {"id": 2, "text": "[SEP]", "special": true, "start": null, "stop": null}
        ]]));

        let err = parse_token_spans(batches, "http://tei/tokenize").unwrap_err();
        assert!(err.to_string().contains("token 1 has no offsets"));
    }

    #[test]
    fn test_parse_token_spans_empty_batch_list() {
        let err = parse_token_spans(Vec::new(), "http://tei/tokenize").unwrap_err();
        assert!(matches!(err, EmbeddingError::InvalidResponse { .. }));
    }

    #[test]
    fn test_info_ignores_unknown_fields() {
        let info: TeiInfo = serde_json::from_value(serde_json::json!({
            "model_id": "BAAI/bge-small-en-v1.5",
            "model_type": {"embedding": {"pooling": "cls"}},
            "max_input_length": 512,
            "max_batch_tokens": 16384
        }))
        .expect("info json");

        assert_eq!(info.max_input_length, 512);
        assert_eq!(info.model_id.as_deref(), Some("BAAI/bge-small-en-v1.5"));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = TeiClient::new("http://localhost:8889/", Duration::from_secs(1))
            .expect("client should build");
        assert_eq!(client.base_url(), "http://localhost:8889");
        assert_eq!(client.endpoint(EMBED_PATH), "http://localhost:8889/embed");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        let client = TeiClient::new("http://127.0.0.1:1", Duration::from_millis(500))
            .expect("client should build");

        let err = client.embed("hello", true).await.unwrap_err();
        assert!(matches!(err, EmbeddingError::Transport { .. }));
    }
}
