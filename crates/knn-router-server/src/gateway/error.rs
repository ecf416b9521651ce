use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use knn_router::constants::KNN_ROUTER_STATUS_HEADER;
use knn_router::router::RouterError;
use knn_router::scoring::AggregationError;
use knn_router::truncate::TruncateError;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("tokenization or embedding failed: {0}")]
    EmbeddingFailed(String),

    #[error("vector search failed: {0}")]
    SearchFailed(String),

    #[error("{0}")]
    MissingRecord(String),

    #[error("storage error: {0}")]
    StorageError(String),
}

impl From<RouterError> for GatewayError {
    fn from(err: RouterError) -> Self {
        match err {
            RouterError::Truncate(e @ TruncateError::InvalidTokenOffsets { .. }) => {
                GatewayError::EmbeddingFailed(e.to_string())
            }
            RouterError::EmptyPrompt | RouterError::Truncate(_) => {
                GatewayError::InvalidRequest(err.to_string())
            }
            RouterError::Embedding(e) => GatewayError::EmbeddingFailed(e.to_string()),
            RouterError::VectorDb(e) => GatewayError::SearchFailed(e.to_string()),
            RouterError::Aggregation(e @ AggregationError::MissingRecord { .. }) => {
                GatewayError::MissingRecord(e.to_string())
            }
            RouterError::Aggregation(e) => GatewayError::StorageError(e.to_string()),
        }
    }
}

#[derive(serde::Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, router_status) = match &self {
            GatewayError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            GatewayError::EmbeddingFailed(_) => (StatusCode::BAD_GATEWAY, "embedding_error"),
            GatewayError::SearchFailed(_) => (StatusCode::BAD_GATEWAY, "search_error"),
            GatewayError::MissingRecord(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "missing_record")
            }
            GatewayError::StorageError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
        };

        let mut headers = HeaderMap::new();
        headers.insert(
            KNN_ROUTER_STATUS_HEADER,
            HeaderValue::from_static(router_status),
        );

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: status.as_u16(),
        });

        (status, headers, body).into_response()
    }
}
