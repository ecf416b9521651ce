use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{debug, info, instrument, warn};

use crate::gateway::error::GatewayError;
use crate::gateway::state::HandlerState;
use knn_router::constants::{KNN_ROUTER_STATUS_HEADER, KNN_ROUTER_STATUS_READY};
use knn_router::router::{QueryRequest, QueryService};

#[instrument(skip(state, payload), fields(strategy = tracing::field::Empty))]
pub async fn query_handler<Q: QueryService>(
    State(state): State<HandlerState<Q>>,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Response, GatewayError> {
    let Json(value) = payload.map_err(|e| GatewayError::InvalidRequest(e.body_text()))?;
    let request = parse_request(value)?;
    tracing::Span::current().record(
        "strategy",
        tracing::field::display(request.truncate_strategy),
    );

    debug!(prompt_len = request.prompt.len(), "Processing query");

    let response = state.router.query(request).await.map_err(|e| {
        let err = GatewayError::from(e);
        warn!(error = %err, "Query failed");
        err
    })?;

    info!(
        hits = response.hits.len(),
        targets = response.scores.len(),
        "Query served"
    );

    let mut headers = HeaderMap::new();
    headers.insert(
        KNN_ROUTER_STATUS_HEADER,
        HeaderValue::from_static(KNN_ROUTER_STATUS_READY),
    );

    Ok((StatusCode::OK, headers, Json(response)).into_response())
}

pub(crate) fn parse_request(value: serde_json::Value) -> Result<QueryRequest, GatewayError> {
    let request: QueryRequest = serde_json::from_value(value)
        .map_err(|e| GatewayError::InvalidRequest(format!("Invalid request schema: {}", e)))?;

    if request.prompt.is_empty() {
        return Err(GatewayError::InvalidRequest(
            "prompt must not be empty".to_string(),
        ));
    }

    Ok(request)
}
