//! HTTP gateway (Axum) for the query pipeline.

pub mod error;
pub mod handler;
pub mod state;


use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::HeaderValue},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

pub use handler::query_handler;
pub use state::HandlerState;

use knn_router::constants::{
    KNN_ROUTER_STATUS_ERROR, KNN_ROUTER_STATUS_HEADER, KNN_ROUTER_STATUS_HEALTHY,
    KNN_ROUTER_STATUS_NOT_READY, KNN_ROUTER_STATUS_READY,
};
use knn_router::router::QueryService;

pub fn create_router_with_state<Q: QueryService>(state: HandlerState<Q>) -> Router {
    Router::new()
        .route("/", post(query_handler::<Q>))
        .route("/v1/query", post(query_handler::<Q>))
        .route("/healthz", get(health_handler))
        .route("/ready", get(ready_handler::<Q>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(serde::Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(serde::Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    pub components: ComponentStatus,
}

#[derive(serde::Serialize)]
pub struct ComponentStatus {
    pub http: &'static str,
    pub vectordb: &'static str,
    pub score_store: &'static str,
    pub score_store_points: usize,
    pub tokenizer_mode: &'static str,
}

#[tracing::instrument]
pub async fn health_handler() -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        KNN_ROUTER_STATUS_HEADER,
        HeaderValue::from_static(KNN_ROUTER_STATUS_HEALTHY),
    );

    (
        StatusCode::OK,
        headers,
        Json(HealthResponse { status: "ok" }),
    )
        .into_response()
}

#[tracing::instrument(skip(state))]
pub async fn ready_handler<Q: QueryService>(State(state): State<HandlerState<Q>>) -> Response {
    let readiness = state.router.readiness().await;

    let vectordb_status = match &readiness.vector_db {
        Ok(()) => KNN_ROUTER_STATUS_READY,
        Err(reason) => {
            tracing::warn!(%reason, "Vector database not ready");
            KNN_ROUTER_STATUS_ERROR
        }
    };

    let score_store_status = if readiness.score_store_points > 0 {
        KNN_ROUTER_STATUS_READY
    } else {
        "empty"
    };

    let components = ComponentStatus {
        http: KNN_ROUTER_STATUS_READY,
        vectordb: vectordb_status,
        score_store: score_store_status,
        score_store_points: readiness.score_store_points,
        tokenizer_mode: state.tokenizer_mode,
    };

    let (status_code, status_msg, header) = if readiness.is_ready() {
        (StatusCode::OK, "ok", KNN_ROUTER_STATUS_READY)
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            "pending",
            KNN_ROUTER_STATUS_NOT_READY,
        )
    };

    let mut headers = HeaderMap::new();
    headers.insert(KNN_ROUTER_STATUS_HEADER, HeaderValue::from_static(header));

    (
        status_code,
        headers,
        Json(ReadyResponse {
            status: status_msg,
            components,
        }),
    )
        .into_response()
}
