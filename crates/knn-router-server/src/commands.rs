//! Subcommand bodies.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;

use knn_router::config::Config;
use knn_router::embedding::{HfTokenizer, PromptTokenizer, TeiClient};
use knn_router::ingest::{Dataset, IngestReport, ingest_collection};
use knn_router::router::{KnnRouter, RouterSettings, resolve_max_sequence_length};
use knn_router::storage::ScoreStore;
use knn_router::vectordb::QdrantSearch;

use crate::gateway::{HandlerState, create_router_with_state};

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(1);

/// Opens the collaborators, builds the pipeline and serves until shutdown.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    config.validate()?;
    let addr: SocketAddr = config.socket_addr().parse()?;

    tracing::info!(
        bind_addr = %config.bind_addr,
        port = config.port,
        embed_url = %config.embed_url,
        qdrant_url = %config.qdrant_url,
        "knn-router starting"
    );

    let store = ScoreStore::open_collection(&config.scores_db_path, &config.collection)
        .with_context(|| {
            format!(
                "failed to open score store {}",
                config.scores_db_path.display()
            )
        })?;
    if store.is_empty() {
        tracing::warn!(collection = %config.collection, "Score store has no points");
    }

    let tei = TeiClient::new(&config.embed_url, config.request_timeout())?;

    let tokenizer = match &config.tokenizer_path {
        Some(path) => PromptTokenizer::Local(HfTokenizer::from_file(path)?),
        None => PromptTokenizer::Remote(tei.clone()),
    };
    let tokenizer_mode = tokenizer.describe();

    let search = QdrantSearch::new(&config.qdrant_url)?;

    let max_sequence_length = resolve_max_sequence_length(&tei, config.max_sequence_length)
        .await
        .context("failed to determine the token budget")?;

    let router = KnnRouter::new(
        tokenizer,
        tei,
        search,
        store,
        RouterSettings {
            collection: config.collection.clone(),
            top_k: config.top_k,
            max_sequence_length,
        },
    )?;

    let state = HandlerState::new(Arc::new(router), tokenizer_mode);
    let app = create_router_with_state(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, tokenizer = tokenizer_mode, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("knn-router shutdown complete");
    Ok(())
}

/// Builds the store at `db_path` from a combined dataset.
pub async fn generate(
    data_path: PathBuf,
    db_path: PathBuf,
    collection: String,
) -> anyhow::Result<IngestReport> {
    run_ingest(Dataset::combined(data_path), db_path, collection).await
}

/// Builds the store at `db_path` from a points dataset and a scores dataset.
pub async fn load(
    points_path: PathBuf,
    scores_path: PathBuf,
    db_path: PathBuf,
    collection: String,
) -> anyhow::Result<IngestReport> {
    run_ingest(Dataset::split(points_path, scores_path), db_path, collection).await
}

async fn run_ingest(
    dataset: Dataset,
    db_path: PathBuf,
    collection: String,
) -> anyhow::Result<IngestReport> {
    let report =
        tokio::task::spawn_blocking(move || ingest_collection(&dataset, &db_path, &collection))
            .await
            .context("ingestion task panicked")??;
    Ok(report)
}

/// Returns `0` when `GET /healthz` on the local port succeeds, `1` otherwise.
pub async fn health_check(port: u16) -> i32 {
    let url = format!("http://127.0.0.1:{}/healthz", port);

    let client = match reqwest::Client::builder()
        .timeout(HEALTH_CHECK_TIMEOUT)
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build health check client");
            return 1;
        }
    };

    match client.get(&url).send().await {
        Ok(res) if res.status().is_success() => 0,
        Ok(res) => {
            tracing::warn!(status = %res.status(), "Health check failed");
            1
        }
        Err(e) => {
            tracing::warn!(error = %e, "Health check request failed");
            1
        }
    }
}

/// The store path a subcommand writes to: the flag if given, else the config.
pub fn resolve_db_path(flag: Option<PathBuf>, config: &Config) -> PathBuf {
    flag.unwrap_or_else(|| config.scores_db_path.clone())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
