//! Test server harness.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use knn_router::embedding::StubEmbedder;
use knn_router::router::{KnnRouter, RouterSettings};
use knn_router::storage::{PointLookup, ScoreStore};
use knn_router::vectordb::MockVectorDbClient;
use knn_router_server::gateway::{HandlerState, create_router_with_state};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

const STARTUP_WAIT_TIMEOUT_SECS: u64 = 5;
const STARTUP_POLL_INTERVAL_MS: u64 = 50;
pub const TEST_COLLECTION_NAME: &str = "main";
pub const TEST_VECTOR_SIZE: usize = 64;

pub struct TestServerConfig {
    pub top_k: u64,
    pub max_sequence_length: usize,
    pub store: ScoreStore,
    /// `(uid, text)` pairs indexed with the stub embedder.
    pub points: Vec<(String, String)>,
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub embedder: Arc<StubEmbedder>,
    pub search: Arc<MockVectorDbClient>,
    _server_handle: JoinHandle<()>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

pub async fn wait_for_server_ready(
    addr: SocketAddr,
    timeout: Duration,
    interval: Duration,
) -> Result<(), ServerStartupError> {
    let start = std::time::Instant::now();

    loop {
        if start.elapsed() > timeout {
            return Err(ServerStartupError::Timeout);
        }

        match tokio::net::TcpStream::connect(addr).await {
            Ok(_) => return Ok(()),
            Err(_) => {
                tokio::time::sleep(interval).await;
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServerStartupError {
    #[error("Server failed to start within timeout")]
    Timeout,
    #[error("Failed to bind to address: {0}")]
    BindError(#[from] std::io::Error),
    #[error("Server startup failed: {0}")]
    StartupFailed(String),
}

/// Spawns a server over a real score store file, with the stub embedder and
/// the in-memory vector database standing in for the network collaborators.
pub async fn spawn_test_server(config: TestServerConfig) -> Result<TestServer, ServerStartupError> {
    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
    let local_addr = listener.local_addr()?;

    let embedder = Arc::new(StubEmbedder::new(TEST_VECTOR_SIZE, 512));
    let search = Arc::new(MockVectorDbClient::new());
    search.ensure_collection(TEST_COLLECTION_NAME, TEST_VECTOR_SIZE);

    for (uid, text) in &config.points {
        if config.store.lookup(uid).is_err() {
            return Err(ServerStartupError::StartupFailed(format!(
                "indexed point '{uid}' is not in the score store"
            )));
        }
        search
            .upsert_point(TEST_COLLECTION_NAME, uid.clone(), embedder.vector_for(text))
            .map_err(|e| ServerStartupError::StartupFailed(e.to_string()))?;
    }

    let router = KnnRouter::new(
        embedder.clone(),
        embedder.clone(),
        search.clone(),
        config.store,
        RouterSettings {
            collection: TEST_COLLECTION_NAME.to_string(),
            top_k: config.top_k,
            max_sequence_length: config.max_sequence_length,
        },
    )
    .map_err(|e| ServerStartupError::StartupFailed(e.to_string()))?;

    let app = create_router_with_state(HandlerState::new(Arc::new(router), "remote"));

    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .unwrap();
    });

    wait_for_server_ready(
        local_addr,
        Duration::from_secs(STARTUP_WAIT_TIMEOUT_SECS),
        Duration::from_millis(STARTUP_POLL_INTERVAL_MS),
    )
    .await?;

    Ok(TestServer {
        addr: local_addr,
        embedder,
        search,
        _server_handle: server_handle,
        shutdown_tx: Some(shutdown_tx),
    })
}
