mod common;

use std::io::Write;
use std::path::Path;

use common::harness::{TestServerConfig, spawn_test_server};
use common::http_client::{TestClient, TestClientError};
use knn_router::ingest::{Dataset, ingest};
use knn_router::storage::ScoreStore;
use tempfile::TempDir;

fn write_dataset(path: &Path, lines: &[&str]) {
    let mut file = std::fs::File::create(path).unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
}

fn build_store(dir: &TempDir) -> ScoreStore {
    let data = dir.path().join("combined.jsonl");
    write_dataset(
        &data,
        &[
            r#"{"uid": "a", "category": "c1", "target": "t1", "score": 0.5}"#,
            r#"{"uid": "a", "category": "c1", "target": "t2", "score": 1.0}"#,
            r#"{"uid": "b", "category": "c2", "target": "t1", "score": 1.0}"#,
        ],
    );

    let db = dir.path().join("scores.db");
    ingest(&Dataset::combined(&data), &db).unwrap();
    ScoreStore::open(&db).unwrap()
}

fn points() -> Vec<(String, String)> {
    vec![
        ("a".to_string(), "sort a vector in rust".to_string()),
        ("b".to_string(), "sourdough starter feeding".to_string()),
    ]
}

#[tokio::test]
async fn test_query_against_ingested_store() {
    let dir = TempDir::new().unwrap();
    let server = spawn_test_server(TestServerConfig {
        top_k: 1,
        max_sequence_length: 512,
        store: build_store(&dir),
        points: points(),
    })
    .await
    .unwrap();
    let client = TestClient::new(server.url());

    let response = client
        .query(serde_json::json!({"prompt": "sort a vector in rust"}))
        .await
        .unwrap();

    assert_eq!(response.hits.len(), 1);
    assert_eq!(response.hits[0].id, "a");
    assert_eq!(response.hits[0].category, "c1");
    assert_eq!(response.score_for("t1"), Some(0.5));
    assert_eq!(response.score_for("t2"), Some(1.0));

    server.shutdown().await;
}

#[tokio::test]
async fn test_scores_cover_every_neighbor_target() {
    let dir = TempDir::new().unwrap();
    let server = spawn_test_server(TestServerConfig {
        top_k: 2,
        max_sequence_length: 512,
        store: build_store(&dir),
        points: points(),
    })
    .await
    .unwrap();
    let client = TestClient::new(server.url());

    let response = client
        .query(serde_json::json!({"text": "sourdough starter feeding"}))
        .await
        .unwrap();

    assert_eq!(response.hits[0].id, "b");
    let targets: Vec<&str> = response.scores.iter().map(|s| s.target.as_str()).collect();
    assert_eq!(targets, vec!["t1", "t2"]);
    for entry in &response.scores {
        assert!((0.0..=1.0).contains(&entry.score));
        assert_eq!((entry.score * 100.0).round() / 100.0, entry.score);
    }
}

#[tokio::test]
async fn test_long_prompt_is_truncated_end_to_end() {
    let dir = TempDir::new().unwrap();
    let server = spawn_test_server(TestServerConfig {
        top_k: 1,
        max_sequence_length: 3,
        store: build_store(&dir),
        points: points(),
    })
    .await
    .unwrap();
    let client = TestClient::new(server.url());

    client
        .query(serde_json::json!({"prompt": "one two three four five", "truncate_strategy": "ends"}))
        .await
        .unwrap();

    assert_eq!(
        server.embedder.embedded_texts(),
        vec!["two three four".to_string()]
    );
}

#[tokio::test]
async fn test_empty_prompt_is_rejected() {
    let dir = TempDir::new().unwrap();
    let server = spawn_test_server(TestServerConfig {
        top_k: 1,
        max_sequence_length: 512,
        store: build_store(&dir),
        points: points(),
    })
    .await
    .unwrap();
    let client = TestClient::new(server.url());

    let err = client
        .query(serde_json::json!({"prompt": ""}))
        .await
        .unwrap_err();

    assert!(matches!(err, TestClientError::BadRequest(_)));
}

#[tokio::test]
async fn test_health_and_readiness() {
    let dir = TempDir::new().unwrap();
    let server = spawn_test_server(TestServerConfig {
        top_k: 1,
        max_sequence_length: 512,
        store: build_store(&dir),
        points: points(),
    })
    .await
    .unwrap();
    let client = TestClient::new(server.url());

    assert_eq!(client.health().await.unwrap().status, "ok");

    let (status, ready) = client.ready().await.unwrap();
    assert_eq!(status, 200);
    assert!(ready.is_ok());
    assert_eq!(ready.components.score_store_points, 2);

    server.search.set_unavailable(true);
    let (status, ready) = client.ready().await.unwrap();
    assert_eq!(status, 503);
    assert!(!ready.is_ok());
    assert_eq!(ready.components.vectordb, "error");
}
