//! Cross-cutting, shared constants.
//!
//! The collection name is shared by the vector index and the score store: the
//! ids returned by a search are looked up verbatim as score store keys.

/// Collection name used for both the vector index and the score store.
pub const POINTS_COLLECTION: &str = "main";

/// Number of nearest neighbors aggregated per query.
pub const DEFAULT_TOP_K: u64 = 10;

/// Default HTTP port for the query server.
pub const DEFAULT_PORT: u16 = 8888;

/// Default score store file.
pub const DEFAULT_SCORES_DB_PATH: &str = "scores.db";

/// Default text-embeddings-inference endpoint.
pub const DEFAULT_EMBED_URL: &str = "http://localhost:8889";

/// Default Qdrant gRPC endpoint.
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";

/// Timeout applied to each HTTP call to the embedding server.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Decimal places kept in normalized scores.
pub const SCORE_DECIMALS: i32 = 2;

/// Status header attached to every gateway response.
pub const KNN_ROUTER_STATUS_HEADER: &str = "x-knn-router-status";
pub const KNN_ROUTER_STATUS_HEALTHY: &str = "healthy";
pub const KNN_ROUTER_STATUS_READY: &str = "ready";
pub const KNN_ROUTER_STATUS_NOT_READY: &str = "not_ready";
pub const KNN_ROUTER_STATUS_ERROR: &str = "error";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_scale_matches_decimals() {
        assert_eq!(10_f64.powi(SCORE_DECIMALS), 100.0);
    }

    #[test]
    fn test_default_endpoints_are_http() {
        assert!(DEFAULT_EMBED_URL.starts_with("http://"));
        assert!(DEFAULT_QDRANT_URL.starts_with("http://"));
    }
}
