//! Environment-backed configuration.
//!
//! Most settings have defaults. Override with `KNN_ROUTER_*` environment variables.

pub mod error;


pub use error::ConfigError;

use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    DEFAULT_EMBED_URL, DEFAULT_PORT, DEFAULT_QDRANT_URL, DEFAULT_REQUEST_TIMEOUT_MS,
    DEFAULT_SCORES_DB_PATH, DEFAULT_TOP_K, POINTS_COLLECTION,
};

/// Server configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `KNN_ROUTER_*` overrides on top of defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port. Default: `8888`.
    pub port: u16,

    /// IP address to bind to. Default: `0.0.0.0`.
    pub bind_addr: IpAddr,

    /// Base URL of the text-embeddings-inference server. Default: `http://localhost:8889`.
    pub embed_url: String,

    /// Qdrant endpoint URL. Default: `http://localhost:6334`.
    pub qdrant_url: String,

    /// Score store file. Default: `scores.db`.
    pub scores_db_path: PathBuf,

    /// Collection searched in Qdrant and read from the score store. Default: `main`.
    pub collection: String,

    /// Number of nearest neighbors to aggregate. Default: `10`.
    pub top_k: u64,

    /// Token budget for prompts. Discovered from the embedding server when unset.
    pub max_sequence_length: Option<usize>,

    /// Local `tokenizer.json`; when unset, prompts are tokenized by the embedding server.
    pub tokenizer_path: Option<PathBuf>,

    /// Timeout for each embedding server call, in milliseconds. Default: `30000`.
    pub request_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            embed_url: DEFAULT_EMBED_URL.to_string(),
            qdrant_url: DEFAULT_QDRANT_URL.to_string(),
            scores_db_path: PathBuf::from(DEFAULT_SCORES_DB_PATH),
            collection: POINTS_COLLECTION.to_string(),
            top_k: DEFAULT_TOP_K,
            max_sequence_length: None,
            tokenizer_path: None,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

impl Config {
    const ENV_PORT: &'static str = "KNN_ROUTER_PORT";
    const ENV_BIND_ADDR: &'static str = "KNN_ROUTER_BIND_ADDR";
    const ENV_EMBED_URL: &'static str = "KNN_ROUTER_EMBED_URL";
    const ENV_QDRANT_URL: &'static str = "KNN_ROUTER_QDRANT_URL";
    const ENV_SCORES_DB_PATH: &'static str = "KNN_ROUTER_SCORES_DB_PATH";
    const ENV_COLLECTION: &'static str = "KNN_ROUTER_COLLECTION";
    const ENV_TOP_K: &'static str = "KNN_ROUTER_TOP_K";
    const ENV_MAX_SEQUENCE_LENGTH: &'static str = "KNN_ROUTER_MAX_SEQUENCE_LENGTH";
    const ENV_TOKENIZER_PATH: &'static str = "KNN_ROUTER_TOKENIZER_PATH";
    const ENV_REQUEST_TIMEOUT_MS: &'static str = "KNN_ROUTER_REQUEST_TIMEOUT_MS";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = Self::parse_port_from_env(defaults.port)?;
        let bind_addr = Self::parse_bind_addr_from_env(defaults.bind_addr)?;
        let embed_url = Self::parse_string_from_env(Self::ENV_EMBED_URL, defaults.embed_url);
        let qdrant_url = Self::parse_string_from_env(Self::ENV_QDRANT_URL, defaults.qdrant_url);
        let scores_db_path =
            Self::parse_path_from_env(Self::ENV_SCORES_DB_PATH, defaults.scores_db_path);
        let collection = Self::parse_string_from_env(Self::ENV_COLLECTION, defaults.collection);
        let top_k = Self::parse_u64_from_env(Self::ENV_TOP_K, defaults.top_k)?;
        let max_sequence_length =
            Self::parse_optional_u64_from_env(Self::ENV_MAX_SEQUENCE_LENGTH)?
                .map(|v| v as usize);
        let tokenizer_path = Self::parse_optional_path_from_env(Self::ENV_TOKENIZER_PATH);
        let request_timeout_ms =
            Self::parse_u64_from_env(Self::ENV_REQUEST_TIMEOUT_MS, defaults.request_timeout_ms)?;

        Ok(Self {
            port,
            bind_addr,
            embed_url,
            qdrant_url,
            scores_db_path,
            collection,
            top_k,
            max_sequence_length,
            tokenizer_path,
            request_timeout_ms,
        })
    }

    /// Validates numeric ranges and paths (does not open the score store).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidPort {
                value: self.port.to_string(),
            });
        }

        if self.top_k == 0 {
            return Err(ConfigError::MustBePositive { name: "top_k" });
        }

        if self.max_sequence_length == Some(0) {
            return Err(ConfigError::MustBePositive {
                name: "max_sequence_length",
            });
        }

        if self.request_timeout_ms == 0 {
            return Err(ConfigError::MustBePositive {
                name: "request_timeout_ms",
            });
        }

        if self.embed_url.trim().is_empty() {
            return Err(ConfigError::EmptyUrl { name: "embed_url" });
        }

        if self.qdrant_url.trim().is_empty() {
            return Err(ConfigError::EmptyUrl { name: "qdrant_url" });
        }

        if self.scores_db_path.exists() && !self.scores_db_path.is_file() {
            return Err(ConfigError::NotAFile {
                path: self.scores_db_path.clone(),
            });
        }

        if let Some(ref path) = self.tokenizer_path {
            if !path.exists() {
                return Err(ConfigError::PathNotFound { path: path.clone() });
            }
            if !path.is_file() {
                return Err(ConfigError::NotAFile { path: path.clone() });
            }
        }

        Ok(())
    }

    /// Returns `"{bind_addr}:{port}"` (useful for logging/binding).
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    /// Returns the per-call timeout for the embedding server.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    fn parse_port_from_env(default: u16) -> Result<u16, ConfigError> {
        match env::var(Self::ENV_PORT) {
            Ok(value) => {
                let port: u16 = value.parse().map_err(|e| ConfigError::PortParseError {
                    value: value.clone(),
                    source: e,
                })?;

                if port == 0 {
                    return Err(ConfigError::InvalidPort { value });
                }

                Ok(port)
            }
            Err(_) => Ok(default),
        }
    }

    fn parse_bind_addr_from_env(default: IpAddr) -> Result<IpAddr, ConfigError> {
        match env::var(Self::ENV_BIND_ADDR) {
            Ok(value) => value
                .parse()
                .map_err(|e| ConfigError::InvalidBindAddr { value, source: e }),
            Err(_) => Ok(default),
        }
    }

    fn parse_path_from_env(var_name: &str, default: PathBuf) -> PathBuf {
        env::var(var_name).map(PathBuf::from).unwrap_or(default)
    }

    fn parse_optional_path_from_env(var_name: &str) -> Option<PathBuf> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    }

    fn parse_string_from_env(var_name: &str, default: String) -> String {
        env::var(var_name).unwrap_or(default)
    }

    fn parse_u64_from_env(name: &'static str, default: u64) -> Result<u64, ConfigError> {
        Ok(Self::parse_optional_u64_from_env(name)?.unwrap_or(default))
    }

    fn parse_optional_u64_from_env(name: &'static str) -> Result<Option<u64>, ConfigError> {
        match env::var(name) {
            Ok(value) if !value.trim().is_empty() => value
                .trim()
                .parse()
                .map(Some)
                .map_err(|e| ConfigError::InvalidNumber {
                    name,
                    value,
                    source: e,
                }),
            _ => Ok(None),
        }
    }
}
