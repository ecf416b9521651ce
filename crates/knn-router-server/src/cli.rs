//! Command-line surface of the `knn-router` binary.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use knn_router::config::Config;

#[derive(Debug, Parser)]
#[command(name = "knn-router", version, about, rename_all = "kebab")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve queries over HTTP.
    Serve(ServeArgs),
    /// Build a score store from a combined dataset.
    Gen(GenArgs),
    /// Build a score store from a points dataset and a scores dataset.
    Load(LoadArgs),
    /// Probe a running server's `/healthz`; exits non-zero when unhealthy.
    HealthCheck(HealthCheckArgs),
}

#[derive(Debug, Default, Args)]
pub struct ServeArgs {
    /// Address and port to bind, e.g. `:8888` or `127.0.0.1:8888`.
    #[arg(long, short = 'a', value_parser = parse_bind_addr)]
    pub bind_addr: Option<SocketAddr>,

    /// Base URL of the embedding server.
    #[arg(long = "embed-address", short = 'e')]
    pub embed_address: Option<String>,

    /// Qdrant gRPC URL.
    #[arg(long = "qdrant-address", short = 'q')]
    pub qdrant_address: Option<String>,

    #[arg(long, short = 's')]
    pub scores_db_path: Option<PathBuf>,

    #[arg(long, short = 'k')]
    pub top_k: Option<u64>,

    /// Token budget; queried from the embedding server when omitted.
    #[arg(long)]
    pub max_sequence_length: Option<usize>,

    /// Tokenize locally from this `tokenizer.json`.
    #[arg(long)]
    pub tokenizer_path: Option<PathBuf>,

    #[arg(long)]
    pub collection: Option<String>,
}

impl ServeArgs {
    /// Overrides `config` with every flag that was given.
    pub fn apply(&self, config: &mut Config) {
        if let Some(addr) = self.bind_addr {
            config.bind_addr = addr.ip();
            config.port = addr.port();
        }
        if let Some(url) = &self.embed_address {
            config.embed_url = url.clone();
        }
        if let Some(url) = &self.qdrant_address {
            config.qdrant_url = url.clone();
        }
        if let Some(path) = &self.scores_db_path {
            config.scores_db_path = path.clone();
        }
        if let Some(top_k) = self.top_k {
            config.top_k = top_k;
        }
        if let Some(max) = self.max_sequence_length {
            config.max_sequence_length = Some(max);
        }
        if let Some(path) = &self.tokenizer_path {
            config.tokenizer_path = Some(path.clone());
        }
        if let Some(collection) = &self.collection {
            config.collection = collection.clone();
        }
    }
}

#[derive(Debug, Args)]
pub struct GenArgs {
    /// Combined dataset (`{uid, category, target, score}` per line).
    #[arg(long, short = 'd')]
    pub data_path: PathBuf,

    #[arg(long, short = 's')]
    pub scores_db_path: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct LoadArgs {
    /// Points dataset (`{point_uid, category}` per line).
    #[arg(long)]
    pub points_data_path: PathBuf,

    /// Scores dataset (`{point_uid, target, score}` per line).
    #[arg(long)]
    pub scores_data_path: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct HealthCheckArgs {
    /// Port of the local server; defaults to the configured port.
    #[arg(long, short = 'p')]
    pub port: Option<u16>,
}

/// Accepts `host:port` or a bare `:port` (all interfaces).
pub fn parse_bind_addr(value: &str) -> Result<SocketAddr, String> {
    let value = value.trim();

    if let Some(port) = value.strip_prefix(':') {
        let port: u16 = port
            .parse()
            .map_err(|e| format!("invalid port '{port}': {e}"))?;
        return Ok(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)));
    }

    value
        .parse()
        .map_err(|e| format!("invalid bind address '{value}': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bind_addr_accepts_bare_port() {
        let addr = parse_bind_addr(":8888").unwrap();
        assert_eq!(addr, SocketAddr::from(([0, 0, 0, 0], 8888)));
    }

    #[test]
    fn test_parse_bind_addr_accepts_host_and_port() {
        let addr = parse_bind_addr("127.0.0.1:9000").unwrap();
        assert_eq!(addr, SocketAddr::from(([127, 0, 0, 1], 9000)));
    }

    #[test]
    fn test_parse_bind_addr_rejects_garbage() {
        assert!(parse_bind_addr(":http").is_err());
        assert!(parse_bind_addr("localhost").is_err());
    }

    #[test]
    fn test_serve_flags_override_config() {
        let cli = Cli::try_parse_from([
            "knn-router",
            "serve",
            "-a",
            "127.0.0.1:9000",
            "-e",
            "http://tei:80",
            "-q",
            "http://qdrant:6334",
            "-s",
            "/data/scores.db",
            "-k",
            "5",
            "--max-sequence-length",
            "256",
        ])
        .unwrap();

        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };

        let mut config = Config::default();
        args.apply(&mut config);

        assert_eq!(config.socket_addr(), "127.0.0.1:9000");
        assert_eq!(config.embed_url, "http://tei:80");
        assert_eq!(config.qdrant_url, "http://qdrant:6334");
        assert_eq!(config.scores_db_path, PathBuf::from("/data/scores.db"));
        assert_eq!(config.top_k, 5);
        assert_eq!(config.max_sequence_length, Some(256));
        assert_eq!(config.tokenizer_path, None);
    }

    #[test]
    fn test_serve_without_flags_keeps_config() {
        let cli = Cli::try_parse_from(["knn-router", "serve"]).unwrap();
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };

        let mut config = Config::default();
        args.apply(&mut config);

        assert_eq!(config.port, Config::default().port);
        assert_eq!(config.top_k, Config::default().top_k);
    }

    #[test]
    fn test_gen_and_load_arguments() {
        let cli = Cli::try_parse_from(["knn-router", "gen", "-d", "data.jsonl", "-s", "out.db"])
            .unwrap();
        match cli.command {
            Command::Gen(args) => {
                assert_eq!(args.data_path, PathBuf::from("data.jsonl"));
                assert_eq!(args.scores_db_path, Some(PathBuf::from("out.db")));
            }
            other => panic!("unexpected command: {other:?}"),
        }

        let cli = Cli::try_parse_from([
            "knn-router",
            "load",
            "--points-data-path",
            "points.jsonl",
            "--scores-data-path",
            "scores.jsonl",
        ])
        .unwrap();
        match cli.command {
            Command::Load(args) => {
                assert_eq!(args.points_data_path, PathBuf::from("points.jsonl"));
                assert_eq!(args.scores_data_path, PathBuf::from("scores.jsonl"));
                assert_eq!(args.db_path, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_gen_requires_data_path() {
        assert!(Cli::try_parse_from(["knn-router", "gen"]).is_err());
    }

    #[test]
    fn test_health_check_subcommand_name() {
        let cli = Cli::try_parse_from(["knn-router", "health-check", "-p", "9000"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::HealthCheck(HealthCheckArgs { port: Some(9000) })
        ));
    }
}
