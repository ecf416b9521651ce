//! knn-router entrypoint.

use clap::Parser;
use mimalloc::MiMalloc;

use knn_router::config::Config;
use knn_router_server::cli::{Cli, Command};
use knn_router_server::commands;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut config = Config::from_env()?;

    match cli.command {
        Command::Serve(args) => {
            args.apply(&mut config);
            commands::serve(config).await?;
        }
        Command::Gen(args) => {
            let db_path = commands::resolve_db_path(args.scores_db_path, &config);
            let report =
                commands::generate(args.data_path, db_path.clone(), config.collection).await?;
            tracing::info!(
                db_path = %db_path.display(),
                points = report.points,
                scores = report.scores,
                "Score store generated"
            );
        }
        Command::Load(args) => {
            let db_path = commands::resolve_db_path(args.db_path, &config);
            let report = commands::load(
                args.points_data_path,
                args.scores_data_path,
                db_path.clone(),
                config.collection,
            )
            .await?;
            tracing::info!(
                db_path = %db_path.display(),
                points = report.points,
                scores = report.scores,
                "Score store loaded"
            );
        }
        Command::HealthCheck(args) => {
            let port = args.port.unwrap_or(config.port);
            std::process::exit(commands::health_check(port).await);
        }
    }

    Ok(())
}
