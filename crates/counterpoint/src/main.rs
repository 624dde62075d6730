use anyhow::Result;
use clap::Parser;
use counterpoint::cli::Cli;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    info!(version = env!("CARGO_PKG_VERSION"), "counterpoint starting");

    let stats = counterpoint::app::execute(cli).await?;
    if stats.generation_failed + stats.evaluations_failed > 0 {
        tracing::warn!(
            generation_failed = stats.generation_failed,
            evaluations_failed = stats.evaluations_failed,
            "some units failed; see log above"
        );
    }
    Ok(())
}
