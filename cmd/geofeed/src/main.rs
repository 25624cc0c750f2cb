//! geofeed - map clustering and resilient feed fetching from the command line.

use clap::{Parser, Subcommand};

mod commands;
mod config;

use commands::{ClusterCommand, FetchCommand, PickCommand};

/// geofeed - clusters map annotations and fetches feed entities through a
/// cache-backed repository.
///
/// Configuration is read from ~/.geofeed/config.yaml when present.
#[derive(Parser)]
#[command(name = "geofeed")]
#[command(about = "Geo clustering and resilient feed fetching")]
#[command(version)]
pub struct Cli {
    /// Config file (default is ~/.geofeed/config.yaml)
    #[arg(short = 'c', long, global = true)]
    pub config: Option<String>,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Group annotations into proximity clusters
    Cluster(ClusterCommand),
    /// Pick the best annotation under a map tap
    Pick(PickCommand),
    /// Fetch posts from a fixture through the resilient repository
    Fetch(FetchCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(level))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cfg = config::load_config(cli.config.as_deref())?;
    tracing::debug!(?cfg, "configuration loaded");

    match &cli.command {
        Commands::Cluster(cmd) => cmd.run(&cfg),
        Commands::Pick(cmd) => cmd.run(&cfg),
        Commands::Fetch(cmd) => cmd.run(&cfg).await,
    }
}
