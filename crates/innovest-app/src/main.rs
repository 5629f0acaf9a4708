//! `innovest`: terminal client for the Innovest marketplace.

use clap::Parser;

mod commands;
mod config;

use commands::Command;
use config::{ConnectArgs, Connection};

#[derive(Parser)]
#[command(name = "innovest", about = "Browse deals, unlock data rooms and chat with counterparts", version)]
struct Cli {
    #[command(flatten)]
    connect: ConnectArgs,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before clap reads the environment
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "innovest=debug" } else { "innovest=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let conn = Connection::connect(&cli.connect).await?;
    commands::run(cli.command, &conn).await
}
