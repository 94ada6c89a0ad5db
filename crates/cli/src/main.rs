//! `flowphase` report binary.
//!
//! Reads a recorded market snapshot, runs every configured timeframe and
//! prints the report as JSON.

use anyhow::Context;
use clap::Parser;
use flowphase_core::Config;
use flowphase_ingestion::{InMemoryProvider, MarketSnapshot};
use flowphase_runtime::Orchestrator;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "flowphase")]
#[command(about = "Multi-timeframe order flow report", long_about = None)]
struct Cli {
    /// Market snapshot (JSON)
    #[arg(short, long)]
    snapshot: PathBuf,

    /// Configuration (JSON); defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured symbol
    #[arg(long)]
    symbol: Option<String>,

    /// Print compact instead of pretty JSON
    #[arg(long)]
    compact: bool,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(Config::default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("flowphase=info".parse()?))
        .init();

    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_ref())?;
    if let Some(symbol) = cli.symbol {
        config.instrument.symbol = symbol;
    }

    let snapshot = MarketSnapshot::from_json_file(&cli.snapshot)
        .with_context(|| format!("loading snapshot {}", cli.snapshot.display()))?;
    tracing::info!(
        "loaded snapshot for {} ({} intervals)",
        snapshot.symbol,
        snapshot.samples.len()
    );

    let provider = Arc::new(InMemoryProvider::from_snapshot(snapshot));
    let report = Orchestrator::with_provider(provider, config)?.run().await;

    let out = if cli.compact {
        serde_json::to_string(&report)?
    } else {
        serde_json::to_string_pretty(&report)?
    };
    println!("{out}");

    Ok(())
}
