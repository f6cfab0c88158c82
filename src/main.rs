//! CLI entry point for the http-fetch tool.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use http_fetch::{FetchEngine, FetchOptions, StdoutWriter};
use tracing::{debug, info};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // stdout carries the fetched bodies, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut options = match &args.config {
        Some(path) => load_options(path)?,
        None => FetchOptions::default(),
    };
    args.apply(&mut options);
    debug!(
        urls = args.urls.len(),
        config = ?args.config,
        method = %options.method,
        cron = ?options.cron,
        "CLI arguments parsed"
    );

    let engine = FetchEngine::new(&args.urls, options, Arc::new(StdoutWriter::new()))
        .context("invalid fetch configuration")?;

    engine.produce().await?;

    if engine.config().cron().is_some() {
        info!("Schedule running, press Ctrl-C to stop");
        tokio::signal::ctrl_c()
            .await
            .context("failed to listen for Ctrl-C")?;
        info!("Stopping schedule");
    }

    Ok(())
}

/// Reads a JSON options document.
fn load_options(path: &Path) -> Result<FetchOptions> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("invalid config file {}", path.display()))
}
