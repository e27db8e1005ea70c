//! djm-match - match a DJ track list against a candidate catalog
//!
//! Reads tracks and a catalog as JSON, runs the matching engine (optionally
//! followed by the relaxed re-search pass) and writes one outcome per track
//! as pretty JSON. Logs go to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use djm_common::config::{resolve_settings_path, CONFIG_ENV_VAR};
use djm_common::{EventBus, MatchEvent};
use djm_match::{BatchRunner, CatalogSource, InputTrack, MatcherSettings};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Command-line arguments for djm-match
#[derive(Parser, Debug)]
#[command(name = "djm-match")]
#[command(about = "Find the best catalog entry for each track in a DJ collection")]
#[command(version)]
struct Args {
    /// JSON array of input tracks (`id`, `title`, `artists`)
    #[arg(long)]
    tracks: PathBuf,

    /// JSON array of catalog entries to search
    #[arg(long)]
    catalog: PathBuf,

    /// Settings file (TOML)
    #[arg(short, long, env = CONFIG_ENV_VAR)]
    config: Option<PathBuf>,

    /// Preset for the initial pass: fast, balanced, thorough, relaxed
    #[arg(short, long)]
    preset: Option<String>,

    /// Re-search unmatched tracks with the relaxed configuration
    #[arg(long)]
    research: bool,

    /// Tracks processed concurrently (overrides the settings file)
    #[arg(long)]
    track_workers: Option<usize>,

    /// Write outcomes here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let settings = match resolve_settings_path(args.config.as_deref(), CONFIG_ENV_VAR) {
        Some(path) => MatcherSettings::load(&path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => MatcherSettings::default(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.logging.level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Starting djm-match v{}", env!("CARGO_PKG_VERSION"));

    let config = settings
        .initial_config(args.preset.as_deref())
        .context("Invalid matching configuration")?;
    let track_workers = args.track_workers.unwrap_or(settings.runner.track_workers);

    let tracks = InputTrack::load_list(&args.tracks)
        .with_context(|| format!("Failed to read tracks from {}", args.tracks.display()))?;
    let catalog = CatalogSource::from_json_file(&args.catalog)
        .with_context(|| format!("Failed to read catalog from {}", args.catalog.display()))?;
    info!(tracks = tracks.len(), catalog_entries = catalog.len(), "Inputs loaded");

    let event_bus = EventBus::new(256);
    let progress_log = spawn_progress_log(&event_bus);

    let mut runner = BatchRunner::new(config, track_workers)
        .context("Invalid run parameters")?
        .with_progress(Arc::new(event_bus.clone()));
    if args.research {
        let relaxed = settings
            .research_config()
            .context("Invalid re-search configuration")?;
        runner = runner
            .with_research(relaxed)
            .context("Invalid re-search configuration")?;
    }

    let cancel_token = CancellationToken::new();
    let signal_token = cancel_token.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, cancelling run");
            signal_token.cancel();
        }
    });

    let report = runner.run(&tracks, &catalog, &cancel_token).await;
    // Closing every sender ends the progress log
    drop(runner);
    drop(event_bus);
    let _ = progress_log.await;

    let json = serde_json::to_string_pretty(&report.outcomes).context("Failed to serialize outcomes")?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), "Outcomes written");
        }
        None => println!("{json}"),
    }

    info!(
        total = report.summary.total,
        matched = report.summary.matched,
        high = report.summary.confidence.high,
        medium = report.summary.confidence.medium,
        low = report.summary.confidence.low,
        researched = report.summary.researched,
        cancelled = report.summary.cancelled,
        "Run summary"
    );
    Ok(())
}

/// Log progress events until the bus is dropped
fn spawn_progress_log(event_bus: &EventBus) -> tokio::task::JoinHandle<()> {
    let mut rx = event_bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(MatchEvent::TrackProgress(p)) => {
                    tracing::debug!(
                        progress = format!("{}/{}", p.completed_count, p.total_count),
                        matched = p.matched_count,
                        track_id = %p.current_track_id,
                        "Track finished"
                    );
                }
                Ok(MatchEvent::RunStarted { pass, total_count, .. }) => {
                    info!(pass = %pass, tracks = total_count, "Pass started");
                }
                Ok(MatchEvent::RunCompleted { matched_count, total_count, cancelled, .. }) => {
                    info!(matched = matched_count, tracks = total_count, cancelled, "Pass completed");
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Progress log lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
