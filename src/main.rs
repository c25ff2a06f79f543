//! CLI entry point for the asset tracker.
//!
//! Provides subcommands for ingesting telemetry events and querying fixes,
//! trips, and the latest position of an asset.

use std::ffi::OsStr;
use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use asset_tracker::config::TrackerConfig;
use asset_tracker::declination::DipoleDeclination;
use asset_tracker::error::Error;
use asset_tracker::event::IngestEvent;
use asset_tracker::output::{append_fixes, print_json};
use asset_tracker::service::{FixQuery, Tracker};
use asset_tracker::store::JsonFileStore;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "asset_tracker")]
#[command(about = "Track mobile assets from raw sensor telemetry", long_about = None)]
struct Cli {
    /// Directory holding the per-asset telemetry tables
    #[arg(short, long, global = true, default_value = "data")]
    data_dir: String,

    /// Optional JSON config file (calibration, windows, thresholds)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest telemetry events (one JSON object per line)
    Ingest {
        /// Path to a file of events, or "-" for stdin
        #[arg(value_name = "FILE", default_value = "-")]
        source: String,
    },
    /// Query normalized fixes with aggregate distance and bounds
    Fixes {
        /// Asset id to query
        asset: String,

        /// Lower time bound (RFC-3339, inclusive)
        #[arg(long)]
        since: Option<String>,

        /// Upper time bound (RFC-3339, inclusive)
        #[arg(long)]
        before: Option<String>,

        /// CSV file to append the fixes to
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Reconstruct trips from the fixes in a window
    Trips {
        /// Asset id to query
        asset: String,

        /// Lower time bound (RFC-3339, inclusive)
        #[arg(long)]
        since: Option<String>,

        /// Upper time bound (RFC-3339, inclusive)
        #[arg(long)]
        before: Option<String>,
    },
    /// Show the most recent fix for an asset
    Latest {
        /// Asset id to query
        asset: String,
    },
    /// List known assets
    Assets,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/asset_tracker.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("asset_tracker.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let tracker = build_tracker(&cli.data_dir, cli.config.as_deref())?;

    match cli.command {
        Commands::Ingest { source } => {
            ingest_events(&tracker, &source).await?;
        }
        Commands::Fixes {
            asset,
            since,
            before,
            output,
        } => {
            let query = parse_query(since.as_deref(), before.as_deref())?;
            let result = tracker.get_fixes(&asset, &query).await?;
            info!(
                asset_id = %asset,
                count = result.count,
                distance = result.distance,
                "fixes query complete"
            );
            if let Some(path) = output {
                append_fixes(&path, &result.items)?;
            }
            print_json(&result)?;
        }
        Commands::Trips {
            asset,
            since,
            before,
        } => {
            let query = parse_query(since.as_deref(), before.as_deref())?;
            let trips = tracker.get_trips(&asset, &query).await?;
            print_json(&trips)?;
        }
        Commands::Latest { asset } => match tracker.get_latest_fix(&asset).await {
            Ok(latest) => print_json(&latest)?,
            Err(Error::NotFound(id)) => {
                warn!(asset_id = %id, "no fix inside the freshness window");
                println!("null");
            }
            Err(e) => return Err(e.into()),
        },
        Commands::Assets => {
            let assets = tracker.list_assets().await?;
            print_json(&assets)?;
        }
    }

    Ok(())
}

fn build_tracker(data_dir: &str, config_path: Option<&str>) -> Result<Tracker<JsonFileStore>> {
    let config = match config_path {
        Some(path) => {
            TrackerConfig::load(path).with_context(|| format!("loading config {}", path))?
        }
        None => TrackerConfig::default(),
    };
    let store = JsonFileStore::new(data_dir)?;
    Ok(Tracker::new(store, Arc::new(DipoleDeclination::new()), config)?)
}

fn parse_query(since: Option<&str>, before: Option<&str>) -> Result<FixQuery> {
    let parse = |label: &str, value: Option<&str>| -> Result<Option<DateTime<Utc>>> {
        value
            .map(|v| {
                v.parse::<DateTime<Utc>>()
                    .with_context(|| format!("bad --{} timestamp: {}", label, v))
            })
            .transpose()
    };
    Ok(FixQuery {
        since: parse("since", since)?,
        before: parse("before", before)?,
        latest_only: false,
    })
}

/// Reads newline-delimited JSON events from a file or stdin and ingests
/// them one by one. Bad events are logged and skipped so one malformed line
/// does not sink a batch.
#[tracing::instrument(skip(tracker), fields(source = %source))]
async fn ingest_events(tracker: &Tracker<JsonFileStore>, source: &str) -> Result<()> {
    let lines: Vec<String> = if source == "-" {
        std::io::stdin().lock().lines().collect::<std::io::Result<_>>()?
    } else {
        std::fs::read_to_string(source)
            .with_context(|| format!("reading {}", source))?
            .lines()
            .map(str::to_string)
            .collect()
    };

    let mut stored = 0usize;
    let mut rejected = 0usize;

    for (line_no, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let event: IngestEvent = match serde_json::from_str(line) {
            Ok(event) => event,
            Err(e) => {
                error!(line = line_no + 1, error = %e, "event is not valid JSON");
                rejected += 1;
                continue;
            }
        };
        match tracker.ingest(event).await {
            Ok(()) => stored += 1,
            Err(e) => {
                error!(line = line_no + 1, error = %e, "event rejected");
                rejected += 1;
            }
        }
    }

    info!(stored, rejected, "ingestion finished");
    Ok(())
}
