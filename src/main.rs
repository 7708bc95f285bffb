use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use lazyscope::core_types::{PageSnapshot, PaintEntry};
use lazyscope::{telemetry, EngineConfig, EngineError, ImageEngine, InspectionReport};
use lazyscope::lcp_tracker::LcpError;
use serde::Deserialize;
use tracing::{debug, info};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path (toml, json or yaml)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Default log level when RUST_LOG is unset
    #[arg(short, long, default_value = "warn", global = true)]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify every image of a page snapshot and report LCP
    Inspect(InspectArgs),
}

#[derive(Args, Clone, Debug)]
struct InspectArgs {
    /// Page snapshot (JSON)
    #[arg(long, value_name = "FILE")]
    page: PathBuf,

    /// Paint-timing entries (JSON array of entries, or array of batches)
    #[arg(long, value_name = "FILE")]
    paint: Option<PathBuf>,

    /// Let the finalize timer run instead of settling immediately
    #[arg(long)]
    wait_lcp: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "summary")]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Json,
    Summary,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PaintFile {
    Batches(Vec<Vec<PaintEntry>>),
    Single(Vec<PaintEntry>),
}

impl PaintFile {
    fn into_batches(self) -> Vec<Vec<PaintEntry>> {
        match self {
            PaintFile::Batches(batches) => batches,
            PaintFile::Single(batch) => vec![batch],
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init_tracing(&cli.log_level, cli.log_json);

    let config = EngineConfig::load(cli.config.as_deref())
        .context("Failed to load configuration")?;

    match cli.command {
        Commands::Inspect(args) => cmd_inspect(args, config).await,
    }
}

async fn cmd_inspect(args: InspectArgs, config: EngineConfig) -> Result<()> {
    let page: PageSnapshot = read_json(&args.page).await?;
    let url = page.url.clone();
    let finalize_delay = Duration::from_millis(config.lcp.finalize_delay_ms);

    let engine = ImageEngine::new(config);
    let scanned = engine.activate(page);
    info!(%url, scanned, "page snapshot loaded");

    if let Some(path) = &args.paint {
        let batches = read_json::<PaintFile>(path).await?.into_batches();
        for batch in &batches {
            engine.observe_paint_entries(batch);
        }
        debug!(batches = batches.len(), "paint entries replayed");
    }

    if args.wait_lcp {
        tokio::time::sleep(finalize_delay).await;
    } else {
        engine.detect_lcp_fallback();
    }
    match engine.finalize() {
        Ok(()) | Err(EngineError::Lcp(LcpError::Finalized)) => {}
        Err(err) => return Err(err).context("Failed to settle LCP"),
    }

    let report = InspectionReport::collect(&engine, url);
    engine.deactivate();

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Summary => print!("{}", report.summary()),
    }
    Ok(())
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw)
        .map_err(EngineError::from)
        .with_context(|| format!("Failed to parse {}", path.display()))
}
