//! TrendCast CLI: pipeline stages, offline forecasts, and cache inspection.
//!
//! Commands:
//! - `collect`: resolve the series through primary → secondary → synthetic,
//!   cache it and record its provenance
//! - `fit`: fit scale and baseline model, store them under provenance keys
//! - `predict`: one-shot forecast from a JSON history file
//! - `provenance`: show the recorded provenance and derived artifact keys
//! - `cache status`: list cached symbols with date ranges and provenance

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trendcast_core::artifacts::{load_serving_artifacts, open_store, ArtifactKeys};
use trendcast_core::config::AppConfig;
use trendcast_core::data::{AttemptOutcome, ParquetCache};
use trendcast_core::domain::read_provenance;
use trendcast_core::inference::{ForecastService, InferenceConfig};
use trendcast_runner::{default_resolver, run_collect, run_fit, CollectOptions, FitOptions};

#[derive(Parser)]
#[command(name = "trendcast", about = "TrendCast CLI: next-step price forecasting")]
struct Cli {
    /// Path to the TOML config. Defaults to ./trendcast.toml when present.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the series (with fallback), cache it, and record provenance.
    Collect {
        /// Symbol to collect. Defaults to the configured ticker.
        #[arg(long)]
        symbol: Option<String>,

        /// Last day of the requested range (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        as_of: Option<String>,

        /// Also upload the series and provenance to the artifact store.
        #[arg(long, default_value_t = false)]
        upload: bool,
    },
    /// Fit the scale and baseline model on the collected series.
    Fit {
        /// Symbol to fit. Defaults to the configured ticker.
        #[arg(long)]
        symbol: Option<String>,

        /// Window size. Defaults to model.window_size.
        #[arg(long)]
        window_size: Option<usize>,

        /// Permit fitting on the synthetic placeholder series. The placeholder
        /// has only 10 points, so this needs --window-size 9 or less.
        #[arg(long, default_value_t = false)]
        allow_synthetic: bool,
    },
    /// Forecast the next price from a JSON file: `[..]` or `{"historico": [..]}`.
    Predict {
        /// Path to the history file.
        #[arg(long)]
        input: PathBuf,

        /// Ticker echoed in the output. Defaults to the configured ticker.
        #[arg(long)]
        ticker: Option<String>,
    },
    /// Show the recorded provenance and the artifact keys it selects.
    Provenance,
    /// Cache management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// List cached symbols with date range, point count and provenance.
    Status,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trendcast=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref()).context("loading config")?;

    match cli.command {
        Commands::Collect {
            symbol,
            as_of,
            upload,
        } => run_collect_cmd(&config, symbol, as_of, upload),
        Commands::Fit {
            symbol,
            window_size,
            allow_synthetic,
        } => run_fit_cmd(&config, symbol, window_size, allow_synthetic),
        Commands::Predict { input, ticker } => run_predict_cmd(&config, &input, ticker),
        Commands::Provenance => run_provenance_cmd(&config),
        Commands::Cache { action } => match action {
            CacheAction::Status => run_cache_status(&config.data.cache_dir),
        },
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{s}' (expected YYYY-MM-DD)"))
}

fn run_collect_cmd(
    config: &AppConfig,
    symbol: Option<String>,
    as_of: Option<String>,
    upload: bool,
) -> Result<()> {
    let symbol = symbol.unwrap_or_else(|| config.ticker.clone());
    let as_of = match as_of {
        Some(s) => parse_date(&s)?,
        None => chrono::Local::now().date_naive(),
    };

    let resolver = default_resolver(
        as_of,
        config.data.request_timeout(),
        config.data.lookback_days,
    )?;
    let cache = ParquetCache::new(&config.data.cache_dir);
    let upload = upload || config.store.upload_series;
    let store = if upload {
        Some(open_store(&config.store)?)
    } else {
        None
    };

    let opts = CollectOptions {
        symbol,
        provenance_file: config.data.provenance_file.clone(),
        upload,
    };
    let report = run_collect(&resolver, &cache, store.as_deref(), &opts)?;

    println!("Symbol:      {}", report.symbol);
    for attempt in &report.attempts {
        let outcome = match &attempt.outcome {
            AttemptOutcome::Succeeded => "ok".to_string(),
            AttemptOutcome::Failed(reason) => format!("failed: {reason}"),
            AttemptOutcome::Skipped => "skipped (unavailable)".to_string(),
        };
        println!("  {:<10} {:<14} {}", attempt.provenance.as_str(), attempt.provider, outcome);
    }
    println!("Provenance:  {}", report.provenance);
    println!(
        "Series:      {} points, {} to {}",
        report.meta.point_count, report.meta.start_date, report.meta.end_date
    );
    println!("Recorded in: {}", opts.provenance_file.display());
    if report.uploaded {
        println!("Uploaded:    {}", ArtifactKeys::series(&report.symbol));
    }
    if report.provenance.is_synthetic() {
        println!();
        println!("WARNING: all providers failed; cached series is a SYNTHETIC placeholder");
    }
    Ok(())
}

fn run_fit_cmd(
    config: &AppConfig,
    symbol: Option<String>,
    window_size: Option<usize>,
    allow_synthetic: bool,
) -> Result<()> {
    let cache = ParquetCache::new(&config.data.cache_dir);
    let store = open_store(&config.store)?;
    let opts = FitOptions {
        symbol: symbol.unwrap_or_else(|| config.ticker.clone()),
        window_size: window_size.unwrap_or(config.model.window_size),
        provenance_file: config.data.provenance_file.clone(),
        allow_synthetic,
    };
    let report = run_fit(&cache, store.as_ref(), &opts)?;

    println!("Symbol:      {}", report.symbol);
    println!("Provenance:  {}", report.provenance);
    println!("Points:      {} ({} training pairs)", report.points, report.training_pairs);
    println!("Scale:       [{:.4}, {:.4}]", report.scale.min(), report.scale.max());
    println!("Drift step:  {:+.6} (normalized)", report.step);
    println!("Model:       {}", report.keys.model);
    println!("Scaler:      {}", report.keys.scale);
    println!("Store:       {}", store.describe());
    Ok(())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum HistoryFile {
    Bare(Vec<f64>),
    Request { historico: Vec<f64> },
}

fn read_history(path: &Path) -> Result<Vec<f64>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    parse_history(&content).with_context(|| format!("parsing {}", path.display()))
}

fn parse_history(content: &str) -> Result<Vec<f64>> {
    let parsed: HistoryFile = serde_json::from_str(content)?;
    Ok(match parsed {
        HistoryFile::Bare(values) | HistoryFile::Request { historico: values } => values,
    })
}

fn run_predict_cmd(config: &AppConfig, input: &Path, ticker: Option<String>) -> Result<()> {
    let history = read_history(input)?;
    let provenance = read_provenance(&config.data.provenance_file)?;
    let store = open_store(&config.store)?;
    let artifacts = load_serving_artifacts(store.as_ref(), provenance)?;
    let service = ForecastService::from_artifacts(artifacts, InferenceConfig::from(config))?;

    let forecast = service.predict(&history)?;
    let ticker = ticker.unwrap_or_else(|| config.ticker.clone());
    println!("{}", serde_json::to_string_pretty(&forecast.to_response(&ticker))?);
    Ok(())
}

fn run_provenance_cmd(config: &AppConfig) -> Result<()> {
    let path = &config.data.provenance_file;
    if !path.exists() {
        bail!(
            "no provenance recorded at {} (run `trendcast collect` first)",
            path.display()
        );
    }
    let provenance = read_provenance(path)?;
    let keys = ArtifactKeys::for_provenance(provenance);
    println!("Provenance:  {provenance}");
    println!("File:        {}", path.display());
    println!("Model key:   {}", keys.model);
    println!("Scaler key:  {}", keys.scale);
    Ok(())
}

fn run_cache_status(cache_dir: &Path) -> Result<()> {
    if !cache_dir.exists() {
        println!("Cache directory does not exist: {}", cache_dir.display());
        return Ok(());
    }
    let metas = ParquetCache::new(cache_dir).list()?;
    if metas.is_empty() {
        println!("Cache is empty: {}", cache_dir.display());
        return Ok(());
    }

    println!("Cache: {}", cache_dir.display());
    println!("Symbols: {}", metas.len());
    println!();
    println!(
        "{:<10} {:<25} {:<12} {:<10} {:<19}",
        "Symbol", "Date Range", "Points", "Source", "Cached At"
    );
    println!("{}", "-".repeat(80));
    for meta in &metas {
        println!(
            "{:<10} {:<25} {:<12} {:<10} {:<19}",
            meta.symbol,
            format!("{} to {}", meta.start_date, meta.end_date),
            format!("{} pts", meta.point_count),
            meta.provenance.as_str(),
            meta.cached_at.format("%Y-%m-%d %H:%M:%S"),
        );
    }
    Ok(())
}
