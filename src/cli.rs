//! Command-line interface.

use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use crate::api::{create_router, AppState};
use crate::clock;
use crate::config::{validation, AppConfig};
use crate::digest::DigestAggregate;
use crate::metrics::{install_prometheus, MetricsCollector};
use crate::pipeline;
use crate::validate::Validator;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Daily digest of weather, sports, tech news and markets.
///
/// Fetches each section, validates the result for freshness, source
/// attribution, completeness and content, and writes JSON + HTML artifacts.
#[derive(Parser)]
#[command(name = "daily-digest")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch all sections and write digest.json, index.html and metrics.json
    Generate(GenerateArgs),
    /// Validate an existing digest JSON file
    #[command(visible_alias = "check")]
    Validate(ValidateArgs),
    /// Serve the validation API over HTTP
    Serve(ServeArgs),
}

#[derive(Args)]
pub struct GenerateArgs {
    /// Output directory (default: $DIGEST_OUTPUT_DIR or docs)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Use mock data for every section; no network access
    #[arg(long)]
    pub offline: bool,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Digest JSON file
    pub file: PathBuf,

    /// Print the validation summary as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ServeArgs {
    /// Listen address
    #[arg(long, default_value = "127.0.0.1:8080")]
    pub addr: SocketAddr,
}

fn load_validator() -> Result<Validator> {
    let settings = validation::load_settings_default()?;
    Ok(Validator::new(settings))
}

/// Exit 0 when the digest was written, whatever its quality.
pub async fn run_generate(args: &GenerateArgs, mut config: AppConfig) -> Result<i32> {
    if args.offline {
        config.offline = true;
    }
    if let Some(dir) = &args.output {
        config.output_dir = dir.clone();
    }

    let clock = clock::system();
    let validator = load_validator()?;
    let providers = pipeline::default_providers(&config, clock.clone());
    let mut metrics = MetricsCollector::new();

    let outcome =
        pipeline::generate(&config.output_dir, &providers, &validator, &clock, &mut metrics)
            .await?;

    println!(
        "Digest for {} written to {} (quality score {:.2}, {} issue(s))",
        outcome.digest.date.as_deref().unwrap_or("today"),
        config.output_dir.display(),
        outcome.validation.quality_score,
        outcome.validation.error_count
    );
    Ok(EXIT_SUCCESS)
}

/// Exit 0 when valid, 1 when invalid.
pub fn run_validate(args: &ValidateArgs) -> Result<i32> {
    let raw = fs::read_to_string(&args.file)
        .with_context(|| format!("reading {}", args.file.display()))?;
    let digest = DigestAggregate::from_json_str(&raw)
        .with_context(|| format!("loading {}", args.file.display()))?;

    let summary = load_validator()?.get_validation_summary(&digest);
    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("serializing summary")?
        );
    } else if summary.is_valid {
        println!("VALID  quality score {:.2}", summary.quality_score);
    } else {
        println!(
            "INVALID  quality score {:.2}, {} error(s):",
            summary.quality_score, summary.error_count
        );
        for e in &summary.errors {
            println!("  - {e}");
        }
    }

    Ok(if summary.is_valid {
        EXIT_SUCCESS
    } else {
        EXIT_FAILED
    })
}

pub async fn run_serve(args: &ServeArgs) -> Result<i32> {
    let handle = install_prometheus()?;
    let state = AppState::new(load_validator()?).with_prometheus(handle);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .with_context(|| format!("binding {}", args.addr))?;
    tracing::info!(addr = %args.addr, "serving validation api");
    axum::serve(listener, router).await.context("http server")?;
    Ok(EXIT_SUCCESS)
}
