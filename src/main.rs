//! daily-digest binary entrypoint.

use clap::Parser;
use daily_digest::cli::{self, Cli, Commands, EXIT_ERROR};
use daily_digest::config::AppConfig;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// `RUST_LOG` wins; otherwise the configured level. `LOG_FORMAT=json` switches
/// to JSON lines.
fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("daily_digest={0},{0}", config.log_filter())));

    let json = std::env::var("LOG_FORMAT")
        .ok()
        .is_some_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() {
    // No-op when .env is absent.
    let _ = dotenvy::dotenv();

    let config = AppConfig::from_env();
    init_tracing(&config);
    tracing::debug!(
        location = %config.default_location,
        weather_key = config.openweather_api_key.is_some(),
        news_key = config.news_api_key.is_some(),
        "configuration loaded"
    );

    let cli = Cli::parse();
    let result = match &cli.command {
        Commands::Generate(args) => cli::run_generate(args, config).await,
        Commands::Validate(args) => cli::run_validate(args),
        Commands::Serve(args) => cli::run_serve(args).await,
    };

    let code = match result {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = ?e, "command failed");
            eprintln!("Error: {e:#}");
            EXIT_ERROR
        }
    };
    std::process::exit(code);
}
