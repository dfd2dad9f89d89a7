//! One digest run: fetch sections, assemble, validate, write artifacts.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::clock::SharedClock;
use crate::config::AppConfig;
use crate::digest::DigestAggregate;
use crate::fetch::market::MarketProvider;
use crate::fetch::sports::SportsProvider;
use crate::fetch::tech_news::TechNewsProvider;
use crate::fetch::weather::WeatherProvider;
use crate::fetch::{fetch_all, SectionProvider, SectionRecord};
use crate::metrics::MetricsCollector;
use crate::render::render_html;
use crate::validate::{ValidationSummary, Validator};

pub const DIGEST_FILE: &str = "digest.json";
pub const HTML_FILE: &str = "index.html";
pub const METRICS_FILE: &str = "metrics.json";

/// Result of a run.
#[derive(Debug, Clone)]
pub struct GenerateOutcome {
    pub digest: DigestAggregate,
    pub validation: ValidationSummary,
    pub files: Vec<PathBuf>,
}

/// The four section providers for `config`. Offline mode, or a missing
/// weather key, swaps in mock data.
pub fn default_providers(config: &AppConfig, clock: SharedClock) -> Vec<Box<dyn SectionProvider>> {
    let content = &config.content;

    let weather: Box<dyn SectionProvider> = match (&config.openweather_api_key, config.offline) {
        (Some(key), false) => Box::new(WeatherProvider::live(
            key.clone(),
            config.default_location.clone(),
            clock.clone(),
        )),
        _ => {
            if !config.offline {
                warn!("OPENWEATHER_API_KEY not set; using mock weather data");
            }
            Box::new(WeatherProvider::mock(
                config.default_location.clone(),
                None,
                clock.clone(),
            ))
        }
    };

    let tech: Box<dyn SectionProvider> = if config.offline {
        Box::new(TechNewsProvider::mock(
            content.tech_topics.clone(),
            content.tech_limit,
            clock.clone(),
        ))
    } else {
        Box::new(TechNewsProvider::http(
            content.tech_topics.clone(),
            content.tech_limit,
            clock.clone(),
        ))
    };

    vec![
        weather,
        Box::new(
            SportsProvider::new(content.teams(), None, clock.clone())
                .with_api_key_present(config.sports_api_key.is_some()),
        ),
        tech,
        Box::new(
            MarketProvider::new(content.market_indexes.clone(), None, clock.clone())
                .with_api_key_present(config.finance_api_key.is_some()),
        ),
    ]
}

/// Build the aggregate from fetched records; `date` and `generated_at` come
/// from the clock.
pub fn assemble(records: Vec<SectionRecord>, clock: &SharedClock) -> DigestAggregate {
    let now = clock.now();
    DigestAggregate::new(
        now.format("%Y-%m-%d").to_string(),
        now.naive_local().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
        records.into_iter().map(SectionRecord::into_section).collect(),
    )
}

/// Write `digest.json` and `index.html` into `dir`, creating it if needed.
pub fn write_artifacts(
    dir: &Path,
    digest: &DigestAggregate,
    validation: &ValidationSummary,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let json_path = dir.join(DIGEST_FILE);
    let body = serde_json::to_string_pretty(digest).context("serializing digest")?;
    fs::write(&json_path, body).with_context(|| format!("writing {}", json_path.display()))?;
    info!(path = %json_path.display(), "saved");

    let html_path = dir.join(HTML_FILE);
    fs::write(&html_path, render_html(digest, Some(validation)))
        .with_context(|| format!("writing {}", html_path.display()))?;
    info!(path = %html_path.display(), "saved");

    Ok(vec![json_path, html_path])
}

/// Full run. An invalid digest is still written, with a warning.
pub async fn generate(
    output_dir: &Path,
    providers: &[Box<dyn SectionProvider>],
    validator: &Validator,
    clock: &SharedClock,
    metrics: &mut MetricsCollector,
) -> Result<GenerateOutcome> {
    info!(generation_id = metrics.generation_id(), "starting digest generation");
    metrics.start_timer("generation.total");

    match run(output_dir, providers, validator, clock, metrics).await {
        Ok(mut outcome) => {
            let total_ms = metrics.stop_timer("generation.total", &[])?;
            metrics.record("generation.success", 1.0, &[]);

            let metrics_path = output_dir.join(METRICS_FILE);
            metrics.save(&metrics_path, true)?;
            info!(path = %metrics_path.display(), "saved");
            outcome.files.push(metrics_path);

            info!(
                duration_ms = total_ms,
                quality_score = outcome.validation.quality_score,
                output_dir = %output_dir.display(),
                "digest generation complete"
            );
            Ok(outcome)
        }
        Err(e) => {
            let _ = metrics.stop_timer("generation.total", &[]);
            metrics.increment("generation.error", &[]);
            tracing::error!(error = ?e, "digest generation failed");
            Err(e)
        }
    }
}

async fn run(
    output_dir: &Path,
    providers: &[Box<dyn SectionProvider>],
    validator: &Validator,
    clock: &SharedClock,
    metrics: &mut MetricsCollector,
) -> Result<GenerateOutcome> {
    let records = fetch_all(providers, clock.as_ref(), metrics).await;
    let digest = assemble(records, clock);

    let validation = validator.get_validation_summary(&digest);
    metrics.record("quality.completeness.score", validation.quality_score, &[]);
    metrics.record(
        "quality.validation.errors",
        validation.error_count as f64,
        &[],
    );
    if validation.is_valid {
        info!("data validation passed");
    } else {
        warn!(
            error_count = validation.error_count,
            errors = ?validation.errors,
            "validation found issues"
        );
    }

    let files = write_artifacts(output_dir, &digest, &validation)?;
    Ok(GenerateOutcome {
        digest,
        validation,
        files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::TimeZone;
    use std::sync::Arc;

    #[test]
    fn assemble_stamps_date_from_clock() {
        let clock: SharedClock = Arc::new(FixedClock::utc(
            chrono::Utc.with_ymd_and_hms(2025, 10, 19, 8, 0, 0).unwrap(),
        ));
        let rec = SectionRecord::new(
            "weather",
            serde_json::json!({"location": "x"}),
            "2025-10-19T08:00:00".into(),
            "OpenWeather API",
        );
        let d = assemble(vec![rec], &clock);
        assert_eq!(d.date.as_deref(), Some("2025-10-19"));
        assert_eq!(d.generated_at.as_deref(), Some("2025-10-19T08:00:00.000000"));
        assert_eq!(d.sections().len(), 1);
        assert_eq!(d.sections()[0].source.as_deref(), Some("OpenWeather API"));
    }

    #[test]
    fn offline_config_uses_mock_providers() {
        let cfg = AppConfig {
            offline: true,
            openweather_api_key: Some("k".into()),
            ..AppConfig::default()
        };
        let names: Vec<&str> = default_providers(&cfg, crate::clock::system())
            .iter()
            .map(|p| p.name())
            .collect();
        assert_eq!(names, vec!["weather", "sports", "tech", "market"]);
    }
}
