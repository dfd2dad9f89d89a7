// src/fetch/mod.rs
//! Section providers: one per digest section, all behind [`SectionProvider`].

pub mod market;
pub mod sports;
pub mod tech_news;
pub mod weather;

use anyhow::Result;
use metrics::{describe_counter, describe_histogram};
use once_cell::sync::OnceCell;
use serde::Serialize;
use serde_json::{json, Value};

use crate::clock::Clock;
use crate::digest::Section;
use crate::metrics::MetricsCollector;

/// What a provider hands back: `{name, data, timestamp, source}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionRecord {
    pub name: String,
    pub data: Value,
    pub timestamp: String,
    pub source: String,
}

impl SectionRecord {
    pub fn new(name: &str, data: Value, timestamp: String, source: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            data,
            timestamp,
            source: source.into(),
        }
    }

    /// Provider error surfaced inside `data.error`, if any.
    pub fn error(&self) -> Option<&str> {
        self.data.get("error").and_then(Value::as_str)
    }

    pub fn into_section(self) -> Section {
        Section::new(self.name)
            .with_data(self.data)
            .with_timestamp(self.timestamp)
            .with_source(self.source)
    }
}

#[async_trait::async_trait]
pub trait SectionProvider: Send + Sync {
    /// Section name, e.g. "weather".
    fn name(&self) -> &'static str;
    /// Provider label used when the fetch itself fails.
    fn source_label(&self) -> &'static str;
    /// Tool name used for metric tags, e.g. "get_weather".
    fn tool(&self) -> &'static str;
    async fn fetch(&self) -> Result<SectionRecord>;
}

/// Local timestamp with microseconds, no offset (`2025-10-19T08:00:00.123456`).
pub fn iso_now(clock: &dyn Clock) -> String {
    clock
        .now()
        .naive_local()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("tool_error_total", "Section provider failures.");
        describe_histogram!("tool_duration_ms", "Section provider fetch time in milliseconds.");
    });
}

/// Run every provider in order. A failing provider still yields a section,
/// carrying the error and a `(failed)` source.
pub async fn fetch_all(
    providers: &[Box<dyn SectionProvider>],
    clock: &dyn Clock,
    metrics: &mut MetricsCollector,
) -> Vec<SectionRecord> {
    ensure_metrics_described();

    let mut out = Vec::with_capacity(providers.len());
    for p in providers {
        let timer = format!("tool.{}", p.tool());
        let tags = [("tool", p.tool()), ("type", "tool")];
        metrics.start_timer(&timer);

        let result = p.fetch().await;
        let duration_ms = metrics.stop_timer(&timer, &tags).unwrap_or_default();

        let record = match result {
            Ok(r) => {
                if let Some(err) = r.error() {
                    tracing::warn!(section = p.name(), error = err, "provider degraded");
                    metrics.increment("tool.error", &[("tool", p.tool())]);
                } else {
                    tracing::info!(section = p.name(), source = %r.source, duration_ms, "section fetched");
                }
                r
            }
            Err(e) => {
                tracing::warn!(error = ?e, section = p.name(), "provider error");
                metrics.increment("tool.error", &[("tool", p.tool())]);
                SectionRecord::new(
                    p.name(),
                    json!({ "error": format!("{e:#}") }),
                    iso_now(clock),
                    format!("{} (failed)", p.source_label()),
                )
            }
        };
        out.push(record);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::TimeZone;

    struct Broken;

    #[async_trait::async_trait]
    impl SectionProvider for Broken {
        fn name(&self) -> &'static str {
            "weather"
        }
        fn source_label(&self) -> &'static str {
            "OpenWeather API"
        }
        fn tool(&self) -> &'static str {
            "get_weather"
        }
        async fn fetch(&self) -> Result<SectionRecord> {
            anyhow::bail!("connection refused")
        }
    }

    #[tokio::test]
    async fn failing_provider_becomes_failed_section() {
        let clock = FixedClock::utc(chrono::Utc.with_ymd_and_hms(2025, 10, 19, 8, 0, 0).unwrap());
        let mut m = MetricsCollector::new();
        let providers: Vec<Box<dyn SectionProvider>> = vec![Box::new(Broken)];
        let out = fetch_all(&providers, &clock, &mut m).await;

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].source, "OpenWeather API (failed)");
        assert_eq!(out[0].error(), Some("connection refused"));
        assert_eq!(out[0].timestamp, "2025-10-19T08:00:00.000000");
        assert_eq!(m.total("tool.error"), 1.0);
        assert_eq!(m.get_metrics(Some("tool.get_weather.duration_ms")).len(), 1);
    }
}
