//! Run metrics for one digest generation, plus the Prometheus exporter.
//!
//! [`MetricsCollector`] keeps every data point in memory for the
//! `metrics.json` artifact and mirrors each one to the `metrics` facade, so a
//! process with an installed recorder also exposes them on `/metrics`.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local, SecondsFormat};
use metrics::{counter, gauge, histogram, Label};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::Serialize;

/// Single data point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub name: String,
    pub value: f64,
    pub timestamp: String,
    pub tags: BTreeMap<String, String>,
}

/// What ends up in `metrics.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub generation_id: String,
    pub start_time: String,
    pub end_time: String,
    pub total_duration_ms: f64,
    pub success: bool,
    /// tool → last recorded duration
    pub tool_durations: BTreeMap<String, f64>,
    pub data_freshness_hours: f64,
    pub source_reliability_score: f64,
    pub completeness_score: f64,
    pub tool_errors: u64,
    pub retry_attempts: u64,
    pub all_metrics: Vec<Metric>,
}

#[derive(Debug)]
pub struct MetricsCollector {
    generation_id: String,
    start_time: DateTime<Local>,
    started: Instant,
    metrics: Vec<Metric>,
    timers: HashMap<String, Instant>,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    /// Id derived from the start time: `digest-YYYYMMDD-HHMMSS`.
    pub fn new() -> Self {
        let start_time = Local::now();
        let id = format!("digest-{}", start_time.format("%Y%m%d-%H%M%S"));
        Self {
            start_time,
            ..Self::with_generation_id(id)
        }
    }

    pub fn with_generation_id(id: impl Into<String>) -> Self {
        Self {
            generation_id: id.into(),
            start_time: Local::now(),
            started: Instant::now(),
            metrics: Vec::new(),
            timers: HashMap::new(),
        }
    }

    pub fn generation_id(&self) -> &str {
        &self.generation_id
    }

    pub fn record(&mut self, name: &str, value: f64, tags: &[(&str, &str)]) {
        mirror(name, value, tags, false);
        self.push(name, value, tags);
    }

    /// Counter bump: records `1.0`.
    pub fn increment(&mut self, name: &str, tags: &[(&str, &str)]) {
        mirror(name, 1.0, tags, true);
        self.push(name, 1.0, tags);
    }

    pub fn start_timer(&mut self, name: &str) {
        self.timers.insert(name.to_string(), Instant::now());
    }

    /// Records `<name>.duration_ms` and returns the duration.
    pub fn stop_timer(&mut self, name: &str, tags: &[(&str, &str)]) -> Result<f64> {
        let started = self
            .timers
            .remove(name)
            .ok_or_else(|| anyhow!("Timer '{name}' was not started"))?;
        let ms = started.elapsed().as_secs_f64() * 1_000.0;
        self.record(&format!("{name}.duration_ms"), ms, tags);
        Ok(ms)
    }

    /// All metrics, or only those named `name`.
    pub fn get_metrics(&self, name: Option<&str>) -> Vec<&Metric> {
        self.metrics
            .iter()
            .filter(|m| name.map_or(true, |n| m.name == n))
            .collect()
    }

    /// Mean of `name`, `0.0` when never recorded.
    pub fn average(&self, name: &str) -> f64 {
        let v = self.get_metrics(Some(name));
        if v.is_empty() {
            return 0.0;
        }
        v.iter().map(|m| m.value).sum::<f64>() / v.len() as f64
    }

    pub fn total(&self, name: &str) -> f64 {
        self.get_metrics(Some(name)).iter().map(|m| m.value).sum()
    }

    pub fn summary(&self, success: bool) -> MetricsSummary {
        let end_time = Local::now();
        let tool_durations = self
            .metrics
            .iter()
            .filter(|m| m.name.ends_with(".duration_ms"))
            .filter(|m| m.tags.get("type").is_some_and(|t| t.contains("tool")))
            .map(|m| {
                let tool = m.tags.get("tool").cloned().unwrap_or_else(|| "unknown".into());
                (tool, m.value)
            })
            .collect();

        MetricsSummary {
            generation_id: self.generation_id.clone(),
            start_time: self.start_time.to_rfc3339_opts(SecondsFormat::Micros, false),
            end_time: end_time.to_rfc3339_opts(SecondsFormat::Micros, false),
            total_duration_ms: self.started.elapsed().as_secs_f64() * 1_000.0,
            success,
            tool_durations,
            data_freshness_hours: self.average("quality.data_freshness.hours"),
            source_reliability_score: self.average("quality.source_reliability.score"),
            completeness_score: self.average("quality.completeness.score"),
            tool_errors: self.total("tool.error") as u64,
            retry_attempts: self.total("generation.retry") as u64,
            all_metrics: self.metrics.clone(),
        }
    }

    /// Write the summary as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path, success: bool) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        }
        let body = serde_json::to_string_pretty(&self.summary(success))
            .context("serializing metrics summary")?;
        fs::write(path, body).with_context(|| format!("writing metrics to {}", path.display()))
    }

    fn push(&mut self, name: &str, value: f64, tags: &[(&str, &str)]) {
        self.metrics.push(Metric {
            name: name.to_string(),
            value,
            timestamp: Local::now().to_rfc3339_opts(SecondsFormat::Micros, false),
            tags: tags
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        });
    }
}

impl fmt::Display for MetricsCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.summary(true);
        writeln!(f, "Metrics Summary for {}:", s.generation_id)?;
        writeln!(f, "  Duration: {:.0}ms", s.total_duration_ms)?;
        writeln!(f, "  Quality Score: {:.2}", s.completeness_score)?;
        write!(f, "  Errors: {}", s.tool_errors)
    }
}

/// Dotted names become Prometheus-style snake case.
pub fn prometheus_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn mirror(name: &str, value: f64, tags: &[(&str, &str)], is_counter: bool) {
    let key = prometheus_name(name);
    let labels: Vec<Label> = tags
        .iter()
        .map(|(k, v)| Label::new(k.to_string(), v.to_string()))
        .collect();
    if is_counter {
        counter!(format!("{key}_total"), labels).increment(value as u64);
    } else if name.ends_with(".duration_ms") {
        histogram!(key, labels).record(value);
    } else {
        gauge!(key, labels).set(value);
    }
}

/// Install the global Prometheus recorder. Fails if one is already installed.
pub fn install_prometheus() -> Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .context("prometheus: install recorder")
}
