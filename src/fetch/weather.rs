// src/fetch/weather.rs
use std::collections::HashSet;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Duration as ChronoDuration;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{iso_now, SectionProvider, SectionRecord};
use crate::clock::SharedClock;

pub const SOURCE: &str = "OpenWeather API";
pub const MOCK_SOURCE: &str = "OpenWeather API (mock)";
pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
const FORECAST_DAYS: usize = 5;

#[derive(Debug, Deserialize)]
struct Current {
    name: Option<String>,
    main: Main,
    weather: Vec<Condition>,
    #[serde(default)]
    wind: Option<Wind>,
}

#[derive(Debug, Deserialize)]
struct Main {
    temp: f64,
    #[serde(default)]
    feels_like: f64,
    #[serde(default)]
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct Wind {
    #[serde(default)]
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct Forecast {
    list: Vec<ForecastEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ForecastEntry {
    /// "2025-10-19 12:00:00"
    pub dt_txt: String,
    main: Main,
    weather: Vec<Condition>,
}

pub struct WeatherProvider {
    location: String,
    clock: SharedClock,
    mode: Mode,
}

enum Mode {
    Live {
        client: reqwest::Client,
        api_key: String,
        base_url: String,
    },
    Mock {
        seed: Option<u64>,
    },
}

impl WeatherProvider {
    pub fn live(api_key: impl Into<String>, location: impl Into<String>, clock: SharedClock) -> Self {
        Self::with_base_url(api_key, location, DEFAULT_BASE_URL, clock)
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        location: impl Into<String>,
        base_url: impl Into<String>,
        clock: SharedClock,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            location: location.into(),
            clock,
            mode: Mode::Live {
                client,
                api_key: api_key.into(),
                base_url: base_url.into(),
            },
        }
    }

    /// Mock payload with the live shape; `seed` makes it deterministic.
    pub fn mock(location: impl Into<String>, seed: Option<u64>, clock: SharedClock) -> Self {
        Self {
            location: location.into(),
            clock,
            mode: Mode::Mock { seed },
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        client: &reqwest::Client,
        url: &str,
        api_key: &str,
        location: &str,
    ) -> Result<T> {
        client
            .get(url)
            .query(&[("q", location), ("appid", api_key), ("units", "imperial")])
            .send()
            .await
            .with_context(|| format!("weather http get {url}"))?
            .error_for_status()
            .with_context(|| format!("weather http status {url}"))?
            .json::<T>()
            .await
            .with_context(|| format!("weather json {url}"))
    }

    async fn fetch_live(
        &self,
        client: &reqwest::Client,
        api_key: &str,
        base_url: &str,
    ) -> Result<Value> {
        let base = base_url.trim_end_matches('/');
        let current: Current =
            Self::get_json(client, &format!("{base}/weather"), api_key, &self.location).await?;
        let forecast: Forecast =
            Self::get_json(client, &format!("{base}/forecast"), api_key, &self.location).await?;
        Ok(shape_live(&self.location, &current, &forecast.list))
    }

    fn mock_payload(&self, seed: Option<u64>) -> Value {
        let mut rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_os_rng(),
        };
        const CONDITIONS: &[(&str, &str)] = &[
            ("Clear sky", "01d"),
            ("Few clouds", "02d"),
            ("Scattered clouds", "03d"),
            ("Light rain", "10d"),
            ("Mist", "50d"),
        ];
        let today = self.clock.now().date_naive();

        let temp = round1(rng.random_range(55.0..80.0));
        let &(description, icon) = CONDITIONS.choose(&mut rng).unwrap_or(&CONDITIONS[0]);
        let forecast: Vec<Value> = (1..=FORECAST_DAYS as i64)
            .map(|d| {
                let &(desc, icon) = CONDITIONS.choose(&mut rng).unwrap_or(&CONDITIONS[0]);
                json!({
                    "date": (today + ChronoDuration::days(d)).format("%Y-%m-%d").to_string(),
                    "temp": round1(rng.random_range(50.0..85.0)),
                    "description": desc,
                    "icon": icon,
                })
            })
            .collect();

        json!({
            "location": self.location,
            "current": {
                "temp": temp,
                "feels_like": round1(temp + rng.random_range(-3.0..3.0)),
                "humidity": rng.random_range(30..90),
                "description": description,
                "icon": icon,
                "wind_speed": round1(rng.random_range(0.0..15.0)),
            },
            "forecast": forecast,
        })
    }
}

#[async_trait]
impl SectionProvider for WeatherProvider {
    fn name(&self) -> &'static str {
        "weather"
    }

    fn source_label(&self) -> &'static str {
        SOURCE
    }

    fn tool(&self) -> &'static str {
        "get_weather"
    }

    async fn fetch(&self) -> Result<SectionRecord> {
        tracing::info!(location = %self.location, "fetching weather");
        let ts = iso_now(self.clock.as_ref());
        match &self.mode {
            Mode::Mock { seed } => Ok(SectionRecord::new(
                self.name(),
                self.mock_payload(*seed),
                ts,
                MOCK_SOURCE,
            )),
            Mode::Live {
                client,
                api_key,
                base_url,
            } => match self.fetch_live(client, api_key, base_url).await {
                Ok(data) => Ok(SectionRecord::new(self.name(), data, ts, SOURCE)),
                Err(e) => {
                    tracing::error!(error = ?e, location = %self.location, "weather fetch failed");
                    Ok(SectionRecord::new(
                        self.name(),
                        json!({ "error": format!("{e:#}"), "location": self.location }),
                        ts,
                        format!("{SOURCE} (failed)"),
                    ))
                }
            },
        }
    }
}

fn shape_live(location: &str, current: &Current, forecast: &[ForecastEntry]) -> Value {
    let (description, icon) = current
        .weather
        .first()
        .map(|c| (capitalize(&c.description), c.icon.clone()))
        .unwrap_or_default();
    json!({
        "location": current.name.as_deref().unwrap_or(location),
        "current": {
            "temp": round1(current.main.temp),
            "feels_like": round1(current.main.feels_like),
            "humidity": current.main.humidity,
            "description": description,
            "icon": icon,
            "wind_speed": round1(current.wind.as_ref().map(|w| w.speed).unwrap_or_default()),
        },
        "forecast": pick_forecast(forecast),
    })
}

/// One reading per date, preferring 11:00-13:00. When that yields fewer than
/// five days, take every 8th entry instead (one per 24h at 3h resolution).
pub fn pick_forecast(entries: &[ForecastEntry]) -> Vec<Value> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for e in entries {
        let (date, hour) = split_dt(&e.dt_txt);
        if out.len() < FORECAST_DAYS && !seen.contains(date) && (11..=13).contains(&hour) {
            seen.insert(date.to_string());
            out.push(forecast_day(date, e));
        }
    }
    if out.len() >= FORECAST_DAYS {
        return out;
    }

    seen.clear();
    out.clear();
    for e in entries.iter().step_by(8) {
        let (date, _) = split_dt(&e.dt_txt);
        if out.len() < FORECAST_DAYS && seen.insert(date.to_string()) {
            out.push(forecast_day(date, e));
        }
    }
    out
}

fn forecast_day(date: &str, e: &ForecastEntry) -> Value {
    let (description, icon) = e
        .weather
        .first()
        .map(|c| (capitalize(&c.description), c.icon.clone()))
        .unwrap_or_default();
    json!({
        "date": date,
        "temp": round1(e.main.temp),
        "description": description,
        "icon": icon,
    })
}

fn split_dt(dt_txt: &str) -> (&str, u32) {
    let mut parts = dt_txt.split_whitespace();
    let date = parts.next().unwrap_or_default();
    let hour = parts
        .next()
        .and_then(|t| t.split(':').next())
        .and_then(|h| h.parse().ok())
        .unwrap_or(0);
    (date, hour)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Emoji for an OpenWeather icon code.
pub fn icon_emoji(code: &str) -> &'static str {
    match code {
        "01d" => "\u{2600}\u{fe0f}",
        "01n" => "\u{1f319}",
        "02d" => "\u{26c5}",
        "02n" | "03d" | "03n" | "04d" | "04n" => "\u{2601}\u{fe0f}",
        "09d" | "09n" | "10n" => "\u{1f327}\u{fe0f}",
        "10d" => "\u{1f326}\u{fe0f}",
        "11d" | "11n" => "\u{26c8}\u{fe0f}",
        "13d" | "13n" => "\u{2744}\u{fe0f}",
        "50d" | "50n" => "\u{1f32b}\u{fe0f}",
        _ => "\u{1f324}\u{fe0f}",
    }
}
