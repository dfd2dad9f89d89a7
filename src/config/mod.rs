// src/config/mod.rs
//! Process configuration read from the environment (`.env` is loaded by the
//! binary before this runs).

pub mod validation;

use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;

pub const DEFAULT_LOCATION: &str = "San Jose,US";
pub const DEFAULT_LOG_LEVEL: &str = "INFO";
pub const DEFAULT_OUTPUT_DIR: &str = "docs";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Weather falls back to mock data when absent.
    pub openweather_api_key: Option<String>,
    pub sports_api_key: Option<String>,
    pub news_api_key: Option<String>,
    pub finance_api_key: Option<String>,
    pub default_location: String,
    pub log_level: String,
    pub output_dir: PathBuf,
    /// Force mock providers; no network.
    pub offline: bool,
    pub content: ContentConfig,
}

/// What each section asks its provider for.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentConfig {
    /// league key (`nfl`, `nhl`, `nba`) → team
    pub sports_teams: BTreeMap<String, String>,
    pub tech_topics: Vec<String>,
    pub market_indexes: Vec<String>,
    pub tech_limit: usize,
}

impl Default for ContentConfig {
    fn default() -> Self {
        let sports_teams = [("nfl", "49ers"), ("nhl", "Sharks"), ("nba", "Warriors")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            sports_teams,
            tech_topics: vec![
                "AI".into(),
                "machine learning".into(),
                "artificial intelligence".into(),
            ],
            market_indexes: vec!["^GSPC".into(), "^IXIC".into(), "^DJI".into()],
            tech_limit: 5,
        }
    }
}

impl ContentConfig {
    /// Teams in league order nfl, nhl, nba, then any extra leagues.
    pub fn teams(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.sports_teams.len());
        for league in ["nfl", "nhl", "nba"] {
            if let Some(t) = self.sports_teams.get(league) {
                out.push(t.clone());
            }
        }
        for (league, team) in &self.sports_teams {
            if !matches!(league.as_str(), "nfl" | "nhl" | "nba") {
                out.push(team.clone());
            }
        }
        out
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            openweather_api_key: None,
            sports_api_key: None,
            news_api_key: None,
            finance_api_key: None,
            default_location: DEFAULT_LOCATION.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            offline: false,
            content: ContentConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            openweather_api_key: non_empty_var("OPENWEATHER_API_KEY"),
            sports_api_key: non_empty_var("SPORTS_API_KEY"),
            news_api_key: non_empty_var("NEWS_API_KEY"),
            finance_api_key: non_empty_var("FINANCE_API_KEY"),
            default_location: non_empty_var("DEFAULT_LOCATION").unwrap_or(d.default_location),
            log_level: non_empty_var("LOG_LEVEL").unwrap_or(d.log_level),
            output_dir: non_empty_var("DIGEST_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(d.output_dir),
            offline: env_flag("DIGEST_OFFLINE"),
            content: d.content,
        }
    }

    /// `tracing` filter directive derived from `log_level` ("WARNING" → "warn").
    pub fn log_filter(&self) -> String {
        match self.log_level.trim().to_ascii_lowercase().as_str() {
            "warning" => "warn".to_string(),
            "critical" | "fatal" => "error".to_string(),
            "" => "info".to_string(),
            other => other.to_string(),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_flag(key: &str) -> bool {
    env::var(key)
        .ok()
        .is_some_and(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn teams_follow_league_order() {
        let c = ContentConfig::default();
        assert_eq!(c.teams(), vec!["49ers", "Sharks", "Warriors"]);
    }

    #[test]
    fn log_filter_maps_python_style_levels() {
        let mut c = AppConfig::default();
        assert_eq!(c.log_filter(), "info");
        c.log_level = "WARNING".into();
        assert_eq!(c.log_filter(), "warn");
        c.log_level = "critical".into();
        assert_eq!(c.log_filter(), "error");
    }

    #[serial_test::serial]
    #[test]
    fn from_env_reads_overrides_and_flags() {
        env::set_var("DEFAULT_LOCATION", "London,UK");
        env::set_var("DIGEST_OFFLINE", "1");
        env::set_var("OPENWEATHER_API_KEY", "  ");
        let c = AppConfig::from_env();
        assert_eq!(c.default_location, "London,UK");
        assert!(c.offline);
        assert!(c.openweather_api_key.is_none());
        env::remove_var("DEFAULT_LOCATION");
        env::remove_var("DIGEST_OFFLINE");
        env::remove_var("OPENWEATHER_API_KEY");

        let c = AppConfig::from_env();
        assert_eq!(c.default_location, DEFAULT_LOCATION);
        assert!(!c.offline);
    }
}
