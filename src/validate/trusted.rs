//! # Trusted sources
//!
//! Static allow-list of data providers per section type.
//!
//! - Lookup by section type is case-insensitive.
//! - A source is trusted when it *contains* one of the listed phrases
//!   (case-insensitive), so "OpenWeather API (failed)" still matches
//!   "OpenWeather API".
//! - Unknown section types have no list; callers skip the check.

const WEATHER: &[&str] = &[
    "OpenWeather API",
    "Weather.com",
    "National Weather Service",
    "NOAA",
];

const SPORTS: &[&str] = &[
    "ESPN API",
    "The Sports DB",
    "Official team websites",
    "NBA.com",
    "NFL.com",
    "NHL.com",
    "Mock Sports Data",
];

const TECH: &[&str] = &[
    "TechCrunch",
    "The Verge",
    "Ars Technica",
    "Wired",
    "MIT Technology Review",
    "VentureBeat",
    "News API",
    "RSS Feeds",
];

const MARKET: &[&str] = &[
    "Alpha Vantage",
    "Yahoo Finance",
    "Bloomberg",
    "Reuters",
    "MarketWatch",
    "Alpha Vantage API",
];

/// Trusted phrases for a section type; empty when the type is unknown.
pub fn trusted_sources(section_type: &str) -> &'static [&'static str] {
    match section_type.to_lowercase().as_str() {
        "weather" => WEATHER,
        "sports" => SPORTS,
        "tech" => TECH,
        "market" => MARKET,
        _ => &[],
    }
}

/// True when any trusted phrase is a case-insensitive substring of `source`.
pub fn is_trusted(source: &str, trusted: &[&str]) -> bool {
    let s = source.to_lowercase();
    trusted.iter().any(|t| s.contains(&t.to_lowercase()))
}
