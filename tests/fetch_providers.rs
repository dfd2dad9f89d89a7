use std::collections::HashMap;
use std::sync::Arc;

use axum::{extract::Query, http::StatusCode, routing::get, Json, Router};
use chrono::{TimeZone, Utc};
use daily_digest::clock::{FixedClock, SharedClock};
use daily_digest::fetch::market::MarketProvider;
use daily_digest::fetch::sports::SportsProvider;
use daily_digest::fetch::tech_news::{self, FeedLoader, TechNewsProvider};
use daily_digest::fetch::weather::{self, WeatherProvider};
use daily_digest::fetch::SectionProvider;
use serde_json::{json, Value};

const TECHCRUNCH: &str = include_str!("fixtures/techcrunch_rss.xml");
const THE_VERGE: &str = include_str!("fixtures/theverge_atom.xml");

fn clock() -> SharedClock {
    Arc::new(FixedClock::utc(
        Utc.with_ymd_and_hms(2025, 10, 19, 12, 0, 0).unwrap(),
    ))
}

/// Serves feed bodies by target; targets it does not know fail like a dead host.
struct FixtureLoader(HashMap<&'static str, &'static str>);

#[async_trait::async_trait]
impl FeedLoader for FixtureLoader {
    async fn load(&self, outlet: &str, target: &str) -> anyhow::Result<String> {
        match self.0.get(target) {
            Some(body) => Ok(body.to_string()),
            None => anyhow::bail!("{outlet}: connection refused"),
        }
    }
}

fn fixture_provider(limit: usize, feeds: &[(&str, &str)]) -> TechNewsProvider {
    let loader = FixtureLoader(HashMap::from([
        ("techcrunch", TECHCRUNCH),
        ("theverge", THE_VERGE),
        ("broken", "<rss><oops"),
    ]));
    TechNewsProvider::with_loader(
        topics(),
        limit,
        feeds
            .iter()
            .map(|(outlet, target)| (outlet.to_string(), target.to_string()))
            .collect(),
        Arc::new(loader),
        clock(),
    )
}

fn topics() -> Vec<String> {
    vec![
        "AI".into(),
        "machine learning".into(),
        "artificial intelligence".into(),
    ]
}

#[tokio::test]
async fn seeded_mocks_are_deterministic() {
    let teams = vec!["49ers".to_string(), "Sharks".into(), "Warriors".into()];
    let a = SportsProvider::new(teams.clone(), Some(42), clock()).fetch().await.unwrap();
    let b = SportsProvider::new(teams, Some(42), clock()).fetch().await.unwrap();
    assert_eq!(a, b);

    let syms = vec!["^GSPC".to_string(), "^IXIC".into(), "^DJI".into()];
    let a = MarketProvider::new(syms.clone(), Some(7), clock()).fetch().await.unwrap();
    let b = MarketProvider::new(syms, Some(7), clock()).fetch().await.unwrap();
    assert_eq!(a, b);
}

#[tokio::test]
async fn sports_mock_shape() {
    let rec = SportsProvider::new(vec!["Warriors".into(), "Giants".into()], Some(1), clock())
        .fetch()
        .await
        .unwrap();
    assert_eq!(rec.name, "sports");
    assert_eq!(rec.source, "Mock Sports Data");
    assert_eq!(rec.timestamp, "2025-10-19T12:00:00.000000");

    let teams = rec.data["teams"].as_array().unwrap();
    assert_eq!(teams.len(), 2);
    assert_eq!(teams[0]["league"], "NBA");
    assert_eq!(teams[0]["name"], "Golden State Warriors");
    assert_eq!(teams[1]["league"], "Unknown");
    assert!(teams[1]["latest_game"].as_str().unwrap().contains("vs Opponent"));

    // NBA scores stay in basketball range.
    let latest = teams[0]["latest_game"].as_str().unwrap();
    let score: u32 = latest[2..].split('-').next().unwrap().parse().unwrap();
    assert!((85..=120).contains(&score));
}

#[tokio::test]
async fn market_mock_shape() {
    let rec = MarketProvider::new(vec!["^GSPC".into(), "^IXIC".into()], Some(3), clock())
        .fetch()
        .await
        .unwrap();
    assert_eq!(rec.source, "Alpha Vantage API (mock)");
    let idx = rec.data["indexes"].as_array().unwrap();
    assert_eq!(idx[0]["name"], "S&P 500");
    assert_eq!(idx[1]["symbol"], "^IXIC");
    assert!(rec.data["market_summary"].as_str().unwrap().len() > 20);
}

#[tokio::test]
async fn weather_mock_has_live_shape() {
    let rec = WeatherProvider::mock("San Jose,US", Some(5), clock())
        .fetch()
        .await
        .unwrap();
    assert_eq!(rec.source, weather::MOCK_SOURCE);
    assert_eq!(rec.data["location"], "San Jose,US");
    assert!(rec.data["current"]["temp"].is_number());
    let forecast = rec.data["forecast"].as_array().unwrap();
    assert_eq!(forecast.len(), 5);
    assert_eq!(forecast[0]["date"], "2025-10-20");
}

#[tokio::test]
async fn tech_fixtures_filter_by_topic_across_rss_and_atom() {
    let p = fixture_provider(5, &[("TechCrunch", "techcrunch"), ("The Verge", "theverge")]);
    let rec = p.fetch().await.unwrap();
    assert_eq!(rec.source, tech_news::SOURCE);

    let articles = rec.data["articles"].as_array().unwrap();
    let titles: Vec<&str> = articles.iter().map(|a| a["title"].as_str().unwrap()).collect();
    assert_eq!(
        titles,
        vec![
            "OpenAI ships a smaller reasoning model",
            "Startup raises $40M for machine learning chips",
            "Google brings Gemini to more cars",
        ]
    );
    assert_eq!(
        articles[0]["summary"],
        "The new model targets AI agents running on laptops."
    );
    assert_eq!(articles[1]["published_at"], "2025-10-19T00:30:00Z");
    assert_eq!(articles[2]["source"], "The Verge");
    assert_eq!(articles[2]["url"], "https://www.theverge.com/news/gemini-cars");
    assert_eq!(articles[2]["published_at"], "2025-10-19T11:00:00Z");
}

#[tokio::test]
async fn tech_stops_at_limit() {
    let p = fixture_provider(1, &[("TechCrunch", "techcrunch"), ("The Verge", "theverge")]);
    let rec = p.fetch().await.unwrap();
    assert_eq!(rec.data["articles"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn tech_single_feed_failure_is_tolerated() {
    let p = fixture_provider(5, &[("TechCrunch", "unreachable"), ("The Verge", "theverge")]);
    let rec = p.fetch().await.unwrap();
    assert_eq!(rec.source, tech_news::SOURCE);
    assert!(rec.error().is_none());
    assert_eq!(rec.data["articles"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn tech_all_feeds_failing_falls_back_to_mock() {
    let p = fixture_provider(3, &[("TechCrunch", "unreachable"), ("Wired", "broken")]).with_seed(9);
    let rec = p.fetch().await.unwrap();
    assert_eq!(rec.source, tech_news::FALLBACK_SOURCE);
    assert!(rec.error().is_some());
    assert_eq!(rec.data["articles"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn tech_offline_mock() {
    let rec = TechNewsProvider::mock(topics(), 5, clock())
        .with_seed(1)
        .fetch()
        .await
        .unwrap();
    assert_eq!(rec.source, tech_news::MOCK_SOURCE);
    let articles = rec.data["articles"].as_array().unwrap();
    assert_eq!(articles.len(), 5);
    assert_eq!(articles[0]["url"], "https://example.com/article-1");
}

// --- weather against a local stand-in for the OpenWeather API ---

async fn current(Query(q): Query<HashMap<String, String>>) -> Result<Json<Value>, StatusCode> {
    if q.get("appid").map(String::as_str) != Some("test-key") {
        return Err(StatusCode::UNAUTHORIZED);
    }
    assert_eq!(q.get("units").map(String::as_str), Some("imperial"));
    Ok(Json(json!({
        "name": "San Jose",
        "main": { "temp": 71.26, "feels_like": 70.04, "humidity": 40 },
        "weather": [{ "description": "clear sky", "icon": "01d" }],
        "wind": { "speed": 5.66 }
    })))
}

async fn forecast() -> Json<Value> {
    let list: Vec<Value> = (0..40)
        .map(|i: u32| {
            let h = i * 3;
            json!({
                "dt_txt": format!("2025-10-{:02} {:02}:00:00", 20 + h / 24, h % 24),
                "main": { "temp": 60.0 + f64::from(i) },
                "weather": [{ "description": "few clouds", "icon": "02d" }]
            })
        })
        .collect();
    Json(json!({ "list": list }))
}

async fn spawn_openweather() -> String {
    let app = Router::new()
        .route("/weather", get(current))
        .route("/forecast", get(forecast));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn weather_live_parses_current_and_forecast() {
    let base = spawn_openweather().await;
    let rec = WeatherProvider::with_base_url("test-key", "San Jose,US", base, clock())
        .fetch()
        .await
        .unwrap();

    assert_eq!(rec.source, "OpenWeather API");
    assert_eq!(rec.data["location"], "San Jose");
    assert_eq!(rec.data["current"]["temp"], 71.3);
    assert_eq!(rec.data["current"]["description"], "Clear sky");
    assert_eq!(rec.data["current"]["wind_speed"], 5.7);
    let fc = rec.data["forecast"].as_array().unwrap();
    assert_eq!(fc.len(), 5);
    assert_eq!(fc[0]["temp"], 64.0);
}

#[tokio::test]
async fn weather_http_error_yields_failed_record() {
    let base = spawn_openweather().await;
    let rec = WeatherProvider::with_base_url("wrong", "San Jose,US", base, clock())
        .fetch()
        .await
        .unwrap();
    assert_eq!(rec.source, "OpenWeather API (failed)");
    assert_eq!(rec.data["location"], "San Jose,US");
    assert!(rec.error().unwrap().contains("401"));
}
