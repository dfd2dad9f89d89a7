//! Static HTML page for a digest. All text pulled from section data is escaped.

use html_escape::encode_text;
use serde_json::{Map, Value};

use crate::digest::{DigestAggregate, Payload};
use crate::fetch::weather::icon_emoji;
use crate::validate::ValidationSummary;

type Obj = Map<String, Value>;

const STYLE: &str = r#"
        * { margin: 0; padding: 0; box-sizing: border-box; }
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
            min-height: 100vh;
            padding: 20px;
        }
        .container { max-width: 1200px; margin: 0 auto; }
        header { text-align: center; color: white; margin-bottom: 40px; }
        h1 { font-size: 3em; margin-bottom: 10px; text-shadow: 2px 2px 4px rgba(0,0,0,0.3); }
        .subtitle { font-size: 1.2em; opacity: 0.9; }
        .timestamp { font-size: 0.9em; opacity: 0.7; margin-top: 10px; }
        .banner { border-radius: 8px; padding: 12px 16px; margin-bottom: 24px; color: #333; }
        .banner.ok { background: #dcfce7; }
        .banner.warn { background: #fef3c7; }
        .grid {
            display: grid;
            grid-template-columns: repeat(auto-fit, minmax(300px, 1fr));
            gap: 20px;
            margin-bottom: 40px;
        }
        .card { background: white; border-radius: 12px; padding: 24px; box-shadow: 0 10px 30px rgba(0,0,0,0.2); }
        .card-title { font-size: 1.5em; margin-bottom: 16px; color: #667eea; }
        .card-content { color: #333; line-height: 1.6; }
        .item { margin: 12px 0; padding: 10px; background: #f8f9fa; border-radius: 6px; }
        .error { color: #b91c1c; }
        .positive { color: #22c55e; }
        .negative { color: #ef4444; }
        footer { text-align: center; color: white; margin-top: 40px; opacity: 0.8; }
        @media (max-width: 768px) { h1 { font-size: 2em; } .grid { grid-template-columns: 1fr; } }
"#;

/// Full page. `validation` adds the quality banner when present.
pub fn render_html(digest: &DigestAggregate, validation: Option<&ValidationSummary>) -> String {
    let date = esc(digest.date.as_deref().unwrap_or("unknown date"));
    let generated = esc(digest.generated_at.as_deref().unwrap_or("unknown"));
    let banner = validation.map(render_banner).unwrap_or_default();
    let empty = Obj::new();

    let weather = section_data(digest, "weather").unwrap_or(&empty);
    let sports = section_data(digest, "sports").unwrap_or(&empty);
    let tech = section_data(digest, "tech").unwrap_or(&empty);
    let market = section_data(digest, "market").unwrap_or(&empty);

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Daily Digest - {date}</title>
    <meta name="description" content="Your personalized daily digest of weather, sports, tech news, and markets">
    <style>{STYLE}    </style>
</head>
<body>
    <div class="container">
        <header>
            <h1>Daily Digest</h1>
            <div class="subtitle">{date}</div>
            <div class="timestamp">Last updated: {generated}</div>
        </header>
        {banner}
        <div class="grid">
{weather_card}
{sports_card}
{tech_card}
{market_card}
        </div>
        <footer>
            <p>Generated by daily-digest</p>
        </footer>
    </div>
</body>
</html>
"#,
        weather_card = weather_card(weather),
        sports_card = sports_card(sports),
        tech_card = tech_card(tech),
        market_card = market_card(market),
    )
}

fn render_banner(v: &ValidationSummary) -> String {
    if v.is_valid {
        return format!(
            r#"<div class="banner ok">Data quality score: {:.2}. All checks passed.</div>"#,
            v.quality_score
        );
    }
    let items: String = v
        .errors
        .iter()
        .map(|e| format!("<li>{}</li>", esc(e)))
        .collect();
    format!(
        r#"<div class="banner warn">Data quality score: {:.2}. {} issue(s) found:<ul>{items}</ul></div>"#,
        v.quality_score, v.error_count
    )
}

fn section_data<'a>(digest: &'a DigestAggregate, name: &str) -> Option<&'a Obj> {
    digest
        .section(name)
        .and_then(|s| s.data.as_ref())
        .and_then(Payload::as_mapping)
}

fn card(title: &str, body: &str) -> String {
    format!(
        r#"            <div class="card">
                <h2 class="card-title">{title}</h2>
                <div class="card-content">{body}</div>
            </div>"#
    )
}

fn error_note(data: &Obj, what: &str) -> String {
    match data.get("error") {
        Some(e) => format!(
            r#"<p class="error">Error loading {what}: {}</p>"#,
            text(Some(e), "unknown error")
        ),
        None => String::new(),
    }
}

fn weather_card(data: &Obj) -> String {
    let Some(current) = data.get("current").and_then(Value::as_object) else {
        let body = match data.get("error") {
            Some(_) => error_note(data, "weather data"),
            None => "<p>No weather data available</p>".to_string(),
        };
        return card("Weather", &body);
    };

    let forecast: String = list(data, "forecast")
        .iter()
        .take(5)
        .filter_map(Value::as_object)
        .map(|d| {
            format!(
                r#"<div class="item">{}: {}&deg;F - {}</div>"#,
                text(d.get("date"), ""),
                text(d.get("temp"), ""),
                text(d.get("description"), "")
            )
        })
        .collect();
    let icon = current.get("icon").and_then(Value::as_str).unwrap_or_default();

    let body = format!(
        r#"<h3 style="font-size: 2em;">{} {}&deg;F</h3>
                <p>{}</p>
                <p>Feels like: {}&deg;F | Humidity: {}%</p>
                <h4 style="margin-top: 16px;">5-Day Forecast:</h4>
                {forecast}"#,
        icon_emoji(icon),
        text(current.get("temp"), "N/A"),
        text(current.get("description"), "No data"),
        text(current.get("feels_like"), "N/A"),
        text(current.get("humidity"), "N/A"),
    );
    card("Weather", &body)
}

fn sports_card(data: &Obj) -> String {
    let teams: String = list(data, "teams")
        .iter()
        .filter_map(Value::as_object)
        .map(|t| {
            format!(
                r#"<div class="item"><strong>{}</strong> ({})<br>Record: {}<br>Latest: {}<br>Next: {}</div>"#,
                text(t.get("name"), "Unknown"),
                text(t.get("league"), ""),
                text(t.get("record"), "N/A"),
                text(t.get("latest_game"), "No recent games"),
                text(t.get("next_game"), "No upcoming games"),
            )
        })
        .collect();
    let body = if teams.is_empty() {
        format!("{}<p>No sports data available</p>", error_note(data, "sports data"))
    } else {
        format!("{}{teams}", error_note(data, "sports data"))
    };
    card("Sports", &body)
}

fn tech_card(data: &Obj) -> String {
    let articles: String = list(data, "articles")
        .iter()
        .take(5)
        .filter_map(Value::as_object)
        .map(|a| {
            let published: String = text(a.get("published_at"), "").chars().take(10).collect();
            let url = a.get("url").and_then(Value::as_str).unwrap_or("#");
            format!(
                r#"<div class="item"><strong><a href="{}">{}</a></strong><br><small>{} &bull; {published}</small></div>"#,
                html_escape::encode_double_quoted_attribute(url),
                text(a.get("title"), "No title"),
                text(a.get("source"), "Unknown source"),
            )
        })
        .collect();
    let body = if articles.is_empty() {
        format!("{}<p>No tech news available</p>", error_note(data, "tech news"))
    } else {
        format!("{}{articles}", error_note(data, "tech news"))
    };
    card("Tech News", &body)
}

fn market_card(data: &Obj) -> String {
    let summary = text(data.get("market_summary"), "Market data unavailable");
    let indexes: String = list(data, "indexes")
        .iter()
        .filter_map(Value::as_object)
        .map(|i| {
            let positive = i.get("is_positive").and_then(Value::as_bool).unwrap_or(false);
            let pct = i.get("change_percent").and_then(Value::as_f64).unwrap_or(0.0);
            format!(
                r#"<div class="item" style="display: flex; justify-content: space-between;"><span>{}</span><span class="{}">{} ({pct:+.2}%)</span></div>"#,
                text(i.get("name"), "Unknown"),
                if positive { "positive" } else { "negative" },
                text(i.get("value"), "0"),
            )
        })
        .collect();
    let indexes = if indexes.is_empty() {
        "<p>No market data available</p>".to_string()
    } else {
        indexes
    };
    let body = format!(
        r#"{}<p style="margin-bottom: 16px;"><em>{summary}</em></p>{indexes}"#,
        error_note(data, "market data")
    );
    card("Markets", &body)
}

fn list<'a>(data: &'a Obj, key: &str) -> &'a [Value] {
    data.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// Escaped display text for a JSON scalar; `default` for null or absent.
fn text(v: Option<&Value>, default: &str) -> String {
    match v {
        None | Some(Value::Null) => esc(default),
        Some(Value::String(s)) => esc(s),
        Some(other) => esc(&other.to_string()),
    }
}

fn esc(s: &str) -> String {
    encode_text(s).into_owned()
}
