// src/fetch/tech_news.rs
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, SecondsFormat, Utc};
use metrics::{counter, histogram};
use once_cell::sync::OnceCell;
use quick_xml::de::from_str;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::{OffsetDateTime, UtcOffset};

use super::{iso_now, SectionProvider, SectionRecord};
use crate::clock::SharedClock;

pub const SOURCE: &str =
    "RSS Feeds (TechCrunch, The Verge, Ars Technica, Wired, MIT Tech Review, VentureBeat)";
pub const MOCK_SOURCE: &str = "RSS Feeds (mock)";
pub const FALLBACK_SOURCE: &str = "Mock News Data (RSS failed)";

/// Feeds checked in order until `limit` articles are collected.
pub const FEEDS: &[(&str, &str)] = &[
    ("TechCrunch", "https://techcrunch.com/feed/"),
    ("The Verge", "https://www.theverge.com/rss/index.xml"),
    ("Ars Technica", "https://feeds.arstechnica.com/arstechnica/index"),
    ("Wired", "https://www.wired.com/feed/rss"),
    ("MIT Technology Review", "https://www.technologyreview.com/feed/"),
    ("VentureBeat", "https://venturebeat.com/feed/"),
];

const ENTRIES_PER_FEED: usize = 10;
const SUMMARY_CHARS: usize = 200;

const MOCK_TITLES: &[&str] = &[
    "Major AI breakthrough announced in language understanding",
    "New machine learning model achieves record performance",
    "Tech giant releases open-source AI framework",
    "Artificial intelligence transforming healthcare industry",
    "Breakthrough in neural network efficiency",
    "Quantum computing reaches new milestone",
    "AI startup raises significant funding round",
    "Research reveals advances in computer vision",
];
const MOCK_OUTLETS: &[&str] = &["TechCrunch", "The Verge", "Ars Technica", "VentureBeat", "Wired"];

// --- RSS 2.0 ---
#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

// --- Atom ---
#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entry: Vec<AtomEntry>,
}
#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<AtomText>,
    summary: Option<AtomText>,
    content: Option<AtomText>,
    #[serde(rename = "link", default)]
    link: Vec<AtomLink>,
    published: Option<String>,
    updated: Option<String>,
}
#[derive(Debug, Deserialize)]
struct AtomText {
    #[serde(rename = "$text", default)]
    text: String,
}
#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href", default)]
    href: Option<String>,
    #[serde(rename = "@rel", default)]
    rel: Option<String>,
}

/// One entry of either feed flavor, text already normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub title: String,
    pub summary: String,
    pub link: Option<String>,
    /// `YYYY-MM-DDTHH:MM:SSZ`
    pub published_at: Option<String>,
}

/// Fetches one feed body. `target` is whatever the provider was configured
/// with for that outlet, normally a URL.
#[async_trait]
pub trait FeedLoader: Send + Sync {
    async fn load(&self, outlet: &str, target: &str) -> Result<String>;
}

/// Plain HTTP GET with a 10 s timeout.
pub struct HttpFeedLoader {
    client: reqwest::Client,
}

impl HttpFeedLoader {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent("daily-digest/0.1")
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

impl Default for HttpFeedLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeedLoader for HttpFeedLoader {
    async fn load(&self, outlet: &str, target: &str) -> Result<String> {
        self.client
            .get(target)
            .send()
            .await
            .with_context(|| format!("{outlet} http get"))?
            .error_for_status()
            .with_context(|| format!("{outlet} http status"))?
            .text()
            .await
            .with_context(|| format!("{outlet} http .text()"))
    }
}

pub struct TechNewsProvider {
    topics: Vec<String>,
    limit: usize,
    seed: Option<u64>,
    clock: SharedClock,
    /// `(outlet, target)` pairs handed to the loader in order.
    feeds: Vec<(String, String)>,
    mode: Mode,
}

enum Mode {
    Feeds(Arc<dyn FeedLoader>),
    Mock,
}

impl TechNewsProvider {
    pub fn http(topics: Vec<String>, limit: usize, clock: SharedClock) -> Self {
        let feeds = FEEDS
            .iter()
            .map(|(n, u)| (n.to_string(), u.to_string()))
            .collect();
        Self::with_loader(topics, limit, feeds, Arc::new(HttpFeedLoader::new()), clock)
    }

    pub fn with_loader(
        topics: Vec<String>,
        limit: usize,
        feeds: Vec<(String, String)>,
        loader: Arc<dyn FeedLoader>,
        clock: SharedClock,
    ) -> Self {
        Self {
            topics,
            limit,
            seed: None,
            clock,
            feeds,
            mode: Mode::Feeds(loader),
        }
    }

    pub fn mock(topics: Vec<String>, limit: usize, clock: SharedClock) -> Self {
        Self {
            topics,
            limit,
            seed: None,
            clock,
            feeds: Vec::new(),
            mode: Mode::Mock,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    async fn load(&self, outlet: &str, target: &str) -> Result<String> {
        match &self.mode {
            Mode::Feeds(loader) => loader.load(outlet, target).await,
            Mode::Mock => Err(anyhow!("{outlet}: no feed loader in mock mode")),
        }
    }

    /// Walk feeds until `limit` relevant articles are found. Errs only when
    /// every feed failed.
    async fn collect_articles(&self) -> Result<Vec<Value>> {
        let topics: Vec<String> = self.topics.iter().map(|t| t.to_lowercase()).collect();
        let mut failures = 0usize;
        let mut last_err = None;
        let mut articles = Vec::new();

        for (outlet, target) in &self.feeds {
            if articles.len() >= self.limit {
                break;
            }
            let entries = match self.load(outlet, target).await.and_then(|b| parse_feed(&b)) {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!(error = ?e, feed = %outlet, "rss feed failed");
                    failures += 1;
                    last_err = Some(e);
                    continue;
                }
            };
            for entry in entries.into_iter().take(ENTRIES_PER_FEED) {
                if !is_relevant(&entry, &topics) {
                    continue;
                }
                articles.push(json!({
                    "title": entry.title,
                    "summary": entry.summary,
                    "source": outlet,
                    "url": entry.link.unwrap_or_else(|| "#".to_string()),
                    "published_at": entry.published_at.unwrap_or_else(|| self.utc_now()),
                    "category": "technology",
                }));
                if articles.len() >= self.limit {
                    break;
                }
            }
        }

        counter!("tech_articles_total").increment(articles.len() as u64);
        match last_err {
            Some(e) if failures == self.feeds.len() => Err(e),
            _ => Ok(articles),
        }
    }

    fn utc_now(&self) -> String {
        self.clock
            .now()
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    fn mock_articles(&self) -> Vec<Value> {
        let mut rng = match self.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_os_rng(),
        };
        let now = self.clock.now().naive_local();
        MOCK_TITLES
            .iter()
            .take(self.limit)
            .enumerate()
            .map(|(i, title)| {
                let published = now - ChronoDuration::hours(rng.random_range(6..=72));
                let topic = self
                    .topics
                    .choose(&mut rng)
                    .map(String::as_str)
                    .unwrap_or("technology");
                json!({
                    "title": title,
                    "summary": format!(
                        "This article discusses recent developments in {topic}. \
                         Experts say this could have significant implications for the industry."
                    ),
                    "source": MOCK_OUTLETS.choose(&mut rng).copied().unwrap_or("TechCrunch"),
                    "url": format!("https://example.com/article-{}", i + 1),
                    "published_at": published.format("%Y-%m-%dT%H:%M:%S").to_string(),
                    "category": "technology",
                })
            })
            .collect()
    }
}

#[async_trait]
impl SectionProvider for TechNewsProvider {
    fn name(&self) -> &'static str {
        "tech"
    }

    fn source_label(&self) -> &'static str {
        "RSS Feeds"
    }

    fn tool(&self) -> &'static str {
        "get_tech_news"
    }

    async fn fetch(&self) -> Result<SectionRecord> {
        tracing::info!(topics = ?self.topics, limit = self.limit, "fetching tech news");
        let ts = iso_now(self.clock.as_ref());
        if matches!(self.mode, Mode::Mock) {
            return Ok(SectionRecord::new(
                self.name(),
                json!({ "articles": self.mock_articles() }),
                ts,
                MOCK_SOURCE,
            ));
        }

        match self.collect_articles().await {
            Ok(articles) => {
                tracing::info!(article_count = articles.len(), "tech news fetched");
                Ok(SectionRecord::new(
                    self.name(),
                    json!({ "articles": articles }),
                    ts,
                    SOURCE,
                ))
            }
            Err(e) => {
                tracing::error!(error = ?e, "all rss feeds failed; serving mock articles");
                Ok(SectionRecord::new(
                    self.name(),
                    json!({ "articles": self.mock_articles(), "error": format!("{e:#}") }),
                    ts,
                    FALLBACK_SOURCE,
                ))
            }
        }
    }
}

/// Case-insensitive topic match on title + summary. No topics keeps everything.
fn is_relevant(entry: &FeedEntry, topics_lower: &[String]) -> bool {
    if topics_lower.is_empty() {
        return true;
    }
    let text = format!("{} {}", entry.title, entry.summary).to_lowercase();
    topics_lower.iter().any(|t| text.contains(t.as_str()))
}

/// Parse RSS 2.0 or Atom.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedEntry>> {
    let t0 = Instant::now();
    let xml_clean = scrub_html_entities_for_xml(xml);
    let entries = if xml_clean.contains("<feed") {
        let feed: AtomFeed = from_str(&xml_clean).context("parsing atom xml")?;
        feed.entry.into_iter().map(atom_entry).collect()
    } else {
        let rss: Rss = from_str(&xml_clean).context("parsing rss xml")?;
        rss.channel.item.into_iter().map(rss_item).collect()
    };
    histogram!("tech_feed_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    Ok(entries)
}

fn rss_item(it: Item) -> FeedEntry {
    FeedEntry {
        title: normalize_text(it.title.as_deref().unwrap_or_default()),
        summary: cap_chars(&normalize_text(it.description.as_deref().unwrap_or_default())),
        link: it.link.map(|l| l.trim().to_string()).filter(|l| !l.is_empty()),
        published_at: it.pub_date.as_deref().and_then(|d| to_utc_iso(d, Rfc2822)),
    }
}

fn atom_entry(e: AtomEntry) -> FeedEntry {
    let summary = e
        .summary
        .or(e.content)
        .map(|t| t.text)
        .unwrap_or_default();
    let link = e
        .link
        .iter()
        .find(|l| l.rel.as_deref().map_or(true, |r| r == "alternate"))
        .or(e.link.first())
        .and_then(|l| l.href.clone());
    FeedEntry {
        title: normalize_text(&e.title.map(|t| t.text).unwrap_or_default()),
        summary: cap_chars(&normalize_text(&summary)),
        link,
        published_at: e
            .published
            .or(e.updated)
            .as_deref()
            .and_then(|d| to_utc_iso(d, Rfc3339)),
    }
}

fn to_utc_iso<F>(raw: &str, format: F) -> Option<String>
where
    F: time::parsing::Parsable,
{
    let dt = OffsetDateTime::parse(raw.trim(), &format)
        .ok()?
        .to_offset(UtcOffset::UTC);
    Some(format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        dt.year(),
        u8::from(dt.month()),
        dt.day(),
        dt.hour(),
        dt.minute(),
        dt.second()
    ))
}

fn cap_chars(s: &str) -> String {
    s.chars().take(SUMMARY_CHARS).collect()
}

/// Decode entities, strip tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").expect("static regex"));
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("static regex"));

    let decoded = html_escape::decode_html_entities(s);
    let stripped = re_tags.replace_all(&decoded, " ");
    re_ws.replace_all(&stripped, " ").trim().to_string()
}

/// Entities HTML allows but XML does not.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&hellip;", "...")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_tags_and_entities() {
        assert_eq!(
            normalize_text("<p>OpenAI&#8217;s   <b>new</b>\n model</p>"),
            "OpenAI\u{2019}s new model"
        );
    }

    #[test]
    fn rfc2822_and_rfc3339_become_utc_iso() {
        assert_eq!(
            to_utc_iso("Sun, 19 Oct 2025 08:30:00 +0200", Rfc2822).as_deref(),
            Some("2025-10-19T06:30:00Z")
        );
        assert_eq!(
            to_utc_iso("2025-10-19T08:30:00-04:00", Rfc3339).as_deref(),
            Some("2025-10-19T12:30:00Z")
        );
        assert!(to_utc_iso("last tuesday", Rfc3339).is_none());
    }

    #[test]
    fn relevance_is_case_insensitive_over_title_and_summary() {
        let e = FeedEntry {
            title: "Chips".into(),
            summary: "A new Machine Learning accelerator".into(),
            link: None,
            published_at: None,
        };
        assert!(is_relevant(&e, &["machine learning".into()]));
        assert!(!is_relevant(&e, &["quantum".into()]));
        assert!(is_relevant(&e, &[]));
    }

    #[test]
    fn summary_is_capped() {
        assert_eq!(cap_chars(&"x".repeat(500)).chars().count(), SUMMARY_CHARS);
    }
}
