//! The four section checks. Each one walks every section and returns its own
//! issues; none of them stops early.

use std::collections::BTreeSet;

use chrono::{DateTime, FixedOffset};

use super::timestamp::parse_timestamp;
use super::trusted::{is_trusted, trusted_sources};
use super::{Issue, IssueKind, MIN_CONTENT_CHARS};
use crate::digest::{Payload, Section};

/// Required names absent from the digest, reported as one combined issue.
/// Extra sections are fine.
pub fn completeness(sections: &[Section], required: &[String]) -> Vec<Issue> {
    let present: BTreeSet<String> = sections.iter().map(Section::key).collect();
    let missing: Vec<String> = required
        .iter()
        .map(|r| r.to_lowercase())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .filter(|r| !present.contains(r))
        .collect();

    if missing.is_empty() {
        return Vec::new();
    }
    vec![Issue::new(
        IssueKind::Completeness,
        None,
        format!("Missing required sections: {}", missing.join(", ")),
    )]
}

/// Timestamps must exist, parse, and be no older than `max_age_hours`.
pub fn freshness(
    sections: &[Section],
    now: DateTime<FixedOffset>,
    max_age_hours: f64,
) -> Vec<Issue> {
    let mut out = Vec::new();
    for s in sections {
        let name = s.display_name();
        let raw = match s.timestamp.as_deref() {
            Some(t) if !t.is_empty() => t,
            _ => {
                out.push(Issue::for_section(
                    IssueKind::Freshness,
                    name,
                    format!("{name}: Missing timestamp"),
                ));
                continue;
            }
        };

        let ts = match parse_timestamp(raw, *now.offset()) {
            Ok(ts) => ts,
            Err(e) => {
                out.push(Issue::for_section(
                    IssueKind::Freshness,
                    name,
                    format!("{name}: Invalid timestamp format '{raw}': {e}"),
                ));
                continue;
            }
        };

        let age = now.signed_duration_since(ts);
        let age_hours = match age.num_microseconds() {
            Some(us) => us as f64 / 3_600_000_000.0,
            None => age.num_milliseconds() as f64 / 3_600_000.0,
        };
        if age_hours > max_age_hours {
            out.push(Issue::for_section(
                IssueKind::Freshness,
                name,
                format!("{name}: Data is {age_hours:.1} hours old (max: {max_age_hours})"),
            ));
        }
    }
    out
}

/// Every section needs a source; known section types need a trusted one.
pub fn source_reliability(sections: &[Section]) -> Vec<Issue> {
    let mut out = Vec::new();
    for s in sections {
        let name = s.display_name();
        let source = match s.source.as_deref() {
            Some(src) if !src.is_empty() => src,
            _ => {
                out.push(Issue::for_section(
                    IssueKind::Attribution,
                    name,
                    format!("{name}: Missing source attribution"),
                ));
                continue;
            }
        };

        let trusted = trusted_sources(&s.key());
        if !trusted.is_empty() && !is_trusted(source, trusted) {
            let hint = trusted.iter().take(3).copied().collect::<Vec<_>>().join(", ");
            out.push(Issue::for_section(
                IssueKind::Attribution,
                name,
                format!("{name}: Source '{source}' not in trusted list. Trusted sources: {hint}..."),
            ));
        }
    }
    out
}

/// Payload must exist and be substantive; see [`Section::resolved_payload`].
pub fn content_validity(sections: &[Section]) -> Vec<Issue> {
    let mut out = Vec::new();
    for s in sections {
        let name = s.display_name();
        let Some(payload) = s.resolved_payload() else {
            out.push(Issue::for_section(
                IssueKind::Content,
                name,
                format!("{name}: Missing content or data field"),
            ));
            continue;
        };

        let msg = match payload {
            Payload::Text(t) if t.trim().chars().count() < MIN_CONTENT_CHARS => Some(format!(
                "{name}: Content too short ({} chars, min: {MIN_CONTENT_CHARS})",
                t.chars().count()
            )),
            Payload::Mapping(m) if m.is_empty() => Some(format!("{name}: Empty data object")),
            Payload::Sequence(a) if a.is_empty() => Some(format!("{name}: Empty data list")),
            _ => None,
        };
        if let Some(msg) = msg {
            out.push(Issue::for_section(IssueKind::Content, name, msg));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<FixedOffset> {
        chrono::Utc
            .with_ymd_and_hms(2025, 10, 19, 12, 0, 0)
            .unwrap()
            .fixed_offset()
    }

    fn messages(issues: Vec<Issue>) -> Vec<String> {
        issues.into_iter().map(|i| i.message).collect()
    }

    #[test]
    fn completeness_lists_missing_sorted_and_lowercased() {
        let sections = vec![Section::new("Weather")];
        let required = vec!["weather".into(), "Tech".into(), "market".into()];
        assert_eq!(
            messages(completeness(&sections, &required)),
            vec!["Missing required sections: market, tech".to_string()]
        );
    }

    #[test]
    fn completeness_ignores_extra_sections() {
        let sections = vec![Section::new("weather"), Section::new("horoscope")];
        assert!(completeness(&sections, &["weather".into()]).is_empty());
    }

    #[test]
    fn freshness_reports_missing_invalid_and_stale() {
        let sections = vec![
            Section::new("a"),
            Section::new("b").with_timestamp("not a date"),
            Section::new("c").with_timestamp("2025-10-18T06:00:00Z"),
            Section::new("d").with_timestamp("2025-10-19T11:30:00Z"),
        ];
        let out = messages(freshness(&sections, now(), 24.0));
        assert_eq!(out.len(), 3);
        assert_eq!(out[0], "a: Missing timestamp");
        assert!(out[1].starts_with("b: Invalid timestamp format 'not a date': "));
        assert_eq!(out[2], "c: Data is 30.0 hours old (max: 24)");
    }

    #[test]
    fn freshness_boundary_is_inclusive() {
        let sections = vec![Section::new("w").with_timestamp("2025-10-18T12:00:00Z")];
        assert!(freshness(&sections, now(), 24.0).is_empty());
    }

    #[test]
    fn blank_content_without_data_is_judged_as_is() {
        let sections = vec![
            Section::new("s").with_content(json!("")),
            Section::new("m").with_content(json!({})),
            Section::new("n").with_content(json!(null)),
            Section::new("x"),
        ];
        assert_eq!(
            messages(content_validity(&sections)),
            vec![
                "s: Content too short (0 chars, min: 20)".to_string(),
                "m: Empty data object".to_string(),
                "x: Missing content or data field".to_string(),
            ]
        );
    }

    #[test]
    fn freshness_sees_sub_millisecond_overrun() {
        let sections = vec![Section::new("w").with_timestamp("2025-10-18T11:59:59.9995Z")];
        assert_eq!(
            messages(freshness(&sections, now(), 24.0)),
            vec!["w: Data is 24.0 hours old (max: 24)".to_string()]
        );
    }

    #[test]
    fn empty_timestamp_counts_as_missing() {
        let sections = vec![Section::new("w").with_timestamp("")];
        assert_eq!(
            messages(freshness(&sections, now(), 24.0)),
            vec!["w: Missing timestamp".to_string()]
        );
    }

    #[test]
    fn source_unknown_type_is_skipped() {
        let sections = vec![Section::new("horoscope").with_source("Madame Irma")];
        assert!(source_reliability(&sections).is_empty());
    }

    #[test]
    fn source_untrusted_lists_three_alternatives() {
        let sections = vec![Section::new("market").with_source("Totally Unknown Corp")];
        assert_eq!(
            messages(source_reliability(&sections)),
            vec![
                "market: Source 'Totally Unknown Corp' not in trusted list. \
                 Trusted sources: Alpha Vantage, Yahoo Finance, Bloomberg..."
                    .to_string()
            ]
        );
    }

    #[test]
    fn unnamed_section_reads_as_unknown() {
        let sections = vec![Section::default()];
        assert_eq!(
            messages(source_reliability(&sections)),
            vec!["unknown: Missing source attribution".to_string()]
        );
    }

    #[test]
    fn content_variants() {
        let sections = vec![
            Section::new("a"),
            Section::new("b").with_data(json!("short")),
            Section::new("c").with_data(json!({})),
            Section::new("d").with_data(json!([])),
            Section::new("e").with_data(json!(42)),
            Section::new("f").with_content(json!("   padded but tiny    ")),
        ];
        let out = messages(content_validity(&sections));
        assert_eq!(
            out,
            vec![
                "a: Missing content or data field".to_string(),
                "b: Content too short (5 chars, min: 20)".to_string(),
                "c: Empty data object".to_string(),
                "d: Empty data list".to_string(),
                "f: Content too short (22 chars, min: 20)".to_string(),
            ]
        );
    }
}
