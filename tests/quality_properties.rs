//! Score/verdict properties over generated digests.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use daily_digest::clock::FixedClock;
use daily_digest::validate::quality_score_for;
use daily_digest::{DigestAggregate, Section, Validator, ValidatorSettings};
use serde_json::json;

fn validator() -> Validator {
    let at = Utc.with_ymd_and_hms(2025, 10, 19, 8, 0, 0).unwrap();
    Validator::with_clock(ValidatorSettings::default(), Arc::new(FixedClock::utc(at)))
}

/// `n` unnamed, empty sections yield `1 + 3n` errors (completeness plus
/// timestamp, source and content per section).
fn broken(n: usize) -> DigestAggregate {
    DigestAggregate::new("2025-10-19", "2025-10-19T08:00:00Z", vec![Section::default(); n])
}

#[test]
fn validation_is_idempotent() {
    let v = validator();
    for n in 0..5 {
        let d = broken(n);
        assert_eq!(v.validate(&d), v.validate(&d));
        assert_eq!(v.calculate_quality_score(&d), v.calculate_quality_score(&d));
    }
}

#[test]
fn score_never_increases_with_more_errors() {
    let v = validator();
    let mut last = f64::INFINITY;
    let mut last_errors = 0;
    for n in 0..6 {
        let d = broken(n);
        let errors = v.validate(&d).1.len();
        let score = v.calculate_quality_score(&d);
        assert!(errors >= last_errors);
        assert!(score <= last);
        last = score;
        last_errors = errors;
    }
}

#[test]
fn score_is_bounded_and_one_only_without_errors() {
    let v = validator();
    for n in 0..8 {
        let d = broken(n);
        let (ok, errors) = v.validate(&d);
        let score = v.calculate_quality_score(&d);
        assert!((0.0..=1.0).contains(&score));
        assert_eq!(score == 1.0, errors.is_empty());
        assert_eq!(ok, errors.is_empty());
    }
}

#[test]
fn score_floors_at_ten_errors() {
    let v = validator();
    // 1 + 3 * 3 = 10 errors
    let d = broken(3);
    assert_eq!(v.validate(&d).1.len(), 10);
    assert_eq!(v.calculate_quality_score(&d), 0.0);
    assert_eq!(v.calculate_quality_score(&broken(7)), 0.0);
    assert_eq!(quality_score_for(usize::MAX), 0.0);
}

#[test]
fn missing_sections_returns_exactly_one_error() {
    let v = validator();
    for extra in [json!({}), json!({"date": "2025-10-19", "raw_response": "x"})] {
        let d = DigestAggregate::from_value(extra).unwrap();
        let (ok, errors) = v.validate(&d);
        assert!(!ok);
        assert_eq!(errors.len(), 1);
    }
}
