//! # Digest validation & quality scoring
//!
//! Decides whether an assembled digest is fit to publish.
//!
//! - Four checks run over every section, in a fixed order: completeness,
//!   freshness, source reliability, content validity. All of them always run.
//! - A digest without `sections` short-circuits with a single structural error.
//! - Quality score is a linear penalty on the error count:
//!   `max(0, 1 - errors / 10)`, `1.0` only when there are no errors.
//!
//! Pure and synchronous; the only ambient input is the injected [`Clock`].
//! Problems in section data are reported as [`Issue`]s, never as `Err`.

pub mod checks;
pub mod timestamp;
pub mod trusted;

use std::fmt;
use std::sync::Arc;

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};
use crate::digest::{DigestAggregate, Sections};

pub const DEFAULT_MAX_DATA_AGE_HOURS: f64 = 24.0;
pub const DEFAULT_MIN_RELIABILITY_SCORE: f64 = 0.8;
pub const DEFAULT_REQUIRED_SECTIONS: [&str; 4] = ["weather", "sports", "tech", "market"];

/// Minimum trimmed length of a text payload.
pub const MIN_CONTENT_CHARS: usize = 20;
/// Error count at which the quality score bottoms out.
pub const SCORE_ERROR_CEILING: usize = 10;

pub const MISSING_SECTIONS_ERROR: &str = "Missing 'sections' field in digest data";

/// Coarse category of a validation problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Structure,
    Completeness,
    Freshness,
    Attribution,
    Content,
}

/// One validation problem. `message` is the human-readable error string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub kind: IssueKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    pub message: String,
}

impl Issue {
    pub fn new(kind: IssueKind, section: Option<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            section,
            message: message.into(),
        }
    }

    pub fn for_section(kind: IssueKind, section: &str, message: impl Into<String>) -> Self {
        Self::new(kind, Some(section.to_string()), message)
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Validator knobs, fixed for the lifetime of a [`Validator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorSettings {
    pub max_data_age_hours: f64,
    /// Stored and reported, not enforced by any check.
    pub min_reliability_score: f64,
    pub required_sections: Vec<String>,
}

impl Default for ValidatorSettings {
    fn default() -> Self {
        Self {
            max_data_age_hours: DEFAULT_MAX_DATA_AGE_HOURS,
            min_reliability_score: DEFAULT_MIN_RELIABILITY_SCORE,
            required_sections: DEFAULT_REQUIRED_SECTIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Bundle handed to reporting and metrics consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub is_valid: bool,
    pub quality_score: f64,
    pub error_count: usize,
    pub errors: Vec<String>,
    /// Evaluation time, RFC 3339.
    pub timestamp: String,
}

pub struct Validator {
    settings: ValidatorSettings,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(ValidatorSettings::default())
    }
}

impl Validator {
    /// Validator on the system clock.
    pub fn new(settings: ValidatorSettings) -> Self {
        Self::with_clock(settings, Arc::new(SystemClock))
    }

    pub fn with_clock(settings: ValidatorSettings, clock: Arc<dyn Clock>) -> Self {
        Self { settings, clock }
    }

    pub fn settings(&self) -> &ValidatorSettings {
        &self.settings
    }

    pub fn max_data_age_hours(&self) -> f64 {
        self.settings.max_data_age_hours
    }

    pub fn min_reliability_score(&self) -> f64 {
        self.settings.min_reliability_score
    }

    pub fn required_sections(&self) -> &[String] {
        &self.settings.required_sections
    }

    /// All problems as structured issues, in check order.
    pub fn issues(&self, digest: &DigestAggregate) -> Vec<Issue> {
        let sections = match &digest.sections {
            Sections::Missing => {
                return vec![Issue::new(IssueKind::Structure, None, MISSING_SECTIONS_ERROR)]
            }
            Sections::NotAList(kind) => {
                return vec![Issue::new(
                    IssueKind::Structure,
                    None,
                    format!("'sections' field must be a list, got {kind}"),
                )]
            }
            Sections::List(v) => v.as_slice(),
        };

        let now = self.clock.now();
        let mut out = checks::completeness(sections, &self.settings.required_sections);
        out.extend(checks::freshness(
            sections,
            now,
            self.settings.max_data_age_hours,
        ));
        out.extend(checks::source_reliability(sections));
        out.extend(checks::content_validity(sections));
        out
    }

    /// `(is_valid, errors)`; valid iff there are no errors.
    pub fn validate(&self, digest: &DigestAggregate) -> (bool, Vec<String>) {
        let errors: Vec<String> = self
            .issues(digest)
            .into_iter()
            .map(|i| i.message)
            .collect();
        (errors.is_empty(), errors)
    }

    pub fn calculate_quality_score(&self, digest: &DigestAggregate) -> f64 {
        let (_, errors) = self.validate(digest);
        quality_score_for(errors.len())
    }

    pub fn get_validation_summary(&self, digest: &DigestAggregate) -> ValidationSummary {
        let (is_valid, errors) = self.validate(digest);
        ValidationSummary {
            is_valid,
            quality_score: quality_score_for(errors.len()),
            error_count: errors.len(),
            errors,
            timestamp: self
                .clock
                .now()
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Linear penalty: each error costs 0.1, floored at 0.
pub fn quality_score_for(error_count: usize) -> f64 {
    if error_count == 0 {
        return 1.0;
    }
    (1.0 - error_count as f64 / SCORE_ERROR_CEILING as f64).max(0.0)
}

/// Validate with default settings on the system clock.
pub fn validate_digest(digest: &DigestAggregate) -> (bool, Vec<String>) {
    Validator::default().validate(digest)
}
