// src/config/validation.rs
use anyhow::{anyhow, Context, Result};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::validate::{ValidatorSettings, DEFAULT_MAX_DATA_AGE_HOURS};

pub const ENV_PATH: &str = "DIGEST_VALIDATION_CONFIG";
pub const DEFAULT_PATH: &str = "config/validation.toml";

/// Load validator settings from an explicit path. TOML or JSON by extension.
pub fn load_settings_from(path: &Path) -> Result<ValidatorSettings> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading validation config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let raw: ValidatorSettings = if ext == "json" {
        serde_json::from_str(&content)
            .with_context(|| format!("parsing json in {}", path.display()))?
    } else {
        toml::from_str(&content).with_context(|| format!("parsing toml in {}", path.display()))?
    };
    Ok(sanitize(raw))
}

/// Lookup order:
/// 1) $DIGEST_VALIDATION_CONFIG (must exist)
/// 2) config/validation.toml
/// 3) built-in defaults
pub fn load_settings_default() -> Result<ValidatorSettings> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if !pb.exists() {
            return Err(anyhow!("{ENV_PATH} points to non-existent path"));
        }
        return load_settings_from(&pb);
    }
    let p = PathBuf::from(DEFAULT_PATH);
    if p.exists() {
        return load_settings_from(&p);
    }
    Ok(ValidatorSettings::default())
}

/// Clamp knobs into usable ranges and clean the required-section list.
pub fn sanitize(mut s: ValidatorSettings) -> ValidatorSettings {
    if !s.max_data_age_hours.is_finite() || s.max_data_age_hours < 0.0 {
        s.max_data_age_hours = DEFAULT_MAX_DATA_AGE_HOURS;
    }
    if s.min_reliability_score.is_nan() {
        s.min_reliability_score = ValidatorSettings::default().min_reliability_score;
    }
    s.min_reliability_score = s.min_reliability_score.clamp(0.0, 1.0);

    let mut seen = BTreeSet::new();
    s.required_sections = s
        .required_sections
        .into_iter()
        .map(|n| n.trim().to_lowercase())
        .filter(|n| !n.is_empty() && seen.insert(n.clone()))
        .collect();
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs};

    #[test]
    fn sanitize_fixes_ranges_and_names() {
        let s = sanitize(ValidatorSettings {
            max_data_age_hours: -3.0,
            min_reliability_score: 1.7,
            required_sections: vec![" Weather ".into(), "".into(), "weather".into(), "tech".into()],
        });
        assert_eq!(s.max_data_age_hours, DEFAULT_MAX_DATA_AGE_HOURS);
        assert_eq!(s.min_reliability_score, 1.0);
        assert_eq!(s.required_sections, vec!["weather", "tech"]);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("v.toml");
        fs::write(&p, "max_data_age_hours = 6.0\n").unwrap();
        let s = load_settings_from(&p).unwrap();
        assert_eq!(s.max_data_age_hours, 6.0);
        assert_eq!(s.required_sections.len(), 4);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("v.toml");
        fs::write(&p, "max_data_age_hours = \"soon\"").unwrap();
        assert!(load_settings_from(&p).is_err());
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();
        env::remove_var(ENV_PATH);

        let s = load_settings_default().unwrap();
        assert_eq!(s, ValidatorSettings::default());

        fs::create_dir_all("config").unwrap();
        fs::write(DEFAULT_PATH, "required_sections = [\"weather\"]\n").unwrap();
        assert_eq!(
            load_settings_default().unwrap().required_sections,
            vec!["weather"]
        );

        let p_json = tmp.path().join("validation.json");
        fs::write(&p_json, r#"{"max_data_age_hours": 2.5}"#).unwrap();
        env::set_var(ENV_PATH, p_json.display().to_string());
        assert_eq!(load_settings_default().unwrap().max_data_age_hours, 2.5);

        env::set_var(ENV_PATH, tmp.path().join("nope.toml").display().to_string());
        assert!(load_settings_default().is_err());
        env::remove_var(ENV_PATH);

        env::set_current_dir(&old).unwrap();
    }
}
