#![deny(warnings)]

//! YAML configuration for the planner: industry defaults and ramp presets.

use roas_core::{IndustryDefaults, IndustryId, IndustryTable, RampConfig, RampPreset};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(String),
    #[error("invalid yaml: {0}")]
    InvalidYaml(String),
    #[error("invalid entry {key}: {reason}")]
    InvalidEntry { key: String, reason: String },
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e.to_string())
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(e: serde_yaml::Error) -> Self {
        ConfigError::InvalidYaml(e.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct IndustryFile {
    industries: BTreeMap<IndustryId, IndustryDefaults>,
    fallback: Option<IndustryDefaults>,
}

fn invalid(key: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidEntry {
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn check_defaults(key: &str, d: &IndustryDefaults) -> Result<(), ConfigError> {
    for (field, v) in [
        ("margin_pct", d.margin_pct),
        ("return_rate_pct", d.return_rate_pct),
        ("payment_fee_pct", d.payment_fee_pct),
    ] {
        if !(0.0..=100.0).contains(&v) {
            return Err(invalid(
                key,
                format!("{field} must be within [0, 100] (got {v})"),
            ));
        }
    }
    if !(d.shipping_cost >= 0.0 && d.shipping_cost.is_finite()) {
        return Err(invalid(
            key,
            format!("shipping_cost must be >= 0 (got {})", d.shipping_cost),
        ));
    }
    if !(d.ltv_multiplier > 0.0 && d.ltv_multiplier.is_finite()) {
        return Err(invalid(
            key,
            format!("ltv_multiplier must be > 0 (got {})", d.ltv_multiplier),
        ));
    }
    Ok(())
}

/// Parse an industry table. A missing `fallback` keeps the built-in one.
pub fn industry_table_from_str(text: &str) -> Result<IndustryTable, ConfigError> {
    let file: IndustryFile = serde_yaml::from_str(text)?;
    for (id, d) in &file.industries {
        check_defaults(&id.0, d)?;
    }
    let fallback = match file.fallback {
        Some(f) => {
            check_defaults("fallback", &f)?;
            f
        }
        None => IndustryTable::builtin().fallback,
    };
    Ok(IndustryTable {
        entries: file.industries,
        fallback,
    })
}

pub fn load_industry_table<P: AsRef<Path>>(path: P) -> Result<IndustryTable, ConfigError> {
    let text = fs::read_to_string(path.as_ref())?;
    let table = industry_table_from_str(&text)?;
    info!(
        path = %path.as_ref().display(),
        industries = table.entries.len(),
        "loaded industry table"
    );
    Ok(table)
}

/// Ramp settings for each preset.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RampPresets {
    pub worst: RampConfig,
    pub expected: RampConfig,
    pub best: RampConfig,
}

impl RampPresets {
    pub fn get(&self, preset: RampPreset) -> RampConfig {
        match preset {
            RampPreset::Worst => self.worst,
            RampPreset::Expected => self.expected,
            RampPreset::Best => self.best,
        }
    }
}

impl Default for RampPresets {
    fn default() -> Self {
        Self {
            worst: RampPreset::Worst.config(),
            expected: RampPreset::Expected.config(),
            best: RampPreset::Best.config(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RampFile {
    worst: Option<RampConfig>,
    expected: Option<RampConfig>,
    best: Option<RampConfig>,
}

/// Parse ramp presets. Presets absent from the file keep their built-in values.
pub fn ramp_presets_from_str(text: &str) -> Result<RampPresets, ConfigError> {
    let file: RampFile = serde_yaml::from_str(text)?;
    let mut presets = RampPresets::default();
    for (preset, slot, over) in [
        (RampPreset::Worst, &mut presets.worst, file.worst),
        (RampPreset::Expected, &mut presets.expected, file.expected),
        (RampPreset::Best, &mut presets.best, file.best),
    ] {
        if let Some(cfg) = over {
            if !(cfg.variance_pct > -100.0 && cfg.variance_pct.is_finite()) {
                return Err(invalid(
                    preset.label(),
                    format!("variance_pct must be above -100 (got {})", cfg.variance_pct),
                ));
            }
            *slot = cfg;
        }
    }
    Ok(presets)
}

pub fn load_ramp_presets<P: AsRef<Path>>(path: P) -> Result<RampPresets, ConfigError> {
    let text = fs::read_to_string(path.as_ref())?;
    let presets = ramp_presets_from_str(&text)?;
    info!(path = %path.as_ref().display(), "loaded ramp presets");
    Ok(presets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn assets() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../assets")
    }

    fn toys_yaml(margin_pct: f64) -> String {
        format!(
            "industries:
  toys:
    margin_pct: {margin_pct}
    return_rate_pct: 6
    payment_fee_pct: 2
    shipping_cost: 39
    ltv_multiplier: 1.4
"
        )
    }

    #[test]
    fn shipped_industry_table_matches_builtin() {
        let table = load_industry_table(assets().join("industries.yaml")).unwrap();
        assert_eq!(table, IndustryTable::builtin());
    }

    #[test]
    fn shipped_ramp_presets_match_builtin() {
        let presets = load_ramp_presets(assets().join("ramp_presets.yaml")).unwrap();
        assert_eq!(presets, RampPresets::default());
        assert_eq!(presets.get(RampPreset::Worst).ramp_months, 4);
    }

    #[test]
    fn missing_fallback_uses_builtin() {
        let table = industry_table_from_str(&toys_yaml(50.0)).unwrap();
        assert!(table.contains(&IndustryId::from("toys")));
        assert!(!table.contains(&IndustryId::from("fashion")));
        assert_eq!(table.fallback, IndustryTable::builtin().fallback);
        assert_eq!(table.get(&IndustryId::from("fashion")).margin_pct, 45.0);
    }

    #[test]
    fn out_of_range_entry_is_rejected() {
        match industry_table_from_str(&toys_yaml(150.0)) {
            Err(ConfigError::InvalidEntry { key, reason }) => {
                assert_eq!(key, "toys");
                assert!(reason.contains("margin_pct"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn partial_ramp_override() {
        let presets =
            ramp_presets_from_str("best:\n  ramp_months: 1\n  variance_pct: 25\n").unwrap();
        assert_eq!(presets.best.ramp_months, 1);
        assert_eq!(presets.best.variance_pct, 25.0);
        assert_eq!(presets.worst, RampPreset::Worst.config());
    }

    #[test]
    fn bad_variance_is_rejected() {
        let err =
            ramp_presets_from_str("worst:\n  ramp_months: 4\n  variance_pct: -100\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEntry { .. }));
    }

    #[test]
    fn bad_yaml_and_missing_file() {
        assert!(matches!(
            industry_table_from_str("industries: [1, 2"),
            Err(ConfigError::InvalidYaml(_))
        ));
        assert!(matches!(
            load_ramp_presets(assets().join("does-not-exist.yaml")),
            Err(ConfigError::Io(_))
        ));
    }
}
