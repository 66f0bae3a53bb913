//! Analysis configuration
//!
//! Every analysis entry point takes an explicit [`AnalysisConfig`]; the
//! defaults reproduce the standard open-field protocol (a 10 minute window
//! starting 3 s into the recording, 150 s bins, eight subjects).

use crate::binning::build_bins;
use crate::error::AnalysisError;
use crate::types::{AnalysisWindow, BinSpec, Sex, SubjectId};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default window start in seconds
pub const DEFAULT_START_SECONDS: f64 = 3.0;

/// Default window end in seconds
pub const DEFAULT_END_SECONDS: f64 = 603.0;

/// Default bin width in seconds
pub const DEFAULT_BIN_SECONDS: f64 = 150.0;

/// Behavior key for freezing intervals
pub const FREEZING_KEY: &str = "Freezing_start_stop";

/// Behavior key for grooming intervals
pub const GROOMING_KEY: &str = "grooming_start_stop";

/// Default cohort codes, one male and one female subject each
const DEFAULT_COHORTS: [&str; 4] = ["B", "G", "R", "W"];

/// Configuration for one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Analysis window
    #[serde(default = "default_window")]
    pub window: AnalysisWindow,

    /// Bin width
    #[serde(default = "default_bin")]
    pub bin_size_seconds: BinSpec,

    /// Interval behaviors to aggregate
    #[serde(default = "default_behaviors")]
    pub behaviors: Vec<String>,

    /// Subjects to load
    #[serde(default = "default_roster")]
    pub roster: Vec<SubjectId>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window: default_window(),
            bin_size_seconds: default_bin(),
            behaviors: default_behaviors(),
            roster: default_roster(),
        }
    }
}

impl AnalysisConfig {
    /// Create a configuration for a window and bin size with default behaviors and roster
    pub fn new(start_seconds: f64, end_seconds: f64, bin_size_seconds: f64) -> Result<Self, AnalysisError> {
        let config = Self {
            window: AnalysisWindow::new(start_seconds, end_seconds)?,
            bin_size_seconds: BinSpec::new(bin_size_seconds)?,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, AnalysisError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| AnalysisError::ParseError(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the window and bin size combine into a usable set of bins
    pub fn validate(&self) -> Result<(), AnalysisError> {
        build_bins(&self.window, self.bin()).map(|_| ())
    }

    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self, AnalysisError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Serialize configuration to pretty JSON
    pub fn to_json(&self) -> Result<String, AnalysisError> {
        serde_json::to_string_pretty(self).map_err(AnalysisError::JsonError)
    }

    pub fn bin(&self) -> BinSpec {
        self.bin_size_seconds
    }

    /// Replace the roster
    pub fn with_roster(mut self, roster: Vec<SubjectId>) -> Self {
        self.roster = roster;
        self
    }
}

fn default_window() -> AnalysisWindow {
    AnalysisWindow::from_trusted(DEFAULT_START_SECONDS, DEFAULT_END_SECONDS)
}

fn default_bin() -> BinSpec {
    BinSpec::from_trusted(DEFAULT_BIN_SECONDS)
}

fn default_behaviors() -> Vec<String> {
    vec![FREEZING_KEY.to_string(), GROOMING_KEY.to_string()]
}

fn default_roster() -> Vec<SubjectId> {
    [Sex::Female, Sex::Male]
        .into_iter()
        .flat_map(|sex| {
            DEFAULT_COHORTS
                .iter()
                .filter_map(move |cohort| SubjectId::new(sex, *cohort).ok())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = AnalysisConfig::default();
        assert_eq!(config.window.start(), 3.0);
        assert_eq!(config.window.end(), 603.0);
        assert_eq!(config.bin().seconds(), 150.0);
        assert_eq!(config.behaviors, vec![FREEZING_KEY, GROOMING_KEY]);

        let roster: Vec<String> = config.roster.iter().map(SubjectId::code).collect();
        assert_eq!(roster, vec!["FB", "FG", "FR", "FW", "MB", "MG", "MR", "MW"]);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = AnalysisConfig::from_json(r#"{"bin_size_seconds": 60.0}"#).unwrap();
        assert_eq!(config.bin().seconds(), 60.0);
        assert_eq!(config.window, AnalysisConfig::default().window);
        assert_eq!(config.roster.len(), 8);
    }

    #[test]
    fn test_json_round_trip() {
        let config = AnalysisConfig::new(0.0, 600.0, 120.0)
            .unwrap()
            .with_roster(vec!["MB".parse().unwrap()]);
        let json = config.to_json().unwrap();
        assert!(json.contains("\"start_seconds\": 0.0"));
        assert_eq!(AnalysisConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_invalid_values_rejected_on_load() {
        let inverted = r#"{"window": {"start_seconds": 600.0, "end_seconds": 0.0}}"#;
        assert!(AnalysisConfig::from_json(inverted).is_err());

        assert!(AnalysisConfig::from_json(r#"{"bin_size_seconds": 0.0}"#).is_err());
        assert!(AnalysisConfig::from_json(r#"{"roster": ["XX"]}"#).is_err());
        assert!(AnalysisConfig::new(10.0, 10.0, 150.0).is_err());
    }

    #[test]
    fn test_too_many_bins_rejected() {
        assert!(matches!(
            AnalysisConfig::new(0.0, 600.0, 1e-9),
            Err(AnalysisError::InvalidBinSize(_))
        ));
        let tiny = r#"{"window": {"start_seconds": 0.0, "end_seconds": 1e300}, "bin_size_seconds": 1e-300}"#;
        assert!(matches!(
            AnalysisConfig::from_json(tiny),
            Err(AnalysisError::InvalidBinSize(_))
        ));
        assert!(AnalysisConfig::default().validate().is_ok());
    }
}
