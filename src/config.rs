//! Analysis configuration.
//!
//! Loaded from an optional TOML file; every key has a default, so an empty file is a
//! valid configuration:
//!
//! ```toml
//! skip_empty_registries = false
//!
//! [fit]
//! lower_bound = 2000
//! upper_bound = 50000
//! steps = 100
//! confidence_z = 1.96
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::fit::{DEFAULT_CONFIDENCE_Z, DEFAULT_STEPS};

/// Default lower bound of the curve evaluation domain
pub const DEFAULT_LOWER_BOUND: u64 = 2_000;
/// Default upper bound of the curve evaluation domain (the extrapolation target)
pub const DEFAULT_UPPER_BOUND: u64 = 50_000;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Drop registries without usable extensions instead of rejecting the input
    pub skip_empty_registries: bool,
    pub fit: FitConfig,
}

/// Curve evaluation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FitConfig {
    /// Lower bound of the evaluation domain; the smallest observed `total_exts` if unset
    pub lower_bound: Option<u64>,
    /// Upper bound of the evaluation domain; the largest observed `total_exts` if unset
    pub upper_bound: Option<u64>,
    /// Number of evenly spaced evaluation points
    pub steps: usize,
    /// Normal quantile scaling the confidence band
    pub confidence_z: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            lower_bound: Some(DEFAULT_LOWER_BOUND),
            upper_bound: Some(DEFAULT_UPPER_BOUND),
            steps: DEFAULT_STEPS,
            confidence_z: DEFAULT_CONFIDENCE_Z,
        }
    }
}

impl AnalysisConfig {
    pub fn from_toml_str(input: &str) -> Result<Self> {
        Ok(toml::from_str(input)?)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        Self::from_toml_str(&fs::read_to_string(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_empty_is_default() {
        assert_eq!(AnalysisConfig::from_toml_str("").unwrap(), AnalysisConfig::default());
    }

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert!(!config.skip_empty_registries);
        assert_eq!(config.fit.lower_bound, Some(2000));
        assert_eq!(config.fit.upper_bound, Some(50000));
        assert_eq!(config.fit.steps, 100);
        assert_eq!(config.fit.confidence_z, 1.96);
    }

    #[test]
    fn test_partial_override() {
        let config = AnalysisConfig::from_toml_str(
            r#"
skip_empty_registries = true

[fit]
upper_bound = 100000
confidence_z = 2.576
"#,
        )
        .unwrap();
        assert!(config.skip_empty_registries);
        assert_eq!(config.fit.lower_bound, Some(2000));
        assert_eq!(config.fit.upper_bound, Some(100000));
        assert_eq!(config.fit.steps, 100);
        assert_eq!(config.fit.confidence_z, 2.576);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result = AnalysisConfig::from_toml_str("[fit]\nmax_x = 5\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
