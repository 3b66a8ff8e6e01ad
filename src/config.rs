//! Engine configuration: power bands, view-action conventions, heuristics

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{
    HIGH_MAX, LOW_MAX, MAX_POWER_LEVEL, MEDIUM_MAX, POWER_GAP_THRESHOLD, TOP_PERMISSIONS,
    VIEW_CATEGORIES, VIEW_PATTERNS,
};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub power_bands: PowerBands,

    #[serde(default)]
    pub view: ViewMatcher,

    #[serde(default)]
    pub conflicts: ConflictConfig,

    #[serde(default)]
    pub analysis: AnalysisConfig,
}

impl EngineConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject band thresholds that are not strictly increasing within 0..=100
    pub fn validate(&self) -> Result<()> {
        let b = &self.power_bands;
        if !(b.low < b.medium && b.medium < b.high && b.high <= MAX_POWER_LEVEL) {
            return Err(Error::Config(format!(
                "power bands must satisfy low < medium < high <= {}, got {}/{}/{}",
                MAX_POWER_LEVEL, b.low, b.medium, b.high
            )));
        }
        Ok(())
    }
}

/// Classification of a power level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerBand {
    Low,
    Medium,
    High,
    Critical,
}

/// Inclusive upper bounds for the low, medium and high bands; anything above is critical
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerBands {
    pub low: u8,
    pub medium: u8,
    pub high: u8,
}

impl Default for PowerBands {
    fn default() -> Self {
        PowerBands { low: LOW_MAX, medium: MEDIUM_MAX, high: HIGH_MAX }
    }
}

impl PowerBands {
    #[inline]
    pub fn classify(&self, level: u8) -> PowerBand {
        if level <= self.low {
            PowerBand::Low
        } else if level <= self.medium {
            PowerBand::Medium
        } else if level <= self.high {
            PowerBand::High
        } else {
            PowerBand::Critical
        }
    }
}

/// Decides whether an action is a "view" action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewMatcher {
    pub categories: Vec<String>,
    pub patterns: Vec<String>,
}

impl Default for ViewMatcher {
    fn default() -> Self {
        ViewMatcher {
            categories: VIEW_CATEGORIES.iter().map(|s| s.to_string()).collect(),
            patterns: VIEW_PATTERNS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ViewMatcher {
    pub fn is_view(&self, action_key: &str, display_name: &str, category: Option<&str>) -> bool {
        if let Some(c) = category {
            if self.categories.iter().any(|v| v.eq_ignore_ascii_case(c)) {
                return true;
            }
        }
        let key = action_key.to_lowercase();
        let name = display_name.to_lowercase();
        self.patterns.iter().any(|p| {
            let p = p.to_lowercase();
            !p.is_empty() && (key.contains(&p) || name.contains(&p))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConflictConfig {
    pub power_gap_threshold: u8,
}

impl Default for ConflictConfig {
    fn default() -> Self {
        ConflictConfig { power_gap_threshold: POWER_GAP_THRESHOLD }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub top_permissions: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig { top_permissions: TOP_PERMISSIONS }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let config = EngineConfig::parse("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.power_bands.classify(30), PowerBand::Low);
        assert_eq!(config.power_bands.classify(31), PowerBand::Medium);
        assert_eq!(config.power_bands.classify(60), PowerBand::Medium);
        assert_eq!(config.power_bands.classify(61), PowerBand::High);
        assert_eq!(config.power_bands.classify(80), PowerBand::High);
        assert_eq!(config.power_bands.classify(81), PowerBand::Critical);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = EngineConfig::parse(
            r#"
            [power_bands]
            low = 20

            [view]
            patterns = ["list"]
            "#,
        )
        .unwrap();
        assert_eq!(config.power_bands.low, 20);
        assert_eq!(config.power_bands.medium, MEDIUM_MAX);
        assert_eq!(config.view.categories, vec!["access".to_string()]);
        assert!(config.view.is_view("list", "List", None));
        assert!(!config.view.is_view("view", "View", None));
        assert_eq!(config.conflicts.power_gap_threshold, POWER_GAP_THRESHOLD);
    }

    #[test]
    fn rejects_unordered_bands() {
        let e = EngineConfig::parse("[power_bands]\nlow = 70\nmedium = 60\nhigh = 80\n");
        assert!(matches!(e, Err(Error::Config(_))));
        assert!(EngineConfig::parse("[power_bands]\nhigh = 101\n").is_err());
    }

    #[test]
    fn view_matching_is_case_insensitive() {
        let m = ViewMatcher::default();
        assert!(m.is_view("VIEW", "", None));
        assert!(m.is_view("open", "Read Only", None));
        assert!(m.is_view("enter", "Enter", Some("Access")));
        assert!(!m.is_view("delete", "Delete", Some("danger")));
    }
}
