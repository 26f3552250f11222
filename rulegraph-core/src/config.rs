use crate::always_apply::{default_always_apply_rules, AlwaysApplyRule};
use crate::classifier::CategoryTable;
use crate::error::{PipelineError, PipelineResult};
use crate::patterns::{PatternLibrary, PatternLibraryConfig};
use crate::types::ExtractorId;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_confidence_floor() -> f64 {
    0.3
}

fn default_promotion_threshold() -> f64 {
    0.75
}

fn default_hybrid_threshold() -> f64 {
    0.85
}

/// Sections treated as critical filing rules unless a config overrides them
fn default_seed_ids() -> Vec<String> {
    [
        "437c", "1005", "1013", "1013a", "12", "12a", "12c", "430.30", "2024.020", "2030.300",
        "2031.310", "2025.480", "1010", "1010.5", "1010.6", "430.10", "430.20", "430.40",
        "430.41", "435", "436", "472", "472a", "472c", "472d", "1003", "473", "410.10",
        "425.10", "425.11", "425.12", "425.13", "431.30", "431.40", "426.10", "426.30",
        "426.50", "1014", "2025.010", "2030.010", "2031.010", "2033.010", "664", "664.5",
        "664.6", "667", "670", "367", "128.7", "659", "659a", "663", "2016.010", "2023.010",
        "1086", "1094.5", "1094.6", "527",
    ]
    .iter()
    .map(|id| id.to_string())
    .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Candidates below this are dropped (inclusive floor); hand-authored rules bypass it
    #[serde(default = "default_confidence_floor")]
    pub aggregation_confidence_floor: f64,
    /// Aggregated confidence at which a non-seed document becomes a discovered rule
    #[serde(default = "default_promotion_threshold")]
    pub discovery_promotion_threshold: f64,
    /// Discovered rules at or above this join the expanded seed set
    #[serde(default = "default_hybrid_threshold")]
    pub hybrid_promotion_threshold: f64,
    /// Maximum category-similarity pairs per category; unbounded when absent
    #[serde(default)]
    pub category_similarity_pair_cap: Option<usize>,
    /// Date temporal criticality is measured against; run start date when absent
    #[serde(default)]
    pub analysis_date: Option<NaiveDate>,
    #[serde(default = "default_seed_ids")]
    pub seed_ids: Vec<String>,
    /// Run each extractor on its own scoped thread
    #[serde(default)]
    pub parallel: bool,
    /// Extractor pipeline - defines which extractors run and in what order
    #[serde(default)]
    pub pipeline: ExtractorPipelineConfig,
    #[serde(default)]
    pub patterns: PatternLibraryConfig,
    #[serde(default)]
    pub categories: CategoryTable,
    #[serde(default = "default_always_apply_rules")]
    pub always_apply: Vec<AlwaysApplyRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorPipelineConfig {
    /// List of extractors to run in order
    pub extractors: Vec<ExtractorConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Name of the extractor
    pub name: String,
    /// Whether this extractor is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for ExtractorPipelineConfig {
    fn default() -> Self {
        Self {
            extractors: ExtractorId::EXTRACTORS
                .iter()
                .map(|id| ExtractorConfig {
                    name: id.name().to_string(),
                    enabled: true,
                })
                .collect(),
        }
    }
}

impl ExtractorPipelineConfig {
    pub fn enabled(&self) -> impl Iterator<Item = &ExtractorConfig> {
        self.extractors.iter().filter(|e| e.enabled)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            aggregation_confidence_floor: default_confidence_floor(),
            discovery_promotion_threshold: default_promotion_threshold(),
            hybrid_promotion_threshold: default_hybrid_threshold(),
            category_similarity_pair_cap: None,
            analysis_date: None,
            seed_ids: default_seed_ids(),
            parallel: false,
            pipeline: ExtractorPipelineConfig::default(),
            patterns: PatternLibraryConfig::default(),
            categories: CategoryTable::default(),
            always_apply: default_always_apply_rules(),
        }
    }
}

impl PipelineConfig {
    /// Load config from file path
    pub fn load_from_file(path: &str) -> PipelineResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| PipelineError::ConfigRead {
            path: path.to_string(),
            source,
        })?;
        let config: PipelineConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> PipelineResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Reject anything that would make a run meaningless before extraction starts
    pub fn validate(&self) -> PipelineResult<()> {
        check_threshold("aggregation_confidence_floor", self.aggregation_confidence_floor)?;
        check_threshold("discovery_promotion_threshold", self.discovery_promotion_threshold)?;
        check_threshold("hybrid_promotion_threshold", self.hybrid_promotion_threshold)?;

        for entry in &self.pipeline.extractors {
            if ExtractorId::from_name(&entry.name).is_none() {
                return Err(PipelineError::configuration(format!(
                    "unknown extractor '{}'",
                    entry.name
                )));
            }
        }

        if self.seed_ids.iter().any(|id| id.trim().is_empty()) {
            return Err(PipelineError::configuration("seed ids must not be empty"));
        }

        for rule in &self.always_apply {
            if rule.name.trim().is_empty() {
                return Err(PipelineError::configuration("always-apply rule without a name"));
            }
        }

        self.categories.validate()?;
        PatternLibrary::compile(&self.patterns)?;
        Ok(())
    }

    pub fn effective_analysis_date(&self, started_at: DateTime<Utc>) -> NaiveDate {
        self.analysis_date.unwrap_or_else(|| started_at.date_naive())
    }
}

fn check_threshold(name: &str, value: f64) -> PipelineResult<()> {
    if value.is_nan() || !(0.0..=1.0).contains(&value) {
        return Err(PipelineError::configuration(format!(
            "{} must be within [0, 1], got {}",
            name, value
        )));
    }
    Ok(())
}

/// Named built-in configurations
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigPreset {
    Standard,
    /// Fewer, stronger edges
    Conservative,
    /// Lower floors and a similarity cap for large corpora
    Exploratory,
}

impl ConfigPreset {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "standard" | "default" => Some(ConfigPreset::Standard),
            "conservative" => Some(ConfigPreset::Conservative),
            "exploratory" => Some(ConfigPreset::Exploratory),
            _ => None,
        }
    }
}

pub struct ConfigManager {
    configs: BTreeMap<ConfigPreset, PipelineConfig>,
    default_config: PipelineConfig,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    pub fn new() -> Self {
        let mut manager = Self {
            configs: BTreeMap::new(),
            default_config: PipelineConfig::default(),
        };
        manager.load_builtin_configs();
        manager
    }

    pub fn get_config(&self, preset: &ConfigPreset) -> &PipelineConfig {
        self.configs.get(preset).unwrap_or(&self.default_config)
    }

    pub fn presets(&self) -> impl Iterator<Item = (&ConfigPreset, &PipelineConfig)> {
        self.configs.iter()
    }

    fn load_builtin_configs(&mut self) {
        self.configs.insert(ConfigPreset::Standard, PipelineConfig::default());

        let conservative = PipelineConfig {
            aggregation_confidence_floor: 0.5,
            discovery_promotion_threshold: 0.85,
            hybrid_promotion_threshold: 0.9,
            ..PipelineConfig::default()
        };
        self.configs.insert(ConfigPreset::Conservative, conservative);

        let exploratory = PipelineConfig {
            aggregation_confidence_floor: 0.2,
            discovery_promotion_threshold: 0.6,
            hybrid_promotion_threshold: 0.75,
            category_similarity_pair_cap: Some(500),
            parallel: true,
            ..PipelineConfig::default()
        };
        self.configs.insert(ConfigPreset::Exploratory, exploratory);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.aggregation_confidence_floor, 0.3);
        assert_eq!(config.pipeline.extractors.len(), 5);
        assert!(config.category_similarity_pair_cap.is_none());
    }

    #[test]
    fn nan_and_out_of_range_thresholds_are_rejected() {
        for bad in [f64::NAN, -0.1, 1.5] {
            let config = PipelineConfig {
                aggregation_confidence_floor: bad,
                ..PipelineConfig::default()
            };
            let err = config.validate().unwrap_err();
            assert!(err.is_configuration_error());
        }
    }

    #[test]
    fn unknown_extractor_is_rejected() {
        let mut config = PipelineConfig::default();
        config.pipeline.extractors.push(ExtractorConfig {
            name: "Telepathy".to_string(),
            enabled: true,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let yaml = r#"
aggregation_confidence_floor: 0.4
analysis_date: 2024-06-01
seed_ids: ["437c", "1005"]
pipeline:
  extractors:
    - name: DirectReference
    - name: Sequence
      enabled: false
"#;
        let config: PipelineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.aggregation_confidence_floor, 0.4);
        assert_eq!(config.discovery_promotion_threshold, 0.75);
        assert_eq!(config.analysis_date, NaiveDate::from_ymd_opt(2024, 6, 1));
        assert_eq!(config.pipeline.enabled().count(), 1);
        assert!(!config.always_apply.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_round_trips_through_yaml() {
        let yaml = PipelineConfig::default().to_yaml().unwrap();
        let parsed: PipelineConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.always_apply.len(), PipelineConfig::default().always_apply.len());
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn unreadable_or_malformed_file_is_a_configuration_error() {
        let missing = PipelineConfig::load_from_file("/nonexistent/rulegraph.yaml").unwrap_err();
        assert!(missing.is_configuration_error());

        let path = std::env::temp_dir()
            .join(format!("rulegraph_bad_config_{}.yaml", std::process::id()));
        let yaml = "aggregation_confidence_floor: \"high\"\ncategory_similarity_pair_cap: -5\n";
        std::fs::write(&path, yaml).unwrap();
        let malformed = PipelineConfig::load_from_file(path.to_str().unwrap()).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(malformed, PipelineError::ConfigFormat(_)));
    }

    #[test]
    fn builtin_presets_validate() {
        let manager = ConfigManager::new();
        assert_eq!(manager.presets().count(), 3);
        for (_, config) in manager.presets() {
            assert!(config.validate().is_ok());
        }
        let conservative = manager.get_config(&ConfigPreset::Conservative);
        assert_eq!(conservative.aggregation_confidence_floor, 0.5);
    }
}
