use serde::Deserialize;
use std::collections::HashMap;

use crate::error::{MixError, MixResult};
use crate::types::MediaType;

/// Root application configuration. Loaded from an optional TOML file and
/// environment variables with the prefix `MEDIAMIX__`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub optimizer: OptimizerConfig,
    #[serde(default)]
    pub curve: CurveConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_investments_path")]
    pub investments_path: String,
    #[serde(default = "default_contributions_path")]
    pub contributions_path: String,
}

/// Media-type classification. Explicit `channels` entries win over the
/// keyword rule.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    #[serde(default = "default_online_keywords")]
    pub online_keywords: Vec<String>,
    #[serde(default)]
    pub channels: HashMap<String, MediaType>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OptimizerConfig {
    /// Lowest share of the current budget a channel may shrink to.
    #[serde(default = "default_floor_ratio")]
    pub floor_ratio: f64,
    /// Highest multiple of the current budget a channel may grow to.
    #[serde(default = "default_ceiling_ratio")]
    pub ceiling_ratio: f64,
    #[serde(default = "default_increment")]
    pub increment: f64,
    /// Remaining budget at or below this amount stops the run.
    #[serde(default = "default_stop_threshold")]
    pub stop_threshold: f64,
    /// ROI decay exponent above the current budget.
    #[serde(default = "default_k_increase")]
    pub k_increase: f64,
    /// ROI recovery exponent below the current budget.
    #[serde(default = "default_k_decrease")]
    pub k_decrease: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurveConfig {
    #[serde(default = "default_offline_scale")]
    pub offline_scale: f64,
    #[serde(default = "default_online_scale")]
    pub online_scale: f64,
    #[serde(default = "default_concavity")]
    pub default_concavity: f64,
    /// Contribution never exceeds `investment * roi_cap_multiple`.
    #[serde(default = "default_roi_cap_multiple")]
    pub roi_cap_multiple: f64,
    /// Sampled range is `[0, reference_budget * max_budget_multiple]`.
    #[serde(default = "default_max_budget_multiple")]
    pub max_budget_multiple: f64,
    #[serde(default = "default_samples")]
    pub samples: usize,
    #[serde(default = "default_optimal_roi_fraction")]
    pub optimal_roi_fraction: f64,
    #[serde(default = "default_deterioration_threshold")]
    pub deterioration_threshold: f64,
    #[serde(default)]
    pub channels: HashMap<String, ChannelCurveConfig>,
}

/// Per-channel overrides of the power-law constants.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelCurveConfig {
    pub max_roi: Option<f64>,
    pub concavity: Option<f64>,
}

// Default functions
fn default_investments_path() -> String {
    "data/investments.json".to_string()
}
fn default_contributions_path() -> String {
    "data/contributions.json".to_string()
}
fn default_online_keywords() -> Vec<String> {
    ["digital", "online", "social", "search", "display"]
        .iter()
        .map(|k| k.to_string())
        .collect()
}
fn default_floor_ratio() -> f64 {
    0.5
}
fn default_ceiling_ratio() -> f64 {
    3.0
}
fn default_increment() -> f64 {
    1000.0
}
fn default_stop_threshold() -> f64 {
    1.0
}
fn default_k_increase() -> f64 {
    0.2
}
fn default_k_decrease() -> f64 {
    0.1
}
fn default_offline_scale() -> f64 {
    1.0
}
fn default_online_scale() -> f64 {
    1.1
}
fn default_concavity() -> f64 {
    0.35
}
fn default_roi_cap_multiple() -> f64 {
    3.0
}
fn default_max_budget_multiple() -> f64 {
    3.0
}
fn default_samples() -> usize {
    200
}
fn default_optimal_roi_fraction() -> f64 {
    0.85
}
fn default_deterioration_threshold() -> f64 {
    0.01
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            investments_path: default_investments_path(),
            contributions_path: default_contributions_path(),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            online_keywords: default_online_keywords(),
            channels: HashMap::new(),
        }
    }
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            floor_ratio: default_floor_ratio(),
            ceiling_ratio: default_ceiling_ratio(),
            increment: default_increment(),
            stop_threshold: default_stop_threshold(),
            k_increase: default_k_increase(),
            k_decrease: default_k_decrease(),
        }
    }
}

impl Default for CurveConfig {
    fn default() -> Self {
        Self {
            offline_scale: default_offline_scale(),
            online_scale: default_online_scale(),
            default_concavity: default_concavity(),
            roi_cap_multiple: default_roi_cap_multiple(),
            max_budget_multiple: default_max_budget_multiple(),
            samples: default_samples(),
            optimal_roi_fraction: default_optimal_roi_fraction(),
            deterioration_threshold: default_deterioration_threshold(),
            channels: HashMap::new(),
        }
    }
}

impl OptimizerConfig {
    /// Reject bounds and exponents that would break the concave response.
    pub fn validate(&self) -> MixResult<()> {
        if !(self.floor_ratio >= 0.0 && self.floor_ratio <= 1.0) {
            return Err(MixError::Validation(format!(
                "optimizer.floor_ratio must be within [0, 1], got {}",
                self.floor_ratio
            )));
        }
        if !(self.ceiling_ratio >= 1.0 && self.ceiling_ratio.is_finite()) {
            return Err(MixError::Validation(format!(
                "optimizer.ceiling_ratio must be >= 1, got {}",
                self.ceiling_ratio
            )));
        }
        if !(self.increment > 0.0 && self.increment.is_finite()) {
            return Err(MixError::Validation(format!(
                "optimizer.increment must be positive, got {}",
                self.increment
            )));
        }
        if !(self.stop_threshold >= 0.0) {
            return Err(MixError::Validation(format!(
                "optimizer.stop_threshold must be non-negative, got {}",
                self.stop_threshold
            )));
        }
        if !(0.0 <= self.k_decrease && self.k_decrease <= self.k_increase && self.k_increase < 1.0)
        {
            return Err(MixError::Validation(format!(
                "optimizer exponents must satisfy 0 <= k_decrease <= k_increase < 1, got {} / {}",
                self.k_decrease, self.k_increase
            )));
        }
        Ok(())
    }
}

impl CurveConfig {
    pub fn validate(&self) -> MixResult<()> {
        if !(self.offline_scale > 0.0 && self.online_scale > 0.0) {
            return Err(MixError::Validation(
                "curve scales must be positive".to_string(),
            ));
        }
        let concavities = std::iter::once(self.default_concavity)
            .chain(self.channels.values().filter_map(|c| c.concavity));
        for concavity in concavities {
            if !(0.0..1.0).contains(&concavity) {
                return Err(MixError::Validation(format!(
                    "curve concavity must be within [0, 1), got {concavity}"
                )));
            }
        }
        if self.samples < 2 {
            return Err(MixError::Validation(format!(
                "curve.samples must be at least 2, got {}",
                self.samples
            )));
        }
        if !(self.optimal_roi_fraction > 0.0 && self.optimal_roi_fraction <= 1.0) {
            return Err(MixError::Validation(format!(
                "curve.optimal_roi_fraction must be within (0, 1], got {}",
                self.optimal_roi_fraction
            )));
        }
        if !(self.roi_cap_multiple > 0.0 && self.max_budget_multiple > 0.0) {
            return Err(MixError::Validation(
                "curve multiples must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl AppConfig {
    /// Load configuration from `path` (when given) layered under environment
    /// variables, then validate it.
    pub fn load(path: Option<&str>) -> MixResult<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("MEDIAMIX")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("media.online_keywords"),
        );

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> MixResult<()> {
        self.optimizer.validate()?;
        self.curve.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.optimizer.floor_ratio, 0.5);
        assert_eq!(config.optimizer.ceiling_ratio, 3.0);
        assert_eq!(config.media.online_keywords.len(), 5);
    }

    #[test]
    fn test_rejects_inverted_exponents() {
        let optimizer = OptimizerConfig {
            k_increase: 0.05,
            k_decrease: 0.3,
            ..Default::default()
        };
        assert!(matches!(optimizer.validate(), Err(MixError::Validation(_))));
    }

    #[test]
    fn test_rejects_bad_bounds() {
        let optimizer = OptimizerConfig {
            ceiling_ratio: 0.8,
            ..Default::default()
        };
        assert!(optimizer.validate().is_err());

        let optimizer = OptimizerConfig {
            increment: 0.0,
            ..Default::default()
        };
        assert!(optimizer.validate().is_err());
    }

    #[test]
    fn test_rejects_channel_concavity_out_of_range() {
        let mut curve = CurveConfig::default();
        curve.channels.insert(
            "TV".to_string(),
            ChannelCurveConfig {
                max_roi: None,
                concavity: Some(1.2),
            },
        );
        assert!(curve.validate().is_err());
    }

    #[test]
    fn test_deserialize_partial_sections() {
        let raw = serde_json::json!({
            "optimizer": { "increment": 500.0 },
            "media": { "channels": { "Podcast": "online" } }
        });
        let config: AppConfig = serde_json::from_value(raw).unwrap();
        assert_eq!(config.optimizer.increment, 500.0);
        assert_eq!(config.optimizer.ceiling_ratio, 3.0);
        assert_eq!(config.media.channels.get("Podcast"), Some(&MediaType::Online));
        assert_eq!(config.curve.samples, 200);
    }
}
