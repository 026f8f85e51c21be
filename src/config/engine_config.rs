//! Engine configuration support
//!
//! Loads scoring, credit, pipeline, profile and trigger settings from a
//! `framescan.toml` file. Every section is optional; anything not set falls
//! back to the built-in defaults.
//!
//! # Configuration Format
//!
//! ```toml
//! # framescan.toml
//!
//! [scoring]
//! apex_threshold = 70
//! slave_threshold = 35
//! low_variance = 15.0
//! mixed_variance = 25.0
//!
//! [scoring.axis_weights]
//! assumptive_state = 0.14
//! authority_posture = 0.12
//!
//! [credits]
//! initial_credits = 0
//! initial_bonus_credits = 3
//! tier_costs = { basic = 1, detailed = 5 }
//!
//! [[credits.packages]]
//! id = "starter"
//! credits = 10
//!
//! [pipeline]
//! min_context_words = 6
//!
//! [profile]
//! trend_window = 5
//! unscored_default = 50
//!
//! [triggers]
//! low_score_threshold = 40
//! ```

use crate::models::ScanTier;
use crate::scoring::AxisId;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// Top-level engine configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub credits: CreditsConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub profile: ProfileConfig,
    #[serde(default)]
    pub triggers: TriggerConfig,
}

/// Composite score weights and classification thresholds
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub axis_weights: AxisWeights,
    /// Minimum composite for an `apex` classification
    pub apex_threshold: u8,
    /// Composite at or below which the frame is `slave`
    pub slave_threshold: u8,
    /// Max sub-score std-dev still considered consistent enough for `apex`
    pub low_variance: f64,
    /// Sub-score std-dev above which the frame is `mixed` regardless of mean
    pub mixed_variance: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            axis_weights: AxisWeights::default(),
            apex_threshold: 70,
            slave_threshold: 35,
            low_variance: 15.0,
            mixed_variance: 25.0,
        }
    }
}

/// Per-axis weights for the composite score (should sum to 1.0)
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AxisWeights {
    pub assumptive_state: f64,
    pub authority_posture: f64,
    pub boundary_control: f64,
    pub need_reduction: f64,
    pub persuasion_style: f64,
    pub identity_vs_tactic: f64,
    pub emotional_regulation: f64,
    pub value_anchoring: f64,
    pub validation_independence: f64,
}

impl Default for AxisWeights {
    fn default() -> Self {
        Self {
            assumptive_state: 0.14,
            authority_posture: 0.12,
            boundary_control: 0.12,
            need_reduction: 0.12,
            persuasion_style: 0.10,
            identity_vs_tactic: 0.10,
            emotional_regulation: 0.10,
            value_anchoring: 0.10,
            validation_independence: 0.10,
        }
    }
}

impl AxisWeights {
    /// Weight for a single axis
    pub fn get(&self, axis: AxisId) -> f64 {
        match axis {
            AxisId::AssumptiveState => self.assumptive_state,
            AxisId::AuthorityPosture => self.authority_posture,
            AxisId::BoundaryControl => self.boundary_control,
            AxisId::NeedReduction => self.need_reduction,
            AxisId::PersuasionStyle => self.persuasion_style,
            AxisId::IdentityVsTactic => self.identity_vs_tactic,
            AxisId::EmotionalRegulation => self.emotional_regulation,
            AxisId::ValueAnchoring => self.value_anchoring,
            AxisId::ValidationIndependence => self.validation_independence,
        }
    }

    fn get_mut(&mut self, axis: AxisId) -> &mut f64 {
        match axis {
            AxisId::AssumptiveState => &mut self.assumptive_state,
            AxisId::AuthorityPosture => &mut self.authority_posture,
            AxisId::BoundaryControl => &mut self.boundary_control,
            AxisId::NeedReduction => &mut self.need_reduction,
            AxisId::PersuasionStyle => &mut self.persuasion_style,
            AxisId::IdentityVsTactic => &mut self.identity_vs_tactic,
            AxisId::EmotionalRegulation => &mut self.emotional_regulation,
            AxisId::ValueAnchoring => &mut self.value_anchoring,
            AxisId::ValidationIndependence => &mut self.validation_independence,
        }
    }

    pub fn total(&self) -> f64 {
        AxisId::all().iter().map(|a| self.get(*a)).sum()
    }

    /// No negative or non-finite weight
    pub fn is_well_formed(&self) -> bool {
        AxisId::all()
            .iter()
            .all(|a| self.get(*a).is_finite() && self.get(*a) >= 0.0)
    }

    /// Validate weights are well formed and sum to 1.0
    pub fn is_valid(&self) -> bool {
        self.is_well_formed() && (self.total() - 1.0).abs() < 0.001
    }

    /// Normalize weights to sum to 1.0
    pub fn normalize(&mut self) {
        let total = self.total();
        if total > 0.0 && total.is_finite() {
            for axis in AxisId::all() {
                *self.get_mut(*axis) /= total;
            }
        }
    }
}

/// Credit ledger settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CreditsConfig {
    /// Base credits on first run
    pub initial_credits: u64,
    /// Bonus credits on first run
    pub initial_bonus_credits: u64,
    pub tier_costs: TierCosts,
    pub packages: Vec<CreditPackage>,
}

impl Default for CreditsConfig {
    fn default() -> Self {
        Self {
            initial_credits: 0,
            initial_bonus_credits: 3,
            tier_costs: TierCosts::default(),
            packages: default_packages(),
        }
    }
}

impl CreditsConfig {
    /// Credit cost of a tier. Text scans are always free.
    pub fn cost_for(&self, tier: ScanTier) -> u64 {
        match tier {
            ScanTier::Text => 0,
            ScanTier::Basic => self.tier_costs.basic,
            ScanTier::Detailed => self.tier_costs.detailed,
        }
    }

    pub fn package(&self, package_id: &str) -> Option<&CreditPackage> {
        self.packages.iter().find(|p| p.id == package_id)
    }
}

/// Costs of the paid scan tiers
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TierCosts {
    pub basic: u64,
    pub detailed: u64,
}

impl Default for TierCosts {
    fn default() -> Self {
        Self {
            basic: 1,
            detailed: 5,
        }
    }
}

/// A purchasable bundle of credits
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CreditPackage {
    pub id: String,
    pub credits: u64,
    #[serde(default)]
    pub bonus_credits: u64,
}

impl CreditPackage {
    pub fn new(id: impl Into<String>, credits: u64, bonus_credits: u64) -> Self {
        Self {
            id: id.into(),
            credits,
            bonus_credits,
        }
    }
}

fn default_packages() -> Vec<CreditPackage> {
    vec![
        CreditPackage::new("starter", 10, 0),
        CreditPackage::new("standard", 25, 5),
        CreditPackage::new("pro", 60, 15),
    ]
}

/// Scan pipeline pre-check settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Text shorter than this (in words) lacks the who/what/when/why context
    pub min_context_words: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_context_words: 6,
        }
    }
}

/// Profile aggregation settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProfileConfig {
    /// Number of reports preceding the latest that form the trend baseline
    pub trend_window: usize,
    /// Profile score reported for a contact with no scans
    pub unscored_default: u8,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            trend_window: 5,
            unscored_default: 50,
        }
    }
}

/// Advisory trigger thresholds
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TriggerConfig {
    pub low_score_threshold: u8,
    pub low_credit_threshold: u64,
    pub repeat_tier_threshold: u32,
    pub pattern_threshold: u32,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            low_score_threshold: 40,
            low_credit_threshold: 3,
            repeat_tier_threshold: 3,
            pattern_threshold: 3,
        }
    }
}

impl EngineConfig {
    /// Repair values that would break scoring invariants
    fn sanitize(&mut self) {
        let weights = &mut self.scoring.axis_weights;
        if !weights.is_well_formed() || weights.total() <= 0.0 {
            warn!("Axis weights contain negative or non-finite values, using defaults");
            *weights = AxisWeights::default();
        } else if !weights.is_valid() {
            debug!("Axis weights sum to {:.3}, normalizing", weights.total());
            weights.normalize();
        }

        if self.scoring.slave_threshold >= self.scoring.apex_threshold {
            warn!(
                "slave_threshold ({}) must be below apex_threshold ({}), using defaults",
                self.scoring.slave_threshold, self.scoring.apex_threshold
            );
            let defaults = ScoringConfig::default();
            self.scoring.apex_threshold = defaults.apex_threshold;
            self.scoring.slave_threshold = defaults.slave_threshold;
        }

        if self.profile.trend_window == 0 {
            warn!("trend_window must be at least 1, using 1");
            self.profile.trend_window = 1;
        }
        if self.profile.unscored_default > 100 {
            warn!(
                "unscored_default ({}) is above 100, using 100",
                self.profile.unscored_default
            );
            self.profile.unscored_default = 100;
        }
    }
}

/// Load engine configuration from a TOML file.
///
/// A missing file yields defaults. A malformed file is logged and also
/// yields defaults, so a bad edit never blocks the engine.
pub fn load_engine_config(path: &Path) -> EngineConfig {
    if !path.exists() {
        debug!("No engine config at {}, using defaults", path.display());
        return EngineConfig::default();
    }

    match load_toml_config(path) {
        Ok(mut config) => {
            debug!("Loaded engine config from {}", path.display());
            config.sanitize();
            config
        }
        Err(e) => {
            warn!("Failed to load {}: {}", path.display(), e);
            EngineConfig::default()
        }
    }
}

/// Parse engine configuration from a TOML string
pub fn parse_engine_config(content: &str) -> anyhow::Result<EngineConfig> {
    let mut config: EngineConfig = toml::from_str(content)?;
    config.sanitize();
    Ok(config)
}

fn load_toml_config(path: &Path) -> anyhow::Result<EngineConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: EngineConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Example config written by `framescan init`
pub const EXAMPLE_CONFIG: &str = r#"# framescan engine configuration

[scoring]
# Composite thresholds for the overall frame classification
apex_threshold = 70
slave_threshold = 35
low_variance = 15.0
mixed_variance = 25.0

# Axis weights are normalized to sum to 1.0
[scoring.axis_weights]
assumptive_state = 0.14
authority_posture = 0.12
boundary_control = 0.12
need_reduction = 0.12
persuasion_style = 0.10
identity_vs_tactic = 0.10
emotional_regulation = 0.10
value_anchoring = 0.10
validation_independence = 0.10

[credits]
initial_credits = 0
initial_bonus_credits = 3
tier_costs = { basic = 1, detailed = 5 }

[[credits.packages]]
id = "starter"
credits = 10

[[credits.packages]]
id = "standard"
credits = 25
bonus_credits = 5

[pipeline]
min_context_words = 6

[profile]
trend_window = 5
unscored_default = 50

[triggers]
low_score_threshold = 40
low_credit_threshold = 3
repeat_tier_threshold = 3
pattern_threshold = 3
"#;
