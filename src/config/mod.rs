//! Configuration module for framescan
//!
//! This module handles:
//! - Engine configuration (framescan.toml): weights, thresholds, credit costs
//! - User configuration (~/.config/framescan/config.toml): provider backend and keys

mod engine_config;
mod user_config;

pub use engine_config::{
    load_engine_config, parse_engine_config, AxisWeights, CreditPackage, CreditsConfig,
    EngineConfig, PipelineConfig, ProfileConfig, ScoringConfig, TierCosts, TriggerConfig,
    EXAMPLE_CONFIG,
};
pub use user_config::{ProviderSettings, UserConfig};
