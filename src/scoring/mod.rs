//! Axis-Based Frame Scoring
//!
//! Turns nine per-axis judgments into a single 0-100 frame score and an
//! overall frame classification.
//!
//! # Scoring Formula
//!
//! ```text
//! sub_i       = round(((raw_i + 3) / 6) × 100)      raw_i ∈ [-3, +3]
//! frame_score = round(Σ weight_i × sub_i)           Σ weight_i = 1
//! ```
//!
//! # Classification (evaluated in order)
//!
//! - **mixed**: std-dev of sub-scores above `mixed_variance`
//! - **apex**: composite ≥ `apex_threshold` and std-dev ≤ `low_variance`
//! - **slave**: composite ≤ `slave_threshold`
//! - **neutral**: everything else
//!
//! # Example
//!
//! All nine axes at raw `0` give sub-scores of 50 each, so the composite
//! is 50 whatever the weights are.

mod axis;
mod frame_scorer;

pub use axis::{AxisId, AxisScore};
pub use frame_scorer::{compute_frame_score, FrameScore, FrameScorer, OverallFrame};

use thiserror::Error;

/// Errors raised by the scoring model
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScoringError {
    #[error("Invalid axis score: {0}")]
    InvalidAxisScore(String),
}

pub type ScoringResult<T> = Result<T, ScoringError>;

/// Lowest raw score an axis may take
pub const MIN_AXIS_SCORE: i32 = -3;
/// Highest raw score an axis may take
pub const MAX_AXIS_SCORE: i32 = 3;
