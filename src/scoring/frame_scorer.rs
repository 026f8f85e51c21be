//! Weighted frame scorer
//!
//! Validates a complete nine-axis judgment, maps each raw score onto a
//! 0-100 sub-scale and combines the sub-scores with the configured weights.

use super::{AxisId, AxisScore, ScoringError, ScoringResult, MAX_AXIS_SCORE, MIN_AXIS_SCORE};
use crate::config::ScoringConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Overall frame classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallFrame {
    Apex,
    Slave,
    Mixed,
    Neutral,
}

impl std::fmt::Display for OverallFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverallFrame::Apex => write!(f, "apex"),
            OverallFrame::Slave => write!(f, "slave"),
            OverallFrame::Mixed => write!(f, "mixed"),
            OverallFrame::Neutral => write!(f, "neutral"),
        }
    }
}

/// Composite score derived from a complete set of axis scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameScore {
    /// Weighted composite (0-100)
    pub frame_score: u8,
    pub overall_frame: OverallFrame,
    /// One entry per axis, in canonical axis order
    pub axis_scores: Vec<AxisScore>,
    #[serde(default)]
    pub notes: Vec<String>,
}

/// Frame scorer bound to a scoring configuration
pub struct FrameScorer<'a> {
    config: &'a ScoringConfig,
}

impl<'a> FrameScorer<'a> {
    pub fn new(config: &'a ScoringConfig) -> Self {
        Self { config }
    }

    /// Compute the composite score and classification.
    ///
    /// Fails with `InvalidAxisScore` when an axis is missing, duplicated or
    /// outside [-3, +3]. Values are never clamped.
    pub fn calculate(&self, axis_scores: &[AxisScore]) -> ScoringResult<FrameScore> {
        let ordered = validate_complete(axis_scores)?;

        let subs: Vec<f64> = ordered.iter().map(|a| sub_score(a.score)).collect();
        let weights = &self.config.axis_weights;

        let weighted: f64 = ordered
            .iter()
            .zip(&subs)
            .map(|(a, sub)| weights.get(a.axis_id) * sub)
            .sum();
        let frame_score = weighted.round().clamp(0.0, 100.0) as u8;

        let spread = std_dev(&subs);
        let overall_frame = self.classify(frame_score, spread);

        debug!(
            "Frame score: {} ({}) - sub-score std-dev {:.1}",
            frame_score, overall_frame, spread
        );

        Ok(FrameScore {
            frame_score,
            overall_frame,
            axis_scores: ordered,
            notes: Vec::new(),
        })
    }

    fn classify(&self, frame_score: u8, spread: f64) -> OverallFrame {
        if spread > self.config.mixed_variance {
            OverallFrame::Mixed
        } else if frame_score >= self.config.apex_threshold && spread <= self.config.low_variance {
            OverallFrame::Apex
        } else if frame_score <= self.config.slave_threshold {
            OverallFrame::Slave
        } else {
            OverallFrame::Neutral
        }
    }

    /// Generate human-readable explanation of the score
    pub fn explain(&self, score: &FrameScore) -> String {
        let mut lines = Vec::new();

        lines.push(format!(
            "# Frame Score: {} ({})\n",
            score.frame_score, score.overall_frame
        ));

        lines.push("## Scoring Formula\n".to_string());
        lines.push("```".to_string());
        lines.push("sub   = round((raw + 3) / 6 × 100)".to_string());
        lines.push("score = round(Σ weight × sub)".to_string());
        lines.push("```\n".to_string());

        lines.push("## Axes\n".to_string());
        let weights = &self.config.axis_weights;
        for axis in &score.axis_scores {
            let sub = sub_score(axis.score);
            let weight = weights.get(axis.axis_id);
            lines.push(format!(
                "- **{}**: raw {:+}, sub {:.0}, weight {:.2} → {:.1} pts",
                axis.axis_id.label(),
                axis.score,
                sub,
                weight,
                weight * sub
            ));
        }

        if !score.notes.is_empty() {
            lines.push("\n## Notes\n".to_string());
            for note in &score.notes {
                lines.push(format!("- {}", note));
            }
        }

        lines.join("\n")
    }
}

/// Compute a frame score with the default weights and thresholds
pub fn compute_frame_score(axis_scores: &[AxisScore]) -> ScoringResult<FrameScore> {
    let config = ScoringConfig::default();
    FrameScorer::new(&config).calculate(axis_scores)
}

/// Map a raw axis score onto the 0-100 sub-scale
fn sub_score(raw: i32) -> f64 {
    ((f64::from(raw - MIN_AXIS_SCORE) / 6.0) * 100.0).round()
}

/// Population standard deviation
fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

/// Check that every axis appears exactly once with an in-range score and
/// return the scores in canonical order.
fn validate_complete(axis_scores: &[AxisScore]) -> ScoringResult<Vec<AxisScore>> {
    let mut slots: [Option<AxisScore>; 9] = [None; 9];

    for axis in axis_scores {
        if !(MIN_AXIS_SCORE..=MAX_AXIS_SCORE).contains(&axis.score) {
            return Err(ScoringError::InvalidAxisScore(format!(
                "{} = {} is outside [{}, {}]",
                axis.axis_id, axis.score, MIN_AXIS_SCORE, MAX_AXIS_SCORE
            )));
        }
        let slot = &mut slots[axis.axis_id.index()];
        if slot.is_some() {
            return Err(ScoringError::InvalidAxisScore(format!(
                "duplicate score for {}",
                axis.axis_id
            )));
        }
        *slot = Some(*axis);
    }

    let missing: Vec<&str> = AxisId::all()
        .iter()
        .filter(|a| slots[a.index()].is_none())
        .map(|a| a.name())
        .collect();
    if !missing.is_empty() {
        return Err(ScoringError::InvalidAxisScore(format!(
            "missing axes: {}",
            missing.join(", ")
        )));
    }

    Ok(slots.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AxisWeights;

    fn uniform(raw: i32) -> Vec<AxisScore> {
        AxisId::all().iter().map(|a| AxisScore::new(*a, raw)).collect()
    }

    fn with_axis(mut scores: Vec<AxisScore>, axis: AxisId, raw: i32) -> Vec<AxisScore> {
        scores[axis.index()].score = raw;
        scores
    }

    #[test]
    fn test_all_zero_scores_fifty() {
        let score = compute_frame_score(&uniform(0)).unwrap();
        assert_eq!(score.frame_score, 50);
        assert_eq!(score.axis_scores.len(), 9);
    }

    #[test]
    fn test_all_zero_scores_fifty_with_skewed_weights() {
        let config = ScoringConfig {
            axis_weights: AxisWeights {
                assumptive_state: 0.6,
                authority_posture: 0.4,
                boundary_control: 0.0,
                need_reduction: 0.0,
                persuasion_style: 0.0,
                identity_vs_tactic: 0.0,
                emotional_regulation: 0.0,
                value_anchoring: 0.0,
                validation_independence: 0.0,
            },
            ..Default::default()
        };
        let score = FrameScorer::new(&config).calculate(&uniform(0)).unwrap();
        assert_eq!(score.frame_score, 50);
    }

    #[test]
    fn test_extremes() {
        assert_eq!(compute_frame_score(&uniform(3)).unwrap().frame_score, 100);
        assert_eq!(compute_frame_score(&uniform(-3)).unwrap().frame_score, 0);
    }

    #[test]
    fn test_sub_score_mapping() {
        assert_eq!(sub_score(-3), 0.0);
        assert_eq!(sub_score(-2), 17.0);
        assert_eq!(sub_score(-1), 33.0);
        assert_eq!(sub_score(0), 50.0);
        assert_eq!(sub_score(1), 67.0);
        assert_eq!(sub_score(2), 83.0);
        assert_eq!(sub_score(3), 100.0);
    }

    #[test]
    fn test_totality_over_range() {
        // Every axis swept across its range while the rest stay at each level
        for base in MIN_AXIS_SCORE..=MAX_AXIS_SCORE {
            for axis in AxisId::all() {
                for raw in MIN_AXIS_SCORE..=MAX_AXIS_SCORE {
                    let scores = with_axis(uniform(base), *axis, raw);
                    let result = compute_frame_score(&scores).unwrap();
                    assert!(result.frame_score <= 100);
                }
            }
        }
    }

    #[test]
    fn test_monotonic_in_each_axis() {
        for base in MIN_AXIS_SCORE..=MAX_AXIS_SCORE {
            for axis in AxisId::all() {
                let mut previous = 0u8;
                for raw in MIN_AXIS_SCORE..=MAX_AXIS_SCORE {
                    let scores = with_axis(uniform(base), *axis, raw);
                    let current = compute_frame_score(&scores).unwrap().frame_score;
                    assert!(
                        current >= previous,
                        "{} raised to {} dropped score {} -> {}",
                        axis,
                        raw,
                        previous,
                        current
                    );
                    previous = current;
                }
            }
        }
    }

    #[test]
    fn test_out_of_range_is_rejected_not_clamped() {
        let scores = with_axis(uniform(0), AxisId::BoundaryControl, 4);
        let err = compute_frame_score(&scores).unwrap_err();
        assert!(err.to_string().contains("boundary_control"));

        let scores = with_axis(uniform(0), AxisId::NeedReduction, -4);
        assert!(compute_frame_score(&scores).is_err());
    }

    #[test]
    fn test_missing_axis_is_rejected() {
        let mut scores = uniform(1);
        scores.pop();
        let err = compute_frame_score(&scores).unwrap_err();
        assert!(err.to_string().contains("validation_independence"));
    }

    #[test]
    fn test_duplicate_axis_is_rejected() {
        let mut scores = uniform(1);
        scores.push(AxisScore::new(AxisId::AssumptiveState, 2));
        assert!(compute_frame_score(&scores).is_err());
    }

    #[test]
    fn test_output_in_canonical_order() {
        let mut scores = uniform(1);
        scores.reverse();
        let result = compute_frame_score(&scores).unwrap();
        let ids: Vec<AxisId> = result.axis_scores.iter().map(|a| a.axis_id).collect();
        assert_eq!(ids, AxisId::all().to_vec());
    }

    #[test]
    fn test_classification() {
        assert_eq!(
            compute_frame_score(&uniform(2)).unwrap().overall_frame,
            OverallFrame::Apex
        );
        assert_eq!(
            compute_frame_score(&uniform(-2)).unwrap().overall_frame,
            OverallFrame::Slave
        );
        assert_eq!(
            compute_frame_score(&uniform(0)).unwrap().overall_frame,
            OverallFrame::Neutral
        );

        // Half the axes at the top, half at the bottom: wide spread
        let split: Vec<AxisScore> = AxisId::all()
            .iter()
            .map(|a| AxisScore::new(*a, if a.index() % 2 == 0 { 3 } else { -3 }))
            .collect();
        assert_eq!(
            compute_frame_score(&split).unwrap().overall_frame,
            OverallFrame::Mixed
        );
    }

    #[test]
    fn test_explain_lists_every_axis() {
        let config = ScoringConfig::default();
        let scorer = FrameScorer::new(&config);
        let score = scorer.calculate(&uniform(1)).unwrap();
        let text = scorer.explain(&score);
        for axis in AxisId::all() {
            assert!(text.contains(axis.label()), "missing {}", axis.label());
        }
    }
}
