//! One-shot normalization of provider payloads
//!
//! Providers return loosely-shaped JSON. Everything downstream of the
//! pipeline works on [`NormalizedAnalysis`], which always carries one score
//! per axis and never has missing sequences.

use crate::scoring::{AxisId, AxisScore, ScoringError};
use serde::{Deserialize, Serialize};

/// Axis judgment as sent by a provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawAxis {
    #[serde(alias = "axis_id", alias = "axisId")]
    pub id: String,
    #[serde(default)]
    pub score: Option<f64>,
}

/// Provider payload before normalization; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawAnalysis {
    #[serde(default)]
    pub axes: Option<Vec<RawAxis>>,
    #[serde(default)]
    pub notes: Option<Vec<String>>,
    #[serde(default, alias = "supportingEvidence")]
    pub supporting_evidence: Option<Vec<String>>,
    #[serde(default)]
    pub corrections: Option<Vec<String>>,
    #[serde(default)]
    pub patterns: Option<Vec<String>>,
    #[serde(default)]
    pub summary: Option<String>,
    /// Set when the provider refuses to score for lack of context
    #[serde(default)]
    pub rejected: Option<bool>,
    #[serde(default, alias = "rejectionReason")]
    pub rejection_reason: Option<String>,
}

impl RawAnalysis {
    /// Payload scoring every axis with the same raw value
    pub fn uniform(score: i32) -> Self {
        Self {
            axes: Some(
                AxisId::all()
                    .iter()
                    .map(|a| RawAxis {
                        id: a.name().to_string(),
                        score: Some(f64::from(score)),
                    })
                    .collect(),
            ),
            ..Default::default()
        }
    }

    /// Provider refusal with a reason
    pub fn rejection(reason: impl Into<String>) -> Self {
        Self {
            rejected: Some(true),
            rejection_reason: Some(reason.into()),
            ..Default::default()
        }
    }
}

/// Provider payload after normalization
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedAnalysis {
    /// Exactly one entry per axis, in canonical order
    pub axis_scores: Vec<AxisScore>,
    /// Axes the provider omitted and that were set to neutral
    #[serde(default)]
    pub defaulted_axes: Vec<AxisId>,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub supporting_evidence: Vec<String>,
    #[serde(default)]
    pub corrections: Vec<String>,
    /// Trimmed, lower-cased pattern labels
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

/// Result of normalizing a payload
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedOutcome {
    Rejected { reason: String },
    Analysis(NormalizedAnalysis),
}

const DEFAULT_REJECTION: &str =
    "Not enough context to analyze: include who the message is for, what it is about, and when it was sent";

/// Normalize a raw provider payload.
///
/// Unknown axis ids, duplicates and non-integer scores are errors. Range is
/// not checked here; the scorer rejects out-of-range values.
pub fn normalize(raw: RawAnalysis) -> Result<NormalizedOutcome, ScoringError> {
    if raw.rejected.unwrap_or(false) {
        let reason = raw
            .rejection_reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DEFAULT_REJECTION.to_string());
        return Ok(NormalizedOutcome::Rejected { reason });
    }

    let mut slots: [Option<i32>; 9] = [None; 9];
    // A null score still claims its axis
    let mut seen = [false; 9];
    for axis in raw.axes.unwrap_or_default() {
        let id: AxisId = axis.id.parse()?;
        if std::mem::replace(&mut seen[id.index()], true) {
            return Err(ScoringError::InvalidAxisScore(format!(
                "duplicate score for {}",
                id
            )));
        }
        let score = match axis.score {
            Some(value) => integral(id, value)?,
            None => continue,
        };
        slots[id.index()] = Some(score);
    }

    let mut defaulted_axes = Vec::new();
    let axis_scores = AxisId::all()
        .iter()
        .map(|id| match slots[id.index()] {
            Some(score) => AxisScore::new(*id, score),
            None => {
                defaulted_axes.push(*id);
                AxisScore::neutral(*id)
            }
        })
        .collect();

    Ok(NormalizedOutcome::Analysis(NormalizedAnalysis {
        axis_scores,
        defaulted_axes,
        notes: clean(raw.notes),
        supporting_evidence: clean(raw.supporting_evidence),
        corrections: clean(raw.corrections),
        patterns: clean(raw.patterns)
            .into_iter()
            .map(|p| p.to_lowercase())
            .collect(),
        summary: raw
            .summary
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
    }))
}

fn integral(id: AxisId, value: f64) -> Result<i32, ScoringError> {
    if !value.is_finite() || value.fract() != 0.0 {
        return Err(ScoringError::InvalidAxisScore(format!(
            "{} = {} is not an integer",
            id, value
        )));
    }
    if value < f64::from(i32::MIN) || value > f64::from(i32::MAX) {
        return Err(ScoringError::InvalidAxisScore(format!(
            "{} = {} is outside [-3, 3]",
            id, value
        )));
    }
    Ok(value as i32)
}

fn clean(items: Option<Vec<String>>) -> Vec<String> {
    items
        .unwrap_or_default()
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
