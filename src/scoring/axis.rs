//! The nine fixed analysis axes

use super::ScoringError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// One of the nine fixed scoring dimensions.
///
/// Every axis is oriented so that a higher raw score means a stronger frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisId {
    /// Speaks from assumed outcome vs. asking for permission
    AssumptiveState,
    /// Sets the terms of the interaction vs. defers to the other side
    AuthorityPosture,
    /// Holds limits vs. concedes them under pressure
    BoundaryControl,
    /// Outcome-independent vs. visibly needy
    NeedReduction,
    /// Pulls through value vs. pushes through pressure
    PersuasionStyle,
    /// Acts from identity vs. runs scripted tactics
    IdentityVsTactic,
    EmotionalRegulation,
    /// Anchors on own value vs. on the other side's approval
    ValueAnchoring,
    ValidationIndependence,
}

impl AxisId {
    pub fn all() -> &'static [AxisId] {
        &[
            AxisId::AssumptiveState,
            AxisId::AuthorityPosture,
            AxisId::BoundaryControl,
            AxisId::NeedReduction,
            AxisId::PersuasionStyle,
            AxisId::IdentityVsTactic,
            AxisId::EmotionalRegulation,
            AxisId::ValueAnchoring,
            AxisId::ValidationIndependence,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            AxisId::AssumptiveState => "assumptive_state",
            AxisId::AuthorityPosture => "authority_posture",
            AxisId::BoundaryControl => "boundary_control",
            AxisId::NeedReduction => "need_reduction",
            AxisId::PersuasionStyle => "persuasion_style",
            AxisId::IdentityVsTactic => "identity_vs_tactic",
            AxisId::EmotionalRegulation => "emotional_regulation",
            AxisId::ValueAnchoring => "value_anchoring",
            AxisId::ValidationIndependence => "validation_independence",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            AxisId::AssumptiveState => "Assumptive state",
            AxisId::AuthorityPosture => "Authority posture",
            AxisId::BoundaryControl => "Boundary control",
            AxisId::NeedReduction => "Need reduction",
            AxisId::PersuasionStyle => "Persuasion style",
            AxisId::IdentityVsTactic => "Identity vs. tactic",
            AxisId::EmotionalRegulation => "Emotional regulation",
            AxisId::ValueAnchoring => "Value anchoring",
            AxisId::ValidationIndependence => "Validation independence",
        }
    }

    /// Position in the canonical axis order
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl std::fmt::Display for AxisId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for AxisId {
    type Err = ScoringError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        AxisId::all()
            .iter()
            .copied()
            .find(|a| a.name() == normalized)
            .ok_or_else(|| ScoringError::InvalidAxisScore(format!("unknown axis '{}'", s)))
    }
}

/// A raw judgment for one axis, in [-3, +3]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisScore {
    pub axis_id: AxisId,
    pub score: i32,
}

impl AxisScore {
    pub fn new(axis_id: AxisId, score: i32) -> Self {
        Self { axis_id, score }
    }

    /// Neutral score used for axes a provider left out
    pub fn neutral(axis_id: AxisId) -> Self {
        Self { axis_id, score: 0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nine_axes_in_index_order() {
        let all = AxisId::all();
        assert_eq!(all.len(), 9);
        for (i, axis) in all.iter().enumerate() {
            assert_eq!(axis.index(), i);
        }
    }

    #[test]
    fn test_axis_parsing() {
        assert_eq!(
            "need-reduction".parse::<AxisId>(),
            Ok(AxisId::NeedReduction)
        );
        assert_eq!(
            "Identity vs tactic".parse::<AxisId>(),
            Ok(AxisId::IdentityVsTactic)
        );
        assert!(matches!(
            "charisma".parse::<AxisId>(),
            Err(ScoringError::InvalidAxisScore(_))
        ));
    }
}
