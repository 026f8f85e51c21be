//! Upsell and insight triggers
//!
//! After a scan completes the engine records it in the caller's
//! [`SessionState`] and asks the [`TriggerEvaluator`] for advisory events.
//! Evaluation is pure: it never touches the ledger or the store, and an
//! advisory never blocks or retries a scan.

use crate::config::TriggerConfig;
use crate::models::{ScanReport, ScanTier};
use crate::pipeline::ScanError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Non-blocking signal raised after a scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AdvisoryEvent {
    /// The scan scored below the low-score threshold
    LowScore { report_id: String, frame_score: u8 },
    LowCredits { available: u64 },
    /// The same paid tier was used several times in a row
    RepeatedTier { tier: ScanTier, count: u32 },
    RepeatedPattern { pattern: String, count: u32 },
}

impl AdvisoryEvent {
    /// User-facing text
    pub fn message(&self) -> String {
        match self {
            AdvisoryEvent::LowScore { frame_score, .. } => format!(
                "Frame score {} is low. A detailed scan shows which axes to work on.",
                frame_score
            ),
            AdvisoryEvent::LowCredits { available } => format!(
                "Only {} credit{} left. Buy a package to keep running image scans.",
                available,
                if *available == 1 { "" } else { "s" }
            ),
            AdvisoryEvent::RepeatedTier { tier, count } => format!(
                "{} {} scans in a row. A credit package is cheaper than buying one at a time.",
                count, tier
            ),
            AdvisoryEvent::RepeatedPattern { pattern, count } => format!(
                "'{}' has shown up {} times this session.",
                pattern, count
            ),
        }
    }
}

/// A completed scan attempt as seen by the trigger evaluator
#[derive(Debug, Clone, Copy)]
pub struct ScanAttempt<'a> {
    pub tier: ScanTier,
    pub result: &'a Result<ScanReport, ScanError>,
}

impl<'a> ScanAttempt<'a> {
    pub fn new(tier: ScanTier, result: &'a Result<ScanReport, ScanError>) -> Self {
        Self { tier, result }
    }

    fn is_content_rejection(&self) -> bool {
        matches!(self.result, Err(ScanError::ContentRejected { .. }))
    }
}

/// Per-session counters, owned by the caller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub last_tier: Option<ScanTier>,
    pub consecutive_same_tier: u32,
    pub pattern_counts: HashMap<String, u32>,
    pub scans: u32,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update counters for a completed attempt. Content rejections are not
    /// counted.
    pub fn record(&mut self, attempt: ScanAttempt<'_>) {
        if attempt.is_content_rejection() {
            return;
        }

        self.scans += 1;
        if self.last_tier == Some(attempt.tier) {
            self.consecutive_same_tier += 1;
        } else {
            self.last_tier = Some(attempt.tier);
            self.consecutive_same_tier = 1;
        }

        if let Ok(report) = attempt.result {
            for pattern in &report.raw_result.patterns {
                *self.pattern_counts.entry(pattern.clone()).or_insert(0) += 1;
            }
        }
    }
}

/// Trigger evaluator bound to its thresholds
pub struct TriggerEvaluator<'a> {
    config: &'a TriggerConfig,
}

impl<'a> TriggerEvaluator<'a> {
    pub fn new(config: &'a TriggerConfig) -> Self {
        Self { config }
    }

    /// Advisory events for an attempt, given the already-updated session and
    /// the balance after the attempt settled.
    pub fn evaluate(
        &self,
        attempt: ScanAttempt<'_>,
        session: &SessionState,
        available_credits: u64,
    ) -> Vec<AdvisoryEvent> {
        if attempt.is_content_rejection() {
            return Vec::new();
        }

        let mut events = Vec::new();

        if let Ok(report) = attempt.result {
            if report.frame_score() < self.config.low_score_threshold {
                events.push(AdvisoryEvent::LowScore {
                    report_id: report.id.clone(),
                    frame_score: report.frame_score(),
                });
            }
        }

        if available_credits < self.config.low_credit_threshold {
            events.push(AdvisoryEvent::LowCredits {
                available: available_credits,
            });
        }

        if attempt.tier != ScanTier::Text
            && session.last_tier == Some(attempt.tier)
            && session.consecutive_same_tier >= self.config.repeat_tier_threshold
        {
            events.push(AdvisoryEvent::RepeatedTier {
                tier: attempt.tier,
                count: session.consecutive_same_tier,
            });
        }

        if let Ok(report) = attempt.result {
            for pattern in &report.raw_result.patterns {
                let count = session.pattern_counts.get(pattern).copied().unwrap_or(0);
                if count >= self.config.pattern_threshold {
                    events.push(AdvisoryEvent::RepeatedPattern {
                        pattern: pattern.clone(),
                        count,
                    });
                }
            }
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::report_with_score;
    use chrono::Utc;

    fn success(score: u8, patterns: &[&str]) -> Result<ScanReport, ScanError> {
        let mut report = report_with_score("scan_1_abcdef12", "c1", score, Utc::now());
        report.raw_result.patterns = patterns.iter().map(|p| p.to_string()).collect();
        Ok(report)
    }

    fn evaluate(
        tier: ScanTier,
        result: &Result<ScanReport, ScanError>,
        session: &mut SessionState,
        available: u64,
    ) -> Vec<AdvisoryEvent> {
        let config = TriggerConfig::default();
        let attempt = ScanAttempt::new(tier, result);
        session.record(attempt);
        TriggerEvaluator::new(&config).evaluate(attempt, session, available)
    }

    #[test]
    fn test_low_score_fires() {
        let mut session = SessionState::new();
        let events = evaluate(ScanTier::Text, &success(32, &[]), &mut session, 10);
        assert_eq!(
            events,
            vec![AdvisoryEvent::LowScore {
                report_id: "scan_1_abcdef12".to_string(),
                frame_score: 32
            }]
        );

        let events = evaluate(ScanTier::Text, &success(40, &[]), &mut session, 10);
        assert!(events.is_empty());
    }

    #[test]
    fn test_low_credits_fires_on_failure_too() {
        let mut session = SessionState::new();
        let failed = Err(ScanError::InsufficientCredits {
            required: 5,
            available: 2,
        });
        let events = evaluate(ScanTier::Detailed, &failed, &mut session, 2);
        assert_eq!(events, vec![AdvisoryEvent::LowCredits { available: 2 }]);
        assert_eq!(session.scans, 1);
    }

    #[test]
    fn test_content_rejection_fires_nothing() {
        let mut session = SessionState::new();
        let rejected = Err(ScanError::ContentRejected {
            reason: "too short".to_string(),
        });
        let events = evaluate(ScanTier::Basic, &rejected, &mut session, 0);
        assert!(events.is_empty());
        assert_eq!(session, SessionState::new());
    }

    #[test]
    fn test_repeated_paid_tier() {
        let mut session = SessionState::new();
        assert!(evaluate(ScanTier::Basic, &success(60, &[]), &mut session, 10).is_empty());
        assert!(evaluate(ScanTier::Basic, &success(60, &[]), &mut session, 10).is_empty());
        let events = evaluate(ScanTier::Basic, &success(60, &[]), &mut session, 10);
        assert_eq!(
            events,
            vec![AdvisoryEvent::RepeatedTier {
                tier: ScanTier::Basic,
                count: 3
            }]
        );

        // Switching tier restarts the streak
        assert!(evaluate(ScanTier::Detailed, &success(60, &[]), &mut session, 10).is_empty());
        assert_eq!(session.consecutive_same_tier, 1);
    }

    #[test]
    fn test_free_tier_never_repeats() {
        let mut session = SessionState::new();
        for _ in 0..5 {
            assert!(evaluate(ScanTier::Text, &success(60, &[]), &mut session, 10).is_empty());
        }
        assert_eq!(session.consecutive_same_tier, 5);
    }

    #[test]
    fn test_repeated_pattern() {
        let mut session = SessionState::new();
        evaluate(ScanTier::Text, &success(60, &["neediness"]), &mut session, 10);
        evaluate(ScanTier::Text, &success(60, &["neediness", "over-explaining"]), &mut session, 10);
        let events = evaluate(ScanTier::Text, &success(60, &["neediness"]), &mut session, 10);
        assert_eq!(
            events,
            vec![AdvisoryEvent::RepeatedPattern {
                pattern: "neediness".to_string(),
                count: 3
            }]
        );

        // Counted patterns only fire when present in the current outcome
        let events = evaluate(ScanTier::Text, &success(60, &["over-explaining"]), &mut session, 10);
        assert!(events.is_empty());
    }

    #[test]
    fn test_messages() {
        let event = AdvisoryEvent::LowCredits { available: 1 };
        assert!(event.message().contains("1 credit left"));
        let event = AdvisoryEvent::RepeatedTier {
            tier: ScanTier::Detailed,
            count: 4,
        };
        assert!(event.message().starts_with("4 detailed scans"));
    }
}
