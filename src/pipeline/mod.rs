//! Scan pipeline
//!
//! One scan moves through these stages:
//!
//! ```text
//! Idle → Validating → Rejected
//!                   → CreditCheck → InsufficientCredits
//!                                 → Reserved → InvokingProvider → Refunded
//!                                                               → Normalizing → Scoring → Persisting → Done
//! ```
//!
//! Credits are reserved before the provider is called. Every failure after
//! the reservation refunds the full cost before the error is returned, so a
//! failed scan never costs anything and never leaves a report behind. There
//! is no retry; a failed call is terminal.

mod precheck;
mod sniff;

pub use sniff::{sniff_domain, Confidence, SniffedDomain};

use crate::config::EngineConfig;
use crate::credits::CreditLedger;
use crate::models::{content_digest, Domain, Modality, ScanReport, ScanTier};
use crate::provider::{
    normalize, profile_for, AnalysisProvider, NormalizedOutcome, ProviderRequest,
};
use crate::scoring::{FrameScorer, ScoringError};
use crate::store::{ReportStore, StoreError};
use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Why a scan did not produce a report
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("{reason}")]
    ContentRejected { reason: String },

    #[error("Needs {required} credits, {available} available")]
    InsufficientCredits { required: u64, available: u64 },

    #[error("Scan failed{}: {message}", refund_note(.refunded))]
    ProviderFailure { message: String, refunded: u64 },

    #[error("Scan failed{}: {message}", refund_note(.refunded))]
    InvalidAxisScore { message: String, refunded: u64 },

    #[error("Scan failed{}: could not save report: {message}", refund_note(.refunded))]
    Persistence { message: String, refunded: u64 },
}

fn refund_note(refunded: &u64) -> &'static str {
    if *refunded > 0 {
        ", credits refunded"
    } else {
        ""
    }
}

impl ScanError {
    /// Credits returned to the balance because of this failure
    pub fn refunded(&self) -> u64 {
        match self {
            ScanError::ProviderFailure { refunded, .. }
            | ScanError::InvalidAxisScore { refunded, .. }
            | ScanError::Persistence { refunded, .. } => *refunded,
            ScanError::ContentRejected { .. } | ScanError::InsufficientCredits { .. } => 0,
        }
    }
}

pub type ScanResult<T> = Result<T, ScanError>;

/// Lifecycle of one pipeline call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStage {
    Idle,
    Validating,
    Rejected,
    CreditCheck,
    InsufficientCredits,
    Reserved,
    InvokingProvider,
    Refunded,
    Normalizing,
    Scoring,
    Persisting,
    Done,
}

/// A scan request
#[derive(Debug, Clone)]
pub struct ScanInput {
    pub domain: Domain,
    pub modality: Modality,
    /// Message text, or the image reference for image scans
    pub content: String,
    pub subject_contact_ids: Vec<String>,
    pub tier: ScanTier,
    /// Domain came from [`sniff_domain`] rather than the caller
    pub domain_inferred: bool,
}

impl ScanInput {
    pub fn text(domain: Domain, content: impl Into<String>, subjects: Vec<String>) -> Self {
        Self {
            domain,
            modality: Modality::Text,
            content: content.into(),
            subject_contact_ids: subjects,
            tier: ScanTier::Text,
            domain_inferred: false,
        }
    }

    pub fn image(
        domain: Domain,
        image_ref: impl Into<String>,
        subjects: Vec<String>,
        tier: ScanTier,
    ) -> Self {
        Self {
            domain,
            modality: Modality::Image,
            content: image_ref.into(),
            subject_contact_ids: subjects,
            tier,
            domain_inferred: false,
        }
    }
}

/// Tracks and logs the stage of a single call
struct StageLog {
    stage: ScanStage,
    label: String,
}

impl StageLog {
    fn new(input: &ScanInput) -> Self {
        Self {
            stage: ScanStage::Idle,
            label: format!("{}/{}/{}", input.domain, input.modality, input.tier),
        }
    }

    fn enter(&mut self, next: ScanStage) {
        debug!("Scan {}: {:?} -> {:?}", self.label, self.stage, next);
        self.stage = next;
    }
}

/// Runs scans against a provider, a ledger and a store
pub struct ScanPipeline<'a> {
    provider: &'a dyn AnalysisProvider,
    ledger: &'a CreditLedger,
    store: &'a ReportStore,
    config: &'a EngineConfig,
}

impl<'a> ScanPipeline<'a> {
    pub fn new(
        provider: &'a dyn AnalysisProvider,
        ledger: &'a CreditLedger,
        store: &'a ReportStore,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            provider,
            ledger,
            store,
            config,
        }
    }

    pub fn run_scan(&self, input: ScanInput) -> ScanResult<ScanReport> {
        let mut stage = StageLog::new(&input);
        let profile = profile_for(input.domain);

        stage.enter(ScanStage::Validating);
        if let Err(reason) = precheck::check(&input, profile, &self.config.pipeline) {
            stage.enter(ScanStage::Rejected);
            debug!("Rejected before analysis: {}", reason);
            return Err(ScanError::ContentRejected { reason });
        }

        stage.enter(ScanStage::CreditCheck);
        let cost = self.ledger.cost_for(input.tier);
        if !self.ledger.has_credits_for(input.tier) {
            stage.enter(ScanStage::InsufficientCredits);
            return Err(self.insufficient(cost));
        }

        let report_id = self.store.allocate_id();
        if !self.ledger.reserve_and_use(input.tier, Some(&report_id)) {
            // Another scan spent the balance between the check and the reservation
            stage.enter(ScanStage::InsufficientCredits);
            return Err(self.insufficient(cost));
        }
        stage.enter(ScanStage::Reserved);

        stage.enter(ScanStage::InvokingProvider);
        let request = ProviderRequest {
            domain: input.domain,
            modality: input.modality,
            content: input.content.trim().to_string(),
            context_label: profile.context_label.to_string(),
            system_prompt: profile.system_prompt.to_string(),
            detailed: input.tier == ScanTier::Detailed,
        };
        let raw = match self.provider.analyze(&request) {
            Ok(raw) => raw,
            Err(e) => {
                let refunded = self.refund(cost, &report_id, "provider failure", &mut stage);
                return Err(ScanError::ProviderFailure {
                    message: e.to_string(),
                    refunded,
                });
            }
        };

        stage.enter(ScanStage::Normalizing);
        let analysis = match normalize(raw) {
            Ok(NormalizedOutcome::Analysis(analysis)) => analysis,
            Ok(NormalizedOutcome::Rejected { reason }) => {
                self.refund(cost, &report_id, "content rejected by provider", &mut stage);
                return Err(ScanError::ContentRejected { reason });
            }
            Err(e) => return Err(self.invalid_axis(e, cost, &report_id, &mut stage)),
        };
        if !analysis.defaulted_axes.is_empty() {
            debug!(
                "Provider omitted {} axes, defaulted to neutral",
                analysis.defaulted_axes.len()
            );
        }

        stage.enter(ScanStage::Scoring);
        let mut score = match FrameScorer::new(&self.config.scoring).calculate(&analysis.axis_scores)
        {
            Ok(score) => score,
            Err(e) => return Err(self.invalid_axis(e, cost, &report_id, &mut stage)),
        };
        score.notes = analysis.notes.clone();

        stage.enter(ScanStage::Persisting);
        let report = ScanReport {
            id: report_id.clone(),
            created_at: Utc::now(),
            domain: input.domain,
            modality: input.modality,
            tier: input.tier,
            subject_contact_ids: input.subject_contact_ids,
            score,
            raw_result: analysis,
            custom_domain_tags: Default::default(),
            domain_inferred: input.domain_inferred,
            content_digest: content_digest(input.content.trim()),
        };
        if let Err(e) = self.store.save_report(report.clone()) {
            let refunded = self.refund(cost, &report_id, "report could not be saved", &mut stage);
            return Err(persistence_error(e, refunded));
        }

        stage.enter(ScanStage::Done);
        info!(
            "Scan {} complete: {} ({}) for {} subject(s), {} credit(s) used",
            report.id,
            report.frame_score(),
            report.score.overall_frame,
            report.subject_contact_ids.len(),
            cost
        );
        Ok(report)
    }

    /// Free text scan with the caller's domain
    pub fn run_text_scan(
        &self,
        domain: Domain,
        content: &str,
        subjects: Vec<String>,
    ) -> ScanResult<ScanReport> {
        self.run_scan(ScanInput::text(domain, content, subjects))
    }

    /// Image scan at the basic tier
    pub fn run_image_scan(
        &self,
        domain: Domain,
        image_ref: &str,
        subjects: Vec<String>,
    ) -> ScanResult<ScanReport> {
        self.run_tiered_image_scan(domain, image_ref, subjects, ScanTier::Basic)
    }

    pub fn run_tiered_image_scan(
        &self,
        domain: Domain,
        image_ref: &str,
        subjects: Vec<String>,
        tier: ScanTier,
    ) -> ScanResult<ScanReport> {
        self.run_scan(ScanInput::image(domain, image_ref, subjects, tier))
    }

    /// Free text scan with a sniffed domain
    pub fn run_quick_text_scan(&self, content: &str, subjects: Vec<String>) -> ScanResult<ScanReport> {
        let sniffed = sniff_domain(content);
        debug!(
            "Quick scan domain guess: {} ({:?} confidence)",
            sniffed.domain, sniffed.confidence
        );
        let mut input = ScanInput::text(sniffed.domain, content, subjects);
        input.domain_inferred = true;
        self.run_scan(input)
    }

    fn insufficient(&self, required: u64) -> ScanError {
        ScanError::InsufficientCredits {
            required,
            available: self.ledger.available(),
        }
    }

    fn invalid_axis(
        &self,
        error: ScoringError,
        cost: u64,
        report_id: &str,
        stage: &mut StageLog,
    ) -> ScanError {
        let refunded = self.refund(cost, report_id, "invalid axis scores", stage);
        let ScoringError::InvalidAxisScore(message) = error;
        ScanError::InvalidAxisScore { message, refunded }
    }

    /// Return the reserved cost. Yields the amount refunded.
    fn refund(&self, cost: u64, report_id: &str, reason: &str, stage: &mut StageLog) -> u64 {
        if cost == 0 {
            return 0;
        }
        match self.ledger.refund_for_scan(cost, reason, report_id) {
            Ok(_) => {
                stage.enter(ScanStage::Refunded);
                cost
            }
            Err(e) => {
                warn!("Refund for {} failed: {}", report_id, e);
                0
            }
        }
    }
}

fn persistence_error(error: StoreError, refunded: u64) -> ScanError {
    ScanError::Persistence {
        message: error.to_string(),
        refunded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credits::{LedgerSnapshot, TransactionType};
    use crate::provider::{ProviderError, RawAnalysis, RawAxis, ScriptedProvider};
    use crate::scoring::OverallFrame;

    const PITCH: &str = "Following up on Tuesday's demo with the pricing we discussed for Acme";

    struct Fixture {
        provider: ScriptedProvider,
        ledger: CreditLedger,
        store: ReportStore,
        config: EngineConfig,
    }

    impl Fixture {
        fn new(credits: u64, provider: ScriptedProvider) -> Self {
            let config = EngineConfig::default();
            Self {
                provider,
                ledger: CreditLedger::with_snapshot(
                    config.credits.clone(),
                    LedgerSnapshot::opening(credits, 0),
                ),
                store: ReportStore::new(),
                config,
            }
        }

        fn pipeline(&self) -> ScanPipeline<'_> {
            ScanPipeline::new(&self.provider, &self.ledger, &self.store, &self.config)
        }
    }

    fn subjects() -> Vec<String> {
        vec!["c1".to_string()]
    }

    #[test]
    fn test_text_scan_is_free() {
        let fx = Fixture::new(0, ScriptedProvider::new().respond(RawAnalysis::uniform(2)));
        let report = fx
            .pipeline()
            .run_text_scan(Domain::SalesEmail, PITCH, subjects())
            .unwrap();

        assert_eq!(report.tier, ScanTier::Text);
        assert_eq!(report.score.overall_frame, OverallFrame::Apex);
        assert_eq!(report.content_digest, content_digest(PITCH));
        assert!(!report.domain_inferred);
        assert!(fx.ledger.transactions().is_empty());
        assert_eq!(fx.store.get(&report.id), Some(report));
    }

    #[test]
    fn test_paid_scan_records_use_against_report() {
        let fx = Fixture::new(10, ScriptedProvider::new().respond(RawAnalysis::uniform(0)));
        let report = fx
            .pipeline()
            .run_tiered_image_scan(
                Domain::ProfilePhoto,
                "https://cdn.example.com/me.jpg",
                subjects(),
                ScanTier::Detailed,
            )
            .unwrap();

        assert_eq!(report.frame_score(), 50);
        assert_eq!(fx.ledger.available(), 5);
        let txns = fx.ledger.transactions();
        assert_eq!(txns.len(), 1);
        assert_eq!(txns[0].amount, -5);
        assert_eq!(txns[0].scan_report_id.as_deref(), Some(report.id.as_str()));
    }

    #[test]
    fn test_insufficient_credits_never_calls_provider() {
        let fx = Fixture::new(2, ScriptedProvider::new().respond(RawAnalysis::uniform(0)));
        let err = fx
            .pipeline()
            .run_tiered_image_scan(
                Domain::ProfilePhoto,
                "/photos/me.png",
                subjects(),
                ScanTier::Detailed,
            )
            .unwrap_err();

        assert_eq!(
            err,
            ScanError::InsufficientCredits {
                required: 5,
                available: 2
            }
        );
        assert_eq!(err.to_string(), "Needs 5 credits, 2 available");
        assert_eq!(fx.provider.calls(), 0);
        assert!(fx.store.is_empty());
        assert_eq!(fx.ledger.available(), 2);
    }

    #[test]
    fn test_provider_failure_refunds_before_returning() {
        let fx = Fixture::new(
            3,
            ScriptedProvider::new().fail(ProviderError::Unavailable("timeout".to_string())),
        );
        let err = fx
            .pipeline()
            .run_image_scan(Domain::ProfilePhoto, "https://x.io/a.png", subjects())
            .unwrap_err();

        assert!(matches!(err, ScanError::ProviderFailure { refunded: 1, .. }));
        assert!(err.to_string().starts_with("Scan failed, credits refunded:"));
        assert_eq!(fx.ledger.available(), 3);
        let kinds: Vec<TransactionType> =
            fx.ledger.transactions().iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TransactionType::Use, TransactionType::Refund]);
        assert!(fx.store.is_empty());
    }

    #[test]
    fn test_free_failure_mentions_no_refund() {
        let fx = Fixture::new(
            0,
            ScriptedProvider::new().fail(ProviderError::ParseError("bad json".to_string())),
        );
        let err = fx
            .pipeline()
            .run_text_scan(Domain::General, PITCH, subjects())
            .unwrap_err();
        assert_eq!(err.refunded(), 0);
        assert!(!err.to_string().contains("refunded"));
        assert!(fx.ledger.transactions().is_empty());
    }

    #[test]
    fn test_out_of_range_axis_refunds() {
        let mut raw = RawAnalysis::uniform(1);
        raw.axes.as_mut().unwrap()[0].score = Some(5.0);
        let fx = Fixture::new(1, ScriptedProvider::new().respond(raw));
        let err = fx
            .pipeline()
            .run_image_scan(Domain::SocialPost, "https://x.io/a.png", subjects())
            .unwrap_err();

        assert!(matches!(err, ScanError::InvalidAxisScore { refunded: 1, .. }));
        assert_eq!(fx.ledger.available(), 1);
        assert!(fx.ledger.snapshot().is_conserved());
        assert!(fx.store.is_empty());
    }

    #[test]
    fn test_unknown_axis_refunds() {
        let raw = RawAnalysis {
            axes: Some(vec![RawAxis {
                id: "charisma".to_string(),
                score: Some(1.0),
            }]),
            ..Default::default()
        };
        let fx = Fixture::new(1, ScriptedProvider::new().respond(raw));
        let err = fx
            .pipeline()
            .run_image_scan(Domain::General, "https://x.io/a.png", subjects())
            .unwrap_err();
        assert!(matches!(err, ScanError::InvalidAxisScore { .. }));
        assert_eq!(fx.ledger.available(), 1);
    }

    #[test]
    fn test_provider_rejection_refunds_reservation() {
        let fx = Fixture::new(
            5,
            ScriptedProvider::new().respond(RawAnalysis::rejection("Who is this photo for?")),
        );
        let err = fx
            .pipeline()
            .run_image_scan(Domain::ProfilePhoto, "https://x.io/a.png", subjects())
            .unwrap_err();

        assert_eq!(
            err,
            ScanError::ContentRejected {
                reason: "Who is this photo for?".to_string()
            }
        );
        assert_eq!(fx.ledger.available(), 5);
        assert_eq!(fx.ledger.transactions().len(), 2);
        assert!(fx.store.is_empty());
    }

    #[test]
    fn test_precheck_rejection_touches_nothing() {
        let fx = Fixture::new(5, ScriptedProvider::new().respond(RawAnalysis::uniform(0)));
        let err = fx
            .pipeline()
            .run_text_scan(Domain::ProfilePhoto, PITCH, subjects())
            .unwrap_err();

        assert!(matches!(err, ScanError::ContentRejected { .. }));
        assert_eq!(fx.provider.calls(), 0);
        assert!(fx.ledger.transactions().is_empty());
    }

    #[test]
    fn test_quick_scan_marks_inferred_domain() {
        let fx = Fixture::new(0, ScriptedProvider::new().respond(RawAnalysis::uniform(1)));
        let report = fx.pipeline().run_quick_text_scan(PITCH, subjects()).unwrap();
        assert!(report.domain_inferred);
        assert_eq!(report.domain, Domain::SalesEmail);
        assert_eq!(report.tier, ScanTier::Text);
    }

    #[test]
    fn test_notes_flow_into_score() {
        let raw = RawAnalysis {
            notes: Some(vec!["Opens with an apology".to_string()]),
            ..RawAnalysis::uniform(-1)
        };
        let fx = Fixture::new(0, ScriptedProvider::new().respond(raw));
        let report = fx
            .pipeline()
            .run_text_scan(Domain::SalesEmail, PITCH, subjects())
            .unwrap();
        assert_eq!(report.score.notes, vec!["Opens with an apology"]);
        assert_eq!(report.raw_result.notes, report.score.notes);
    }
}
