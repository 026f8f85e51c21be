//! Engine facade
//!
//! `FrameEngine` wires the ledger, the report store, the provider and the
//! trigger evaluator together and is the only API consumers need. State is
//! injected at construction; nothing is global.
//!
//! Persistence is write-behind: after a mutation succeeds the engine saves
//! the affected snapshot, and a failed save is logged but does not undo or
//! fail the operation.

use crate::config::EngineConfig;
use crate::credits::{CreditBalance, CreditLedger, CreditTransaction, LedgerResult, LedgerSnapshot};
use crate::models::{Domain, ScanReport, ScanTier};
use crate::persistence::{
    ledger_path, reports_path, JsonFileBackend, PersistenceResult, SnapshotBackend,
};
use crate::pipeline::{ScanError, ScanInput, ScanPipeline};
use crate::provider::AnalysisProvider;
use crate::store::{CumulativeProfile, ProfileAggregator, ReportSnapshot, ReportStore, StoreResult, Trend};
use crate::triggers::{AdvisoryEvent, ScanAttempt, SessionState, TriggerEvaluator};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

/// Result of a scan call plus any advisories it raised
#[derive(Debug)]
pub struct ScanOutcome {
    pub result: Result<ScanReport, ScanError>,
    pub advisories: Vec<AdvisoryEvent>,
}

impl ScanOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    pub fn report(&self) -> Option<&ScanReport> {
        self.result.as_ref().ok()
    }

    pub fn error(&self) -> Option<&ScanError> {
        self.result.as_ref().err()
    }
}

type LedgerBackend = Arc<dyn SnapshotBackend<LedgerSnapshot>>;
type ReportBackend = Arc<dyn SnapshotBackend<ReportSnapshot>>;

pub struct FrameEngine {
    config: EngineConfig,
    provider: Arc<dyn AnalysisProvider>,
    ledger: CreditLedger,
    store: ReportStore,
    session: Mutex<SessionState>,
    initial_ledger: LedgerSnapshot,
    initial_reports: ReportSnapshot,
    ledger_backend: Option<LedgerBackend>,
    report_backend: Option<ReportBackend>,
    /// Held across snapshot + save so saves land in snapshot order
    ledger_save: Mutex<()>,
    reports_save: Mutex<()>,
}

impl FrameEngine {
    /// Engine with a fresh ledger and an empty history, not persisted
    pub fn new(config: EngineConfig, provider: Arc<dyn AnalysisProvider>) -> Self {
        let ledger = LedgerSnapshot::opening(
            config.credits.initial_credits,
            config.credits.initial_bonus_credits,
        );
        Self::with_state(config, provider, ledger, ReportSnapshot::default())
    }

    /// Engine over injected state, not persisted
    pub fn with_state(
        config: EngineConfig,
        provider: Arc<dyn AnalysisProvider>,
        ledger: LedgerSnapshot,
        reports: ReportSnapshot,
    ) -> Self {
        Self {
            ledger: CreditLedger::with_snapshot(config.credits.clone(), ledger.clone()),
            store: ReportStore::with_snapshot(reports.clone()),
            config,
            provider,
            session: Mutex::new(SessionState::new()),
            initial_ledger: ledger,
            initial_reports: reports,
            ledger_backend: None,
            report_backend: None,
            ledger_save: Mutex::new(()),
            reports_save: Mutex::new(()),
        }
    }

    /// Engine that loads its state from the backends and saves back to them.
    ///
    /// Backends with nothing saved yet start from config defaults.
    pub fn with_persistence(
        config: EngineConfig,
        provider: Arc<dyn AnalysisProvider>,
        ledger_backend: LedgerBackend,
        report_backend: ReportBackend,
    ) -> PersistenceResult<Self> {
        let ledger = match ledger_backend.load()? {
            Some(snapshot) => snapshot,
            None => {
                debug!("No saved ledger, starting from configured balance");
                LedgerSnapshot::opening(
                    config.credits.initial_credits,
                    config.credits.initial_bonus_credits,
                )
            }
        };
        let reports = report_backend.load()?.unwrap_or_default();

        let mut engine = Self::with_state(config, provider, ledger, reports);
        engine.ledger_backend = Some(ledger_backend);
        engine.report_backend = Some(report_backend);
        Ok(engine)
    }

    /// Engine persisted as JSON files in `data_dir`
    pub fn open(
        config: EngineConfig,
        provider: Arc<dyn AnalysisProvider>,
        data_dir: &Path,
    ) -> PersistenceResult<Self> {
        Self::with_persistence(
            config,
            provider,
            Arc::new(JsonFileBackend::new(ledger_path(data_dir))),
            Arc::new(JsonFileBackend::new(reports_path(data_dir))),
        )
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    fn session(&self) -> MutexGuard<'_, SessionState> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ---- reads ----

    /// Most recent report across all contacts
    pub fn latest_report(&self) -> Option<ScanReport> {
        self.store.latest()
    }

    pub fn report_by_id(&self, id: &str) -> Option<ScanReport> {
        self.store.get(id)
    }

    /// Every report, most recent first
    pub fn all_reports(&self) -> Vec<ScanReport> {
        self.store.all()
    }

    /// Reports concerning a contact, most recent first
    pub fn reports_for_contact(&self, contact_id: &str) -> Vec<ScanReport> {
        self.store.reports_for_subject(contact_id)
    }

    pub fn profile_for_contact(&self, contact_id: &str) -> CumulativeProfile {
        let reports = self.store.reports_for_subject(contact_id);
        ProfileAggregator::new(&self.config.profile).profile(contact_id, &reports)
    }

    /// `None` until the contact has at least two reports
    pub fn trend_for_contact(&self, contact_id: &str) -> Option<Trend> {
        let reports = self.store.reports_for_subject(contact_id);
        ProfileAggregator::new(&self.config.profile).trend(&reports)
    }

    pub fn available_credits(&self) -> u64 {
        self.ledger.available()
    }

    pub fn credit_balance(&self) -> CreditBalance {
        self.ledger.balance()
    }

    pub fn credit_transactions(&self) -> Vec<CreditTransaction> {
        self.ledger.transactions()
    }

    pub fn cost_for(&self, tier: ScanTier) -> u64 {
        self.ledger.cost_for(tier)
    }

    /// Copy of the current session counters
    pub fn session_state(&self) -> SessionState {
        self.session().clone()
    }

    // ---- scans ----

    pub fn run_scan(&self, input: ScanInput) -> ScanOutcome {
        let tier = input.tier;
        self.scan(tier, |pipeline| pipeline.run_scan(input))
    }

    pub fn run_text_scan(&self, domain: Domain, content: &str, subjects: Vec<String>) -> ScanOutcome {
        self.scan(ScanTier::Text, |pipeline| {
            pipeline.run_text_scan(domain, content, subjects)
        })
    }

    pub fn run_image_scan(&self, domain: Domain, image_ref: &str, subjects: Vec<String>) -> ScanOutcome {
        self.scan(ScanTier::Basic, |pipeline| {
            pipeline.run_image_scan(domain, image_ref, subjects)
        })
    }

    pub fn run_tiered_image_scan(
        &self,
        domain: Domain,
        image_ref: &str,
        subjects: Vec<String>,
        tier: ScanTier,
    ) -> ScanOutcome {
        self.scan(tier, |pipeline| {
            pipeline.run_tiered_image_scan(domain, image_ref, subjects, tier)
        })
    }

    pub fn run_quick_text_scan(&self, content: &str, subjects: Vec<String>) -> ScanOutcome {
        self.scan(ScanTier::Text, |pipeline| {
            pipeline.run_quick_text_scan(content, subjects)
        })
    }

    fn scan(
        &self,
        tier: ScanTier,
        run: impl FnOnce(&ScanPipeline<'_>) -> Result<ScanReport, ScanError>,
    ) -> ScanOutcome {
        let pipeline = ScanPipeline::new(
            self.provider.as_ref(),
            &self.ledger,
            &self.store,
            &self.config,
        );
        let result = run(&pipeline);

        if result.is_ok() {
            self.save_reports();
        }
        if self.ledger.cost_for(tier) > 0 {
            self.save_ledger();
        }

        let attempt = ScanAttempt::new(tier, &result);
        let advisories = {
            let mut session = self.session();
            session.record(attempt);
            TriggerEvaluator::new(&self.config.triggers).evaluate(
                attempt,
                &session,
                self.ledger.available(),
            )
        };
        for event in &advisories {
            debug!("Advisory: {:?}", event);
        }

        ScanOutcome { result, advisories }
    }

    // ---- other writes ----

    /// Buy a configured credit package. `false` for an unknown package.
    pub fn purchase_credits(&self, package_id: &str) -> bool {
        let bought = self.ledger.purchase(package_id);
        if bought {
            self.save_ledger();
        }
        bought
    }

    pub fn add_bonus_credits(&self, amount: u64, reason: &str) -> LedgerResult<CreditTransaction> {
        let txn = self.ledger.bonus(amount, reason)?;
        self.save_ledger();
        Ok(txn)
    }

    pub fn tag_report(&self, report_id: &str, tag: &str) -> StoreResult<ScanReport> {
        let report = self.store.add_tag(report_id, tag)?;
        self.save_reports();
        Ok(report)
    }

    pub fn untag_report(&self, report_id: &str, tag: &str) -> StoreResult<ScanReport> {
        let report = self.store.remove_tag(report_id, tag)?;
        self.save_reports();
        Ok(report)
    }

    /// Restore the state the engine was built with and clear the session
    pub fn reset(&self) {
        self.ledger.reset(self.initial_ledger.clone());
        self.store.reset(self.initial_reports.clone());
        *self.session() = SessionState::new();
        self.save_ledger();
        self.save_reports();
    }

    fn save_ledger(&self) {
        if let Some(backend) = &self.ledger_backend {
            let _guard = self.ledger_save.lock().unwrap_or_else(|e| e.into_inner());
            if let Err(e) = backend.save(&self.ledger.snapshot()) {
                warn!("Failed to save credit ledger: {}", e);
            }
        }
    }

    fn save_reports(&self) {
        if let Some(backend) = &self.report_backend {
            let _guard = self.reports_save.lock().unwrap_or_else(|e| e.into_inner());
            if let Err(e) = backend.save(&self.store.snapshot()) {
                warn!("Failed to save report history: {}", e);
            }
        }
    }
}
