//! Report store and profile aggregation
//!
//! The store owns every saved [`ScanReport`], hands out report ids, and
//! answers per-subject history queries. Saved reports are immutable except
//! for their custom tags.

mod profile;

pub use profile::{
    compute_cumulative_profile, compute_trend, compute_trend_with_window, CumulativeProfile,
    ProfileAggregator, Trend, TrendDirection,
};

use crate::models::ScanReport;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Mutex;
use thiserror::Error;
use tracing::debug;

/// Errors raised by the report store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Report {0} already exists")]
    DuplicateReport(String),

    #[error("Report id {0} was not allocated by this store")]
    UnknownId(String),

    #[error("Report {0} not found")]
    NotFound(String),

    #[error("Report {0} has no subject contacts")]
    NoSubjects(String),

    #[error("Tag must not be blank")]
    BlankTag,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Serializable store state, used for persistence and injection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSnapshot {
    /// Reports in insertion order
    #[serde(default)]
    pub reports: Vec<ScanReport>,
    /// Next id sequence number
    #[serde(default)]
    pub next_seq: u64,
}

struct StoreState {
    snapshot: ReportSnapshot,
    /// Ids handed out but not yet saved
    pending: HashSet<String>,
}

/// Thread-safe report store
pub struct ReportStore {
    state: Mutex<StoreState>,
}

impl Default for ReportStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportStore {
    pub fn new() -> Self {
        Self::with_snapshot(ReportSnapshot::default())
    }

    pub fn with_snapshot(mut snapshot: ReportSnapshot) -> Self {
        // Keep new ids clear of anything already on disk
        snapshot.next_seq = snapshot.next_seq.max(snapshot.reports.len() as u64);
        Self {
            state: Mutex::new(StoreState {
                snapshot,
                pending: HashSet::new(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Reserve a fresh unique report id
    pub fn allocate_id(&self) -> String {
        let mut state = self.lock();
        state.snapshot.next_seq += 1;
        let uuid = uuid::Uuid::new_v4().simple().to_string();
        let id = format!("scan_{}_{}", state.snapshot.next_seq, &uuid[..8]);
        state.pending.insert(id.clone());
        id
    }

    /// Save a report under an id previously returned by [`allocate_id`](Self::allocate_id)
    pub fn save_report(&self, report: ScanReport) -> StoreResult<()> {
        let mut state = self.lock();

        if state.snapshot.reports.iter().any(|r| r.id == report.id) {
            return Err(StoreError::DuplicateReport(report.id));
        }
        if !state.pending.contains(&report.id) {
            return Err(StoreError::UnknownId(report.id));
        }
        if report.subject_contact_ids.is_empty() {
            return Err(StoreError::NoSubjects(report.id));
        }

        state.pending.remove(&report.id);
        debug!(
            "Saved report {} ({} subjects, score {})",
            report.id,
            report.subject_contact_ids.len(),
            report.frame_score()
        );
        state.snapshot.reports.push(report);
        Ok(())
    }

    /// Reports concerning `contact_id`, most recent first
    pub fn reports_for_subject(&self, contact_id: &str) -> Vec<ScanReport> {
        let state = self.lock();
        newest_first(
            state
                .snapshot
                .reports
                .iter()
                .filter(|r| r.concerns(contact_id)),
        )
    }

    /// Every report, most recent first
    pub fn all(&self) -> Vec<ScanReport> {
        let state = self.lock();
        newest_first(state.snapshot.reports.iter())
    }

    pub fn latest(&self) -> Option<ScanReport> {
        self.all().into_iter().next()
    }

    pub fn get(&self, id: &str) -> Option<ScanReport> {
        self.lock()
            .snapshot
            .reports
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().snapshot.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add a custom tag to a saved report. Returns the updated report.
    pub fn add_tag(&self, id: &str, tag: &str) -> StoreResult<ScanReport> {
        let tag = clean_tag(tag)?;
        self.with_report(id, |report| {
            report.custom_domain_tags.insert(tag);
        })
    }

    /// Remove a custom tag. Removing an absent tag is not an error.
    pub fn remove_tag(&self, id: &str, tag: &str) -> StoreResult<ScanReport> {
        let tag = clean_tag(tag)?;
        self.with_report(id, |report| {
            report.custom_domain_tags.remove(&tag);
        })
    }

    fn with_report(&self, id: &str, edit: impl FnOnce(&mut ScanReport)) -> StoreResult<ScanReport> {
        let mut state = self.lock();
        let report = state
            .snapshot
            .reports
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        edit(report);
        Ok(report.clone())
    }

    pub fn snapshot(&self) -> ReportSnapshot {
        self.lock().snapshot.clone()
    }

    /// Replace the store contents, dropping outstanding id reservations
    pub fn reset(&self, snapshot: ReportSnapshot) {
        let mut state = self.lock();
        state.snapshot = snapshot;
        state.snapshot.next_seq = state
            .snapshot
            .next_seq
            .max(state.snapshot.reports.len() as u64);
        state.pending.clear();
    }
}

/// Sort by `created_at` descending; equal timestamps keep later insertions first.
fn newest_first<'a>(reports: impl DoubleEndedIterator<Item = &'a ScanReport>) -> Vec<ScanReport> {
    let mut ordered: Vec<ScanReport> = reports.rev().cloned().collect();
    ordered.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    ordered
}

fn clean_tag(tag: &str) -> StoreResult<String> {
    let tag = tag.trim().to_lowercase();
    if tag.is_empty() {
        return Err(StoreError::BlankTag);
    }
    Ok(tag)
}
