//! Thread-safe credit ledger
//!
//! All mutations take the same lock, so the availability check and the
//! deduction in `reserve_and_use` happen as one step. Two callers racing for
//! the last credits cannot both win.

use super::{
    CreditBalance, CreditTransaction, LedgerError, LedgerResult, LedgerSnapshot, TransactionType,
    MAX_CREDITS,
};
use crate::config::CreditsConfig;
use crate::models::ScanTier;
use chrono::Utc;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Credit balance plus append-only transaction log
pub struct CreditLedger {
    config: CreditsConfig,
    state: Mutex<LedgerSnapshot>,
}

impl CreditLedger {
    /// Create a ledger with the opening balance from config
    pub fn new(config: CreditsConfig) -> Self {
        let opening =
            LedgerSnapshot::opening(config.initial_credits, config.initial_bonus_credits);
        Self::with_snapshot(config, opening)
    }

    /// Create a ledger from previously saved (or injected) state
    pub fn with_snapshot(config: CreditsConfig, snapshot: LedgerSnapshot) -> Self {
        if !snapshot.is_conserved() {
            warn!(
                "Loaded ledger does not reconcile: {} available, {} initial, {} transactions",
                snapshot.balance.available(),
                snapshot.initial_balance,
                snapshot.transactions.len()
            );
        }
        Self {
            config,
            state: Mutex::new(snapshot),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LedgerSnapshot> {
        // Balance and log change together after all checks, so a poisoned
        // lock still holds consistent state
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Credit cost of a tier
    pub fn cost_for(&self, tier: ScanTier) -> u64 {
        self.config.cost_for(tier)
    }

    pub fn has_credits_for(&self, tier: ScanTier) -> bool {
        self.available() >= self.cost_for(tier)
    }

    /// Atomically check the balance and deduct the tier cost.
    ///
    /// Returns `false` without touching state when the balance is short;
    /// callers must abort the paid operation in that case. Bonus credits are
    /// spent before base credits. Free tiers succeed without a transaction.
    #[must_use = "a false result means nothing was reserved and the scan must not proceed"]
    pub fn reserve_and_use(&self, tier: ScanTier, scan_report_id: Option<&str>) -> bool {
        let cost = self.cost_for(tier);
        if cost == 0 {
            return true;
        }

        let Ok(amount) = i64::try_from(cost) else {
            warn!("{} tier cost {} exceeds the credit limit", tier, cost);
            return false;
        };

        let mut state = self.lock();
        let available = state.balance.available();
        if available < cost {
            debug!(
                "Reservation refused for {} tier: needs {}, {} available",
                tier, cost, available
            );
            return false;
        }

        let from_bonus = cost.min(state.balance.bonus_credits);
        let from_base = cost - from_bonus;
        state.balance.bonus_credits -= from_bonus;
        state.balance.credits -= from_base;
        state.balance.total_used = state.balance.total_used.saturating_add(cost);
        state.balance.updated_at = Utc::now();

        let txn = new_transaction(
            TransactionType::Use,
            -amount,
            scan_report_id.map(str::to_string),
            Some(format!("{} scan", tier)),
        );
        debug!(
            "Reserved {} credits ({} bonus, {} base) for {:?}",
            cost, from_bonus, from_base, scan_report_id
        );
        state.transactions.push(txn);
        true
    }

    /// Return credits after a reserved operation failed downstream.
    ///
    /// Refunds always land in base credits, never bonus credits. The caller
    /// is responsible for only refunding a `use` that actually failed.
    pub fn refund(&self, amount: u64, reason: &str) -> LedgerResult<CreditTransaction> {
        self.apply_refund(amount, reason, None)
    }

    /// Refund tied to the scan whose reservation is being returned
    pub fn refund_for_scan(
        &self,
        amount: u64,
        reason: &str,
        scan_report_id: &str,
    ) -> LedgerResult<CreditTransaction> {
        self.apply_refund(amount, reason, Some(scan_report_id.to_string()))
    }

    fn apply_refund(
        &self,
        amount: u64,
        reason: &str,
        scan_report_id: Option<String>,
    ) -> LedgerResult<CreditTransaction> {
        let signed = signed_amount(amount)?;

        let mut state = self.lock();
        ensure_room(&state.balance, amount)?;
        state.balance.credits += amount;
        state.balance.total_used = state.balance.total_used.saturating_sub(amount);
        state.balance.updated_at = Utc::now();

        let txn = new_transaction(
            TransactionType::Refund,
            signed,
            scan_report_id,
            Some(reason.to_string()),
        );
        warn!("Refunded {} credits: {}", amount, reason);
        state.transactions.push(txn.clone());
        Ok(txn)
    }

    /// Credit a package from the catalog.
    ///
    /// Returns `false` for an unknown package id, or when the package would
    /// push the balance past [`MAX_CREDITS`]. A package with bonus credits
    /// records a `purchase` and a separate `bonus` transaction.
    pub fn purchase(&self, package_id: &str) -> bool {
        let Some(package) = self.config.package(package_id).cloned() else {
            warn!("Unknown credit package '{}'", package_id);
            return false;
        };
        let (Ok(credits), Ok(bonus_credits)) = (
            i64::try_from(package.credits),
            i64::try_from(package.bonus_credits),
        ) else {
            warn!("Credit package '{}' exceeds the credit limit", package.id);
            return false;
        };

        let mut state = self.lock();
        let total = package.credits.saturating_add(package.bonus_credits);
        if let Err(e) = ensure_room(&state.balance, total) {
            warn!("Purchase of '{}' refused: {}", package.id, e);
            return false;
        }

        let now = Utc::now();
        if package.credits > 0 {
            state.balance.credits += package.credits;
            state.balance.total_purchased =
                state.balance.total_purchased.saturating_add(package.credits);
            let txn = new_transaction(
                TransactionType::Purchase,
                credits,
                None,
                Some(format!("package {}", package.id)),
            );
            state.transactions.push(txn);
        }
        if package.bonus_credits > 0 {
            state.balance.bonus_credits += package.bonus_credits;
            let txn = new_transaction(
                TransactionType::Bonus,
                bonus_credits,
                None,
                Some(format!("package {} bonus", package.id)),
            );
            state.transactions.push(txn);
        }
        state.balance.updated_at = now;

        info!(
            "Purchased package {}: +{} credits, +{} bonus",
            package.id, package.credits, package.bonus_credits
        );
        true
    }

    /// Grant bonus credits
    pub fn bonus(&self, amount: u64, reason: &str) -> LedgerResult<CreditTransaction> {
        let signed = signed_amount(amount)?;

        let mut state = self.lock();
        ensure_room(&state.balance, amount)?;
        state.balance.bonus_credits += amount;
        state.balance.updated_at = Utc::now();
        let txn = new_transaction(
            TransactionType::Bonus,
            signed,
            None,
            Some(reason.to_string()),
        );
        debug!("Granted {} bonus credits: {}", amount, reason);
        state.transactions.push(txn.clone());
        Ok(txn)
    }

    /// Credits available for spending
    pub fn available(&self) -> u64 {
        self.lock().balance.available()
    }

    pub fn balance(&self) -> CreditBalance {
        self.lock().balance.clone()
    }

    /// Transaction log, oldest first
    pub fn transactions(&self) -> Vec<CreditTransaction> {
        self.lock().transactions.clone()
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        self.lock().clone()
    }

    /// Replace all state, e.g. to restore a test fixture
    pub fn reset(&self, snapshot: LedgerSnapshot) {
        *self.lock() = snapshot;
    }

    pub fn config(&self) -> &CreditsConfig {
        &self.config
    }
}

/// Amount of a credit-adding change as a transaction amount
fn signed_amount(amount: u64) -> LedgerResult<i64> {
    i64::try_from(amount)
        .ok()
        .filter(|a| *a > 0)
        .ok_or(LedgerError::InvalidAmount(amount))
}

/// Adding `amount` keeps the available balance within [`MAX_CREDITS`].
/// Both parts are bounded by the total, so field additions cannot overflow.
fn ensure_room(balance: &CreditBalance, amount: u64) -> LedgerResult<()> {
    let available = balance.available();
    match available.checked_add(amount) {
        Some(total) if total <= MAX_CREDITS => Ok(()),
        _ => Err(LedgerError::BalanceOverflow { available, amount }),
    }
}

fn new_transaction(
    kind: TransactionType,
    amount: i64,
    scan_report_id: Option<String>,
    reason: Option<String>,
) -> CreditTransaction {
    CreditTransaction {
        id: format!("txn_{}", Uuid::new_v4().simple()),
        kind,
        amount,
        created_at: Utc::now(),
        scan_report_id,
        reason,
    }
}
