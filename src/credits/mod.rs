//! Credit accounting for paid scan tiers
//!
//! The ledger keeps a balance split into purchased (base) credits and bonus
//! credits, plus an append-only log of every change. Paid scans reserve
//! their cost before the provider is called; a failed scan is compensated
//! with a refund rather than rolled back.
//!
//! # Invariants
//!
//! - `credits + bonus_credits` never goes negative
//! - every balance change appends exactly one transaction
//! - the sum of all transaction amounts equals the current available
//!   balance minus the initial balance
//! - `use` amounts are negative; `purchase`, `bonus` and `refund` are not

mod ledger;

pub use ledger::CreditLedger;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest amount a single change may carry, and the balance cap, so that
/// every transaction amount fits in an `i64`
pub const MAX_CREDITS: u64 = i64::MAX as u64;

/// Errors raised by the ledger
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Credit amount must be between 1 and {max}, got {0}", max = MAX_CREDITS)]
    InvalidAmount(u64),

    #[error("Adding {amount} credits to a balance of {available} exceeds the maximum balance")]
    BalanceOverflow { available: u64, amount: u64 },
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Kind of ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Purchase,
    Use,
    Bonus,
    Refund,
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionType::Purchase => write!(f, "purchase"),
            TransactionType::Use => write!(f, "use"),
            TransactionType::Bonus => write!(f, "bonus"),
            TransactionType::Refund => write!(f, "refund"),
        }
    }
}

/// One entry of the append-only credit log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditTransaction {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// Signed change to the available balance
    pub amount: i64,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_report_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Current credit balance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditBalance {
    pub credits: u64,
    pub bonus_credits: u64,
    pub total_purchased: u64,
    pub total_used: u64,
    pub updated_at: DateTime<Utc>,
}

impl CreditBalance {
    pub fn new(credits: u64, bonus_credits: u64) -> Self {
        Self {
            credits,
            bonus_credits,
            total_purchased: 0,
            total_used: 0,
            updated_at: Utc::now(),
        }
    }

    /// Credits available for spending (base + bonus)
    pub fn available(&self) -> u64 {
        self.credits.saturating_add(self.bonus_credits)
    }
}

/// Serializable ledger state, used for persistence and injection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Available balance before the first logged transaction
    pub initial_balance: u64,
    pub balance: CreditBalance,
    #[serde(default)]
    pub transactions: Vec<CreditTransaction>,
}

impl LedgerSnapshot {
    /// Fresh ledger state with a starting balance and an empty log
    pub fn opening(credits: u64, bonus_credits: u64) -> Self {
        Self {
            initial_balance: credits.saturating_add(bonus_credits),
            balance: CreditBalance::new(credits, bonus_credits),
            transactions: Vec::new(),
        }
    }

    /// Whether the log sums to the balance change since opening
    pub fn is_conserved(&self) -> bool {
        let logged: i128 = self.transactions.iter().map(|t| i128::from(t.amount)).sum();
        i128::from(self.balance.available()) - i128::from(self.initial_balance) == logged
    }
}
