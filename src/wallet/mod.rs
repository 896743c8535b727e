//! Wallet ledger and balance engine.
//!
//! Every balance mutation goes through the mutator in [`mutator`], which
//! records an immutable ledger entry in the same SQL transaction as the
//! balance write. The store in [`store`] owns the schema and the read
//! surface; nothing else touches the `balance` column.

pub mod money;
pub mod mutator;
pub mod store;

pub use money::Amount;
pub use store::WalletStore;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Errors from wallet operations, distinguishable so route handlers can map
/// them to precise user-facing messages.
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("account {0} not found")]
    AccountNotFound(i64),
    #[error("insufficient balance: need {required}, have {available}")]
    InsufficientBalance { required: Amount, available: Amount },
    #[error("amount must be greater than zero")]
    InvalidAmount,
    #[error("duplicate transaction reference {0}")]
    DuplicateReference(String),
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Blocked,
}

impl AccountStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Blocked => "blocked",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "blocked" => AccountStatus::Blocked,
            _ => AccountStatus::Active,
        }
    }
}

/// A user wallet account. Balance is only ever written by the mutator.
#[derive(Debug, Clone, Serialize)]
pub struct Account {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub status: AccountStatus,
    pub balance: Amount,
    pub virtual_account_ref: Option<String>,
    pub virtual_account_number: Option<String>,
    pub virtual_account_bank: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Credit,
    Debit,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Credit => "credit",
            Direction::Debit => "debit",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "debit" => Direction::Debit,
            _ => Direction::Credit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Funding,
    Airtime,
    Data,
    Electricity,
    Cable,
    Kyc,
    AdminAdjustment,
    Refund,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Funding => "funding",
            Category::Airtime => "airtime",
            Category::Data => "data",
            Category::Electricity => "electricity",
            Category::Cable => "cable",
            Category::Kyc => "kyc",
            Category::AdminAdjustment => "admin_adjustment",
            Category::Refund => "refund",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "airtime" => Category::Airtime,
            "data" => Category::Data,
            "electricity" => Category::Electricity,
            "cable" => Category::Cable,
            "kyc" => Category::Kyc,
            "admin_adjustment" => Category::AdminAdjustment,
            "refund" => Category::Refund,
            _ => Category::Funding,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Pending,
    Completed,
    Failed,
}

impl EntryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryStatus::Pending => "pending",
            EntryStatus::Completed => "completed",
            EntryStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "pending" => EntryStatus::Pending,
            "failed" => EntryStatus::Failed,
            _ => EntryStatus::Completed,
        }
    }
}

/// One immutable record of a balance mutation.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub account_id: i64,
    pub direction: Direction,
    pub category: Category,
    pub amount: Amount,
    pub profit: Amount,
    pub balance_before: Amount,
    pub balance_after: Amount,
    pub status: EntryStatus,
    pub reference: String,
    pub description: String,
    pub metadata: serde_json::Value,
    pub provider_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Result of a successful credit or debit.
#[derive(Debug, Clone, Serialize)]
pub struct Mutation {
    pub reference: String,
    pub new_balance: Amount,
}

/// Aggregate figures over the whole ledger, for the admin read surface.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LedgerStats {
    pub total_credited: Amount,
    pub total_debited: Amount,
    pub total_profit: Amount,
    pub entry_count: i64,
    pub account_count: i64,
}

/// Generate a transaction reference: prefix + millisecond timestamp + random
/// hex suffix. Collisions are practically impossible; the store still
/// enforces uniqueness as a hard constraint.
pub fn gen_reference(prefix: &str) -> String {
    let suffix: u32 = rand::thread_rng().gen();
    format!("{}{}{:06X}", prefix, Utc::now().timestamp_millis(), suffix & 0xFF_FFFF)
}
