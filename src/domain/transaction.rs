//! Transaction domain entity.
//! Framework-agnostic representation of a financial transaction and its status.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Lifecycle status of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

impl TransactionStatus {
    pub const ALL: [TransactionStatus; 4] = [
        TransactionStatus::Pending,
        TransactionStatus::Completed,
        TransactionStatus::Failed,
        TransactionStatus::Cancelled,
    ];

    /// Value stored in the `status` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown transaction status '{0}'")]
pub struct ParseStatusError(pub String);

impl FromStr for TransactionStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(TransactionStatus::Pending),
            "completed" => Ok(TransactionStatus::Completed),
            "failed" => Ok(TransactionStatus::Failed),
            "cancelled" => Ok(TransactionStatus::Cancelled),
            _ => Err(ParseStatusError(s.to_string())),
        }
    }
}

/// Domain entity representing a transaction.
///
/// `version` is the optimistic-concurrency token: it starts at 1 and grows by
/// exactly one with every successful status write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub amount: BigDecimal,
    pub status: TransactionStatus,
    pub version: i64,
    pub date_created: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
}

impl Transaction {
    pub const INITIAL_VERSION: i64 = 1;

    /// Builds a fresh `Pending` record at version 1.
    pub fn new(id: impl Into<String>, amount: BigDecimal) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            amount,
            status: TransactionStatus::Pending,
            version: Self::INITIAL_VERSION,
            date_created: now,
            date_updated: now,
        }
    }
}
