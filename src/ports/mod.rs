//! Storage port for transactions.
//!
//! Adapters implement [`TransactionRepository`]; the coordinator only ever
//! talks to this trait, so each test can run against its own isolated store.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Transaction, TransactionStatus};

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Duplicate transaction id: {0}")]
    DuplicateId(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_) => RepositoryError::Unavailable(err.to_string()),
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                RepositoryError::Corrupt(err.to_string())
            }
            other => RepositoryError::Database(other),
        }
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Inserts `tx` only if no record with its id exists.
    async fn create(&self, tx: &Transaction) -> RepositoryResult<Transaction>;

    async fn get(&self, id: &str) -> RepositoryResult<Transaction>;

    /// Single indivisible guarded write.
    ///
    /// Sets `status = new_status`, bumps `version` by one and refreshes
    /// `date_updated`, but only if the stored status equals `expected_status`
    /// (and the stored version equals `expected_version` when given).
    /// Returns the row as written when exactly one row changed, `None` when
    /// none did. A missing id also yields `None`.
    async fn conditional_update(
        &self,
        id: &str,
        expected_status: TransactionStatus,
        expected_version: Option<i64>,
        new_status: TransactionStatus,
    ) -> RepositoryResult<Option<Transaction>>;

    /// Newest first.
    async fn list(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<Transaction>>;

    async fn ping(&self) -> RepositoryResult<()>;
}
