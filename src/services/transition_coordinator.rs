//! Public entry point for creating transactions and moving them between states.

use bigdecimal::BigDecimal;
use std::sync::Arc;

use crate::domain::{StateMachine, Transaction, TransactionStatus};
use crate::error::TransitionError;
use crate::ports::{RepositoryError, TransactionRepository};

/// Wraps a repository with the status graph.
///
/// The coordinator never reads a status and then writes based on it: every
/// transition is a single conditional write, and the read that follows a
/// zero-row outcome only decides between `NotFound` and `Conflict`. It does
/// not retry; callers own that policy.
#[derive(Clone)]
pub struct TransitionCoordinator {
    repository: Arc<dyn TransactionRepository>,
}

impl TransitionCoordinator {
    pub fn new(repository: Arc<dyn TransactionRepository>) -> Self {
        Self { repository }
    }

    pub async fn create(
        &self,
        id: impl Into<String>,
        amount: BigDecimal,
    ) -> Result<Transaction, TransitionError> {
        let tx = Transaction::new(id, amount);

        match self.repository.create(&tx).await {
            Ok(created) => {
                tracing::info!(
                    transaction_id = %created.id,
                    amount = %created.amount,
                    "Transaction created"
                );
                Ok(created)
            }
            Err(RepositoryError::DuplicateId(_)) => {
                tracing::debug!(transaction_id = %tx.id, "Duplicate transaction id rejected");
                Err(TransitionError::DuplicateId(tx.id))
            }
            Err(e) => Err(log_storage_failure(&tx.id, e)),
        }
    }

    pub async fn get(&self, id: &str) -> Result<Transaction, TransitionError> {
        match self.repository.get(id).await {
            Ok(tx) => Ok(tx),
            Err(RepositoryError::NotFound(_)) => Err(TransitionError::NotFound(id.to_string())),
            Err(e) => Err(log_storage_failure(id, e)),
        }
    }

    /// Moves `id` from `expected_status` to `new_status` if, at the moment of
    /// the write, the stored status is still `expected_status`.
    pub async fn try_transition(
        &self,
        id: &str,
        expected_status: TransactionStatus,
        new_status: TransactionStatus,
    ) -> Result<Transaction, TransitionError> {
        self.transition(id, expected_status, None, new_status).await
    }

    /// Like [`try_transition`](Self::try_transition), but the write also
    /// requires the stored version to equal `expected_version`.
    pub async fn try_transition_at_version(
        &self,
        id: &str,
        expected_status: TransactionStatus,
        expected_version: i64,
        new_status: TransactionStatus,
    ) -> Result<Transaction, TransitionError> {
        self.transition(id, expected_status, Some(expected_version), new_status)
            .await
    }

    /// Newest first. Negative bounds are treated as zero for every store.
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Transaction>, TransitionError> {
        self.repository
            .list(limit.max(0), offset.max(0))
            .await
            .map_err(|e| log_storage_failure("*", e))
    }

    pub async fn health_check(&self) -> Result<(), TransitionError> {
        self.repository.ping().await.map_err(TransitionError::from)
    }

    async fn transition(
        &self,
        id: &str,
        expected_status: TransactionStatus,
        expected_version: Option<i64>,
        new_status: TransactionStatus,
    ) -> Result<Transaction, TransitionError> {
        StateMachine::validate(expected_status, new_status)?;

        let updated = self
            .repository
            .conditional_update(id, expected_status, expected_version, new_status)
            .await
            .map_err(|e| log_storage_failure(id, e))?;

        if let Some(tx) = updated {
            tracing::info!(
                transaction_id = %tx.id,
                from = %expected_status,
                to = %tx.status,
                version = tx.version,
                "Transaction transitioned"
            );
            return Ok(tx);
        }

        // Zero rows changed. This read only classifies the outcome.
        match self.repository.get(id).await {
            Ok(current) => {
                tracing::debug!(
                    transaction_id = %id,
                    expected = %expected_status,
                    actual = %current.status,
                    expected_version = ?expected_version,
                    actual_version = current.version,
                    "Transition lost: precondition no longer holds"
                );
                Err(TransitionError::Conflict {
                    id: id.to_string(),
                    expected: expected_status,
                    expected_version,
                    actual: current.status,
                    actual_version: current.version,
                })
            }
            Err(RepositoryError::NotFound(_)) => {
                tracing::warn!(transaction_id = %id, "Transition requested for unknown transaction");
                Err(TransitionError::NotFound(id.to_string()))
            }
            Err(e) => Err(log_storage_failure(id, e)),
        }
    }
}

fn log_storage_failure(id: &str, err: RepositoryError) -> TransitionError {
    tracing::error!(transaction_id = %id, error = %err, "Transaction store failure");
    TransitionError::from(err)
}
