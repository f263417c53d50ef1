use thiserror::Error;

use crate::domain::TransactionStatus;
use crate::ports::RepositoryError;

/// Outcome of a rejected coordinator call.
///
/// `Conflict` and `NotFound` are ordinary results in a healthy system, not
/// faults; callers are expected to match on them.
#[derive(Error, Debug)]
pub enum TransitionError {
    #[error("Duplicate transaction id: {0}")]
    DuplicateId(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition {
        from: TransactionStatus,
        to: TransactionStatus,
    },

    #[error(
        "Conflict on {id}: expected {expected}{}, found {actual} at version {actual_version}",
        .expected_version.map(|v| format!(" at version {}", v)).unwrap_or_default()
    )]
    Conflict {
        id: String,
        expected: TransactionStatus,
        expected_version: Option<i64>,
        actual: TransactionStatus,
        actual_version: i64,
    },

    /// Transient infrastructure failure; carries no information about the record.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Persistent storage fault (bad row, schema mismatch, rejected SQL).
    /// Repeating the call will fail the same way.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl TransitionError {
    /// Whether repeating the call (after re-reading for `Conflict`) can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransitionError::Conflict { .. } | TransitionError::StorageUnavailable(_)
        )
    }
}

impl From<RepositoryError> for TransitionError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::DuplicateId(id) => TransitionError::DuplicateId(id),
            RepositoryError::NotFound(id) => TransitionError::NotFound(id),
            RepositoryError::Unavailable(msg) => TransitionError::StorageUnavailable(msg),
            RepositoryError::Corrupt(msg) => TransitionError::Storage(msg),
            RepositoryError::Database(e) => TransitionError::Storage(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TransactionStatus::*;

    #[test]
    fn test_conflict_is_retryable() {
        let error = TransitionError::Conflict {
            id: "tx1".to_string(),
            expected: Pending,
            expected_version: None,
            actual: Completed,
            actual_version: 2,
        };
        assert!(error.is_retryable());
    }

    #[test]
    fn test_storage_unavailable_is_retryable() {
        assert!(TransitionError::StorageUnavailable("timeout".to_string()).is_retryable());
    }

    #[test]
    fn test_logic_errors_are_not_retryable() {
        assert!(!TransitionError::DuplicateId("tx1".to_string()).is_retryable());
        assert!(!TransitionError::NotFound("tx1".to_string()).is_retryable());
        assert!(!TransitionError::InvalidTransition { from: Failed, to: Pending }.is_retryable());
    }

    #[test]
    fn test_corrupt_row_is_not_retryable() {
        let error = TransitionError::from(RepositoryError::Corrupt(
            "tx1: unknown transaction status 'settled'".into(),
        ));
        assert!(matches!(error, TransitionError::Storage(_)));
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_database_fault_is_not_retryable() {
        let error = TransitionError::from(RepositoryError::Database(sqlx::Error::RowNotFound));
        assert!(matches!(error, TransitionError::Storage(_)));
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_unavailable_store_is_retryable() {
        let error = TransitionError::from(RepositoryError::Unavailable("pool timed out".into()));
        assert!(matches!(error, TransitionError::StorageUnavailable(_)));
        assert!(error.is_retryable());
    }

    #[test]
    fn test_repository_errors_map_to_transition_errors() {
        assert!(matches!(
            TransitionError::from(RepositoryError::DuplicateId("a".into())),
            TransitionError::DuplicateId(id) if id == "a"
        ));
        assert!(matches!(
            TransitionError::from(RepositoryError::NotFound("b".into())),
            TransitionError::NotFound(id) if id == "b"
        ));
    }

    #[test]
    fn test_conflict_message_names_both_states() {
        let error = TransitionError::Conflict {
            id: "tx1".to_string(),
            expected: Pending,
            expected_version: None,
            actual: Cancelled,
            actual_version: 2,
        };
        assert_eq!(
            error.to_string(),
            "Conflict on tx1: expected pending, found cancelled at version 2"
        );
    }

    #[test]
    fn test_version_miss_message_names_both_versions() {
        let error = TransitionError::Conflict {
            id: "tx1".to_string(),
            expected: Pending,
            expected_version: Some(3),
            actual: Pending,
            actual_version: 1,
        };
        assert_eq!(
            error.to_string(),
            "Conflict on tx1: expected pending at version 3, found pending at version 1"
        );
    }
}
