//! In-process implementation of TransactionRepository.
//!
//! Records live in a `DashMap`; every mutation runs while holding the write
//! lock of the record's shard, which gives `conditional_update` the same
//! check-and-write atomicity the Postgres adapter gets from a single UPDATE.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::domain::{Transaction, TransactionStatus};
use crate::ports::{RepositoryError, RepositoryResult, TransactionRepository};

#[derive(Clone, Default)]
pub struct InMemoryTransactionRepository {
    records: Arc<DashMap<String, Transaction>>,
    offline: Arc<AtomicBool>,
}

impl InMemoryTransactionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// While offline every call fails with `RepositoryError::Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn ensure_online(&self) -> RepositoryResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable(
                "in-memory store is offline".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl TransactionRepository for InMemoryTransactionRepository {
    async fn create(&self, tx: &Transaction) -> RepositoryResult<Transaction> {
        self.ensure_online()?;
        match self.records.entry(tx.id.clone()) {
            Entry::Occupied(_) => Err(RepositoryError::DuplicateId(tx.id.clone())),
            Entry::Vacant(slot) => Ok(slot.insert(tx.clone()).clone()),
        }
    }

    async fn get(&self, id: &str) -> RepositoryResult<Transaction> {
        self.ensure_online()?;
        self.records
            .get(id)
            .map(|r| r.value().clone())
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))
    }

    async fn conditional_update(
        &self,
        id: &str,
        expected_status: TransactionStatus,
        expected_version: Option<i64>,
        new_status: TransactionStatus,
    ) -> RepositoryResult<Option<Transaction>> {
        self.ensure_online()?;
        let Some(mut record) = self.records.get_mut(id) else {
            return Ok(None);
        };

        let version_matches = expected_version.map_or(true, |v| v == record.version);
        if record.status != expected_status || !version_matches {
            return Ok(None);
        }

        record.status = new_status;
        record.version += 1;
        record.date_updated = Utc::now().max(record.date_updated);
        Ok(Some(record.clone()))
    }

    async fn list(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<Transaction>> {
        self.ensure_online()?;
        let mut all: Vec<Transaction> = self.records.iter().map(|r| r.value().clone()).collect();
        all.sort_by(|a, b| {
            b.date_created
                .cmp(&a.date_created)
                .then_with(|| a.id.cmp(&b.id))
        });

        Ok(all
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn ping(&self) -> RepositoryResult<()> {
        self.ensure_online()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(id: &str) -> Transaction {
        Transaction::new(id, "100.00".parse().unwrap())
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_without_overwriting() {
        let repo = InMemoryTransactionRepository::new();
        let original = repo.create(&pending("tx1")).await.unwrap();

        let mut other = pending("tx1");
        other.amount = "5.00".parse().unwrap();
        let err = repo.create(&other).await.unwrap_err();

        assert!(matches!(err, RepositoryError::DuplicateId(id) if id == "tx1"));
        assert_eq!(repo.get("tx1").await.unwrap(), original);
    }

    #[tokio::test]
    async fn test_conditional_update_requires_matching_status() {
        let repo = InMemoryTransactionRepository::new();
        repo.create(&pending("tx1")).await.unwrap();

        let miss = repo
            .conditional_update("tx1", TransactionStatus::Completed, None, TransactionStatus::Failed)
            .await
            .unwrap();
        assert!(miss.is_none());

        let hit = repo
            .conditional_update("tx1", TransactionStatus::Pending, None, TransactionStatus::Failed)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.status, TransactionStatus::Failed);
        assert_eq!(hit.version, 2);
    }

    #[tokio::test]
    async fn test_conditional_update_checks_version_when_given() {
        let repo = InMemoryTransactionRepository::new();
        repo.create(&pending("tx1")).await.unwrap();

        let stale = repo
            .conditional_update("tx1", TransactionStatus::Pending, Some(7), TransactionStatus::Completed)
            .await
            .unwrap();
        assert!(stale.is_none());
        assert_eq!(repo.get("tx1").await.unwrap().version, 1);

        let fresh = repo
            .conditional_update("tx1", TransactionStatus::Pending, Some(1), TransactionStatus::Completed)
            .await
            .unwrap();
        assert!(fresh.is_some());
    }

    #[tokio::test]
    async fn test_conditional_update_on_missing_id_changes_nothing() {
        let repo = InMemoryTransactionRepository::new();
        let outcome = repo
            .conditional_update("ghost", TransactionStatus::Pending, None, TransactionStatus::Completed)
            .await
            .unwrap();
        assert!(outcome.is_none());
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn test_list_pages_through_records() {
        let repo = InMemoryTransactionRepository::new();
        for i in 0..5 {
            repo.create(&pending(&format!("tx{}", i))).await.unwrap();
        }

        assert_eq!(repo.list(2, 0).await.unwrap().len(), 2);
        assert_eq!(repo.list(10, 3).await.unwrap().len(), 2);
        assert!(repo.list(10, 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_offline_store_reports_unavailable() {
        let repo = InMemoryTransactionRepository::new();
        repo.set_offline(true);
        assert!(matches!(repo.ping().await, Err(RepositoryError::Unavailable(_))));
        assert!(matches!(
            repo.create(&pending("tx1")).await,
            Err(RepositoryError::Unavailable(_))
        ));

        repo.set_offline(false);
        assert!(repo.ping().await.is_ok());
    }
}
