//! Postgres implementation of TransactionRepository.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::{Transaction, TransactionStatus};
use crate::ports::{RepositoryError, RepositoryResult, TransactionRepository};

const COLUMNS: &str = "transaction_id, amount, status, version, date_created, date_updated";

/// Postgres-backed transaction repository.
#[derive(Clone)]
pub struct PostgresTransactionRepository {
    pool: PgPool,
}

impl PostgresTransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl TransactionRepository for PostgresTransactionRepository {
    async fn create(&self, tx: &Transaction) -> RepositoryResult<Transaction> {
        // ON CONFLICT keeps a duplicate id from touching the existing row.
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            r#"
            INSERT INTO transactions (
                transaction_id, amount, status, version, date_created, date_updated
            ) VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (transaction_id) DO NOTHING
            RETURNING {COLUMNS}
            "#
        ))
        .bind(&tx.id)
        .bind(&tx.amount)
        .bind(tx.status.as_str())
        .bind(tx.version)
        .bind(tx.date_created)
        .bind(tx.date_updated)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_insert_error(&tx.id, e))?;

        match row {
            Some(row) => row.into_domain(),
            None => Err(RepositoryError::DuplicateId(tx.id.clone())),
        }
    }

    async fn get(&self, id: &str) -> RepositoryResult<Transaction> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {COLUMNS} FROM transactions WHERE transaction_id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| RepositoryError::NotFound(id.to_string()))?
            .into_domain()
    }

    async fn conditional_update(
        &self,
        id: &str,
        expected_status: TransactionStatus,
        expected_version: Option<i64>,
        new_status: TransactionStatus,
    ) -> RepositoryResult<Option<Transaction>> {
        // The status check and the write are one statement; Postgres row
        // locking serializes concurrent updates and re-evaluates the WHERE
        // clause against the committed row, so only one caller can match.
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            r#"
            UPDATE transactions
            SET status = $3,
                version = version + 1,
                date_updated = GREATEST(clock_timestamp(), date_updated)
            WHERE transaction_id = $1
              AND status = $2
              AND ($4::BIGINT IS NULL OR version = $4)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(expected_status.as_str())
        .bind(new_status.as_str())
        .bind(expected_version)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TransactionRow::into_domain).transpose()
    }

    async fn list(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {COLUMNS} FROM transactions ORDER BY date_created DESC, transaction_id LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TransactionRow::into_domain).collect()
    }

    async fn ping(&self) -> RepositoryResult<()> {
        let one: i32 = sqlx::query_scalar("SELECT 1").fetch_one(&self.pool).await?;
        if one != 1 {
            return Err(RepositoryError::Corrupt(format!(
                "liveness probe returned {one}"
            )));
        }
        Ok(())
    }
}

fn map_insert_error(id: &str, err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db_err) = &err {
        // unique_violation, in case the id was inserted outside ON CONFLICT's reach
        if db_err.code().as_deref() == Some("23505") {
            return RepositoryError::DuplicateId(id.to_string());
        }
    }
    RepositoryError::from(err)
}

/// Internal row type for SQLx. Not exposed outside the adapter.
#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    transaction_id: String,
    amount: bigdecimal::BigDecimal,
    status: String,
    version: i64,
    date_created: chrono::DateTime<chrono::Utc>,
    date_updated: chrono::DateTime<chrono::Utc>,
}

impl TransactionRow {
    fn into_domain(self) -> RepositoryResult<Transaction> {
        let status = self.status.parse::<TransactionStatus>().map_err(|e| {
            RepositoryError::Corrupt(format!("{}: {}", self.transaction_id, e))
        })?;

        Ok(Transaction {
            id: self.transaction_id,
            amount: self.amount,
            status,
            version: self.version,
            date_created: self.date_created,
            date_updated: self.date_updated,
        })
    }
}
