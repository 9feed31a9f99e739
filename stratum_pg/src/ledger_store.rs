use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use stratum_core::{BoxError, Direction, LedgerEntry, LedgerStore, Lineage, Version};

/// Ledger store on top of postgres.
///
/// Entries live in the `_stratum_ledger` table, which is created on demand.
/// Rows are only ever inserted; the append order is the `id` order.
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

/// Errors returned by the [`PgLedgerStore`].
#[derive(Debug, thiserror::Error)]
pub enum PgLedgerStoreError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A ledger row can't be read back.
    #[error("Corrupt ledger row {id}: {reason}")]
    Corrupt {
        /// The row id.
        id: i64,
        /// What is wrong with it.
        reason: String,
    },
}

impl PgLedgerStore {
    /// Creates a new `PgLedgerStore` instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Ensures the ledger table exists.
    pub async fn ensure_tracking_table(&self) -> Result<(), PgLedgerStoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS _stratum_ledger (
                id BIGSERIAL PRIMARY KEY,
                lineage VARCHAR(64) NOT NULL,
                version VARCHAR(32) NOT NULL,
                name VARCHAR(255) NOT NULL,
                direction VARCHAR(16) NOT NULL,
                applied_at TIMESTAMPTZ NOT NULL,
                checksum VARCHAR(64)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_stratum_ledger_lineage ON _stratum_ledger (lineage, id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert(&self, entry: &LedgerEntry) -> Result<(), PgLedgerStoreError> {
        self.ensure_tracking_table().await?;

        sqlx::query(
            r#"
            INSERT INTO _stratum_ledger (lineage, version, name, direction, applied_at, checksum)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(entry.lineage.as_str())
        .bind(entry.version.to_string())
        .bind(&entry.name)
        .bind(entry.direction.past_tense())
        .bind(entry.applied_at)
        .bind(entry.checksum.as_deref())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn select(&self, lineage: &Lineage) -> Result<Vec<LedgerEntry>, PgLedgerStoreError> {
        self.ensure_tracking_table().await?;

        let rows = sqlx::query(
            r#"
            SELECT id, version, name, direction, applied_at, checksum
            FROM _stratum_ledger
            WHERE lineage = $1
            ORDER BY id ASC
            "#,
        )
        .bind(lineage.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<LedgerEntry, PgLedgerStoreError> {
                let id: i64 = row.try_get("id")?;
                let raw_version: String = row.try_get("version")?;
                let raw_direction: String = row.try_get("direction")?;
                let applied_at: DateTime<Utc> = row.try_get("applied_at")?;

                let version = Version::parse(&raw_version).map_err(|e| {
                    PgLedgerStoreError::Corrupt {
                        id,
                        reason: e.to_string(),
                    }
                })?;
                let direction = Direction::from_past_tense(&raw_direction).ok_or_else(|| {
                    PgLedgerStoreError::Corrupt {
                        id,
                        reason: format!("unknown direction '{raw_direction}'"),
                    }
                })?;

                Ok(LedgerEntry {
                    lineage: lineage.clone(),
                    version,
                    name: row.try_get("name")?,
                    direction,
                    applied_at,
                    checksum: row.try_get("checksum")?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn append(&self, entry: LedgerEntry) -> Result<(), BoxError> {
        Ok(self.insert(&entry).await?)
    }

    async fn entries(&self, lineage: &Lineage) -> Result<Vec<LedgerEntry>, BoxError> {
        Ok(self.select(lineage).await?)
    }
}
