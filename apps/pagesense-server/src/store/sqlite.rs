//! SQLite-backed audit store

use async_trait::async_trait;
use audit_core::Identity;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use tracing::info;

use super::{AuditRecord, AuditStore, ReportPatch, StoreError};

pub struct SqliteAuditStore {
    pool: SqlitePool,
}

/// Row shape of `audit_requests`
#[derive(Debug, FromRow)]
struct DbAuditRecord {
    id: String,
    timestamp_ms: i64,
    url: Option<String>,
    score: Option<i64>,
    html: Option<String>,
}

impl From<DbAuditRecord> for AuditRecord {
    fn from(row: DbAuditRecord) -> Self {
        Self {
            id: row.id,
            timestamp: DateTime::from_timestamp_millis(row.timestamp_ms).unwrap_or_default(),
            url: row.url,
            score: row.score.map(|s| s.clamp(0, 100) as u8),
            html: row.html,
        }
    }
}

impl SqliteAuditStore {
    /// Connect and run migrations
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        info!("Connecting to database: {}", database_url);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        Self::with_pool(pool).await
    }

    /// Private in-memory database. A single connection, since every SQLite
    /// `:memory:` connection is its own database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        Self::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    async fn run_migrations(pool: &SqlitePool) -> Result<(), StoreError> {
        info!("Running database migrations...");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS audit_requests (
                identity TEXT NOT NULL,
                id TEXT NOT NULL,
                timestamp_ms INTEGER NOT NULL,
                url TEXT,
                score INTEGER,
                html TEXT,
                PRIMARY KEY (identity, id)
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_audit_requests_identity_ts
            ON audit_requests(identity, timestamp_ms)
            "#,
        )
        .execute(pool)
        .await?;

        info!("Migrations complete");
        Ok(())
    }
}

#[async_trait]
impl AuditStore for SqliteAuditStore {
    async fn count_since(&self, identity: &Identity, since: DateTime<Utc>) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM audit_requests WHERE identity = ? AND timestamp_ms > ?",
        )
        .bind(identity.as_str())
        .bind(since.timestamp_millis())
        .fetch_one(&self.pool)
        .await?;

        Ok(count.max(0) as u64)
    }

    async fn insert(&self, identity: &Identity, record: AuditRecord) -> Result<String, StoreError> {
        let mut timestamp_ms = record.timestamp.timestamp_millis();
        let mut id = record.id;

        loop {
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO audit_requests (identity, id, timestamp_ms, url, score, html)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(identity.as_str())
            .bind(&id)
            .bind(timestamp_ms)
            .bind(record.url.as_deref())
            .bind(record.score.map(i64::from))
            .bind(record.html.as_deref())
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 1 {
                return Ok(id);
            }

            timestamp_ms += 1;
            id = timestamp_ms.to_string();
        }
    }

    async fn latest(&self, identity: &Identity) -> Result<Option<AuditRecord>, StoreError> {
        let row: Option<DbAuditRecord> = sqlx::query_as(
            r#"
            SELECT id, timestamp_ms, url, score, html
            FROM audit_requests
            WHERE identity = ?
            ORDER BY timestamp_ms DESC
            LIMIT 1
            "#,
        )
        .bind(identity.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(AuditRecord::from))
    }

    async fn update(&self, identity: &Identity, id: &str, patch: ReportPatch) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE audit_requests
            SET url = ?, score = ?, html = ?
            WHERE identity = ? AND id = ?
            "#,
        )
        .bind(&patch.url)
        .bind(i64::from(patch.score))
        .bind(&patch.html)
        .bind(identity.as_str())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn list(&self, identity: &Identity, limit: u32) -> Result<Vec<AuditRecord>, StoreError> {
        let rows: Vec<DbAuditRecord> = sqlx::query_as(
            r#"
            SELECT id, timestamp_ms, url, score, html
            FROM audit_requests
            WHERE identity = ?
            ORDER BY timestamp_ms DESC
            LIMIT ?
            "#,
        )
        .bind(identity.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(AuditRecord::from).collect())
    }

    async fn get(&self, identity: &Identity, id: &str) -> Result<Option<AuditRecord>, StoreError> {
        let row: Option<DbAuditRecord> = sqlx::query_as(
            r#"
            SELECT id, timestamp_ms, url, score, html
            FROM audit_requests
            WHERE identity = ? AND id = ?
            "#,
        )
        .bind(identity.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(AuditRecord::from))
    }
}
