//! Audit Store - per-identity audit history
//!
//! One record per accepted audit request. The rate limiter inserts the record
//! (timestamp only) to claim a quota slot and passes its id down the pipeline;
//! once the report is rendered the HTML, URL, and score are attached to that
//! same record by id.
//!
//! Records are keyed by `(identity, id)` where `id` is the creation time in
//! Unix milliseconds, rendered as a decimal string.

mod memory;
mod sqlite;

pub use memory::MemoryAuditStore;
pub use sqlite::SqliteAuditStore;

use async_trait::async_trait;
use audit_core::{display_domain, Identity};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// A persisted audit request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub url: Option<String>,
    pub score: Option<u8>,
    pub html: Option<String>,
}

impl AuditRecord {
    /// A record claiming a quota slot, before any report exists
    pub fn placeholder(timestamp: DateTime<Utc>) -> Self {
        Self {
            id: timestamp.timestamp_millis().to_string(),
            timestamp,
            url: None,
            score: None,
            html: None,
        }
    }

    /// History-list view of this record (no HTML)
    pub fn summary(&self) -> RecordSummary {
        RecordSummary {
            id: self.id.clone(),
            date: self.timestamp.format("%Y-%m-%d").to_string(),
            timestamp: self.timestamp,
            domain: self.url.as_deref().map(display_domain),
            url: self.url.clone(),
            score: self.score,
            has_report: self.html.is_some(),
        }
    }
}

/// Report fields attached after rendering
#[derive(Debug, Clone)]
pub struct ReportPatch {
    pub url: String,
    pub score: u8,
    pub html: String,
}

/// Entry in the history list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordSummary {
    pub id: String,
    pub date: String,
    pub timestamp: DateTime<Utc>,
    pub domain: Option<String>,
    pub url: Option<String>,
    pub score: Option<u8>,
    pub has_report: bool,
}

/// Per-identity document collection.
///
/// `count_since` followed by `insert` is not atomic: two concurrent requests
/// for one identity can both observe a count below the limit.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Number of records for `identity` with `timestamp > since`
    async fn count_since(&self, identity: &Identity, since: DateTime<Utc>) -> Result<u64, StoreError>;

    /// Insert a record, returning its id. An id collision within the identity
    /// is resolved by bumping the id one millisecond at a time.
    async fn insert(&self, identity: &Identity, record: AuditRecord) -> Result<String, StoreError>;

    /// Most recent record by timestamp
    async fn latest(&self, identity: &Identity) -> Result<Option<AuditRecord>, StoreError>;

    /// Attach report fields to an existing record
    async fn update(&self, identity: &Identity, id: &str, patch: ReportPatch) -> Result<(), StoreError>;

    /// Records newest first
    async fn list(&self, identity: &Identity, limit: u32) -> Result<Vec<AuditRecord>, StoreError>;

    async fn get(&self, identity: &Identity, id: &str) -> Result<Option<AuditRecord>, StoreError>;
}

/// Attach a rendered report to the record claimed for this request.
///
/// `record_id` is the quota record written by the rate limiter. When it is
/// `None` (the limiter failed open) the report goes to the identity's most
/// recent record, or to a new record if none exists. Never fails: errors are
/// logged and swallowed. Returns the id written, if any.
#[instrument(skip(store, html), fields(identity = %identity))]
pub async fn attach_report(
    store: &dyn AuditStore,
    identity: &Identity,
    record_id: Option<&str>,
    url: &str,
    html: String,
    score: u8,
) -> Option<String> {
    let patch = ReportPatch {
        url: url.to_string(),
        score,
        html,
    };

    let result = match record_id {
        Some(id) => store.update(identity, id, patch).await.map(|()| id.to_string()),
        None => attach_to_latest(store, identity, patch).await,
    };

    match result {
        Ok(id) => {
            info!(record_id = %id, outcome = "ok", "Report attached to audit history");
            Some(id)
        }
        Err(e) => {
            warn!(error = %e, outcome = "failed", "Failed to attach report to audit history");
            None
        }
    }
}

async fn attach_to_latest(
    store: &dyn AuditStore,
    identity: &Identity,
    patch: ReportPatch,
) -> Result<String, StoreError> {
    match store.latest(identity).await? {
        Some(record) => {
            store.update(identity, &record.id, patch).await?;
            Ok(record.id)
        }
        None => {
            let mut record = AuditRecord::placeholder(Utc::now());
            record.url = Some(patch.url);
            record.score = Some(patch.score);
            record.html = Some(patch.html);
            store.insert(identity, record).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_placeholder_id_is_millis() {
        let ts = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let record = AuditRecord::placeholder(ts);
        assert_eq!(record.id, "1700000000123");
        assert!(record.html.is_none());
    }

    #[test]
    fn test_summary_derives_domain() {
        let ts = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let mut record = AuditRecord::placeholder(ts);
        record.url = Some("https://example.com/landing".into());
        record.score = Some(72);
        record.html = Some("<html></html>".into());

        let summary = record.summary();
        assert_eq!(summary.domain.as_deref(), Some("example.com"));
        assert_eq!(summary.date, "2023-11-14");
        assert!(summary.has_report);
    }

    #[tokio::test]
    async fn test_attach_without_claim_updates_latest_record() {
        let store = MemoryAuditStore::new();
        let identity = Identity::from_email("a@b.com");
        let id = store
            .insert(&identity, AuditRecord::placeholder(Utc::now()))
            .await
            .unwrap();

        let attached = attach_report(&store, &identity, None, "https://example.com", "<html/>".into(), 72).await;
        assert_eq!(attached.as_deref(), Some(id.as_str()));

        let records = store.list(&identity, 10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].score, Some(72));
        assert_eq!(records[0].url.as_deref(), Some("https://example.com"));
    }

    #[tokio::test]
    async fn test_attach_creates_record_when_none_exists() {
        let store = MemoryAuditStore::new();
        let identity = Identity::from_email("a@b.com");

        let attached = attach_report(&store, &identity, None, "https://example.com", "<html/>".into(), 40).await;
        assert!(attached.is_some());
        assert_eq!(store.list(&identity, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_attach_swallows_store_failure() {
        let store = MemoryAuditStore::new();
        store.set_failing(true);
        let identity = Identity::from_email("a@b.com");

        let attached = attach_report(&store, &identity, None, "https://example.com", "<html/>".into(), 40).await;
        assert!(attached.is_none());
    }

    #[tokio::test]
    async fn test_attach_targets_claimed_record_not_latest() {
        let store = MemoryAuditStore::new();
        let identity = Identity::from_email("a@b.com");
        let now = Utc::now();
        let first = store.insert(&identity, AuditRecord::placeholder(now)).await.unwrap();
        let second = store.insert(&identity, AuditRecord::placeholder(now)).await.unwrap();

        let attached = attach_report(
            &store,
            &identity,
            Some(&first),
            "https://example.com",
            "<html>first</html>".into(),
            72,
        )
        .await;
        assert_eq!(attached.as_deref(), Some(first.as_str()));

        let first_record = store.get(&identity, &first).await.unwrap().unwrap();
        assert_eq!(first_record.html.as_deref(), Some("<html>first</html>"));
        let second_record = store.get(&identity, &second).await.unwrap().unwrap();
        assert!(second_record.html.is_none());
    }

    #[tokio::test]
    async fn test_attach_to_missing_claim_fails_quietly() {
        let store = MemoryAuditStore::new();
        let identity = Identity::from_email("a@b.com");

        let attached = attach_report(&store, &identity, Some("42"), "https://example.com", "<html/>".into(), 40).await;
        assert!(attached.is_none());
        assert!(store.list(&identity, 10).await.unwrap().is_empty());
    }
}
