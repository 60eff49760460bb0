//! In-process audit store
//!
//! Used by tests and when the server runs with `--database-url memory`.
//! `set_failing(true)` makes every call return [`StoreError::Unavailable`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use audit_core::Identity;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use super::{AuditRecord, AuditStore, ReportPatch, StoreError};

#[derive(Default)]
pub struct MemoryAuditStore {
    records: RwLock<HashMap<Identity, Vec<AuditRecord>>>,
    failing: AtomicBool,
}

impl MemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("memory store set to fail".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    async fn count_since(&self, identity: &Identity, since: DateTime<Utc>) -> Result<u64, StoreError> {
        self.check()?;
        let records = self.records.read().await;
        Ok(records
            .get(identity)
            .map(|r| r.iter().filter(|rec| rec.timestamp > since).count() as u64)
            .unwrap_or(0))
    }

    async fn insert(&self, identity: &Identity, mut record: AuditRecord) -> Result<String, StoreError> {
        self.check()?;
        let mut records = self.records.write().await;
        let entries = records.entry(identity.clone()).or_default();

        while entries.iter().any(|r| r.id == record.id) {
            record.timestamp += Duration::milliseconds(1);
            record.id = record.timestamp.timestamp_millis().to_string();
        }

        let id = record.id.clone();
        entries.push(record);
        Ok(id)
    }

    async fn latest(&self, identity: &Identity) -> Result<Option<AuditRecord>, StoreError> {
        self.check()?;
        let records = self.records.read().await;
        Ok(records
            .get(identity)
            .and_then(|r| r.iter().max_by_key(|rec| rec.timestamp))
            .cloned())
    }

    async fn update(&self, identity: &Identity, id: &str, patch: ReportPatch) -> Result<(), StoreError> {
        self.check()?;
        let mut records = self.records.write().await;
        let record = records
            .get_mut(identity)
            .and_then(|r| r.iter_mut().find(|rec| rec.id == id))
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        record.url = Some(patch.url);
        record.score = Some(patch.score);
        record.html = Some(patch.html);
        Ok(())
    }

    async fn list(&self, identity: &Identity, limit: u32) -> Result<Vec<AuditRecord>, StoreError> {
        self.check()?;
        let records = self.records.read().await;
        let mut list: Vec<AuditRecord> = records.get(identity).cloned().unwrap_or_default();
        list.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        list.truncate(limit as usize);
        Ok(list)
    }

    async fn get(&self, identity: &Identity, id: &str) -> Result<Option<AuditRecord>, StoreError> {
        self.check()?;
        let records = self.records.read().await;
        Ok(records
            .get(identity)
            .and_then(|r| r.iter().find(|rec| rec.id == id))
            .cloned())
    }
}
