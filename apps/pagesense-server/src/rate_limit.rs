//! Per-identity audit quota
//!
//! An identity may start at most `max_requests` audits inside a rolling
//! window. Each admitted request is recorded in the audit store immediately,
//! and that record later receives the finished report.
//!
//! When the store is missing or errors, the `fail_open` policy decides:
//! admit without recording (the default) or refuse with
//! [`RateLimitError::Unavailable`].

use std::sync::Arc;

use audit_core::Identity;
use chrono::Utc;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::config::RateLimitConfig;
use crate::store::{AuditRecord, AuditStore, StoreError};

/// Outcome of a quota check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateDecision {
    /// Admitted. `record_id` is the quota record just written, or `None`
    /// when the limiter failed open.
    Allowed { record_id: Option<String> },
    /// Refused; nothing was written
    Denied { recent: u64 },
}

#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("Audit store unavailable: {0}")]
    Unavailable(String),
}

pub struct RateLimiter {
    store: Option<Arc<dyn AuditStore>>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(store: Option<Arc<dyn AuditStore>>, config: RateLimitConfig) -> Self {
        Self { store, config }
    }

    /// Count recent records for `identity`; deny at the limit, otherwise
    /// record this request and admit it.
    #[instrument(skip(self), fields(identity = %identity))]
    pub async fn check_and_register(&self, identity: &Identity) -> Result<RateDecision, RateLimitError> {
        let Some(store) = &self.store else {
            return self.on_store_failure("audit store not initialized".to_string());
        };

        match self.try_register(store.as_ref(), identity).await {
            Ok(decision) => Ok(decision),
            Err(e) => self.on_store_failure(e.to_string()),
        }
    }

    async fn try_register(&self, store: &dyn AuditStore, identity: &Identity) -> Result<RateDecision, StoreError> {
        let now = Utc::now();
        let since = now - self.config.window;

        let recent = store.count_since(identity, since).await?;
        info!(recent, limit = self.config.max_requests, "Audits inside rate-limit window");

        if recent >= u64::from(self.config.max_requests) {
            info!("Rate limit exceeded");
            return Ok(RateDecision::Denied { recent });
        }

        let record_id = store.insert(identity, AuditRecord::placeholder(now)).await?;
        info!(record_id = %record_id, "Audit request logged");

        Ok(RateDecision::Allowed {
            record_id: Some(record_id),
        })
    }

    fn on_store_failure(&self, reason: String) -> Result<RateDecision, RateLimitError> {
        if self.config.fail_open {
            warn!(error = %reason, "Rate limit check failed, allowing request (fail-open)");
            Ok(RateDecision::Allowed { record_id: None })
        } else {
            warn!(error = %reason, "Rate limit check failed, refusing request (fail-closed)");
            Err(RateLimitError::Unavailable(reason))
        }
    }
}
