//! Application state for the PageSense server

use std::sync::Arc;

use anyhow::Result;
use audit_core::ReportOptions;
use tracing::{info, warn};

use crate::analyzer::{Analyzer, OpenAiAnalyzer};
use crate::config::{Args, RateLimitConfig};
use crate::notify::{BrevoNotifier, Notifier};
use crate::pdf::{ChromePdfRasterizer, PdfRasterizer};
use crate::pipeline::AuditPipeline;
use crate::rate_limit::RateLimiter;
use crate::renderer::ReportRenderer;
use crate::store::{AuditStore, MemoryAuditStore, SqliteAuditStore};

/// Database URL that selects the in-process store
pub const MEMORY_STORE: &str = "memory";

pub struct AppState {
    pub pipeline: AuditPipeline,
    pub store: Option<Arc<dyn AuditStore>>,
}

/// External collaborators, swappable for tests
pub struct Services {
    pub store: Option<Arc<dyn AuditStore>>,
    pub analyzer: Arc<dyn Analyzer>,
    pub rasterizer: Arc<dyn PdfRasterizer>,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub fn with_services(services: Services, limits: RateLimitConfig, report: ReportOptions) -> Self {
        let limiter = RateLimiter::new(services.store.clone(), limits);
        let renderer = ReportRenderer::new(services.rasterizer, services.store.clone(), report);
        let pipeline = AuditPipeline::new(limiter, services.analyzer, renderer, services.notifier);

        Self {
            pipeline,
            store: services.store,
        }
    }

    /// Build production state from command-line / environment settings
    pub async fn from_args(args: &Args) -> Result<Self> {
        let store = open_store(&args.database_url).await;

        if args.openai_api_key.is_empty() {
            warn!("OPENAI_API_KEY is not set; analysis requests will fail");
        }
        if args.brevo_api_key.is_empty() {
            warn!("BREVO_API_KEY is not set; report emails will fail");
        }

        let services = Services {
            store,
            analyzer: Arc::new(OpenAiAnalyzer::new(args.analyzer())),
            rasterizer: Arc::new(ChromePdfRasterizer::new(args.renderer())),
            notifier: Arc::new(BrevoNotifier::new(args.email())),
        };

        Ok(Self::with_services(services, args.rate_limit(), args.report()))
    }
}

/// Open the configured store. A store that cannot be opened is left out and
/// the rate limiter's fail-open policy decides what happens to requests.
async fn open_store(database_url: &str) -> Option<Arc<dyn AuditStore>> {
    if database_url == MEMORY_STORE {
        info!("Using in-process audit store");
        return Some(Arc::new(MemoryAuditStore::new()));
    }

    match SqliteAuditStore::connect(database_url).await {
        Ok(store) => Some(Arc::new(store)),
        Err(e) => {
            warn!(error = %e, "Audit store unavailable; continuing without history");
            None
        }
    }
}
