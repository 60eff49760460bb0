//! Report rendering stage
//!
//! Builds the HTML report, hands a copy to the audit history in a detached
//! task, then rasterizes the HTML to PDF. The history copy lands on the quota
//! record claimed for the request when there is one.

use std::sync::Arc;

use audit_core::{render_report, AuditResult, Identity, Report, ReportOptions};
use tokio::task::JoinHandle;
use tracing::{info, instrument};

use crate::pdf::{PdfRasterizer, RenderError};
use crate::store::{attach_report, AuditStore};

/// A finished report
pub struct RenderedReport {
    pub pdf: Vec<u8>,
    pub report: Report,
    /// History write started for this report; resolves to the record id
    pub history: Option<JoinHandle<Option<String>>>,
}

pub struct ReportRenderer {
    rasterizer: Arc<dyn PdfRasterizer>,
    store: Option<Arc<dyn AuditStore>>,
    options: ReportOptions,
}

impl ReportRenderer {
    pub fn new(
        rasterizer: Arc<dyn PdfRasterizer>,
        store: Option<Arc<dyn AuditStore>>,
        options: ReportOptions,
    ) -> Self {
        Self {
            rasterizer,
            store,
            options,
        }
    }

    #[instrument(skip(self, result), fields(identity = %identity))]
    pub async fn render(
        &self,
        identity: &Identity,
        record_id: Option<&str>,
        url: &str,
        result: &AuditResult,
    ) -> Result<RenderedReport, RenderError> {
        let report = render_report(url, result, &self.options);
        info!(domain = %report.domain, score = report.score, "Report HTML built");

        // History is best-effort and must not delay or fail the export
        let history = self.store.clone().map(|store| {
            let identity = identity.clone();
            let record_id = record_id.map(str::to_string);
            let url = url.to_string();
            let html = report.html.clone();
            let score = report.score;
            tokio::spawn(async move {
                attach_report(store.as_ref(), &identity, record_id.as_deref(), &url, html, score).await
            })
        });

        let pdf = self.rasterizer.rasterize(&report.html).await?;

        Ok(RenderedReport { pdf, report, history })
    }
}
