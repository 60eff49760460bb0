//! Audit pipeline
//!
//! `RateCheck -> Analyze -> Render -> Notify -> Respond`, strictly in order.
//! A denied rate check ends the run as `Rejected`; an analysis or render error
//! ends it as `Failed`. Notification never fails the run: delivery happens in
//! a detached task that only logs its outcome.

use std::fmt;
use std::sync::Arc;

use audit_core::{Report, ValidatedRequest};
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use crate::analyzer::Analyzer;
use crate::error::ApiError;
use crate::notify::Notifier;
use crate::rate_limit::{RateDecision, RateLimiter};
use crate::renderer::ReportRenderer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    RateCheck,
    Analyze,
    Render,
    Notify,
    Respond,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::RateCheck => "rate_check",
            Stage::Analyze => "analyze",
            Stage::Render => "render",
            Stage::Notify => "notify",
            Stage::Respond => "respond",
        };
        f.write_str(name)
    }
}

/// Background work started by a successful run
pub struct SideEffects {
    /// Resolves to the history record the report was attached to
    pub history: Option<JoinHandle<Option<String>>>,
    /// Resolves to whether the email was accepted
    pub delivery: JoinHandle<bool>,
}

impl SideEffects {
    /// Wait for both tasks. A panicked task counts as failed.
    pub async fn settle(self) -> (Option<String>, bool) {
        let history = match self.history {
            Some(handle) => handle.await.ok().flatten(),
            None => None,
        };
        let delivered = self.delivery.await.unwrap_or(false);
        (history, delivered)
    }
}

/// Result of a successful run
pub struct AuditOutcome {
    pub pdf: Vec<u8>,
    pub report: Report,
    /// Quota record claimed during the rate check (absent when failed open)
    pub record_id: Option<String>,
    pub side_effects: SideEffects,
}

pub struct AuditPipeline {
    limiter: RateLimiter,
    analyzer: Arc<dyn Analyzer>,
    renderer: ReportRenderer,
    notifier: Arc<dyn Notifier>,
}

impl AuditPipeline {
    pub fn new(
        limiter: RateLimiter,
        analyzer: Arc<dyn Analyzer>,
        renderer: ReportRenderer,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            limiter,
            analyzer,
            renderer,
            notifier,
        }
    }

    #[instrument(skip(self, request), fields(identity = %request.identity, url = %request.url))]
    pub async fn run(&self, request: ValidatedRequest) -> Result<AuditOutcome, ApiError> {
        if request.subscribe {
            info!("Requester opted into updates");
        }

        info!(stage = %Stage::RateCheck, "Checking audit quota");
        let record_id = match self.limiter.check_and_register(&request.identity).await? {
            RateDecision::Allowed { record_id } => record_id,
            RateDecision::Denied { recent } => {
                info!(stage = %Stage::RateCheck, recent, "Request rejected");
                return Err(ApiError::RateLimited);
            }
        };

        info!(stage = %Stage::Analyze, "Analyzing landing page");
        let result = self.analyzer.analyze(&request.url).await.map_err(|e| {
            warn!(stage = %Stage::Analyze, error = %e, "Audit failed");
            ApiError::from(e)
        })?;

        info!(stage = %Stage::Render, "Rendering report");
        let rendered = self
            .renderer
            .render(&request.identity, record_id.as_deref(), &request.url, &result)
            .await
            .map_err(|e| {
                warn!(stage = %Stage::Render, error = %e, "Audit failed");
                ApiError::from(e)
            })?;

        info!(stage = %Stage::Notify, "Dispatching report email");
        let delivery = spawn_delivery(
            self.notifier.clone(),
            request.email.clone(),
            rendered.report.html.clone(),
            request.url.clone(),
        );

        info!(
            stage = %Stage::Respond,
            bytes = rendered.pdf.len(),
            score = rendered.report.score,
            "Audit complete"
        );

        Ok(AuditOutcome {
            pdf: rendered.pdf,
            report: rendered.report,
            record_id,
            side_effects: SideEffects {
                history: rendered.history,
                delivery,
            },
        })
    }
}

fn spawn_delivery(notifier: Arc<dyn Notifier>, to: String, html: String, url: String) -> JoinHandle<bool> {
    tokio::spawn(async move {
        match notifier.send(&to, &html, &url).await {
            Ok(()) => {
                info!(to = %to, outcome = "ok", "Report email sent");
                true
            }
            Err(e) => {
                warn!(to = %to, error = %e, outcome = "failed", "Report email failed");
                false
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        let names: Vec<String> = [
            Stage::RateCheck,
            Stage::Analyze,
            Stage::Render,
            Stage::Notify,
            Stage::Respond,
        ]
        .iter()
        .map(ToString::to_string)
        .collect();
        assert_eq!(names, ["rate_check", "analyze", "render", "notify", "respond"]);
    }
}
