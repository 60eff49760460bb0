//! PageSense Server
//!
//! Audits a landing page with a language model, renders the findings as an
//! HTML report and a PDF, stores the report in the requester's history, and
//! emails it to them.
//!
//! ## Architecture
//!
//! ```text
//! POST /api/audit
//!   -> RateLimiter   (per-email quota, records the request)
//!   -> Analyzer      (chat completion -> AuditResult)
//!   -> ReportRenderer (HTML report; history write + PDF export)
//!   -> Notifier      (detached email delivery)
//!   -> application/pdf response
//! ```
//!
//! Every external service sits behind a trait so the pipeline can be driven
//! end to end without network access.

pub mod analyzer;
pub mod api;
pub mod config;
pub mod error;
pub mod notify;
pub mod pdf;
pub mod pipeline;
pub mod rate_limit;
pub mod renderer;
pub mod state;
pub mod store;

#[cfg(test)]
mod tests;

pub use api::router;
pub use config::Args;
pub use error::ApiError;
pub use state::{AppState, Services};
