//! Audit Core - shared model and templating for PageSense audits
//!
//! Everything in this crate is pure: no network, no browser, no database.
//! The server crate wires these pieces to the outside world.
//!
//! - [`model`] - audit result types returned by the language model
//! - [`request`] - inbound audit request validation and identity keys
//! - [`domain`] - display-domain derivation for titles and subjects
//! - [`prompt`] - system/user instructions sent to the model
//! - [`parse`] - strict parsing of the model's JSON reply
//! - [`chart`] - chart-image URLs for the external chart service
//! - [`report`] - HTML report assembly
//! - [`view`] - responsive wrapping of stored reports for embedding

pub mod chart;
pub mod domain;
pub mod model;
pub mod parse;
pub mod prompt;
pub mod report;
pub mod request;
pub mod view;

pub use chart::{donut_chart_url, polar_chart_url, ChartUrls};
pub use domain::display_domain;
pub use model::{
    AuditResult, Blocker, Category, CategoryScores, Priority, DEFAULT_CATEGORY_SCORE,
};
pub use parse::{parse_audit_response, ParseError};
pub use report::{render_report, Report, ReportOptions};
pub use request::{AuditRequest, Identity, ValidatedRequest, ValidationError};
pub use view::responsive_view;
