//! Report delivery by email (Brevo transactional API)
//!
//! The message body is the report HTML itself; the subject names the audited
//! domain.

use async_trait::async_trait;
use audit_core::display_domain;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::config::EmailConfig;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Email request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Email provider returned {status}: {message}")]
    Provider { status: u16, message: String },
}

/// Delivers a finished report to the requester
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, to: &str, html: &str, url: &str) -> Result<(), NotifyError>;
}

/// Subject line for a report email
pub fn subject_for(url: &str) -> String {
    format!("🚀 Your {} audit is ready!", display_domain(url))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BrevoPayload<'a> {
    sender: BrevoContact<'a>,
    to: [BrevoRecipient<'a>; 1],
    subject: String,
    html_content: &'a str,
}

#[derive(Debug, Serialize)]
struct BrevoContact<'a> {
    name: &'a str,
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct BrevoRecipient<'a> {
    email: &'a str,
}

#[derive(Debug, Deserialize)]
struct BrevoErrorResponse {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

pub struct BrevoNotifier {
    client: reqwest::Client,
    config: EmailConfig,
}

impl BrevoNotifier {
    pub fn new(config: EmailConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn payload<'a>(&'a self, to: &'a str, html: &'a str, url: &str) -> BrevoPayload<'a> {
        BrevoPayload {
            sender: BrevoContact {
                name: &self.config.sender_name,
                email: &self.config.sender_email,
            },
            to: [BrevoRecipient { email: to }],
            subject: subject_for(url),
            html_content: html,
        }
    }
}

fn provider_message(status: u16, body: &str) -> String {
    match serde_json::from_str::<BrevoErrorResponse>(body) {
        Ok(err) => err
            .message
            .or(err.code)
            .unwrap_or_else(|| format!("HTTP {}", status)),
        Err(_) if body.is_empty() => format!("HTTP {}", status),
        Err(_) => format!("HTTP {}: {}", status, body),
    }
}

#[async_trait]
impl Notifier for BrevoNotifier {
    #[instrument(skip(self, html))]
    async fn send(&self, to: &str, html: &str, url: &str) -> Result<(), NotifyError> {
        let payload = self.payload(to, html, url);

        let response = self
            .client
            .post(format!("{}/smtp/email", self.config.base_url))
            .header("api-key", &self.config.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            info!(status = status.as_u16(), "Report email accepted");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let message = provider_message(status.as_u16(), &body);
        warn!(status = status.as_u16(), error = %message, "Email provider rejected message");

        Err(NotifyError::Provider {
            status: status.as_u16(),
            message,
        })
    }
}
