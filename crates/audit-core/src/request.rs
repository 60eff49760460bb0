//! Inbound audit requests

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Body of `POST /api/audit`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRequest {
    pub url: String,
    pub email: String,
    /// Newsletter opt-in. Accepted and logged, otherwise inert.
    #[serde(default)]
    pub subscribe: Option<bool>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid email address: {0}")]
    InvalidEmail(String),
}

/// Partition key for rate limiting and report history: the lower-cased email
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn from_email(email: &str) -> Self {
        Self(email.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A request whose URL and email passed validation
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    /// Target URL exactly as submitted (trimmed)
    pub url: String,
    /// Recipient address as submitted (trimmed)
    pub email: String,
    pub identity: Identity,
    pub subscribe: bool,
}

impl AuditRequest {
    /// Check the URL is an absolute http(s) URL and the email is well-formed
    pub fn validate(&self) -> Result<ValidatedRequest, ValidationError> {
        let url = self.url.trim();
        let email = self.email.trim();

        if url.is_empty() {
            return Err(ValidationError::MissingField("url"));
        }
        if email.is_empty() {
            return Err(ValidationError::MissingField("email"));
        }

        let parsed = Url::parse(url).map_err(|_| ValidationError::InvalidUrl(url.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(ValidationError::InvalidUrl(url.to_string()));
        }

        if !email_address::EmailAddress::is_valid(email) {
            return Err(ValidationError::InvalidEmail(email.to_string()));
        }

        Ok(ValidatedRequest {
            url: url.to_string(),
            email: email.to_string(),
            identity: Identity::from_email(email),
            subscribe: self.subscribe.unwrap_or(false),
        })
    }
}
