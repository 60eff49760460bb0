//! Landing-page analysis via an OpenAI-compatible chat completions API
//!
//! One call per audit, no retries. The reply content must be the bare JSON
//! document described by [`audit_core::prompt::RESPONSE_SCHEMA`].

use async_trait::async_trait;
use audit_core::prompt::{user_prompt, SYSTEM_PROMPT};
use audit_core::{parse_audit_response, AuditResult, ParseError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::config::AnalyzerConfig;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Model request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Model API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Model reply had no content")]
    EmptyReply,

    #[error("Model reply was not a valid audit: {0}")]
    Parse(#[from] ParseError),
}

/// Produces an [`AuditResult`] for a landing page
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, url: &str) -> Result<AuditResult, AnalysisError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiAnalyzer {
    client: reqwest::Client,
    config: AnalyzerConfig,
}

impl OpenAiAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }
}

#[async_trait]
impl Analyzer for OpenAiAnalyzer {
    #[instrument(skip(self), fields(model = %self.config.model))]
    async fn analyze(&self, url: &str) -> Result<AuditResult, AnalysisError> {
        let prompt = user_prompt(url);
        let body = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
        };

        info!("Requesting landing page analysis");

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Model API error");
            return Err(AnalysisError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let reply: ChatResponse = response.json().await?;
        let content = reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(AnalysisError::EmptyReply)?;

        let result = parse_audit_response(&content)?;
        info!(
            score = result.rounded_score(),
            blockers = result.blockers.len(),
            "Analysis parsed"
        );
        Ok(result)
    }
}
