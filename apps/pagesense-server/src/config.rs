//! Command-line / environment configuration
//!
//! Every flag can also be supplied through the environment (and therefore a
//! `.env` file). [`Args`] is split into one typed config per component so
//! each collaborator only sees its own settings.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use audit_core::ReportOptions;
use clap::Parser;

/// Command-line arguments for the PageSense server
#[derive(Parser, Debug, Clone)]
#[command(name = "pagesense-server")]
#[command(about = "Landing-page audit server: AI analysis, PDF report, email delivery")]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "3000")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Per-IP request rate (requests per second)
    #[arg(long, env = "IP_RATE_LIMIT", default_value = "5")]
    pub ip_rate_limit: u32,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,

    /// Audit history database; "memory" keeps records in-process only
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://pagesense.db?mode=rwc")]
    pub database_url: String,

    /// Audits allowed per identity inside the window
    #[arg(long, env = "AUDIT_LIMIT", default_value = "3")]
    pub audit_limit: u32,

    /// Rate-limit window in hours
    #[arg(long, env = "AUDIT_WINDOW_HOURS", default_value = "24")]
    pub audit_window_hours: i64,

    /// Admit requests when the audit store is unavailable
    #[arg(long, env = "RATE_LIMIT_FAIL_OPEN", default_value_t = true, action = clap::ArgAction::Set)]
    pub fail_open: bool,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY", default_value = "", hide_env_values = true)]
    pub openai_api_key: String,

    /// Chat model identifier
    #[arg(long, env = "OPENAI_MODEL", default_value = "gpt-4o-mini-search-preview")]
    pub openai_model: String,

    /// OpenAI-compatible API base URL
    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com/v1")]
    pub openai_base_url: String,

    /// Brevo API key
    #[arg(long, env = "BREVO_API_KEY", default_value = "", hide_env_values = true)]
    pub brevo_api_key: String,

    /// Brevo API base URL
    #[arg(long, env = "BREVO_BASE_URL", default_value = "https://api.brevo.com/v3")]
    pub brevo_base_url: String,

    /// Sender display name
    #[arg(long, env = "EMAIL_SENDER_NAME", default_value = "PageSense")]
    pub sender_name: String,

    /// Sender address
    #[arg(long, env = "EMAIL_SENDER_ADDRESS", default_value = "info@pagesense.co")]
    pub sender_email: String,

    /// Public base URL of the site (logo is served from here)
    #[arg(long, env = "SITE_BASE_URL", default_value = "http://localhost:3000")]
    pub site_base_url: String,

    /// Call-to-action link at the end of each report
    #[arg(long, env = "REPORT_CTA_URL", default_value = "https://pagesense.co/templates")]
    pub cta_url: String,

    /// Chart-rendering service endpoint
    #[arg(long, env = "CHART_BASE_URL", default_value = "https://quickchart.io/chart")]
    pub chart_base_url: String,

    /// Chrome / Chromium executable (auto-detected when unset)
    #[arg(long, env = "CHROME_PATH")]
    pub chrome_path: Option<PathBuf>,

    /// Upper bound for each page step (open, load, image wait, print), in milliseconds
    #[arg(long, env = "PDF_TIMEOUT_MS", default_value = "30000")]
    pub pdf_timeout_ms: u64,
}

/// Per-identity quota settings
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: chrono::Duration,
    pub fail_open: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 3,
            window: chrono::Duration::hours(24),
            fail_open: true,
        }
    }
}

/// Language-model client settings
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

/// Email provider settings
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub api_key: String,
    pub base_url: String,
    pub sender_name: String,
    pub sender_email: String,
}

/// Headless browser settings
#[derive(Debug, Clone)]
pub struct RendererConfig {
    pub chrome_path: Option<PathBuf>,
    pub timeout: Duration,
}

impl Args {
    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }

    pub fn rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig {
            max_requests: self.audit_limit,
            window: chrono::Duration::hours(self.audit_window_hours),
            fail_open: self.fail_open,
        }
    }

    pub fn analyzer(&self) -> AnalyzerConfig {
        AnalyzerConfig {
            api_key: self.openai_api_key.clone(),
            model: self.openai_model.clone(),
            base_url: self.openai_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn email(&self) -> EmailConfig {
        EmailConfig {
            api_key: self.brevo_api_key.clone(),
            base_url: self.brevo_base_url.trim_end_matches('/').to_string(),
            sender_name: self.sender_name.clone(),
            sender_email: self.sender_email.clone(),
        }
    }

    pub fn report(&self) -> ReportOptions {
        ReportOptions {
            logo_url: format!("{}/BOW-Big.png", self.site_base_url.trim_end_matches('/')),
            cta_url: self.cta_url.clone(),
            chart_base_url: self.chart_base_url.clone(),
        }
    }

    pub fn renderer(&self) -> RendererConfig {
        RendererConfig {
            chrome_path: self.chrome_path.clone(),
            timeout: Duration::from_millis(self.pdf_timeout_ms),
        }
    }
}
