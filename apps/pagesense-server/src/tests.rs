//! Pipeline and HTTP tests with in-process fakes for every external service

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use audit_core::{parse_audit_response, AuditResult, ReportOptions};

use crate::analyzer::{AnalysisError, Analyzer};
use crate::config::RateLimitConfig;
use crate::notify::{subject_for, NotifyError, Notifier};
use crate::pdf::{PdfRasterizer, RenderError};
use crate::state::{AppState, Services};
use crate::store::{AuditStore, MemoryAuditStore};

const EXAMPLE_REPLY: &str = r#"{
    "overallScore": 72,
    "categoryScores": { "Content": 65, "Technical": 80, "UXDesign": 70, "Performance": 75 },
    "blockers": [
        {
            "issue": "Weak headline",
            "priority": "Critical",
            "category": "Content",
            "suggestions": ["State the outcome", "Name the audience", "Cut the jargon"]
        },
        {
            "issue": "Slow hero image",
            "priority": "Medium",
            "category": "Performance",
            "suggestions": ["Compress it", "Lazy-load below the fold", "Serve WebP"]
        }
    ],
    "recommendations": ["Add social proof", "Shorten the form", "Clarify pricing"]
}"#;

struct FakeAnalyzer {
    reply: String,
    calls: AtomicUsize,
}

impl FakeAnalyzer {
    fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Analyzer for FakeAnalyzer {
    async fn analyze(&self, _url: &str) -> Result<AuditResult, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(parse_audit_response(&self.reply)?)
    }
}

#[derive(Default)]
struct FakeRasterizer {
    calls: AtomicUsize,
    fail: AtomicBool,
}

#[async_trait]
impl PdfRasterizer for FakeRasterizer {
    async fn rasterize(&self, html: &str) -> Result<Vec<u8>, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(RenderError::Launch("browser missing".into()));
        }
        Ok(format!("%PDF-1.4 {}", html.len()).into_bytes())
    }
}

#[derive(Default)]
struct FakeNotifier {
    sent: Mutex<Vec<(String, String)>>,
    fail: AtomicBool,
}

impl FakeNotifier {
    fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn send(&self, to: &str, _html: &str, url: &str) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push((to.to_string(), subject_for(url)));
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Provider {
                status: 401,
                message: "unauthorized".into(),
            });
        }
        Ok(())
    }
}

struct Harness {
    store: Arc<MemoryAuditStore>,
    analyzer: Arc<FakeAnalyzer>,
    rasterizer: Arc<FakeRasterizer>,
    notifier: Arc<FakeNotifier>,
}

impl Harness {
    fn new(reply: &str) -> Self {
        Self {
            store: Arc::new(MemoryAuditStore::new()),
            analyzer: FakeAnalyzer::replying(reply),
            rasterizer: Arc::new(FakeRasterizer::default()),
            notifier: Arc::new(FakeNotifier::default()),
        }
    }

    fn state(&self, limits: RateLimitConfig) -> Arc<AppState> {
        let store: Arc<dyn AuditStore> = self.store.clone();
        let services = Services {
            store: Some(store),
            analyzer: self.analyzer.clone(),
            rasterizer: self.rasterizer.clone(),
            notifier: self.notifier.clone(),
        };
        Arc::new(AppState::with_services(services, limits, ReportOptions::default()))
    }

    fn analyzer_calls(&self) -> usize {
        self.analyzer.calls.load(Ordering::SeqCst)
    }

    fn rasterizer_calls(&self) -> usize {
        self.rasterizer.calls.load(Ordering::SeqCst)
    }
}

/// Poll until `check` holds; detached tasks finish on their own schedule
async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

mod pipeline_tests {
    use super::*;
    use audit_core::{AuditRequest, Identity};

    use crate::error::ApiError;

    fn request(email: &str) -> audit_core::ValidatedRequest {
        AuditRequest {
            url: "https://example.com".into(),
            email: email.into(),
            subscribe: None,
        }
        .validate()
        .unwrap()
    }

    #[tokio::test]
    async fn test_successful_run_settles_side_effects() {
        let harness = Harness::new(EXAMPLE_REPLY);
        let state = harness.state(RateLimitConfig::default());

        let outcome = state.pipeline.run(request("a@b.com")).await.unwrap();
        assert!(outcome.pdf.starts_with(b"%PDF"));
        assert_eq!(outcome.report.score, 72);

        let record_id = outcome.record_id.clone();
        let (history, delivered) = outcome.side_effects.settle().await;
        assert!(delivered);
        assert_eq!(history, record_id);

        let identity = Identity::from_email("a@b.com");
        let records = harness.store.list(&identity, 10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].score, Some(72));
    }

    #[tokio::test]
    async fn test_unparsable_analysis_short_circuits() {
        let harness = Harness::new("I'm sorry, I can't browse that page.");
        let state = harness.state(RateLimitConfig::default());

        let result = state.pipeline.run(request("a@b.com")).await;
        assert!(matches!(result, Err(ApiError::Analysis(_))));

        assert_eq!(harness.rasterizer_calls(), 0);
        assert!(harness.notifier.sent().is_empty());

        // Only the quota record exists; no report was attached
        let records = harness
            .store
            .list(&Identity::from_email("a@b.com"), 10)
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].html.is_none());
    }

    #[tokio::test]
    async fn test_render_failure_sends_nothing() {
        let harness = Harness::new(EXAMPLE_REPLY);
        harness.rasterizer.fail.store(true, Ordering::SeqCst);
        let state = harness.state(RateLimitConfig::default());

        let result = state.pipeline.run(request("a@b.com")).await;
        assert!(matches!(result, Err(ApiError::Render(_))));
        assert!(harness.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_fail_closed_refuses_when_store_down() {
        let harness = Harness::new(EXAMPLE_REPLY);
        harness.store.set_failing(true);
        let state = harness.state(RateLimitConfig {
            fail_open: false,
            ..RateLimitConfig::default()
        });

        let result = state.pipeline.run(request("a@b.com")).await;
        assert!(matches!(result, Err(ApiError::Unavailable(_))));
        assert_eq!(harness.analyzer_calls(), 0);
    }
}

mod http_endpoint_tests {
    //! HTTP endpoint integration tests using axum-test

    use super::*;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use audit_core::Identity;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use crate::api::router;
    use crate::store::AuditRecord;

    fn create_test_server(harness: &Harness, limits: RateLimitConfig) -> TestServer {
        TestServer::new(router(harness.state(limits))).unwrap()
    }

    fn audit_body(email: &str) -> serde_json::Value {
        json!({ "url": "https://example.com", "email": email })
    }

    #[tokio::test]
    async fn test_health_returns_200() {
        let harness = Harness::new(EXAMPLE_REPLY);
        let server = create_test_server(&harness, RateLimitConfig::default());

        let response = server.get("/health").await;
        response.assert_status_ok();

        let json = response.json::<serde_json::Value>();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["service"], "pagesense-server");
    }

    #[tokio::test]
    async fn test_example_audit_end_to_end() {
        let harness = Harness::new(EXAMPLE_REPLY);
        let server = create_test_server(&harness, RateLimitConfig::default());

        let response = server.post("/api/audit").json(&audit_body("a@b.com")).await;
        response.assert_status_ok();
        assert_eq!(response.header("content-type"), "application/pdf");
        assert_eq!(
            response.header("content-disposition"),
            "attachment; filename=audit.pdf"
        );
        assert!(response.as_bytes().starts_with(b"%PDF"));

        let notifier = harness.notifier.clone();
        assert!(eventually(|| { let n = notifier.clone(); async move { n.sent().len() == 1 } }).await);
        assert_eq!(
            harness.notifier.sent()[0],
            ("a@b.com".to_string(), "🚀 Your example.com audit is ready!".to_string())
        );

        let store = harness.store.clone();
        let identity = Identity::from_email("a@b.com");
        assert!(
            eventually(|| {
                let store = store.clone();
                let identity = identity.clone();
                async move {
                    store
                        .latest(&identity)
                        .await
                        .ok()
                        .flatten()
                        .is_some_and(|r| r.score == Some(72))
                }
            })
            .await
        );

        let record = harness.store.latest(&identity).await.unwrap().unwrap();
        let html = record.html.unwrap();
        assert!(html.contains("PageSense Audit for example.com"));
        assert!(html.contains("72/100"));
        assert!(html.contains("Critical Priority (1)"));
        assert!(html.contains("Weak headline"));
    }

    #[tokio::test]
    async fn test_fourth_request_is_rate_limited() {
        let harness = Harness::new(EXAMPLE_REPLY);
        let identity = Identity::from_email("a@b.com");
        for minutes in [30, 20, 10] {
            harness
                .store
                .insert(
                    &identity,
                    AuditRecord::placeholder(Utc::now() - chrono::Duration::minutes(minutes)),
                )
                .await
                .unwrap();
        }
        let server = create_test_server(&harness, RateLimitConfig::default());

        let response = server.post("/api/audit").json(&audit_body("A@B.com")).await;
        response.assert_status(StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.json::<serde_json::Value>(),
            json!({ "error": "Rate limit exceeded" })
        );

        assert_eq!(harness.store.list(&identity, 10).await.unwrap().len(), 3);
        assert_eq!(harness.analyzer_calls(), 0);
        assert_eq!(harness.rasterizer_calls(), 0);
        assert!(harness.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_allowed_request_writes_one_record() {
        let harness = Harness::new(EXAMPLE_REPLY);
        let server = create_test_server(&harness, RateLimitConfig::default());

        server
            .post("/api/audit")
            .json(&audit_body("a@b.com"))
            .await
            .assert_status_ok();

        let store = harness.store.clone();
        let identity = Identity::from_email("a@b.com");
        assert!(
            eventually(|| {
                let store = store.clone();
                let identity = identity.clone();
                async move {
                    store
                        .latest(&identity)
                        .await
                        .ok()
                        .flatten()
                        .is_some_and(|r| r.html.is_some())
                }
            })
            .await
        );
        assert_eq!(harness.store.list(&identity, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unparsable_analysis_returns_500() {
        let harness = Harness::new("not json at all");
        let server = create_test_server(&harness, RateLimitConfig::default());

        let response = server.post("/api/audit").json(&audit_body("a@b.com")).await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.json::<serde_json::Value>()["error"].is_string());
        assert_eq!(harness.rasterizer_calls(), 0);
        assert!(harness.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_email_failure_still_returns_pdf() {
        let harness = Harness::new(EXAMPLE_REPLY);
        harness.notifier.fail.store(true, Ordering::SeqCst);
        let server = create_test_server(&harness, RateLimitConfig::default());

        let response = server.post("/api/audit").json(&audit_body("a@b.com")).await;
        response.assert_status_ok();
        assert!(response.as_bytes().starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn test_store_outage_fails_open_by_default() {
        let harness = Harness::new(EXAMPLE_REPLY);
        harness.store.set_failing(true);
        let server = create_test_server(&harness, RateLimitConfig::default());

        let response = server.post("/api/audit").json(&audit_body("a@b.com")).await;
        response.assert_status_ok();
        assert_eq!(harness.analyzer_calls(), 1);
    }

    #[tokio::test]
    async fn test_store_outage_fail_closed_returns_503() {
        let harness = Harness::new(EXAMPLE_REPLY);
        harness.store.set_failing(true);
        let server = create_test_server(
            &harness,
            RateLimitConfig {
                fail_open: false,
                ..RateLimitConfig::default()
            },
        );

        let response = server.post("/api/audit").json(&audit_body("a@b.com")).await;
        response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_get_on_audit_is_405() {
        let harness = Harness::new(EXAMPLE_REPLY);
        let server = create_test_server(&harness, RateLimitConfig::default());

        let response = server.get("/api/audit").await;
        response.assert_status(StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            response.json::<serde_json::Value>(),
            json!({ "error": "Method not allowed" })
        );
    }

    #[tokio::test]
    async fn test_invalid_input_rejected_before_rate_check() {
        let harness = Harness::new(EXAMPLE_REPLY);
        let server = create_test_server(&harness, RateLimitConfig::default());

        for body in [
            json!({ "url": "not a url", "email": "a@b.com" }),
            json!({ "url": "https://example.com", "email": "nope" }),
            json!({ "url": "https://example.com" }),
        ] {
            server
                .post("/api/audit")
                .json(&body)
                .await
                .assert_status(StatusCode::BAD_REQUEST);
        }

        assert!(harness
            .store
            .list(&Identity::from_email("a@b.com"), 10)
            .await
            .unwrap()
            .is_empty());
        assert_eq!(harness.analyzer_calls(), 0);
    }

    #[tokio::test]
    async fn test_history_list_and_report_view() {
        let harness = Harness::new(EXAMPLE_REPLY);
        let server = create_test_server(&harness, RateLimitConfig::default());

        server
            .post("/api/audit")
            .json(&audit_body("a@b.com"))
            .await
            .assert_status_ok();

        let store = harness.store.clone();
        let identity = Identity::from_email("a@b.com");
        assert!(
            eventually(|| {
                let store = store.clone();
                let identity = identity.clone();
                async move {
                    store
                        .latest(&identity)
                        .await
                        .ok()
                        .flatten()
                        .is_some_and(|r| r.html.is_some())
                }
            })
            .await
        );

        let response = server
            .get("/api/audits")
            .add_query_param("email", "A@B.com")
            .await;
        response.assert_status_ok();
        let json = response.json::<serde_json::Value>();
        assert_eq!(json["count"], 1);
        assert_eq!(json["audits"][0]["domain"], "example.com");
        assert_eq!(json["audits"][0]["score"], 72);

        let id = json["audits"][0]["id"].as_str().unwrap().to_string();
        let response = server.get(&format!("/api/audits/a@b.com/{}", id)).await;
        response.assert_status_ok();
        let html = response.text();
        assert!(html.contains("name=\"viewport\""));
        assert!(html.contains("Weak headline"));

        server
            .get("/api/audits/a@b.com/0")
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_history_query_errors_use_json_envelope() {
        let harness = Harness::new(EXAMPLE_REPLY);
        let server = create_test_server(&harness, RateLimitConfig::default());

        for response in [
            server.get("/api/audits").await,
            server
                .get("/api/audits")
                .add_query_param("email", "a@b.com")
                .add_query_param("limit", "many")
                .await,
        ] {
            response.assert_status(StatusCode::BAD_REQUEST);
            let json = response.json::<serde_json::Value>();
            assert!(json["error"].is_string(), "expected JSON error body, got {}", json);
        }
    }
}
