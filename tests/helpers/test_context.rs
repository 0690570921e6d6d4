//! Test context for unified test setup
//!
//! Builds the full router over the in-memory store, with Ticketmaster and
//! Google served by wiremock and uploads written to a temporary directory.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::MockServer;
use eventhub::config::{GoogleConfig, Settings};
use eventhub::{router, AppState, DatabaseService, ServiceFactory};

use super::test_data::{signup_body, MultipartForm};

/// Test configuration options
#[derive(Debug, Clone)]
pub struct TestConfig {
    pub google_calendar: bool,
    pub login_attempts_per_minute: u32,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            google_calendar: true,
            login_attempts_per_minute: 100,
        }
    }
}

/// A response decoded for assertions
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Value,
}

/// An account created through the API
#[derive(Debug, Clone)]
pub struct TestAccount {
    pub id: Uuid,
    pub token: String,
}

/// Unified test context that manages all test components
pub struct TestContext {
    pub app: Router,
    pub settings: Settings,
    pub ticketmaster: MockServer,
    pub google: MockServer,
    pub uploads: TempDir,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::new_with_config(TestConfig::default()).await
    }

    pub async fn new_with_config(config: TestConfig) -> Self {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let ticketmaster = MockServer::start().await;
        let google = MockServer::start().await;
        let uploads = tempfile::tempdir().expect("temp dir");

        let mut settings = Settings::default();
        settings.database.url = "memory://".to_string();
        settings.auth.jwt_secret = "integration-test-secret".to_string();
        settings.auth.staff_invite_code = Some(super::test_data::STAFF_CODE.to_string());
        settings.auth.login_attempts_per_minute = config.login_attempts_per_minute;
        settings.ticketmaster.api_key = "tm-test-key".to_string();
        settings.ticketmaster.base_url = ticketmaster.uri();
        settings.ticketmaster.timeout_seconds = 5;
        settings.uploads.dir = uploads.path().to_string_lossy().into_owned();
        settings.uploads.max_bytes = 64 * 1024;
        settings.features.google_calendar = config.google_calendar;
        settings.google = Some(GoogleConfig {
            client_id: "google-client".to_string(),
            client_secret: "google-secret".to_string(),
            redirect_uri: "http://localhost:5000/api/calendar/callback".to_string(),
            client_redirect_url: "http://localhost:3000/calendar".to_string(),
            auth_url: format!("{}/o/oauth2/v2/auth", google.uri()),
            token_url: format!("{}/token", google.uri()),
            api_base: format!("{}/calendar/v3", google.uri()),
        });
        settings.validate().expect("test settings are valid");

        let database = DatabaseService::connect(&settings.database).await.expect("memory store");
        let services = ServiceFactory::new(&settings, database).expect("services");
        let app = router(AppState::new(services), &settings);

        Self { app, settings, ticketmaster, google, uploads }
    }

    /// Send a request through the router
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().oneshot(request).await.expect("router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        TestResponse { status, headers, body }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(build(Method::GET, uri, token, None, Body::empty())).await
    }

    pub async fn post_json(&self, uri: &str, token: Option<&str>, body: &Value) -> TestResponse {
        self.send(build(
            Method::POST,
            uri,
            token,
            Some("application/json".to_string()),
            Body::from(body.to_string()),
        ))
        .await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(build(Method::DELETE, uri, token, None, Body::empty())).await
    }

    pub async fn send_form(&self, method: Method, uri: &str, token: Option<&str>, form: MultipartForm) -> TestResponse {
        let (content_type, body) = form.finish();
        self.send(build(method, uri, token, Some(content_type), Body::from(body))).await
    }

    /// Register an account through the API
    pub async fn create_account(&self, staff: bool) -> TestAccount {
        let response = self.post_json("/api/auth/signup", None, &signup_body(staff)).await;
        assert_eq!(response.status, StatusCode::CREATED, "signup failed: {}", response.body);
        TestAccount {
            id: response.body["user"]["id"].as_str().and_then(|id| id.parse().ok()).expect("user id"),
            token: response.body["token"].as_str().expect("token").to_string(),
        }
    }

    /// Create a manual event as `staff` and return the response body
    pub async fn create_event(&self, staff: &TestAccount, form: MultipartForm) -> TestResponse {
        self.send_form(Method::POST, "/api/staff/events", Some(&staff.token), form).await
    }
}

fn build(method: Method, uri: &str, token: Option<&str>, content_type: Option<String>, body: Body) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    builder.body(body).expect("valid request")
}
