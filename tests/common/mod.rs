use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use drank_api::{config::AppConfig, events, AppState};

const TEST_JWT_SECRET: &str =
    "integration-test-signing-key-0123456789abcdef0123456789abcdef0123456789abcdef";

/// Test harness booting the full router on a file-backed SQLite database.
///
/// The pool is capped at a single connection so SQLite serializes writers
/// the same way each test run.
pub struct TestApp {
    router: Router,
    pub state: Arc<AppState>,
    _event_task: tokio::task::JoinHandle<()>,
    _db_dir: TempDir,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let db_dir = tempfile::tempdir().expect("create temp dir for test database");
        let db_path = db_dir.path().join("drank_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            TEST_JWT_SECRET.to_string(),
            3600,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.auto_migrate = true;
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let (state, event_rx) = drank_api::build_state(cfg)
            .await
            .expect("failed to build test application state");
        let event_task = tokio::spawn(events::process_events(event_rx));

        let router = Router::new()
            .nest("/api/v1", drank_api::api_v1_routes(&state))
            .with_state(state.clone());

        Self {
            router,
            state,
            _event_task: event_task,
            _db_dir: db_dir,
        }
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Registers a user and logs in, returning the bearer token and user id.
    pub async fn register_and_login(&self, email: &str) -> (String, Uuid) {
        let response = self
            .request(
                Method::POST,
                "/api/v1/auth/register",
                Some(json!({
                    "email": email,
                    "password": "password123",
                    "first_name": "Test",
                    "last_name": "User",
                })),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED, "register {}", email);
        let user = read_json(response).await;
        let user_id = Uuid::parse_str(user["id"].as_str().unwrap()).unwrap();

        let response = self
            .request(
                Method::POST,
                "/api/v1/auth/login",
                Some(json!({ "email": email, "password": "password123" })),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK, "login {}", email);
        let login = read_json(response).await;
        let token = login["token"].as_str().unwrap().to_string();

        (token, user_id)
    }

    /// Opens a checking account for the user, optionally with an opening
    /// balance, and returns the account JSON.
    pub async fn create_account(
        &self,
        token: &str,
        user_id: Uuid,
        initial_balance: Option<&str>,
    ) -> Value {
        let mut body = json!({
            "user_id": user_id,
            "account_type": "CHECKING",
        });
        if let Some(balance) = initial_balance {
            body["initial_balance"] = json!(balance);
        }

        let response = self
            .request(Method::POST, "/api/v1/accounts", Some(body), Some(token))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED, "create account");
        read_json(response).await
    }

    /// Current balance of an account as seen through the API
    pub async fn account_balance(&self, token: &str, account_id: &str) -> Decimal {
        let response = self
            .request(
                Method::GET,
                &format!("/api/v1/accounts/{}", account_id),
                None,
                Some(token),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK, "get account");
        let account = read_json(response).await;
        decimal_field(&account, "balance")
    }
}

/// Parses a decimal field regardless of whether the backend serialized it
/// as a string or a bare number.
pub fn decimal_field(value: &Value, field: &str) -> Decimal {
    match &value[field] {
        Value::String(s) => s.parse().expect("decimal field should parse"),
        other => other
            .to_string()
            .parse()
            .expect("decimal field should parse"),
    }
}

/// Reads a response body as JSON
pub async fn read_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("response body should be valid json")
}
