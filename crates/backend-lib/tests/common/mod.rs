//! Shared setup for API tests.
#![allow(dead_code)]


use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use backend_lib::{
    auth::PasswordHasherConfig,
    bootstrap,
    config::Settings,
    router::create_router,
    storage::FlatFileStorage,
    testing::{FakeDispatcher, FakeOutcome},
    AppState,
};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState<FlatFileStorage>>,
    pub dispatcher: Arc<FakeDispatcher>,
    /// Keep in scope so the store directory outlives the test
    _dir: TempDir,
}

/// Router over a temp-dir store with the administrator bootstrapped and a
/// recording dispatcher in place of Web Push
pub async fn setup_test_app() -> TestApp {
    setup_with(|_| {}).await
}

pub async fn setup_with(tweak: impl FnOnce(&mut Settings)) -> TestApp {
    let dir = TempDir::new().unwrap();
    let mut settings = Settings::default();
    settings.storage.path = dir.path().to_path_buf();
    settings.auth.hash_cost = 4;
    settings.auth.jwt_secret = "integration-secret".to_string();
    tweak(&mut settings);

    let storage = FlatFileStorage::new(&settings.storage.path).unwrap();
    let hasher = PasswordHasherConfig::new(settings.auth.hash_cost).unwrap();
    bootstrap::run(&storage, &settings.auth, hasher).await.unwrap();

    let dispatcher = Arc::new(FakeDispatcher::new(FakeOutcome::Delivered));
    let state = Arc::new(AppState::new(storage, settings, dispatcher.clone()).unwrap());
    let router = create_router(state.clone());

    TestApp {
        router,
        state,
        dispatcher,
        _dir: dir,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn register(&self, username: &str, password: &str) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/register",
                None,
                Some(serde_json::json!({
                    "username": username,
                    "email": format!("{username}@example.com"),
                    "password": password,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }

    pub async fn login(&self, username: &str, password: &str) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/login",
                None,
                Some(serde_json::json!({ "username": username, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["token"].as_str().unwrap().to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.login("juan", "123").await
    }
}

pub fn subscription_json(endpoint: &str) -> Value {
    serde_json::json!({
        "endpoint": endpoint,
        "expirationTime": null,
        "keys": { "p256dh": "BNcRdreALRFXTkOOUHK1EtK2wtaz5Ry4YfYCA_0QTpQtUbVlUls0VJXg7A8u-Ts1XbjhazAkj7I99e8QcYP7DkM", "auth": "tBHItJI5svbpez7KI4CCXg" }
    })
}

pub fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or_default()
}
