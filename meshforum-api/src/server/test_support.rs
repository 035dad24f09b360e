use crate::server::{ServerConfig, ServerState, app};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
    response::Response,
};
use meshforum_db::memory::MemoryStore;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

pub const APP_ORIGIN: &str = "http://localhost:5173";
pub const PASSWORD: &str = "correct horse battery";

/// The full router over an in-memory store.
pub struct TestApp {
    pub state: ServerState,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let state = ServerState {
            store: Arc::new(MemoryStore::default()),
            config: Arc::new(ServerConfig {
                token_lifetime: None,
                app_origin: APP_ORIGIN.to_owned(),
            }),
        };

        Self {
            router: app(state.clone()),
            state,
        }
    }

    /// Sends one request and decodes the body as JSON, `Value::Null` if empty.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let response = self.request(method, uri, token, body).await;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, value)
    }

    /// Sends a bodiless request and hands back the response untouched.
    pub async fn raw(&self, method: Method, uri: &str, token: Option<&str>) -> Response {
        self.request(method, uri, token, None).await
    }

    async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn signup(&self, username: &str) -> String {
        self.signup_with(json!({ "username": username, "password": PASSWORD }))
            .await
    }

    pub async fn signup_recruiter(&self, username: &str, company: &str) -> String {
        self.signup_with(json!({
            "username": username,
            "password": PASSWORD,
            "role": "Recruiter",
            "company": company,
        }))
        .await
    }

    async fn signup_with(&self, body: Value) -> String {
        let (status, body) = self
            .send(Method::POST, "/auth/signup", None, Some(body))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");

        body["token"].as_str().unwrap().to_owned()
    }
}
