//! Client-side library: the JSON wrapper over the API routes, the in-memory
//! task store, and the signup flow controller.

pub mod signup;
pub mod tasks;

use reqwest::Method;
use serde_json::{json, Value};
use thiserror::Error;

use crate::task::Task;

/// Every client-side failure collapses to one message string; the caller
/// runs it through `error::friendly_message` before display.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ClientError {
    pub message: String,
}

impl ClientError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Thin JSON wrapper over the API routes. Attaches the bearer token once
/// one is known (after login).
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    bearer: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ClientError::new(format!("network error: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bearer: None,
        })
    }

    pub fn bearer(&self) -> Option<&str> {
        self.bearer.as_deref()
    }

    pub fn set_bearer(&mut self, token: Option<String>) {
        self.bearer = token;
    }

    /// One JSON round trip. Non-2xx responses become `ClientError` with the
    /// body's `error`/`message` field, or `HTTP <status>` when absent;
    /// transport failures are tagged as network errors.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ClientError> {
        let mut req = self.http.request(method, format!("{}{path}", self.base_url));
        if let Some(token) = &self.bearer {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| ClientError::new(format!("network error: {e}")))?;

        let status = resp.status();
        let parsed: Result<Value, _> = resp.json().await;

        if status.is_success() {
            return parsed.map_err(|e| ClientError::new(format!("network error: {e}")));
        }

        let message = parsed
            .ok()
            .as_ref()
            .and_then(|v| {
                ["error", "message"]
                    .iter()
                    .find_map(|k| v.get(*k).and_then(Value::as_str))
            })
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP {status}"));
        Err(ClientError::new(message))
    }

    // ─── Auth ───────────────────────────────────────────────────────────────

    pub async fn signup(&self, email: &str) -> Result<Value, ClientError> {
        self.request(
            Method::POST,
            "/api/auth/signup",
            Some(&json!({ "email": email })),
        )
        .await
    }

    pub async fn verify_otp(&self, email: &str, token: &str) -> Result<Value, ClientError> {
        self.request(
            Method::POST,
            "/api/auth/verify-otp",
            Some(&json!({ "email": email, "token": token })),
        )
        .await
    }

    pub async fn set_password(&self, email: &str, password: &str) -> Result<Value, ClientError> {
        self.request(
            Method::POST,
            "/api/auth/set-password",
            Some(&json!({ "email": email, "password": password })),
        )
        .await
    }

    /// Logs in and remembers the returned access token for task calls.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<Value, ClientError> {
        let result = self
            .request(
                Method::POST,
                "/api/auth/login",
                Some(&json!({ "email": email, "password": password })),
            )
            .await?;
        if let Some(token) = result
            .pointer("/data/session/accessToken")
            .and_then(Value::as_str)
        {
            self.bearer = Some(token.to_string());
        }
        Ok(result)
    }

    pub async fn forgot_password(&self, email: &str) -> Result<Value, ClientError> {
        self.request(
            Method::POST,
            "/api/auth/forgot-password",
            Some(&json!({ "email": email })),
        )
        .await
    }

    pub async fn logout(&mut self) -> Result<Value, ClientError> {
        let result = self.request(Method::POST, "/api/auth/logout", None).await?;
        self.bearer = None;
        Ok(result)
    }

    // ─── Tasks ──────────────────────────────────────────────────────────────

    pub async fn fetch_tasks(&self) -> Result<Vec<Task>, ClientError> {
        let result = self.request(Method::GET, "/api/tasks", None).await?;
        serde_json::from_value(result.get("tasks").cloned().unwrap_or(Value::Null))
            .map_err(|e| ClientError::new(format!("malformed task list: {e}")))
    }

    pub async fn create_task(&self, body: &Value) -> Result<Task, ClientError> {
        let result = self.request(Method::POST, "/api/tasks", Some(body)).await?;
        parse_task(result)
    }

    pub async fn update_task(&self, id: &str, patch: &Value) -> Result<Task, ClientError> {
        let result = self
            .request(Method::PUT, &format!("/api/tasks/{id}"), Some(patch))
            .await?;
        parse_task(result)
    }

    pub async fn delete_task(&self, id: &str) -> Result<(), ClientError> {
        self.request(Method::DELETE, &format!("/api/tasks/{id}"), None)
            .await?;
        Ok(())
    }
}

fn parse_task(result: Value) -> Result<Task, ClientError> {
    serde_json::from_value(result.get("task").cloned().unwrap_or(Value::Null))
        .map_err(|e| ClientError::new(format!("malformed task: {e}")))
}
