//! Client for the hosted auth/table provider.
//!
//! Auth endpoints follow the GoTrue surface (`/auth/v1/...`), table storage
//! the PostgREST surface (`/rest/v1/tasks`). User-scoped calls carry the
//! caller's bearer token plus the anon API key; admin calls (user lookup,
//! password set, recovery mail) use the service-role key.
//!
//! One `Provider` is constructed at process start and injected through
//! `AppContext` — there is no module-level client.

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::config::AppConfig;
use crate::task::{Priority, Task};

/// Timeout for individual provider round trips.
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx response with the provider's own message attached.
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    #[error("unexpected provider response: {0}")]
    Unexpected(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub user: Option<AuthUser>,
}

#[derive(Debug, Deserialize)]
struct UsersPage {
    users: Vec<AuthUser>,
}

/// Row shape for a `tasks` insert. The provider assigns `id`, `created_at`
/// and `updated_at`.
#[derive(Debug, Serialize)]
pub struct NewTaskRow {
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub is_completed: bool,
    pub priority: Priority,
    pub deadline: Option<DateTime<Utc>>,
}

pub struct Provider {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    service_key: String,
}

impl Provider {
    pub fn new(config: &AppConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: config.provider_url.clone(),
            anon_key: config.anon_key.clone(),
            service_key: config.service_key.clone(),
        })
    }

    // ─── Auth (user-scoped) ─────────────────────────────────────────────────

    /// Sends a 6-digit OTP to the address, creating the user on first contact.
    pub async fn send_otp(&self, email: &str) -> Result<(), ProviderError> {
        let resp = self
            .http
            .post(format!("{}/auth/v1/otp", self.base_url))
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "create_user": true }))
            .send()
            .await?;
        Self::ok(resp).await?;
        Ok(())
    }

    /// Verifies a 6-digit email OTP and returns the opened session.
    pub async fn verify_otp(&self, email: &str, token: &str) -> Result<Session, ProviderError> {
        let resp = self
            .http
            .post(format!("{}/auth/v1/verify", self.base_url))
            .header("apikey", &self.anon_key)
            .json(&json!({ "type": "email", "email": email, "token": token }))
            .send()
            .await?;
        Ok(Self::ok(resp).await?.json().await?)
    }

    pub async fn password_login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, ProviderError> {
        let resp = self
            .http
            .post(format!("{}/auth/v1/token", self.base_url))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        Ok(Self::ok(resp).await?.json().await?)
    }

    /// Resolves the user behind an access token. Fails on invalid/expired tokens.
    pub async fn get_user(&self, access_token: &str) -> Result<AuthUser, ProviderError> {
        let resp = self
            .http
            .get(format!("{}/auth/v1/user", self.base_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;
        Ok(Self::ok(resp).await?.json().await?)
    }

    // ─── Auth (admin, service-role key) ─────────────────────────────────────

    pub async fn find_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<AuthUser>, ProviderError> {
        let resp = self
            .http
            .get(format!("{}/auth/v1/admin/users", self.base_url))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .send()
            .await?;
        let page: UsersPage = Self::ok(resp).await?.json().await?;
        let needle = email.to_lowercase();
        Ok(page.users.into_iter().find(|u| {
            u.email
                .as_deref()
                .is_some_and(|e| e.to_lowercase() == needle)
        }))
    }

    pub async fn set_user_password(
        &self,
        user_id: &str,
        password: &str,
    ) -> Result<(), ProviderError> {
        let resp = self
            .http
            .put(format!("{}/auth/v1/admin/users/{user_id}", self.base_url))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .json(&json!({ "password": password }))
            .send()
            .await?;
        Self::ok(resp).await?;
        Ok(())
    }

    /// Triggers the provider's password-recovery mail.
    pub async fn send_recovery(&self, email: &str) -> Result<(), ProviderError> {
        let resp = self
            .http
            .post(format!("{}/auth/v1/recover", self.base_url))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .json(&json!({ "email": email }))
            .send()
            .await?;
        Self::ok(resp).await?;
        Ok(())
    }

    // ─── Tasks table (user-scoped) ──────────────────────────────────────────

    pub async fn list_tasks(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> Result<Vec<Task>, ProviderError> {
        let owner = format!("eq.{user_id}");
        let resp = self
            .http
            .get(format!("{}/rest/v1/tasks", self.base_url))
            .query(&[
                ("select", "*"),
                ("user_id", owner.as_str()),
                ("order", "created_at.desc"),
            ])
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;
        Ok(Self::ok(resp).await?.json().await?)
    }

    pub async fn insert_task(
        &self,
        access_token: &str,
        row: &NewTaskRow,
    ) -> Result<Task, ProviderError> {
        let resp = self
            .http
            .post(format!("{}/rest/v1/tasks", self.base_url))
            .header("apikey", &self.anon_key)
            .header("Prefer", "return=representation")
            .bearer_auth(access_token)
            .json(row)
            .send()
            .await?;
        let mut rows: Vec<Task> = Self::ok(resp).await?.json().await?;
        rows.pop()
            .ok_or_else(|| ProviderError::Unexpected("insert returned no row".to_string()))
    }

    /// Returns `None` when the task does not exist or is not owned by `user_id`.
    pub async fn get_task(
        &self,
        access_token: &str,
        user_id: &str,
        task_id: &str,
    ) -> Result<Option<Task>, ProviderError> {
        let id = format!("eq.{task_id}");
        let owner = format!("eq.{user_id}");
        let resp = self
            .http
            .get(format!("{}/rest/v1/tasks", self.base_url))
            .query(&[
                ("select", "*"),
                ("id", id.as_str()),
                ("user_id", owner.as_str()),
            ])
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;
        let mut rows: Vec<Task> = Self::ok(resp).await?.json().await?;
        Ok(rows.pop())
    }

    /// Applies a partial update. `None` means not found / not owned.
    pub async fn update_task(
        &self,
        access_token: &str,
        user_id: &str,
        task_id: &str,
        patch: &Value,
    ) -> Result<Option<Task>, ProviderError> {
        let id = format!("eq.{task_id}");
        let owner = format!("eq.{user_id}");
        let resp = self
            .http
            .patch(format!("{}/rest/v1/tasks", self.base_url))
            .query(&[("id", id.as_str()), ("user_id", owner.as_str())])
            .header("apikey", &self.anon_key)
            .header("Prefer", "return=representation")
            .bearer_auth(access_token)
            .json(patch)
            .send()
            .await?;
        let mut rows: Vec<Task> = Self::ok(resp).await?.json().await?;
        Ok(rows.pop())
    }

    /// Returns `false` when nothing was deleted (unknown id or foreign owner).
    pub async fn delete_task(
        &self,
        access_token: &str,
        user_id: &str,
        task_id: &str,
    ) -> Result<bool, ProviderError> {
        let id = format!("eq.{task_id}");
        let owner = format!("eq.{user_id}");
        let resp = self
            .http
            .delete(format!("{}/rest/v1/tasks", self.base_url))
            .query(&[("id", id.as_str()), ("user_id", owner.as_str())])
            .header("apikey", &self.anon_key)
            .header("Prefer", "return=representation")
            .bearer_auth(access_token)
            .send()
            .await?;
        let rows: Vec<Value> = Self::ok(resp).await?.json().await?;
        Ok(!rows.is_empty())
    }

    // ─── Response shaping ───────────────────────────────────────────────────

    /// Passes 2xx responses through; turns anything else into `Rejected`
    /// carrying the provider's own message when one can be extracted.
    async fn ok(resp: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let message = match resp.json::<Value>().await {
            Ok(body) => ["msg", "message", "error_description", "error"]
                .iter()
                .find_map(|k| body.get(*k).and_then(Value::as_str))
                .map(str::to_string)
                .unwrap_or_else(|| format!("provider returned HTTP {status}")),
            Err(_) => format!("provider returned HTTP {status}"),
        };
        Err(ProviderError::Rejected { status, message })
    }
}
