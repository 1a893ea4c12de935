//! Shared test harness: an in-process stub of the hosted auth/table
//! provider, plus helpers that boot the real API router against it on a
//! random port.
#![allow(dead_code)]

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use taskrow::{config::AppConfig, provider::Provider, rest, AppContext};

pub struct StubUser {
    pub id: String,
    pub password: Option<String>,
}

/// Provider state the tests can inspect and poke directly.
#[derive(Default)]
pub struct StubProvider {
    /// email (lowercase) → user
    pub users: Mutex<HashMap<String, StubUser>>,
    /// access token → user id
    pub sessions: Mutex<HashMap<String, String>>,
    /// raw `tasks` rows
    pub tasks: Mutex<Vec<Value>>,
    /// When set, every PATCH on the tasks table fails with a 500.
    pub fail_patch: AtomicBool,
}

/// The OTP the stub accepts for any known address.
pub const STUB_OTP: &str = "123456";

/// Signing up with this address reports a duplicate registration.
pub const TAKEN_EMAIL: &str = "taken@example.com";

pub struct TestStack {
    pub stub: Arc<StubProvider>,
    pub base_url: String,
}

impl TestStack {
    pub fn seed_user(&self, email: &str, password: &str) -> String {
        let id = Uuid::new_v4().to_string();
        self.stub.users.lock().unwrap().insert(
            email.to_lowercase(),
            StubUser {
                id: id.clone(),
                password: Some(password.to_string()),
            },
        );
        id
    }

    pub fn issue_token(&self, user_id: &str) -> String {
        let token = format!("tok-{}", Uuid::new_v4());
        self.stub
            .sessions
            .lock()
            .unwrap()
            .insert(token.clone(), user_id.to_string());
        token
    }
}

pub async fn start_stack() -> TestStack {
    let stub = Arc::new(StubProvider::default());
    let stub_addr = spawn_router(stub_router(stub.clone())).await;

    let config = AppConfig {
        port: 0,
        bind_address: "127.0.0.1".to_string(),
        log: "error".to_string(),
        log_format: "pretty".to_string(),
        provider_url: format!("http://{stub_addr}"),
        anon_key: "anon-test-key".to_string(),
        service_key: "service-test-key".to_string(),
    };
    let provider = Provider::new(&config).unwrap();
    let ctx = Arc::new(AppContext {
        config: Arc::new(config),
        provider: Arc::new(provider),
        started_at: std::time::Instant::now(),
    });
    let api_addr = spawn_router(rest::build_router(ctx)).await;

    TestStack {
        stub,
        base_url: format!("http://{api_addr}"),
    }
}

pub async fn spawn_router(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

// ─── Stub provider routes ────────────────────────────────────────────────────

fn stub_router(state: Arc<StubProvider>) -> Router {
    Router::new()
        .route("/auth/v1/otp", post(send_otp))
        .route("/auth/v1/verify", post(verify))
        .route("/auth/v1/token", post(password_grant))
        .route("/auth/v1/user", get(get_user))
        .route("/auth/v1/admin/users", get(admin_users))
        .route("/auth/v1/admin/users/{id}", put(admin_set_password))
        .route("/auth/v1/recover", post(recover))
        .route(
            "/rest/v1/tasks",
            get(rest_list)
                .post(rest_insert)
                .patch(rest_patch)
                .delete(rest_delete),
        )
        .with_state(state)
}

async fn send_otp(
    State(stub): State<Arc<StubProvider>>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let email = body["email"].as_str().unwrap_or("").to_lowercase();
    if email == TAKEN_EMAIL {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "msg": "User already registered" })),
        );
    }
    stub.users
        .lock()
        .unwrap()
        .entry(email)
        .or_insert_with(|| StubUser {
            id: Uuid::new_v4().to_string(),
            password: None,
        });
    (StatusCode::OK, Json(json!({})))
}

async fn verify(
    State(stub): State<Arc<StubProvider>>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let email = body["email"].as_str().unwrap_or("").to_lowercase();
    let token = body["token"].as_str().unwrap_or("");
    if body["type"].as_str() != Some("email") || token != STUB_OTP {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "msg": "Token has expired or is invalid" })),
        );
    }
    let user_id = match stub.users.lock().unwrap().get(&email) {
        Some(u) => u.id.clone(),
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "msg": "Token has expired or is invalid" })),
            )
        }
    };
    let access = format!("tok-{}", Uuid::new_v4());
    stub.sessions
        .lock()
        .unwrap()
        .insert(access.clone(), user_id.clone());
    (StatusCode::OK, Json(session_body(&access, &user_id, &email)))
}

async fn password_grant(
    State(stub): State<Arc<StubProvider>>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let email = body["email"].as_str().unwrap_or("").to_lowercase();
    let password = body["password"].as_str().unwrap_or("");
    let user_id = {
        let users = stub.users.lock().unwrap();
        users
            .get(&email)
            .filter(|u| u.password.as_deref() == Some(password))
            .map(|u| u.id.clone())
    };
    match user_id {
        Some(id) => {
            let access = format!("tok-{}", Uuid::new_v4());
            stub.sessions
                .lock()
                .unwrap()
                .insert(access.clone(), id.clone());
            (StatusCode::OK, Json(session_body(&access, &id, &email)))
        }
        None => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error_description": "Invalid login credentials" })),
        ),
    }
}

async fn get_user(
    State(stub): State<Arc<StubProvider>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or("");
    let user_id = stub.sessions.lock().unwrap().get(token).cloned();
    match user_id {
        Some(id) => {
            let email = stub
                .users
                .lock()
                .unwrap()
                .iter()
                .find(|(_, u)| u.id == id)
                .map(|(e, _)| e.clone());
            (StatusCode::OK, Json(json!({ "id": id, "email": email })))
        }
        None => (StatusCode::UNAUTHORIZED, Json(json!({ "msg": "invalid JWT" }))),
    }
}

async fn admin_users(State(stub): State<Arc<StubProvider>>) -> Json<Value> {
    let users: Vec<Value> = stub
        .users
        .lock()
        .unwrap()
        .iter()
        .map(|(email, u)| json!({ "id": u.id, "email": email }))
        .collect();
    Json(json!({ "users": users }))
}

async fn admin_set_password(
    State(stub): State<Arc<StubProvider>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let mut users = stub.users.lock().unwrap();
    match users.values_mut().find(|u| u.id == id) {
        Some(user) => {
            user.password = body["password"].as_str().map(str::to_string);
            (StatusCode::OK, Json(json!({ "id": id })))
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "msg": "user not found" })),
        ),
    }
}

async fn recover() -> Json<Value> {
    Json(json!({}))
}

fn session_body(access: &str, user_id: &str, email: &str) -> Value {
    json!({
        "access_token": access,
        "refresh_token": format!("ref-{access}"),
        "token_type": "bearer",
        "expires_in": 3600,
        "expires_at": Utc::now().timestamp() + 3600,
        "user": { "id": user_id, "email": email },
    })
}

// ─── Stub tasks table ────────────────────────────────────────────────────────

fn eq_param(params: &HashMap<String, String>, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.strip_prefix("eq."))
        .map(str::to_string)
}

async fn rest_list(
    State(stub): State<Arc<StubProvider>>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let user_id = eq_param(&params, "user_id").unwrap_or_default();
    let mut rows: Vec<Value> = stub
        .tasks
        .lock()
        .unwrap()
        .iter()
        .filter(|t| t["user_id"].as_str() == Some(user_id.as_str()))
        .cloned()
        .collect();
    rows.sort_by(|a, b| {
        b["created_at"]
            .as_str()
            .unwrap_or("")
            .cmp(a["created_at"].as_str().unwrap_or(""))
    });
    Json(Value::Array(rows))
}

async fn rest_insert(
    State(stub): State<Arc<StubProvider>>,
    Json(mut row): Json<Value>,
) -> impl IntoResponse {
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false);
    row["id"] = json!(Uuid::new_v4().to_string());
    row["created_at"] = json!(now);
    row["updated_at"] = json!(now);
    stub.tasks.lock().unwrap().push(row.clone());
    (StatusCode::CREATED, Json(json!([row])))
}

async fn rest_patch(
    State(stub): State<Arc<StubProvider>>,
    Query(params): Query<HashMap<String, String>>,
    Json(patch): Json<Value>,
) -> impl IntoResponse {
    if stub.fail_patch.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "storage unavailable" })),
        );
    }
    let id = eq_param(&params, "id").unwrap_or_default();
    let user_id = eq_param(&params, "user_id").unwrap_or_default();
    let mut tasks = stub.tasks.lock().unwrap();
    let row = tasks.iter_mut().find(|t| {
        t["id"].as_str() == Some(id.as_str()) && t["user_id"].as_str() == Some(user_id.as_str())
    });
    match row {
        Some(row) => {
            if let Some(fields) = patch.as_object() {
                for (k, v) in fields {
                    row[k.as_str()] = v.clone();
                }
            }
            (StatusCode::OK, Json(json!([row.clone()])))
        }
        None => (StatusCode::OK, Json(json!([]))),
    }
}

async fn rest_delete(
    State(stub): State<Arc<StubProvider>>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let id = eq_param(&params, "id").unwrap_or_default();
    let user_id = eq_param(&params, "user_id").unwrap_or_default();
    let mut tasks = stub.tasks.lock().unwrap();
    let (removed, kept): (Vec<Value>, Vec<Value>) = tasks.drain(..).partition(|t| {
        t["id"].as_str() == Some(id.as_str()) && t["user_id"].as_str() == Some(user_id.as_str())
    });
    *tasks = kept;
    Json(Value::Array(removed))
}
