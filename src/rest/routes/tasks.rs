// rest/routes/tasks.rs — Per-user task CRUD. All handlers run behind
// `gate::require_bearer`, which verifies the token and injects the caller.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::{json, Map, Value};
use std::sync::Arc;

use crate::error::ApiError;
use crate::provider::NewTaskRow;
use crate::rest::gate::Caller;
use crate::task::Priority;
use crate::AppContext;

pub async fn list_tasks(
    State(ctx): State<Arc<AppContext>>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Value>, ApiError> {
    let tasks = ctx
        .provider
        .list_tasks(&caller.token, &caller.user.id)
        .await?;
    Ok(Json(json!({ "tasks": tasks })))
}

#[derive(Deserialize)]
pub struct CreateTaskRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
}

pub async fn create_task(
    State(ctx): State<Arc<AppContext>>,
    Extension(caller): Extension<Caller>,
    Json(body): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let title = body.title.as_deref().unwrap_or("").trim().to_string();
    if title.is_empty() {
        return Err(ApiError::BadRequest("Task title is required".to_string()));
    }

    let row = NewTaskRow {
        user_id: caller.user.id.clone(),
        title,
        description: body
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
        is_completed: false,
        priority: Priority::coerce(body.priority.as_deref()),
        deadline: body.deadline,
    };

    let task = ctx.provider.insert_task(&caller.token, &row).await?;
    Ok((StatusCode::CREATED, Json(json!({ "task": task }))))
}

pub async fn get_task(
    State(ctx): State<Arc<AppContext>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let task = ctx
        .provider
        .get_task(&caller.token, &caller.user.id, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;
    Ok(Json(json!({ "task": task })))
}

/// Distinguishes an absent field from an explicit `null`:
/// absent → `None`, `null` → `Some(None)`, value → `Some(Some(v))`.
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}

#[derive(Deserialize, Default)]
pub struct UpdateTaskRequest {
    #[serde(default, deserialize_with = "double_option")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub is_completed: Option<bool>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub deadline: Option<Option<DateTime<Utc>>>,
}

pub async fn update_task(
    State(ctx): State<Arc<AppContext>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    Json(body): Json<UpdateTaskRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut patch = Map::new();

    if let Some(title) = body.title {
        let title = title.as_deref().unwrap_or("").trim().to_string();
        if title.is_empty() {
            return Err(ApiError::BadRequest(
                "Task title cannot be empty".to_string(),
            ));
        }
        patch.insert("title".to_string(), Value::String(title));
    }

    if let Some(description) = body.description {
        let trimmed = description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        patch.insert(
            "description".to_string(),
            trimmed.map(Value::String).unwrap_or(Value::Null),
        );
    }

    if let Some(is_completed) = body.is_completed {
        patch.insert("is_completed".to_string(), Value::Bool(is_completed));
    }

    // Invalid priorities are ignored rather than rejected.
    if let Some(priority) = body.priority.as_deref().and_then(Priority::parse) {
        patch.insert("priority".to_string(), json!(priority));
    }

    if let Some(deadline) = body.deadline {
        patch.insert("deadline".to_string(), json!(deadline));
    }

    patch.insert("updated_at".to_string(), json!(Utc::now()));

    let task = ctx
        .provider
        .update_task(&caller.token, &caller.user.id, &id, &Value::Object(patch))
        .await?
        .ok_or_else(|| {
            ApiError::NotFound("Failed to update task or task not found".to_string())
        })?;
    Ok(Json(json!({ "task": task })))
}

pub async fn delete_task(
    State(ctx): State<Arc<AppContext>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let deleted = ctx
        .provider
        .delete_task(&caller.token, &caller.user.id, &id)
        .await?;
    if !deleted {
        return Err(ApiError::NotFound(
            "Failed to delete task or task not found".to_string(),
        ));
    }
    Ok(Json(json!({ "message": "Task deleted successfully" })))
}
