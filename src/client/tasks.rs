//! In-memory store of the authenticated user's tasks.
//!
//! Mirrors the last known server state; every mutation is a single round
//! trip with no retry. The one exception to strict server-first ordering is
//! `toggle_complete`, which flips locally before the request and applies
//! the inverse flip if the request fails.

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};

use super::{ApiClient, ClientError};
use crate::error::friendly_message;
use crate::task::{Priority, Task, TaskFilter};

/// Settle delay before the first load — lets the provider pick up session
/// cookies set during login. A workaround, not a consistency mechanism;
/// callers needing strict freshness should call `load` again.
const FIRST_LOAD_SETTLE: std::time::Duration = std::time::Duration::from_millis(50);

#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    /// Sent as-is; the server coerces invalid or absent values to `low`.
    pub priority: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
}

/// Partial update. `Some(None)` on an optional field clears it; an unset
/// field is left untouched by the server.
#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub is_completed: Option<bool>,
    pub priority: Option<Priority>,
    pub deadline: Option<Option<DateTime<Utc>>>,
}

impl TaskChanges {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = Some(description);
        self
    }

    pub fn completed(mut self, value: bool) -> Self {
        self.is_completed = Some(value);
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn deadline(mut self, deadline: Option<DateTime<Utc>>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    fn to_patch(&self) -> Value {
        let mut patch = Map::new();
        if let Some(title) = &self.title {
            patch.insert("title".to_string(), json!(title));
        }
        if let Some(description) = &self.description {
            patch.insert("description".to_string(), json!(description));
        }
        if let Some(is_completed) = self.is_completed {
            patch.insert("is_completed".to_string(), json!(is_completed));
        }
        if let Some(priority) = self.priority {
            patch.insert("priority".to_string(), json!(priority));
        }
        if let Some(deadline) = &self.deadline {
            patch.insert("deadline".to_string(), json!(deadline));
        }
        Value::Object(patch)
    }
}

pub struct TaskStore {
    api: ApiClient,
    tasks: Vec<Task>,
    error: Option<String>,
    loaded_once: bool,
}

impl TaskStore {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            tasks: Vec::new(),
            error: None,
            loaded_once: false,
        }
    }

    /// The raw collection, in last-known server order (newest first).
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn last_error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Fetches all tasks. Success replaces the collection; failure records
    /// the error and clears it. Not retried.
    pub async fn load(&mut self) {
        if !self.loaded_once {
            tokio::time::sleep(FIRST_LOAD_SETTLE).await;
            self.loaded_once = true;
        }
        self.error = None;
        match self.api.fetch_tasks().await {
            Ok(tasks) => self.tasks = tasks,
            Err(e) => {
                self.error = Some(friendly_message(&e.message));
                self.tasks.clear();
            }
        }
    }

    /// Creates a task and prepends the server-returned record on success.
    pub async fn create(&mut self, input: NewTask) -> Result<Task, String> {
        let body = json!({
            "title": input.title,
            "description": input.description,
            "priority": input.priority,
            "deadline": input.deadline,
        });
        match self.api.create_task(&body).await {
            Ok(task) => {
                self.tasks.insert(0, task.clone());
                Ok(task)
            }
            Err(e) => Err(self.record_error(e)),
        }
    }

    /// Applies a partial update. A provided title that trims empty fails
    /// client-side before any request is issued.
    pub async fn update(&mut self, id: &str, changes: TaskChanges) -> Result<Task, String> {
        if let Some(title) = &changes.title {
            if title.trim().is_empty() {
                return Err("Task title cannot be empty".to_string());
            }
        }
        match self.api.update_task(id, &changes.to_patch()).await {
            Ok(task) => {
                self.replace(task.clone());
                Ok(task)
            }
            Err(e) => Err(self.record_error(e)),
        }
    }

    /// Removes the task locally only after server confirmation.
    pub async fn delete(&mut self, id: &str) -> Result<(), String> {
        match self.api.delete_task(id).await {
            Ok(()) => {
                self.tasks.retain(|t| t.id != id);
                Ok(())
            }
            Err(e) => Err(self.record_error(e)),
        }
    }

    /// Optimistic completion toggle: the flip is visible immediately and
    /// reverted if the request fails, so the visible value is always the
    /// confirmed state or the in-flight guess — never a stale pre-toggle
    /// value after a failed call.
    pub async fn toggle_complete(&mut self, id: &str, value: bool) -> Result<(), String> {
        if let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) {
            task.is_completed = value;
        }

        let patch = json!({ "is_completed": value });
        match self.api.update_task(id, &patch).await {
            Ok(task) => {
                self.replace(task);
                Ok(())
            }
            Err(e) => {
                if let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) {
                    task.is_completed = !value;
                }
                Err(self.record_error(e))
            }
        }
    }

    /// Derived, read-only filtered and sorted view.
    pub fn view(&self, filter: &TaskFilter) -> Vec<&Task> {
        filter.apply(&self.tasks)
    }

    fn replace(&mut self, task: Task) {
        if let Some(slot) = self.tasks.iter_mut().find(|t| t.id == task.id) {
            *slot = task;
        }
    }

    fn record_error(&mut self, e: ClientError) -> String {
        let message = friendly_message(&e.message);
        self.error = Some(message.clone());
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_changes_patch_distinguishes_clear_from_untouched() {
        let patch = TaskChanges::default()
            .completed(true)
            .description(None)
            .to_patch();
        let obj = patch.as_object().unwrap();
        assert_eq!(obj.get("is_completed"), Some(&json!(true)));
        // Explicit clear serializes as null...
        assert_eq!(obj.get("description"), Some(&Value::Null));
        // ...while untouched fields are absent entirely.
        assert!(!obj.contains_key("title"));
        assert!(!obj.contains_key("deadline"));
        assert!(!obj.contains_key("priority"));
    }

    #[test]
    fn priority_serializes_lowercase() {
        let patch = TaskChanges::default().priority(Priority::High).to_patch();
        assert_eq!(patch.get("priority"), Some(&json!("high")));
    }
}
