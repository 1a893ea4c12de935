//! Task record and the filter/sort view parameters shared by the route
//! handlers and the client-side store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
}

impl Priority {
    /// Ranking used by `priority_desc`: high=3, medium=2, low=1.
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        }
    }

    /// Invalid or absent priorities coerce to `low`.
    pub fn coerce(s: Option<&str>) -> Self {
        s.and_then(Priority::parse).unwrap_or_default()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

/// One row of the provider's `tasks` table. Wire names are snake_case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Provider-assigned opaque identifier.
    pub id: String,
    /// Owner — immutable after creation; every table operation is scoped to it.
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub is_completed: bool,
    pub priority: Priority,
    pub deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ─── View parameters ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Pending,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PriorityFilter {
    #[default]
    All,
    Only(Priority),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskSort {
    /// Most recently created first (default).
    #[default]
    CreatedAtDesc,
    CreatedAtAsc,
    /// high → medium → low; ties keep prior relative order.
    PriorityDesc,
    /// Earliest deadline first; undated tasks after all dated ones.
    DeadlineAsc,
}

/// Pure view parameters — never persisted.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskFilter {
    pub status: StatusFilter,
    pub priority: PriorityFilter,
    pub sort: TaskSort,
}

impl TaskFilter {
    /// Derives the filtered, sorted view: status filter, then priority
    /// filter, then a stable sort by the selected order.
    pub fn apply<'a>(&self, tasks: &'a [Task]) -> Vec<&'a Task> {
        let mut out: Vec<&Task> = tasks
            .iter()
            .filter(|t| match self.status {
                StatusFilter::All => true,
                StatusFilter::Pending => !t.is_completed,
                StatusFilter::Completed => t.is_completed,
            })
            .filter(|t| match self.priority {
                PriorityFilter::All => true,
                PriorityFilter::Only(p) => t.priority == p,
            })
            .collect();

        // Vec::sort_by is stable, which is what keeps equal-priority and
        // equal-deadline ties in their prior relative order.
        match self.sort {
            TaskSort::CreatedAtDesc => out.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            TaskSort::CreatedAtAsc => out.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            TaskSort::PriorityDesc => {
                out.sort_by(|a, b| b.priority.rank().cmp(&a.priority.rank()));
            }
            TaskSort::DeadlineAsc => out.sort_by(|a, b| match (a.deadline, b.deadline) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            }),
        }
        out
    }
}
