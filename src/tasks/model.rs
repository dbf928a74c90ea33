use serde::{Deserialize, Serialize};

/// Task workflow state. No transition graph is enforced — an authorized
/// editor may set any value at any time.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "TODO" => Some(Self::Todo),
            "IN_PROGRESS" => Some(Self::InProgress),
            "DONE" => Some(Self::Done),
            _ => None,
        }
    }
}

/// Ordering is LOW < MEDIUM < HIGH, used by the query engine's priority sort.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl TaskPriority {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "LOW" => Some(Self::Low),
            "MEDIUM" => Some(Self::Medium),
            "HIGH" => Some(Self::High),
            _ => None,
        }
    }
}

/// Denormalized user reference embedded in task payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// A task row joined with its creator and (optional) assignee.
///
/// Timestamps are RFC 3339 TEXT produced by `chrono::Utc::now().to_rfc3339()`
/// — uniform format, so lexicographic order equals chronological order.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TaskRow {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<String>,
    pub created_by_id: String,
    pub assigned_to_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub creator_name: String,
    pub creator_email: String,
    pub assignee_name: Option<String>,
    pub assignee_email: Option<String>,
}

/// The wire shape of a task: camelCase fields with denormalized
/// `createdBy`/`assignedTo` summaries. Identical over HTTP responses and
/// WebSocket event payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<String>,
    pub created_by_id: String,
    pub assigned_to_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub created_by: UserSummary,
    pub assigned_to: Option<UserSummary>,
}

impl From<TaskRow> for Task {
    fn from(row: TaskRow) -> Self {
        let assigned_to = match (&row.assigned_to_id, row.assignee_name, row.assignee_email) {
            (Some(id), Some(name), Some(email)) => Some(UserSummary {
                id: id.clone(),
                name,
                email,
            }),
            _ => None,
        };
        Self {
            created_by: UserSummary {
                id: row.created_by_id.clone(),
                name: row.creator_name,
                email: row.creator_email,
            },
            assigned_to,
            id: row.id,
            title: row.title,
            description: row.description,
            status: row.status,
            priority: row.priority,
            due_date: row.due_date,
            created_by_id: row.created_by_id,
            assigned_to_id: row.assigned_to_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
