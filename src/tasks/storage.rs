use anyhow::{anyhow, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::tasks::model::{Task, TaskPriority, TaskRow, TaskStatus};

/// Fully resolved column values for an insert or update. The orchestrator
/// resolves patches against current state before calling in; this layer
/// never interprets patch semantics.
#[derive(Debug, Clone)]
pub struct TaskWrite {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<String>,
    pub assigned_to_id: Option<String>,
}

/// Shared SELECT head joining creator and assignee for denormalization.
const SELECT_TASK: &str = "SELECT t.*,
        cu.name  AS creator_name,  cu.email AS creator_email,
        au.name  AS assignee_name, au.email AS assignee_email
   FROM tasks t
   JOIN users cu ON cu.id = t.created_by_id
   LEFT JOIN users au ON au.id = t.assigned_to_id";

#[derive(Clone)]
pub struct TaskStorage {
    pool: SqlitePool,
}

impl TaskStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert_task(&self, write: &TaskWrite, created_by_id: &str) -> Result<Task> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO tasks
             (id, title, description, status, priority, due_date, created_by_id, assigned_to_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&write.title)
        .bind(&write.description)
        .bind(write.status)
        .bind(write.priority)
        .bind(&write.due_date)
        .bind(created_by_id)
        .bind(&write.assigned_to_id)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.fetch_task(&id)
            .await?
            .ok_or_else(|| anyhow!("task not found after insert"))
    }

    pub async fn fetch_task(&self, id: &str) -> Result<Option<Task>> {
        let row: Option<TaskRow> = sqlx::query_as(&format!("{SELECT_TASK} WHERE t.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Task::from))
    }

    /// All tasks visible to `user_id`: created by them or currently assigned
    /// to them. This scope is the query engine's non-overridable baseline.
    pub async fn list_visible(&self, user_id: &str) -> Result<Vec<Task>> {
        let rows: Vec<TaskRow> = sqlx::query_as(&format!(
            "{SELECT_TASK} WHERE t.created_by_id = ? OR t.assigned_to_id = ?"
        ))
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Task::from).collect())
    }

    /// Overwrite all mutable columns and advance `updated_at`. Concurrent
    /// updates to the same row are last-writer-wins at the SQLite level.
    pub async fn update_task(&self, id: &str, write: &TaskWrite) -> Result<Task> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "UPDATE tasks
             SET title = ?, description = ?, status = ?, priority = ?,
                 due_date = ?, assigned_to_id = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&write.title)
        .bind(&write.description)
        .bind(write.status)
        .bind(write.priority)
        .bind(&write.due_date)
        .bind(&write.assigned_to_id)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.fetch_task(id)
            .await?
            .ok_or_else(|| anyhow!("task not found after update"))
    }

    pub async fn delete_task(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
