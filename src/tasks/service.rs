// tasks/service.rs — the task orchestrator.
//
// Every mutation follows the same path: authorization check, store write,
// event broadcast. Broadcasts are fire-and-forget; a mutation that persisted
// is never rolled back because delivery failed.

use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::error::ApiError;
use crate::storage::Storage;
use crate::tasks::input::{CreateTaskInput, UpdateTaskInput};
use crate::tasks::model::{Task, TaskPriority, TaskStatus};
use crate::tasks::policy::{self, Action};
use crate::tasks::query::{RawTaskQuery, TaskQuery};
use crate::tasks::storage::{TaskStorage, TaskWrite};
use crate::ws::ConnectionRegistry;

// Event names are wire contract — clients match on them exactly.
pub const EVENT_TASK_CREATED: &str = "task:created";
pub const EVENT_TASK_UPDATED: &str = "task:updated";
pub const EVENT_TASK_DELETED: &str = "task:deleted";
pub const EVENT_TASK_ASSIGNED: &str = "task:assigned";

#[derive(Debug, Serialize)]
pub struct DeleteConfirmation {
    pub message: &'static str,
}

pub struct TaskService {
    tasks: Arc<TaskStorage>,
    users: Arc<Storage>,
    notifier: Arc<ConnectionRegistry>,
}

impl TaskService {
    pub fn new(
        tasks: Arc<TaskStorage>,
        users: Arc<Storage>,
        notifier: Arc<ConnectionRegistry>,
    ) -> Self {
        Self {
            tasks,
            users,
            notifier,
        }
    }

    pub async fn create_task(
        &self,
        input: CreateTaskInput,
        acting_user_id: &str,
    ) -> Result<Task, ApiError> {
        let input = input.validated()?;

        let assigned_to_id = match input.assigned_to_id.set_value() {
            Some(id) => {
                self.require_user(id).await?;
                Some(id.clone())
            }
            None => None,
        };

        let write = TaskWrite {
            title: input.title,
            description: input.description,
            status: input.status.unwrap_or(TaskStatus::Todo),
            priority: input.priority.unwrap_or(TaskPriority::Medium),
            due_date: input.due_date.resolve(None),
            assigned_to_id: assigned_to_id.clone(),
        };

        let task = self.tasks.insert_task(&write, acting_user_id).await?;
        info!(task_id = %task.id, created_by = %acting_user_id, "task created");

        let payload = task_payload(&task)?;
        self.notifier.broadcast_all(EVENT_TASK_CREATED, payload.clone());
        if let Some(assignee) = &assigned_to_id {
            self.notifier
                .notify_user(assignee, EVENT_TASK_ASSIGNED, payload);
        }

        Ok(task)
    }

    pub async fn list_tasks(
        &self,
        raw: RawTaskQuery,
        acting_user_id: &str,
    ) -> Result<Vec<Task>, ApiError> {
        let query = TaskQuery::parse(raw)?;
        let visible = self.tasks.list_visible(acting_user_id).await?;
        Ok(query.apply(visible))
    }

    pub async fn get_task(&self, id: &str, acting_user_id: &str) -> Result<Task, ApiError> {
        let task = self
            .tasks
            .fetch_task(id)
            .await?
            .ok_or(ApiError::NotFound("Task"))?;
        policy::require(&task, acting_user_id, Action::View)?;
        Ok(task)
    }

    pub async fn update_task(
        &self,
        id: &str,
        patch: UpdateTaskInput,
        acting_user_id: &str,
    ) -> Result<Task, ApiError> {
        let patch = patch.validated()?;

        let current = self
            .tasks
            .fetch_task(id)
            .await?
            .ok_or(ApiError::NotFound("Task"))?;
        policy::require(&current, acting_user_id, Action::Update)?;

        // A targeted notification goes to the new assignee only when the
        // patch sets one different from the prior value. Clearing the
        // assignee or re-setting the same one notifies nobody.
        let newly_assigned = match patch.assigned_to_id.set_value() {
            Some(new_id) if current.assigned_to_id.as_deref() != Some(new_id.as_str()) => {
                Some(new_id.clone())
            }
            _ => None,
        };

        if let Some(assignee) = patch.assigned_to_id.set_value() {
            self.require_user(assignee).await?;
        }

        let write = TaskWrite {
            title: patch.title.unwrap_or_else(|| current.title.clone()),
            description: patch.description.resolve(current.description.clone()),
            status: patch.status.unwrap_or(current.status),
            priority: patch.priority.unwrap_or(current.priority),
            due_date: patch.due_date.resolve(current.due_date.clone()),
            assigned_to_id: patch.assigned_to_id.resolve(current.assigned_to_id.clone()),
        };

        let task = self.tasks.update_task(id, &write).await?;
        info!(task_id = %task.id, updated_by = %acting_user_id, "task updated");

        let payload = task_payload(&task)?;
        self.notifier.broadcast_all(EVENT_TASK_UPDATED, payload.clone());
        if let Some(assignee) = newly_assigned {
            self.notifier
                .notify_user(&assignee, EVENT_TASK_ASSIGNED, payload);
        }

        Ok(task)
    }

    pub async fn delete_task(
        &self,
        id: &str,
        acting_user_id: &str,
    ) -> Result<DeleteConfirmation, ApiError> {
        let task = self
            .tasks
            .fetch_task(id)
            .await?
            .ok_or(ApiError::NotFound("Task"))?;
        policy::require(&task, acting_user_id, Action::Delete)?;

        self.tasks.delete_task(id).await?;
        info!(task_id = %id, deleted_by = %acting_user_id, "task deleted");

        // Deletion events carry only the id.
        self.notifier
            .broadcast_all(EVENT_TASK_DELETED, json!({ "id": id }));

        Ok(DeleteConfirmation {
            message: "Task deleted successfully",
        })
    }

    async fn require_user(&self, id: &str) -> Result<(), ApiError> {
        if self.users.user_exists(id).await? {
            Ok(())
        } else {
            Err(ApiError::NotFound("User"))
        }
    }
}

fn task_payload(task: &Task) -> Result<serde_json::Value, ApiError> {
    serde_json::to_value(task).map_err(|e| ApiError::Internal(e.into()))
}
