//! Task query engine: filter/sort over the requester's visible task set.
//!
//! The base visibility filter (creator or assignee) is applied by the store
//! in SQL and cannot be overridden here — this module only narrows and
//! orders what the store already scoped to the requesting user.

use serde::Deserialize;

use crate::error::{ApiError, FieldError};
use crate::tasks::model::{Task, TaskPriority, TaskStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    #[default]
    CreatedAt,
    DueDate,
    Priority,
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Raw query parameters as they arrive on the list endpoint. Everything is
/// an optional string; `TaskQuery::parse` turns them into typed values with
/// field-level validation errors.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTaskQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub assigned_to_id: Option<String>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TaskQuery {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to_id: Option<String>,
    pub search: Option<String>,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
}

impl TaskQuery {
    /// Field-by-field constraint check over the raw parameters. Collects all
    /// failures rather than stopping at the first.
    pub fn parse(raw: RawTaskQuery) -> Result<Self, ApiError> {
        let mut errors = Vec::new();

        let status = match raw.status.as_deref() {
            None => None,
            Some(s) => match TaskStatus::parse(s) {
                Some(v) => Some(v),
                None => {
                    errors.push(FieldError::new(
                        "status",
                        "Expected TODO | IN_PROGRESS | DONE",
                    ));
                    None
                }
            },
        };

        let priority = match raw.priority.as_deref() {
            None => None,
            Some(s) => match TaskPriority::parse(s) {
                Some(v) => Some(v),
                None => {
                    errors.push(FieldError::new("priority", "Expected LOW | MEDIUM | HIGH"));
                    None
                }
            },
        };

        let sort_by = match raw.sort_by.as_deref() {
            None => SortBy::default(),
            Some("createdAt") => SortBy::CreatedAt,
            Some("dueDate") => SortBy::DueDate,
            Some("priority") => SortBy::Priority,
            Some("status") => SortBy::Status,
            Some(_) => {
                errors.push(FieldError::new(
                    "sortBy",
                    "Expected createdAt | dueDate | priority | status",
                ));
                SortBy::default()
            }
        };

        let sort_order = match raw.sort_order.as_deref() {
            None => SortOrder::default(),
            Some("asc") => SortOrder::Asc,
            Some("desc") => SortOrder::Desc,
            Some(_) => {
                errors.push(FieldError::new("sortOrder", "Expected asc | desc"));
                SortOrder::default()
            }
        };

        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }

        Ok(Self {
            status,
            priority,
            assigned_to_id: raw.assigned_to_id,
            search: raw.search,
            sort_by,
            sort_order,
        })
    }

    /// Narrow and order the visible set.
    ///
    /// When `search` is present it REPLACES the status/priority/assignee
    /// narrowing entirely: a case-sensitive substring match on title or
    /// description is the only filter applied. Existing clients depend on
    /// this exact behavior; the visibility scope the store applied
    /// beforehand is unaffected either way.
    pub fn apply(&self, mut tasks: Vec<Task>) -> Vec<Task> {
        if let Some(search) = self.search.as_deref() {
            tasks.retain(|t| {
                t.title.contains(search)
                    || t.description
                        .as_deref()
                        .is_some_and(|d| d.contains(search))
            });
        } else {
            if let Some(status) = self.status {
                tasks.retain(|t| t.status == status);
            }
            if let Some(priority) = self.priority {
                tasks.retain(|t| t.priority == priority);
            }
            if let Some(assignee) = self.assigned_to_id.as_deref() {
                tasks.retain(|t| t.assigned_to_id.as_deref() == Some(assignee));
            }
        }

        // Ties break by createdAt descending so result order is deterministic.
        // Timestamps are uniform RFC 3339 UTC strings, so string comparison is
        // chronological comparison.
        tasks.sort_by(|a, b| {
            let ord = match self.sort_by {
                SortBy::CreatedAt => a.created_at.cmp(&b.created_at),
                SortBy::DueDate => cmp_due_date(a.due_date.as_deref(), b.due_date.as_deref()),
                SortBy::Priority => a.priority.cmp(&b.priority),
                SortBy::Status => a.status.cmp(&b.status),
            };
            let ord = match self.sort_order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            };
            ord.then_with(|| b.created_at.cmp(&a.created_at))
        });

        tasks
    }
}

/// Tasks without a due date sort as if their deadline were infinitely far
/// out: after all dated tasks ascending, before them descending.
fn cmp_due_date(a: Option<&str>, b: Option<&str>) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => a.cmp(b),
    }
}
