//! Typed request payloads for task mutations, with explicit field-by-field
//! constraint checks. `validated()` also canonicalizes due dates to RFC 3339
//! UTC so stored timestamps stay string-comparable.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{ApiError, FieldError};
use crate::tasks::model::{TaskPriority, TaskStatus};
use crate::tasks::patch::Field;

fn canonical_due_date(raw: &str) -> Option<String> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc).to_rfc3339())
}

fn check_title(title: &str, errors: &mut Vec<FieldError>) {
    if title.is_empty() {
        errors.push(FieldError::new("title", "Title is required"));
    } else if title.chars().count() > 200 {
        errors.push(FieldError::new("title", "Title too long"));
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    /// Null and absent are equivalent on create: no assignee.
    #[serde(default)]
    pub assigned_to_id: Field<String>,
    #[serde(default)]
    pub due_date: Field<String>,
}

impl CreateTaskInput {
    pub fn validated(mut self) -> Result<Self, ApiError> {
        let mut errors = Vec::new();
        check_title(&self.title, &mut errors);

        if let Field::Value(raw) = &self.due_date {
            match canonical_due_date(raw) {
                Some(normalized) => self.due_date = Field::Value(normalized),
                None => errors.push(FieldError::new("dueDate", "Invalid datetime")),
            }
        }

        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ApiError::Validation(errors))
        }
    }
}

/// Partial update: absent fields are preserved; explicit null clears
/// `assignedToId`, `dueDate`, and `description`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskInput {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Field<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub assigned_to_id: Field<String>,
    #[serde(default)]
    pub due_date: Field<String>,
}

impl UpdateTaskInput {
    pub fn validated(mut self) -> Result<Self, ApiError> {
        let mut errors = Vec::new();
        if let Some(title) = &self.title {
            check_title(title, &mut errors);
        }

        if let Field::Value(raw) = &self.due_date {
            match canonical_due_date(raw) {
                Some(normalized) => self.due_date = Field::Value(normalized),
                None => errors.push(FieldError::new("dueDate", "Invalid datetime")),
            }
        }

        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ApiError::Validation(errors))
        }
    }
}
