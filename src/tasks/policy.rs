//! Authorization policy: pure decisions, no side effects.
//!
//! View/Update: creator or current assignee. Delete: creator only.

use crate::error::ApiError;
use crate::tasks::model::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    View,
    Update,
    Delete,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

pub fn permits(task: &Task, acting_user_id: &str, action: Action) -> bool {
    match action {
        Action::View | Action::Update => {
            task.created_by_id == acting_user_id
                || task.assigned_to_id.as_deref() == Some(acting_user_id)
        }
        Action::Delete => task.created_by_id == acting_user_id,
    }
}

/// `Forbidden` carrying the action name when the policy denies.
pub fn require(task: &Task, acting_user_id: &str, action: Action) -> Result<(), ApiError> {
    if permits(task, acting_user_id, action) {
        Ok(())
    } else {
        Err(ApiError::Forbidden {
            action: action.as_str(),
        })
    }
}
