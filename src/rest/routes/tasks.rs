// rest/routes/tasks.rs — task CRUD + list endpoints.
//
// Handlers stay thin: deserialize, then hand off to the orchestrator, which
// owns validation, authorization, persistence, and event broadcast.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;

use crate::error::ApiError;
use crate::rest::auth::AuthUser;
use crate::tasks::input::{CreateTaskInput, UpdateTaskInput};
use crate::tasks::model::Task;
use crate::tasks::query::RawTaskQuery;
use crate::tasks::service::DeleteConfirmation;
use crate::AppContext;

fn body_error(rejection: JsonRejection) -> ApiError {
    ApiError::validation("body", rejection.body_text())
}

pub async fn create_task(
    State(ctx): State<Arc<AppContext>>,
    AuthUser(user): AuthUser,
    payload: Result<Json<CreateTaskInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let Json(input) = payload.map_err(body_error)?;
    let task = ctx.task_service.create_task(input, &user.id).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn list_tasks(
    State(ctx): State<Arc<AppContext>>,
    AuthUser(user): AuthUser,
    Query(raw): Query<RawTaskQuery>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let tasks = ctx.task_service.list_tasks(raw, &user.id).await?;
    Ok(Json(tasks))
}

pub async fn get_task(
    State(ctx): State<Arc<AppContext>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    let task = ctx.task_service.get_task(&id, &user.id).await?;
    Ok(Json(task))
}

pub async fn update_task(
    State(ctx): State<Arc<AppContext>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<UpdateTaskInput>, JsonRejection>,
) -> Result<Json<Task>, ApiError> {
    let Json(patch) = payload.map_err(body_error)?;
    let task = ctx.task_service.update_task(&id, patch, &user.id).await?;
    Ok(Json(task))
}

pub async fn delete_task(
    State(ctx): State<Arc<AppContext>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<DeleteConfirmation>, ApiError> {
    let confirmation = ctx.task_service.delete_task(&id, &user.id).await?;
    Ok(Json(confirmation))
}
