// rest/routes/auth.rs — registration, login, identity, and the user directory.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::auth::{AuthResponse, UserInfo};
use crate::error::ApiError;
use crate::rest::auth::AuthUser;
use crate::rest::schemas::{LoginRequest, RegisterRequest};
use crate::AppContext;

/// Malformed JSON bodies surface as the same structured validation kind as
/// field-level failures.
fn body_error(rejection: JsonRejection) -> ApiError {
    ApiError::validation("body", rejection.body_text())
}

pub async fn register(
    State(ctx): State<Arc<AppContext>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let Json(req) = payload.map_err(body_error)?;
    req.validate()?;
    let result = ctx
        .auth
        .register(&req.email, &req.name, &req.password)
        .await?;
    Ok((StatusCode::CREATED, Json(result)))
}

pub async fn login(
    State(ctx): State<Arc<AppContext>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let Json(req) = payload.map_err(body_error)?;
    req.validate()?;
    let result = ctx.auth.login(&req.email, &req.password).await?;
    Ok(Json(result))
}

pub async fn me(AuthUser(user): AuthUser) -> Json<Value> {
    Json(json!({ "user": user }))
}

pub async fn list_users(
    State(ctx): State<Arc<AppContext>>,
    AuthUser(_user): AuthUser,
) -> Result<Json<Vec<UserInfo>>, ApiError> {
    let users = ctx.auth.list_users().await?;
    Ok(Json(users))
}
