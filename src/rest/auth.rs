// rest/auth.rs — Bearer-token extractor for authenticated routes.

use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use std::sync::Arc;

use crate::auth::PublicUser;
use crate::error::ApiError;
use crate::AppContext;

/// The verified identity behind an `Authorization: Bearer <jwt>` header.
/// Routes that take this extractor reject unauthenticated requests with 401
/// before the handler body runs.
pub struct AuthUser(pub PublicUser);

impl FromRequestParts<Arc<AppContext>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppContext>,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthenticated("No token provided"))?;

        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthenticated("No token provided"))?;

        let user = state.auth.verify_token(token).await?;
        Ok(AuthUser(user))
    }
}
