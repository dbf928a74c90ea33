// auth/mod.rs — registration, login, and token verification.
//
// The task layer never sees credentials: it receives an already-verified
// acting user id from the HTTP extractor or the WebSocket admission
// handshake, both of which go through `AuthService::verify_token`.

pub mod password;
pub mod token;

use serde::Serialize;
use std::sync::Arc;

use crate::error::ApiError;
use crate::storage::{Storage, UserRow};
use token::TokenKeys;

/// User identity as exposed over the API — no password hash.
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub id: String,
    pub email: String,
    pub name: String,
}

impl From<&UserRow> for PublicUser {
    fn from(row: &UserRow) -> Self {
        Self {
            id: row.id.clone(),
            email: row.email.clone(),
            name: row.name.clone(),
        }
    }
}

/// Directory entry for the assignment picker (`GET /api/auth/users`).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: String,
    pub email: String,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Registration/login response: the user plus a signed token.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: PublicUser,
    pub token: String,
}

pub struct AuthService {
    storage: Arc<Storage>,
    keys: TokenKeys,
}

impl AuthService {
    pub fn new(storage: Arc<Storage>, keys: TokenKeys) -> Self {
        Self { storage, keys }
    }

    /// Create a user and issue a token. Fails `Conflict` when the email is
    /// already registered.
    pub async fn register(
        &self,
        email: &str,
        name: &str,
        plain_password: &str,
    ) -> Result<AuthResponse, ApiError> {
        if self.storage.find_user_by_email(email).await?.is_some() {
            return Err(ApiError::Conflict(
                "User with this email already exists".to_string(),
            ));
        }

        let hash = password::hash_password(plain_password)?;
        let user = self.storage.create_user(email, name, &hash).await?;
        let token = self.keys.issue(&user.id)?;

        Ok(AuthResponse {
            user: PublicUser::from(&user),
            token,
        })
    }

    /// Verify credentials and issue a token. Unknown email and wrong password
    /// are indistinguishable to the caller.
    pub async fn login(&self, email: &str, plain_password: &str) -> Result<AuthResponse, ApiError> {
        let user = self
            .storage
            .find_user_by_email(email)
            .await?
            .ok_or(ApiError::Unauthenticated("Invalid credentials"))?;

        if !password::verify_password(plain_password, &user.password_hash) {
            return Err(ApiError::Unauthenticated("Invalid credentials"));
        }

        let token = self.keys.issue(&user.id)?;
        Ok(AuthResponse {
            user: PublicUser::from(&user),
            token,
        })
    }

    /// Verify a token and load the user it identifies. Used by both the HTTP
    /// Bearer extractor and WebSocket connection admission.
    pub async fn verify_token(&self, token: &str) -> Result<PublicUser, ApiError> {
        let user_id = self.keys.verify(token)?;
        let user = self
            .storage
            .find_user_by_id(&user_id)
            .await?
            .ok_or(ApiError::Unauthenticated("Invalid or expired token"))?;
        Ok(PublicUser::from(&user))
    }

    /// All registered users, for the assignment picker.
    pub async fn list_users(&self) -> Result<Vec<UserInfo>, ApiError> {
        let rows = self.storage.list_users().await?;
        Ok(rows
            .into_iter()
            .map(|u| UserInfo {
                id: u.id,
                email: u.email,
                name: u.name,
                created_at: u.created_at,
                updated_at: u.updated_at,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_auth() -> AuthService {
        let dir = tempfile::tempdir().unwrap().keep();
        let storage = Arc::new(Storage::new(&dir).await.unwrap());
        AuthService::new(storage, TokenKeys::new("test-secret", 7))
    }

    #[tokio::test]
    async fn register_login_verify() {
        let auth = test_auth().await;
        let reg = auth
            .register("alice@example.com", "Alice", "password123")
            .await
            .unwrap();
        assert_eq!(reg.user.email, "alice@example.com");

        let login = auth
            .login("alice@example.com", "password123")
            .await
            .unwrap();
        let verified = auth.verify_token(&login.token).await.unwrap();
        assert_eq!(verified.id, reg.user.id);
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let auth = test_auth().await;
        auth.register("a@example.com", "A", "password123")
            .await
            .unwrap();
        let err = auth
            .register("a@example.com", "A2", "password456")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn bad_credentials_are_indistinguishable() {
        let auth = test_auth().await;
        auth.register("a@example.com", "A", "password123")
            .await
            .unwrap();

        let unknown = auth.login("nobody@example.com", "password123").await;
        let wrong = auth.login("a@example.com", "nope-nope-nope").await;
        for err in [unknown.unwrap_err(), wrong.unwrap_err()] {
            match err {
                ApiError::Unauthenticated(msg) => assert_eq!(msg, "Invalid credentials"),
                other => panic!("expected Unauthenticated, got {other:?}"),
            }
        }
    }
}
