//! HS256 JWT issuance and verification.

use anyhow::Result;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id the token was issued to.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signing/verification key pair plus the configured token lifetime.
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenKeys {
    pub fn new(secret: &str, ttl_days: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::days(ttl_days),
        }
    }

    /// Sign a token for `user_id`, expiring after the configured lifetime
    /// (default 7 days).
    pub fn issue(&self, user_id: &str) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    /// Verify a token and return the user id it was issued to.
    /// Expired or tampered tokens fail `Unauthenticated`.
    pub fn verify(&self, token: &str) -> Result<String, ApiError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims.sub)
            .map_err(|_| ApiError::Unauthenticated("Invalid or expired token"))
    }
}

/// Return the JWT signing secret for this install.
///
/// On first call, generates a random secret and writes it to
/// `{data_dir}/jwt_secret` with user-only read/write permissions (mode 0600
/// on Unix). On subsequent calls, reads and returns the existing secret.
///
/// The secret file must be kept private — anyone holding it can mint tokens
/// for any user.
pub fn get_or_create_secret(data_dir: &Path) -> Result<String> {
    let path = data_dir.join("jwt_secret");

    if path.exists() {
        let secret = std::fs::read_to_string(&path)?.trim().to_string();
        if !secret.is_empty() {
            return Ok(secret);
        }
    }

    // Two v4 UUIDs, hex without dashes = 64 chars of randomness
    let secret = format!(
        "{}{}",
        Uuid::new_v4().to_string().replace('-', ""),
        Uuid::new_v4().to_string().replace('-', "")
    );

    std::fs::create_dir_all(data_dir)?;
    std::fs::write(&path, &secret)?;

    // Restrict to owner read/write only on Unix
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))?;
    }

    Ok(secret)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_then_verify() {
        let keys = TokenKeys::new("test-secret", 7);
        let token = keys.issue("user-1").unwrap();
        assert_eq!(keys.verify(&token).unwrap(), "user-1");
    }

    #[test]
    fn wrong_secret_rejected() {
        let keys = TokenKeys::new("secret-a", 7);
        let other = TokenKeys::new("secret-b", 7);
        let token = keys.issue("user-1").unwrap();
        assert!(matches!(
            other.verify(&token),
            Err(ApiError::Unauthenticated(_))
        ));
    }

    #[test]
    fn garbage_token_rejected() {
        let keys = TokenKeys::new("test-secret", 7);
        assert!(keys.verify("not.a.jwt").is_err());
    }

    #[test]
    fn secret_file_is_stable_across_calls() {
        let dir = tempfile::tempdir().unwrap();
        let first = get_or_create_secret(dir.path()).unwrap();
        let second = get_or_create_secret(dir.path()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
    }
}
