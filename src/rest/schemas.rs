//! Request payloads for the auth endpoints, with the same explicit
//! field-by-field checks the task inputs use.

use serde::Deserialize;

use crate::error::{ApiError, FieldError};

fn looks_like_email(s: &str) -> bool {
    match s.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = Vec::new();
        if !looks_like_email(&self.email) {
            errors.push(FieldError::new("email", "Invalid email address"));
        }
        if self.password.chars().count() < 8 {
            errors.push(FieldError::new(
                "password",
                "Password must be at least 8 characters",
            ));
        }
        if self.name.chars().count() < 2 {
            errors.push(FieldError::new("name", "Name must be at least 2 characters"));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(errors))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = Vec::new();
        if !looks_like_email(&self.email) {
            errors.push(FieldError::new("email", "Invalid email address"));
        }
        if self.password.is_empty() {
            errors.push(FieldError::new("password", "Password is required"));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_collects_all_field_errors() {
        let req = RegisterRequest {
            email: "not-an-email".into(),
            name: "A".into(),
            password: "short".into(),
        };
        match req.validate() {
            Err(ApiError::Validation(errors)) => {
                let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
                assert_eq!(fields, vec!["email", "password", "name"]);
            }
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn valid_register_passes() {
        let req = RegisterRequest {
            email: "alice@example.com".into(),
            name: "Alice".into(),
            password: "password123".into(),
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn login_requires_nonempty_password_only() {
        let req = LoginRequest {
            email: "alice@example.com".into(),
            password: "x".into(),
        };
        assert!(req.validate().is_ok());
    }
}
