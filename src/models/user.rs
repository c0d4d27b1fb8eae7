//! User and authentication request models.

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Minimum password length accepted at registration.
pub const MIN_PASSWORD_LEN: usize = 6;

/// A signed-in user. Never carries a password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
}

/// Request body for logging in.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for registering a new account.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub confirm_password: Option<String>,
}

impl RegisterRequest {
    /// Form-level checks performed before the auth store is consulted.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() || self.email.trim().is_empty() {
            return Err(AppError::Validation(
                "Please fill in all fields".to_string(),
            ));
        }

        if let Some(confirm) = &self.confirm_password {
            if confirm != &self.password {
                return Err(AppError::Validation("Passwords do not match".to_string()));
            }
        }

        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        Ok(())
    }
}
