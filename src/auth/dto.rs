use serde::{Deserialize, Serialize};

use crate::{
    auth::{repo_types::User, services::is_valid_email},
    error::FieldError,
};

pub const MIN_PASSWORD_LEN: usize = 6;

/// Request body for local signup.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl SignupRequest {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        if self.full_name.trim().is_empty() {
            errors.push(FieldError::new("fullName", "is required"));
        }
        if self.email.trim().is_empty() {
            errors.push(FieldError::new("email", "is required"));
        } else if !is_valid_email(&self.email) {
            errors.push(FieldError::new("email", "is not a valid email address"));
        }
        if self.password.is_empty() {
            errors.push(FieldError::new("password", "is required"));
        } else if self.password.chars().count() < MIN_PASSWORD_LEN {
            errors.push(FieldError::new(
                "password",
                "must be at least 6 characters long",
            ));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Request body for local signin.
#[derive(Debug, Deserialize)]
pub struct SigninRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl SigninRequest {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        if self.email.trim().is_empty() {
            errors.push(FieldError::new("email", "is required"));
        }
        if self.password.is_empty() {
            errors.push(FieldError::new("password", "is required"));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
}

impl ChangePasswordRequest {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        if self.current_password.is_empty() {
            errors.push(FieldError::new("currentPassword", "is required"));
        }
        if self.new_password.chars().count() < MIN_PASSWORD_LEN {
            errors.push(FieldError::new(
                "newPassword",
                "must be at least 6 characters long",
            ));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Body of both OAuth callbacks.
#[derive(Debug, Deserialize)]
pub struct OAuthCallbackRequest {
    #[serde(default)]
    pub code: String,
}

impl OAuthCallbackRequest {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        if self.code.trim().is_empty() {
            return Err(vec![FieldError::new("code", "is required")]);
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub message: &'static str,
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct SigninResponse {
    pub user: User,
    pub message: &'static str,
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub success: bool,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}
