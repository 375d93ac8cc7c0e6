use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use tracing::error;

/// One rejected input field.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

impl FieldError {
    pub fn new(field: &'static str, message: &'static str) -> Self {
        Self { field, message }
    }
}

/// Every failure a handler can surface to a client.
///
/// Internal causes are logged when the response is built and never written
/// into the response body.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("validation failed")]
    Validation(Vec<FieldError>),
    #[error("{0}")]
    BadRequest(String),
    #[error("email already exists")]
    DuplicateEmail,
    #[error("invalid login credentials")]
    InvalidCredentials,
    #[error("session token missing")]
    Unauthorized,
    #[error("session token invalid")]
    Forbidden,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("authentication failed: {0:#}")]
    AuthenticationFailed(anyhow::Error),
    #[error("{context}: {cause:#}")]
    Upstream {
        context: &'static str,
        cause: anyhow::Error,
    },
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn upstream(context: &'static str, cause: impl Into<anyhow::Error>) -> Self {
        Self::Upstream {
            context,
            cause: cause.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) | AppError::DuplicateEmail => {
                StatusCode::BAD_REQUEST
            }
            AppError::InvalidCredentials | AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AuthenticationFailed(_)
            | AppError::Upstream { .. }
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::Validation(details) => {
                json!({ "error": "Validation failed", "details": details })
            }
            AppError::BadRequest(msg) => json!({ "error": msg }),
            AppError::DuplicateEmail => json!({ "error": "Email already exists" }),
            AppError::InvalidCredentials => json!({ "error": "Invalid login credentials" }),
            AppError::Unauthorized => json!({ "error": "Access denied, token missing" }),
            AppError::Forbidden => json!({ "error": "Invalid token" }),
            AppError::NotFound(what) => json!({ "error": format!("{what} not found") }),
            AppError::AuthenticationFailed(e) => {
                error!(error = %format!("{e:#}"), "oauth flow failed");
                json!({ "success": false, "error": "Authentication failed" })
            }
            AppError::Upstream { context, cause } => {
                error!(error = %format!("{cause:#}"), "{}", context);
                json!({ "error": format!("{context}.") })
            }
            AppError::Internal(e) => {
                error!(error = %format!("{e:#}"), "internal error");
                json!({ "error": "Internal server error" })
            }
        };
        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
