// src/common/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::models::visit::FieldError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("payload validation failed")]
    ValidationError(#[from] validator::ValidationErrors),

    // Field or entity-level constraint failures from the wizard. Both layers
    // report through the same variant so the response shape stays uniform.
    #[error("constraint check failed")]
    ConstraintViolations(Vec<FieldError>),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid token")]
    InvalidToken,

    #[error("forbidden")]
    Forbidden,

    #[error("user not found")]
    UserNotFound,

    #[error("draft not found")]
    DraftNotFound,

    #[error("visit not found")]
    VisitNotFound,

    #[error("contact not found")]
    ContactNotFound,

    #[error("unknown country code {0}")]
    UnknownCountry(String),

    #[error("visit already validated by {by} on {on}")]
    VisitAlreadyValidated { by: String, on: String },

    #[error("database error")]
    DatabaseError(#[from] sqlx::Error),

    #[error("internal server error")]
    InternalServerError(#[from] anyhow::Error),

    #[error("bcrypt error: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("jwt error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "One or more fields are invalid.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::ConstraintViolations(errors) => {
                let body = Json(json!({
                    "error": "One or more fields are invalid.",
                    "details": errors,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "Invalid username or password.".to_string()),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "Missing or invalid authentication token.".to_string()),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "You are not allowed to perform this action.".to_string()),
            AppError::UserNotFound => (StatusCode::NOT_FOUND, "User not found.".to_string()),
            AppError::DraftNotFound => (StatusCode::NOT_FOUND, "Visit draft not found.".to_string()),
            AppError::VisitNotFound => (StatusCode::NOT_FOUND, "Visit not found.".to_string()),
            AppError::ContactNotFound => (StatusCode::NOT_FOUND, "Contact not found.".to_string()),
            AppError::UnknownCountry(code) => (
                StatusCode::BAD_REQUEST,
                format!("Unknown country code {code}."),
            ),
            AppError::VisitAlreadyValidated { by, on } => (
                StatusCode::CONFLICT,
                format!("The visit was already validated by {by} on {on}."),
            ),

            // Everything else is a 500. The detailed message goes to the log,
            // not to the client.
            ref e => {
                tracing::error!("internal server error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "An unexpected error occurred.".to_string())
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
