// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Manager,
    User,
}

// A user account as stored in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,

    #[serde(skip_serializing)]
    pub password_hash: String,

    pub role: Role,
    pub salesperson_code: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Authenticated caller plus the visibility data derived from their account.
/// Built once per request by the auth middleware and handed to handlers
/// explicitly, never read from ambient state.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    /// Codes of the salespersons overseen by this account (managers only).
    pub managed_salesperson_codes: Vec<String>,
}

impl CurrentUser {
    pub fn is_manager(&self) -> bool {
        self.user.role == Role::Manager
    }

    pub fn salesperson_code(&self) -> Option<&str> {
        self.user.salesperson_code.as_deref()
    }

    pub fn manages(&self, salesperson_code: &str) -> bool {
        self.managed_salesperson_codes
            .iter()
            .any(|code| code == salesperson_code)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginPayload {
    #[validate(length(min = 1, message = "required"))]
    pub username: String,
    #[validate(length(min = 1, message = "required"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub username: String,
    pub role: Role,
    pub salesperson_code: Option<String>,
    pub managed_salesperson_codes: Vec<String>,
}

// JWT claims
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: usize,
    pub iat: usize,
}
