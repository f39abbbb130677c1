use axum::{extract::State, Json};
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::auth::{AuthResponse, LoginPayload, MeResponse},
};

pub async fn login(
    State(app_state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<AuthResponse>, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let token = app_state
        .auth_service
        .login_user(&payload.username, &payload.password)
        .await?;

    Ok(Json(AuthResponse { token }))
}

pub async fn get_me(AuthenticatedUser(current): AuthenticatedUser) -> Json<MeResponse> {
    Json(MeResponse {
        username: current.user.username.clone(),
        role: current.user.role,
        salesperson_code: current.user.salesperson_code.clone(),
        managed_salesperson_codes: current.managed_salesperson_codes,
    })
}
