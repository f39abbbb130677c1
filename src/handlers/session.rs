use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::{common::error::AppError, config::AppState, middleware::auth::AuthenticatedUser};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesPayload {
    pub font_size_level: u8,
}

pub async fn get_preferences(
    State(app_state): State<AppState>,
    AuthenticatedUser(current): AuthenticatedUser,
) -> Result<Json<PreferencesPayload>, AppError> {
    let font_size_level = app_state.preferences.font_level(current.user.id).await;
    Ok(Json(PreferencesPayload { font_size_level }))
}

/// Stores the accessibility font level for the session. Out-of-range
/// values are clamped and the applied value is echoed back.
pub async fn set_preferences(
    State(app_state): State<AppState>,
    AuthenticatedUser(current): AuthenticatedUser,
    Json(payload): Json<PreferencesPayload>,
) -> Result<Json<PreferencesPayload>, AppError> {
    let font_size_level = app_state
        .preferences
        .set_font_level(current.user.id, payload.font_size_level)
        .await;
    Ok(Json(PreferencesPayload { font_size_level }))
}
