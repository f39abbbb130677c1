use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::{common::error::AppError, config::AppState, models::phone::PhoneNumber};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsePhonePayload {
    pub raw: String,
    /// ISO country hint; the configured default applies otherwise.
    pub country_code: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsePhoneResponse {
    #[serde(flatten)]
    pub phone: PhoneNumber,
    /// National display form, present when formatting is enabled.
    pub formatted: Option<String>,
}

/// Normalizes free-form phone input for the entry form. Always answers;
/// unusable input comes back with its status rather than an error.
pub async fn parse_phone(
    State(app_state): State<AppState>,
    Json(payload): Json<ParsePhonePayload>,
) -> Result<Json<ParsePhoneResponse>, AppError> {
    let phone = match payload.country_code.as_deref() {
        Some(country) => app_state
            .phone_service
            .parse_with_country(&payload.raw, country),
        None => app_state.phone_service.parse(&payload.raw),
    };

    let formatted = if app_state.config.phone_formatting_enabled {
        Some(app_state.phone_service.format(&phone))
    } else {
        None
    };

    Ok(Json(ParsePhoneResponse { phone, formatted }))
}
