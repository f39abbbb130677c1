use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    models::{phone::PhoneStatus, visit::Contact},
    services::matching,
};

pub async fn list_clients(
    State(app_state): State<AppState>,
) -> Result<Json<Vec<Contact>>, AppError> {
    Ok(Json(app_state.contact_repo.list_clients().await?))
}

pub async fn list_prospects(
    State(app_state): State<AppState>,
) -> Result<Json<Vec<Contact>>, AppError> {
    Ok(Json(app_state.contact_repo.list_prospects().await?))
}

pub async fn get_client(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Contact>, AppError> {
    app_state
        .contact_repo
        .find_client(id)
        .await?
        .map(Json)
        .ok_or(AppError::ContactNotFound)
}

pub async fn get_prospect(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Contact>, AppError> {
    app_state
        .contact_repo
        .find_prospect(id)
        .await?
        .map(Json)
        .ok_or(AppError::ContactNotFound)
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProspectPayload {
    #[validate(length(min = 1, message = "required"))]
    pub name: String,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub country_code: Option<String>,
    pub phone_fixed: Option<String>,
    pub phone_mobile: Option<String>,
    /// Set after the caller has reviewed the near-duplicate warning.
    #[serde(default)]
    pub confirmed: bool,
}

/// Creates a prospect. Unless the caller has confirmed, the name is first
/// checked against existing clients and prospects and near-duplicates come
/// back as a conflict instead of a new row. Phone numbers are normalized
/// on the way in when phone validation is enabled.
pub async fn create_prospect(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateProspectPayload>,
) -> Result<Response, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;
    let config = &app_state.config;

    if config.fuzzy_matching_enabled && !payload.confirmed {
        let mut names: Vec<String> = Vec::new();
        for contact in app_state.contact_repo.list_clients().await? {
            names.push(contact.name);
        }
        for contact in app_state.contact_repo.list_prospects().await? {
            names.push(contact.name);
        }
        let matches = matching::rank_matches(
            &payload.name,
            names.iter().map(String::as_str),
            config.fuzzy_matching_threshold,
            config.fuzzy_matching_limit,
        );
        if !matches.is_empty() {
            let body = Json(json!({
                "error": "Similar contacts already exist.",
                "matches": matches,
            }));
            return Ok((StatusCode::CONFLICT, body).into_response());
        }
    }

    // a country, when given, must come from the reference table
    let country = match &payload.country_code {
        Some(code) => app_state
            .reference_repo
            .find_country_by_code(code)
            .await?
            .map(|c| c.code)
            .ok_or_else(|| AppError::UnknownCountry(code.clone()))?,
        None => config.default_country_code.clone(),
    };
    let phone_fixed = normalize_phone(&app_state, payload.phone_fixed.as_deref(), &country);
    let phone_mobile = normalize_phone(&app_state, payload.phone_mobile.as_deref(), &country);

    let prospect = app_state
        .contact_repo
        .create_prospect(
            &payload.name,
            payload.address1.as_deref(),
            payload.address2.as_deref(),
            payload.postal_code.as_deref(),
            payload.city.as_deref(),
            payload.country_code.as_deref(),
            phone_fixed.as_deref(),
            phone_mobile.as_deref(),
        )
        .await?;

    tracing::info!(prospect_id = %prospect.id, "prospect created");
    Ok((StatusCode::CREATED, Json(prospect)).into_response())
}

// Stores the full international form when the number parses, the raw input
// otherwise. Raw input passes through untouched when validation is off.
fn normalize_phone(app_state: &AppState, raw: Option<&str>, country: &str) -> Option<String> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    if !app_state.config.phone_validation_enabled {
        return Some(raw.to_string());
    }
    let parsed = app_state.phone_service.parse_with_country(raw, country);
    match parsed.status {
        PhoneStatus::Valid | PhoneStatus::Unknown => Some(parsed.full_number()),
        _ => Some(raw.to_string()),
    }
}
