use axum::{extract::State, Json};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::visit::{Country, ReferenceItem, Salesperson},
};

/// Salespersons offered by the entry-form picker. Accounts that have left
/// are hidden, and a restricted manager only sees the salespersons they
/// manage.
pub async fn list_salespersons(
    State(app_state): State<AppState>,
    AuthenticatedUser(current): AuthenticatedUser,
) -> Result<Json<Vec<Salesperson>>, AppError> {
    let mut salespersons = app_state.reference_repo.list_salespersons().await?;
    salespersons.retain(|s| s.left_on.is_none());

    if current.is_manager() && app_state.config.restrict_salesperson_picker_to_managed {
        salespersons.retain(|s| current.manages(&s.code));
    }
    Ok(Json(salespersons))
}

pub async fn list_countries(
    State(app_state): State<AppState>,
) -> Result<Json<Vec<Country>>, AppError> {
    Ok(Json(app_state.reference_repo.list_countries().await?))
}

pub async fn list_visit_reasons(
    State(app_state): State<AppState>,
) -> Result<Json<Vec<ReferenceItem>>, AppError> {
    Ok(Json(app_state.reference_repo.list_visit_reasons().await?))
}

pub async fn list_next_visit_reasons(
    State(app_state): State<AppState>,
) -> Result<Json<Vec<ReferenceItem>>, AppError> {
    Ok(Json(
        app_state.reference_repo.list_next_visit_reasons().await?,
    ))
}

pub async fn list_product_lines(
    State(app_state): State<AppState>,
) -> Result<Json<Vec<ReferenceItem>>, AppError> {
    Ok(Json(app_state.reference_repo.list_product_lines().await?))
}

pub async fn list_competitors(
    State(app_state): State<AppState>,
) -> Result<Json<Vec<ReferenceItem>>, AppError> {
    Ok(Json(app_state.reference_repo.list_competitors().await?))
}
