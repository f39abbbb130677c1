use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    db::VisitFilters,
    middleware::auth::AuthenticatedUser,
    models::visit::{ContactType, Visit},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitListQuery {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub salesperson_code: Option<String>,
    pub contact_type: Option<ContactType>,
    pub validated: Option<bool>,
}

impl VisitListQuery {
    fn into_filters(self) -> VisitFilters {
        VisitFilters {
            date_from: self.date_from,
            date_to: self.date_to,
            salesperson_code: self.salesperson_code,
            contact_type: self.contact_type,
            validated: self.validated,
        }
    }
}

pub async fn list_visits(
    State(app_state): State<AppState>,
    AuthenticatedUser(current): AuthenticatedUser,
    Query(query): Query<VisitListQuery>,
) -> Result<Json<Vec<Visit>>, AppError> {
    let visits = app_state
        .visit_service
        .list(&current, &query.into_filters())
        .await?;
    Ok(Json(visits))
}

/// Direct access by id. A visit that is missing or outside the caller's
/// scope answers with a redirect to the home page, not an error.
pub async fn get_visit(
    State(app_state): State<AppState>,
    AuthenticatedUser(current): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    match app_state.visit_service.find_visible(&current, id).await? {
        Some(visit) => Ok(Json(visit).into_response()),
        None => {
            tracing::warn!(visit_id = %id, user = %current.user.username, "visit access refused, redirecting home");
            Ok(Redirect::to("/").into_response())
        }
    }
}

pub async fn validate_visit(
    State(app_state): State<AppState>,
    AuthenticatedUser(current): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Visit>, AppError> {
    let visit = app_state.visit_service.validate_visit(&current, id).await?;
    Ok(Json(visit))
}
