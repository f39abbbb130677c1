use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::visit::{FieldError, Visit, VisitDraft},
    services::wizard::{SectionKind, VisitFormWizard, WizardLayout},
};

/// State of an open entry form as sent to the client after every step.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftView {
    pub draft_id: Uuid,
    pub section: SectionKind,
    pub section_title: &'static str,
    pub section_index: usize,
    pub layout: WizardLayout,
    pub dirty: bool,
    pub draft: VisitDraft,
}

impl DraftView {
    fn from_wizard(draft_id: Uuid, wizard: &VisitFormWizard) -> Self {
        Self {
            draft_id,
            section: wizard.current_section(),
            section_title: wizard.current_section().title(),
            section_index: wizard.section_index(),
            layout: wizard.layout(),
            dirty: wizard.is_dirty(),
            draft: wizard.draft().clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenDraftPayload {
    /// Open an existing visit for editing; a new one is drafted otherwise.
    pub visit_id: Option<Uuid>,
}

/// Opens an entry form. New drafts are prefilled with today's date and,
/// when the account maps to a salesperson, with the caller as primary
/// salesperson. An existing visit outside the caller's scope redirects
/// home like any other refused direct access.
pub async fn open_draft(
    State(app_state): State<AppState>,
    AuthenticatedUser(current): AuthenticatedUser,
    Json(payload): Json<OpenDraftPayload>,
) -> Result<Response, AppError> {
    let draft = match payload.visit_id {
        Some(visit_id) => {
            match app_state
                .visit_service
                .find_visible(&current, visit_id)
                .await?
            {
                Some(visit) => visit.to_draft(),
                None => return Ok(Redirect::to("/").into_response()),
            }
        }
        None => {
            let mut draft = VisitDraft::default();
            draft.visit_date = Some(app_state.config.visit_rules().today);
            if let Some(code) = current.salesperson_code() {
                draft.salesperson1_id = app_state
                    .reference_repo
                    .find_salesperson_by_code(code)
                    .await?
                    .map(|salesperson| salesperson.id);
            }
            draft
        }
    };

    let rules = app_state.config.visit_rules();
    let draft_id = app_state.drafts.create(current.user.id, draft, rules).await;
    let view = app_state
        .drafts
        .read(draft_id, current.user.id, |wizard| {
            DraftView::from_wizard(draft_id, wizard)
        })
        .await?;
    Ok(Json(view).into_response())
}

pub async fn get_draft(
    State(app_state): State<AppState>,
    AuthenticatedUser(current): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DraftView>, AppError> {
    let view = app_state
        .drafts
        .read(id, current.user.id, |wizard| {
            DraftView::from_wizard(id, wizard)
        })
        .await?;
    Ok(Json(view))
}

pub async fn update_draft(
    State(app_state): State<AppState>,
    AuthenticatedUser(current): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(update): Json<VisitDraft>,
) -> Result<Json<DraftView>, AppError> {
    let view = app_state
        .drafts
        .update(id, current.user.id, |wizard| {
            wizard.apply(update);
            DraftView::from_wizard(id, wizard)
        })
        .await?;
    Ok(Json(view))
}

/// Advances to the next section; the current section must validate first.
pub async fn next_section(
    State(app_state): State<AppState>,
    AuthenticatedUser(current): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DraftView>, AppError> {
    let result = app_state
        .drafts
        .update(id, current.user.id, |wizard| {
            wizard
                .next()
                .map(|_| DraftView::from_wizard(id, wizard))
        })
        .await?;
    result.map(Json).map_err(AppError::ConstraintViolations)
}

pub async fn previous_section(
    State(app_state): State<AppState>,
    AuthenticatedUser(current): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DraftView>, AppError> {
    let view = app_state
        .drafts
        .update(id, current.user.id, |wizard| {
            wizard.previous();
            DraftView::from_wizard(id, wizard)
        })
        .await?;
    Ok(Json(view))
}

#[derive(Debug, Deserialize)]
pub struct LayoutPayload {
    pub layout: WizardLayout,
}

pub async fn set_layout(
    State(app_state): State<AppState>,
    AuthenticatedUser(current): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<LayoutPayload>,
) -> Result<Json<DraftView>, AppError> {
    let view = app_state
        .drafts
        .update(id, current.user.id, |wizard| {
            wizard.set_layout(payload.layout);
            DraftView::from_wizard(id, wizard)
        })
        .await?;
    Ok(Json(view))
}

/// Tells the client whether closing now would lose edits, so it can offer
/// save, discard or stay.
pub async fn pending_changes(
    State(app_state): State<AppState>,
    AuthenticatedUser(current): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let dirty = app_state
        .drafts
        .read(id, current.user.id, |wizard| wizard.is_dirty())
        .await?;
    Ok(Json(json!({ "dirty": dirty })))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionStatus {
    pub section: SectionKind,
    pub errors: Vec<FieldError>,
}

/// Validation state of all sections, without moving the form.
pub async fn check_draft(
    State(app_state): State<AppState>,
    AuthenticatedUser(current): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<SectionStatus>>, AppError> {
    let statuses = app_state
        .drafts
        .read(id, current.user.id, |wizard| {
            wizard
                .validate_sections()
                .into_iter()
                .map(|(section, errors)| SectionStatus { section, errors })
                .collect::<Vec<_>>()
        })
        .await?;
    Ok(Json(statuses))
}

pub async fn save_draft(
    State(app_state): State<AppState>,
    AuthenticatedUser(current): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Visit>, AppError> {
    let draft = app_state
        .drafts
        .read(id, current.user.id, |wizard| wizard.draft().clone())
        .await?;

    let visit = app_state.visit_service.save(&current, draft).await?;

    app_state
        .drafts
        .update(id, current.user.id, |wizard| {
            wizard.mark_saved(visit.to_draft());
        })
        .await?;
    Ok(Json(visit))
}

pub async fn discard_draft(
    State(app_state): State<AppState>,
    AuthenticatedUser(current): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DraftView>, AppError> {
    let view = app_state
        .drafts
        .update(id, current.user.id, |wizard| {
            wizard.discard();
            DraftView::from_wizard(id, wizard)
        })
        .await?;
    Ok(Json(view))
}

pub async fn close_draft(
    State(app_state): State<AppState>,
    AuthenticatedUser(current): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    app_state.drafts.remove(id, current.user.id).await?;
    Ok(Json(json!({ "closed": true })))
}
