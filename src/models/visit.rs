// src/models/visit.rs

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// --- ENUMS ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "contact_type", rename_all = "lowercase")]
pub enum ContactType {
    Client,
    Prospect,
}

// --- REFERENCE DATA ---

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Salesperson {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub left_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Country {
    pub id: Uuid,
    pub code: String,
    pub label: String,
}

// Visit reasons, next-visit reasons, product lines and competitors all share
// this id + label shape.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceItem {
    pub id: Uuid,
    pub label: String,
}

// Read shape shared by clients and prospects.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: Uuid,
    pub code: Option<i64>,
    pub name: String,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub country_code: Option<String>,
    pub phone_fixed: Option<String>,
    pub phone_mobile: Option<String>,
}

// --- VISIT (persisted shape) ---

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Visit {
    pub id: Uuid,
    /// ERP order number, assigned on first save.
    pub code: Option<i64>,
    pub visit_date: NaiveDate,

    pub salesperson1_id: Uuid,
    pub salesperson1_code: String,
    pub salesperson2_id: Option<Uuid>,
    pub salesperson2_code: Option<String>,

    pub contact_type: ContactType,
    pub client_id: Option<Uuid>,
    pub prospect_id: Option<Uuid>,

    pub visit_reason_id: Uuid,
    pub contact_name: String,
    pub contact_role: String,
    pub notes: String,

    pub follow_up: bool,
    pub follow_up_start: Option<NaiveDate>,
    pub follow_up_end: Option<NaiveDate>,
    pub next_visit_reason_id: Option<Uuid>,
    pub next_visit_salesperson_id: Option<Uuid>,

    pub validated_by: Option<String>,
    pub validated_at: Option<NaiveDate>,

    pub created_at: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<String>,

    #[sqlx(skip)]
    pub product_line_ids: Vec<Uuid>,
    #[sqlx(skip)]
    pub competitor_ids: Vec<Uuid>,
}

impl Visit {
    pub fn to_draft(&self) -> VisitDraft {
        VisitDraft {
            id: Some(self.id),
            code: self.code,
            visit_date: Some(self.visit_date),
            salesperson1_id: Some(self.salesperson1_id),
            salesperson2_id: self.salesperson2_id,
            contact_type: Some(self.contact_type),
            client_id: self.client_id,
            prospect_id: self.prospect_id,
            visit_reason_id: Some(self.visit_reason_id),
            contact_name: Some(self.contact_name.clone()),
            contact_role: Some(self.contact_role.clone()),
            product_line_ids: self.product_line_ids.iter().copied().collect(),
            competitor_ids: self.competitor_ids.iter().copied().collect(),
            notes: self.notes.clone(),
            follow_up: self.follow_up,
            follow_up_start: self.follow_up_start,
            follow_up_end: self.follow_up_end,
            next_visit_reason_id: self.next_visit_reason_id,
            next_visit_salesperson_id: self.next_visit_salesperson_id,
            validated_by: self.validated_by.clone(),
            validated_at: self.validated_at,
            created_at: self.created_at,
            created_by: self.created_by.clone(),
            updated_at: self.updated_at,
            updated_by: self.updated_by.clone(),
        }
    }
}

// --- DRAFT (edited shape) ---

/// Value-type snapshot of a visit while it is being edited in the wizard.
/// Structural equality against the last-saved baseline drives the
/// unsaved-changes guard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitDraft {
    pub id: Option<Uuid>,
    pub code: Option<i64>,
    pub visit_date: Option<NaiveDate>,

    pub salesperson1_id: Option<Uuid>,
    pub salesperson2_id: Option<Uuid>,

    pub contact_type: Option<ContactType>,
    pub client_id: Option<Uuid>,
    pub prospect_id: Option<Uuid>,

    pub visit_reason_id: Option<Uuid>,
    pub contact_name: Option<String>,
    pub contact_role: Option<String>,

    pub product_line_ids: BTreeSet<Uuid>,
    pub competitor_ids: BTreeSet<Uuid>,
    pub notes: String,

    pub follow_up: bool,
    pub follow_up_start: Option<NaiveDate>,
    pub follow_up_end: Option<NaiveDate>,
    pub next_visit_reason_id: Option<Uuid>,
    pub next_visit_salesperson_id: Option<Uuid>,

    pub validated_by: Option<String>,
    pub validated_at: Option<NaiveDate>,

    pub created_at: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<String>,
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}

impl VisitDraft {
    pub fn is_validated(&self) -> bool {
        !is_blank(&self.validated_by) && self.validated_at.is_some()
    }

    /// Entity-level constraint check, independent from the wizard's
    /// per-section validation. Both must pass before a save.
    pub fn check_constraints(&self, rules: &VisitRules) -> Vec<FieldError> {
        let mut errors = Vec::new();
        let (min_date, max_date) = rules.date_window();

        match self.visit_date {
            None => errors.push(FieldError::new("visitDate", "required")),
            Some(date) => {
                if date <= min_date || date >= max_date {
                    errors.push(FieldError::new(
                        "visitDate",
                        format!("must fall between {min_date} and {max_date}"),
                    ));
                }
            }
        }

        if self.salesperson1_id.is_none() {
            errors.push(FieldError::new("salesperson1Id", "required"));
        }
        if self.salesperson2_id.is_some() && self.salesperson2_id == self.salesperson1_id {
            errors.push(FieldError::new(
                "salesperson2Id",
                "salespersons must differ",
            ));
        }

        match self.contact_type {
            None => errors.push(FieldError::new("contactType", "required")),
            Some(ContactType::Client) => {
                if self.client_id.is_none() {
                    errors.push(FieldError::new("clientId", "required"));
                }
                if self.prospect_id.is_some() {
                    errors.push(FieldError::new("prospectId", "must be empty for a client visit"));
                }
            }
            Some(ContactType::Prospect) => {
                if self.prospect_id.is_none() {
                    errors.push(FieldError::new("prospectId", "required"));
                }
                if self.client_id.is_some() {
                    errors.push(FieldError::new("clientId", "must be empty for a prospect visit"));
                }
            }
        }

        if self.visit_reason_id.is_none() {
            errors.push(FieldError::new("visitReasonId", "required"));
        }
        if is_blank(&self.contact_name) {
            errors.push(FieldError::new("contactName", "required"));
        }
        if is_blank(&self.contact_role) {
            errors.push(FieldError::new("contactRole", "required"));
        }
        if self.product_line_ids.is_empty() {
            errors.push(FieldError::new("productLineIds", "at least one required"));
        }
        if self.competitor_ids.is_empty() {
            errors.push(FieldError::new("competitorIds", "at least one required"));
        }

        if self.follow_up {
            match (self.follow_up_start, self.visit_date) {
                (Some(start), Some(date)) if start > date => {}
                _ => errors.push(FieldError::new(
                    "followUpStart",
                    "must be a date after the visit date",
                )),
            }
            match (self.follow_up_end, self.follow_up_start) {
                (Some(end), Some(start)) if end >= start => {}
                _ => errors.push(FieldError::new(
                    "followUpEnd",
                    "must not be before the follow-up start date",
                )),
            }
            if self.next_visit_reason_id.is_none() {
                errors.push(FieldError::new("nextVisitReasonId", "required"));
            }
        }

        errors
    }
}

// --- VALIDATION SUPPORT ---

/// Date-window rules for visit entry, taken from the configuration.
#[derive(Debug, Clone, Copy)]
pub struct VisitRules {
    pub today: NaiveDate,
    pub days_before_today: i64,
    pub days_after_today: i64,
}

impl VisitRules {
    /// Exclusive bounds: a valid visit date is strictly inside the window.
    pub fn date_window(&self) -> (NaiveDate, NaiveDate) {
        (
            self.today - chrono::Duration::days(self.days_before_today),
            self.today + chrono::Duration::days(self.days_after_today),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> VisitRules {
        VisitRules {
            today: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            days_before_today: 60,
            days_after_today: 60,
        }
    }

    fn complete_draft() -> VisitDraft {
        VisitDraft {
            visit_date: Some(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()),
            salesperson1_id: Some(Uuid::new_v4()),
            contact_type: Some(ContactType::Client),
            client_id: Some(Uuid::new_v4()),
            visit_reason_id: Some(Uuid::new_v4()),
            contact_name: Some("Durand".into()),
            contact_role: Some("Buyer".into()),
            product_line_ids: [Uuid::new_v4()].into_iter().collect(),
            competitor_ids: [Uuid::new_v4()].into_iter().collect(),
            ..VisitDraft::default()
        }
    }

    #[test]
    fn complete_draft_passes_constraints() {
        assert!(complete_draft().check_constraints(&rules()).is_empty());
    }

    #[test]
    fn same_salespersons_rejected() {
        let mut draft = complete_draft();
        draft.salesperson2_id = draft.salesperson1_id;
        let errors = draft.check_constraints(&rules());
        assert!(errors.iter().any(|e| e.field == "salesperson2Id"));
    }

    #[test]
    fn follow_up_start_must_be_after_visit_date() {
        let mut draft = complete_draft();
        draft.follow_up = true;
        draft.follow_up_start = Some(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        draft.follow_up_end = Some(NaiveDate::from_ymd_opt(2024, 1, 20).unwrap());
        draft.next_visit_reason_id = Some(Uuid::new_v4());
        let errors = draft.check_constraints(&rules());
        assert!(errors.iter().any(|e| e.field == "followUpStart"));
    }

    #[test]
    fn client_visit_with_prospect_rejected() {
        let mut draft = complete_draft();
        draft.prospect_id = Some(Uuid::new_v4());
        let errors = draft.check_constraints(&rules());
        assert!(errors.iter().any(|e| e.field == "prospectId"));
    }

    #[test]
    fn date_outside_window_rejected() {
        let mut draft = complete_draft();
        draft.visit_date = Some(NaiveDate::from_ymd_opt(2023, 10, 1).unwrap());
        let errors = draft.check_constraints(&rules());
        assert!(errors.iter().any(|e| e.field == "visitDate"));
    }
}
