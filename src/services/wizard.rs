use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::visit::{ContactType, FieldError, VisitDraft, VisitRules},
};

// --- SECTIONS ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SectionKind {
    Contact,
    Report,
    FollowUp,
}

impl SectionKind {
    pub const ALL: [SectionKind; 3] = [
        SectionKind::Contact,
        SectionKind::Report,
        SectionKind::FollowUp,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            SectionKind::Contact => "Contact",
            SectionKind::Report => "Compte rendu",
            SectionKind::FollowUp => "Suite à donner",
        }
    }
}

/// One step of the entry form. Sections validate only their own fields;
/// the full entity constraints are re-checked separately at save time.
pub trait WizardSection {
    fn kind(&self) -> SectionKind;
    fn validate(&self, draft: &VisitDraft, rules: &VisitRules) -> Vec<FieldError>;
}

struct ContactSection;
struct ReportSection;
struct FollowUpSection;

impl WizardSection for ContactSection {
    fn kind(&self) -> SectionKind {
        SectionKind::Contact
    }

    fn validate(&self, draft: &VisitDraft, rules: &VisitRules) -> Vec<FieldError> {
        let mut errors = Vec::new();
        let (min_date, max_date) = rules.date_window();

        match draft.visit_date {
            None => errors.push(FieldError::new("visitDate", "required")),
            Some(date) if date <= min_date || date >= max_date => {
                errors.push(FieldError::new(
                    "visitDate",
                    format!("must fall between {min_date} and {max_date}"),
                ));
            }
            Some(_) => {}
        }
        if draft.salesperson1_id.is_none() {
            errors.push(FieldError::new("salesperson1Id", "required"));
        }
        if draft.salesperson2_id.is_some() && draft.salesperson2_id == draft.salesperson1_id {
            errors.push(FieldError::new("salesperson2Id", "salespersons must differ"));
        }
        match draft.contact_type {
            None => errors.push(FieldError::new("contactType", "required")),
            Some(ContactType::Client) if draft.client_id.is_none() => {
                errors.push(FieldError::new("clientId", "required"));
            }
            Some(ContactType::Prospect) if draft.prospect_id.is_none() => {
                errors.push(FieldError::new("prospectId", "required"));
            }
            Some(_) => {}
        }
        if draft.visit_reason_id.is_none() {
            errors.push(FieldError::new("visitReasonId", "required"));
        }
        if draft.contact_name.as_deref().is_none_or(|v| v.trim().is_empty()) {
            errors.push(FieldError::new("contactName", "required"));
        }
        if draft.contact_role.as_deref().is_none_or(|v| v.trim().is_empty()) {
            errors.push(FieldError::new("contactRole", "required"));
        }
        errors
    }
}

impl WizardSection for ReportSection {
    fn kind(&self) -> SectionKind {
        SectionKind::Report
    }

    fn validate(&self, draft: &VisitDraft, _rules: &VisitRules) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if draft.product_line_ids.is_empty() {
            errors.push(FieldError::new("productLineIds", "at least one required"));
        }
        if draft.competitor_ids.is_empty() {
            errors.push(FieldError::new("competitorIds", "at least one required"));
        }
        errors
    }
}

impl WizardSection for FollowUpSection {
    fn kind(&self) -> SectionKind {
        SectionKind::FollowUp
    }

    fn validate(&self, draft: &VisitDraft, _rules: &VisitRules) -> Vec<FieldError> {
        if !draft.follow_up {
            return Vec::new();
        }
        let mut errors = Vec::new();
        match (draft.follow_up_start, draft.visit_date) {
            (Some(start), Some(date)) if start > date => {}
            _ => errors.push(FieldError::new(
                "followUpStart",
                "must be a date after the visit date",
            )),
        }
        match (draft.follow_up_end, draft.follow_up_start) {
            (Some(end), Some(start)) if end >= start => {}
            _ => errors.push(FieldError::new(
                "followUpEnd",
                "must not be before the follow-up start date",
            )),
        }
        if draft.next_visit_reason_id.is_none() {
            errors.push(FieldError::new("nextVisitReasonId", "required"));
        }
        errors
    }
}

fn section_for(kind: SectionKind) -> Box<dyn WizardSection + Send + Sync> {
    match kind {
        SectionKind::Contact => Box::new(ContactSection),
        SectionKind::Report => Box::new(ReportSection),
        SectionKind::FollowUp => Box::new(FollowUpSection),
    }
}

// --- WIZARD ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WizardLayout {
    Desktop,
    Mobile,
}

/// Server-side state of one visit entry form: the draft being edited, the
/// last-saved baseline for the unsaved-changes guard, the active section
/// and the layout mode. Layout switches never touch the section index or
/// the draft data.
pub struct VisitFormWizard {
    draft: VisitDraft,
    baseline: VisitDraft,
    section_index: usize,
    layout: WizardLayout,
    rules: VisitRules,
}

impl VisitFormWizard {
    pub fn new(draft: VisitDraft, rules: VisitRules) -> Self {
        Self {
            baseline: draft.clone(),
            draft,
            section_index: 0,
            layout: WizardLayout::Desktop,
            rules,
        }
    }

    pub fn draft(&self) -> &VisitDraft {
        &self.draft
    }

    pub fn section_index(&self) -> usize {
        self.section_index
    }

    pub fn current_section(&self) -> SectionKind {
        SectionKind::ALL[self.section_index]
    }

    pub fn layout(&self) -> WizardLayout {
        self.layout
    }

    pub fn set_layout(&mut self, layout: WizardLayout) {
        self.layout = layout;
    }

    pub fn is_dirty(&self) -> bool {
        self.draft != self.baseline
    }

    /// Advances to the next section. Blocked while the current section has
    /// validation errors; a no-op on the last section.
    pub fn next(&mut self) -> Result<SectionKind, Vec<FieldError>> {
        let errors = section_for(self.current_section()).validate(&self.draft, &self.rules);
        if !errors.is_empty() {
            return Err(errors);
        }
        if self.section_index + 1 < SectionKind::ALL.len() {
            self.section_index += 1;
        }
        Ok(self.current_section())
    }

    /// Steps back without any validation.
    pub fn previous(&mut self) -> SectionKind {
        self.section_index = self.section_index.saturating_sub(1);
        self.current_section()
    }

    /// Merges the editable fields of `update` into the draft. Identity,
    /// validation and audit fields only change through saves. Turning the
    /// follow-up flag off clears every follow-up field.
    pub fn apply(&mut self, update: VisitDraft) {
        self.draft.visit_date = update.visit_date;
        self.draft.salesperson1_id = update.salesperson1_id;
        self.draft.salesperson2_id = update.salesperson2_id;
        self.draft.contact_type = update.contact_type;
        self.draft.client_id = update.client_id;
        self.draft.prospect_id = update.prospect_id;
        self.draft.visit_reason_id = update.visit_reason_id;
        self.draft.contact_name = update.contact_name;
        self.draft.contact_role = update.contact_role;
        self.draft.product_line_ids = update.product_line_ids;
        self.draft.competitor_ids = update.competitor_ids;
        self.draft.notes = update.notes;
        self.draft.follow_up = update.follow_up;
        if update.follow_up {
            self.draft.follow_up_start = update.follow_up_start;
            self.draft.follow_up_end = update.follow_up_end;
            self.draft.next_visit_reason_id = update.next_visit_reason_id;
            self.draft.next_visit_salesperson_id = update.next_visit_salesperson_id;
        } else {
            self.draft.follow_up_start = None;
            self.draft.follow_up_end = None;
            self.draft.next_visit_reason_id = None;
            self.draft.next_visit_salesperson_id = None;
        }
    }

    /// Validation state of every section, in order.
    pub fn validate_sections(&self) -> Vec<(SectionKind, Vec<FieldError>)> {
        SectionKind::ALL
            .iter()
            .map(|kind| (*kind, section_for(*kind).validate(&self.draft, &self.rules)))
            .collect()
    }

    pub fn rules(&self) -> &VisitRules {
        &self.rules
    }

    /// Resets the baseline after a successful save.
    pub fn mark_saved(&mut self, saved: VisitDraft) {
        self.baseline = saved.clone();
        self.draft = saved;
    }

    /// Drops edits and returns to the last-saved state.
    pub fn discard(&mut self) {
        self.draft = self.baseline.clone();
    }
}

// --- STORE ---

/// Forms idle longer than this are dropped the next time one is opened,
/// so abandoned sessions cannot pile up.
const DRAFT_IDLE_TTL: Duration = Duration::from_secs(8 * 60 * 60);

struct DraftEntry {
    owner: Uuid,
    wizard: VisitFormWizard,
    touched: Instant,
}

/// In-memory registry of open entry forms, one per draft id. Each entry is
/// bound to the user who opened it; access by anyone else reads as not
/// found. Edits refresh the idle clock.
#[derive(Clone)]
pub struct DraftStore {
    idle_ttl: Duration,
    entries: Arc<RwLock<HashMap<Uuid, DraftEntry>>>,
}

impl Default for DraftStore {
    fn default() -> Self {
        Self::with_idle_ttl(DRAFT_IDLE_TTL)
    }
}

impl DraftStore {
    pub fn with_idle_ttl(idle_ttl: Duration) -> Self {
        Self {
            idle_ttl,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn create(&self, owner: Uuid, draft: VisitDraft, rules: VisitRules) -> Uuid {
        let id = Uuid::new_v4();
        let entry = DraftEntry {
            owner,
            wizard: VisitFormWizard::new(draft, rules),
            touched: Instant::now(),
        };
        let mut entries = self.entries.write().await;
        entries.retain(|_, e| e.touched.elapsed() < self.idle_ttl);
        entries.insert(id, entry);
        id
    }

    pub async fn read<T>(
        &self,
        id: Uuid,
        owner: Uuid,
        f: impl FnOnce(&VisitFormWizard) -> T,
    ) -> Result<T, AppError> {
        let entries = self.entries.read().await;
        let entry = entries
            .get(&id)
            .filter(|e| e.owner == owner)
            .ok_or(AppError::DraftNotFound)?;
        Ok(f(&entry.wizard))
    }

    pub async fn update<T>(
        &self,
        id: Uuid,
        owner: Uuid,
        f: impl FnOnce(&mut VisitFormWizard) -> T,
    ) -> Result<T, AppError> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(&id)
            .filter(|e| e.owner == owner)
            .ok_or(AppError::DraftNotFound)?;
        entry.touched = Instant::now();
        Ok(f(&mut entry.wizard))
    }

    pub async fn remove(&self, id: Uuid, owner: Uuid) -> Result<(), AppError> {
        let mut entries = self.entries.write().await;
        match entries.get(&id) {
            Some(entry) if entry.owner == owner => {
                entries.remove(&id);
                Ok(())
            }
            _ => Err(AppError::DraftNotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::BTreeSet;

    fn rules() -> VisitRules {
        VisitRules {
            today: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            days_before_today: 60,
            days_after_today: 60,
        }
    }

    fn contact_complete_draft() -> VisitDraft {
        VisitDraft {
            visit_date: Some(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()),
            salesperson1_id: Some(Uuid::new_v4()),
            contact_type: Some(ContactType::Client),
            client_id: Some(Uuid::new_v4()),
            visit_reason_id: Some(Uuid::new_v4()),
            contact_name: Some("Durand".into()),
            contact_role: Some("Buyer".into()),
            ..VisitDraft::default()
        }
    }

    fn report_fields(draft: &mut VisitDraft) {
        draft.product_line_ids = [Uuid::new_v4()].into_iter().collect::<BTreeSet<_>>();
        draft.competitor_ids = [Uuid::new_v4()].into_iter().collect::<BTreeSet<_>>();
    }

    #[test]
    fn next_is_blocked_until_the_section_is_valid() {
        let mut wizard = VisitFormWizard::new(VisitDraft::default(), rules());
        let errors = wizard.next().unwrap_err();
        assert!(errors.iter().any(|e| e.field == "visitDate"));
        assert_eq!(wizard.current_section(), SectionKind::Contact);

        wizard.apply(contact_complete_draft());
        assert_eq!(wizard.next().unwrap(), SectionKind::Report);
    }

    #[test]
    fn first_section_requires_reason_and_contact_fields() {
        let mut wizard = VisitFormWizard::new(VisitDraft::default(), rules());
        let mut update = contact_complete_draft();
        update.visit_reason_id = None;
        update.contact_name = None;
        update.contact_role = None;
        wizard.apply(update);

        let errors = wizard.next().unwrap_err();
        assert_eq!(wizard.current_section(), SectionKind::Contact);
        assert!(errors.iter().any(|e| e.field == "visitReasonId"));
        assert!(errors.iter().any(|e| e.field == "contactName"));
        assert!(errors.iter().any(|e| e.field == "contactRole"));
    }

    #[test]
    fn full_walk_reaches_the_last_section_and_stays_there() {
        let mut wizard = VisitFormWizard::new(VisitDraft::default(), rules());
        let mut update = contact_complete_draft();
        report_fields(&mut update);
        wizard.apply(update);

        assert_eq!(wizard.next().unwrap(), SectionKind::Report);
        assert_eq!(wizard.next().unwrap(), SectionKind::FollowUp);
        // follow-up off, the last section is valid and next stays put
        assert_eq!(wizard.next().unwrap(), SectionKind::FollowUp);
    }

    #[test]
    fn previous_never_validates() {
        let mut wizard = VisitFormWizard::new(VisitDraft::default(), rules());
        wizard.apply(contact_complete_draft());
        wizard.next().unwrap();
        // report section is empty, going back must still work
        assert_eq!(wizard.previous(), SectionKind::Contact);
        assert_eq!(wizard.previous(), SectionKind::Contact);
    }

    #[test]
    fn layout_switch_preserves_section_and_data() {
        let mut wizard = VisitFormWizard::new(VisitDraft::default(), rules());
        wizard.apply(contact_complete_draft());
        wizard.next().unwrap();
        let before = wizard.draft().clone();

        wizard.set_layout(WizardLayout::Mobile);
        assert_eq!(wizard.layout(), WizardLayout::Mobile);
        assert_eq!(wizard.current_section(), SectionKind::Report);
        assert_eq!(wizard.draft(), &before);
    }

    #[test]
    fn disabling_follow_up_clears_its_fields() {
        let mut wizard = VisitFormWizard::new(VisitDraft::default(), rules());
        let mut update = contact_complete_draft();
        update.follow_up = true;
        update.follow_up_start = Some(NaiveDate::from_ymd_opt(2024, 3, 20).unwrap());
        update.follow_up_end = Some(NaiveDate::from_ymd_opt(2024, 3, 25).unwrap());
        update.next_visit_reason_id = Some(Uuid::new_v4());
        wizard.apply(update.clone());
        assert!(wizard.draft().follow_up_start.is_some());

        update.follow_up = false;
        wizard.apply(update);
        assert_eq!(wizard.draft().follow_up_start, None);
        assert_eq!(wizard.draft().follow_up_end, None);
        assert_eq!(wizard.draft().next_visit_reason_id, None);
        assert_eq!(wizard.draft().next_visit_salesperson_id, None);
    }

    #[test]
    fn dirty_tracks_the_saved_baseline() {
        let mut wizard = VisitFormWizard::new(VisitDraft::default(), rules());
        assert!(!wizard.is_dirty());

        wizard.apply(contact_complete_draft());
        assert!(wizard.is_dirty());

        let saved = wizard.draft().clone();
        wizard.mark_saved(saved);
        assert!(!wizard.is_dirty());

        let mut update = wizard.draft().clone();
        update.notes = "updated".into();
        wizard.apply(update);
        assert!(wizard.is_dirty());

        wizard.discard();
        assert!(!wizard.is_dirty());
        assert_eq!(wizard.draft().notes, "");
    }

    #[tokio::test]
    async fn idle_entries_are_evicted_when_a_form_opens() {
        let store = DraftStore::with_idle_ttl(Duration::ZERO);
        let owner = Uuid::new_v4();
        let stale = store.create(owner, VisitDraft::default(), rules()).await;
        let fresh = store.create(owner, VisitDraft::default(), rules()).await;

        let err = store.read(stale, owner, |_| ()).await.unwrap_err();
        assert!(matches!(err, AppError::DraftNotFound));
        assert!(store.read(fresh, owner, |_| ()).await.is_ok());
    }

    #[tokio::test]
    async fn store_entries_are_owner_scoped() {
        let store = DraftStore::default();
        let owner = Uuid::new_v4();
        let id = store.create(owner, VisitDraft::default(), rules()).await;

        assert!(store.read(id, owner, |w| w.section_index()).await.is_ok());
        let err = store
            .read(id, Uuid::new_v4(), |w| w.section_index())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DraftNotFound));
        assert!(store.remove(id, Uuid::new_v4()).await.is_err());
        assert!(store.remove(id, owner).await.is_ok());
    }
}
