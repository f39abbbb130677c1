use std::sync::Arc;

use chrono::{Local, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppConfig,
    db::{VisitFilters, VisitRepository, VisitScope},
    models::{
        auth::CurrentUser,
        visit::{Visit, VisitDraft},
    },
};

#[derive(Clone)]
pub struct VisitService {
    visit_repo: VisitRepository,
    pool: PgPool,
    config: Arc<AppConfig>,
}

impl VisitService {
    pub fn new(visit_repo: VisitRepository, pool: PgPool, config: Arc<AppConfig>) -> Self {
        Self {
            visit_repo,
            pool,
            config,
        }
    }

    /// Resolves the caller's visibility into a query scope.
    ///
    /// Managers see everything unless restricted to their managed
    /// salespersons; plain users see the visits where they are the primary
    /// salesperson, plus those where they are the second one when the
    /// matching toggle is on.
    pub fn scope_for(&self, user: &CurrentUser) -> VisitScope {
        if user.is_manager() {
            if !self.config.restrict_manager_to_managed_salespersons {
                return VisitScope::All;
            }
            return VisitScope::Managed {
                codes: user.managed_salesperson_codes.clone(),
                include_second: self.config.show_visits_when_salesperson2_of_managed,
            };
        }
        VisitScope::Own {
            // an account without a salesperson code sees no visits
            code: user.salesperson_code().unwrap_or_default().to_string(),
            include_second: self.config.show_visits_when_user_is_salesperson2,
        }
    }

    /// Row-level check, same rules as [`Self::scope_for`]. Used for direct
    /// access by id, where the scope cannot be folded into the query.
    pub fn can_view(&self, user: &CurrentUser, visit: &Visit) -> bool {
        if user.is_manager() {
            if !self.config.restrict_manager_to_managed_salespersons {
                return true;
            }
            if user.manages(&visit.salesperson1_code) {
                return true;
            }
            return self.config.show_visits_when_salesperson2_of_managed
                && visit
                    .salesperson2_code
                    .as_deref()
                    .is_some_and(|code| user.manages(code));
        }
        let Some(own_code) = user.salesperson_code() else {
            return false;
        };
        if visit.salesperson1_code == own_code {
            return true;
        }
        self.config.show_visits_when_user_is_salesperson2
            && visit.salesperson2_code.as_deref() == Some(own_code)
    }

    pub async fn list(
        &self,
        user: &CurrentUser,
        filters: &VisitFilters,
    ) -> Result<Vec<Visit>, AppError> {
        let scope = self.scope_for(user);
        self.visit_repo.list(&scope, filters).await
    }

    /// Loads a visit by id, hiding rows the caller may not see. The caller
    /// cannot distinguish a missing visit from a forbidden one.
    pub async fn find_visible(
        &self,
        user: &CurrentUser,
        id: Uuid,
    ) -> Result<Option<Visit>, AppError> {
        match self.visit_repo.find_by_id(id).await? {
            Some(visit) if self.can_view(user, &visit) => Ok(Some(visit)),
            _ => Ok(None),
        }
    }

    /// Persists a draft. Entity constraints are re-checked here regardless
    /// of what the form already validated; audit fields are stamped with
    /// the caller, creation fields on the first save and update fields
    /// afterwards. In demo mode the first save also draws the order number
    /// normally assigned by the ERP.
    pub async fn save(&self, user: &CurrentUser, mut draft: VisitDraft) -> Result<Visit, AppError> {
        if self.config.validation_enabled {
            let errors = draft.check_constraints(&self.config.visit_rules());
            if !errors.is_empty() {
                return Err(AppError::ConstraintViolations(errors));
            }
        }

        let first_save = draft.id.is_none();
        let now = Utc::now();
        if first_save {
            draft.created_at = Some(now);
            draft.created_by = Some(user.user.username.clone());
        } else {
            draft.updated_at = Some(now);
            draft.updated_by = Some(user.user.username.clone());
        }
        let assign_code = first_save && self.config.demo_mode;

        let mut tx = self.pool.begin().await?;
        let id = self.visit_repo.save(&mut *tx, &draft, assign_code).await?;
        tx.commit().await?;

        let visit = self
            .visit_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("visit {id} missing after save"))?;
        tracing::info!(visit_id = %visit.id, first_save, "visit saved");
        Ok(visit)
    }

    /// Marks a visit as validated by the calling manager. Conflicts report
    /// who validated it and when.
    pub async fn validate_visit(&self, user: &CurrentUser, id: Uuid) -> Result<Visit, AppError> {
        if !user.is_manager() {
            return Err(AppError::Forbidden);
        }
        let visit = self
            .visit_repo
            .find_by_id(id)
            .await?
            .filter(|v| self.can_view(user, v))
            .ok_or(AppError::VisitNotFound)?;

        if let (Some(by), Some(on)) = (&visit.validated_by, visit.validated_at) {
            return Err(AppError::VisitAlreadyValidated {
                by: by.clone(),
                on: on.to_string(),
            });
        }

        let today = Local::now().date_naive();
        let stamped = self
            .visit_repo
            .mark_validated(id, &user.user.username, today)
            .await?;
        if !stamped {
            // lost the race to another manager, reload for the conflict details
            if let Some(current) = self.visit_repo.find_by_id(id).await? {
                if let (Some(by), Some(on)) = (&current.validated_by, current.validated_at) {
                    return Err(AppError::VisitAlreadyValidated {
                        by: by.clone(),
                        on: on.to_string(),
                    });
                }
            }
            return Err(AppError::VisitNotFound);
        }

        tracing::info!(visit_id = %id, validated_by = %user.user.username, "visit validated");
        self.visit_repo
            .find_by_id(id)
            .await?
            .ok_or(AppError::VisitNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::{Role, User};
    use crate::models::visit::ContactType;
    use chrono::NaiveDate;

    fn config() -> AppConfig {
        AppConfig {
            validation_enabled: true,
            phone_validation_enabled: true,
            phone_formatting_enabled: true,
            fuzzy_matching_enabled: true,
            fuzzy_matching_threshold: 70,
            fuzzy_matching_limit: None,
            visit_days_before_today: 60,
            visit_days_after_today: 60,
            default_country_code: "FR".to_string(),
            demo_mode: false,
            font_size_level: 3,
            show_visits_when_user_is_salesperson2: true,
            restrict_manager_to_managed_salespersons: true,
            restrict_salesperson_picker_to_managed: true,
            show_visits_when_salesperson2_of_managed: true,
        }
    }

    fn service(config: AppConfig) -> VisitService {
        // lazy pool: never connects, but its upkeep tasks need a runtime
        let pool = PgPool::connect_lazy("postgres://localhost/unused")
            .unwrap();
        VisitService::new(VisitRepository::new(pool.clone()), pool, Arc::new(config))
    }

    fn current_user(role: Role, code: Option<&str>, managed: &[&str]) -> CurrentUser {
        CurrentUser {
            user: User {
                id: Uuid::new_v4(),
                username: "jdupont".to_string(),
                password_hash: String::new(),
                role,
                salesperson_code: code.map(str::to_string),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            managed_salesperson_codes: managed.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn visit(s1: &str, s2: Option<&str>) -> Visit {
        Visit {
            id: Uuid::new_v4(),
            code: None,
            visit_date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            salesperson1_id: Uuid::new_v4(),
            salesperson1_code: s1.to_string(),
            salesperson2_id: s2.map(|_| Uuid::new_v4()),
            salesperson2_code: s2.map(str::to_string),
            contact_type: ContactType::Client,
            client_id: Some(Uuid::new_v4()),
            prospect_id: None,
            visit_reason_id: Uuid::new_v4(),
            contact_name: "Durand".to_string(),
            contact_role: "Buyer".to_string(),
            notes: String::new(),
            follow_up: false,
            follow_up_start: None,
            follow_up_end: None,
            next_visit_reason_id: None,
            next_visit_salesperson_id: None,
            validated_by: None,
            validated_at: None,
            created_at: None,
            created_by: None,
            updated_at: None,
            updated_by: None,
            product_line_ids: Vec::new(),
            competitor_ids: Vec::new(),
        }
    }

    #[tokio::test]
    async fn unrestricted_manager_sees_everything() {
        let mut cfg = config();
        cfg.restrict_manager_to_managed_salespersons = false;
        let svc = service(cfg);
        let manager = current_user(Role::Manager, None, &[]);

        assert!(svc.can_view(&manager, &visit("V9", None)));
        assert!(matches!(svc.scope_for(&manager), VisitScope::All));
    }

    #[tokio::test]
    async fn restricted_manager_sees_managed_salespersons_only() {
        let svc = service(config());
        let manager = current_user(Role::Manager, None, &["V1", "V2"]);

        assert!(svc.can_view(&manager, &visit("V1", None)));
        assert!(svc.can_view(&manager, &visit("V9", Some("V2"))));
        assert!(!svc.can_view(&manager, &visit("V9", Some("V8"))));
    }

    #[tokio::test]
    async fn manager_second_salesperson_visibility_follows_the_toggle() {
        let mut cfg = config();
        cfg.show_visits_when_salesperson2_of_managed = false;
        let svc = service(cfg);
        let manager = current_user(Role::Manager, None, &["V1"]);

        assert!(!svc.can_view(&manager, &visit("V9", Some("V1"))));
    }

    #[tokio::test]
    async fn user_sees_own_visits_and_second_slot_per_toggle() {
        let svc = service(config());
        let user = current_user(Role::User, Some("V1"), &[]);

        assert!(svc.can_view(&user, &visit("V1", None)));
        assert!(svc.can_view(&user, &visit("V9", Some("V1"))));
        assert!(!svc.can_view(&user, &visit("V9", Some("V8"))));

        let mut cfg = config();
        cfg.show_visits_when_user_is_salesperson2 = false;
        let svc = service(cfg);
        assert!(!svc.can_view(&user, &visit("V9", Some("V1"))));
    }

    #[tokio::test]
    async fn user_without_salesperson_code_sees_nothing() {
        let svc = service(config());
        let user = current_user(Role::User, None, &[]);
        assert!(!svc.can_view(&user, &visit("V1", None)));
    }
}
