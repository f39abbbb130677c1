// src/config.rs

use std::{env, str::FromStr, sync::Arc, time::Duration};

use chrono::Local;
use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::{
    db::{ContactRepository, ReferenceRepository, UserRepository, VisitRepository},
    models::visit::VisitRules,
    services::{
        auth::AuthService, phone::PhoneNormalizer, session::PreferenceStore,
        visit_service::VisitService, wizard::DraftStore,
    },
};

/// Runtime configuration, read once at startup. Field names follow the
/// feature toggles of the application properties schema.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub validation_enabled: bool,
    pub phone_validation_enabled: bool,
    pub phone_formatting_enabled: bool,
    pub fuzzy_matching_enabled: bool,
    /// Score a candidate must strictly exceed to count as a match (1-100).
    pub fuzzy_matching_threshold: u8,
    pub fuzzy_matching_limit: Option<usize>,
    pub visit_days_before_today: i64,
    pub visit_days_after_today: i64,
    pub default_country_code: String,
    pub demo_mode: bool,
    /// Accessibility font level, clamped to 0-7.
    pub font_size_level: u8,
    pub show_visits_when_user_is_salesperson2: bool,
    pub restrict_manager_to_managed_salespersons: bool,
    pub restrict_salesperson_picker_to_managed: bool,
    pub show_visits_when_salesperson2_of_managed: bool,
}

fn env_bool(key: &str, default: bool) -> bool {
    env_parsed(key, default)
}

fn env_parsed<T: FromStr + Copy>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            validation_enabled: env_bool("VALIDATION_ENABLED", true),
            phone_validation_enabled: env_bool("PHONE_VALIDATION_ENABLED", true),
            phone_formatting_enabled: env_bool("PHONE_FORMATTING_ENABLED", true),
            fuzzy_matching_enabled: env_bool("FUZZY_MATCHING_ENABLED", true),
            fuzzy_matching_threshold: env_parsed("FUZZY_MATCHING_THRESHOLD", 70u8).min(100),
            fuzzy_matching_limit: env::var("FUZZY_MATCHING_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok()),
            visit_days_before_today: env_parsed("VISIT_DAYS_BEFORE_TODAY", 60i64),
            visit_days_after_today: env_parsed("VISIT_DAYS_AFTER_TODAY", 60i64),
            default_country_code: env::var("DEFAULT_COUNTRY_CODE")
                .unwrap_or_else(|_| "FR".to_string())
                .to_uppercase(),
            demo_mode: env_bool("DEMO_MODE", false),
            font_size_level: env_parsed("FONT_SIZE_LEVEL", 3u8).min(7),
            show_visits_when_user_is_salesperson2: env_bool(
                "SHOW_VISITS_WHEN_USER_IS_SALESPERSON2",
                true,
            ),
            restrict_manager_to_managed_salespersons: env_bool(
                "RESTRICT_MANAGER_TO_MANAGED_SALESPERSONS",
                true,
            ),
            restrict_salesperson_picker_to_managed: env_bool(
                "RESTRICT_SALESPERSON_PICKER_TO_MANAGED",
                true,
            ),
            show_visits_when_salesperson2_of_managed: env_bool(
                "SHOW_VISITS_WHEN_SALESPERSON2_OF_MANAGED",
                true,
            ),
        }
    }

    /// Structured startup dump of the known configuration schema.
    pub fn log_startup(&self) {
        tracing::info!(
            validation_enabled = self.validation_enabled,
            phone_validation_enabled = self.phone_validation_enabled,
            phone_formatting_enabled = self.phone_formatting_enabled,
            fuzzy_matching_enabled = self.fuzzy_matching_enabled,
            fuzzy_matching_threshold = self.fuzzy_matching_threshold,
            fuzzy_matching_limit = ?self.fuzzy_matching_limit,
            visit_days_before_today = self.visit_days_before_today,
            visit_days_after_today = self.visit_days_after_today,
            default_country_code = %self.default_country_code,
            demo_mode = self.demo_mode,
            font_size_level = self.font_size_level,
            show_visits_when_user_is_salesperson2 = self.show_visits_when_user_is_salesperson2,
            restrict_manager_to_managed_salespersons = self.restrict_manager_to_managed_salespersons,
            restrict_salesperson_picker_to_managed = self.restrict_salesperson_picker_to_managed,
            show_visits_when_salesperson2_of_managed = self.show_visits_when_salesperson2_of_managed,
            "configuration loaded"
        );
    }

    pub fn visit_rules(&self) -> VisitRules {
        VisitRules {
            today: Local::now().date_naive(),
            days_before_today: self.visit_days_before_today,
            days_after_today: self.visit_days_after_today,
        }
    }
}

// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Arc<AppConfig>,
    pub auth_service: AuthService,
    pub visit_service: VisitService,
    pub phone_service: PhoneNormalizer,
    pub contact_repo: ContactRepository,
    pub reference_repo: ReferenceRepository,
    pub drafts: DraftStore,
    pub preferences: PreferenceStore,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");
        let config = Arc::new(AppConfig::from_env());
        config.log_startup();

        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("database connection established");

        // Dependency graph
        let user_repo = UserRepository::new(db_pool.clone());
        let visit_repo = VisitRepository::new(db_pool.clone());
        let contact_repo = ContactRepository::new(db_pool.clone());
        let reference_repo = ReferenceRepository::new(db_pool.clone());
        let auth_service = AuthService::new(user_repo, jwt_secret);
        let visit_service = VisitService::new(visit_repo, db_pool.clone(), config.clone());
        let phone_service = PhoneNormalizer::new(config.default_country_code.clone());
        let preferences = PreferenceStore::new(config.font_size_level);

        Ok(Self {
            db_pool,
            config,
            auth_service,
            visit_service,
            phone_service,
            contact_repo,
            reference_repo,
            drafts: DraftStore::default(),
            preferences,
        })
    }
}
