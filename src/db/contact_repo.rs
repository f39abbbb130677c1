// src/db/contact_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{common::error::AppError, models::visit::Contact};

const CONTACT_COLUMNS: &str =
    "id, code, name, address1, address2, postal_code, city, country_code, phone_fixed, phone_mobile";

// Clients and prospects share one table shape; the repository keeps the two
// tables separate the way the domain does.
#[derive(Clone)]
pub struct ContactRepository {
    pool: PgPool,
}

impl ContactRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_clients(&self) -> Result<Vec<Contact>, AppError> {
        let query = format!("SELECT {CONTACT_COLUMNS} FROM clients ORDER BY name ASC");
        let rows = sqlx::query_as::<_, Contact>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn list_prospects(&self) -> Result<Vec<Contact>, AppError> {
        let query = format!("SELECT {CONTACT_COLUMNS} FROM prospects ORDER BY name ASC");
        let rows = sqlx::query_as::<_, Contact>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Inserts a prospect and returns the stored row, generated id included.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_prospect(
        &self,
        name: &str,
        address1: Option<&str>,
        address2: Option<&str>,
        postal_code: Option<&str>,
        city: Option<&str>,
        country_code: Option<&str>,
        phone_fixed: Option<&str>,
        phone_mobile: Option<&str>,
    ) -> Result<Contact, AppError> {
        let query = format!(
            r#"
            INSERT INTO prospects (name, address1, address2, postal_code, city, country_code, phone_fixed, phone_mobile)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {CONTACT_COLUMNS}
            "#
        );
        let prospect = sqlx::query_as::<_, Contact>(&query)
            .bind(name)
            .bind(address1)
            .bind(address2)
            .bind(postal_code)
            .bind(city)
            .bind(country_code)
            .bind(phone_fixed)
            .bind(phone_mobile)
            .fetch_one(&self.pool)
            .await?;
        Ok(prospect)
    }

    pub async fn find_client(&self, id: Uuid) -> Result<Option<Contact>, AppError> {
        let query = format!("SELECT {CONTACT_COLUMNS} FROM clients WHERE id = $1");
        let row = sqlx::query_as::<_, Contact>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn find_prospect(&self, id: Uuid) -> Result<Option<Contact>, AppError> {
        let query = format!("SELECT {CONTACT_COLUMNS} FROM prospects WHERE id = $1");
        let row = sqlx::query_as::<_, Contact>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }
}
