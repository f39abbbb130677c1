// src/db/reference_repo.rs

use sqlx::PgPool;

use crate::{
    common::error::AppError,
    models::visit::{Country, ReferenceItem, Salesperson},
};

// Read access to the reference tables backing the entry form pickers.
#[derive(Clone)]
pub struct ReferenceRepository {
    pool: PgPool,
}

impl ReferenceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_salespersons(&self) -> Result<Vec<Salesperson>, AppError> {
        let rows = sqlx::query_as::<_, Salesperson>(
            "SELECT id, code, name, left_on FROM salespersons ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn find_salesperson_by_code(
        &self,
        code: &str,
    ) -> Result<Option<Salesperson>, AppError> {
        let row = sqlx::query_as::<_, Salesperson>(
            "SELECT id, code, name, left_on FROM salespersons WHERE code = $1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn list_countries(&self) -> Result<Vec<Country>, AppError> {
        let rows = sqlx::query_as::<_, Country>(
            "SELECT id, code, label FROM countries ORDER BY label ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn find_country_by_code(&self, code: &str) -> Result<Option<Country>, AppError> {
        let row =
            sqlx::query_as::<_, Country>("SELECT id, code, label FROM countries WHERE code = $1")
                .bind(code)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row)
    }

    pub async fn list_visit_reasons(&self) -> Result<Vec<ReferenceItem>, AppError> {
        self.list_labeled("visit_reasons").await
    }

    pub async fn list_next_visit_reasons(&self) -> Result<Vec<ReferenceItem>, AppError> {
        self.list_labeled("next_visit_reasons").await
    }

    pub async fn list_product_lines(&self) -> Result<Vec<ReferenceItem>, AppError> {
        self.list_labeled("product_lines").await
    }

    pub async fn list_competitors(&self) -> Result<Vec<ReferenceItem>, AppError> {
        self.list_labeled("competitors").await
    }

    // The four label tables share the same shape; the table name comes from
    // a fixed set above, never from user input.
    async fn list_labeled(&self, table: &str) -> Result<Vec<ReferenceItem>, AppError> {
        let query = format!("SELECT id, label FROM {table} ORDER BY label ASC");
        let rows = sqlx::query_as::<_, ReferenceItem>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}
