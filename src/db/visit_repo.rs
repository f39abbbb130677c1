// src/db/visit_repo.rs

use std::collections::HashMap;

use chrono::NaiveDate;
use sqlx::{PgConnection, PgPool, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::visit::{ContactType, Visit, VisitDraft},
};

const VISIT_SELECT: &str = r#"
SELECT
    v.id, v.code, v.visit_date,
    v.salesperson1_id, s1.code AS salesperson1_code,
    v.salesperson2_id, s2.code AS salesperson2_code,
    v.contact_type, v.client_id, v.prospect_id,
    v.visit_reason_id, v.contact_name, v.contact_role, v.notes,
    v.follow_up, v.follow_up_start, v.follow_up_end,
    v.next_visit_reason_id, v.next_visit_salesperson_id,
    v.validated_by, v.validated_at,
    v.created_at, v.created_by, v.updated_at, v.updated_by
FROM visits v
JOIN salespersons s1 ON s1.id = v.salesperson1_id
LEFT JOIN salespersons s2 ON s2.id = v.salesperson2_id
"#;

/// Which visits a caller may see, resolved from their role and the
/// visibility toggles before the query is built.
#[derive(Debug, Clone)]
pub enum VisitScope {
    /// Unrestricted manager.
    All,
    /// A salesperson's own visits.
    Own { code: String, include_second: bool },
    /// Visits of the salespersons a manager oversees.
    Managed {
        codes: Vec<String>,
        include_second: bool,
    },
}

/// Optional grid filters, combined with the scope.
#[derive(Debug, Clone, Default)]
pub struct VisitFilters {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub salesperson_code: Option<String>,
    pub contact_type: Option<ContactType>,
    pub validated: Option<bool>,
}

#[derive(Clone)]
pub struct VisitRepository {
    pool: PgPool,
}

impl VisitRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Visit>, AppError> {
        let query = format!("{VISIT_SELECT} WHERE v.id = $1");
        let visit = sqlx::query_as::<_, Visit>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match visit {
            Some(mut visit) => {
                self.load_associations(std::slice::from_mut(&mut visit))
                    .await?;
                Ok(Some(visit))
            }
            None => Ok(None),
        }
    }

    pub async fn list(
        &self,
        scope: &VisitScope,
        filters: &VisitFilters,
    ) -> Result<Vec<Visit>, AppError> {
        let mut builder = QueryBuilder::new(VISIT_SELECT);
        builder.push(" WHERE 1=1 ");

        match scope {
            VisitScope::All => {}
            VisitScope::Own {
                code,
                include_second,
            } => {
                if *include_second {
                    builder.push(" AND (s1.code = ");
                    builder.push_bind(code.clone());
                    builder.push(" OR s2.code = ");
                    builder.push_bind(code.clone());
                    builder.push(")");
                } else {
                    builder.push(" AND s1.code = ");
                    builder.push_bind(code.clone());
                }
            }
            VisitScope::Managed {
                codes,
                include_second,
            } => {
                if *include_second {
                    builder.push(" AND (s1.code = ANY(");
                    builder.push_bind(codes.clone());
                    builder.push(") OR s2.code = ANY(");
                    builder.push_bind(codes.clone());
                    builder.push("))");
                } else {
                    builder.push(" AND s1.code = ANY(");
                    builder.push_bind(codes.clone());
                    builder.push(")");
                }
            }
        }

        if let Some(date_from) = filters.date_from {
            builder.push(" AND v.visit_date >= ");
            builder.push_bind(date_from);
        }
        if let Some(date_to) = filters.date_to {
            builder.push(" AND v.visit_date <= ");
            builder.push_bind(date_to);
        }
        if let Some(code) = &filters.salesperson_code {
            builder.push(" AND (s1.code = ");
            builder.push_bind(code.clone());
            builder.push(" OR s2.code = ");
            builder.push_bind(code.clone());
            builder.push(")");
        }
        if let Some(contact_type) = filters.contact_type {
            builder.push(" AND v.contact_type = ");
            builder.push_bind(contact_type);
        }
        if let Some(validated) = filters.validated {
            if validated {
                builder.push(" AND v.validated_at IS NOT NULL");
            } else {
                builder.push(" AND v.validated_at IS NULL");
            }
        }

        builder.push(" ORDER BY v.visit_date ASC");

        let mut visits = builder
            .build_query_as::<Visit>()
            .fetch_all(&self.pool)
            .await?;
        self.load_associations(&mut visits).await?;
        Ok(visits)
    }

    /// Upserts the visit and its product-line/competitor links inside the
    /// caller's transaction; returns the row id so the caller can read back
    /// the generated identifier atomically.
    pub async fn save(
        &self,
        conn: &mut PgConnection,
        draft: &VisitDraft,
        assign_code: bool,
    ) -> Result<Uuid, AppError> {
        let id = match draft.id {
            Some(id) => {
                sqlx::query(
                    r#"
                    UPDATE visits SET
                        visit_date = $2, salesperson1_id = $3, salesperson2_id = $4,
                        contact_type = $5, client_id = $6, prospect_id = $7,
                        visit_reason_id = $8, contact_name = $9, contact_role = $10,
                        notes = $11, follow_up = $12, follow_up_start = $13,
                        follow_up_end = $14, next_visit_reason_id = $15,
                        next_visit_salesperson_id = $16, validated_by = $17,
                        validated_at = $18, created_at = $19, created_by = $20,
                        updated_at = $21, updated_by = $22
                    WHERE id = $1
                    "#,
                )
                .bind(id)
                .bind(draft.visit_date)
                .bind(draft.salesperson1_id)
                .bind(draft.salesperson2_id)
                .bind(draft.contact_type)
                .bind(draft.client_id)
                .bind(draft.prospect_id)
                .bind(draft.visit_reason_id)
                .bind(&draft.contact_name)
                .bind(&draft.contact_role)
                .bind(&draft.notes)
                .bind(draft.follow_up)
                .bind(draft.follow_up_start)
                .bind(draft.follow_up_end)
                .bind(draft.next_visit_reason_id)
                .bind(draft.next_visit_salesperson_id)
                .bind(&draft.validated_by)
                .bind(draft.validated_at)
                .bind(draft.created_at)
                .bind(&draft.created_by)
                .bind(draft.updated_at)
                .bind(&draft.updated_by)
                .execute(&mut *conn)
                .await?;
                id
            }
            None => {
                let code_clause = if assign_code {
                    "nextval('visit_code_seq')"
                } else {
                    "NULL"
                };
                let insert = format!(
                    r#"
                    INSERT INTO visits (
                        code, visit_date, salesperson1_id, salesperson2_id,
                        contact_type, client_id, prospect_id, visit_reason_id,
                        contact_name, contact_role, notes, follow_up,
                        follow_up_start, follow_up_end, next_visit_reason_id,
                        next_visit_salesperson_id, validated_by, validated_at,
                        created_at, created_by, updated_at, updated_by
                    )
                    VALUES (
                        {code_clause}, $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                        $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21
                    )
                    RETURNING id
                    "#
                );
                sqlx::query_scalar::<_, Uuid>(&insert)
                    .bind(draft.visit_date)
                    .bind(draft.salesperson1_id)
                    .bind(draft.salesperson2_id)
                    .bind(draft.contact_type)
                    .bind(draft.client_id)
                    .bind(draft.prospect_id)
                    .bind(draft.visit_reason_id)
                    .bind(&draft.contact_name)
                    .bind(&draft.contact_role)
                    .bind(&draft.notes)
                    .bind(draft.follow_up)
                    .bind(draft.follow_up_start)
                    .bind(draft.follow_up_end)
                    .bind(draft.next_visit_reason_id)
                    .bind(draft.next_visit_salesperson_id)
                    .bind(&draft.validated_by)
                    .bind(draft.validated_at)
                    .bind(draft.created_at)
                    .bind(&draft.created_by)
                    .bind(draft.updated_at)
                    .bind(&draft.updated_by)
                    .fetch_one(&mut *conn)
                    .await?
            }
        };

        sqlx::query("DELETE FROM visit_product_lines WHERE visit_id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        for product_line_id in &draft.product_line_ids {
            sqlx::query(
                "INSERT INTO visit_product_lines (visit_id, product_line_id) VALUES ($1, $2)",
            )
            .bind(id)
            .bind(product_line_id)
            .execute(&mut *conn)
            .await?;
        }

        sqlx::query("DELETE FROM visit_competitors WHERE visit_id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        for competitor_id in &draft.competitor_ids {
            sqlx::query("INSERT INTO visit_competitors (visit_id, competitor_id) VALUES ($1, $2)")
                .bind(id)
                .bind(competitor_id)
                .execute(&mut *conn)
                .await?;
        }

        Ok(id)
    }

    /// Stamps the validation fields. Only touches rows not yet validated;
    /// returns false when the row was missing or already stamped.
    pub async fn mark_validated(
        &self,
        id: Uuid,
        by: &str,
        on: NaiveDate,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE visits SET validated_by = $2, validated_at = $3 \
             WHERE id = $1 AND validated_at IS NULL",
        )
        .bind(id)
        .bind(by)
        .bind(on)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // Fills product-line and competitor id lists with two grouped queries
    // instead of one pair per visit.
    async fn load_associations(&self, visits: &mut [Visit]) -> Result<(), AppError> {
        if visits.is_empty() {
            return Ok(());
        }
        let ids: Vec<Uuid> = visits.iter().map(|v| v.id).collect();

        let product_rows = sqlx::query_as::<_, (Uuid, Uuid)>(
            "SELECT visit_id, product_line_id FROM visit_product_lines WHERE visit_id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let competitor_rows = sqlx::query_as::<_, (Uuid, Uuid)>(
            "SELECT visit_id, competitor_id FROM visit_competitors WHERE visit_id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut products: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for (visit_id, product_line_id) in product_rows {
            products.entry(visit_id).or_default().push(product_line_id);
        }
        let mut competitors: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for (visit_id, competitor_id) in competitor_rows {
            competitors.entry(visit_id).or_default().push(competitor_id);
        }

        for visit in visits.iter_mut() {
            visit.product_line_ids = products.remove(&visit.id).unwrap_or_default();
            visit.competitor_ids = competitors.remove(&visit.id).unwrap_or_default();
        }
        Ok(())
    }
}
