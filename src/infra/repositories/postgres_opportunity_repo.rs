use std::str::FromStr;

use bigdecimal::BigDecimal;
use crate::domain::models::opportunity::{Opportunity, OpportunityStatus, OpportunitySummary, StatusTotal};
use crate::domain::ports::OpportunityRepository;
use crate::domain::validation::schemas::OpportunityPayload;
use crate::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{FromRow, PgPool};

const OPPORTUNITY_COLUMNS: &str = "id, title, description, value::TEXT AS value, status, estimated_close_date, \
    company_id, contact_id, owner_id, created_at, updated_at";

pub struct PostgresOpportunityRepo {
    pool: PgPool,
}

impl PostgresOpportunityRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct StatusTotalRow {
    status: String,
    count: i64,
    total: String,
}

#[async_trait]
impl OpportunityRepository for PostgresOpportunityRepo {
    async fn list_by_status(
        &self,
        status: OpportunityStatus,
        owner_id: Option<i64>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Opportunity>, AppError> {
        sqlx::query_as::<_, Opportunity>(&format!(
            "SELECT {} FROM opportunities
             WHERE status = $1 AND ($2::BIGINT IS NULL OR owner_id = $2)
             ORDER BY updated_at DESC, id DESC LIMIT $3 OFFSET $4",
            OPPORTUNITY_COLUMNS
        ))
            .bind(status.as_str())
            .bind(owner_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn status_totals(&self, owner_id: Option<i64>) -> Result<Vec<StatusTotal>, AppError> {
        let rows = sqlx::query_as::<_, StatusTotalRow>(
            "SELECT status, COUNT(*) AS count, COALESCE(SUM(value), 0)::TEXT AS total
             FROM opportunities WHERE ($1::BIGINT IS NULL OR owner_id = $1)
             GROUP BY status ORDER BY status"
        )
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)?;

        let mut totals = rows
            .into_iter()
            .map(|row| {
                let status = OpportunityStatus::from_str(&row.status).map_err(AppError::InternalWithMsg)?;
                let value = BigDecimal::from_str(&row.total)
                    .map_err(|e| AppError::InternalWithMsg(format!("invalid pipeline sum: {}", e)))?;
                Ok(StatusTotal { status, count: row.count, value })
            })
            .collect::<Result<Vec<_>, AppError>>()?;
        totals.sort_by_key(|t| t.status);
        Ok(totals)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Opportunity>, AppError> {
        sqlx::query_as::<_, Opportunity>(&format!("SELECT {} FROM opportunities WHERE id = $1", OPPORTUNITY_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn summaries_by_ids(&self, ids: &[i64]) -> Result<Vec<OpportunitySummary>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as::<_, OpportunitySummary>(
            "SELECT id, title, status, contact_id FROM opportunities WHERE id = ANY($1)"
        )
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn summaries_for_contacts(&self, contact_ids: &[i64]) -> Result<Vec<OpportunitySummary>, AppError> {
        if contact_ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as::<_, OpportunitySummary>(
            "SELECT id, title, status, contact_id FROM opportunities
             WHERE contact_id = ANY($1) ORDER BY updated_at DESC, id DESC"
        )
            .bind(contact_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn options(&self, limit: i64) -> Result<Vec<OpportunitySummary>, AppError> {
        sqlx::query_as::<_, OpportunitySummary>(
            "SELECT id, title, status, contact_id FROM opportunities ORDER BY updated_at DESC, id DESC LIMIT $1"
        )
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn save(&self, payload: &OpportunityPayload) -> Result<Opportunity, AppError> {
        let now = Utc::now();
        match payload.id {
            Some(id) => sqlx::query_as::<_, Opportunity>(&format!(
                "UPDATE opportunities SET title = $1, description = $2, value = $3::NUMERIC, status = $4,
                 estimated_close_date = $5, company_id = $6, contact_id = $7, owner_id = $8, updated_at = $9
                 WHERE id = $10 RETURNING {}",
                OPPORTUNITY_COLUMNS
            ))
                .bind(&payload.title)
                .bind(&payload.description)
                .bind(&payload.value)
                .bind(payload.status.as_str())
                .bind(payload.estimated_close_date)
                .bind(payload.company_id)
                .bind(payload.contact_id)
                .bind(payload.owner_id)
                .bind(now)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(AppError::Database)?
                .ok_or_else(|| AppError::NotFound("Opportunity not found".into())),
            None => sqlx::query_as::<_, Opportunity>(&format!(
                "INSERT INTO opportunities (title, description, value, status, estimated_close_date,
                 company_id, contact_id, owner_id, created_at, updated_at)
                 VALUES ($1, $2, $3::NUMERIC, $4, $5, $6, $7, $8, $9, $10) RETURNING {}",
                OPPORTUNITY_COLUMNS
            ))
                .bind(&payload.title)
                .bind(&payload.description)
                .bind(&payload.value)
                .bind(payload.status.as_str())
                .bind(payload.estimated_close_date)
                .bind(payload.company_id)
                .bind(payload.contact_id)
                .bind(payload.owner_id)
                .bind(now)
                .bind(now)
                .fetch_one(&self.pool)
                .await
                .map_err(AppError::Database),
        }
    }

    async fn delete(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM opportunities WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Opportunity not found".into()));
        }
        Ok(())
    }
}
