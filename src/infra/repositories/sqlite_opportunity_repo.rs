use std::collections::HashMap;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use crate::domain::models::opportunity::{Opportunity, OpportunityStatus, OpportunitySummary, StatusTotal};
use crate::domain::ports::OpportunityRepository;
use crate::domain::validation::schemas::OpportunityPayload;
use crate::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use tracing::warn;

pub struct SqliteOpportunityRepo {
    pool: SqlitePool,
}

impl SqliteOpportunityRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct StatusValueRow {
    status: String,
    value: Option<String>,
}

#[async_trait]
impl OpportunityRepository for SqliteOpportunityRepo {
    async fn list_by_status(
        &self,
        status: OpportunityStatus,
        owner_id: Option<i64>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Opportunity>, AppError> {
        sqlx::query_as::<_, Opportunity>(
            "SELECT * FROM opportunities
             WHERE status = ? AND (? IS NULL OR owner_id = ?)
             ORDER BY updated_at DESC, id DESC LIMIT ? OFFSET ?"
        )
            .bind(status.as_str())
            .bind(owner_id)
            .bind(owner_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    // SQLite keeps amounts as TEXT, so sums are done with decimal arithmetic
    // here instead of SUM().
    async fn status_totals(&self, owner_id: Option<i64>) -> Result<Vec<StatusTotal>, AppError> {
        let rows = sqlx::query_as::<_, StatusValueRow>(
            "SELECT status, value FROM opportunities WHERE (? IS NULL OR owner_id = ?)"
        )
            .bind(owner_id)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)?;

        let mut totals: HashMap<OpportunityStatus, StatusTotal> = HashMap::new();
        for row in rows {
            let status = OpportunityStatus::from_str(&row.status).map_err(AppError::InternalWithMsg)?;
            let total = totals.entry(status).or_insert_with(|| StatusTotal::empty(status));
            total.count += 1;
            if let Some(raw) = row.value.as_deref() {
                match BigDecimal::from_str(raw) {
                    Ok(amount) => total.value += amount,
                    Err(e) => warn!("Skipping unparseable opportunity value {:?}: {}", raw, e),
                }
            }
        }

        let mut totals: Vec<StatusTotal> = totals.into_values().collect();
        totals.sort_by_key(|t| t.status);
        Ok(totals)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Opportunity>, AppError> {
        sqlx::query_as::<_, Opportunity>("SELECT * FROM opportunities WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn summaries_by_ids(&self, ids: &[i64]) -> Result<Vec<OpportunitySummary>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT id, title, status, contact_id FROM opportunities WHERE id IN ("
        );
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");
        qb.build_query_as::<OpportunitySummary>()
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn summaries_for_contacts(&self, contact_ids: &[i64]) -> Result<Vec<OpportunitySummary>, AppError> {
        if contact_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT id, title, status, contact_id FROM opportunities WHERE contact_id IN ("
        );
        let mut separated = qb.separated(", ");
        for id in contact_ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY updated_at DESC, id DESC");
        qb.build_query_as::<OpportunitySummary>()
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn options(&self, limit: i64) -> Result<Vec<OpportunitySummary>, AppError> {
        sqlx::query_as::<_, OpportunitySummary>(
            "SELECT id, title, status, contact_id FROM opportunities ORDER BY updated_at DESC, id DESC LIMIT ?"
        )
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn save(&self, payload: &OpportunityPayload) -> Result<Opportunity, AppError> {
        let now = Utc::now();
        match payload.id {
            Some(id) => sqlx::query_as::<_, Opportunity>(
                "UPDATE opportunities SET title = ?, description = ?, value = ?, status = ?, estimated_close_date = ?,
                 company_id = ?, contact_id = ?, owner_id = ?, updated_at = ?
                 WHERE id = ? RETURNING *"
            )
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
            None => sqlx::query_as::<_, Opportunity>(
                "INSERT INTO opportunities (title, description, value, status, estimated_close_date,
                 company_id, contact_id, owner_id, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING *"
            )
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
        let result = sqlx::query("DELETE FROM opportunities WHERE id = ?")
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
