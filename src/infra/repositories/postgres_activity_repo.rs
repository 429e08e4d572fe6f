use crate::domain::models::activity::{Activity, ActivitySummary};
use crate::domain::ports::ActivityRepository;
use crate::domain::validation::schemas::{ActivityFilter, ActivityPayload};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

const SUMMARY_COLUMNS: &str = "id, type, status, subject, scheduled_for, due_date, created_at, contact_id, opportunity_id";

pub struct PostgresActivityRepo {
    pool: PgPool,
}

impl PostgresActivityRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn recent_by(&self, parent_column: &str, ids: &[i64], per_parent: i64) -> Result<Vec<ActivitySummary>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {cols} FROM (
                SELECT a.*, ROW_NUMBER() OVER (PARTITION BY a.{parent} ORDER BY a.created_at DESC, a.id DESC) AS rn
                FROM activities a WHERE a.{parent} = ANY(",
            cols = SUMMARY_COLUMNS,
            parent = parent_column,
        ));
        qb.push_bind(ids.to_vec());
        qb.push(")) ranked WHERE rn <= ");
        qb.push_bind(per_parent);
        qb.push(" ORDER BY created_at DESC, id DESC");

        qb.build_query_as::<ActivitySummary>()
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &ActivityFilter, owner_id: Option<i64>) {
    qb.push(" WHERE TRUE");
    if let Some(kind) = filter.kind.kind() {
        qb.push(" AND type = ").push_bind(kind.as_str());
    }
    let column = filter.date_field.column();
    if let Some(from) = filter.from {
        qb.push(format!(" AND {} >= ", column)).push_bind(from);
    }
    if let Some(to) = filter.to {
        qb.push(format!(" AND {} <= ", column)).push_bind(to);
    }
    if let Some(owner_id) = owner_id {
        qb.push(" AND team_member_id = ").push_bind(owner_id);
    }
}

#[async_trait]
impl ActivityRepository for PostgresActivityRepo {
    async fn list(
        &self,
        filter: &ActivityFilter,
        owner_id: Option<i64>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Activity>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM activities");
        push_filter(&mut qb, filter, owner_id);
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        qb.push_bind(limit);
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        qb.build_query_as::<Activity>()
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn count_filtered(&self, filter: &ActivityFilter, owner_id: Option<i64>) -> Result<i64, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM activities");
        push_filter(&mut qb, filter, owner_id);
        qb.build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn count(&self, owner_id: Option<i64>) -> Result<i64, AppError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM activities WHERE ($1::BIGINT IS NULL OR team_member_id = $1)")
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Activity>, AppError> {
        sqlx::query_as::<_, Activity>("SELECT * FROM activities WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_for_opportunity(&self, opportunity_id: i64, limit: i64) -> Result<Vec<Activity>, AppError> {
        sqlx::query_as::<_, Activity>(
            "SELECT * FROM activities WHERE opportunity_id = $1 ORDER BY created_at DESC, id DESC LIMIT $2"
        )
            .bind(opportunity_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn recent_for_contacts(&self, contact_ids: &[i64], per_parent: i64) -> Result<Vec<ActivitySummary>, AppError> {
        self.recent_by("contact_id", contact_ids, per_parent).await
    }

    async fn recent_for_opportunities(&self, opportunity_ids: &[i64], per_parent: i64) -> Result<Vec<ActivitySummary>, AppError> {
        self.recent_by("opportunity_id", opportunity_ids, per_parent).await
    }

    async fn upcoming(
        &self,
        owner_id: Option<i64>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Activity>, AppError> {
        sqlx::query_as::<_, Activity>(
            "SELECT * FROM activities
             WHERE ($1::BIGINT IS NULL OR team_member_id = $1)
               AND ((due_date >= $2 AND due_date <= $3) OR (scheduled_for >= $4 AND scheduled_for <= $5))
             ORDER BY due_date ASC NULLS LAST, id ASC LIMIT $6"
        )
            .bind(owner_id)
            .bind(from)
            .bind(to)
            .bind(from)
            .bind(to)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn save(&self, payload: &ActivityPayload) -> Result<Activity, AppError> {
        let now = Utc::now();
        match payload.id {
            Some(id) => sqlx::query_as::<_, Activity>(
                "UPDATE activities SET type = $1, status = $2, subject = $3, notes = $4, scheduled_for = $5, due_date = $6,
                 completed_at = $7, contact_id = $8, opportunity_id = $9, team_member_id = $10, updated_at = $11
                 WHERE id = $12 RETURNING *"
            )
                .bind(payload.kind.as_str())
                .bind(payload.status.as_str())
                .bind(&payload.subject)
                .bind(&payload.notes)
                .bind(payload.scheduled_for)
                .bind(payload.due_date)
                .bind(payload.completed_at)
                .bind(payload.contact_id)
                .bind(payload.opportunity_id)
                .bind(payload.team_member_id)
                .bind(now)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(AppError::Database)?
                .ok_or_else(|| AppError::NotFound("Activity not found".into())),
            None => sqlx::query_as::<_, Activity>(
                "INSERT INTO activities (type, status, subject, notes, scheduled_for, due_date, completed_at,
                 contact_id, opportunity_id, team_member_id, created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING *"
            )
                .bind(payload.kind.as_str())
                .bind(payload.status.as_str())
                .bind(&payload.subject)
                .bind(&payload.notes)
                .bind(payload.scheduled_for)
                .bind(payload.due_date)
                .bind(payload.completed_at)
                .bind(payload.contact_id)
                .bind(payload.opportunity_id)
                .bind(payload.team_member_id)
                .bind(now)
                .bind(now)
                .fetch_one(&self.pool)
                .await
                .map_err(AppError::Database),
        }
    }

    async fn delete(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM activities WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Activity not found".into()));
        }
        Ok(())
    }
}
