use crate::domain::models::team_member::{NewTeamMember, TeamMember, TeamMemberSummary};
use crate::domain::ports::TeamMemberRepository;
use crate::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;

pub struct PostgresTeamMemberRepo {
    pool: PgPool,
}

impl PostgresTeamMemberRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TeamMemberRepository for PostgresTeamMemberRepo {
    async fn create(&self, member: &NewTeamMember) -> Result<TeamMember, AppError> {
        let now = Utc::now();
        sqlx::query_as::<_, TeamMember>(
            "INSERT INTO team_members (name, email, role, user_id, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6) RETURNING *"
        )
            .bind(&member.name)
            .bind(&member.email)
            .bind(&member.role)
            .bind(&member.user_id)
            .bind(now)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<TeamMember>, AppError> {
        sqlx::query_as::<_, TeamMember>("SELECT * FROM team_members WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<TeamMember>, AppError> {
        sqlx::query_as::<_, TeamMember>("SELECT * FROM team_members WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<TeamMember>, AppError> {
        sqlx::query_as::<_, TeamMember>("SELECT * FROM team_members WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<TeamMember>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as::<_, TeamMember>("SELECT * FROM team_members WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn summaries_by_ids(&self, ids: &[i64]) -> Result<Vec<TeamMemberSummary>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as::<_, TeamMemberSummary>("SELECT id, name FROM team_members WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn link_user(&self, id: i64, user_id: &str) -> Result<TeamMember, AppError> {
        sqlx::query_as::<_, TeamMember>(
            "UPDATE team_members SET user_id = $1, updated_at = $2 WHERE id = $3 RETURNING *"
        )
            .bind(user_id)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("Team member not found".into()))
    }

    async fn update_profile(&self, id: i64, name: &str, role: Option<&str>) -> Result<(), AppError> {
        sqlx::query("UPDATE team_members SET name = $1, role = $2, updated_at = $3 WHERE id = $4")
            .bind(name)
            .bind(role)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<TeamMember>, AppError> {
        sqlx::query_as::<_, TeamMember>("SELECT * FROM team_members ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }
}
