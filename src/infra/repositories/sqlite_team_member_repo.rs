use crate::domain::models::team_member::{NewTeamMember, TeamMember, TeamMemberSummary};
use crate::domain::ports::TeamMemberRepository;
use crate::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

pub struct SqliteTeamMemberRepo {
    pool: SqlitePool,
}

impl SqliteTeamMemberRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TeamMemberRepository for SqliteTeamMemberRepo {
    async fn create(&self, member: &NewTeamMember) -> Result<TeamMember, AppError> {
        let now = Utc::now();
        sqlx::query_as::<_, TeamMember>(
            "INSERT INTO team_members (name, email, role, user_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?) RETURNING *"
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
        sqlx::query_as::<_, TeamMember>("SELECT * FROM team_members WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<TeamMember>, AppError> {
        sqlx::query_as::<_, TeamMember>("SELECT * FROM team_members WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<TeamMember>, AppError> {
        sqlx::query_as::<_, TeamMember>("SELECT * FROM team_members WHERE LOWER(email) = LOWER(?)")
            .bind(email)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<TeamMember>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM team_members WHERE id IN (");
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");
        qb.build_query_as::<TeamMember>()
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn summaries_by_ids(&self, ids: &[i64]) -> Result<Vec<TeamMemberSummary>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT id, name FROM team_members WHERE id IN (");
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");
        qb.build_query_as::<TeamMemberSummary>()
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn link_user(&self, id: i64, user_id: &str) -> Result<TeamMember, AppError> {
        sqlx::query_as::<_, TeamMember>(
            "UPDATE team_members SET user_id = ?, updated_at = ? WHERE id = ? RETURNING *"
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
        sqlx::query("UPDATE team_members SET name = ?, role = ?, updated_at = ? WHERE id = ?")
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
