use crate::domain::models::session_log::{NewSessionLog, SessionLog};
use crate::domain::ports::SessionLogRepository;
use crate::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

pub struct SqliteSessionLogRepo { pool: SqlitePool }
impl SqliteSessionLogRepo { pub fn new(pool: SqlitePool) -> Self { Self { pool } } }

#[async_trait]
impl SessionLogRepository for SqliteSessionLogRepo {
    async fn record(&self, entry: &NewSessionLog) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO session_logs (user_id, email, ip_address, user_agent, created_at) VALUES (?, ?, ?, ?, ?)"
        )
            .bind(&entry.user_id)
            .bind(&entry.email)
            .bind(&entry.ip_address)
            .bind(&entry.user_agent)
            .bind(Utc::now())
            .execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(())
    }

    async fn list_for_user(&self, user_id: &str, limit: i64) -> Result<Vec<SessionLog>, AppError> {
        sqlx::query_as::<_, SessionLog>(
            "SELECT id, user_id, email, ip_address, user_agent, created_at
             FROM session_logs WHERE user_id = ? ORDER BY created_at DESC, id DESC LIMIT ?"
        )
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool).await.map_err(AppError::Database)
    }
}
