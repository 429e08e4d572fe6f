use crate::domain::models::company::{Company, CompanyOption};
use crate::domain::ports::CompanyRepository;
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::PgPool;

pub struct PostgresCompanyRepo {
    pool: PgPool,
}

impl PostgresCompanyRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CompanyRepository for PostgresCompanyRepo {
    async fn list(&self) -> Result<Vec<Company>, AppError> {
        sqlx::query_as::<_, Company>("SELECT * FROM companies ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn options(&self, limit: i64) -> Result<Vec<CompanyOption>, AppError> {
        sqlx::query_as::<_, CompanyOption>("SELECT id, name FROM companies ORDER BY name ASC LIMIT $1")
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Company>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }
}
