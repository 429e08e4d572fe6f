use crate::domain::models::company::{Company, CompanyOption};
use crate::domain::ports::CompanyRepository;
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

pub struct SqliteCompanyRepo {
    pool: SqlitePool,
}

impl SqliteCompanyRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CompanyRepository for SqliteCompanyRepo {
    async fn list(&self) -> Result<Vec<Company>, AppError> {
        sqlx::query_as::<_, Company>("SELECT * FROM companies ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn options(&self, limit: i64) -> Result<Vec<CompanyOption>, AppError> {
        sqlx::query_as::<_, CompanyOption>("SELECT id, name FROM companies ORDER BY name ASC LIMIT ?")
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Company>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM companies WHERE id IN (");
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");
        qb.build_query_as::<Company>()
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }
}
