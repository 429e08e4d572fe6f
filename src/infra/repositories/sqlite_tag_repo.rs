use crate::domain::models::{contact::ContactTagRow, tag::Tag};
use crate::domain::ports::TagRepository;
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

pub struct SqliteTagRepo {
    pool: SqlitePool,
}

impl SqliteTagRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TagRepository for SqliteTagRepo {
    async fn list(&self) -> Result<Vec<Tag>, AppError> {
        sqlx::query_as::<_, Tag>("SELECT * FROM tags ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn tags_for_contacts(&self, contact_ids: &[i64]) -> Result<Vec<ContactTagRow>, AppError> {
        if contact_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT ct.contact_id, t.id, t.name, t.color, t.created_at
             FROM contact_tags ct JOIN tags t ON t.id = ct.tag_id
             WHERE ct.contact_id IN ("
        );
        let mut separated = qb.separated(", ");
        for id in contact_ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY t.name ASC");
        qb.build_query_as::<ContactTagRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }
}
