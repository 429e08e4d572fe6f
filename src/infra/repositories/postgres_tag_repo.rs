use crate::domain::models::{contact::ContactTagRow, tag::Tag};
use crate::domain::ports::TagRepository;
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::PgPool;

pub struct PostgresTagRepo {
    pool: PgPool,
}

impl PostgresTagRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TagRepository for PostgresTagRepo {
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
        sqlx::query_as::<_, ContactTagRow>(
            "SELECT ct.contact_id, t.id, t.name, t.color, t.created_at
             FROM contact_tags ct JOIN tags t ON t.id = ct.tag_id
             WHERE ct.contact_id = ANY($1)
             ORDER BY t.name ASC"
        )
            .bind(contact_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }
}
