use std::collections::BTreeSet;

use crate::domain::models::company::CompanyKey;
use crate::domain::models::contact::{Contact, ContactSummary};
use crate::domain::models::fold_key;
use crate::domain::models::tag::color_for;
use crate::domain::ports::ContactRepository;
use crate::domain::validation::schemas::ContactPayload;
use crate::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, error};

use super::{like_pattern, FIND_OR_CREATE_ATTEMPTS, SEARCH_COLUMNS};

pub struct SqliteContactRepo {
    pool: SqlitePool,
}

impl SqliteContactRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn push_search_filter(qb: &mut QueryBuilder<'_, Sqlite>, tokens: &[String]) {
    qb.push(" WHERE 1 = 1");
    for token in tokens {
        let pattern = like_pattern(token);
        qb.push(" AND (");
        for (i, column) in SEARCH_COLUMNS.iter().enumerate() {
            if i > 0 {
                qb.push(" OR ");
            }
            qb.push(format!("COALESCE({}, '') LIKE ", column));
            qb.push_bind(pattern.clone());
            qb.push(" ESCAPE '\\'");
        }
        qb.push(
            " OR EXISTS (SELECT 1 FROM contact_tags ct JOIN tags t ON t.id = ct.tag_id \
             WHERE ct.contact_id = c.id AND t.name_key LIKE ",
        );
        qb.push_bind(pattern);
        qb.push(" ESCAPE '\\'))");
    }
}

async fn find_or_create_company(conn: &mut SqliteConnection, key: &CompanyKey) -> Result<i64, AppError> {
    let name_key = key.name_key();
    for attempt in 1..=FIND_OR_CREATE_ATTEMPTS {
        let existing = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM companies
             WHERE name_key = ? AND COALESCE(city, '') = COALESCE(?, '') AND COALESCE(country, '') = COALESCE(?, '')"
        )
            .bind(&name_key)
            .bind(&key.city)
            .bind(&key.country)
            .fetch_optional(&mut *conn)
            .await
            .map_err(AppError::Database)?;

        let now = Utc::now();
        if let Some(id) = existing {
            sqlx::query("UPDATE companies SET name = ?, city = ?, country = ?, updated_at = ? WHERE id = ?")
                .bind(&key.name)
                .bind(&key.city)
                .bind(&key.country)
                .bind(now)
                .bind(id)
                .execute(&mut *conn)
                .await
                .map_err(AppError::Database)?;
            return Ok(id);
        }

        debug!(attempt, company = %key.name, "creating company");
        sqlx::query(
            "INSERT INTO companies (name, name_key, city, country, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?) ON CONFLICT DO NOTHING"
        )
            .bind(&key.name)
            .bind(&name_key)
            .bind(&key.city)
            .bind(&key.country)
            .bind(now)
            .bind(now)
            .execute(&mut *conn)
            .await
            .map_err(AppError::Database)?;
    }
    Err(AppError::Conflict(format!("Could not resolve company '{}'", key.name)))
}

async fn find_or_create_tag(conn: &mut SqliteConnection, name: &str) -> Result<i64, AppError> {
    let name_key = fold_key(name);
    for _ in 0..FIND_OR_CREATE_ATTEMPTS {
        let existing = sqlx::query_scalar::<_, i64>("SELECT id FROM tags WHERE name_key = ?")
            .bind(&name_key)
            .fetch_optional(&mut *conn)
            .await
            .map_err(AppError::Database)?;
        if let Some(id) = existing {
            return Ok(id);
        }

        sqlx::query("INSERT INTO tags (name, name_key, color, created_at) VALUES (?, ?, ?, ?) ON CONFLICT DO NOTHING")
            .bind(name)
            .bind(&name_key)
            .bind(color_for(name))
            .bind(Utc::now())
            .execute(&mut *conn)
            .await
            .map_err(AppError::Database)?;
    }
    Err(AppError::Conflict(format!("Could not resolve tag '{}'", name)))
}

#[async_trait]
impl ContactRepository for SqliteContactRepo {
    async fn search(&self, tokens: &[String], limit: i64, offset: i64) -> Result<Vec<Contact>, AppError> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT c.* FROM contacts c LEFT JOIN companies co ON co.id = c.company_id"
        );
        push_search_filter(&mut qb, tokens);
        qb.push(" ORDER BY c.last_name ASC, c.first_name ASC, c.id ASC LIMIT ");
        qb.push_bind(limit);
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        qb.build_query_as::<Contact>()
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn count_matching(&self, tokens: &[String]) -> Result<i64, AppError> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT COUNT(*) FROM contacts c LEFT JOIN companies co ON co.id = c.company_id"
        );
        push_search_filter(&mut qb, tokens);
        qb.build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn count(&self, owner_id: Option<i64>) -> Result<i64, AppError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM contacts WHERE (? IS NULL OR owner_id = ?)")
            .bind(owner_id)
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Contact>, AppError> {
        sqlx::query_as::<_, Contact>("SELECT * FROM contacts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Contact>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM contacts WHERE id IN (");
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");
        qb.build_query_as::<Contact>()
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn summaries_by_ids(&self, ids: &[i64]) -> Result<Vec<ContactSummary>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT id, first_name, last_name, email FROM contacts WHERE id IN ("
        );
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");
        qb.build_query_as::<ContactSummary>()
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn options(&self, limit: i64) -> Result<Vec<ContactSummary>, AppError> {
        sqlx::query_as::<_, ContactSummary>(
            "SELECT id, first_name, last_name, email FROM contacts ORDER BY updated_at DESC, id DESC LIMIT ?"
        )
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn save(&self, payload: &ContactPayload) -> Result<Contact, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let company_id = match payload.company_key() {
            Some(key) => Some(find_or_create_company(&mut tx, &key).await?),
            None => None,
        };

        let now = Utc::now();
        let search_key = payload.search_key();
        let contact = match payload.id {
            Some(id) => sqlx::query_as::<_, Contact>(
                "UPDATE contacts SET first_name = ?, last_name = ?, email = ?, phone = ?, job_title = ?,
                 city = ?, state = ?, country = ?, notes = ?, search_key = ?, company_id = ?, owner_id = ?,
                 updated_at = ? WHERE id = ? RETURNING *"
            )
                .bind(&payload.first_name)
                .bind(&payload.last_name)
                .bind(&payload.email)
                .bind(&payload.phone)
                .bind(&payload.job_title)
                .bind(&payload.city)
                .bind(&payload.state)
                .bind(&payload.country)
                .bind(&payload.notes)
                .bind(&search_key)
                .bind(company_id)
                .bind(payload.owner_id)
                .bind(now)
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(AppError::Database)?
                .ok_or_else(|| AppError::NotFound("Contact not found".into()))?,
            None => sqlx::query_as::<_, Contact>(
                "INSERT INTO contacts (first_name, last_name, email, phone, job_title, city, state, country, notes,
                 search_key, company_id, owner_id, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING *"
            )
                .bind(&payload.first_name)
                .bind(&payload.last_name)
                .bind(&payload.email)
                .bind(&payload.phone)
                .bind(&payload.job_title)
                .bind(&payload.city)
                .bind(&payload.state)
                .bind(&payload.country)
                .bind(&payload.notes)
                .bind(&search_key)
                .bind(company_id)
                .bind(payload.owner_id)
                .bind(now)
                .bind(now)
                .fetch_one(&mut *tx)
                .await
                .map_err(AppError::Database)?,
        };

        sqlx::query("DELETE FROM contact_tags WHERE contact_id = ?")
            .bind(contact.id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        let mut tag_ids = BTreeSet::new();
        for name in &payload.tags {
            tag_ids.insert(find_or_create_tag(&mut tx, name).await?);
        }
        for tag_id in tag_ids {
            sqlx::query("INSERT INTO contact_tags (contact_id, tag_id) VALUES (?, ?) ON CONFLICT DO NOTHING")
                .bind(contact.id)
                .bind(tag_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    error!("SQLite contact tag link failed: {:?}", e);
                    AppError::Database(e)
                })?;
        }

        tx.commit().await.map_err(AppError::Database)?;
        Ok(contact)
    }

    async fn delete(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM contacts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Contact not found".into()));
        }
        Ok(())
    }
}
