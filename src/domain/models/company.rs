use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: i64,
    pub name: String,
    pub city: Option<String>,
    pub country: Option<String>,
    pub industry: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CompanyOption {
    pub id: i64,
    pub name: String,
}

/// Identity used to avoid duplicate company rows when a contact names its
/// company inline. Name comparison is case-insensitive, city and country
/// compare null-safely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyKey {
    pub name: String,
    pub city: Option<String>,
    pub country: Option<String>,
}

impl CompanyKey {
    pub fn name_key(&self) -> String {
        super::fold_key(&self.name)
    }
}
