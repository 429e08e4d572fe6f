use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

pub const DEFAULT_MEMBER_ROLE: &str = "Executive";
pub const LOGIN_MEMBER_ROLE: &str = "Collaborator";

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Option<String>,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTeamMember {
    pub name: String,
    pub email: String,
    pub role: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TeamMemberSummary {
    pub id: i64,
    pub name: String,
}
