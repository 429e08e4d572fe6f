use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use super::activity::ActivitySummary;
use super::company::Company;
use super::opportunity::OpportunitySummary;
use super::tag::Tag;
use super::team_member::TeamMember;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub job_title: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub notes: Option<String>,
    pub company_id: Option<i64>,
    pub owner_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContactSummary {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ContactWithRelations {
    #[serde(flatten)]
    pub contact: Contact,
    pub company: Option<Company>,
    pub owner: Option<TeamMember>,
    pub tags: Vec<Tag>,
    pub activities: Vec<ActivitySummary>,
    pub opportunities: Vec<OpportunitySummary>,
}

/// A tag attached to a contact, as returned by batched tag lookups.
#[derive(Debug, FromRow, Clone)]
pub struct ContactTagRow {
    pub contact_id: i64,
    #[sqlx(flatten)]
    pub tag: Tag,
}
