use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use super::contact::ContactSummary;
use super::opportunity::OpportunitySummary;
use super::team_member::TeamMemberSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityType {
    #[default]
    Call,
    Email,
    Meeting,
    Task,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Call => "CALL",
            ActivityType::Email => "EMAIL",
            ActivityType::Meeting => "MEETING",
            ActivityType::Task => "TASK",
        }
    }
}

impl FromStr for ActivityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CALL" => Ok(ActivityType::Call),
            "EMAIL" => Ok(ActivityType::Email),
            "MEETING" => Ok(ActivityType::Meeting),
            "TASK" => Ok(ActivityType::Task),
            other => Err(format!("unknown activity type: {}", other)),
        }
    }
}

impl TryFrom<String> for ActivityType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityStatus {
    #[default]
    Planned,
    Completed,
    Cancelled,
}

impl ActivityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityStatus::Planned => "PLANNED",
            ActivityStatus::Completed => "COMPLETED",
            ActivityStatus::Cancelled => "CANCELLED",
        }
    }
}

impl FromStr for ActivityStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PLANNED" => Ok(ActivityStatus::Planned),
            "COMPLETED" => Ok(ActivityStatus::Completed),
            "CANCELLED" => Ok(ActivityStatus::Cancelled),
            other => Err(format!("unknown activity status: {}", other)),
        }
    }
}

impl TryFrom<String> for ActivityStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for ActivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which timestamp column an activity date range applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DateField {
    #[default]
    Created,
    Scheduled,
    Due,
    Resolved,
}

impl DateField {
    pub fn column(&self) -> &'static str {
        match self {
            DateField::Created => "created_at",
            DateField::Scheduled => "scheduled_for",
            DateField::Due => "due_date",
            DateField::Resolved => "completed_at",
        }
    }

    pub fn parse_or_default(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("scheduled") => DateField::Scheduled,
            Some("due") => DateField::Due,
            Some("resolved") => DateField::Resolved,
            _ => DateField::Created,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: i64,
    #[sqlx(rename = "type", try_from = "String")]
    #[serde(rename = "type")]
    pub kind: ActivityType,
    #[sqlx(try_from = "String")]
    pub status: ActivityStatus,
    pub subject: String,
    pub notes: Option<String>,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub contact_id: Option<i64>,
    pub opportunity_id: Option<i64>,
    pub team_member_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Compact activity row embedded in contact and opportunity cards.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySummary {
    pub id: i64,
    #[sqlx(rename = "type", try_from = "String")]
    #[serde(rename = "type")]
    pub kind: ActivityType,
    #[sqlx(try_from = "String")]
    pub status: ActivityStatus,
    pub subject: String,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub contact_id: Option<i64>,
    #[serde(skip)]
    pub opportunity_id: Option<i64>,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ActivityWithRelations {
    #[serde(flatten)]
    pub activity: Activity,
    pub contact: Option<ContactSummary>,
    pub opportunity: Option<OpportunitySummary>,
    pub team_member: Option<TeamMemberSummary>,
}
