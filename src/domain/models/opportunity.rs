use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use super::activity::{ActivitySummary, ActivityWithRelations};
use super::company::Company;
use super::contact::Contact;
use super::team_member::TeamMember;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OpportunityStatus {
    #[default]
    New,
    InProgress,
    Won,
    Lost,
}

impl OpportunityStatus {
    pub const ALL: [OpportunityStatus; 4] = [
        OpportunityStatus::New,
        OpportunityStatus::InProgress,
        OpportunityStatus::Won,
        OpportunityStatus::Lost,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OpportunityStatus::New => "NEW",
            OpportunityStatus::InProgress => "IN_PROGRESS",
            OpportunityStatus::Won => "WON",
            OpportunityStatus::Lost => "LOST",
        }
    }

    /// Lenient parsing for query strings and permalinks: accepts the
    /// canonical names plus common spellings, ignoring case and separators.
    pub fn from_alias(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_lowercase();
        match normalized.as_str() {
            "new" => Some(OpportunityStatus::New),
            "in progress" | "in-progress" | "in_progress" | "inprogress" | "progress" => {
                Some(OpportunityStatus::InProgress)
            }
            "won" => Some(OpportunityStatus::Won),
            "lost" => Some(OpportunityStatus::Lost),
            _ => None,
        }
    }
}

impl fmt::Display for OpportunityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OpportunityStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(OpportunityStatus::New),
            "IN_PROGRESS" => Ok(OpportunityStatus::InProgress),
            "WON" => Ok(OpportunityStatus::Won),
            "LOST" => Ok(OpportunityStatus::Lost),
            other => Err(format!("unknown opportunity status: {}", other)),
        }
    }
}

impl TryFrom<String> for OpportunityStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Opportunity {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    /// Decimal amount as text; never converted to floating point.
    pub value: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: OpportunityStatus,
    pub estimated_close_date: Option<DateTime<Utc>>,
    pub company_id: Option<i64>,
    pub contact_id: Option<i64>,
    pub owner_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OpportunitySummary {
    pub id: i64,
    pub title: String,
    #[sqlx(try_from = "String")]
    pub status: OpportunityStatus,
    #[serde(skip)]
    pub contact_id: Option<i64>,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityWithRelations {
    #[serde(flatten)]
    pub opportunity: Opportunity,
    pub company: Option<Company>,
    pub contact: Option<Contact>,
    pub owner: Option<TeamMember>,
    pub activities: Vec<ActivitySummary>,
}

/// Detail view: the opportunity with its latest activities fully hydrated.
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityDetail {
    #[serde(flatten)]
    pub opportunity: Opportunity,
    pub company: Option<Company>,
    pub contact: Option<Contact>,
    pub owner: Option<TeamMember>,
    pub activities: Vec<ActivityWithRelations>,
}

/// Count and decimal value sum of the opportunities in one status.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusTotal {
    pub status: OpportunityStatus,
    pub count: i64,
    #[serde(with = "decimal_string")]
    pub value: BigDecimal,
}

impl StatusTotal {
    pub fn empty(status: OpportunityStatus) -> Self {
        Self { status, count: 0, value: BigDecimal::from(0) }
    }
}

/// Serializes decimals as plain strings so clients never see a float.
pub mod decimal_string {
    use bigdecimal::BigDecimal;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &BigDecimal, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.normalized().to_plain_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_aliases() {
        assert_eq!(OpportunityStatus::from_alias("in-progress"), Some(OpportunityStatus::InProgress));
        assert_eq!(OpportunityStatus::from_alias(" In Progress "), Some(OpportunityStatus::InProgress));
        assert_eq!(OpportunityStatus::from_alias("WON"), Some(OpportunityStatus::Won));
        assert_eq!(OpportunityStatus::from_alias("lost"), Some(OpportunityStatus::Lost));
        assert_eq!(OpportunityStatus::from_alias("archived"), None);
    }

    #[test]
    fn test_status_round_trips_through_db_text() {
        for status in OpportunityStatus::ALL {
            assert_eq!(OpportunityStatus::try_from(status.as_str().to_string()), Ok(status));
        }
        assert!(OpportunityStatus::try_from("DRAFT".to_string()).is_err());
    }
}
