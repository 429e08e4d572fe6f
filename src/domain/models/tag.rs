use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

pub const TAG_PALETTE: [&str; 7] = [
    "#0ea5e9",
    "#6366f1",
    "#f97316",
    "#dc2626",
    "#10b981",
    "#f59e0b",
    "#8b5cf6",
];

#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

/// Color for a newly created tag. The same name (ignoring case) always maps
/// to the same palette entry.
pub fn color_for(name: &str) -> &'static str {
    let sum: u64 = name
        .to_lowercase()
        .encode_utf16()
        .map(u64::from)
        .sum();
    TAG_PALETTE[(sum % TAG_PALETTE.len() as u64) as usize]
}
