use serde::Serialize;

use crate::domain::models::session_log::SessionLog;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct SessionsResponse {
    pub sessions: Vec<SessionLog>,
}
