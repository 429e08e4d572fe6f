use serde::{Deserialize, Serialize};

use super::user::{User, ADMIN_ROLE, DEFAULT_USER_ROLE};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub exp: usize,
    pub iat: usize,
    pub jti: String,
    pub email: String,
    pub name: Option<String>,
    pub role: String,
    pub team_member_id: Option<i64>,
    pub csrf_token: String,
}

/// The authenticated identity a request acts as.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub role: String,
    pub team_member_id: Option<i64>,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }

    /// Team member restriction applied to pipeline, activity and dashboard
    /// reads. Admins see everything.
    pub fn owner_filter(&self) -> Option<i64> {
        if self.is_admin() {
            None
        } else {
            self.team_member_id
        }
    }

    /// Current identity of `user`. A missing role reads as the default user
    /// role.
    pub fn from_user(user: &User, team_member_id: Option<i64>) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role.clone().unwrap_or_else(|| DEFAULT_USER_ROLE.to_string()),
            team_member_id,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub csrf_token: String,
    pub user: Principal,
}
