use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::domain::models::{
    action::ActionState,
    auth::{Claims, Principal},
    session_log::NewSessionLog,
    team_member::{NewTeamMember, TeamMember, DEFAULT_MEMBER_ROLE, LOGIN_MEMBER_ROLE},
    user::{User, DEFAULT_USER_ROLE},
};
use crate::domain::ports::Repositories;
use crate::domain::validation::schemas::{ChangePasswordPayload, LoginPayload, ProfilePayload, RegisterPayload};
use crate::domain::validation::FormData;
use crate::error::AppError;

pub const SESSION_COOKIE: &str = "session_token";
const AUDIENCE: &str = "crm-frontend";

/// Request metadata recorded with each sign-in.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// A freshly issued session: the signed cookie value plus what the client
/// needs to echo back on mutating requests.
pub struct Session {
    pub token: String,
    pub csrf_token: String,
    pub principal: Principal,
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::InternalWithMsg(format!("password hashing failed: {}", e)))
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
        Err(_) => false,
    }
}

pub struct AuthService {
    repos: Repositories,
    config: Config,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl AuthService {
    pub fn new(repos: Repositories, config: Config) -> Self {
        let encoding_key = EncodingKey::from_secret(config.auth_secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.auth_secret.as_bytes());
        Self { repos, config, encoding_key, decoding_key }
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::hours(self.config.session_ttl_hours)
    }

    /// Verifies the credentials and opens a session. Unknown emails and wrong
    /// passwords are indistinguishable to the caller.
    pub async fn login(&self, form: &FormData, client: ClientInfo) -> Result<Session, AppError> {
        let credentials = LoginPayload::parse(form).ok_or(AppError::Unauthorized)?;
        let user = self
            .repos
            .users
            .find_by_email(&credentials.email)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !verify_password(&credentials.password, &user.password_hash) {
            warn!(email = %credentials.email, "failed login attempt");
            return Err(AppError::Unauthorized);
        }

        let member = self.ensure_team_member(&user).await?;

        let entry = NewSessionLog {
            user_id: user.id.clone(),
            email: user.email.clone(),
            ip_address: client.ip_address,
            user_agent: client.user_agent,
        };
        if let Err(e) = self.repos.session_logs.record(&entry).await {
            error!("failed to record session log for {}: {:?}", user.id, e);
        }

        info!(user_id = %user.id, "user logged in");
        self.issue(&user, member.map(|m| m.id))
    }

    pub fn decode(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[AUDIENCE]);
        validation.set_issuer(&[self.config.auth_issuer.as_str()]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|_| AppError::Unauthorized)
    }

    /// Reloads the identity behind a verified session, so profile and team
    /// member changes apply without signing in again.
    pub async fn current_principal(&self, claims: &Claims) -> Result<Principal, AppError> {
        let user = self
            .repos
            .users
            .find_by_id(&claims.sub)
            .await?
            .ok_or(AppError::Unauthorized)?;
        let member = self.repos.team_members.find_by_user_id(&user.id).await?;
        Ok(Principal::from_user(&user, member.map(|m| m.id)))
    }

    pub async fn register(&self, form: &FormData) -> ActionState {
        let payload = match RegisterPayload::parse(form) {
            Ok(payload) => payload,
            Err(errors) => return ActionState::invalid("Check the registration details", errors),
        };

        match self.repos.users.find_by_email(&payload.email).await {
            Ok(Some(_)) => return duplicate_email(),
            Ok(None) => {}
            Err(e) => {
                error!("register lookup failed: {:?}", e);
                return ActionState::error("Could not create the account");
            }
        }

        let password_hash = match hash_password(&payload.password) {
            Ok(hash) => hash,
            Err(e) => {
                error!("register hashing failed: {:?}", e);
                return ActionState::error("Could not create the account");
            }
        };

        let user = User::new(payload.email.clone(), payload.name.clone(), payload.role.clone(), password_hash);
        let member = NewTeamMember {
            name: payload.name,
            email: payload.email,
            role: payload.role.clone().or_else(|| Some(DEFAULT_MEMBER_ROLE.to_string())),
            user_id: Some(user.id.clone()),
        };

        match self.repos.users.register(&user, &member).await {
            Ok((user, member)) => {
                info!(user_id = %user.id, team_member_id = member.id, "user registered");
                ActionState::success("Account created")
            }
            Err(e) if e.is_unique_violation() => duplicate_email(),
            Err(e) => {
                error!("register failed: {:?}", e);
                ActionState::error("Could not create the account")
            }
        }
    }

    pub async fn update_profile(&self, principal: &Principal, form: &FormData) -> ActionState {
        let payload = match ProfilePayload::parse(form) {
            Ok(payload) => payload,
            Err(errors) => return ActionState::invalid("Check the profile details", errors),
        };

        let result: Result<(), AppError> = async {
            let user = self
                .repos
                .users
                .update_profile(&principal.id, &payload.name, payload.role.as_deref())
                .await?;
            if let Some(member) = self.repos.team_members.find_by_user_id(&user.id).await? {
                self.repos
                    .team_members
                    .update_profile(member.id, &payload.name, payload.role.as_deref())
                    .await?;
            }
            Ok(())
        }
        .await;

        match result {
            Ok(()) => {
                info!(user_id = %principal.id, "profile updated");
                ActionState::success("Profile updated")
            }
            Err(AppError::NotFound(_)) => ActionState::error("Account not found"),
            Err(e) => {
                error!("update profile failed: {:?}", e);
                ActionState::error("Could not update the profile")
            }
        }
    }

    pub async fn change_password(&self, principal: &Principal, form: &FormData) -> ActionState {
        let payload = match ChangePasswordPayload::parse(form) {
            Ok(payload) => payload,
            Err(errors) => return ActionState::invalid("Check the password fields", errors),
        };

        let user = match self.repos.users.find_by_id(&principal.id).await {
            Ok(Some(user)) => user,
            Ok(None) => return ActionState::error("Account not found"),
            Err(e) => {
                error!("change password lookup failed: {:?}", e);
                return ActionState::error("Could not update the password");
            }
        };

        if !verify_password(&payload.current_password, &user.password_hash) {
            return ActionState::field_error(
                "Check the password fields",
                "currentPassword",
                "Current password is incorrect",
            );
        }
        if payload.new_password == payload.current_password {
            return ActionState::field_error(
                "Check the password fields",
                "newPassword",
                "New password must be different from the current one",
            );
        }

        let result = match hash_password(&payload.new_password) {
            Ok(hash) => self.repos.users.update_password(&user.id, &hash).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                info!(user_id = %user.id, "password changed");
                ActionState::success("Password updated")
            }
            Err(e) => {
                error!("change password failed: {:?}", e);
                ActionState::error("Could not update the password")
            }
        }
    }

    /// Makes sure a non-admin user has a team member record pointing back at
    /// it, adopting one registered under the same email when needed.
    pub async fn ensure_team_member(&self, user: &User) -> Result<Option<TeamMember>, AppError> {
        if let Some(member) = self.repos.team_members.find_by_user_id(&user.id).await? {
            return Ok(Some(member));
        }

        if let Some(member) = self.repos.team_members.find_by_email(&user.email).await? {
            info!(team_member_id = member.id, user_id = %user.id, "relinking team member");
            return self.repos.team_members.link_user(member.id, &user.id).await.map(Some);
        }

        if user.is_admin() {
            return Ok(None);
        }

        let member = NewTeamMember {
            name: user.display_name().to_string(),
            email: user.email.clone(),
            role: Some(user.role.clone().unwrap_or_else(|| LOGIN_MEMBER_ROLE.to_string())),
            user_id: Some(user.id.clone()),
        };
        let created = self.repos.team_members.create(&member).await?;
        info!(team_member_id = created.id, user_id = %user.id, "created team member on login");
        Ok(Some(created))
    }

    fn issue(&self, user: &User, team_member_id: Option<i64>) -> Result<Session, AppError> {
        let csrf_token: String = rand::thread_rng().sample_iter(&Alphanumeric).take(32).map(char::from).collect();
        let now = Utc::now();

        let claims = Claims {
            iss: self.config.auth_issuer.clone(),
            sub: user.id.clone(),
            aud: AUDIENCE.to_string(),
            exp: (now + self.session_ttl()).timestamp() as usize,
            iat: now.timestamp() as usize,
            jti: Uuid::new_v4().to_string(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role.clone().unwrap_or_else(|| DEFAULT_USER_ROLE.to_string()),
            team_member_id,
            csrf_token: csrf_token.clone(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            error!("JWT encoding failed: {}", e);
            AppError::Internal
        })?;

        Ok(Session {
            token,
            csrf_token,
            principal: Principal::from_user(user, team_member_id),
        })
    }
}

fn duplicate_email() -> ActionState {
    ActionState::field_error(
        "Check the registration details",
        "email",
        "An account with this email already exists",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_round_trip() {
        let hash = hash_password("Secret123").unwrap();
        assert!(verify_password("Secret123", &hash));
        assert!(!verify_password("Secret124", &hash));
        assert!(!verify_password("Secret123", "not-a-hash"));
    }
}
