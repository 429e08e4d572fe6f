use tracing::info;

use crate::domain::models::user::{User, DEFAULT_USER_ROLE};
use crate::domain::ports::Repositories;
use crate::domain::services::auth_service::hash_password;
use crate::error::AppError;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BackfillReport {
    pub created: usize,
    pub updated: usize,
}

/// Gives every team member with an email a login sharing `shared_password`,
/// creating or refreshing the user and linking the member to it.
pub async fn backfill_team_users(repos: &Repositories, shared_password: &str) -> Result<BackfillReport, AppError> {
    let password_hash = hash_password(shared_password)?;
    let mut report = BackfillReport::default();

    for member in repos.team_members.list().await? {
        let email = member.email.trim().to_lowercase();
        if email.is_empty() {
            continue;
        }
        let role = member.role.clone().unwrap_or_else(|| DEFAULT_USER_ROLE.to_string());

        let user_id = match repos.users.find_by_email(&email).await? {
            Some(existing) => {
                repos.users.update_profile(&existing.id, &member.name, Some(&role)).await?;
                repos.users.update_password(&existing.id, &password_hash).await?;
                report.updated += 1;
                existing.id
            }
            None => {
                let user = User::new(email, member.name.clone(), Some(role), password_hash.clone());
                let created = repos.users.create(&user).await?;
                report.created += 1;
                created.id
            }
        };

        if member.user_id.as_deref() != Some(user_id.as_str()) {
            repos.team_members.link_user(member.id, &user_id).await?;
            info!(team_member_id = member.id, user_id = %user_id, "linked team member");
        }
    }

    Ok(report)
}
