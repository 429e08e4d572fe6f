pub mod account;
pub mod activity;
pub mod auth;
pub mod contact;
pub mod dashboard;
pub mod directory;
pub mod health;
pub mod opportunity;

use crate::domain::models::action::FieldErrors;
use crate::domain::models::auth::Principal;
use crate::domain::ports::Page;
use crate::error::AppError;

/// Read-parameter failures become a 400 naming every offending field.
pub(crate) fn invalid_params(errors: FieldErrors) -> AppError {
    let message = errors
        .iter()
        .map(|(field, message)| format!("{}: {}", field, message))
        .collect::<Vec<_>>()
        .join("; ");
    AppError::Validation(message)
}

/// Cache key for a rendered read: page path, raw query and the caller's
/// owner scope.
pub(crate) fn cache_key(page: Page, query: Option<&str>, principal: &Principal) -> String {
    let scope = principal
        .owner_filter()
        .map(|member_id| member_id.to_string())
        .unwrap_or_else(|| "all".to_string());
    format!("{}?{}#{}", page.path(), query.unwrap_or_default(), scope)
}
