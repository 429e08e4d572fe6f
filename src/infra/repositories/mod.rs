pub mod sqlite_activity_repo;
pub mod sqlite_company_repo;
pub mod sqlite_contact_repo;
pub mod sqlite_opportunity_repo;
pub mod sqlite_session_log_repo;
pub mod sqlite_tag_repo;
pub mod sqlite_team_member_repo;
pub mod sqlite_user_repo;

pub mod postgres_activity_repo;
pub mod postgres_company_repo;
pub mod postgres_contact_repo;
pub mod postgres_opportunity_repo;
pub mod postgres_session_log_repo;
pub mod postgres_tag_repo;
pub mod postgres_team_member_repo;
pub mod postgres_user_repo;

/// Folded columns a contact search token is matched against, besides tag
/// names. `search_key` covers first name, last name, email and phone.
pub(crate) const SEARCH_COLUMNS: [&str; 2] = ["c.search_key", "co.name_key"];

pub(crate) const FIND_OR_CREATE_ATTEMPTS: u32 = 3;

/// Substring `LIKE` pattern for an already folded token, escaping the
/// wildcard characters with `\`.
pub(crate) fn like_pattern(token: &str) -> String {
    let mut escaped = String::with_capacity(token.len() + 2);
    escaped.push('%');
    for ch in token.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}
