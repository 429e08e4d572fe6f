pub mod action;
pub mod activity;
pub mod auth;
pub mod company;
pub mod contact;
pub mod opportunity;
pub mod session_log;
pub mod tag;
pub mod team_member;
pub mod user;

/// Case-folded form stored in the `name_key` and `search_key` columns.
/// SQLite's `LOWER` and `LIKE` only fold ASCII, so matching never folds in SQL.
pub fn fold_key(text: &str) -> String {
    text.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::fold_key;

    #[test]
    fn test_fold_key_handles_accented_letters() {
        assert_eq!(fold_key(" ÁNGELA "), "ángela");
        assert_eq!(fold_key("Élite"), fold_key("élite"));
    }
}
