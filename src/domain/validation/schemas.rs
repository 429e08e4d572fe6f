use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use validator::{Validate, ValidationError};

use super::{parse_datetime, FieldReader, FormData};
use crate::domain::models::{
    action::FieldErrors,
    activity::{ActivityStatus, ActivityType, DateField},
    company::CompanyKey,
    fold_key,
    opportunity::OpportunityStatus,
};

pub fn password_strength(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < 8 {
        return Err(ValidationError::new("password_length")
            .with_message("Password must be at least 8 characters".into()));
    }
    if !password.chars().any(|c| c.is_uppercase()) {
        return Err(ValidationError::new("password_uppercase")
            .with_message("Password must contain an uppercase letter".into()));
    }
    if !password.chars().any(|c| c.is_lowercase()) {
        return Err(ValidationError::new("password_lowercase")
            .with_message("Password must contain a lowercase letter".into()));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(ValidationError::new("password_digit")
            .with_message("Password must contain a number".into()));
    }
    Ok(())
}

/// Tag names from every `tags` value, or from `tagsCSV` when the form has
/// no `tags` values. Each value may itself be comma separated.
pub fn collect_tags(form: &FormData) -> Vec<String> {
    let mut values: Vec<&str> = form.get_all("tags").chain(form.get_all("tags[]")).collect();
    if values.is_empty() {
        values = form.get_all("tagsCSV").collect();
    }
    values
        .into_iter()
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Validate)]
pub struct ContactPayload {
    pub id: Option<i64>,
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
    #[validate(email(message = "Enter a valid email"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub job_title: Option<String>,
    pub company_name: Option<String>,
    pub company_city: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub notes: Option<String>,
    pub tags: Vec<String>,
    pub owner_id: Option<i64>,
}

impl ContactPayload {
    pub fn parse(form: &FormData) -> Result<Self, FieldErrors> {
        let mut reader = FieldReader::new(form);
        let payload = Self {
            id: reader.optional_id("id"),
            first_name: reader.text("firstName"),
            last_name: reader.text("lastName"),
            email: reader.optional_text("email"),
            phone: reader.optional_text("phone"),
            job_title: reader.optional_text("jobTitle"),
            company_name: reader.optional_text("companyName"),
            company_city: reader.optional_text("companyCity"),
            city: reader.optional_text("city"),
            state: reader.optional_text("state"),
            country: reader.optional_text("country"),
            notes: reader.optional_text("notes"),
            tags: collect_tags(form),
            owner_id: reader.optional_id("ownerId"),
        };
        reader.finish(payload)
    }

    /// Dedup key of the inline company; the company city falls back to the
    /// contact's own city.
    pub fn company_key(&self) -> Option<CompanyKey> {
        let name = self.company_name.clone()?;
        Some(CompanyKey {
            name,
            city: self.company_city.clone().or_else(|| self.city.clone()),
            country: self.country.clone(),
        })
    }

    /// Folded name, email and phone, one per line, matched by contact search.
    pub fn search_key(&self) -> String {
        [
            Some(self.first_name.as_str()),
            Some(self.last_name.as_str()),
            self.email.as_deref(),
            self.phone.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(fold_key)
        .collect::<Vec<_>>()
        .join("\n")
    }
}

#[derive(Debug, Clone, Validate)]
pub struct OpportunityPayload {
    pub id: Option<i64>,
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    pub description: Option<String>,
    pub value: Option<String>,
    pub status: OpportunityStatus,
    pub estimated_close_date: Option<DateTime<Utc>>,
    pub company_id: Option<i64>,
    pub contact_id: Option<i64>,
    pub owner_id: Option<i64>,
}

impl OpportunityPayload {
    pub fn parse(form: &FormData) -> Result<Self, FieldErrors> {
        let mut reader = FieldReader::new(form);
        let payload = Self {
            id: reader.optional_id("id"),
            title: reader.text("title"),
            description: reader.optional_text("description"),
            value: reader.optional_decimal("value"),
            status: reader
                .optional_text("status")
                .and_then(|raw| OpportunityStatus::from_alias(&raw))
                .unwrap_or_default(),
            estimated_close_date: reader.optional_datetime("estimatedCloseDate"),
            company_id: reader.optional_id("companyId"),
            contact_id: reader.optional_id("contactId"),
            owner_id: reader.optional_id("ownerId"),
        };
        reader.finish(payload)
    }
}

#[derive(Debug, Clone, Validate)]
pub struct ActivityPayload {
    pub id: Option<i64>,
    pub kind: ActivityType,
    pub status: ActivityStatus,
    #[validate(length(min = 1, message = "Subject is required"))]
    pub subject: String,
    pub notes: Option<String>,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub contact_id: Option<i64>,
    pub opportunity_id: Option<i64>,
    pub team_member_id: Option<i64>,
}

impl ActivityPayload {
    pub fn parse(form: &FormData) -> Result<Self, FieldErrors> {
        let mut reader = FieldReader::new(form);
        let payload = Self {
            id: reader.optional_id("id"),
            kind: reader.enum_or_default("type"),
            status: reader.enum_or_default("status"),
            subject: reader.text("subject"),
            notes: reader.optional_text("notes"),
            scheduled_for: reader.optional_datetime("scheduledFor"),
            due_date: reader.optional_datetime("dueDate"),
            completed_at: reader.optional_datetime("completedAt"),
            contact_id: reader.optional_id("contactId"),
            opportunity_id: reader.optional_id("opportunityId"),
            team_member_id: reader.optional_id("teamMemberId"),
        };
        reader.finish(payload)
    }

    pub fn has_association(&self) -> bool {
        self.contact_id.is_some() || self.opportunity_id.is_some()
    }
}

#[derive(Debug, Clone, Validate)]
pub struct RegisterPayload {
    #[validate(length(min = 2, message = "Name must be at least 2 characters"))]
    pub name: String,
    #[validate(email(message = "Enter a valid email"))]
    pub email: String,
    #[validate(custom(function = "password_strength"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub confirm_password: String,
    pub role: Option<String>,
}

impl RegisterPayload {
    pub fn parse(form: &FormData) -> Result<Self, FieldErrors> {
        let mut reader = FieldReader::new(form);
        let email = reader.text("email").to_lowercase();
        if email.is_empty() {
            reader.reject("email", "Email is required");
        }
        let payload = Self {
            name: reader.text("name"),
            email,
            password: reader.raw("password"),
            confirm_password: reader.raw("confirmPassword"),
            role: reader.optional_text("role"),
        };
        reader.finish(payload)
    }
}

#[derive(Debug, Clone, Validate)]
pub struct ProfilePayload {
    #[validate(length(min = 2, message = "Name must be at least 2 characters"))]
    pub name: String,
    pub role: Option<String>,
}

impl ProfilePayload {
    pub fn parse(form: &FormData) -> Result<Self, FieldErrors> {
        let reader = FieldReader::new(form);
        let payload = Self {
            name: reader.text("name"),
            role: reader.optional_text("role"),
        };
        reader.finish(payload)
    }
}

#[derive(Debug, Clone, Validate)]
pub struct ChangePasswordPayload {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[validate(custom(function = "password_strength"))]
    pub new_password: String,
    #[validate(must_match(other = "new_password", message = "Passwords do not match"))]
    pub confirm_password: String,
}

impl ChangePasswordPayload {
    pub fn parse(form: &FormData) -> Result<Self, FieldErrors> {
        let reader = FieldReader::new(form);
        let payload = Self {
            current_password: reader.raw("currentPassword"),
            new_password: reader.raw("newPassword"),
            confirm_password: reader.raw("confirmPassword"),
        };
        reader.finish(payload)
    }
}

pub struct LoginPayload {
    pub email: String,
    pub password: String,
}

impl LoginPayload {
    /// Credentials are never reported field by field; missing values simply
    /// fail authentication.
    pub fn parse(form: &FormData) -> Option<Self> {
        let reader = FieldReader::new(form);
        let email = reader.text("email").to_lowercase();
        let password = reader.raw("password");
        if email.is_empty() || password.is_empty() {
            return None;
        }
        Some(Self { email, password })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    #[default]
    None,
    City,
    Company,
    Tag,
}

impl GroupBy {
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        match raw.map(|v| v.trim().to_lowercase()).as_deref() {
            Some("city") => GroupBy::City,
            Some("company") => GroupBy::Company,
            Some("tag") => GroupBy::Tag,
            _ => GroupBy::None,
        }
    }
}

#[derive(Debug, Clone, Validate)]
pub struct ContactSearch {
    #[validate(length(max = 200, message = "Search is too long"))]
    pub query: String,
    pub group_by: GroupBy,
    pub page: u32,
}

impl ContactSearch {
    pub fn parse(params: &FormData) -> Result<Self, FieldErrors> {
        let reader = FieldReader::new(params);
        let search = Self {
            query: reader.text("query"),
            group_by: GroupBy::parse_or_default(params.get("groupBy")),
            page: super::parse_page(params.get("page")),
        };
        reader.finish(search)
    }
}

#[derive(Debug, Clone)]
pub struct PipelineQuery {
    pub status: Option<OpportunityStatus>,
    pub page: u32,
    pub page_size: Option<u32>,
}

impl PipelineQuery {
    pub fn parse(params: &FormData) -> Self {
        Self {
            status: params.get("status").and_then(OpportunityStatus::from_alias),
            page: super::parse_page(params.get("page")),
            page_size: params
                .get("pageSize")
                .and_then(|raw| raw.trim().parse::<u32>().ok())
                .filter(|size| *size > 0),
        }
    }
}

/// Activity type restriction; `All` disables it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActivityTypeFilter {
    #[default]
    All,
    Only(ActivityType),
}

impl ActivityTypeFilter {
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        raw.and_then(|v| v.trim().to_uppercase().parse::<ActivityType>().ok())
            .map(ActivityTypeFilter::Only)
            .unwrap_or_default()
    }

    pub fn kind(&self) -> Option<ActivityType> {
        match self {
            ActivityTypeFilter::All => None,
            ActivityTypeFilter::Only(kind) => Some(*kind),
        }
    }
}

impl Serialize for ActivityTypeFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ActivityTypeFilter::All => serializer.serialize_str("ALL"),
            ActivityTypeFilter::Only(kind) => serializer.serialize_str(kind.as_str()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityFilter {
    #[serde(rename = "type")]
    pub kind: ActivityTypeFilter,
    pub date_field: DateField,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub page: u32,
}

impl ActivityFilter {
    pub fn parse(params: &FormData) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();
        let mut bound = |name: &str| -> Option<DateTime<Utc>> {
            let raw = params.get(name).map(str::trim).filter(|v| !v.is_empty())?;
            let parsed = parse_datetime(raw);
            if parsed.is_none() {
                errors.insert(name.to_string(), "Invalid date".to_string());
            }
            parsed
        };
        let from = bound("from");
        let to = bound("to");

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(Self {
            kind: ActivityTypeFilter::parse_or_default(params.get("type")),
            date_field: DateField::parse_or_default(params.get("dateField")),
            from,
            to,
            page: super::parse_page(params.get("page")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> FormData {
        FormData::from_pairs(pairs.iter().copied())
    }

    #[test]
    fn test_contact_requires_names_and_trims() {
        let errors = ContactPayload::parse(&form(&[("firstName", "   "), ("email", "nope")])).unwrap_err();
        assert_eq!(errors["firstName"], "First name is required");
        assert_eq!(errors["lastName"], "Last name is required");
        assert_eq!(errors["email"], "Enter a valid email");

        let payload = ContactPayload::parse(&form(&[
            ("firstName", " Ada "),
            ("lastName", "Lovelace"),
            ("email", ""),
            ("city", "London"),
            ("companyName", "Analytical Engines"),
        ]))
        .unwrap();
        assert_eq!(payload.first_name, "Ada");
        assert_eq!(payload.email, None);
        let key = payload.company_key().unwrap();
        assert_eq!(key.city.as_deref(), Some("London"));
    }

    #[test]
    fn test_tags_collected_from_values_then_csv() {
        let tags = collect_tags(&form(&[("tags", "VIP, Partner"), ("tags", "vip"), ("tagsCSV", "ignored")]));
        assert_eq!(tags, vec!["VIP", "Partner", "vip"]);

        let tags = collect_tags(&form(&[("tagsCSV", "a,, b ,")]));
        assert_eq!(tags, vec!["a", "b"]);
    }

    #[test]
    fn test_non_numeric_identifier_is_field_error() {
        let errors = OpportunityPayload::parse(&form(&[("title", "Deal"), ("contactId", "abc")])).unwrap_err();
        assert_eq!(errors["contactId"], "Expected a number");
    }

    #[test]
    fn test_enum_fields_fall_back_to_defaults() {
        let payload = ActivityPayload::parse(&form(&[("subject", "Call"), ("type", "fax"), ("status", "")])).unwrap();
        assert_eq!(payload.kind, ActivityType::Call);
        assert_eq!(payload.status, ActivityStatus::Planned);
        assert!(!payload.has_association());

        let payload = OpportunityPayload::parse(&form(&[("title", "Deal"), ("status", "in-progress")])).unwrap();
        assert_eq!(payload.status, OpportunityStatus::InProgress);
    }

    #[test]
    fn test_password_rules_report_first_failure() {
        let messages = |pw: &str| password_strength(pw).unwrap_err().message.unwrap().to_string();
        assert_eq!(messages("Ab1"), "Password must be at least 8 characters");
        assert_eq!(messages("abcdefg1"), "Password must contain an uppercase letter");
        assert_eq!(messages("ABCDEFG1"), "Password must contain a lowercase letter");
        assert_eq!(messages("Abcdefgh"), "Password must contain a number");
        assert!(password_strength("Abcdefg1").is_ok());
    }

    #[test]
    fn test_register_confirmation_and_email() {
        let errors = RegisterPayload::parse(&form(&[
            ("name", "Jo"),
            ("password", "Secret123"),
            ("confirmPassword", "Secret124"),
        ]))
        .unwrap_err();
        assert_eq!(errors["email"], "Email is required");
        assert_eq!(errors["confirmPassword"], "Passwords do not match");

        let payload = RegisterPayload::parse(&form(&[
            ("name", "Jo"),
            ("email", "Jo@Example.COM"),
            ("password", "Secret123"),
            ("confirmPassword", "Secret123"),
        ]))
        .unwrap();
        assert_eq!(payload.email, "jo@example.com");
    }

    #[test]
    fn test_activity_filter_defaults_and_bad_dates() {
        let filter = ActivityFilter::parse(&form(&[("type", "meeting"), ("dateField", "bogus")])).unwrap();
        assert_eq!(filter.kind, ActivityTypeFilter::Only(ActivityType::Meeting));
        assert_eq!(filter.date_field, DateField::Created);

        let filter = ActivityFilter::parse(&form(&[("type", "ALL")])).unwrap();
        assert_eq!(filter.kind, ActivityTypeFilter::All);

        let errors = ActivityFilter::parse(&form(&[("from", "yesterday")])).unwrap_err();
        assert!(errors.contains_key("from"));
    }

    #[test]
    fn test_search_and_pipeline_params() {
        let search = ContactSearch::parse(&form(&[("query", " acme "), ("groupBy", "TAG"), ("page", "-1")])).unwrap();
        assert_eq!(search.query, "acme");
        assert_eq!(search.group_by, GroupBy::Tag);
        assert_eq!(search.page, 1);

        let long = "x".repeat(201);
        assert!(ContactSearch::parse(&form(&[("query", long.as_str())])).is_err());

        let pipeline = PipelineQuery::parse(&form(&[("status", "progress"), ("pageSize", "0")]));
        assert_eq!(pipeline.status, Some(OpportunityStatus::InProgress));
        assert_eq!(pipeline.page_size, None);
        assert_eq!(PipelineQuery::parse(&form(&[("status", "archived")])).status, None);
    }
}
