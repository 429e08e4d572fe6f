use crate::domain::models::{
    activity::{Activity, ActivitySummary},
    company::{Company, CompanyOption},
    contact::{Contact, ContactSummary, ContactTagRow},
    opportunity::{Opportunity, OpportunityStatus, OpportunitySummary, StatusTotal},
    session_log::{NewSessionLog, SessionLog},
    tag::Tag,
    team_member::{NewTeamMember, TeamMember, TeamMemberSummary},
    user::User,
};
use crate::domain::validation::schemas::{
    ActivityFilter, ActivityPayload, ContactPayload, OpportunityPayload,
};
use crate::error::AppError;
use async_trait::async_trait;
use std::sync::Arc;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Rendered page whose cached reads a mutation can make stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Page {
    Dashboard,
    Contacts,
    Opportunities,
    Activities,
}

impl Page {
    pub const ALL: [Page; 4] = [Page::Dashboard, Page::Contacts, Page::Opportunities, Page::Activities];

    pub fn path(&self) -> &'static str {
        match self {
            Page::Dashboard => "/dashboard",
            Page::Contacts => "/contacts",
            Page::Opportunities => "/opportunities",
            Page::Activities => "/activities",
        }
    }
}

#[async_trait]
pub trait PageInvalidator: Send + Sync {
    async fn invalidate(&self, page: Page);
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &User) -> Result<User, AppError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError>;
    async fn update_profile(&self, id: &str, name: &str, role: Option<&str>) -> Result<User, AppError>;
    async fn update_password(&self, id: &str, password_hash: &str) -> Result<(), AppError>;
    /// Creates the user and its team member atomically.
    async fn register(&self, user: &User, member: &NewTeamMember) -> Result<(User, TeamMember), AppError>;
}

#[async_trait]
pub trait TeamMemberRepository: Send + Sync {
    async fn create(&self, member: &NewTeamMember) -> Result<TeamMember, AppError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<TeamMember>, AppError>;
    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<TeamMember>, AppError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<TeamMember>, AppError>;
    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<TeamMember>, AppError>;
    async fn summaries_by_ids(&self, ids: &[i64]) -> Result<Vec<TeamMemberSummary>, AppError>;
    async fn link_user(&self, id: i64, user_id: &str) -> Result<TeamMember, AppError>;
    async fn update_profile(&self, id: i64, name: &str, role: Option<&str>) -> Result<(), AppError>;
    async fn list(&self) -> Result<Vec<TeamMember>, AppError>;
}

#[async_trait]
pub trait SessionLogRepository: Send + Sync {
    async fn record(&self, entry: &NewSessionLog) -> Result<(), AppError>;
    async fn list_for_user(&self, user_id: &str, limit: i64) -> Result<Vec<SessionLog>, AppError>;
}

#[async_trait]
pub trait CompanyRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Company>, AppError>;
    async fn options(&self, limit: i64) -> Result<Vec<CompanyOption>, AppError>;
    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Company>, AppError>;
}

#[async_trait]
pub trait TagRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Tag>, AppError>;
    async fn tags_for_contacts(&self, contact_ids: &[i64]) -> Result<Vec<ContactTagRow>, AppError>;
}

#[async_trait]
pub trait ContactRepository: Send + Sync {
    /// Contacts matching every token, ordered by last name, first name, id.
    async fn search(&self, tokens: &[String], limit: i64, offset: i64) -> Result<Vec<Contact>, AppError>;
    async fn count_matching(&self, tokens: &[String]) -> Result<i64, AppError>;
    async fn count(&self, owner_id: Option<i64>) -> Result<i64, AppError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Contact>, AppError>;
    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Contact>, AppError>;
    async fn summaries_by_ids(&self, ids: &[i64]) -> Result<Vec<ContactSummary>, AppError>;
    async fn options(&self, limit: i64) -> Result<Vec<ContactSummary>, AppError>;
    /// Upserts the contact together with its company and tag set in one
    /// transaction.
    async fn save(&self, payload: &ContactPayload) -> Result<Contact, AppError>;
    async fn delete(&self, id: i64) -> Result<(), AppError>;
}

#[async_trait]
pub trait OpportunityRepository: Send + Sync {
    async fn list_by_status(
        &self,
        status: OpportunityStatus,
        owner_id: Option<i64>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Opportunity>, AppError>;
    /// Count and value sum per status present in the owner-filtered set.
    async fn status_totals(&self, owner_id: Option<i64>) -> Result<Vec<StatusTotal>, AppError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Opportunity>, AppError>;
    async fn summaries_by_ids(&self, ids: &[i64]) -> Result<Vec<OpportunitySummary>, AppError>;
    async fn summaries_for_contacts(&self, contact_ids: &[i64]) -> Result<Vec<OpportunitySummary>, AppError>;
    async fn options(&self, limit: i64) -> Result<Vec<OpportunitySummary>, AppError>;
    async fn save(&self, payload: &OpportunityPayload) -> Result<Opportunity, AppError>;
    async fn delete(&self, id: i64) -> Result<(), AppError>;
}

#[async_trait]
pub trait ActivityRepository: Send + Sync {
    async fn list(
        &self,
        filter: &ActivityFilter,
        owner_id: Option<i64>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Activity>, AppError>;
    async fn count_filtered(&self, filter: &ActivityFilter, owner_id: Option<i64>) -> Result<i64, AppError>;
    async fn count(&self, owner_id: Option<i64>) -> Result<i64, AppError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Activity>, AppError>;
    async fn list_for_opportunity(&self, opportunity_id: i64, limit: i64) -> Result<Vec<Activity>, AppError>;
    /// The `per_parent` most recent activities of each contact.
    async fn recent_for_contacts(&self, contact_ids: &[i64], per_parent: i64) -> Result<Vec<ActivitySummary>, AppError>;
    async fn recent_for_opportunities(&self, opportunity_ids: &[i64], per_parent: i64) -> Result<Vec<ActivitySummary>, AppError>;
    /// Activities due or scheduled within `[from, to]`, earliest due first.
    async fn upcoming(
        &self,
        owner_id: Option<i64>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Activity>, AppError>;
    async fn save(&self, payload: &ActivityPayload) -> Result<Activity, AppError>;
    async fn delete(&self, id: i64) -> Result<(), AppError>;
}

/// Every data-access handle, constructed once per backend and shared by the
/// services.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub team_members: Arc<dyn TeamMemberRepository>,
    pub session_logs: Arc<dyn SessionLogRepository>,
    pub companies: Arc<dyn CompanyRepository>,
    pub tags: Arc<dyn TagRepository>,
    pub contacts: Arc<dyn ContactRepository>,
    pub opportunities: Arc<dyn OpportunityRepository>,
    pub activities: Arc<dyn ActivityRepository>,
}
