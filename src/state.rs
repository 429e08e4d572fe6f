use std::sync::Arc;

use crate::config::Config;
use crate::domain::ports::Repositories;
use crate::domain::services::{
    activity_service::ActivityService, auth_service::AuthService, contact_service::ContactService,
    dashboard_service::DashboardService, directory_service::DirectoryService,
    opportunity_service::OpportunityService,
};
use crate::infra::cache::page_cache::PageCache;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub repos: Repositories,
    pub auth_service: Arc<AuthService>,
    pub contact_service: Arc<ContactService>,
    pub opportunity_service: Arc<OpportunityService>,
    pub activity_service: Arc<ActivityService>,
    pub dashboard_service: Arc<DashboardService>,
    pub directory_service: Arc<DirectoryService>,
    pub page_cache: Arc<PageCache>,
}
