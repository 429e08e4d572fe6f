use crate::domain::models::{
    company::{Company, CompanyOption},
    tag::Tag,
    team_member::TeamMember,
};
use crate::domain::ports::Repositories;
use crate::domain::services::listing::OPTIONS_LIMIT;
use crate::error::AppError;

/// Read-only lookups backing the form select boxes.
pub struct DirectoryService {
    repos: Repositories,
}

impl DirectoryService {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    pub async fn companies(&self) -> Result<Vec<Company>, AppError> {
        self.repos.companies.list().await
    }

    pub async fn company_options(&self) -> Result<Vec<CompanyOption>, AppError> {
        self.repos.companies.options(OPTIONS_LIMIT).await
    }

    pub async fn tags(&self) -> Result<Vec<Tag>, AppError> {
        self.repos.tags.list().await
    }

    pub async fn team_members(&self) -> Result<Vec<TeamMember>, AppError> {
        self.repos.team_members.list().await
    }
}
