use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info};

use crate::domain::models::{
    action::ActionState,
    activity::ActivitySummary,
    company::Company,
    contact::Contact,
    opportunity::{Opportunity, OpportunityDetail, OpportunityStatus, OpportunitySummary, OpportunityWithRelations},
    team_member::TeamMember,
};
use crate::domain::ports::{Page, PageInvalidator, Repositories};
use crate::domain::services::activity_service::hydrate_activities;
use crate::domain::services::invalidate;
use crate::domain::services::listing::{
    unique_ids, Pagination, OPTIONS_LIMIT, PIPELINE_FILTERED_PAGE_SIZE, PIPELINE_PAGE_SIZE,
};
use crate::domain::validation::schemas::{OpportunityPayload, PipelineQuery};
use crate::domain::validation::{parse_identifier, FormData};
use crate::error::AppError;

const RECENT_ACTIVITIES_PER_OPPORTUNITY: i64 = 2;
const DETAIL_ACTIVITIES: i64 = 5;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pipeline {
    pub pipeline: BTreeMap<OpportunityStatus, Vec<OpportunityWithRelations>>,
    pub counts: BTreeMap<OpportunityStatus, i64>,
    pub pagination: Pagination,
    pub active_status: Option<OpportunityStatus>,
}

pub struct OpportunityService {
    repos: Repositories,
    invalidator: Arc<dyn PageInvalidator>,
}

impl OpportunityService {
    pub fn new(repos: Repositories, invalidator: Arc<dyn PageInvalidator>) -> Self {
        Self { repos, invalidator }
    }

    /// Loads the four pipeline buckets concurrently. Counts always cover the
    /// whole owner-filtered set, independent of the page being shown.
    pub async fn list_opportunities(&self, query: &PipelineQuery, owner_id: Option<i64>) -> Result<Pipeline, AppError> {
        let page_size = query.page_size.unwrap_or(if query.status.is_some() {
            PIPELINE_FILTERED_PAGE_SIZE
        } else {
            PIPELINE_PAGE_SIZE
        });
        let page = if query.status.is_some() { query.page } else { 1 };
        let limit = i64::from(page_size.max(1));
        let offset = i64::from(page - 1) * limit;

        let bucket = move |status: OpportunityStatus| async move {
            match query.status {
                Some(active) if active != status => Ok(Vec::new()),
                _ => self.repos.opportunities.list_by_status(status, owner_id, limit, offset).await,
            }
        };

        let (totals, new, in_progress, won, lost) = tokio::try_join!(
            self.repos.opportunities.status_totals(owner_id),
            bucket(OpportunityStatus::New),
            bucket(OpportunityStatus::InProgress),
            bucket(OpportunityStatus::Won),
            bucket(OpportunityStatus::Lost),
        )?;

        let mut counts: BTreeMap<OpportunityStatus, i64> =
            OpportunityStatus::ALL.iter().map(|status| (*status, 0)).collect();
        for total in totals {
            counts.insert(total.status, total.count);
        }

        let pagination = match query.status {
            Some(status) => Pagination::new(page, page_size, counts.get(&status).copied().unwrap_or(0)),
            None => Pagination {
                page: 1,
                page_size,
                total: counts.values().sum(),
                total_pages: 1,
            },
        };

        let rows: Vec<Opportunity> = [new, in_progress, won, lost].into_iter().flatten().collect();
        let mut pipeline: BTreeMap<OpportunityStatus, Vec<OpportunityWithRelations>> =
            OpportunityStatus::ALL.iter().map(|status| (*status, Vec::new())).collect();
        for opportunity in self.hydrate(rows).await? {
            pipeline.entry(opportunity.opportunity.status).or_default().push(opportunity);
        }

        Ok(Pipeline {
            pipeline,
            counts,
            pagination,
            active_status: query.status,
        })
    }

    pub async fn get_opportunity(&self, id: i64) -> Result<Option<OpportunityDetail>, AppError> {
        let Some(opportunity) = self.repos.opportunities.find_by_id(id).await? else {
            return Ok(None);
        };

        let company_ids = unique_ids(opportunity.company_id);
        let contact_ids = unique_ids(opportunity.contact_id);
        let owner_ids = unique_ids(opportunity.owner_id);

        let (companies, contacts, owners, activities) = tokio::try_join!(
            self.repos.companies.find_by_ids(&company_ids),
            self.repos.contacts.find_by_ids(&contact_ids),
            self.repos.team_members.find_by_ids(&owner_ids),
            self.repos.activities.list_for_opportunity(id, DETAIL_ACTIVITIES),
        )?;

        Ok(Some(OpportunityDetail {
            company: companies.into_iter().next(),
            contact: contacts.into_iter().next(),
            owner: owners.into_iter().next(),
            activities: hydrate_activities(&self.repos, activities).await?,
            opportunity,
        }))
    }

    pub async fn options(&self) -> Result<Vec<OpportunitySummary>, AppError> {
        self.repos.opportunities.options(OPTIONS_LIMIT).await
    }

    pub async fn save_opportunity(&self, form: &FormData) -> ActionState {
        let payload = match OpportunityPayload::parse(form) {
            Ok(payload) => payload,
            Err(errors) => return ActionState::invalid("Check the opportunity details", errors),
        };

        match self.repos.opportunities.save(&payload).await {
            Ok(opportunity) => {
                info!(opportunity_id = opportunity.id, status = %opportunity.status, "opportunity saved");
                invalidate(
                    self.invalidator.as_ref(),
                    &[Page::Opportunities, Page::Contacts, Page::Activities, Page::Dashboard],
                )
                .await;
                ActionState::success(if payload.id.is_some() { "Opportunity updated" } else { "Opportunity created" })
            }
            Err(AppError::NotFound(_)) => ActionState::error("Opportunity not found"),
            Err(e) => {
                error!("save opportunity failed: {:?}", e);
                ActionState::error("Could not save the opportunity")
            }
        }
    }

    pub async fn delete_opportunity(&self, form: &FormData) -> ActionState {
        let Some(id) = parse_identifier(form.get("id")) else {
            return ActionState::error("Invalid identifier");
        };

        match self.repos.opportunities.delete(id).await {
            Ok(()) => {
                info!(opportunity_id = id, "opportunity deleted");
                invalidate(
                    self.invalidator.as_ref(),
                    &[Page::Opportunities, Page::Contacts, Page::Activities, Page::Dashboard],
                )
                .await;
                ActionState::success("Opportunity deleted")
            }
            Err(AppError::NotFound(_)) => ActionState::error("Opportunity not found"),
            Err(e) => {
                error!("delete opportunity failed: {:?}", e);
                ActionState::error("Could not delete the opportunity")
            }
        }
    }

    async fn hydrate(&self, opportunities: Vec<Opportunity>) -> Result<Vec<OpportunityWithRelations>, AppError> {
        if opportunities.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = opportunities.iter().map(|o| o.id).collect();
        let company_ids = unique_ids(opportunities.iter().filter_map(|o| o.company_id));
        let contact_ids = unique_ids(opportunities.iter().filter_map(|o| o.contact_id));
        let owner_ids = unique_ids(opportunities.iter().filter_map(|o| o.owner_id));

        let (companies, contacts, owners, activities) = tokio::try_join!(
            self.repos.companies.find_by_ids(&company_ids),
            self.repos.contacts.find_by_ids(&contact_ids),
            self.repos.team_members.find_by_ids(&owner_ids),
            self.repos.activities.recent_for_opportunities(&ids, RECENT_ACTIVITIES_PER_OPPORTUNITY),
        )?;

        let companies: HashMap<i64, Company> = companies.into_iter().map(|c| (c.id, c)).collect();
        let contacts: HashMap<i64, Contact> = contacts.into_iter().map(|c| (c.id, c)).collect();
        let owners: HashMap<i64, TeamMember> = owners.into_iter().map(|m| (m.id, m)).collect();
        let mut recent: HashMap<i64, Vec<ActivitySummary>> = HashMap::new();
        for activity in activities {
            if let Some(opportunity_id) = activity.opportunity_id {
                recent.entry(opportunity_id).or_default().push(activity);
            }
        }

        Ok(opportunities
            .into_iter()
            .map(|opportunity| OpportunityWithRelations {
                company: opportunity.company_id.and_then(|id| companies.get(&id).cloned()),
                contact: opportunity.contact_id.and_then(|id| contacts.get(&id).cloned()),
                owner: opportunity.owner_id.and_then(|id| owners.get(&id).cloned()),
                activities: recent.remove(&opportunity.id).unwrap_or_default(),
                opportunity,
            })
            .collect())
    }
}
