use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info};

use crate::domain::models::{
    action::ActionState,
    activity::{Activity, ActivityWithRelations},
    contact::ContactSummary,
    opportunity::OpportunitySummary,
    team_member::TeamMemberSummary,
};
use crate::domain::ports::{Page, PageInvalidator, Repositories};
use crate::domain::services::invalidate;
use crate::domain::services::listing::{unique_ids, Pagination};
use crate::domain::validation::schemas::{ActivityFilter, ActivityPayload};
use crate::domain::validation::{parse_identifier, FormData};
use crate::error::AppError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityList {
    pub activities: Vec<ActivityWithRelations>,
    pub filters: ActivityFilter,
    pub pagination: Pagination,
}

pub struct ActivityService {
    repos: Repositories,
    invalidator: Arc<dyn PageInvalidator>,
}

impl ActivityService {
    pub fn new(repos: Repositories, invalidator: Arc<dyn PageInvalidator>) -> Self {
        Self { repos, invalidator }
    }

    pub async fn list_activities(
        &self,
        filter: &ActivityFilter,
        owner_id: Option<i64>,
        page_size: u32,
    ) -> Result<ActivityList, AppError> {
        let total = self.repos.activities.count_filtered(filter, owner_id).await?;
        let pagination = Pagination::new(filter.page, page_size, total);
        let rows = self
            .repos
            .activities
            .list(filter, owner_id, pagination.limit(), pagination.offset())
            .await?;

        Ok(ActivityList {
            activities: hydrate_activities(&self.repos, rows).await?,
            filters: filter.clone(),
            pagination,
        })
    }

    pub async fn get_activity(&self, id: i64) -> Result<Option<ActivityWithRelations>, AppError> {
        let Some(activity) = self.repos.activities.find_by_id(id).await? else {
            return Ok(None);
        };
        Ok(hydrate_activities(&self.repos, vec![activity]).await?.pop())
    }

    pub async fn save_activity(&self, form: &FormData) -> ActionState {
        let payload = match ActivityPayload::parse(form) {
            Ok(payload) => payload,
            Err(errors) => return ActionState::invalid("Check the activity details", errors),
        };

        if !payload.has_association() {
            return ActionState::field_error(
                "Link the activity to a contact or an opportunity",
                "contactId",
                "Select a record",
            );
        }

        match self.repos.activities.save(&payload).await {
            Ok(activity) => {
                info!(activity_id = activity.id, kind = %activity.kind, "activity saved");
                invalidate(
                    self.invalidator.as_ref(),
                    &[Page::Activities, Page::Contacts, Page::Opportunities, Page::Dashboard],
                )
                .await;
                ActionState::success(if payload.id.is_some() { "Activity updated" } else { "Activity recorded" })
            }
            Err(AppError::NotFound(_)) => ActionState::error("Activity not found"),
            Err(e) => {
                error!("save activity failed: {:?}", e);
                ActionState::error("Could not save the activity")
            }
        }
    }

    pub async fn delete_activity(&self, form: &FormData) -> ActionState {
        let Some(id) = parse_identifier(form.get("id")) else {
            return ActionState::error("Invalid identifier");
        };

        match self.repos.activities.delete(id).await {
            Ok(()) => {
                info!(activity_id = id, "activity deleted");
                invalidate(
                    self.invalidator.as_ref(),
                    &[Page::Activities, Page::Contacts, Page::Opportunities, Page::Dashboard],
                )
                .await;
                ActionState::success("Activity deleted")
            }
            Err(AppError::NotFound(_)) => ActionState::error("Activity not found"),
            Err(e) => {
                error!("delete activity failed: {:?}", e);
                ActionState::error("Could not delete the activity")
            }
        }
    }
}

/// Attaches contact, opportunity and team member summaries, batching one
/// lookup per relation.
pub(crate) async fn hydrate_activities(
    repos: &Repositories,
    activities: Vec<Activity>,
) -> Result<Vec<ActivityWithRelations>, AppError> {
    if activities.is_empty() {
        return Ok(Vec::new());
    }
    let contact_ids = unique_ids(activities.iter().filter_map(|a| a.contact_id));
    let opportunity_ids = unique_ids(activities.iter().filter_map(|a| a.opportunity_id));
    let member_ids = unique_ids(activities.iter().filter_map(|a| a.team_member_id));

    let (contacts, opportunities, members) = tokio::try_join!(
        repos.contacts.summaries_by_ids(&contact_ids),
        repos.opportunities.summaries_by_ids(&opportunity_ids),
        repos.team_members.summaries_by_ids(&member_ids),
    )?;

    let contacts: HashMap<i64, ContactSummary> = contacts.into_iter().map(|c| (c.id, c)).collect();
    let opportunities: HashMap<i64, OpportunitySummary> = opportunities.into_iter().map(|o| (o.id, o)).collect();
    let members: HashMap<i64, TeamMemberSummary> = members.into_iter().map(|m| (m.id, m)).collect();

    Ok(activities
        .into_iter()
        .map(|activity| ActivityWithRelations {
            contact: activity.contact_id.and_then(|id| contacts.get(&id).cloned()),
            opportunity: activity.opportunity_id.and_then(|id| opportunities.get(&id).cloned()),
            team_member: activity.team_member_id.and_then(|id| members.get(&id).cloned()),
            activity,
        })
        .collect())
}
