use chrono::{Duration, Utc};
use serde::Serialize;

use crate::domain::models::activity::ActivityWithRelations;
use crate::domain::models::opportunity::{OpportunityStatus, StatusTotal};
use crate::domain::ports::Repositories;
use crate::domain::services::activity_service::hydrate_activities;
use crate::error::AppError;

const UPCOMING_WINDOW_DAYS: i64 = 7;
const UPCOMING_LIMIT: i64 = 10;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub contact_count: i64,
    pub activity_count: i64,
    /// One entry per status, in pipeline order.
    pub pipeline_totals: Vec<StatusTotal>,
    pub upcoming_activities: Vec<ActivityWithRelations>,
}

pub struct DashboardService {
    repos: Repositories,
}

impl DashboardService {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    pub async fn dashboard_metrics(&self, owner_id: Option<i64>) -> Result<DashboardMetrics, AppError> {
        let now = Utc::now();
        let horizon = now + Duration::days(UPCOMING_WINDOW_DAYS);

        let (contact_count, activity_count, totals, upcoming) = tokio::try_join!(
            self.repos.contacts.count(owner_id),
            self.repos.activities.count(owner_id),
            self.repos.opportunities.status_totals(owner_id),
            self.repos.activities.upcoming(owner_id, now, horizon, UPCOMING_LIMIT),
        )?;

        let pipeline_totals = OpportunityStatus::ALL
            .iter()
            .map(|status| {
                totals
                    .iter()
                    .find(|total| total.status == *status)
                    .cloned()
                    .unwrap_or_else(|| StatusTotal::empty(*status))
            })
            .collect();

        Ok(DashboardMetrics {
            contact_count,
            activity_count,
            pipeline_totals,
            upcoming_activities: hydrate_activities(&self.repos, upcoming).await?,
        })
    }
}
