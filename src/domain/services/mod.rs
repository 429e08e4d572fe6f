pub mod activity_service;
pub mod auth_service;
pub mod backfill;
pub mod contact_service;
pub mod dashboard_service;
pub mod directory_service;
pub mod listing;
pub mod opportunity_service;

use crate::domain::ports::{Page, PageInvalidator};

pub(crate) async fn invalidate(invalidator: &dyn PageInvalidator, pages: &[Page]) {
    for page in pages {
        invalidator.invalidate(*page).await;
    }
}
