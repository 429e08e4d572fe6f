use axum::{extract::State, response::IntoResponse, Json};
use crate::state::AppState;
use crate::error::AppError;
use crate::api::extractors::auth::AuthUser;
use crate::api::handlers::cache_key;
use crate::domain::ports::Page;
use std::sync::Arc;

pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let owner_id = principal.owner_filter();
    let key = cache_key(Page::Dashboard, None, &principal);

    let body = state
        .page_cache
        .get_or_render(Page::Dashboard, key, || state.dashboard_service.dashboard_metrics(owner_id))
        .await?;

    Ok(Json(body))
}
