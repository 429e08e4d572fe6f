use axum::{extract::{Path, Query, RawQuery, State}, response::IntoResponse, Form, Json};
use crate::state::AppState;
use crate::error::AppError;
use crate::api::extractors::auth::AuthUser;
use crate::api::handlers::{cache_key, invalid_params};
use crate::domain::ports::Page;
use crate::domain::services::listing::ACTIVITIES_PAGE_SIZE;
use crate::domain::validation::{schemas::ActivityFilter, FormData};
use std::sync::Arc;
use tracing::info;

pub async fn list_activities(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    RawQuery(raw_query): RawQuery,
    Query(params): Query<FormData>,
) -> Result<impl IntoResponse, AppError> {
    let filter = ActivityFilter::parse(&params).map_err(invalid_params)?;
    let owner_id = principal.owner_filter();
    let key = cache_key(Page::Activities, raw_query.as_deref(), &principal);

    let body = state
        .page_cache
        .get_or_render(Page::Activities, key, || {
            state.activity_service.list_activities(&filter, owner_id, ACTIVITIES_PAGE_SIZE)
        })
        .await?;

    Ok(Json(body))
}

pub async fn get_activity(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(activity_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let activity = state
        .activity_service
        .get_activity(activity_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Activity not found".into()))?;

    Ok(Json(activity))
}

pub async fn save_activity(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Form(form): Form<FormData>,
) -> Result<impl IntoResponse, AppError> {
    let result = state.activity_service.save_activity(&form).await;
    info!(user_id = %principal.id, success = result.is_success(), "save activity");
    Ok(Json(result))
}

pub async fn delete_activity(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Form(form): Form<FormData>,
) -> Result<impl IntoResponse, AppError> {
    let result = state.activity_service.delete_activity(&form).await;
    info!(user_id = %principal.id, success = result.is_success(), "delete activity");
    Ok(Json(result))
}
