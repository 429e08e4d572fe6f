use axum::{extract::{Path, Query, RawQuery, State}, response::IntoResponse, Form, Json};
use crate::state::AppState;
use crate::error::AppError;
use crate::api::extractors::auth::AuthUser;
use crate::api::handlers::cache_key;
use crate::domain::ports::Page;
use crate::domain::validation::{schemas::PipelineQuery, FormData};
use std::sync::Arc;
use tracing::info;

pub async fn list_opportunities(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    RawQuery(raw_query): RawQuery,
    Query(params): Query<FormData>,
) -> Result<impl IntoResponse, AppError> {
    let query = PipelineQuery::parse(&params);
    let owner_id = principal.owner_filter();
    let key = cache_key(Page::Opportunities, raw_query.as_deref(), &principal);

    let body = state
        .page_cache
        .get_or_render(Page::Opportunities, key, || {
            state.opportunity_service.list_opportunities(&query, owner_id)
        })
        .await?;

    Ok(Json(body))
}

pub async fn get_opportunity(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(opportunity_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let opportunity = state
        .opportunity_service
        .get_opportunity(opportunity_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Opportunity not found".into()))?;

    Ok(Json(opportunity))
}

pub async fn opportunity_options(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.opportunity_service.options().await?))
}

pub async fn save_opportunity(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Form(form): Form<FormData>,
) -> Result<impl IntoResponse, AppError> {
    let result = state.opportunity_service.save_opportunity(&form).await;
    info!(user_id = %principal.id, success = result.is_success(), "save opportunity");
    Ok(Json(result))
}

pub async fn delete_opportunity(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Form(form): Form<FormData>,
) -> Result<impl IntoResponse, AppError> {
    let result = state.opportunity_service.delete_opportunity(&form).await;
    info!(user_id = %principal.id, success = result.is_success(), "delete opportunity");
    Ok(Json(result))
}
