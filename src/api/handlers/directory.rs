use axum::{extract::State, response::IntoResponse, Json};
use crate::state::AppState;
use crate::error::AppError;
use crate::api::extractors::auth::AuthUser;
use std::sync::Arc;

pub async fn list_companies(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.directory_service.companies().await?))
}

pub async fn company_options(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.directory_service.company_options().await?))
}

pub async fn list_tags(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.directory_service.tags().await?))
}

pub async fn list_team_members(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.directory_service.team_members().await?))
}
