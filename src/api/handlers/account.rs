use axum::{extract::State, response::IntoResponse, Form, Json};
use crate::state::AppState;
use crate::error::AppError;
use crate::api::dtos::responses::SessionsResponse;
use crate::api::extractors::auth::AuthUser;
use crate::domain::validation::FormData;
use std::sync::Arc;

const RECENT_SESSIONS: i64 = 20;

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Form(form): Form<FormData>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.auth_service.update_profile(&principal, &form).await))
}

pub async fn change_password(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Form(form): Form<FormData>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.auth_service.change_password(&principal, &form).await))
}

pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let sessions = state.repos.session_logs.list_for_user(&principal.id, RECENT_SESSIONS).await?;
    Ok(Json(SessionsResponse { sessions }))
}
