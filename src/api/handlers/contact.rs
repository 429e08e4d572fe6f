use axum::{extract::{Path, Query, RawQuery, State}, response::IntoResponse, Form, Json};
use crate::state::AppState;
use crate::error::AppError;
use crate::api::extractors::auth::AuthUser;
use crate::api::handlers::{cache_key, invalid_params};
use crate::domain::ports::Page;
use crate::domain::services::listing::CONTACTS_PAGE_SIZE;
use crate::domain::validation::{schemas::ContactSearch, FormData};
use std::sync::Arc;
use tracing::info;

pub async fn list_contacts(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    RawQuery(raw_query): RawQuery,
    Query(params): Query<FormData>,
) -> Result<impl IntoResponse, AppError> {
    let search = ContactSearch::parse(&params).map_err(invalid_params)?;
    let key = cache_key(Page::Contacts, raw_query.as_deref(), &principal);

    let body = state
        .page_cache
        .get_or_render(Page::Contacts, key, || {
            state.contact_service.list_contacts(&search, CONTACTS_PAGE_SIZE)
        })
        .await?;

    Ok(Json(body))
}

pub async fn get_contact(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(contact_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let contact = state
        .contact_service
        .get_contact(contact_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Contact not found".into()))?;

    Ok(Json(contact))
}

pub async fn contact_options(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.contact_service.options().await?))
}

pub async fn save_contact(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Form(form): Form<FormData>,
) -> Result<impl IntoResponse, AppError> {
    let result = state.contact_service.save_contact(&form).await;
    info!(user_id = %principal.id, success = result.is_success(), "save contact");
    Ok(Json(result))
}

pub async fn delete_contact(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Form(form): Form<FormData>,
) -> Result<impl IntoResponse, AppError> {
    let result = state.contact_service.delete_contact(&form).await;
    info!(user_id = %principal.id, success = result.is_success(), "delete contact");
    Ok(Json(result))
}
