use axum::{
    extract::{FromRequestParts, FromRef},
    http::{request::Parts, Method, StatusCode},
};
use crate::state::AppState;
use crate::domain::models::auth::Principal;
use crate::domain::services::auth_service::SESSION_COOKIE;
use crate::error::AppError;
use std::sync::Arc;
use tower_cookies::Cookies;
use tracing::{error, Span};

/// The signed-in principal, reloaded from the database for the user the
/// session cookie names. Mutating requests must also echo the session's CSRF
/// token in `X-CSRF-Token`.
pub struct AuthUser(pub Principal);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let cookies = parts.extensions.get::<Cookies>()
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;

        let token = cookies.get(SESSION_COOKIE)
            .ok_or(StatusCode::UNAUTHORIZED)?
            .value()
            .to_string();

        let app_state = <Arc<AppState> as FromRef<S>>::from_ref(state);

        let claims = app_state.auth_service.decode(&token)
            .map_err(|_| StatusCode::UNAUTHORIZED)?;

        let method = &parts.method;
        if method != Method::GET && method != Method::HEAD && method != Method::OPTIONS {
            let csrf_header_val = parts.headers.get("X-CSRF-Token")
                .ok_or(StatusCode::FORBIDDEN)?
                .to_str()
                .map_err(|_| StatusCode::FORBIDDEN)?;

            if csrf_header_val != claims.csrf_token {
                return Err(StatusCode::FORBIDDEN);
            }
        }

        let principal = app_state.auth_service.current_principal(&claims).await.map_err(|e| match e {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            e => {
                error!("failed to load session principal: {:?}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        })?;
        Span::current().record("user_id", principal.id.as_str());

        Ok(AuthUser(principal))
    }
}
