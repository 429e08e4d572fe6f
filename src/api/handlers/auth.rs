use axum::{extract::State, http::{HeaderMap, StatusCode}, response::IntoResponse, Form, Json};
use crate::state::AppState;
use crate::error::AppError;
use crate::api::extractors::auth::AuthUser;
use crate::domain::models::auth::AuthResponse;
use crate::domain::services::auth_service::{ClientInfo, SESSION_COOKIE};
use crate::domain::validation::FormData;
use std::sync::Arc;
use tower_cookies::{Cookies, Cookie};
use tower_cookies::cookie::SameSite;
use time::Duration;
use tracing::info;

pub async fn register(
    State(state): State<Arc<AppState>>,
    Form(form): Form<FormData>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.auth_service.register(&form).await))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
    headers: HeaderMap,
    Form(form): Form<FormData>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.auth_service.login(&form, client_info(&headers)).await?;

    let mut cookie = Cookie::new(SESSION_COOKIE, session.token);
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_path("/");
    cookie.set_max_age(Duration::hours(state.config.session_ttl_hours));
    cookies.add(cookie);

    Ok(Json(AuthResponse {
        csrf_token: session.csrf_token,
        user: session.principal,
    }))
}

pub async fn logout(cookies: Cookies) -> Result<impl IntoResponse, AppError> {
    cookies.remove(Cookie::build((SESSION_COOKIE, "")).path("/").into());

    info!("User logged out");

    Ok(StatusCode::OK)
}

pub async fn me(AuthUser(principal): AuthUser) -> Result<impl IntoResponse, AppError> {
    Ok(Json(principal))
}

/// Client address from the first `X-Forwarded-For` hop, else `X-Real-IP`.
fn client_info(headers: &HeaderMap) -> ClientInfo {
    let ip_address = header_value(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| header_value(headers, "x-real-ip"))
        .map(str::to_string);

    ClientInfo {
        ip_address,
        user_agent: header_value(headers, "user-agent").map(str::to_string),
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_client_info_prefers_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        headers.insert("user-agent", HeaderValue::from_static("curl/8.0"));

        let info = client_info(&headers);
        assert_eq!(info.ip_address.as_deref(), Some("203.0.113.7"));
        assert_eq!(info.user_agent.as_deref(), Some("curl/8.0"));

        headers.remove("x-forwarded-for");
        assert_eq!(client_info(&headers).ip_address.as_deref(), Some("10.0.0.2"));
    }
}
