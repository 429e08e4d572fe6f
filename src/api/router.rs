use axum::{
    body::Body,
    extract::Request,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use crate::state::AppState;
use crate::api::handlers::{account, activity, auth, contact, dashboard, directory, health, opportunity};
use tower_http::{
    trace::TraceLayer,
    classify::ServerErrorsFailureClass,
};
use tower_cookies::CookieManagerLayer;
use tracing::{info_span, Span, error, info};
use uuid::Uuid;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))

        // Auth
        .route("/api/v1/auth/register", post(auth::register))
        .route("/api/v1/auth/login", post(auth::login))
        .route("/api/v1/auth/logout", post(auth::logout))
        .route("/api/v1/auth/me", get(auth::me))

        // Account
        .route("/api/v1/account/profile", post(account::update_profile))
        .route("/api/v1/account/password", post(account::change_password))
        .route("/api/v1/account/sessions", get(account::list_sessions))

        .route("/api/v1/dashboard", get(dashboard::get_dashboard))

        // Contacts
        .route("/api/v1/contacts", get(contact::list_contacts).post(contact::save_contact))
        .route("/api/v1/contacts/options", get(contact::contact_options))
        .route("/api/v1/contacts/delete", post(contact::delete_contact))
        .route("/api/v1/contacts/{contact_id}", get(contact::get_contact))

        // Opportunities
        .route("/api/v1/opportunities", get(opportunity::list_opportunities).post(opportunity::save_opportunity))
        .route("/api/v1/opportunities/options", get(opportunity::opportunity_options))
        .route("/api/v1/opportunities/delete", post(opportunity::delete_opportunity))
        .route("/api/v1/opportunities/{opportunity_id}", get(opportunity::get_opportunity))

        // Activities
        .route("/api/v1/activities", get(activity::list_activities).post(activity::save_activity))
        .route("/api/v1/activities/delete", post(activity::delete_activity))
        .route("/api/v1/activities/{activity_id}", get(activity::get_activity))

        // Directory
        .route("/api/v1/companies", get(directory::list_companies))
        .route("/api/v1/companies/options", get(directory::company_options))
        .route("/api/v1/tags", get(directory::list_tags))
        .route("/api/v1/team-members", get(directory::list_team_members))

        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    let request_id = Uuid::new_v4().to_string();
                    info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = ?request.method(),
                        uri = ?request.uri(),
                        version = ?request.version(),
                        user_id = tracing::field::Empty,
                    )
                })
                .on_request(|request: &Request<Body>, _span: &Span| {
                    info!("started processing request: {} {}", request.method(), request.uri().path());
                })
                .on_response(|response: &axum::http::Response<Body>, latency: Duration, _span: &Span| {
                    info!(
                        status = response.status().as_u16(),
                        latency_ms = latency.as_millis(),
                        "finished processing request"
                    );
                })
                .on_failure(|error: ServerErrorsFailureClass, _latency: Duration, _span: &Span| {
                    error!("request failed: {:?}", error);
                })
        )
        .layer(CookieManagerLayer::new())
        .with_state(state)
}
