mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use common::{encode, parse_body, TestApp, PASSWORD};
use tower::ServiceExt;

#[tokio::test]
async fn test_register_login_and_me() {
    let app = TestApp::new().await;
    let session = app.register_and_login("Jane@Example.com").await;

    let (status, body) = app.get(&session, "/api/v1/auth/me").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "jane@example.com");
    assert_eq!(body["role"], "member");
    assert!(body["teamMemberId"].as_i64().is_some(), "registration links a team member");

    let member_role: String = sqlx::query_scalar("SELECT role FROM team_members WHERE email = ?")
        .bind("jane@example.com")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(member_role, "Executive");
}

#[tokio::test]
async fn test_register_rejects_duplicate_email_and_weak_password() {
    let app = TestApp::new().await;
    app.register("Jane", "jane@example.com", PASSWORD).await;

    let body = app.register("Jane Again", "JANE@example.com", PASSWORD).await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["fieldErrors"]["email"], "An account with this email already exists");

    let body = app.register("Weak", "weak@example.com", "password").await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["fieldErrors"]["password"], "Password must contain an uppercase letter");
    assert_eq!(app.count("users").await, 1);
}

#[tokio::test]
async fn test_login_failures_are_unauthorized() {
    let app = TestApp::new().await;
    app.register("Jane", "jane@example.com", PASSWORD).await;

    for (email, password) in [("jane@example.com", "Wrong123"), ("nobody@example.com", PASSWORD), ("", "")] {
        let response = app
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/auth/login")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(encode(&[("email", email), ("password", password)])))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn test_protected_routes_require_session_and_csrf() {
    let app = TestApp::new().await;
    let session = app.register_and_login("jane@example.com").await;

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/api/v1/contacts").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Cookie without the CSRF header.
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/contacts")
                .header(header::COOKIE, &session.cookie)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(encode(&[("firstName", "A"), ("lastName", "B")])))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(app.count("contacts").await, 0);

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/contacts")
                .header(header::COOKIE, "session_token=not-a-jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_records_session_log() {
    let app = TestApp::new().await;
    let session = app.register_and_login("jane@example.com").await;

    let (status, body) = app.get(&session, "/api/v1/account/sessions").await;
    assert_eq!(status, StatusCode::OK);
    let sessions = body["sessions"].as_array().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["ipAddress"], "203.0.113.9");
    assert_eq!(sessions[0]["userAgent"], "integration-tests");
}

#[tokio::test]
async fn test_login_creates_missing_team_member() {
    let app = TestApp::new().await;
    app.register("Jane", "jane@example.com", PASSWORD).await;
    sqlx::query("DELETE FROM team_members").execute(&app.pool).await.unwrap();

    let session = app.login("jane@example.com", PASSWORD).await;
    let (_, me) = app.get(&session, "/api/v1/auth/me").await;
    assert!(me["teamMemberId"].as_i64().is_some());

    let role: String = sqlx::query_scalar("SELECT role FROM team_members WHERE email = ?")
        .bind("jane@example.com")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(role, "member");
}

#[tokio::test]
async fn test_change_password_field_errors() {
    let app = TestApp::new().await;
    let session = app.register_and_login("jane@example.com").await;

    let (_, body) = app
        .post_form(&session, "/api/v1/account/password", &[
            ("currentPassword", PASSWORD),
            ("newPassword", PASSWORD),
            ("confirmPassword", PASSWORD),
        ])
        .await;
    assert_eq!(body["status"], "error");
    assert!(body["fieldErrors"]["newPassword"].is_string());

    let (_, body) = app
        .post_form(&session, "/api/v1/account/password", &[
            ("currentPassword", PASSWORD),
            ("newPassword", "Another123"),
            ("confirmPassword", "Another124"),
        ])
        .await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["fieldErrors"]["confirmPassword"], "Passwords do not match");
    assert!(body["fieldErrors"].get("newPassword").is_none());

    let (_, body) = app
        .post_form(&session, "/api/v1/account/password", &[
            ("currentPassword", "Wrong1234"),
            ("newPassword", "Another123"),
            ("confirmPassword", "Another123"),
        ])
        .await;
    assert_eq!(body["fieldErrors"]["currentPassword"], "Current password is incorrect");

    let (_, body) = app
        .post_form(&session, "/api/v1/account/password", &[
            ("currentPassword", PASSWORD),
            ("newPassword", "Another123"),
            ("confirmPassword", "Another123"),
        ])
        .await;
    assert_eq!(body["status"], "success");

    app.login("jane@example.com", "Another123").await;
}

#[tokio::test]
async fn test_update_profile_updates_team_member() {
    let app = TestApp::new().await;
    let session = app.register_and_login("jane@example.com").await;

    let (_, body) = app
        .post_form(&session, "/api/v1/account/profile", &[("name", "Jane Doe"), ("role", "Manager")])
        .await;
    assert_eq!(body["status"], "success");

    let (name, role): (String, String) = sqlx::query_as("SELECT name, role FROM team_members WHERE email = ?")
        .bind("jane@example.com")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(name, "Jane Doe");
    assert_eq!(role, "Manager");

    let (_, body) = app.post_form(&session, "/api/v1/account/profile", &[("name", "J")]).await;
    assert_eq!(body["fieldErrors"]["name"], "Name must be at least 2 characters");
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let app = TestApp::new().await;
    let session = app.register_and_login("jane@example.com").await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/auth/logout")
                .header(header::COOKIE, &session.cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cleared = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .any(|h| h.to_str().unwrap().starts_with("session_token=;"));
    assert!(cleared);
    assert!(parse_body(response).await.is_null());
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new().await;
    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(parse_body(response).await["status"], "ok");
}

#[tokio::test]
async fn test_session_reflects_current_profile_and_team_member() {
    let app = TestApp::new().await;
    let session = app.register_and_login("jane@example.com").await;

    let (_, body) = app
        .post_form(&session, "/api/v1/account/profile", &[("name", "Renamed Person"), ("role", "admin")])
        .await;
    assert_eq!(body["status"], "success");

    let (_, me) = app.get(&session, "/api/v1/auth/me").await;
    assert_eq!(me["name"], "Renamed Person");
    assert_eq!(me["role"], "admin");

    let (_, body) = app.post_form(&session, "/api/v1/account/profile", &[("name", "Renamed Person")]).await;
    assert_eq!(body["status"], "success");
    let role: Option<String> = sqlx::query_scalar("SELECT role FROM users WHERE email = ?")
        .bind("jane@example.com")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(role, None);

    let (_, me) = app.get(&session, "/api/v1/auth/me").await;
    assert_eq!(me["role"], "member");

    sqlx::query("DELETE FROM team_members").execute(&app.pool).await.unwrap();
    let (_, me) = app.get(&session, "/api/v1/auth/me").await;
    assert!(me["teamMemberId"].is_null());

    sqlx::query("DELETE FROM users").execute(&app.pool).await.unwrap();
    let (status, _) = app.get(&session, "/api/v1/auth/me").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_keeps_submitted_role_for_team_member() {
    let app = TestApp::new().await;
    let session = app.register_admin_and_login("admin@example.com").await;

    let role: String = sqlx::query_scalar("SELECT role FROM team_members WHERE email = ?")
        .bind("admin@example.com")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(role, "admin");

    let (_, me) = app.get(&session, "/api/v1/auth/me").await;
    assert_eq!(me["role"], "admin");
}
