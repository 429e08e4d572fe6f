use crm_backend::{
    api::router::create_router,
    config::Config,
    domain::ports::{Page, PageInvalidator, Repositories},
    infra::factory::{build_state, sqlite_repositories},
    state::AppState,
};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::Value;
use sqlx::{sqlite::{SqliteConnectOptions, SqlitePoolOptions}, Pool, Sqlite};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

pub const PASSWORD: &str = "Secret123";

pub struct Session {
    pub cookie: String,
    pub csrf_token: String,
}

/// Invalidator that only remembers which pages were invalidated.
#[derive(Default)]
pub struct RecordingInvalidator {
    pub pages: Mutex<Vec<Page>>,
}

#[allow(dead_code)]
impl RecordingInvalidator {
    pub fn take(&self) -> Vec<Page> {
        std::mem::take(&mut *self.pages.lock().unwrap())
    }
}

#[async_trait]
impl PageInvalidator for RecordingInvalidator {
    async fn invalidate(&self, page: Page) {
        self.pages.lock().unwrap().push(page);
    }
}

#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub pool: Pool<Sqlite>,
    pub db_filename: String,
    pub state: Arc<AppState>,
}

#[allow(dead_code)]
impl TestApp {
    pub async fn new() -> Self {
        let db_filename = format!("test_{}.db", Uuid::new_v4());
        let db_url = format!("sqlite://{}?mode=rwc", db_filename);

        let connection_options = SqliteConnectOptions::from_str(&db_url)
            .unwrap()
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(connection_options)
            .await
            .expect("Failed to connect to test db");

        sqlx::migrate!("./migrations/sqlite")
            .run(&pool)
            .await
            .expect("Failed to migrate test db");

        let config = Config {
            database_url: db_url.clone(),
            port: 0,
            auth_secret: "test-secret".to_string(),
            auth_issuer: "test-issuer".to_string(),
            session_ttl_hours: 8,
            page_cache_ttl_secs: 60,
            page_cache_capacity: 100,
            seed_team_password: "ChangeMe123".to_string(),
        };

        let state = Arc::new(build_state(&config, sqlite_repositories(pool.clone())));
        let router = create_router(state.clone());

        Self {
            router,
            pool,
            db_filename,
            state,
        }
    }

    pub fn repos(&self) -> Repositories {
        self.state.repos.clone()
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> Value {
        let (status, body) = self
            .send_form(None, "/api/v1/auth/register", &[
                ("name", name),
                ("email", email),
                ("password", password),
                ("confirmPassword", password),
            ])
            .await;
        assert_eq!(status, StatusCode::OK);
        body
    }

    pub async fn login(&self, email: &str, password: &str) -> Session {
        let response = self
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/auth/login")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
                    .header(header::USER_AGENT, "integration-tests")
                    .body(Body::from(encode(&[("email", email), ("password", password)])))
                    .unwrap(),
            )
            .await
            .unwrap();

        if !response.status().is_success() {
            panic!("Login failed in test helper: status {}", response.status());
        }

        let cookie = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|h| h.to_str().unwrap().to_string())
            .find(|c| c.starts_with("session_token="))
            .expect("No session_token cookie returned");
        let cookie = cookie.split(';').next().unwrap().to_string();

        let body = parse_body(response).await;
        let csrf_token = body["csrfToken"].as_str().expect("No csrfToken in body").to_string();

        Session { cookie, csrf_token }
    }

    /// Registers a regular user and signs them in.
    pub async fn register_and_login(&self, email: &str) -> Session {
        let result = self.register("Test User", email, PASSWORD).await;
        assert_eq!(result["status"], "success", "register failed: {}", result);
        self.login(email, PASSWORD).await
    }

    /// Registers an admin, whose reads are not restricted to one owner.
    pub async fn register_admin_and_login(&self, email: &str) -> Session {
        let (_, result) = self
            .send_form(None, "/api/v1/auth/register", &[
                ("name", "Admin User"),
                ("email", email),
                ("password", PASSWORD),
                ("confirmPassword", PASSWORD),
                ("role", "admin"),
            ])
            .await;
        assert_eq!(result["status"], "success", "register failed: {}", result);
        self.login(email, PASSWORD).await
    }

    pub async fn team_member_id(&self, session: &Session) -> i64 {
        let (_, me) = self.get(session, "/api/v1/auth/me").await;
        me["teamMemberId"].as_i64().expect("session has no team member")
    }

    pub async fn get(&self, session: &Session, uri: &str) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri(uri)
                    .header(header::COOKIE, &session.cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        (status, parse_body(response).await)
    }

    pub async fn post_form(&self, session: &Session, uri: &str, fields: &[(&str, &str)]) -> (StatusCode, Value) {
        self.send_form(Some(session), uri, fields).await
    }

    async fn send_form(&self, session: Option<&Session>, uri: &str, fields: &[(&str, &str)]) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(session) = session {
            builder = builder
                .header(header::COOKIE, &session.cookie)
                .header("X-CSRF-Token", &session.csrf_token);
        }

        let response = self
            .router
            .clone()
            .oneshot(builder.body(Body::from(encode(fields))).unwrap())
            .await
            .unwrap();
        let status = response.status();
        (status, parse_body(response).await)
    }

    /// Saves a contact through the API and returns its id.
    pub async fn create_contact(&self, session: &Session, fields: &[(&str, &str)]) -> i64 {
        let (status, body) = self.post_form(session, "/api/v1/contacts", fields).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success", "save contact failed: {}", body);

        let email = fields
            .iter()
            .find(|(name, _)| *name == "email")
            .map(|(_, value)| value.to_string())
            .expect("create_contact needs an email");
        sqlx::query_scalar::<_, i64>("SELECT id FROM contacts WHERE email = ? ORDER BY id DESC LIMIT 1")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    /// Saves an opportunity through the API and returns its id.
    pub async fn create_opportunity(&self, session: &Session, fields: &[(&str, &str)]) -> i64 {
        let (status, body) = self.post_form(session, "/api/v1/opportunities", fields).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success", "save opportunity failed: {}", body);
        sqlx::query_scalar::<_, i64>("SELECT MAX(id) FROM opportunities")
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    /// Saves an activity through the API and returns its id.
    pub async fn create_activity(&self, session: &Session, fields: &[(&str, &str)]) -> i64 {
        let (status, body) = self.post_form(session, "/api/v1/activities", fields).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success", "save activity failed: {}", body);
        sqlx::query_scalar::<_, i64>("SELECT MAX(id) FROM activities")
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    pub async fn count(&self, table: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_filename);
        let _ = std::fs::remove_file(format!("{}-wal", self.db_filename));
        let _ = std::fs::remove_file(format!("{}-shm", self.db_filename));
    }
}

pub fn encode(fields: &[(&str, &str)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(fields)
        .finish()
}

pub async fn parse_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}
