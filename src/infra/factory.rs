use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use sqlx::{postgres::{PgPoolOptions, PgConnectOptions}, sqlite::{SqlitePoolOptions, SqliteJournalMode, SqliteConnectOptions}};
use sqlx::{PgPool, SqlitePool, ConnectOptions};
use tracing::info;
use tracing::log::LevelFilter;

use crate::config::Config;
use crate::state::AppState;
use crate::domain::ports::{PageInvalidator, Repositories};
use crate::domain::services::{
    activity_service::ActivityService, auth_service::AuthService, contact_service::ContactService,
    dashboard_service::DashboardService, directory_service::DirectoryService,
    opportunity_service::OpportunityService,
};
use crate::infra::cache::page_cache::PageCache;
use crate::infra::repositories::{
    postgres_activity_repo::PostgresActivityRepo, postgres_session_log_repo::PostgresSessionLogRepo,
    postgres_company_repo::PostgresCompanyRepo, postgres_contact_repo::PostgresContactRepo,
    postgres_tag_repo::PostgresTagRepo, postgres_opportunity_repo::PostgresOpportunityRepo,
    postgres_team_member_repo::PostgresTeamMemberRepo, postgres_user_repo::PostgresUserRepo,
    sqlite_activity_repo::SqliteActivityRepo, sqlite_session_log_repo::SqliteSessionLogRepo,
    sqlite_company_repo::SqliteCompanyRepo, sqlite_contact_repo::SqliteContactRepo,
    sqlite_tag_repo::SqliteTagRepo, sqlite_opportunity_repo::SqliteOpportunityRepo,
    sqlite_team_member_repo::SqliteTeamMemberRepo, sqlite_user_repo::SqliteUserRepo,
};

pub async fn bootstrap_state(config: &Config) -> AppState {
    build_state(config, connect_repositories(&config.database_url).await)
}

/// Opens the pool the URL points at, runs its migrations and wires every
/// repository onto it.
pub async fn connect_repositories(database_url: &str) -> Repositories {
    if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        info!("Initializing PostgreSQL connection...");

        let mut opts: PgConnectOptions = database_url.parse().expect("Invalid Postgres URL");
        opts = opts.log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect_with(opts)
            .await
            .expect("Failed to connect to Postgres");

        run_postgres_migrations(&pool).await;
        postgres_repositories(pool)
    } else {
        info!("Initializing SQLite connection with WAL Mode...");

        let opts = SqliteConnectOptions::from_str(database_url)
            .expect("Invalid SQLite connection string")
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5))
            .log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await
            .expect("Failed to connect to SQLite");

        run_sqlite_migrations(&pool).await;
        sqlite_repositories(pool)
    }
}

pub fn postgres_repositories(pool: PgPool) -> Repositories {
    Repositories {
        users: Arc::new(PostgresUserRepo::new(pool.clone())),
        team_members: Arc::new(PostgresTeamMemberRepo::new(pool.clone())),
        session_logs: Arc::new(PostgresSessionLogRepo::new(pool.clone())),
        companies: Arc::new(PostgresCompanyRepo::new(pool.clone())),
        tags: Arc::new(PostgresTagRepo::new(pool.clone())),
        contacts: Arc::new(PostgresContactRepo::new(pool.clone())),
        opportunities: Arc::new(PostgresOpportunityRepo::new(pool.clone())),
        activities: Arc::new(PostgresActivityRepo::new(pool)),
    }
}

pub fn sqlite_repositories(pool: SqlitePool) -> Repositories {
    Repositories {
        users: Arc::new(SqliteUserRepo::new(pool.clone())),
        team_members: Arc::new(SqliteTeamMemberRepo::new(pool.clone())),
        session_logs: Arc::new(SqliteSessionLogRepo::new(pool.clone())),
        companies: Arc::new(SqliteCompanyRepo::new(pool.clone())),
        tags: Arc::new(SqliteTagRepo::new(pool.clone())),
        contacts: Arc::new(SqliteContactRepo::new(pool.clone())),
        opportunities: Arc::new(SqliteOpportunityRepo::new(pool.clone())),
        activities: Arc::new(SqliteActivityRepo::new(pool)),
    }
}

/// Builds the services over `repos`. Mutating services invalidate the
/// shared page cache.
pub fn build_state(config: &Config, repos: Repositories) -> AppState {
    let page_cache = Arc::new(PageCache::new(
        Duration::from_secs(config.page_cache_ttl_secs),
        config.page_cache_capacity,
    ));
    let invalidator: Arc<dyn PageInvalidator> = page_cache.clone();

    AppState {
        config: config.clone(),
        auth_service: Arc::new(AuthService::new(repos.clone(), config.clone())),
        contact_service: Arc::new(ContactService::new(repos.clone(), invalidator.clone())),
        opportunity_service: Arc::new(OpportunityService::new(repos.clone(), invalidator.clone())),
        activity_service: Arc::new(ActivityService::new(repos.clone(), invalidator)),
        dashboard_service: Arc::new(DashboardService::new(repos.clone())),
        directory_service: Arc::new(DirectoryService::new(repos.clone())),
        repos,
        page_cache,
    }
}

pub async fn run_postgres_migrations(pool: &PgPool) {
    sqlx::migrate!("./migrations/postgres")
        .run(pool)
        .await
        .expect("Failed to run Postgres migrations");
}

pub async fn run_sqlite_migrations(pool: &SqlitePool) {
    sqlx::migrate!("./migrations/sqlite")
        .run(pool)
        .await
        .expect("Failed to run SQLite migrations");
}
