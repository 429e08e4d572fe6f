use std::env;

const DEV_AUTH_SECRET: &str = "crm-backend-development-secret";

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub auth_secret: String, // HS256 signing secret
    pub auth_issuer: String,
    pub session_ttl_hours: i64,
    pub page_cache_ttl_secs: u64,
    pub page_cache_capacity: u64,
    pub seed_team_password: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let production = env::var("APP_ENV").map(|v| v == "production").unwrap_or(false);
        let auth_secret = env::var("AUTH_SECRET")
            .or_else(|_| env::var("NEXTAUTH_SECRET"))
            .ok()
            .filter(|s| !s.is_empty())
            .or_else(|| (!production).then(|| DEV_AUTH_SECRET.to_string()))
            .expect("AUTH_SECRET must be set in production");

        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            port: env::var("PORT").unwrap_or_else(|_| "3000".to_string()).parse().expect("PORT must be a number"),
            auth_secret,
            auth_issuer: env::var("AUTH_ISSUER").unwrap_or_else(|_| "crm-backend".to_string()),
            session_ttl_hours: env::var("SESSION_TTL_HOURS").unwrap_or_else(|_| "8".to_string()).parse().expect("SESSION_TTL_HOURS must be a number"),
            page_cache_ttl_secs: env::var("PAGE_CACHE_TTL_SECS").unwrap_or_else(|_| "60".to_string()).parse().expect("PAGE_CACHE_TTL_SECS must be a number"),
            page_cache_capacity: env::var("PAGE_CACHE_CAPACITY").unwrap_or_else(|_| "1000".to_string()).parse().expect("PAGE_CACHE_CAPACITY must be a number"),
            seed_team_password: env::var("SEED_TEAM_PASSWORD").unwrap_or_else(|_| "ChangeMe123".to_string()),
        }
    }
}
