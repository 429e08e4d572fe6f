use crm_backend::config::Config;
use crm_backend::domain::services::backfill::backfill_team_users;
use crm_backend::infra::factory::connect_repositories;
use crm_backend::init_logging;
use tracing::error;

#[tokio::main]
async fn main() {
    let _guard = init_logging();

    let config = Config::from_env();
    let repos = connect_repositories(&config.database_url).await;

    match backfill_team_users(&repos, &config.seed_team_password).await {
        Ok(report) => {
            println!("Users created: {}", report.created);
            println!("Users updated: {}", report.updated);
        }
        Err(e) => {
            error!("backfill failed: {:?}", e);
            std::process::exit(1);
        }
    }
}
