use gamenight_vote::config::{Config, Store};
use log::{error, info};

// Connects to the configured database and brings its schema up to date.
#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = Config::from_env();
    info!("Migrating database at {}", config.database_url);

    match Store::connect(&config).await {
        Ok(Store::Sqlite(_)) => info!("SQLite schema is up to date."),
        Ok(Store::Postgres(_)) => info!("Postgres schema is up to date."),
        Err(e) => {
            error!("Migration failed: {}", e);
            std::process::exit(1);
        }
    }
}
