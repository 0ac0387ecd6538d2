use log::{info, warn};
use std::env;
use std::str::FromStr;

use crate::db::{PgStore, SqliteStore};
use crate::error::{Error, Result};

const DEFAULT_DATABASE_URL: &str = "sqlite:game_night.db";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
}

impl Config {
    // Call `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Self {
        Self {
            database_url: load("DATABASE_URL", DEFAULT_DATABASE_URL.to_string()),
            max_connections: load("DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS),
        }
    }

    pub fn backend(&self) -> Result<Backend> {
        let url = self.database_url.as_str();
        if url.starts_with("sqlite:") {
            Ok(Backend::Sqlite)
        } else if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Ok(Backend::Postgres)
        } else {
            Err(Error::UnsupportedDatabase(self.database_url.clone()))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Sqlite,
    Postgres,
}

// A connected store of whichever backend the configuration names.
pub enum Store {
    Sqlite(SqliteStore),
    Postgres(PgStore),
}

impl Store {
    // Connects and brings the schema up to date.
    pub async fn connect(config: &Config) -> Result<Self> {
        match config.backend()? {
            Backend::Sqlite => Ok(Store::Sqlite(
                SqliteStore::connect(&config.database_url, config.max_connections).await?,
            )),
            Backend::Postgres => Ok(Store::Postgres(
                PgStore::connect(&config.database_url, config.max_connections).await?,
            )),
        }
    }
}

fn load<T: FromStr + std::fmt::Display>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                warn!("Invalid {} value {:?}, using default: {}", key, raw, default);
                default
            }
        },
        Err(_) => {
            info!("{} not set, using default: {}", key, default);
            default
        }
    }
}
