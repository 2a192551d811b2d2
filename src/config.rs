//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;
use std::path::PathBuf;

use rust_decimal::Decimal;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// Root directory for uploaded thumbnails, PDFs and videos
    pub storage_dir: PathBuf,

    /// Apply pending migrations before serving
    pub run_migrations: bool,

    /// Balance given to the default admin user when it is first created
    pub admin_initial_balance: Decimal,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingEnv("DATABASE_URL"))?;

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("DATABASE_MAX_CONNECTIONS"))?;

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("PORT"))?;

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let storage_dir = env::var("STORAGE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("storage"));

        let run_migrations = parse_flag(
            &env::var("RUN_MIGRATIONS").unwrap_or_else(|_| "false".to_string()),
        )
        .ok_or(ConfigError::InvalidValue("RUN_MIGRATIONS"))?;

        let admin_initial_balance: Decimal = env::var("ADMIN_INITIAL_BALANCE")
            .unwrap_or_else(|_| "9999999999".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("ADMIN_INITIAL_BALANCE"))?;

        if admin_initial_balance.is_sign_negative() {
            return Err(ConfigError::InvalidValue("ADMIN_INITIAL_BALANCE"));
        }

        Ok(Self {
            database_url,
            database_max_connections,
            host,
            port,
            environment,
            storage_dir,
            run_migrations,
            admin_initial_balance,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}
