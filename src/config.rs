//! Process configuration
//!
//! Read once from the environment at startup and passed explicitly through
//! `AppState` to the store and broker adapters.

use std::path::PathBuf;

/// Default Angel One API base URL
pub const ANGEL_ONE_BASE_URL: &str = "https://apiconnect.angelone.in";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP bind host
    pub host: String,
    /// HTTP bind port
    pub port: u16,
    /// SQLite database path
    pub database_path: PathBuf,
    /// Angel One API base URL (overridable for testing)
    pub angel_api_url: String,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let host = std::env::var("BROKERHUB_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = std::env::var("BROKERHUB_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8787);
        let database_path = std::env::var("BROKERHUB_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("brokerhub.db"));
        let angel_api_url =
            std::env::var("ANGEL_API_URL").unwrap_or_else(|_| ANGEL_ONE_BASE_URL.to_string());

        Self {
            host,
            port,
            database_path,
            angel_api_url,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
            database_path: PathBuf::from("brokerhub.db"),
            angel_api_url: ANGEL_ONE_BASE_URL.to_string(),
        }
    }
}
