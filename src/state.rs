//! Application state management

use crate::brokers::BrokerRegistry;
use crate::config::Config;
use crate::db::SqliteDb;
use crate::error::Result;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Application state shared across all request handlers
pub struct AppState {
    /// Process configuration, loaded once at startup
    pub config: Config,

    /// SQLite database connection
    pub db: Arc<SqliteDb>,

    /// Broker adapter registry
    pub brokers: Arc<BrokerRegistry>,

    /// Per-(user, broker) locks serializing connect/disconnect, so the
    /// store's read-modify-write upsert cannot race with itself.
    connection_locks: DashMap<(i64, i64), Arc<Mutex<()>>>,
}

impl AppState {
    /// Create new application state
    pub fn new(config: Config) -> Result<Self> {
        let db = Arc::new(SqliteDb::new(&config.database_path)?);
        let brokers = Arc::new(BrokerRegistry::new(&config));

        tracing::info!("Database: {:?}", config.database_path);

        Ok(Self {
            config,
            db,
            brokers,
            connection_locks: DashMap::new(),
        })
    }

    /// In-memory state for tests
    #[cfg(test)]
    pub fn new_for_testing(config: Config, brokers: BrokerRegistry) -> Self {
        Self {
            config,
            db: Arc::new(SqliteDb::open_in_memory().expect("in-memory db")),
            brokers: Arc::new(brokers),
            connection_locks: DashMap::new(),
        }
    }

    /// Mutual-exclusion handle for session-mutating operations on a
    /// (user, broker) pair
    pub fn connection_lock(&self, user_id: i64, broker_id: i64) -> Arc<Mutex<()>> {
        self.connection_locks
            .entry((user_id, broker_id))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
