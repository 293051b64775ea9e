//! SQLite database module

pub mod models;
mod broker;
mod connection;
mod migrations;
mod user;

pub use broker::{BrokerPatch, NewBroker};
pub use connection::ConnectionUpsert;

use crate::error::Result;
use models::{BrokerDefinition, ConnectionRecord, Role, User};
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::Path;

/// SQLite database wrapper
pub struct SqliteDb {
    conn: Mutex<Connection>,
}

impl SqliteDb {
    /// Create new SQLite database connection
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent access
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// In-memory database (tests)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn.lock();
        migrations::run_migrations(&conn)
    }

    // ========== User Methods ==========

    pub fn find_user_by_token(&self, token: &str) -> Result<Option<User>> {
        let conn = self.conn.lock();
        user::find_user_by_token(&conn, token)
    }

    pub fn create_user(
        &self,
        email: &str,
        name: &str,
        role: Role,
        api_token: &str,
    ) -> Result<User> {
        let conn = self.conn.lock();
        user::create_user(&conn, email, name, role, api_token)
    }

    // ========== Broker Catalog Methods ==========

    pub fn create_broker(&self, broker: &NewBroker) -> Result<BrokerDefinition> {
        let conn = self.conn.lock();
        broker::create_broker(&conn, broker)
    }

    pub fn edit_broker(&self, id: i64, patch: &BrokerPatch) -> Result<BrokerDefinition> {
        let conn = self.conn.lock();
        broker::edit_broker(&conn, id, patch)
    }

    pub fn get_broker(&self, id: i64) -> Result<BrokerDefinition> {
        let conn = self.conn.lock();
        broker::get_broker(&conn, id)
    }

    pub fn list_brokers(&self) -> Result<Vec<BrokerDefinition>> {
        let conn = self.conn.lock();
        broker::list_brokers(&conn)
    }

    // ========== Connection Record Methods ==========

    pub fn find_connection(
        &self,
        user_id: i64,
        broker_id: i64,
    ) -> Result<Option<ConnectionRecord>> {
        let conn = self.conn.lock();
        connection::find_connection(&conn, user_id, broker_id)
    }

    pub fn list_connections(&self, user_id: i64) -> Result<Vec<ConnectionRecord>> {
        let conn = self.conn.lock();
        connection::list_connections(&conn, user_id)
    }

    pub fn upsert_connection(
        &self,
        user_id: i64,
        broker_id: i64,
        upsert: &ConnectionUpsert,
    ) -> Result<ConnectionRecord> {
        let conn = self.conn.lock();
        connection::upsert_connection(&conn, user_id, broker_id, upsert)
    }

    pub fn mark_disconnected(&self, user_id: i64, broker_id: i64) -> Result<ConnectionRecord> {
        let conn = self.conn.lock();
        connection::mark_disconnected(&conn, user_id, broker_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_on_disk_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");

        let db = SqliteDb::new(&path).unwrap();
        assert!(db.list_brokers().unwrap().is_empty());
        drop(db);

        // Reopening must not re-run applied migrations
        let db = SqliteDb::new(&path).unwrap();
        assert!(db.find_user_by_token("none").unwrap().is_none());
    }
}
