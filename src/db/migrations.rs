//! SQLite database migrations

use crate::error::Result;
use rusqlite::Connection;

/// Run all database migrations
pub fn run_migrations(conn: &Connection) -> Result<()> {
    // Create migrations table
    conn.execute(
        "CREATE TABLE IF NOT EXISTS migrations (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    run_migration(conn, "001_users", CREATE_USERS_TABLE)?;
    run_migration(conn, "002_brokers", CREATE_BROKERS_TABLE)?;
    run_migration(conn, "003_user_brokers", CREATE_USER_BROKERS_TABLE)?;

    tracing::info!("Database migrations completed");
    Ok(())
}

fn run_migration(conn: &Connection, name: &str, sql: &str) -> Result<()> {
    // Check if migration already applied
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM migrations WHERE name = ?)",
        [name],
        |row| row.get(0),
    )?;

    if !exists {
        tracing::info!("Running migration: {}", name);
        conn.execute_batch(sql)?;
        conn.execute("INSERT INTO migrations (name) VALUES (?)", [name])?;
    }

    Ok(())
}

const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT 'USER' CHECK (role IN ('USER', 'ADMIN')),
    api_token TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

const CREATE_BROKERS_TABLE: &str = r#"
CREATE TABLE brokers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    slug TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL UNIQUE,
    description TEXT,
    logo TEXT NOT NULL,
    api_url TEXT,
    supported_exchanges TEXT NOT NULL DEFAULT '[]',
    connection_fields TEXT NOT NULL DEFAULT '[]',
    api_key TEXT NOT NULL DEFAULT '',
    api_secret TEXT NOT NULL DEFAULT '',
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

const CREATE_USER_BROKERS_TABLE: &str = r#"
CREATE TABLE user_brokers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id),
    broker_id INTEGER NOT NULL REFERENCES brokers(id),
    connection_details TEXT NOT NULL DEFAULT '{}',
    is_connected INTEGER NOT NULL DEFAULT 0,
    last_connected TEXT,
    jwt_token TEXT,
    refresh_token TEXT,
    feed_token TEXT,
    UNIQUE(user_id, broker_id)
);
CREATE INDEX IF NOT EXISTS idx_user_brokers_user ON user_brokers(user_id);
"#;
