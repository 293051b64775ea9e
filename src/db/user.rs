//! User lookups
//!
//! Registration and password handling live outside this service; the HTTP
//! layer only needs to resolve a bearer token to a stored user.

use crate::db::models::{Role, User};
use crate::error::Result;
use rusqlite::{params, Connection, Row};

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    let role: String = row.get(3)?;
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        role: Role::from_str(&role).unwrap_or(Role::User),
    })
}

/// Resolve a user from their API token
pub fn find_user_by_token(conn: &Connection, token: &str) -> Result<Option<User>> {
    let result = conn.query_row(
        "SELECT id, email, name, role FROM users WHERE api_token = ?1",
        params![token],
        row_to_user,
    );

    match result {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Insert a user record (used by provisioning and tests)
pub fn create_user(
    conn: &Connection,
    email: &str,
    name: &str,
    role: Role,
    api_token: &str,
) -> Result<User> {
    conn.execute(
        "INSERT INTO users (email, name, role, api_token) VALUES (?1, ?2, ?3, ?4)",
        params![email, name, role.as_str(), api_token],
    )?;

    Ok(User {
        id: conn.last_insert_rowid(),
        email: email.to_string(),
        name: name.to_string(),
        role,
    })
}
