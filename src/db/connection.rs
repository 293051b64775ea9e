//! Credential/session store: one record per (user, broker) pair

use crate::db::models::{ConnectionRecord, CredentialMap};
use crate::error::{AppError, Result};
use rusqlite::{params, Connection, Row};

/// Values written by a connect (or connect-callback) upsert
#[derive(Debug, Clone, Default)]
pub struct ConnectionUpsert {
    /// Submitted credential map; `None` leaves any existing map in place.
    pub connection_details: Option<CredentialMap>,
    pub jwt_token: String,
    pub refresh_token: Option<String>,
    pub feed_token: Option<String>,
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<ConnectionRecord> {
    let details_json: String = row.get(3)?;
    let connection_details = serde_json::from_str(&details_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(ConnectionRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        broker_id: row.get(2)?,
        connection_details,
        is_connected: row.get(4)?,
        last_connected: row.get(5)?,
        jwt_token: row.get(6)?,
        refresh_token: row.get(7)?,
        feed_token: row.get(8)?,
    })
}

const RECORD_COLUMNS: &str = "id, user_id, broker_id, connection_details, is_connected, \
     last_connected, jwt_token, refresh_token, feed_token";

/// Find the connection record for a (user, broker) pair
pub fn find_connection(
    conn: &Connection,
    user_id: i64,
    broker_id: i64,
) -> Result<Option<ConnectionRecord>> {
    let result = conn.query_row(
        &format!("SELECT {RECORD_COLUMNS} FROM user_brokers WHERE user_id = ?1 AND broker_id = ?2"),
        params![user_id, broker_id],
        row_to_record,
    );

    match result {
        Ok(record) => Ok(Some(record)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// List all connection records for a user
pub fn list_connections(conn: &Connection, user_id: i64) -> Result<Vec<ConnectionRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RECORD_COLUMNS} FROM user_brokers WHERE user_id = ?1"
    ))?;
    let records = stmt
        .query_map(params![user_id], row_to_record)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(records)
}

/// Create or update the connection record for a (user, broker) pair,
/// marking it connected and storing the issued tokens.
///
/// Find-then-update-or-insert; callers serialize per (user, broker) key.
pub fn upsert_connection(
    conn: &Connection,
    user_id: i64,
    broker_id: i64,
    upsert: &ConnectionUpsert,
) -> Result<ConnectionRecord> {
    let existing = find_connection(conn, user_id, broker_id)?;

    match existing {
        Some(record) => {
            let details_json = match &upsert.connection_details {
                Some(details) => serde_json::to_string(details)?,
                None => serde_json::to_string(&record.connection_details)?,
            };
            conn.execute(
                r#"
                UPDATE user_brokers
                SET connection_details = ?1, is_connected = 1,
                    last_connected = datetime('now'), jwt_token = ?2,
                    refresh_token = ?3, feed_token = ?4
                WHERE id = ?5
                "#,
                params![
                    details_json,
                    upsert.jwt_token,
                    upsert.refresh_token,
                    upsert.feed_token,
                    record.id,
                ],
            )?;
        }
        None => {
            let details_json =
                serde_json::to_string(upsert.connection_details.as_ref().unwrap_or(&CredentialMap::new()))?;
            conn.execute(
                r#"
                INSERT INTO user_brokers (user_id, broker_id, connection_details,
                                          is_connected, last_connected, jwt_token,
                                          refresh_token, feed_token)
                VALUES (?1, ?2, ?3, 1, datetime('now'), ?4, ?5, ?6)
                "#,
                params![
                    user_id,
                    broker_id,
                    details_json,
                    upsert.jwt_token,
                    upsert.refresh_token,
                    upsert.feed_token,
                ],
            )?;
        }
    }

    find_connection(conn, user_id, broker_id)?
        .ok_or_else(|| AppError::Internal("connection record missing after upsert".to_string()))
}

/// Flip the connected flag on an existing, currently-connected record.
///
/// Acting on an absent or already-disconnected record is an error, not a
/// no-op. Tokens are left in place.
pub fn mark_disconnected(
    conn: &Connection,
    user_id: i64,
    broker_id: i64,
) -> Result<ConnectionRecord> {
    let record = find_connection(conn, user_id, broker_id)?.ok_or_else(|| {
        AppError::NotConnected("User-broker connection not established or expired".to_string())
    })?;

    if !record.is_connected {
        return Err(AppError::NotConnected(
            "User-broker connection not established or expired".to_string(),
        ));
    }

    conn.execute(
        "UPDATE user_brokers SET is_connected = 0 WHERE id = ?1",
        params![record.id],
    )?;

    Ok(ConnectionRecord {
        is_connected: false,
        ..record
    })
}
