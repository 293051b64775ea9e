//! Broker catalog queries

use crate::db::models::{BrokerDefinition, Exchange};
use crate::error::{AppError, Result};
use rusqlite::{params, Connection, Row};
use std::collections::HashSet;

/// New broker definition (administrative create)
#[derive(Debug, Clone)]
pub struct NewBroker {
    pub name: String,
    pub description: Option<String>,
    pub logo: String,
    pub supported_exchanges: Vec<Exchange>,
    pub connection_fields: Vec<String>,
    pub api_key: String,
    pub api_secret: String,
}

/// Partial patch applied by an administrative edit.
///
/// Optional attributes are written only when supplied non-empty; the
/// connection field list always replaces the prior list wholesale.
#[derive(Debug, Clone)]
pub struct BrokerPatch {
    pub api_url: Option<String>,
    pub logo: Option<String>,
    pub supported_exchanges: Option<Vec<Exchange>>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub connection_fields: Vec<String>,
}

/// Derive the catalog slug from a display name: uppercase, spaces to
/// underscores. Computed once at creation and never recomputed on edit.
pub fn derive_slug(name: &str) -> String {
    name.to_uppercase().replace(' ', "_")
}

/// True when every entry in the list is distinct
fn all_unique(fields: &[String]) -> bool {
    fields.iter().collect::<HashSet<_>>().len() == fields.len()
}

fn row_to_broker(row: &Row<'_>) -> rusqlite::Result<BrokerDefinition> {
    let exchanges_json: String = row.get(6)?;
    let fields_json: String = row.get(7)?;
    let parse_err = |e: serde_json::Error| {
        rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
    };

    Ok(BrokerDefinition {
        id: row.get(0)?,
        slug: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        logo: row.get(4)?,
        api_url: row.get(5)?,
        supported_exchanges: serde_json::from_str(&exchanges_json).map_err(parse_err)?,
        connection_fields: serde_json::from_str(&fields_json).map_err(parse_err)?,
        api_key: row.get(8)?,
        api_secret: row.get(9)?,
        is_active: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

const BROKER_COLUMNS: &str = "id, slug, name, description, logo, api_url, \
     supported_exchanges, connection_fields, api_key, api_secret, is_active, \
     created_at, updated_at";

/// Create a new broker definition
pub fn create_broker(conn: &Connection, broker: &NewBroker) -> Result<BrokerDefinition> {
    let slug = derive_slug(&broker.name);

    let slug_taken: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM brokers WHERE slug = ?1)",
        params![slug],
        |row| row.get(0),
    )?;
    if slug_taken {
        return Err(AppError::Validation(
            "Please provide a unique broker name".to_string(),
        ));
    }

    if !all_unique(&broker.connection_fields) {
        return Err(AppError::Validation(
            "All connection fields should be unique".to_string(),
        ));
    }

    conn.execute(
        r#"
        INSERT INTO brokers (slug, name, description, logo, supported_exchanges,
                             connection_fields, api_key, api_secret)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
        params![
            slug,
            broker.name,
            broker.description,
            broker.logo,
            serde_json::to_string(&broker.supported_exchanges)?,
            serde_json::to_string(&broker.connection_fields)?,
            broker.api_key,
            broker.api_secret,
        ],
    )?;

    let id = conn.last_insert_rowid();
    tracing::info!("Created broker '{}' ({})", broker.name, slug);

    get_broker(conn, id)
}

/// Apply a partial patch to an existing broker definition
pub fn edit_broker(conn: &Connection, id: i64, patch: &BrokerPatch) -> Result<BrokerDefinition> {
    if !all_unique(&patch.connection_fields) {
        return Err(AppError::Validation(
            "All connection fields should be unique".to_string(),
        ));
    }

    let mut broker = get_broker(conn, id)?;

    if let Some(api_url) = patch.api_url.as_ref().filter(|v| !v.is_empty()) {
        broker.api_url = Some(api_url.clone());
    }
    if let Some(logo) = patch.logo.as_ref().filter(|v| !v.is_empty()) {
        broker.logo = logo.clone();
    }
    if let Some(exchanges) = patch.supported_exchanges.as_ref() {
        broker.supported_exchanges = exchanges.clone();
    }
    if let Some(api_key) = patch.api_key.as_ref().filter(|v| !v.is_empty()) {
        broker.api_key = api_key.clone();
    }
    if let Some(api_secret) = patch.api_secret.as_ref().filter(|v| !v.is_empty()) {
        broker.api_secret = api_secret.clone();
    }
    broker.connection_fields = patch.connection_fields.clone();

    conn.execute(
        r#"
        UPDATE brokers
        SET logo = ?1, api_url = ?2, supported_exchanges = ?3, connection_fields = ?4,
            api_key = ?5, api_secret = ?6, updated_at = datetime('now')
        WHERE id = ?7
        "#,
        params![
            broker.logo,
            broker.api_url,
            serde_json::to_string(&broker.supported_exchanges)?,
            serde_json::to_string(&broker.connection_fields)?,
            broker.api_key,
            broker.api_secret,
            id,
        ],
    )?;

    get_broker(conn, id)
}

/// Get a broker definition by id
pub fn get_broker(conn: &Connection, id: i64) -> Result<BrokerDefinition> {
    let result = conn.query_row(
        &format!("SELECT {BROKER_COLUMNS} FROM brokers WHERE id = ?1"),
        params![id],
        row_to_broker,
    );

    match result {
        Ok(broker) => Ok(broker),
        Err(rusqlite::Error::QueryReturnedNoRows) => {
            Err(AppError::NotFound("Broker not found".to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// List all broker definitions
pub fn list_brokers(conn: &Connection) -> Result<Vec<BrokerDefinition>> {
    let mut stmt =
        conn.prepare(&format!("SELECT {BROKER_COLUMNS} FROM brokers ORDER BY id"))?;
    let brokers = stmt
        .query_map([], row_to_broker)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(brokers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;

    fn create_test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn angel_one() -> NewBroker {
        NewBroker {
            name: "Angel One".to_string(),
            description: None,
            logo: "https://x/y.png".to_string(),
            supported_exchanges: vec![Exchange::Nse],
            connection_fields: vec![
                "client_id".to_string(),
                "password".to_string(),
                "totp".to_string(),
            ],
            api_key: "k".to_string(),
            api_secret: "s".to_string(),
        }
    }

    #[test]
    fn test_derive_slug() {
        assert_eq!(derive_slug("Angel One"), "ANGEL_ONE");
        assert_eq!(derive_slug("zerodha"), "ZERODHA");
        assert_eq!(derive_slug("Interactive Brokers India"), "INTERACTIVE_BROKERS_INDIA");
    }

    #[test]
    fn test_create_broker() {
        let conn = create_test_db();
        let broker = create_broker(&conn, &angel_one()).unwrap();
        assert_eq!(broker.slug, "ANGEL_ONE");
        assert_eq!(broker.name, "Angel One");
        assert_eq!(broker.connection_fields.len(), 3);
        assert!(broker.is_active);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let conn = create_test_db();
        create_broker(&conn, &angel_one()).unwrap();

        // Same derived slug, different casing
        let mut dup = angel_one();
        dup.name = "ANGEL one".to_string();
        let err = create_broker(&conn, &dup).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_duplicate_connection_fields_rejected() {
        let conn = create_test_db();
        let mut broker = angel_one();
        broker.connection_fields =
            vec!["totp".to_string(), "password".to_string(), "totp".to_string()];
        let err = create_broker(&conn, &broker).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_edit_partial_patch() {
        let conn = create_test_db();
        let created = create_broker(&conn, &angel_one()).unwrap();

        // Patch only api_key; logo, exchanges and api_url must survive,
        // connection_fields is replaced wholesale.
        let patch = BrokerPatch {
            api_url: None,
            logo: None,
            supported_exchanges: None,
            api_key: Some("new-key".to_string()),
            api_secret: None,
            connection_fields: vec!["client_id".to_string(), "pin".to_string()],
        };
        let updated = edit_broker(&conn, created.id, &patch).unwrap();

        assert_eq!(updated.api_key, "new-key");
        assert_eq!(updated.logo, created.logo);
        assert_eq!(updated.supported_exchanges, created.supported_exchanges);
        assert_eq!(updated.api_url, created.api_url);
        assert_eq!(
            updated.connection_fields,
            vec!["client_id".to_string(), "pin".to_string()]
        );
        // Slug never recomputed on edit
        assert_eq!(updated.slug, "ANGEL_ONE");
    }

    #[test]
    fn test_edit_empty_values_ignored() {
        let conn = create_test_db();
        let created = create_broker(&conn, &angel_one()).unwrap();

        let patch = BrokerPatch {
            api_url: Some(String::new()),
            logo: Some(String::new()),
            supported_exchanges: None,
            api_key: None,
            api_secret: None,
            connection_fields: created.connection_fields.clone(),
        };
        let updated = edit_broker(&conn, created.id, &patch).unwrap();
        assert_eq!(updated.logo, created.logo);
        assert_eq!(updated.api_url, None);
    }

    #[test]
    fn test_edit_missing_broker() {
        let conn = create_test_db();
        let patch = BrokerPatch {
            api_url: None,
            logo: None,
            supported_exchanges: None,
            api_key: None,
            api_secret: None,
            connection_fields: vec![],
        };
        let err = edit_broker(&conn, 42, &patch).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_list_brokers() {
        let conn = create_test_db();
        create_broker(&conn, &angel_one()).unwrap();
        let mut other = angel_one();
        other.name = "Zerodha".to_string();
        create_broker(&conn, &other).unwrap();

        let brokers = list_brokers(&conn).unwrap();
        assert_eq!(brokers.len(), 2);
    }
}
