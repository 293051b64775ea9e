//! Database models

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Credential values submitted for a broker connection, keyed by the
/// broker's declared connection field names.
pub type CredentialMap = HashMap<String, String>;

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "USER")]
    User,
    #[serde(rename = "ADMIN")]
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "USER" => Some(Role::User),
            "ADMIN" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Platform user (authentication itself is handled by the token layer)
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub role: Role,
}

/// Exchange codes supported across the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Exchange {
    #[serde(rename = "NSE")]
    Nse,
    #[serde(rename = "BSE")]
    Bse,
    #[serde(rename = "MCX")]
    Mcx,
    #[serde(rename = "NCDEX")]
    Ncdex,
    #[serde(rename = "ICEX")]
    Icex,
    #[serde(rename = "NSE FX")]
    NseFx,
    #[serde(rename = "BSE FX")]
    BseFx,
    #[serde(rename = "MSEI")]
    Msei,
    #[serde(rename = "IEX")]
    Iex,
    #[serde(rename = "PXIL")]
    Pxil,
}

/// Broker catalog entry
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokerDefinition {
    pub id: i64,
    /// Derived once at creation from the display name; never recomputed.
    pub slug: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub logo: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    pub supported_exchanges: Vec<Exchange>,
    pub connection_fields: Vec<String>,
    pub api_key: String,
    #[serde(skip_serializing)]
    pub api_secret: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Persisted link between a user and a broker, including session tokens.
///
/// At most one live record exists per (user, broker) pair.
#[derive(Debug, Clone)]
pub struct ConnectionRecord {
    pub id: i64,
    pub user_id: i64,
    pub broker_id: i64,
    pub connection_details: CredentialMap,
    pub is_connected: bool,
    pub last_connected: Option<String>,
    pub jwt_token: Option<String>,
    pub refresh_token: Option<String>,
    pub feed_token: Option<String>,
}

impl ConnectionRecord {
    /// Session token if present and non-empty
    pub fn session_token(&self) -> Option<&str> {
        self.jwt_token.as_deref().filter(|t| !t.is_empty())
    }
}

/// Client-facing view of a connection record. Session tokens and raw
/// credentials never leave the server.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSummary {
    pub is_connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_connected: Option<String>,
}

impl From<&ConnectionRecord> for ConnectionSummary {
    fn from(record: &ConnectionRecord) -> Self {
        Self {
            is_connected: record.is_connected,
            last_connected: record.last_connected.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        assert_eq!(Role::from_str("ADMIN"), Some(Role::Admin));
        assert_eq!(Role::from_str("USER"), Some(Role::User));
        assert_eq!(Role::from_str("ROOT"), None);
        assert_eq!(Role::Admin.as_str(), "ADMIN");
    }

    #[test]
    fn test_exchange_serde_names() {
        assert_eq!(serde_json::to_string(&Exchange::NseFx).unwrap(), "\"NSE FX\"");
        let e: Exchange = serde_json::from_str("\"NSE\"").unwrap();
        assert_eq!(e, Exchange::Nse);
    }

    #[test]
    fn test_session_token_empty_is_none() {
        let record = ConnectionRecord {
            id: 1,
            user_id: 1,
            broker_id: 1,
            connection_details: CredentialMap::new(),
            is_connected: true,
            last_connected: None,
            jwt_token: Some(String::new()),
            refresh_token: None,
            feed_token: None,
        };
        assert!(record.session_token().is_none());
    }
}
