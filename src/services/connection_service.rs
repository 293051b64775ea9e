//! Connection lifecycle orchestration
//!
//! Validates submitted credentials against the broker's declared field
//! schema, dispatches to the adapter registry by slug, and owns the
//! persistence of connection records. Connect and disconnect are serialized
//! per (user, broker) pair.

use crate::brokers::types::TradingResource;
use crate::db::models::{BrokerDefinition, ConnectionSummary, CredentialMap, User};
use crate::db::ConnectionUpsert;
use crate::error::{AppError, Result};
use crate::services::effective_user_id;
use crate::state::AppState;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

/// Result of a successful connect
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectOutcome {
    pub broker: String,
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// Courtesy profile snapshot; absent when the post-connect fetch failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<Value>,
    /// Set when the connection committed but the profile fetch failed
    pub degraded: bool,
}

/// Catalog entry annotated with the caller's connection state
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserBrokerView {
    #[serde(flatten)]
    pub broker: BrokerDefinition,
    pub is_connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_broker: Option<ConnectionSummary>,
}

/// Tokens obtained through an external login flow (connect-callback)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackTokens {
    pub auth_token: String,
    pub refresh_token: Option<String>,
    pub feed_token: Option<String>,
}

/// Connection lifecycle service
pub struct ConnectionService;

impl ConnectionService {
    /// Connect a user to a broker by exchanging submitted credentials for a
    /// session.
    ///
    /// Required-field validation happens before any adapter dispatch, so a
    /// request missing fields never reaches the network.
    pub async fn connect(
        state: &AppState,
        user_id: i64,
        broker_id: i64,
        fields: CredentialMap,
    ) -> Result<ConnectOutcome> {
        let broker = state.db.get_broker(broker_id)?;

        let missing: Vec<String> = broker
            .connection_fields
            .iter()
            .filter(|field| !fields.contains_key(*field))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(AppError::MissingFields(missing));
        }

        let adapter = state.brokers.resolve(&broker.slug)?;

        let lock = state.connection_lock(user_id, broker_id);
        let _guard = lock.lock().await;

        let session = adapter.connect(&broker, &fields).await?;

        let record = state.db.upsert_connection(
            user_id,
            broker_id,
            &ConnectionUpsert {
                connection_details: Some(fields),
                jwt_token: session.jwt_token.clone(),
                refresh_token: session.refresh_token.clone(),
                feed_token: session.feed_token.clone(),
            },
        )?;

        info!("User {} connected to {}", user_id, broker.slug);

        // Courtesy profile fetch. The connection is already committed; a
        // failure here surfaces as a degraded success, never a rollback.
        let profile = match adapter
            .fetch(TradingResource::Profile, &broker, &record)
            .await
        {
            Ok(profile) => Some(profile),
            Err(e) => {
                warn!("Profile fetch after connect failed: {}", e);
                None
            }
        };

        Ok(ConnectOutcome {
            broker: broker.name,
            connected: true,
            client_id: session.client_id,
            degraded: profile.is_none(),
            profile,
        })
    }

    /// Store tokens obtained through an external login flow for a
    /// (user, broker) pair.
    pub async fn connect_callback(
        state: &AppState,
        user_id: i64,
        broker_id: i64,
        tokens: CallbackTokens,
    ) -> Result<ConnectOutcome> {
        let broker = state.db.get_broker(broker_id)?;

        let lock = state.connection_lock(user_id, broker_id);
        let _guard = lock.lock().await;

        state.db.upsert_connection(
            user_id,
            broker_id,
            &ConnectionUpsert {
                connection_details: None,
                jwt_token: tokens.auth_token,
                refresh_token: tokens.refresh_token,
                feed_token: tokens.feed_token,
            },
        )?;

        info!("Stored callback tokens for user {} on {}", user_id, broker.slug);

        Ok(ConnectOutcome {
            broker: broker.name,
            connected: true,
            client_id: None,
            profile: None,
            degraded: false,
        })
    }

    /// Disconnect the effective user from a broker.
    ///
    /// For brokers with a remote logout step, the upstream call must
    /// succeed before local state is flipped.
    pub async fn disconnect(
        state: &AppState,
        acting: &User,
        broker_id: i64,
        target_user_id: Option<i64>,
    ) -> Result<Value> {
        let user_id = effective_user_id(acting, target_user_id);
        let broker = state.db.get_broker(broker_id)?;

        let lock = state.connection_lock(user_id, broker_id);
        let _guard = lock.lock().await;

        let record = state
            .db
            .find_connection(user_id, broker_id)?
            .filter(|record| record.is_connected)
            .ok_or_else(|| {
                AppError::NotConnected(
                    "User-broker connection not established or expired".to_string(),
                )
            })?;

        let adapter = state.brokers.resolve(&broker.slug)?;
        let response = adapter.logout(&broker, &record).await?;

        state.db.mark_disconnected(user_id, broker_id)?;
        info!("User {} disconnected from {}", user_id, broker.slug);

        Ok(response)
    }

    /// List the catalog annotated with the caller's connection state
    pub fn list_user_brokers(state: &AppState, user_id: i64) -> Result<Vec<UserBrokerView>> {
        let brokers = state.db.list_brokers()?;
        let connections = state.db.list_connections(user_id)?;

        Ok(brokers
            .into_iter()
            .map(|broker| {
                let record = connections
                    .iter()
                    .find(|record| record.broker_id == broker.id);
                UserBrokerView {
                    is_connected: record.map(|r| r.is_connected).unwrap_or(false),
                    user_broker: record.map(ConnectionSummary::from),
                    broker,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brokers::angel::AngelOneAdapter;
    use crate::brokers::BrokerRegistry;
    use crate::config::Config;
    use crate::db::models::{Exchange, Role};
    use crate::db::NewBroker;
    use std::sync::Arc;

    // Base32 TOTP secret accepted by the adapter
    const TOTP_SECRET: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

    fn test_state() -> AppState {
        AppState::new_for_testing(Config::default(), BrokerRegistry::empty())
    }

    /// Minimal Angel One stand-in: login always succeeds, the profile
    /// endpoint reports success or a `status: false` failure.
    async fn spawn_angel_stub(profile_ok: bool) -> String {
        use axum::routing::{get, post};

        let login = post(|| async {
            axum::Json(serde_json::json!({
                "status": true,
                "data": {
                    "jwtToken": "jwt-stub",
                    "refreshToken": "refresh-stub",
                    "feedToken": "feed-stub"
                }
            }))
        });
        let profile = get(move || async move {
            if profile_ok {
                axum::Json(serde_json::json!({"status": true, "data": {"name": "Asha"}}))
            } else {
                axum::Json(serde_json::json!({"status": false, "message": "profile unavailable"}))
            }
        });

        let app = axum::Router::new()
            .route("/rest/auth/angelbroking/user/v1/loginByPassword", login)
            .route("/rest/secure/angelbroking/user/v1/getProfile", profile);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn stub_state(base_url: String) -> AppState {
        let config = Config {
            angel_api_url: base_url.clone(),
            ..Config::default()
        };
        let mut registry = BrokerRegistry::empty();
        registry.register(Arc::new(AngelOneAdapter::new(base_url)));
        AppState::new_for_testing(config, registry)
    }

    fn seed_broker(state: &AppState) -> i64 {
        state
            .db
            .create_broker(&NewBroker {
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
            })
            .unwrap()
            .id
    }

    fn seed_user(state: &AppState, role: Role, token: &str) -> User {
        state
            .db
            .create_user(&format!("{}@x.io", token), token, role, token)
            .unwrap()
    }

    fn fields(pairs: &[(&str, &str)]) -> CredentialMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_connect_unknown_broker() {
        let state = test_state();
        let err = ConnectionService::connect(&state, 1, 42, CredentialMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_connect_missing_fields_listed_before_dispatch() {
        let state = test_state();
        let broker_id = seed_broker(&state);

        // Registry is empty; missing-field validation must fire before any
        // adapter lookup, so we get MissingFields, not UnsupportedBroker.
        let err = ConnectionService::connect(
            &state,
            1,
            broker_id,
            fields(&[("client_id", "A1"), ("password", "p")]),
        )
        .await
        .unwrap_err();

        match err {
            AppError::MissingFields(missing) => assert_eq!(missing, vec!["totp".to_string()]),
            other => panic!("expected MissingFields, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connect_unsupported_broker() {
        let state = test_state();
        let broker_id = seed_broker(&state);

        let err = ConnectionService::connect(
            &state,
            1,
            broker_id,
            fields(&[("client_id", "A1"), ("password", "p"), ("totp", "SECRET")]),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::UnsupportedBroker(_)));
    }

    #[tokio::test]
    async fn test_connect_callback_upserts_tokens() {
        let state = test_state();
        let broker_id = seed_broker(&state);
        let user = seed_user(&state, Role::User, "tok-u");

        let outcome = ConnectionService::connect_callback(
            &state,
            user.id,
            broker_id,
            CallbackTokens {
                auth_token: "jwt-cb".to_string(),
                refresh_token: Some("refresh-cb".to_string()),
                feed_token: None,
            },
        )
        .await
        .unwrap();
        assert!(outcome.connected);

        let record = state.db.find_connection(user.id, broker_id).unwrap().unwrap();
        assert!(record.is_connected);
        assert_eq!(record.jwt_token.as_deref(), Some("jwt-cb"));
    }

    #[tokio::test]
    async fn test_connect_returns_session_and_profile() {
        let state = stub_state(spawn_angel_stub(true).await);
        let broker_id = seed_broker(&state);
        let user = seed_user(&state, Role::User, "tok-u");

        let outcome = ConnectionService::connect(
            &state,
            user.id,
            broker_id,
            fields(&[("client_id", "A1"), ("password", "p"), ("totp", TOTP_SECRET)]),
        )
        .await
        .unwrap();

        assert!(outcome.connected);
        assert!(!outcome.degraded);
        assert!(outcome.profile.is_some());
        assert_eq!(outcome.client_id.as_deref(), Some("A1"));

        let record = state.db.find_connection(user.id, broker_id).unwrap().unwrap();
        assert!(record.is_connected);
        assert_eq!(record.jwt_token.as_deref(), Some("jwt-stub"));
        assert_eq!(record.refresh_token.as_deref(), Some("refresh-stub"));
    }

    #[tokio::test]
    async fn test_profile_failure_degrades_without_rollback() {
        let state = stub_state(spawn_angel_stub(false).await);
        let broker_id = seed_broker(&state);
        let user = seed_user(&state, Role::User, "tok-u");

        let outcome = ConnectionService::connect(
            &state,
            user.id,
            broker_id,
            fields(&[("client_id", "A1"), ("password", "p"), ("totp", TOTP_SECRET)]),
        )
        .await
        .unwrap();

        // Degraded success: the connection committed, the profile did not
        assert!(outcome.connected);
        assert!(outcome.degraded);
        assert!(outcome.profile.is_none());

        let record = state.db.find_connection(user.id, broker_id).unwrap().unwrap();
        assert!(record.is_connected);
        assert_eq!(record.jwt_token.as_deref(), Some("jwt-stub"));
    }

    #[tokio::test]
    async fn test_disconnect_requires_connected_record() {
        let state = test_state();
        let broker_id = seed_broker(&state);
        let acting = seed_user(&state, Role::User, "tok-u");

        let err = ConnectionService::disconnect(&state, &acting, broker_id, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotConnected(_)));
    }

    #[tokio::test]
    async fn test_disconnect_failure_leaves_record_connected() {
        let state = test_state();
        let broker_id = seed_broker(&state);
        let acting = seed_user(&state, Role::User, "tok-u");

        ConnectionService::connect_callback(
            &state,
            acting.id,
            broker_id,
            CallbackTokens {
                auth_token: "jwt".to_string(),
                refresh_token: None,
                feed_token: None,
            },
        )
        .await
        .unwrap();

        // No adapter registered: the remote logout step cannot run, and the
        // local flag must not flip.
        let err = ConnectionService::disconnect(&state, &acting, broker_id, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnsupportedBroker(_)));

        let record = state
            .db
            .find_connection(acting.id, broker_id)
            .unwrap()
            .unwrap();
        assert!(record.is_connected);
    }

    #[tokio::test]
    async fn test_list_user_brokers_annotation() {
        let state = test_state();
        let broker_id = seed_broker(&state);
        let user = seed_user(&state, Role::User, "tok-u");

        let views = ConnectionService::list_user_brokers(&state, user.id).unwrap();
        assert_eq!(views.len(), 1);
        assert!(!views[0].is_connected);
        assert!(views[0].user_broker.is_none());

        ConnectionService::connect_callback(
            &state,
            user.id,
            broker_id,
            CallbackTokens {
                auth_token: "jwt".to_string(),
                refresh_token: None,
                feed_token: None,
            },
        )
        .await
        .unwrap();

        let views = ConnectionService::list_user_brokers(&state, user.id).unwrap();
        assert!(views[0].is_connected);
        assert!(views[0].user_broker.as_ref().unwrap().is_connected);
    }
}
