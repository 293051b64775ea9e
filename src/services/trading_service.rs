//! Trading operation dispatch
//!
//! Every downstream trading call goes through here: resolve the effective
//! user, require a live connection with a session token, then dispatch to
//! the adapter registered for the broker's slug.

use crate::brokers::types::{OrderRequest, TradingResource};
use crate::db::models::{ConnectionRecord, User};
use crate::error::{AppError, Result};
use crate::services::effective_user_id;
use crate::state::AppState;
use serde_json::Value;
use tracing::info;

/// Trading operation service
pub struct TradingService;

impl TradingService {
    /// Fetch a read-only trading resource through the broker adapter
    pub async fn fetch(
        state: &AppState,
        acting: &User,
        broker_id: i64,
        target_user_id: Option<i64>,
        resource: TradingResource,
    ) -> Result<Value> {
        let user_id = effective_user_id(acting, target_user_id);
        let broker = state.db.get_broker(broker_id)?;
        let record = Self::require_connected(state, user_id, broker_id)?;

        info!(
            "Fetching {} for user {} via {}",
            resource.as_str(),
            user_id,
            broker.slug
        );

        let adapter = state.brokers.resolve(&broker.slug)?;
        adapter.fetch(resource, &broker, &record).await
    }

    /// Place an order through the broker adapter. Orders are always placed
    /// against the caller's own connection.
    pub async fn place_order(
        state: &AppState,
        acting: &User,
        broker_id: i64,
        order: &OrderRequest,
    ) -> Result<Value> {
        let broker = state.db.get_broker(broker_id)?;
        let record = Self::require_connected(state, acting.id, broker_id)?;

        info!("Placing order for user {} via {}", acting.id, broker.slug);

        let adapter = state.brokers.resolve(&broker.slug)?;
        adapter.place_order(&broker, &record, order).await
    }

    /// Load the connection record and enforce the connected-with-token
    /// precondition before any network call.
    fn require_connected(
        state: &AppState,
        user_id: i64,
        broker_id: i64,
    ) -> Result<ConnectionRecord> {
        let record = state
            .db
            .find_connection(user_id, broker_id)?
            .filter(|record| record.is_connected)
            .ok_or_else(|| {
                AppError::NotConnected(
                    "User-broker connection not established or expired".to_string(),
                )
            })?;

        // connected=true implies a token, but stale upstream data may
        // violate that; reject locally rather than failing remotely.
        if record.session_token().is_none() {
            return Err(AppError::Authorization("Missing session token".to_string()));
        }

        Ok(record)
    }
}
