//! Business-logic services sitting between the HTTP handlers and the
//! store/adapters.

mod connection_service;
mod trading_service;

pub use connection_service::{CallbackTokens, ConnectOutcome, ConnectionService, UserBrokerView};
pub use trading_service::TradingService;

use crate::db::models::{Role, User};

/// Resolve the user an operation acts on.
///
/// A supplied target user id is honored only for admins; everyone else
/// operates on their own record regardless of what they pass. This is the
/// single authorization rule of the core and is applied at the top of every
/// trading/connection operation.
pub fn effective_user_id(acting: &User, target: Option<i64>) -> i64 {
    match target {
        Some(target_id) if acting.role == Role::Admin => target_id,
        _ => acting.id,
    }
}
