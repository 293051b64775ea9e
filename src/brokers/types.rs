//! Common broker types

use serde::{Deserialize, Serialize};

/// Session issued by an upstream broker after a successful login
#[derive(Debug, Clone)]
pub struct BrokerSession {
    pub jwt_token: String,
    pub refresh_token: Option<String>,
    pub feed_token: Option<String>,
    /// Broker-side client identifier, when the broker reports one
    pub client_id: Option<String>,
}

/// Order request forwarded to the upstream broker.
///
/// Field names follow the Angel One wire format; quantities arrive as
/// strings and are coerced to numbers at the adapter boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub variety: String,
    pub tradingsymbol: String,
    pub symboltoken: String,
    pub transactiontype: String,
    pub exchange: String,
    pub ordertype: String,
    pub producttype: String,
    pub duration: String,
    pub disclosedquantity: String,
    pub quantity: String,
}

/// Read-only trading resources exposed through the adapters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradingResource {
    Profile,
    Holdings,
    OrderBook,
    TradeBook,
    Positions,
    Rms,
}

impl TradingResource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradingResource::Profile => "profile",
            TradingResource::Holdings => "holdings",
            TradingResource::OrderBook => "order-book",
            TradingResource::TradeBook => "trade-book",
            TradingResource::Positions => "positions",
            TradingResource::Rms => "rms",
        }
    }
}
