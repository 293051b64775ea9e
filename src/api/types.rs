//! REST API request/response types

use crate::brokers::types::OrderRequest;
use crate::db::models::{CredentialMap, Exchange};
use serde::{Deserialize, Serialize};

/// Standard JSON response envelope
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// Empty data payload
#[derive(Debug, Clone, Serialize)]
pub struct Empty {}

impl<T: Serialize> ApiResponse<T> {
    pub fn success_with_data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn success_with_message(message: &str, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.to_string()),
            data: Some(data),
        }
    }
}

impl ApiResponse<Empty> {
    pub fn message_only(message: &str) -> Self {
        Self {
            success: true,
            message: Some(message.to_string()),
            data: None,
        }
    }
}

/// POST /brokers
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBrokerRequest {
    pub name: String,
    pub description: Option<String>,
    pub logo: String,
    pub supported_exchanges: Vec<Exchange>,
    pub connection_fields: Vec<String>,
    pub api_key: String,
    pub api_secret: String,
}

/// PUT /brokers
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditBrokerRequest {
    #[serde(rename = "_id")]
    pub id: i64,
    pub api_url: Option<String>,
    pub logo: Option<String>,
    pub supported_exchanges: Option<Vec<Exchange>>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub connection_fields: Vec<String>,
}

/// POST /user-brokers/connect
///
/// Everything beyond `brokerId` is the dynamic credential map validated
/// against the broker's declared connection fields.
#[derive(Debug, Deserialize)]
pub struct ConnectRequest {
    #[serde(rename = "brokerId")]
    pub broker_id: i64,
    #[serde(flatten)]
    pub fields: CredentialMap,
}

/// POST /user-brokers/connect-callback
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectCallbackRequest {
    pub broker_id: i64,
    pub auth_token: String,
    pub refresh_token: Option<String>,
    pub feed_token: Option<String>,
}

/// POST /user-brokers/disconnect
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectRequest {
    pub broker_id: i64,
}

/// POST /user-brokers/place-order
#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    #[serde(rename = "brokerId")]
    pub broker_id: i64,
    #[serde(flatten)]
    pub order: OrderRequest,
}

/// Optional admin impersonation target, e.g. `?userId=7`
#[derive(Debug, Deserialize)]
pub struct TargetUserQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_request_collects_dynamic_fields() {
        let req: ConnectRequest = serde_json::from_str(
            r#"{"brokerId": 3, "client_id": "A1", "password": "p", "totp": "S"}"#,
        )
        .unwrap();
        assert_eq!(req.broker_id, 3);
        assert_eq!(req.fields.len(), 3);
        assert_eq!(req.fields.get("totp").map(String::as_str), Some("S"));
    }

    #[test]
    fn test_envelope_skips_empty_slots() {
        let json =
            serde_json::to_string(&ApiResponse::message_only("ok")).unwrap();
        assert_eq!(json, r#"{"success":true,"message":"ok"}"#);
    }

    #[test]
    fn test_place_order_flatten() {
        let req: PlaceOrderRequest = serde_json::from_str(
            r#"{
                "brokerId": 1,
                "variety": "NORMAL",
                "tradingsymbol": "SBIN-EQ",
                "symboltoken": "3045",
                "transactiontype": "BUY",
                "exchange": "NSE",
                "ordertype": "MARKET",
                "producttype": "INTRADAY",
                "duration": "DAY",
                "disclosedquantity": "0",
                "quantity": "1"
            }"#,
        )
        .unwrap();
        assert_eq!(req.broker_id, 1);
        assert_eq!(req.order.tradingsymbol, "SBIN-EQ");
        assert_eq!(req.order.quantity, "1");
    }
}
