//! Angel One broker adapter
//!
//! Performs TOTP-based login against the SmartAPI session endpoint and
//! signed calls to the fixed trading endpoints. Every authenticated call
//! carries the five Angel One identity headers plus a bearer session token.

#![allow(non_snake_case)]

use crate::brokers::types::{BrokerSession, OrderRequest, TradingResource};
use crate::brokers::BrokerAdapter;
use crate::db::models::{BrokerDefinition, ConnectionRecord, CredentialMap};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use totp_rs::{Algorithm, Secret, TOTP};

const LOGIN_PATH: &str = "/rest/auth/angelbroking/user/v1/loginByPassword";
const LOGOUT_PATH: &str = "/rest/secure/angelbroking/user/v1/logout";
const PROFILE_PATH: &str = "/rest/secure/angelbroking/user/v1/getProfile";
const RMS_PATH: &str = "/rest/secure/angelbroking/user/v1/getRMS";
const HOLDINGS_PATH: &str = "/rest/secure/angelbroking/portfolio/v1/getAllHolding";
const ORDER_BOOK_PATH: &str = "/rest/secure/angelbroking/order/v1/getOrderBook";
const TRADE_BOOK_PATH: &str = "/rest/secure/angelbroking/order/v1/getTradeBook";
const POSITIONS_PATH: &str = "/rest/secure/angelbroking/order/v1/getPosition";
const PLACE_ORDER_PATH: &str = "/rest/secure/angelbroking/order/v1/placeOrder";

/// Generate the 6-digit, 30-second-window TOTP Angel One expects at login
pub fn generate_totp(secret: &str, time: u64) -> Result<String> {
    let bytes = Secret::Encoded(secret.trim().to_uppercase())
        .to_bytes()
        .map_err(|_| AppError::Validation("Invalid TOTP secret".to_string()))?;
    let totp = TOTP::new_unchecked(Algorithm::SHA1, 6, 1, 30, bytes);
    Ok(totp.generate(time))
}

fn current_totp(secret: &str) -> Result<String> {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_err(|e| AppError::Internal(e.to_string()))?
        .as_secs();
    generate_totp(secret, now)
}

/// Interpret an upstream response body: HTTP-level failures become gateway
/// errors, an explicit `status: false` flag becomes an upstream error with
/// the raw body preserved.
fn evaluate_body(status: StatusCode, body: Value) -> Result<Value> {
    if !status.is_success() {
        return Err(AppError::Gateway {
            message: format!("Angel One returned HTTP {}", status.as_u16()),
            body: Some(body),
        });
    }

    if body.get("status").and_then(Value::as_bool) == Some(false) {
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Angel One rejected the request")
            .to_string();
        return Err(AppError::Upstream {
            message,
            body: Some(body),
        });
    }

    Ok(body)
}

/// Angel One broker implementation
pub struct AngelOneAdapter {
    client: Client,
    base_url: String,
}

impl AngelOneAdapter {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client"),
            base_url,
        }
    }

    fn headers(&self, api_key: &str, auth_token: Option<&str>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert("Content-Type", "application/json".parse().unwrap());
        headers.insert("Accept", "application/json".parse().unwrap());
        headers.insert("X-UserType", "USER".parse().unwrap());
        headers.insert("X-SourceID", "WEB".parse().unwrap());
        headers.insert("X-ClientLocalIP", "127.0.0.1".parse().unwrap());
        headers.insert("X-ClientPublicIP", "127.0.0.1".parse().unwrap());
        headers.insert("X-MACAddress", "00:00:00:00:00:00".parse().unwrap());
        headers.insert(
            "X-PrivateKey",
            HeaderValue::from_str(api_key)
                .map_err(|_| AppError::Validation("Invalid broker API key".to_string()))?,
        );

        if let Some(token) = auth_token {
            headers.insert(
                "Authorization",
                HeaderValue::from_str(&format!("Bearer {}", token))
                    .map_err(|_| AppError::Validation("Invalid session token".to_string()))?,
            );
        }

        Ok(headers)
    }

    /// Session token from the record, rejected locally before any network
    /// call when absent or empty.
    fn session_token<'a>(&self, record: &'a ConnectionRecord) -> Result<&'a str> {
        record
            .session_token()
            .ok_or_else(|| AppError::Authorization("Missing session token".to_string()))
    }

    async fn get(&self, path: &str, api_key: &str, token: &str) -> Result<Value> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .headers(self.headers(api_key, Some(token))?)
            .send()
            .await?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        evaluate_body(status, body)
    }

    async fn post(
        &self,
        path: &str,
        api_key: &str,
        token: Option<&str>,
        payload: &Value,
    ) -> Result<Value> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .headers(self.headers(api_key, token)?)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        evaluate_body(status, body)
    }
}

#[async_trait]
impl BrokerAdapter for AngelOneAdapter {
    fn slug(&self) -> &'static str {
        "ANGEL_ONE"
    }

    async fn connect(
        &self,
        broker: &BrokerDefinition,
        credentials: &CredentialMap,
    ) -> Result<BrokerSession> {
        let client_id = credentials
            .get("client_id")
            .ok_or_else(|| AppError::Validation("Client ID is required".to_string()))?;
        let password = credentials
            .get("password")
            .ok_or_else(|| AppError::Validation("Password is required".to_string()))?;
        let totp_secret = credentials
            .get("totp")
            .ok_or_else(|| AppError::Validation("TOTP secret is required".to_string()))?;

        let otp = current_totp(totp_secret)?;

        #[derive(Serialize)]
        struct LoginRequest<'a> {
            clientcode: &'a str,
            password: &'a str,
            totp: String,
        }

        let request = serde_json::to_value(LoginRequest {
            clientcode: client_id,
            password,
            totp: otp,
        })?;

        tracing::info!("Angel One login attempt for client {}", client_id);

        let body = self
            .post(LOGIN_PATH, &broker.api_key, None, &request)
            .await?;

        #[derive(Deserialize)]
        struct LoginData {
            jwtToken: String,
            refreshToken: Option<String>,
            feedToken: Option<String>,
        }

        let data: LoginData = serde_json::from_value(
            body.get("data")
                .cloned()
                .ok_or_else(|| AppError::Upstream {
                    message: "No data in login response".to_string(),
                    body: Some(body.clone()),
                })?,
        )?;

        Ok(BrokerSession {
            jwt_token: data.jwtToken,
            refresh_token: data.refreshToken,
            feed_token: data.feedToken,
            client_id: Some(client_id.clone()),
        })
    }

    async fn logout(&self, broker: &BrokerDefinition, record: &ConnectionRecord) -> Result<Value> {
        let token = self.session_token(record)?;
        let payload = json!({
            "client_code": record.connection_details.get("client_id"),
        });
        self.post(LOGOUT_PATH, &broker.api_key, Some(token), &payload)
            .await
    }

    async fn fetch(
        &self,
        resource: TradingResource,
        broker: &BrokerDefinition,
        record: &ConnectionRecord,
    ) -> Result<Value> {
        let token = self.session_token(record)?;
        let path = match resource {
            TradingResource::Profile => PROFILE_PATH,
            TradingResource::Holdings => HOLDINGS_PATH,
            TradingResource::OrderBook => ORDER_BOOK_PATH,
            TradingResource::TradeBook => TRADE_BOOK_PATH,
            TradingResource::Positions => POSITIONS_PATH,
            TradingResource::Rms => RMS_PATH,
        };
        self.get(path, &broker.api_key, token).await
    }

    async fn place_order(
        &self,
        broker: &BrokerDefinition,
        record: &ConnectionRecord,
        order: &OrderRequest,
    ) -> Result<Value> {
        let token = self.session_token(record)?;

        let quantity: i64 = order
            .quantity
            .parse()
            .map_err(|_| AppError::Validation("quantity must be a number".to_string()))?;
        let disclosed_quantity: i64 = order.disclosedquantity.parse().map_err(|_| {
            AppError::Validation("disclosedquantity must be a number".to_string())
        })?;

        let payload = json!({
            "exchange": order.exchange,
            "tradingsymbol": order.tradingsymbol,
            "symboltoken": order.symboltoken,
            "quantity": quantity,
            "disclosedquantity": disclosed_quantity,
            "transactiontype": order.transactiontype,
            "ordertype": order.ordertype,
            "variety": order.variety,
            "producttype": order.producttype,
            "duration": order.duration,
        });

        self.post(PLACE_ORDER_PATH, &broker.api_key, Some(token), &payload)
            .await
    }
}
