//! User-broker connection and trading handlers

use crate::api::auth::AuthUser;
use crate::api::types::{
    ApiResponse, ConnectCallbackRequest, ConnectRequest, DisconnectRequest, PlaceOrderRequest,
    TargetUserQuery,
};
use crate::brokers::types::TradingResource;
use crate::error::Result;
use crate::services::{CallbackTokens, ConnectOutcome, ConnectionService, TradingService, UserBrokerView};
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde_json::Value;
use std::sync::Arc;

pub async fn list_user_brokers(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> Result<Json<ApiResponse<Vec<UserBrokerView>>>> {
    let brokers = ConnectionService::list_user_brokers(&state, user.id)?;
    Ok(Json(ApiResponse::success_with_data(brokers)))
}

pub async fn connect(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(req): Json<ConnectRequest>,
) -> Result<Json<ApiResponse<ConnectOutcome>>> {
    let outcome = ConnectionService::connect(&state, user.id, req.broker_id, req.fields).await?;
    Ok(Json(ApiResponse::success_with_message(
        "Broker connected successfully",
        outcome,
    )))
}

pub async fn connect_callback(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(req): Json<ConnectCallbackRequest>,
) -> Result<Json<ApiResponse<ConnectOutcome>>> {
    let tokens = CallbackTokens {
        auth_token: req.auth_token,
        refresh_token: req.refresh_token,
        feed_token: req.feed_token,
    };
    let outcome =
        ConnectionService::connect_callback(&state, user.id, req.broker_id, tokens).await?;
    Ok(Json(ApiResponse::success_with_message(
        "Broker connected successfully",
        outcome,
    )))
}

pub async fn disconnect(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Query(query): Query<TargetUserQuery>,
    Json(req): Json<DisconnectRequest>,
) -> Result<Json<ApiResponse<Value>>> {
    let body =
        ConnectionService::disconnect(&state, &user, req.broker_id, query.user_id).await?;
    Ok(Json(ApiResponse::success_with_message(
        "Broker disconnected successfully",
        body,
    )))
}

pub async fn place_order(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<Json<ApiResponse<Value>>> {
    let body = TradingService::place_order(&state, &user, req.broker_id, &req.order).await?;
    Ok(Json(ApiResponse::success_with_message(
        "Order placed successfully",
        body,
    )))
}

async fn fetch_resource(
    state: &AppState,
    user: &crate::db::models::User,
    broker_id: i64,
    target: Option<i64>,
    resource: TradingResource,
) -> Result<Json<ApiResponse<Value>>> {
    let body = TradingService::fetch(state, user, broker_id, target, resource).await?;
    Ok(Json(ApiResponse::success_with_data(body)))
}

pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(broker_id): Path<i64>,
    Query(query): Query<TargetUserQuery>,
) -> Result<Json<ApiResponse<Value>>> {
    fetch_resource(&state, &user, broker_id, query.user_id, TradingResource::Profile).await
}

pub async fn get_holdings(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(broker_id): Path<i64>,
    Query(query): Query<TargetUserQuery>,
) -> Result<Json<ApiResponse<Value>>> {
    fetch_resource(&state, &user, broker_id, query.user_id, TradingResource::Holdings).await
}

pub async fn get_order_book(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(broker_id): Path<i64>,
    Query(query): Query<TargetUserQuery>,
) -> Result<Json<ApiResponse<Value>>> {
    fetch_resource(&state, &user, broker_id, query.user_id, TradingResource::OrderBook).await
}

pub async fn get_trade_book(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(broker_id): Path<i64>,
    Query(query): Query<TargetUserQuery>,
) -> Result<Json<ApiResponse<Value>>> {
    fetch_resource(&state, &user, broker_id, query.user_id, TradingResource::TradeBook).await
}

pub async fn get_positions(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(broker_id): Path<i64>,
    Query(query): Query<TargetUserQuery>,
) -> Result<Json<ApiResponse<Value>>> {
    fetch_resource(&state, &user, broker_id, query.user_id, TradingResource::Positions).await
}

pub async fn get_rms(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(broker_id): Path<i64>,
    Query(query): Query<TargetUserQuery>,
) -> Result<Json<ApiResponse<Value>>> {
    fetch_resource(&state, &user, broker_id, query.user_id, TradingResource::Rms).await
}
