//! Broker catalog handlers

use crate::api::auth::{require_admin, AuthUser};
use crate::api::types::{ApiResponse, CreateBrokerRequest, EditBrokerRequest};
use crate::db::models::BrokerDefinition;
use crate::db::{BrokerPatch, NewBroker};
use crate::error::Result;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use std::sync::Arc;

pub async fn list_brokers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<BrokerDefinition>>>> {
    let brokers = state.db.list_brokers()?;
    Ok(Json(ApiResponse::success_with_data(brokers)))
}

pub async fn get_broker(
    State(state): State<Arc<AppState>>,
    Path(broker_id): Path<i64>,
) -> Result<Json<ApiResponse<BrokerDefinition>>> {
    let broker = state.db.get_broker(broker_id)?;
    Ok(Json(ApiResponse::success_with_data(broker)))
}

pub async fn create_broker(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(req): Json<CreateBrokerRequest>,
) -> Result<(StatusCode, Json<ApiResponse<BrokerDefinition>>)> {
    require_admin(&user)?;

    let broker = state.db.create_broker(&NewBroker {
        name: req.name,
        description: req.description,
        logo: req.logo,
        supported_exchanges: req.supported_exchanges,
        connection_fields: req.connection_fields,
        api_key: req.api_key,
        api_secret: req.api_secret,
    })?;
    tracing::info!(broker = %broker.slug, "broker created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(
            "Broker created successfully",
            broker,
        )),
    ))
}

pub async fn edit_broker(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(req): Json<EditBrokerRequest>,
) -> Result<Json<ApiResponse<BrokerDefinition>>> {
    require_admin(&user)?;

    let broker = state.db.edit_broker(
        req.id,
        &BrokerPatch {
            api_url: req.api_url,
            logo: req.logo,
            supported_exchanges: req.supported_exchanges,
            api_key: req.api_key,
            api_secret: req.api_secret,
            connection_fields: req.connection_fields,
        },
    )?;
    tracing::info!(broker = %broker.slug, "broker updated");

    Ok(Json(ApiResponse::success_with_message(
        "Broker updated successfully",
        broker,
    )))
}
