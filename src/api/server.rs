//! HTTP server wiring: routes, middleware layers, graceful shutdown

use crate::api::types::{ApiResponse, Empty};
use crate::api::{auth, brokers, user_brokers};
use crate::error::Result;
use crate::state::AppState;
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub fn build_router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route(
            "/brokers",
            get(brokers::list_brokers)
                .post(brokers::create_broker)
                .put(brokers::edit_broker),
        )
        .route("/brokers/:broker_id", get(brokers::get_broker))
        .route("/user-brokers", get(user_brokers::list_user_brokers))
        .route("/user-brokers/connect", post(user_brokers::connect))
        .route(
            "/user-brokers/connect-callback",
            post(user_brokers::connect_callback),
        )
        .route("/user-brokers/disconnect", post(user_brokers::disconnect))
        .route("/user-brokers/place-order", post(user_brokers::place_order))
        .route("/user-brokers/:broker_id/profile", get(user_brokers::get_profile))
        .route("/user-brokers/:broker_id/holdings", get(user_brokers::get_holdings))
        .route(
            "/user-brokers/:broker_id/order-book",
            get(user_brokers::get_order_book),
        )
        .route(
            "/user-brokers/:broker_id/trade-book",
            get(user_brokers::get_trade_book),
        )
        .route(
            "/user-brokers/:broker_id/positions",
            get(user_brokers::get_positions),
        )
        .route("/user-brokers/:broker_id/rms", get(user_brokers::get_rms))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(protected)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> Json<ApiResponse<Empty>> {
    Json(ApiResponse::message_only("brokerhub is running"))
}

/// Bind and serve until interrupted.
pub async fn serve(state: Arc<AppState>) -> Result<()> {
    let addr = format!("{}:{}", state.config.host, state.config.port);
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
