use brokerhub::config::Config;
use brokerhub::state::AppState;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "brokerhub=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    tracing::info!(db = ?config.database_path, "Starting brokerhub");

    let state = Arc::new(AppState::new(config)?);
    brokerhub::api::serve(state).await?;
    Ok(())
}
