use std::net::SocketAddr;
use std::sync::Arc;

use teleblog_backend::{
    config::Config,
    database::{Backend, StoreStatus},
    routes, AppState,
};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Arc::new(Config::from_env()?);
    info!(?config, "configuration loaded");

    let backend = Backend::from_config(&config)?;
    match backend.initialize().await {
        StoreStatus::Ready => info!(data_source = backend.source().as_str(), "store ready"),
        StoreStatus::Failed(reason) => {
            tracing::error!(%reason, "store unavailable, serving in degraded mode")
        }
        StoreStatus::Uninitialized => {}
    }

    let app_state = AppState::new(config.clone(), backend)?;

    if config.telegram_set_webhook {
        let bot = app_state.bot_service.clone();
        let target = config.webhook_url();
        let secret = config.telegram_webhook_secret.clone();
        tokio::spawn(async move {
            info!("Checking Telegram webhook status...");
            if let Err(e) = bot.ensure_webhook(&target, secret.as_deref()).await {
                tracing::warn!("Could not register Telegram webhook: {:?}", e);
            }
        });
    }

    let app = routes::router(app_state);

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
