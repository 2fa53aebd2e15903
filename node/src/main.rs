use axum::serve;
use std::{net::SocketAddr, sync::Arc};
use storefront_node::{init_tracing, router, AppConfig, AppState};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::from_env()?;
    let state = AppState::open(config.clone()).await?;

    let app = router(Arc::clone(&state));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    info!(
        %local_addr,
        build_id = %config.build_id,
        storage = ?config.storage,
        encrypted = config.storage_passphrase.is_some(),
        remote = config.api_url.as_deref().unwrap_or("none"),
        "starting storefront node service"
    );

    serve(listener, app).await?;
    Ok(())
}
