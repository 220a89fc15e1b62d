use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::info;

use server::config::ServerConfig;
use server::{create_app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let _ = dotenv::dotenv();

    info!("Starting cover/segment server...");

    let config = ServerConfig::from_env();
    info!(
        "Server configuration loaded: port={}, request_timeout={}s, hub_space={:?}",
        config.port, config.request_timeout_secs, config.fonts.space_id
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    let app = create_app(AppState::new(config));

    let listener = TcpListener::bind(addr).await.map_err(|e| {
        anyhow::anyhow!("Failed to bind {addr}: {e}. Try a different PORT.")
    })?;

    info!("Server listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
