use std::net::SocketAddr;

use anyhow::Result;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use common::settings::Settings;
use server::{connect_backend, create_app, shutdown_signal};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Noter");

    let settings = Settings::new()?;
    let backend = connect_backend(&settings).await?;
    let app = create_app(&settings, backend).await?;

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.listen_port()));
    let listener = TcpListener::bind(addr).await?;
    info!("Noter listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Noter stopped");
    Ok(())
}
