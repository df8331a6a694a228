//! PDF toolbox API server

use anyhow::Result;
use std::net::SocketAddr;
use tracing::info;

use pdftools_api::config::Config;
use pdftools_api::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pdftools_api=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    info!("Initializing PDF toolbox API...");
    let config = Config::from_env();
    let port = config.port;
    let app = pdftools_api::app(AppState::new(config));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting PDF toolbox API on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
