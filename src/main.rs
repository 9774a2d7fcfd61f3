use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};

use portrait_studio::{
    config::Config,
    dispatcher::Dispatcher,
    gemini::GeminiClient,
    routes::{router, AppState},
    session::SessionStore,
    styles::PHOTO_STYLES,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Init tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config = Config::from_env();
    match &config.api_key {
        Some(key) => tracing::info!("Using API key: {}...", key.chars().take(4).collect::<String>()),
        None => tracing::warn!("GEMINI_API_KEY is not set; every generation will fail"),
    }
    tracing::info!(model = %config.model, base = %config.api_base, "Gemini client configured");

    let state = AppState {
        store: SessionStore::new(&PHOTO_STYLES),
        dispatcher: Dispatcher::new(Arc::new(GeminiClient::new(&config))),
    };
    let app = router(state, config.max_upload_bytes);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
