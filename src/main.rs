use anyhow::Result;
use std::sync::Arc;
use student_id::{config::Config, web, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting student ID portal");

    // Load configuration from environment
    let config = Config::load()?;
    tracing::info!(
        environment = ?config.environment,
        asgardeo_base_url = %config.asgardeo_base_url,
        public_client = config.client_secret.is_none(),
        "Configuration loaded"
    );

    let bind_address = config.bind_address();
    let state = Arc::new(AppState::new(config)?);

    // Prefetch JWKS so /readyz passes immediately; sign-in retries the fetch
    match state.idp.verifier().prefetch_jwks().await {
        Ok(()) => tracing::info!("JWKS prefetched successfully - readiness check will pass"),
        Err(e) => tracing::warn!(
            error = %e,
            "Failed to prefetch JWKS at startup - /readyz reports not ready until a fetch succeeds"
        ),
    }

    let app = web::create_router(state);

    // Bind and serve
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Portal listening on {}", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
