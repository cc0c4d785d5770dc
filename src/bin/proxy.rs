use anyhow::Result;
use student_id::{
    config::ProxyConfig,
    proxy::{self, ProxyState},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Refuse to start without the SCIM credential; nothing is bound yet
    let config = ProxyConfig::load().inspect_err(|e| tracing::error!("{}", e))?;
    tracing::info!(
        scim_users_url = %config.scim_users_url,
        allowed_origin = %config.allowed_origin,
        "Proxy configuration loaded"
    );

    let bind_address = config.bind_address();
    let app = proxy::create_router(ProxyState::new(config)?)?;

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Proxy listening on {}", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
