//! SCIM create-user proxy
//!
//! Relays one call, `POST /api/create-user`, to the Asgardeo SCIM `Users`
//! endpoint with the server-held bearer token. The upstream status and body
//! are passed back as-is; a non-JSON upstream body is wrapped as `{"raw": ...}`.

use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::config::ProxyConfig;
use crate::idp::helpers::create_http_client;

pub const CREATE_USER_PATH: &str = "/api/create-user";

/// Only thing a caller learns when the relay itself fails
pub const RELAY_FAILURE_DETAIL: &str = "Server error calling Asgardeo SCIM.";

#[derive(Clone)]
pub struct ProxyState {
    pub config: Arc<ProxyConfig>,
    pub client: reqwest::Client,
}

impl ProxyState {
    pub fn new(config: ProxyConfig) -> anyhow::Result<Self> {
        let client = create_http_client(config.http)
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client for SCIM relay: {}", e))?;
        Ok(Self {
            config: Arc::new(config),
            client,
        })
    }
}

pub fn create_router(state: ProxyState) -> anyhow::Result<Router> {
    let cors = cors_layer(&state.config.allowed_origin)?;

    Ok(Router::new()
        .route(CREATE_USER_PATH, post(create_user_handler))
        .route("/healthz", get(|| async { StatusCode::OK }))
        .layer(cors)
        .with_state(state))
}

/// GET/POST/OPTIONS from the single front-end origin, `Content-Type` only
fn cors_layer(allowed_origin: &str) -> anyhow::Result<CorsLayer> {
    let origin = HeaderValue::from_str(allowed_origin)
        .map_err(|e| anyhow::anyhow!("Invalid PROXY_ALLOWED_ORIGIN {:?}: {}", allowed_origin, e))?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]))
}

pub async fn create_user_handler(
    State(state): State<ProxyState>,
    Json(payload): Json<Value>,
) -> Response {
    match forward(&state, &payload).await {
        Ok((status, body)) => {
            tracing::info!(
                event = "scim_create_user_relayed",
                status = status.as_u16(),
                "Relayed SCIM create-user response"
            );
            (status, Json(body)).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Backend /api/create-user error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "detail": RELAY_FAILURE_DETAIL })),
            )
                .into_response()
        }
    }
}

async fn forward(state: &ProxyState, payload: &Value) -> Result<(StatusCode, Value), reqwest::Error> {
    let response = state
        .client
        .post(&state.config.scim_users_url)
        .bearer_auth(state.config.scim_token.expose())
        .json(payload)
        .send()
        .await?;

    let status = response.status();
    let text = response.text().await?;
    Ok((status, relay_body(&text)))
}

/// Parse the upstream body for relaying: empty → `{}`, non-JSON → `{"raw": text}`
pub fn relay_body(text: &str) -> Value {
    if text.is_empty() {
        return json!({});
    }
    serde_json::from_str(text).unwrap_or_else(|_| json!({ "raw": text }))
}
