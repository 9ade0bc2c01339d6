use std::{future::Future, net::SocketAddr};

use {
    anyhow::Context,
    axum::{
        Router,
        routing::{get, post},
    },
    satele_channels::{BridgeStatus, SessionSlot},
    tokio::net::TcpListener,
    tower_http::trace::TraceLayer,
    tracing::info,
};

use crate::routes;

/// Shared handles read by the handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub slot: SessionSlot,
    pub status: BridgeStatus,
}

impl GatewayState {
    pub fn new(slot: SessionSlot, status: BridgeStatus) -> Self {
        Self { slot, status }
    }
}

/// Build the gateway router (shared between production startup and tests).
pub fn build_gateway_app(state: GatewayState) -> Router {
    Router::new()
        .route("/send", post(routes::send_text))
        .route("/send-media", post(routes::send_media))
        .route("/status", get(routes::status))
        .route("/health", get(routes::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the gateway listener. Done before anything else starts so that a
/// taken port fails startup.
pub async fn bind_gateway(bind: &str, port: u16) -> anyhow::Result<TcpListener> {
    let addr: SocketAddr = format!("{bind}:{port}")
        .parse()
        .with_context(|| format!("invalid gateway address {bind}:{port}"))?;
    TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind gateway on {addr}"))
}

/// Serve the gateway on `listener` until `shutdown` resolves.
pub async fn start_gateway(
    listener: TcpListener,
    state: GatewayState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    info!(%addr, "WhatsApp send API listening");

    axum::serve(listener, build_gateway_app(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
