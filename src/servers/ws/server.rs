//! The WebSocket tracker server.
//!
//! Serves `GET /announce` with an HTTP Upgrade to WebSocket; everything
//! after the upgrade is the JSON message protocol from
//! [`protocol`](crate::servers::ws::protocol).
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::connect_info::ConnectInfo;
use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use super::handlers::handle_socket;
use super::registry::Registry;
use crate::core::Tracker;

#[derive(Clone)]
struct WsState {
    tracker: Arc<Tracker>,
    registry: Arc<Registry>,
    idle_timeout: Duration,
}

/// Binds and runs the WebSocket tracker until ctrl-c.
///
/// # Errors
///
/// Will return an error if the server cannot bind to the configured address
/// or the listener dies.
pub async fn start(
    bind_address: &str,
    tracker: Arc<Tracker>,
    registry: Arc<Registry>,
    idle_timeout: Duration,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(bind_address).await?;
    let local_addr = listener.local_addr()?;

    info!("WebSocket tracker listening on ws://{local_addr}/announce");

    let state = WsState {
        tracker,
        registry,
        idle_timeout,
    };

    let app = Router::new().route("/announce", get(upgrade)).with_state(state);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move {
            let () = tokio::signal::ctrl_c().await.unwrap_or(());
            info!("Stopping WebSocket tracker on {local_addr} ..");
        })
        .await
}

async fn upgrade(
    ws: WebSocketUpgrade,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
    State(state): State<WsState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, remote_addr, state.tracker, state.registry, state.idle_timeout))
}
