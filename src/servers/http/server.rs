//! The HTTP tracker server.
//!
//! Binds the listener, serves the `v1` router and shuts down gracefully on
//! ctrl-c.
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::info;

use crate::core::Tracker;
use crate::servers::http::v1::responses::stats::ProtocolToggles;
use crate::servers::http::v1::routes::router;

/// Binds and runs the HTTP tracker until ctrl-c.
///
/// # Errors
///
/// Will return an error if the server cannot bind to the configured address
/// or the listener dies.
pub async fn start(
    bind_address: &str,
    tracker: Arc<Tracker>,
    request_timeout: Duration,
    protocols: ProtocolToggles,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(bind_address).await?;
    let local_addr = listener.local_addr()?;

    info!("HTTP tracker listening on http://{local_addr}");

    let app = router(tracker, request_timeout, protocols);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move {
            let () = tokio::signal::ctrl_c().await.unwrap_or(());
            info!("Stopping HTTP tracker on {local_addr} ..");
        })
        .await
}
