//! The UDP tracker server: one receive loop, one spawned task per datagram.
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tracing::{debug, error, info};

use super::handlers::handle_packet;
use super::{UdpRequest, MAX_PACKET_SIZE};
use crate::core::Tracker;
use crate::servers::udp::protocol::Response;

/// Binds and runs the UDP tracker until ctrl-c.
///
/// Each datagram is handled in its own task with a deadline; a request that
/// blows the deadline is abandoned without a response, which UDP clients
/// treat as packet loss and retry.
///
/// # Errors
///
/// Will return an error if the server cannot bind to the configured
/// address.
pub async fn start(
    bind_address: &str,
    tracker: Arc<Tracker>,
    cookie_lifetime: Duration,
    request_timeout: Duration,
) -> std::io::Result<()> {
    let socket = Arc::new(UdpSocket::bind(bind_address).await?);
    let local_addr = socket.local_addr()?;

    info!("UDP tracker listening on udp://{local_addr}");

    loop {
        let mut buffer = [0; MAX_PACKET_SIZE];

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping UDP tracker on {local_addr} ..");
                break;
            }
            result = socket.recv_from(&mut buffer) => {
                let (valid_bytes, remote_addr) = match result {
                    Ok(received) => received,
                    Err(error) => {
                        error!(%error, "could not receive datagram");
                        continue;
                    }
                };

                let udp_request = UdpRequest {
                    payload: buffer[..valid_bytes].to_vec(),
                    from: remote_addr,
                };

                debug!("received {} bytes from {}", udp_request.payload.len(), remote_addr);

                let tracker = tracker.clone();
                let socket = socket.clone();

                tokio::spawn(async move {
                    let response =
                        tokio::time::timeout(request_timeout, handle_packet(udp_request, &tracker, cookie_lifetime)).await;

                    match response {
                        Ok(response) => send_response(&socket, remote_addr, &response).await,
                        Err(_) => debug!("dropped request from {remote_addr}: deadline expired"),
                    }
                });
            }
        }
    }

    Ok(())
}

async fn send_response(socket: &UdpSocket, remote_addr: SocketAddr, response: &Response) {
    let mut buffer = Vec::with_capacity(MAX_PACKET_SIZE);

    match response.write(&mut buffer) {
        Ok(()) => {
            debug!("sending {} bytes to {} ...", buffer.len(), remote_addr);
            // Whether it arrives is the client's problem.
            drop(socket.send_to(&buffer, remote_addr).await);
        }
        Err(error) => {
            error!(%error, "could not write response to bytes");
        }
    }
}
