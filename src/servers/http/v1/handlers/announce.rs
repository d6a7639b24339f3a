//! Axum handler for the `announce` request.
//!
//! It parses the wire request into the normalized core request, resolves the
//! peer IP, invokes the core tracker and encodes the response in the format
//! the client asked for. The compact format is the modern default; clients
//! that want the dictionary model must send `compact=0`.
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use reef_tracker_clock::clock::Time;
use reef_tracker_primitives::announce_event::AnnounceEvent;
use reef_tracker_primitives::peer::Peer;
use reef_tracker_primitives::{NumberOfBytes, Transport};
use tracing::debug;

use crate::core::statistics::Event;
use crate::core::{AnnounceRequest, Tracker};
use crate::servers::http::v1::extractors::announce_request::ExtractRequest;
use crate::servers::http::v1::extractors::client_ip_sources::Extract as ExtractClientIpSources;
use crate::servers::http::v1::requests::announce::{Announce, Compact, Event as RequestEvent};
use crate::servers::http::v1::responses::{self, announce};
use crate::servers::http::v1::services::peer_ip_resolver;
use crate::CurrentClock;

/// It handles the `announce` request.
pub async fn handle(
    State(tracker): State<Arc<Tracker>>,
    ExtractRequest(announce_request): ExtractRequest,
    ExtractClientIpSources(mut client_ip_sources): ExtractClientIpSources,
) -> Response {
    debug!("http announce request: {:#?}", announce_request);

    client_ip_sources.query_param_ip = announce_request.ip;

    let peer_ip = match peer_ip_resolver::invoke(tracker.is_behind_reverse_proxy(), &client_ip_sources) {
        Ok(peer_ip) => peer_ip,
        Err(error) => {
            return responses::error::Error {
                failure_reason: format!("Error resolving peer IP: {error}"),
            }
            .into_response()
        }
    };

    let peer = peer_from_request(&announce_request, &peer_ip);

    let request = AnnounceRequest {
        info_hash: announce_request.info_hash,
        peer,
        numwant: announce_request.numwant,
        auth_token: announce_request.auth_token.clone(),
    };

    let announce_data = match tracker.announce(request).await {
        Ok(announce_data) => announce_data,
        Err(error) => return responses::error::Error::from(error).into_response(),
    };

    match peer_ip {
        IpAddr::V4(_) => {
            tracker.send_stats_event(Event::Tcp4Announce).await;
        }
        IpAddr::V6(_) => {
            tracker.send_stats_event(Event::Tcp6Announce).await;
        }
    }

    build_response(&announce_request, announce_data)
}

fn build_response(announce_request: &Announce, announce_data: crate::core::AnnounceData) -> Response {
    match &announce_request.compact {
        Some(Compact::NotAccepted) => {
            let mut response = announce::NonCompact::from(announce_data);
            response.tracker_id = announce_request.trackerid.clone();
            response.into_response()
        }
        // Compact is the default.
        _ => {
            let mut response = announce::Compact::from(announce_data);
            response.tracker_id = announce_request.trackerid.clone();
            response.into_response()
        }
    }
}

/// It ignores the peer address in the announce request params; the resolved
/// `peer_ip` wins.
#[must_use]
fn peer_from_request(announce_request: &Announce, peer_ip: &IpAddr) -> Peer {
    Peer {
        peer_id: announce_request.peer_id,
        peer_addr: SocketAddr::new(*peer_ip, announce_request.port),
        updated: CurrentClock::now(),
        uploaded: NumberOfBytes(announce_request.uploaded.unwrap_or(0)),
        downloaded: NumberOfBytes(announce_request.downloaded.unwrap_or(0)),
        left: NumberOfBytes(announce_request.left.unwrap_or(0)),
        event: map_event(&announce_request.event),
        transport: Transport::Http,
        key: announce_request.key,
    }
}

fn map_event(event: &Option<RequestEvent>) -> AnnounceEvent {
    match event {
        Some(RequestEvent::Started) => AnnounceEvent::Started,
        Some(RequestEvent::Stopped) => AnnounceEvent::Stopped,
        Some(RequestEvent::Completed) => AnnounceEvent::Completed,
        Some(RequestEvent::Paused) => AnnounceEvent::Paused,
        None => AnnounceEvent::None,
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use reef_tracker_primitives::announce_event::AnnounceEvent;
    use reef_tracker_primitives::info_hash::InfoHash;
    use reef_tracker_primitives::peer;

    use super::peer_from_request;
    use crate::servers::http::v1::requests::announce::{Announce, Event};

    fn sample_announce_request() -> Announce {
        Announce {
            info_hash: "3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0".parse::<InfoHash>().unwrap(),
            peer_id: "-qB00000000000000001".parse::<peer::Id>().unwrap(),
            port: 17548,
            downloaded: Some(1),
            uploaded: Some(2),
            left: Some(3),
            event: Some(Event::Started),
            compact: None,
            numwant: None,
            trackerid: None,
            key: None,
            auth_token: None,
            ip: None,
        }
    }

    #[test]
    fn the_peer_endpoint_should_combine_the_resolved_ip_and_the_request_port() {
        let peer_ip = IpAddr::V4(Ipv4Addr::new(126, 0, 0, 1));

        let peer = peer_from_request(&sample_announce_request(), &peer_ip);

        assert_eq!(peer.peer_addr.ip(), peer_ip);
        assert_eq!(peer.peer_addr.port(), 17548);
        assert_eq!(peer.event, AnnounceEvent::Started);
    }

    #[test]
    fn missing_counters_should_default_to_zero() {
        let mut request = sample_announce_request();
        request.uploaded = None;
        request.downloaded = None;
        request.left = None;

        let peer = peer_from_request(&request, &IpAddr::V4(Ipv4Addr::new(126, 0, 0, 1)));

        assert_eq!(peer.uploaded.0, 0);
        assert_eq!(peer.downloaded.0, 0);
        assert_eq!(peer.left.0, 0);
    }
}
