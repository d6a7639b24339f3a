//! Handlers for the UDP server packets.
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use reef_tracker_configuration::MAX_SCRAPE_TORRENTS;
use reef_tracker_located_error::Located;
use tracing::debug;
use uuid::Uuid;

use super::connection_cookie::{self, ConnectionId};
use super::error::Error;
use super::peer_builder;
use super::protocol::{
    AnnounceRequest, AnnounceResponse, ConnectRequest, ConnectResponse, ErrorResponse, Request, Response, ResponsePeer,
    ScrapeRequest, ScrapeResponse, TorrentScrapeStatistics,
};
use super::UdpRequest;
use crate::core::auth::AuthToken;
use crate::core::{statistics, ScrapeData, Tracker};

/// It handles one incoming datagram: parse, dispatch by action, and always
/// produce a response packet. Errors become `error` packets echoing the
/// transaction id (`0` when the packet was too mangled to read one).
pub async fn handle_packet(
    udp_request: UdpRequest,
    tracker: &Arc<Tracker>,
    cookie_lifetime: Duration,
) -> Response {
    debug!("handling request: {udp_request:?}");

    let request_id = Uuid::new_v4();

    match Request::from_bytes(&udp_request.payload, MAX_SCRAPE_TORRENTS) {
        Ok(request) => {
            debug!(%request_id, "parsed request: {request:?}");

            let transaction_id = match &request {
                Request::Connect(connect_request) => connect_request.transaction_id,
                Request::Announce(announce_request) => announce_request.transaction_id,
                Request::Scrape(scrape_request) => scrape_request.transaction_id,
            };

            match handle_request(request, udp_request.from, tracker, cookie_lifetime).await {
                Ok(response) => response,
                Err(error) => handle_error(&error, transaction_id),
            }
        }
        Err(error) => {
            // Malformed packets are common background noise; log them low.
            debug!(%request_id, %error, "bad request");

            handle_error(
                &Error::BadRequest {
                    source: Located(error).into(),
                },
                0,
            )
        }
    }
}

/// It dispatches the request to the correct handler.
///
/// # Errors
///
/// Will return an `Error` when the request cannot be served; the caller
/// encodes it as an `error` packet.
pub async fn handle_request(
    request: Request,
    remote_addr: SocketAddr,
    tracker: &Tracker,
    cookie_lifetime: Duration,
) -> Result<Response, Error> {
    match request {
        Request::Connect(connect_request) => handle_connect(remote_addr, &connect_request, tracker).await,
        Request::Announce(announce_request) => {
            handle_announce(remote_addr, &announce_request, tracker, cookie_lifetime).await
        }
        Request::Scrape(scrape_request) => handle_scrape(remote_addr, &scrape_request, tracker, cookie_lifetime).await,
    }
}

/// It handles the `connect` request: issue a connection id bound to the
/// sender and echo the transaction id.
///
/// # Errors
///
/// This function does not ever return an error.
pub async fn handle_connect(remote_addr: SocketAddr, request: &ConnectRequest, tracker: &Tracker) -> Result<Response, Error> {
    debug!("udp connect request: {:#?}", request);

    let connection_id = connection_cookie::make(&remote_addr);

    let response = ConnectResponse {
        transaction_id: request.transaction_id,
        connection_id: connection_id.0,
    };

    match remote_addr {
        SocketAddr::V4(_) => {
            tracker.send_stats_event(statistics::Event::Udp4Connect).await;
        }
        SocketAddr::V6(_) => {
            tracker.send_stats_event(statistics::Event::Udp6Connect).await;
        }
    }

    Ok(Response::Connect(response))
}

/// It handles the `announce` request.
///
/// # Errors
///
/// Will return an `Error` when the connection id does not verify or the
/// core tracker rejects the announce.
pub async fn handle_announce(
    remote_addr: SocketAddr,
    request: &AnnounceRequest,
    tracker: &Tracker,
    cookie_lifetime: Duration,
) -> Result<Response, Error> {
    debug!("udp announce request: {:#?}", request);

    connection_cookie::check(&remote_addr, ConnectionId(request.connection_id), cookie_lifetime)?;

    let peer = peer_builder::from_request(request, &remote_addr, tracker.is_behind_reverse_proxy());

    let numwant = u32::try_from(request.peers_wanted).ok().map(|wanted| wanted as usize);

    let announce_data = tracker
        .announce(crate::core::AnnounceRequest {
            info_hash: request.info_hash,
            peer,
            numwant,
            auth_token: request.auth_token.clone().map(AuthToken::from),
        })
        .await?;

    match remote_addr.ip() {
        IpAddr::V4(_) => {
            tracker.send_stats_event(statistics::Event::Udp4Announce).await;
        }
        IpAddr::V6(_) => {
            tracker.send_stats_event(statistics::Event::Udp6Announce).await;
        }
    }

    // The response must only carry peers of the sender's address family:
    // the wire records are fixed size per family.
    let peers = announce_data
        .peers
        .iter()
        .filter(|peer| peer.peer_addr.is_ipv4() == remote_addr.is_ipv4())
        .map(|peer| ResponsePeer {
            ip_address: peer.peer_addr.ip(),
            port: peer.peer_addr.port(),
        })
        .collect();

    #[allow(clippy::cast_possible_wrap)]
    let response = AnnounceResponse {
        transaction_id: request.transaction_id,
        announce_interval: announce_data.policy.interval as i32,
        leechers: announce_data.stats.leechers as i32,
        seeders: announce_data.stats.seeders as i32,
        peers,
    };

    debug!("udp announce response: {:#?}", response);

    Ok(Response::Announce(response))
}

/// It handles the `scrape` request.
///
/// # Errors
///
/// Will return an `Error` when the connection id does not verify or the
/// core tracker rejects the scrape.
pub async fn handle_scrape(
    remote_addr: SocketAddr,
    request: &ScrapeRequest,
    tracker: &Tracker,
    cookie_lifetime: Duration,
) -> Result<Response, Error> {
    debug!("udp scrape request: {:#?}", request);

    connection_cookie::check(&remote_addr, ConnectionId(request.connection_id), cookie_lifetime)?;

    let scrape_data: ScrapeData = tracker
        .scrape(crate::core::ScrapeRequest {
            info_hashes: request.info_hashes.clone(),
            auth_token: None,
        })
        .await?;

    // The response order must match the request order; the files map is
    // keyed, so walk the request hashes.
    #[allow(clippy::cast_possible_wrap)]
    let torrent_stats: Vec<TorrentScrapeStatistics> = request
        .info_hashes
        .iter()
        .map(|info_hash| {
            let metadata = scrape_data.files.get(info_hash).copied().unwrap_or_default();
            TorrentScrapeStatistics {
                seeders: metadata.seeders as i32,
                completed: metadata.completed as i32,
                leechers: metadata.leechers as i32,
            }
        })
        .collect();

    match remote_addr {
        SocketAddr::V4(_) => {
            tracker.send_stats_event(statistics::Event::Udp4Scrape).await;
        }
        SocketAddr::V6(_) => {
            tracker.send_stats_event(statistics::Event::Udp6Scrape).await;
        }
    }

    Ok(Response::Scrape(ScrapeResponse {
        transaction_id: request.transaction_id,
        torrent_stats,
    }))
}

fn handle_error(error: &Error, transaction_id: i32) -> Response {
    Response::Error(ErrorResponse {
        transaction_id,
        message: error.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
    use std::time::Duration;

    use reef_tracker_primitives::announce_event::AnnounceEvent;
    use reef_tracker_primitives::info_hash::InfoHash;
    use reef_tracker_primitives::peer;

    use super::{handle_connect, handle_packet, handle_request};
    use crate::core::test_helpers::public_tracker;
    use crate::servers::udp::protocol::{
        AnnounceRequest, ConnectRequest, Request, Response, ScrapeRequest,
    };
    use crate::servers::udp::UdpRequest;
    use crate::CurrentClock;

    const COOKIE_LIFETIME: Duration = Duration::from_secs(120);

    fn sample_ipv4_remote_addr() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(126, 0, 0, 1)), 8080)
    }

    fn sample_ipv6_remote_addr() -> SocketAddr {
        SocketAddr::new(IpAddr::V6(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1)), 8080)
    }

    fn sample_announce(connection_id: i64, remote: u8) -> AnnounceRequest {
        let mut peer_id = *b"-qB00000000000000000";
        peer_id[19] = remote;

        AnnounceRequest {
            connection_id,
            transaction_id: 77,
            info_hash: InfoHash([0xAA; 20]),
            peer_id: peer::Id(peer_id),
            downloaded: 0,
            left: 1_048_576,
            uploaded: 0,
            event: AnnounceEvent::Started,
            ip_address: None,
            key: 81,
            peers_wanted: -1,
            port: 6881,
            auth_token: None,
        }
    }

    async fn connect(remote_addr: SocketAddr, tracker: &std::sync::Arc<crate::core::Tracker>) -> i64 {
        let response = handle_connect(remote_addr, &ConnectRequest { transaction_id: 1 }, tracker)
            .await
            .unwrap();

        match response {
            Response::Connect(connect) => connect.connection_id,
            other => panic!("expected a connect response, got {other:?}"),
        }
    }

    mod connect_request {
        use super::{handle_connect, sample_ipv4_remote_addr, ConnectRequest, Response};
        use crate::core::test_helpers::public_tracker;

        #[tokio::test]
        async fn a_connect_response_should_echo_the_transaction_id() {
            let setup = public_tracker();

            let response = handle_connect(
                sample_ipv4_remote_addr(),
                &ConnectRequest { transaction_id: 42 },
                &setup.tracker,
            )
            .await
            .unwrap();

            match response {
                Response::Connect(connect) => assert_eq!(connect.transaction_id, 42),
                other => panic!("expected a connect response, got {other:?}"),
            }
        }
    }

    mod announce_request {
        use reef_tracker_clock::clock::stopped::Stopped as _;

        use super::{
            connect, handle_request, sample_announce, sample_ipv4_remote_addr, sample_ipv6_remote_addr, CurrentClock,
            Duration, Request, Response, COOKIE_LIFETIME,
        };
        use crate::core::test_helpers::public_tracker;

        #[tokio::test]
        async fn an_announce_with_a_valid_connection_id_should_be_served() {
            CurrentClock::local_set(&Duration::from_secs(1_000_000));
            let setup = public_tracker();

            let connection_id = connect(sample_ipv4_remote_addr(), &setup.tracker).await;

            let response = handle_request(
                Request::Announce(sample_announce(connection_id, 1)),
                sample_ipv4_remote_addr(),
                &setup.tracker,
                COOKIE_LIFETIME,
            )
            .await
            .unwrap();

            match response {
                Response::Announce(announce) => {
                    assert_eq!(announce.transaction_id, 77);
                    assert_eq!(announce.leechers, 1);
                    assert_eq!(announce.seeders, 0);
                    assert!(announce.peers.is_empty());
                }
                other => panic!("expected an announce response, got {other:?}"),
            }
        }

        #[tokio::test]
        async fn an_announce_with_a_bogus_connection_id_should_get_an_error_packet() {
            CurrentClock::local_set(&Duration::from_secs(1_000_000));
            let setup = public_tracker();

            let result = handle_request(
                Request::Announce(sample_announce(0x0BAD_0BAD_0BAD_0BAD, 1)),
                sample_ipv4_remote_addr(),
                &setup.tracker,
                COOKIE_LIFETIME,
            )
            .await;

            assert!(result.is_err());
        }

        #[tokio::test]
        async fn an_announce_with_an_expired_connection_id_should_get_an_error_packet() {
            CurrentClock::local_set(&Duration::from_secs(1_000_000));
            let setup = public_tracker();

            let connection_id = connect(sample_ipv4_remote_addr(), &setup.tracker).await;

            CurrentClock::local_add(&Duration::from_secs(121)).unwrap();

            let result = handle_request(
                Request::Announce(sample_announce(connection_id, 1)),
                sample_ipv4_remote_addr(),
                &setup.tracker,
                COOKIE_LIFETIME,
            )
            .await;

            assert!(result.is_err());
        }

        #[tokio::test]
        async fn an_ipv4_response_should_only_carry_ipv4_peers() {
            CurrentClock::local_set(&Duration::from_secs(1_000_000));
            let setup = public_tracker();

            // One peer over IPv6.
            let connection_id = connect(sample_ipv6_remote_addr(), &setup.tracker).await;
            handle_request(
                Request::Announce(sample_announce(connection_id, 1)),
                sample_ipv6_remote_addr(),
                &setup.tracker,
                COOKIE_LIFETIME,
            )
            .await
            .unwrap();

            // Another peer over IPv4 asks for peers.
            let connection_id = connect(sample_ipv4_remote_addr(), &setup.tracker).await;
            let response = handle_request(
                Request::Announce(sample_announce(connection_id, 2)),
                sample_ipv4_remote_addr(),
                &setup.tracker,
                COOKIE_LIFETIME,
            )
            .await
            .unwrap();

            match response {
                Response::Announce(announce) => {
                    assert_eq!(announce.leechers, 2);
                    assert!(announce.peers.is_empty());
                }
                other => panic!("expected an announce response, got {other:?}"),
            }
        }
    }

    mod scrape_request {
        use reef_tracker_clock::clock::stopped::Stopped as _;
        use reef_tracker_primitives::info_hash::InfoHash;

        use super::{
            connect, handle_request, sample_announce, sample_ipv4_remote_addr, CurrentClock, Duration, Request, Response,
            ScrapeRequest, COOKIE_LIFETIME,
        };
        use crate::core::test_helpers::public_tracker;

        #[tokio::test]
        async fn a_scrape_should_report_the_swarm_statistics_in_request_order() {
            CurrentClock::local_set(&Duration::from_secs(1_000_000));
            let setup = public_tracker();

            let connection_id = connect(sample_ipv4_remote_addr(), &setup.tracker).await;
            handle_request(
                Request::Announce(sample_announce(connection_id, 1)),
                sample_ipv4_remote_addr(),
                &setup.tracker,
                COOKIE_LIFETIME,
            )
            .await
            .unwrap();

            let response = handle_request(
                Request::Scrape(ScrapeRequest {
                    connection_id,
                    transaction_id: 13,
                    info_hashes: vec![InfoHash([0xBB; 20]), InfoHash([0xAA; 20])],
                }),
                sample_ipv4_remote_addr(),
                &setup.tracker,
                COOKIE_LIFETIME,
            )
            .await
            .unwrap();

            match response {
                Response::Scrape(scrape) => {
                    assert_eq!(scrape.transaction_id, 13);
                    assert_eq!(scrape.torrent_stats.len(), 2);
                    // Unknown torrent first, announced torrent second.
                    assert_eq!(scrape.torrent_stats[0].leechers, 0);
                    assert_eq!(scrape.torrent_stats[1].leechers, 1);
                }
                other => panic!("expected a scrape response, got {other:?}"),
            }
        }
    }

    mod bad_packets {
        use super::{handle_packet, sample_ipv4_remote_addr, Response, UdpRequest, COOKIE_LIFETIME};
        use crate::core::test_helpers::public_tracker;

        #[tokio::test]
        async fn a_malformed_packet_should_get_an_error_response_with_transaction_id_zero() {
            let setup = public_tracker();

            let response = handle_packet(
                UdpRequest {
                    payload: vec![1, 2, 3],
                    from: sample_ipv4_remote_addr(),
                },
                &setup.tracker,
                COOKIE_LIFETIME,
            )
            .await;

            match response {
                Response::Error(error) => assert_eq!(error.transaction_id, 0),
                other => panic!("expected an error response, got {other:?}"),
            }
        }
    }
}
