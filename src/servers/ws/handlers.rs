//! Message handling for one WebSocket connection.
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::StreamExt;
use futures_util::SinkExt;
use reef_tracker_clock::clock::Time;
use reef_tracker_primitives::announce_event::AnnounceEvent;
use reef_tracker_primitives::info_hash::InfoHash;
use reef_tracker_primitives::peer::{self, Peer};
use reef_tracker_primitives::{NumberOfBytes, Transport};
use tokio::sync::mpsc;
use tracing::debug;

use super::protocol::{
    Action, AnnounceReply, AnswerRelay, ErrorReply, IncomingMessage, OfferRelay, ScrapeFile, ScrapeReply,
};
use super::registry::Registry;
use crate::core::auth::AuthToken;
use crate::core::statistics::Event;
use crate::core::{AnnounceRequest, ScrapeRequest, Tracker};
use crate::CurrentClock;

/// Per-connection state: which peer this socket belongs to and which swarms
/// it joined, so a dropped connection can be cleaned up like a `stopped`
/// announce.
#[derive(Default)]
struct Session {
    peer_id: Option<peer::Id>,
    joined: Vec<InfoHash>,
}

/// Drives one WebSocket connection until the client leaves, the idle
/// deadline expires, or the process shuts down.
pub async fn handle_socket(
    socket: WebSocket,
    remote_addr: SocketAddr,
    tracker: Arc<Tracker>,
    registry: Arc<Registry>,
    idle_timeout: Duration,
) {
    let (mut sink, mut stream) = socket.split();

    // Outbound messages (direct replies and relayed offers/answers) funnel
    // through one channel so relays from other connections never interleave
    // inside a frame write.
    let (sender, mut outbound) = mpsc::unbounded_channel::<String>();

    let writer = tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            if sink.send(Message::Text(message)).await.is_err() {
                break;
            }
        }
    });

    let mut session = Session::default();

    loop {
        let message = match tokio::time::timeout(idle_timeout, stream.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => text,
            Ok(Some(Ok(Message::Close(_)))) | Ok(None) => break,
            Ok(Some(Ok(_))) => continue,
            Ok(Some(Err(_))) => break,
            Err(_) => {
                debug!("closing idle websocket from {remote_addr}");
                break;
            }
        };

        handle_message(&text_or_failure(&message, &sender), remote_addr, &tracker, &registry, &mut session, &sender).await;
    }

    // A vanished socket is a stopped announce for every joined swarm.
    if let Some(peer_id) = session.peer_id {
        registry.unregister(&peer_id);
        for info_hash in &session.joined {
            tracker.remove_peer(info_hash, &peer_id);
        }
    }

    writer.abort();
}

/// Parses one message or reports the failure inline; malformed frames do
/// not kill the connection.
fn text_or_failure(message: &str, sender: &mpsc::UnboundedSender<String>) -> Option<IncomingMessage> {
    match serde_json::from_str::<IncomingMessage>(message) {
        Ok(parsed) => Some(parsed),
        Err(error) => {
            send_failure(sender, format!("cannot parse message: {error}"), None);
            None
        }
    }
}

async fn handle_message(
    message: &Option<IncomingMessage>,
    remote_addr: SocketAddr,
    tracker: &Arc<Tracker>,
    registry: &Arc<Registry>,
    session: &mut Session,
    sender: &mpsc::UnboundedSender<String>,
) {
    let Some(message) = message else { return };

    match message.action {
        Action::Announce => handle_announce(message, remote_addr, tracker, registry, session, sender).await,
        Action::Scrape => handle_scrape(message, tracker, sender).await,
    }
}

async fn handle_announce(
    message: &IncomingMessage,
    remote_addr: SocketAddr,
    tracker: &Arc<Tracker>,
    registry: &Arc<Registry>,
    session: &mut Session,
    sender: &mpsc::UnboundedSender<String>,
) {
    let Some(info_hash_hex) = message.info_hash.clone().map(super::protocol::InfoHashField::into_vec).and_then(|hashes| hashes.into_iter().next())
    else {
        send_failure(sender, "announce is missing the info_hash".to_string(), None);
        return;
    };

    let Ok(info_hash) = info_hash_hex.parse::<InfoHash>() else {
        send_failure(sender, "invalid info_hash".to_string(), Some(info_hash_hex));
        return;
    };

    let peer_id = match &message.peer_id {
        Some(hex) => match peer::Id::from_hex_string(hex) {
            Ok(peer_id) => peer_id,
            Err(_) => {
                send_failure(sender, "invalid peer_id".to_string(), Some(info_hash_hex));
                return;
            }
        },
        None => {
            send_failure(sender, "announce is missing the peer_id".to_string(), Some(info_hash_hex));
            return;
        }
    };

    let peer = Peer {
        peer_id,
        peer_addr: remote_addr,
        updated: CurrentClock::now(),
        uploaded: NumberOfBytes(message.uploaded.unwrap_or(0)),
        downloaded: NumberOfBytes(message.downloaded.unwrap_or(0)),
        left: NumberOfBytes(message.left.unwrap_or(0)),
        event: map_event(message.event.as_deref()),
        transport: Transport::WebSocket,
        key: None,
    };

    let announce_data = match tracker
        .announce(AnnounceRequest {
            info_hash,
            peer,
            numwant: message.numwant,
            auth_token: message.auth_token.clone().map(AuthToken::from),
        })
        .await
    {
        Ok(announce_data) => announce_data,
        Err(error) => {
            send_failure(sender, format!("Tracker error: {error}"), Some(info_hash_hex));
            return;
        }
    };

    tracker.send_stats_event(Event::WsAnnounce).await;

    // Track the session so a dropped socket cleans up after itself.
    if peer.event == AnnounceEvent::Stopped {
        session.joined.retain(|joined| joined != &info_hash);
    } else {
        session.peer_id = Some(peer_id);
        registry.register(peer_id, sender.clone());
        if !session.joined.contains(&info_hash) {
            session.joined.push(info_hash);
        }
    }

    let reply = AnnounceReply {
        action: Action::Announce,
        info_hash: info_hash_hex.clone(),
        interval: announce_data.policy.interval,
        complete: announce_data.stats.complete(),
        incomplete: announce_data.stats.incomplete(),
    };
    send_json(sender, &reply);

    // Relay each offer to one selected peer: the swarm picked them the same
    // way it would fill a peer list.
    if let Some(offers) = &message.offers {
        let sender_hex = peer_id.to_hex_string();

        for (offer, target) in offers.iter().zip(announce_data.peers.iter()) {
            let relay = OfferRelay {
                action: Action::Announce,
                info_hash: info_hash_hex.clone(),
                peer_id: sender_hex.clone(),
                offer: offer.offer.clone(),
                offer_id: offer.offer_id.clone(),
            };

            if let Ok(serialized) = serde_json::to_string(&relay) {
                registry.send_to(&target.peer_id, serialized);
            }
        }
    }

    // Route an answer back to the peer that made the offer, keyed by the
    // echoed offer_id.
    if let (Some(answer), Some(offer_id), Some(to_peer_id)) = (&message.answer, &message.offer_id, &message.to_peer_id) {
        if let Ok(target) = peer::Id::from_hex_string(to_peer_id) {
            let relay = AnswerRelay {
                action: Action::Announce,
                info_hash: info_hash_hex,
                peer_id: peer_id.to_hex_string(),
                answer: answer.clone(),
                offer_id: offer_id.clone(),
            };

            if let Ok(serialized) = serde_json::to_string(&relay) {
                registry.send_to(&target, serialized);
            }
        }
    }
}

async fn handle_scrape(message: &IncomingMessage, tracker: &Arc<Tracker>, sender: &mpsc::UnboundedSender<String>) {
    let hashes_hex = message
        .info_hash
        .clone()
        .map(super::protocol::InfoHashField::into_vec)
        .unwrap_or_default();

    let mut info_hashes = Vec::with_capacity(hashes_hex.len());
    for hash_hex in &hashes_hex {
        match hash_hex.parse::<InfoHash>() {
            Ok(info_hash) => info_hashes.push(info_hash),
            Err(_) => {
                send_failure(sender, "invalid info_hash".to_string(), Some(hash_hex.clone()));
                return;
            }
        }
    }

    let scrape_data = match tracker
        .scrape(ScrapeRequest {
            info_hashes,
            auth_token: message.auth_token.clone().map(AuthToken::from),
        })
        .await
    {
        Ok(scrape_data) => scrape_data,
        Err(error) => {
            send_failure(sender, format!("Tracker error: {error}"), None);
            return;
        }
    };

    tracker.send_stats_event(Event::WsScrape).await;

    let files = scrape_data
        .files
        .iter()
        .map(|(info_hash, metadata)| {
            (
                info_hash.to_hex_string(),
                ScrapeFile {
                    complete: metadata.complete(),
                    incomplete: metadata.incomplete(),
                    downloaded: metadata.downloaded(),
                },
            )
        })
        .collect();

    send_json(
        sender,
        &ScrapeReply {
            action: Action::Scrape,
            files,
        },
    );
}

fn map_event(event: Option<&str>) -> AnnounceEvent {
    match event {
        Some("started") => AnnounceEvent::Started,
        Some("stopped") => AnnounceEvent::Stopped,
        Some("completed") => AnnounceEvent::Completed,
        Some("paused") => AnnounceEvent::Paused,
        _ => AnnounceEvent::None,
    }
}

fn send_json<T: serde::Serialize>(sender: &mpsc::UnboundedSender<String>, message: &T) {
    if let Ok(serialized) = serde_json::to_string(message) {
        drop(sender.send(serialized));
    }
}

fn send_failure(sender: &mpsc::UnboundedSender<String>, failure_reason: String, info_hash: Option<String>) {
    send_json(
        sender,
        &ErrorReply {
            failure_reason,
            info_hash,
        },
    );
}
