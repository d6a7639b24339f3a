//! The WebTorrent JSON message schema.
//!
//! Every WebSocket message is one JSON object. Identifiers (`info_hash`,
//! `peer_id`) travel hex encoded; the WebRTC `offer`/`answer` payloads are
//! opaque JSON values that are relayed untouched.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A message received from a WebTorrent client.
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    pub action: Action,
    /// Hex encoded. Scrape requests may carry one hash, a list, or none.
    #[serde(default)]
    pub info_hash: Option<InfoHashField>,
    /// Hex encoded.
    #[serde(default)]
    pub peer_id: Option<String>,
    #[serde(default)]
    pub uploaded: Option<i64>,
    #[serde(default)]
    pub downloaded: Option<i64>,
    #[serde(default)]
    pub left: Option<i64>,
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub numwant: Option<usize>,
    /// WebRTC offers to relay to selected peers.
    #[serde(default)]
    pub offers: Option<Vec<Offer>>,
    /// A WebRTC answer to route back to the peer that made the offer.
    #[serde(default)]
    pub answer: Option<serde_json::Value>,
    #[serde(default)]
    pub offer_id: Option<String>,
    /// Hex encoded id of the peer the `answer` is for.
    #[serde(default)]
    pub to_peer_id: Option<String>,
    #[serde(default)]
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Announce,
    Scrape,
}

/// One or many hex encoded infohashes.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum InfoHashField {
    One(String),
    Many(Vec<String>),
}

impl InfoHashField {
    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        match self {
            InfoHashField::One(hash) => vec![hash],
            InfoHashField::Many(hashes) => hashes,
        }
    }
}

/// A WebRTC offer as sent by the announcing peer.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Offer {
    /// Opaque SDP payload; never inspected.
    pub offer: serde_json::Value,
    pub offer_id: String,
}

/// The direct reply to an announce.
#[derive(Debug, Clone, Serialize)]
pub struct AnnounceReply {
    pub action: Action,
    pub info_hash: String,
    pub interval: u32,
    pub complete: u32,
    pub incomplete: u32,
}

/// An offer being relayed to a selected peer.
#[derive(Debug, Clone, Serialize)]
pub struct OfferRelay {
    pub action: Action,
    pub info_hash: String,
    /// The peer that made the offer.
    pub peer_id: String,
    pub offer: serde_json::Value,
    pub offer_id: String,
}

/// An answer being routed back to the peer that made the offer.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerRelay {
    pub action: Action,
    pub info_hash: String,
    /// The peer that answered.
    pub peer_id: String,
    pub answer: serde_json::Value,
    pub offer_id: String,
}

/// The reply to a scrape.
#[derive(Debug, Clone, Serialize)]
pub struct ScrapeReply {
    pub action: Action,
    pub files: BTreeMap<String, ScrapeFile>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ScrapeFile {
    pub complete: u32,
    pub incomplete: u32,
    pub downloaded: u32,
}

/// A failure reply. The field name matches the HTTP tracker convention.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReply {
    #[serde(rename = "failure reason")]
    pub failure_reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info_hash: Option<String>,
}
