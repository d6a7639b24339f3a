//! Messaging primitives for requests.
use std::io::{self, Write};
use std::net::Ipv4Addr;

use reef_tracker_primitives::announce_event::AnnounceEvent;
use reef_tracker_primitives::info_hash::InfoHash;
use reef_tracker_primitives::peer;
use thiserror::Error;

use super::{ANNOUNCE_ACTION_ID, CONNECT_ACTION_ID, PROTOCOL_ID, SCRAPE_ACTION_ID};

/// Fixed size of an announce packet up to and including the port; option
/// bytes may follow.
const ANNOUNCE_FIXED_LEN: usize = 98;

/// Option byte introducing the end of the option list (BEP 41).
const OPTION_END: u8 = 0;
/// No-op option byte (BEP 41).
const OPTION_NOP: u8 = 1;
/// URL data option: one length byte, then that many bytes of request URL
/// data (BEP 41). The tracker reads the query part for an `auth_token`.
const OPTION_URL_DATA: u8 = 2;

/// Any request a client can send to the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Connect(ConnectRequest),
    Announce(AnnounceRequest),
    Scrape(ScrapeRequest),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectRequest {
    pub transaction_id: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnounceRequest {
    pub connection_id: i64,
    pub transaction_id: i32,
    pub info_hash: InfoHash,
    pub peer_id: peer::Id,
    pub downloaded: i64,
    pub left: i64,
    pub uploaded: i64,
    pub event: AnnounceEvent,
    /// The IPv4 address the client claims, or `None` when it sent `0`
    /// ("use the sender address", which is also the only safe choice).
    pub ip_address: Option<Ipv4Addr>,
    pub key: u32,
    /// `-1` means "give me the default amount".
    pub peers_wanted: i32,
    pub port: u16,
    /// `auth_token` extracted from the BEP 41 URL data option, when present.
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeRequest {
    pub connection_id: i64,
    pub transaction_id: i32,
    pub info_hashes: Vec<InfoHash>,
}

/// Errors of the request parser. All of them are answered with an `error`
/// packet.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseRequestError {
    #[error("packet too short: {len} bytes")]
    Truncated { len: usize },

    #[error("connect request does not carry the protocol magic")]
    BadProtocolMagic,

    #[error("unknown action {action}")]
    UnknownAction { action: u32 },

    #[error("announce packet has a malformed option list")]
    MalformedOptions,

    #[error("scrape request carries no info_hash")]
    EmptyScrape,
}

impl Request {
    /// Parses one datagram. `max_scrape_torrents` caps how many hashes a
    /// scrape may carry; extra hashes are a protocol failure rather than
    /// being silently dropped.
    ///
    /// # Errors
    ///
    /// Will return a `ParseRequestError` if the packet is truncated,
    /// carries an unknown action, or violates the framing rules.
    pub fn from_bytes(bytes: &[u8], max_scrape_torrents: u8) -> Result<Request, ParseRequestError> {
        if bytes.len() < 16 {
            return Err(ParseRequestError::Truncated { len: bytes.len() });
        }

        let connection_id = read_i64(bytes, 0);
        let action = read_u32(bytes, 8);
        let transaction_id = read_i32(bytes, 12);

        match action {
            CONNECT_ACTION_ID => {
                if connection_id != PROTOCOL_ID {
                    return Err(ParseRequestError::BadProtocolMagic);
                }
                Ok(Request::Connect(ConnectRequest { transaction_id }))
            }
            ANNOUNCE_ACTION_ID => parse_announce(bytes, connection_id, transaction_id),
            SCRAPE_ACTION_ID => parse_scrape(bytes, connection_id, transaction_id, max_scrape_torrents),
            action => Err(ParseRequestError::UnknownAction { action }),
        }
    }

    /// Serializes the request, mainly for client implementations and tests.
    ///
    /// # Errors
    ///
    /// Will return an `io::Error` if the writer fails.
    pub fn write_bytes<W: Write>(&self, mut writer: W) -> io::Result<()> {
        match self {
            Request::Connect(request) => {
                writer.write_all(&PROTOCOL_ID.to_be_bytes())?;
                writer.write_all(&CONNECT_ACTION_ID.to_be_bytes())?;
                writer.write_all(&request.transaction_id.to_be_bytes())?;
            }
            Request::Announce(request) => {
                writer.write_all(&request.connection_id.to_be_bytes())?;
                writer.write_all(&ANNOUNCE_ACTION_ID.to_be_bytes())?;
                writer.write_all(&request.transaction_id.to_be_bytes())?;
                writer.write_all(&request.info_hash.0)?;
                writer.write_all(&request.peer_id.0)?;
                writer.write_all(&request.downloaded.to_be_bytes())?;
                writer.write_all(&request.left.to_be_bytes())?;
                writer.write_all(&request.uploaded.to_be_bytes())?;
                writer.write_all(&request.event.to_i32().to_be_bytes())?;
                let ip: u32 = request.ip_address.map_or(0, u32::from);
                writer.write_all(&ip.to_be_bytes())?;
                writer.write_all(&request.key.to_be_bytes())?;
                writer.write_all(&request.peers_wanted.to_be_bytes())?;
                writer.write_all(&request.port.to_be_bytes())?;

                if let Some(token) = &request.auth_token {
                    let url_data = format!("/announce?auth_token={token}");
                    for chunk in url_data.as_bytes().chunks(255) {
                        writer.write_all(&[OPTION_URL_DATA, u8::try_from(chunk.len()).expect("chunks are at most 255 bytes")])?;
                        writer.write_all(chunk)?;
                    }
                    writer.write_all(&[OPTION_END])?;
                }
            }
            Request::Scrape(request) => {
                writer.write_all(&request.connection_id.to_be_bytes())?;
                writer.write_all(&SCRAPE_ACTION_ID.to_be_bytes())?;
                writer.write_all(&request.transaction_id.to_be_bytes())?;
                for info_hash in &request.info_hashes {
                    writer.write_all(&info_hash.0)?;
                }
            }
        }

        Ok(())
    }
}

fn parse_announce(bytes: &[u8], connection_id: i64, transaction_id: i32) -> Result<Request, ParseRequestError> {
    if bytes.len() < ANNOUNCE_FIXED_LEN {
        return Err(ParseRequestError::Truncated { len: bytes.len() });
    }

    let mut info_hash = [0u8; 20];
    info_hash.copy_from_slice(&bytes[16..36]);

    let mut peer_id = [0u8; 20];
    peer_id.copy_from_slice(&bytes[36..56]);

    let downloaded = read_i64(bytes, 56);
    let left = read_i64(bytes, 64);
    let uploaded = read_i64(bytes, 72);
    let event = AnnounceEvent::from_i32(read_i32(bytes, 80));
    let raw_ip = read_u32(bytes, 84);
    let key = read_u32(bytes, 88);
    let peers_wanted = read_i32(bytes, 92);
    let port = u16::from_be_bytes([bytes[96], bytes[97]]);

    let auth_token = parse_option_auth_token(&bytes[ANNOUNCE_FIXED_LEN..])?;

    Ok(Request::Announce(AnnounceRequest {
        connection_id,
        transaction_id,
        info_hash: InfoHash(info_hash),
        peer_id: peer::Id(peer_id),
        downloaded,
        left,
        uploaded,
        event,
        ip_address: (raw_ip != 0).then(|| Ipv4Addr::from(raw_ip)),
        key,
        peers_wanted,
        port,
        auth_token,
    }))
}

fn parse_scrape(
    bytes: &[u8],
    connection_id: i64,
    transaction_id: i32,
    max_scrape_torrents: u8,
) -> Result<Request, ParseRequestError> {
    let hashes = &bytes[16..];

    if hashes.is_empty() {
        return Err(ParseRequestError::EmptyScrape);
    }
    if hashes.len() % 20 != 0 || hashes.len() / 20 > usize::from(max_scrape_torrents) {
        return Err(ParseRequestError::Truncated { len: bytes.len() });
    }

    let info_hashes = hashes
        .chunks_exact(20)
        .map(|chunk| {
            let mut hash = [0u8; 20];
            hash.copy_from_slice(chunk);
            InfoHash(hash)
        })
        .collect();

    Ok(Request::Scrape(ScrapeRequest {
        connection_id,
        transaction_id,
        info_hashes,
    }))
}

/// Walks the BEP 41 option list after the fixed announce header and pulls
/// an `auth_token` query parameter out of the URL data, when there is one.
fn parse_option_auth_token(mut options: &[u8]) -> Result<Option<String>, ParseRequestError> {
    let mut url_data: Vec<u8> = Vec::new();

    while let Some((&option_type, rest)) = options.split_first() {
        match option_type {
            OPTION_END => break,
            OPTION_NOP => options = rest,
            OPTION_URL_DATA => {
                let Some((&len, data)) = rest.split_first() else {
                    return Err(ParseRequestError::MalformedOptions);
                };
                let len = usize::from(len);
                if data.len() < len {
                    return Err(ParseRequestError::MalformedOptions);
                }
                url_data.extend_from_slice(&data[..len]);
                options = &data[len..];
            }
            _ => return Err(ParseRequestError::MalformedOptions),
        }
    }

    if url_data.is_empty() {
        return Ok(None);
    }

    let url_data = String::from_utf8(url_data).map_err(|_| ParseRequestError::MalformedOptions)?;
    let query = url_data.split_once('?').map_or(url_data.as_str(), |(_, query)| query);

    for pair in query.split('&') {
        if let Some((name, value)) = pair.split_once('=') {
            if name == "auth_token" && !value.is_empty() {
                return Ok(Some(value.to_string()));
            }
        }
    }

    Ok(None)
}

fn read_i64(bytes: &[u8], offset: usize) -> i64 {
    i64::from_be_bytes(bytes[offset..offset + 8].try_into().expect("slice has 8 bytes"))
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes(bytes[offset..offset + 4].try_into().expect("slice has 4 bytes"))
}

fn read_i32(bytes: &[u8], offset: usize) -> i32 {
    i32::from_be_bytes(bytes[offset..offset + 4].try_into().expect("slice has 4 bytes"))
}
