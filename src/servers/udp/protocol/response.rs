//! Messaging primitives for responses.
use std::io::{self, Write};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use thiserror::Error;

use super::{ANNOUNCE_ACTION_ID, CONNECT_ACTION_ID, ERROR_ACTION_ID, SCRAPE_ACTION_ID};

/// Any response the tracker can send to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Connect(ConnectResponse),
    Announce(AnnounceResponse),
    Scrape(ScrapeResponse),
    Error(ErrorResponse),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectResponse {
    pub transaction_id: i32,
    pub connection_id: i64,
}

/// An announce response. All peers must share one address family: the reply
/// to an IPv4 datagram packs 6-byte records, the reply to an IPv6 datagram
/// 18-byte records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnounceResponse {
    pub transaction_id: i32,
    pub announce_interval: i32,
    pub leechers: i32,
    pub seeders: i32,
    pub peers: Vec<ResponsePeer>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponsePeer {
    pub ip_address: IpAddr,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeResponse {
    pub transaction_id: i32,
    pub torrent_stats: Vec<TorrentScrapeStatistics>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TorrentScrapeStatistics {
    pub seeders: i32,
    pub completed: i32,
    pub leechers: i32,
}

/// An error response (action 3) echoing the offending transaction id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    pub transaction_id: i32,
    pub message: String,
}

/// Errors of the response parser, used by client implementations and tests.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseResponseError {
    #[error("packet too short: {len} bytes")]
    Truncated { len: usize },

    #[error("unknown action {action}")]
    UnknownAction { action: u32 },

    #[error("peer list length is not a whole number of records")]
    MalformedPeerList,
}

impl Response {
    /// Serializes the response into its datagram bytes.
    ///
    /// # Errors
    ///
    /// Will return an `io::Error` if the writer fails.
    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        match self {
            Response::Connect(response) => {
                writer.write_all(&CONNECT_ACTION_ID.to_be_bytes())?;
                writer.write_all(&response.transaction_id.to_be_bytes())?;
                writer.write_all(&response.connection_id.to_be_bytes())?;
            }
            Response::Announce(response) => {
                writer.write_all(&ANNOUNCE_ACTION_ID.to_be_bytes())?;
                writer.write_all(&response.transaction_id.to_be_bytes())?;
                writer.write_all(&response.announce_interval.to_be_bytes())?;
                writer.write_all(&response.leechers.to_be_bytes())?;
                writer.write_all(&response.seeders.to_be_bytes())?;
                for peer in &response.peers {
                    match peer.ip_address {
                        IpAddr::V4(ip) => writer.write_all(&u32::from(ip).to_be_bytes())?,
                        IpAddr::V6(ip) => writer.write_all(&u128::from(ip).to_be_bytes())?,
                    }
                    writer.write_all(&peer.port.to_be_bytes())?;
                }
            }
            Response::Scrape(response) => {
                writer.write_all(&SCRAPE_ACTION_ID.to_be_bytes())?;
                writer.write_all(&response.transaction_id.to_be_bytes())?;
                for stats in &response.torrent_stats {
                    writer.write_all(&stats.seeders.to_be_bytes())?;
                    writer.write_all(&stats.completed.to_be_bytes())?;
                    writer.write_all(&stats.leechers.to_be_bytes())?;
                }
            }
            Response::Error(response) => {
                writer.write_all(&ERROR_ACTION_ID.to_be_bytes())?;
                writer.write_all(&response.transaction_id.to_be_bytes())?;
                writer.write_all(response.message.as_bytes())?;
            }
        }

        Ok(())
    }

    /// Parses a response datagram. `ipv6` selects the peer record size for
    /// announce responses, since the wire format does not tag the family.
    ///
    /// # Errors
    ///
    /// Will return a `ParseResponseError` if the packet is truncated or
    /// carries an unknown action.
    pub fn from_bytes(bytes: &[u8], ipv6: bool) -> Result<Response, ParseResponseError> {
        if bytes.len() < 8 {
            return Err(ParseResponseError::Truncated { len: bytes.len() });
        }

        let action = u32::from_be_bytes(bytes[0..4].try_into().expect("slice has 4 bytes"));
        let transaction_id = i32::from_be_bytes(bytes[4..8].try_into().expect("slice has 4 bytes"));

        match action {
            CONNECT_ACTION_ID => {
                if bytes.len() < 16 {
                    return Err(ParseResponseError::Truncated { len: bytes.len() });
                }
                let connection_id = i64::from_be_bytes(bytes[8..16].try_into().expect("slice has 8 bytes"));
                Ok(Response::Connect(ConnectResponse {
                    transaction_id,
                    connection_id,
                }))
            }
            ANNOUNCE_ACTION_ID => {
                if bytes.len() < 20 {
                    return Err(ParseResponseError::Truncated { len: bytes.len() });
                }
                let announce_interval = i32::from_be_bytes(bytes[8..12].try_into().expect("slice has 4 bytes"));
                let leechers = i32::from_be_bytes(bytes[12..16].try_into().expect("slice has 4 bytes"));
                let seeders = i32::from_be_bytes(bytes[16..20].try_into().expect("slice has 4 bytes"));

                let record_len = if ipv6 { 18 } else { 6 };
                let peer_bytes = &bytes[20..];
                if peer_bytes.len() % record_len != 0 {
                    return Err(ParseResponseError::MalformedPeerList);
                }

                let peers = peer_bytes
                    .chunks_exact(record_len)
                    .map(|record| {
                        let (ip_address, port_bytes) = if ipv6 {
                            let ip: [u8; 16] = record[..16].try_into().expect("record has 16 address bytes");
                            (IpAddr::V6(Ipv6Addr::from(ip)), &record[16..18])
                        } else {
                            let ip: [u8; 4] = record[..4].try_into().expect("record has 4 address bytes");
                            (IpAddr::V4(Ipv4Addr::from(ip)), &record[4..6])
                        };
                        ResponsePeer {
                            ip_address,
                            port: u16::from_be_bytes(port_bytes.try_into().expect("record has 2 port bytes")),
                        }
                    })
                    .collect();

                Ok(Response::Announce(AnnounceResponse {
                    transaction_id,
                    announce_interval,
                    leechers,
                    seeders,
                    peers,
                }))
            }
            SCRAPE_ACTION_ID => {
                let stat_bytes = &bytes[8..];
                if stat_bytes.len() % 12 != 0 {
                    return Err(ParseResponseError::Truncated { len: bytes.len() });
                }

                let torrent_stats = stat_bytes
                    .chunks_exact(12)
                    .map(|chunk| TorrentScrapeStatistics {
                        seeders: i32::from_be_bytes(chunk[0..4].try_into().expect("chunk has 4 bytes")),
                        completed: i32::from_be_bytes(chunk[4..8].try_into().expect("chunk has 4 bytes")),
                        leechers: i32::from_be_bytes(chunk[8..12].try_into().expect("chunk has 4 bytes")),
                    })
                    .collect();

                Ok(Response::Scrape(ScrapeResponse {
                    transaction_id,
                    torrent_stats,
                }))
            }
            ERROR_ACTION_ID => Ok(Response::Error(ErrorResponse {
                transaction_id,
                message: String::from_utf8_lossy(&bytes[8..]).into_owned(),
            })),
            action => Err(ParseResponseError::UnknownAction { action }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

    use super::{AnnounceResponse, ConnectResponse, ErrorResponse, Response, ResponsePeer, ScrapeResponse, TorrentScrapeStatistics};

    #[test]
    fn a_connect_response_should_round_trip() {
        let response = Response::Connect(ConnectResponse {
            transaction_id: 42,
            connection_id: 0x1122_3344_5566_7788,
        });

        let mut bytes = Vec::new();
        response.write(&mut bytes).unwrap();

        assert_eq!(bytes.len(), 16);
        assert_eq!(Response::from_bytes(&bytes, false).unwrap(), response);
    }

    #[test]
    fn an_ipv4_announce_response_should_pack_6_byte_records() {
        let response = Response::Announce(AnnounceResponse {
            transaction_id: 42,
            announce_interval: 600,
            leechers: 1,
            seeders: 1,
            peers: vec![
                ResponsePeer {
                    ip_address: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
                    port: 6881,
                },
                ResponsePeer {
                    ip_address: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)),
                    port: 6882,
                },
            ],
        });

        let mut bytes = Vec::new();
        response.write(&mut bytes).unwrap();

        assert_eq!(bytes.len(), 20 + 2 * 6);
        assert_eq!(&bytes[20..26], &[10, 0, 0, 1, 0x1a, 0xe1]);
        assert_eq!(Response::from_bytes(&bytes, false).unwrap(), response);
    }

    #[test]
    fn an_ipv6_announce_response_should_pack_18_byte_records() {
        let response = Response::Announce(AnnounceResponse {
            transaction_id: 42,
            announce_interval: 600,
            leechers: 0,
            seeders: 1,
            peers: vec![ResponsePeer {
                ip_address: IpAddr::V6(Ipv6Addr::LOCALHOST),
                port: 6881,
            }],
        });

        let mut bytes = Vec::new();
        response.write(&mut bytes).unwrap();

        assert_eq!(bytes.len(), 20 + 18);
        assert_eq!(Response::from_bytes(&bytes, true).unwrap(), response);
    }

    #[test]
    fn a_scrape_response_should_round_trip() {
        let response = Response::Scrape(ScrapeResponse {
            transaction_id: 42,
            torrent_stats: vec![TorrentScrapeStatistics {
                seeders: 1,
                completed: 2,
                leechers: 3,
            }],
        });

        let mut bytes = Vec::new();
        response.write(&mut bytes).unwrap();

        assert_eq!(bytes.len(), 8 + 12);
        assert_eq!(Response::from_bytes(&bytes, false).unwrap(), response);
    }

    #[test]
    fn an_error_response_should_carry_the_message_and_the_transaction_id() {
        let response = Response::Error(ErrorResponse {
            transaction_id: 42,
            message: "connection id expired".to_string(),
        });

        let mut bytes = Vec::new();
        response.write(&mut bytes).unwrap();

        // action = 3
        assert_eq!(&bytes[0..4], &[0, 0, 0, 3]);
        assert_eq!(Response::from_bytes(&bytes, false).unwrap(), response);
    }
}
