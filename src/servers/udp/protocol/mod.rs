//! The BEP 15 wire codec: request parsing and response serialization.
//!
//! All integers are big-endian. The first request of a session is `connect`
//! (action 0), carrying the fixed protocol magic instead of a connection id.
pub mod request;
pub mod response;

pub use request::{AnnounceRequest, ConnectRequest, ParseRequestError, Request, ScrapeRequest};
pub use response::{AnnounceResponse, ConnectResponse, ErrorResponse, Response, ResponsePeer, ScrapeResponse, TorrentScrapeStatistics};

/// The protocol magic every `connect` request must carry in place of a
/// connection id: `0x41727101980`.
pub const PROTOCOL_ID: i64 = 0x0000_0417_2710_1980;

pub const CONNECT_ACTION_ID: u32 = 0;
pub const ANNOUNCE_ACTION_ID: u32 = 1;
pub const SCRAPE_ACTION_ID: u32 = 2;
pub const ERROR_ACTION_ID: u32 = 3;
