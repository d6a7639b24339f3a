//! The HTTP tracker.
//!
//! Serves `GET /announce`, `GET /scrape` and `GET /stats` with bencoded
//! bodies (JSON or plaintext for `/stats`), as described in
//! [BEP 3](https://www.bittorrent.org/beps/bep_0003.html),
//! [BEP 23](https://www.bittorrent.org/beps/bep_0023.html) and
//! [BEP 48](https://www.bittorrent.org/beps/bep_0048.html).
//!
//! Failures are bencoded `failure reason` dictionaries sent with a `200 OK`
//! status: clients give up on trackers that answer announce errors with
//! non-200 codes.
pub mod percent_encoding;
pub mod server;
pub mod v1;
