//! Errors returned by the tracker core.
//!
//! Every variant maps to a protocol failure at the delivery layer; none of
//! them unwinds past a dispatcher.
use std::panic::Location;

use reef_tracker_located_error::LocatedError;
use reef_tracker_primitives::info_hash::InfoHash;
use thiserror::Error;

use crate::core::repositories::RepositoryError;
use crate::core::swarm::SwarmError;

#[derive(Debug, Error)]
pub enum Error {
    /// The torrent is not registered (private tracker) or inactive.
    #[error("torrent not found: {info_hash}, {location}")]
    TorrentNotFound {
        info_hash: InfoHash,
        location: &'static Location<'static>,
    },

    #[error("torrent is not active: {info_hash}, {location}")]
    TorrentNotActive {
        info_hash: InfoHash,
        location: &'static Location<'static>,
    },

    /// A scrape request carried no `info_hash` and full scrapes are not
    /// permitted.
    #[error("at least one info_hash is required, {location}")]
    EmptyScrape { location: &'static Location<'static> },

    #[error("authentication error: {source}")]
    Authentication {
        #[from]
        source: crate::core::auth::Error,
    },

    #[error("{source}")]
    Swarm {
        #[from]
        source: SwarmError,
    },

    /// The torrent catalog could not be reached. Announces degrade to
    /// peer coordination only when the tracker is public; private trackers
    /// must reject, since they cannot check the torrent.
    #[error("torrent catalog unavailable: {source}")]
    TorrentCatalogUnavailable {
        source: LocatedError<'static, RepositoryError>,
    },
}
