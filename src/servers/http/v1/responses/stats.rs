//! `Stats` response for the HTTP tracker.
//!
//! The `/stats` endpoint returns a JSON snapshot, or a plaintext variant
//! when the `Accept` header does not ask for JSON.
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use reef_tracker_primitives::AggregateMetrics;

use crate::core::statistics::Metrics;

/// Which delivery layers this tracker instance runs.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct ProtocolToggles {
    pub http: bool,
    pub udp: bool,
    pub websocket: bool,
}

/// A combined snapshot of the swarm gauges, the per-protocol request
/// counters and the enabled protocols.
#[derive(Debug, serde::Serialize)]
pub struct Stats {
    pub torrents: u64,
    pub active_torrents: u64,
    pub peers: u64,
    pub seeders: u64,
    pub leechers: u64,
    pub completed: u64,
    pub protocols: ProtocolToggles,
    pub requests: Metrics,
}

impl Stats {
    #[must_use]
    pub fn new(swarms: AggregateMetrics, requests: Metrics, protocols: ProtocolToggles) -> Self {
        Self {
            torrents: swarms.torrents,
            active_torrents: swarms.active_torrents,
            peers: swarms.peers(),
            seeders: swarms.seeders,
            leechers: swarms.leechers,
            completed: swarms.completed,
            protocols,
            requests,
        }
    }

    /// The JSON rendering.
    ///
    /// # Panics
    ///
    /// Will panic if the stats cannot be serialized, which would be a bug in
    /// the struct definition.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("stats serialize to JSON")
    }

    /// The plaintext rendering: one `name: value` line per gauge.
    #[must_use]
    pub fn to_plaintext(&self) -> String {
        format!(
            "torrents: {}\nactive torrents: {}\npeers: {}\nseeders: {}\nleechers: {}\ncompleted: {}\nhttp: {}\nudp: {}\nwebsocket: {}\n",
            self.torrents,
            self.active_torrents,
            self.peers,
            self.seeders,
            self.leechers,
            self.completed,
            self.protocols.http,
            self.protocols.udp,
            self.protocols.websocket
        )
    }

    #[must_use]
    pub fn into_response_for(self, accept: Option<&str>) -> Response {
        let wants_json = accept.is_some_and(|accept| accept.contains("application/json"));

        if wants_json {
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/json")],
                self.to_json(),
            )
                .into_response()
        } else {
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                self.to_plaintext(),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use reef_tracker_primitives::AggregateMetrics;

    use super::{ProtocolToggles, Stats};
    use crate::core::statistics::Metrics;

    fn sample_stats() -> Stats {
        Stats::new(
            AggregateMetrics {
                torrents: 3,
                active_torrents: 2,
                seeders: 5,
                leechers: 7,
                completed: 11,
            },
            Metrics::default(),
            ProtocolToggles {
                http: true,
                udp: true,
                websocket: false,
            },
        )
    }

    #[test]
    fn the_json_rendering_should_contain_the_swarm_gauges() {
        let json = sample_stats().to_json();

        assert!(json.contains("\"torrents\":3"));
        assert!(json.contains("\"seeders\":5"));
        assert!(json.contains("\"leechers\":7"));
        assert!(json.contains("\"peers\":12"));
    }

    #[test]
    fn the_plaintext_rendering_should_have_one_line_per_gauge() {
        let plaintext = sample_stats().to_plaintext();

        assert!(plaintext.contains("torrents: 3\n"));
        assert!(plaintext.contains("seeders: 5\n"));
        assert!(plaintext.contains("leechers: 7\n"));
        assert!(plaintext.contains("websocket: false\n"));
    }
}
