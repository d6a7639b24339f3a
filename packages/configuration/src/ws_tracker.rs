//! WebSocket (WebTorrent) tracker section.
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct WsTracker {
    /// Whether the WebSocket tracker is started.
    #[serde(default = "WsTracker::default_enabled")]
    pub enabled: bool,

    /// The address the WebSocket tracker binds to.
    #[serde(default = "WsTracker::default_bind_address")]
    pub bind_address: String,

    /// Seconds a connection may stay silent before it is closed.
    #[serde(default = "WsTracker::default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
}

impl Default for WsTracker {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            bind_address: Self::default_bind_address(),
            idle_timeout_secs: Self::default_idle_timeout_secs(),
        }
    }
}

impl WsTracker {
    fn default_enabled() -> bool {
        true
    }

    fn default_bind_address() -> String {
        String::from("0.0.0.0:7171")
    }

    fn default_idle_timeout_secs() -> u64 {
        30
    }
}
