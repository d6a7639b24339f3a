//! UDP tracker section.
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct UdpTracker {
    /// Whether the UDP tracker is started.
    #[serde(default = "UdpTracker::default_enabled")]
    pub enabled: bool,

    /// The address the UDP tracker binds to.
    #[serde(default = "UdpTracker::default_bind_address")]
    pub bind_address: String,

    /// Seconds an issued connection id stays valid. BEP 15 specifies two
    /// minutes.
    #[serde(default = "UdpTracker::default_cookie_lifetime_secs")]
    pub cookie_lifetime_secs: u64,

    /// Deadline in seconds for handling one datagram.
    #[serde(default = "UdpTracker::default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for UdpTracker {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            bind_address: Self::default_bind_address(),
            cookie_lifetime_secs: Self::default_cookie_lifetime_secs(),
            request_timeout_secs: Self::default_request_timeout_secs(),
        }
    }
}

impl UdpTracker {
    fn default_enabled() -> bool {
        true
    }

    fn default_bind_address() -> String {
        String::from("0.0.0.0:6969")
    }

    fn default_cookie_lifetime_secs() -> u64 {
        120
    }

    fn default_request_timeout_secs() -> u64 {
        15
    }
}
