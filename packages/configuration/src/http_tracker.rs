//! HTTP tracker section.
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct HttpTracker {
    /// Whether the HTTP tracker is started.
    #[serde(default = "HttpTracker::default_enabled")]
    pub enabled: bool,

    /// The address the HTTP tracker binds to.
    #[serde(default = "HttpTracker::default_bind_address")]
    pub bind_address: String,

    /// Per-request deadline in seconds. Responses not produced in time are
    /// abandoned; any applied swarm mutation stays.
    #[serde(default = "HttpTracker::default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for HttpTracker {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            bind_address: Self::default_bind_address(),
            request_timeout_secs: Self::default_request_timeout_secs(),
        }
    }
}

impl HttpTracker {
    fn default_enabled() -> bool {
        true
    }

    fn default_bind_address() -> String {
        String::from("0.0.0.0:7070")
    }

    fn default_request_timeout_secs() -> u64 {
        10
    }
}
