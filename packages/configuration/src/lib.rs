//! Configuration data structures for the Reef Tracker.
//!
//! Settings are grouped in sections, one per service plus the tracker core.
//! Values come from three layers, later layers overriding earlier ones:
//!
//! 1. The hardcoded defaults.
//! 2. An optional TOML file (`reef-tracker.toml`).
//! 3. Environment variables prefixed with `REEF_TRACKER_`, using `__` as the
//!    section separator (e.g. `REEF_TRACKER_CORE__PRIVATE=true`).
pub mod core;
pub mod http_tracker;
pub mod udp_tracker;
pub mod ws_tracker;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use reef_tracker_located_error::{DynError, Located, LocatedError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crate::core::{AnnouncePolicy, Core, CreditPolicy, SwarmPolicy};
pub use crate::http_tracker::HttpTracker;
pub use crate::udp_tracker::UdpTracker;
pub use crate::ws_tracker::WsTracker;

/// Prefix for the environment variable override layer.
const ENV_VAR_PREFIX: &str = "REEF_TRACKER_";

/// The default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "./reef-tracker.toml";

/// Hard cap on the number of peers a single announce response may carry,
/// whatever `numwant` asks for.
pub const TORRENT_PEERS_LIMIT: usize = 50;

/// Maximum number of torrents accepted in a single scrape request.
pub const MAX_SCRAPE_TORRENTS: u8 = 74;

/// The whole tracker configuration.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone, Default)]
pub struct Configuration {
    /// Core tracker configuration.
    #[serde(default)]
    pub core: Core,

    /// HTTP tracker delivery layer.
    #[serde(default)]
    pub http_tracker: HttpTracker,

    /// UDP tracker delivery layer.
    #[serde(default)]
    pub udp_tracker: UdpTracker,

    /// WebSocket (WebTorrent) tracker delivery layer.
    #[serde(default)]
    pub ws_tracker: WsTracker,
}

impl Configuration {
    /// Loads the configuration from the default sources: built-in defaults,
    /// then the TOML file at `config_path` (if it exists), then
    /// `REEF_TRACKER_`-prefixed environment variables.
    ///
    /// # Errors
    ///
    /// Will return an error if the file or the environment contain values
    /// that do not deserialize into the configuration sections.
    pub fn load(config_path: &str) -> Result<Configuration, Error> {
        let figment = Figment::from(Serialized::defaults(Configuration::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed(ENV_VAR_PREFIX).split("__"));

        let configuration = figment.extract()?;

        Ok(configuration)
    }

    /// Renders the configuration as TOML, mainly for the startup log.
    ///
    /// # Panics
    ///
    /// Will panic if the configuration cannot be serialized, which would be a
    /// bug in the section definitions.
    #[must_use]
    pub fn to_toml(&self) -> String {
        toml::to_string(self).expect("configuration sections serialize to TOML")
    }
}

/// Errors that can occur when loading the configuration.
#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("unsupported configuration source: {source}")]
    UnsupportedSource {
        source: LocatedError<'static, dyn std::error::Error + Send + Sync>,
    },

    #[error("invalid configuration: {source}")]
    Invalid {
        source: LocatedError<'static, figment::Error>,
    },
}

impl From<figment::Error> for Error {
    #[track_caller]
    fn from(err: figment::Error) -> Self {
        Self::Invalid {
            source: Located(err).into(),
        }
    }
}

impl From<DynError> for Error {
    #[track_caller]
    fn from(err: DynError) -> Self {
        Self::UnsupportedSource { source: err.into() }
    }
}

#[cfg(test)]
mod tests {
    use crate::Configuration;

    #[test]
    fn configuration_should_have_default_values() {
        let configuration = Configuration::default();

        assert_eq!(configuration.core.announce_policy.interval, 600);
        assert_eq!(configuration.core.announce_policy.interval_min, 300);
        assert_eq!(configuration.core.swarm_policy.max_peers_per_swarm, 1000);
        assert_eq!(configuration.core.swarm_policy.peer_ttl_secs, 1200);
        assert_eq!(configuration.core.credit_policy.session_reset_threshold_secs, 1800);
        assert!(!configuration.core.private);
    }

    #[test]
    fn configuration_should_be_loadable_from_the_environment() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("REEF_TRACKER_CORE__PRIVATE", "true");
            jail.set_env("REEF_TRACKER_HTTP_TRACKER__BIND_ADDRESS", "0.0.0.0:7171");

            let configuration = Configuration::load("./missing.toml").expect("configuration should load");

            assert!(configuration.core.private);
            assert_eq!(configuration.http_tracker.bind_address, "0.0.0.0:7171");

            Ok(())
        });
    }

    #[test]
    fn configuration_should_be_loadable_from_a_toml_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "reef-tracker.toml",
                r#"
                [core]
                private = true

                [core.announce_policy]
                interval = 120
                interval_min = 60
                "#,
            )?;

            let configuration = Configuration::load("reef-tracker.toml").expect("configuration should load");

            assert!(configuration.core.private);
            assert_eq!(configuration.core.announce_policy.interval, 120);
            assert_eq!(configuration.core.announce_policy.interval_min, 60);
            // Untouched sections keep their defaults.
            assert_eq!(configuration.core.swarm_policy.max_peers_per_swarm, 1000);

            Ok(())
        });
    }

    #[test]
    fn configuration_should_render_back_to_toml() {
        let configuration = Configuration::default();

        let rendered = configuration.to_toml();

        assert!(rendered.contains("[core]"));
        assert!(rendered.contains("[http_tracker]"));
        assert!(rendered.contains("[udp_tracker]"));
        assert!(rendered.contains("[ws_tracker]"));
    }
}
