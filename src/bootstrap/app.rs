//! Builds the tracker and its dependencies from the configuration.
use std::sync::Arc;

use reef_tracker_configuration::Configuration;

use crate::bootstrap::logging;
use crate::core::repositories::in_memory;
use crate::core::{statistics, Tracker};
use crate::servers::ws;

/// The assembled application state.
pub struct AppContainer {
    pub configuration: Arc<Configuration>,
    pub tracker: Arc<Tracker>,
    pub ws_registry: Arc<ws::registry::Registry>,
}

/// Loads the configuration, initializes logging and builds the tracker.
///
/// The standalone binary wires the in-memory repository implementations in;
/// a deployment embedding the tracker next to a real user/torrent/ledger
/// store passes its own implementations to [`Tracker::new`] instead.
///
/// # Panics
///
/// Will panic if the configuration cannot be loaded, since the process
/// cannot run without one.
#[must_use]
pub fn setup() -> AppContainer {
    let configuration =
        Configuration::load(reef_tracker_configuration::DEFAULT_CONFIG_PATH).expect("configuration should be valid");

    logging::setup();

    tracing::info!("configuration:\n{}", configuration.to_toml());

    let repositories = if configuration.core.private {
        in_memory::private_repositories()
    } else {
        in_memory::public_repositories()
    };

    let (stats_event_sender, stats_repository) = if configuration.core.tracker_usage_statistics {
        let (sender, repository) = statistics::Keeper::new_active_instance();
        (Some(sender), repository)
    } else {
        (None, statistics::Repo::new())
    };

    let tracker = Arc::new(Tracker::new(
        &configuration,
        repositories.user_repository,
        repositories.torrent_repository,
        repositories.ledger,
        repositories.observability,
        stats_event_sender,
        stats_repository,
    ));

    AppContainer {
        configuration: Arc::new(configuration),
        tracker,
        ws_registry: Arc::new(ws::registry::Registry::default()),
    }
}
