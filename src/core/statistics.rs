//! Structs to collect and keep tracker metrics.
//!
//! The data is collected with an `event sender -> event listener` model: the
//! delivery layers send one [`Event`] per handled request, the [`Keeper`]
//! listens and updates the counters in the [`Repo`]. The `/stats` endpoint
//! combines these counters with the live swarm gauges from the registry.
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::error::SendError;
use tokio::sync::{mpsc, RwLock, RwLockReadGuard};
use tracing::debug;

const CHANNEL_BUFFER_SIZE: usize = 65_535;

/// A statistics event.
///
/// - `Tcp` prefix: the HTTP tracker.
/// - `Udp` prefix: the UDP tracker.
/// - `Ws` prefix: the WebSocket tracker.
/// - `4`/`6` suffix: the IP version used by the peer.
#[derive(Debug, PartialEq, Eq)]
pub enum Event {
    Tcp4Announce,
    Tcp4Scrape,
    Tcp6Announce,
    Tcp6Scrape,
    Udp4Connect,
    Udp4Announce,
    Udp4Scrape,
    Udp6Connect,
    Udp6Announce,
    Udp6Scrape,
    WsAnnounce,
    WsScrape,
}

/// Counters for handled requests, per protocol and IP version.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct Metrics {
    pub tcp4_announces_handled: u64,
    pub tcp4_scrapes_handled: u64,
    pub tcp6_announces_handled: u64,
    pub tcp6_scrapes_handled: u64,
    pub udp4_connections_handled: u64,
    pub udp4_announces_handled: u64,
    pub udp4_scrapes_handled: u64,
    pub udp6_connections_handled: u64,
    pub udp6_announces_handled: u64,
    pub udp6_scrapes_handled: u64,
    pub ws_announces_handled: u64,
    pub ws_scrapes_handled: u64,
}

/// The service keeping the metrics up to date with incoming events.
pub struct Keeper {
    pub repository: Repo,
}

impl Default for Keeper {
    fn default() -> Self {
        Self::new()
    }
}

impl Keeper {
    #[must_use]
    pub fn new() -> Self {
        Self { repository: Repo::new() }
    }

    #[must_use]
    pub fn new_active_instance() -> (Box<dyn EventSender>, Repo) {
        let mut keeper = Self::new();

        let event_sender = keeper.run_event_listener();

        (event_sender, keeper.repository)
    }

    pub fn run_event_listener(&mut self) -> Box<dyn EventSender> {
        let (sender, receiver) = mpsc::channel::<Event>(CHANNEL_BUFFER_SIZE);

        let repository = self.repository.clone();

        tokio::spawn(async move { event_listener(receiver, repository).await });

        Box::new(Sender { sender })
    }
}

async fn event_listener(mut receiver: mpsc::Receiver<Event>, repository: Repo) {
    while let Some(event) = receiver.recv().await {
        event_handler(event, &repository).await;
    }
}

async fn event_handler(event: Event, repository: &Repo) {
    let mut metrics = repository.metrics.write().await;

    match event {
        Event::Tcp4Announce => metrics.tcp4_announces_handled += 1,
        Event::Tcp4Scrape => metrics.tcp4_scrapes_handled += 1,
        Event::Tcp6Announce => metrics.tcp6_announces_handled += 1,
        Event::Tcp6Scrape => metrics.tcp6_scrapes_handled += 1,
        Event::Udp4Connect => metrics.udp4_connections_handled += 1,
        Event::Udp4Announce => metrics.udp4_announces_handled += 1,
        Event::Udp4Scrape => metrics.udp4_scrapes_handled += 1,
        Event::Udp6Connect => metrics.udp6_connections_handled += 1,
        Event::Udp6Announce => metrics.udp6_announces_handled += 1,
        Event::Udp6Scrape => metrics.udp6_scrapes_handled += 1,
        Event::WsAnnounce => metrics.ws_announces_handled += 1,
        Event::WsScrape => metrics.ws_scrapes_handled += 1,
    }

    drop(metrics);

    debug!("stats: {:?}", repository.get_metrics().await);
}

/// A trait to allow sending statistics events.
#[async_trait]
pub trait EventSender: Sync + Send {
    async fn send_event(&self, event: Event) -> Option<Result<(), SendError<Event>>>;
}

/// The channel-backed [`EventSender`] implementation handed out by the
/// [`Keeper`].
pub struct Sender {
    sender: mpsc::Sender<Event>,
}

#[async_trait]
impl EventSender for Sender {
    async fn send_event(&self, event: Event) -> Option<Result<(), SendError<Event>>> {
        Some(self.sender.send(event).await)
    }
}

/// A repository for the request counters.
#[derive(Clone)]
pub struct Repo {
    metrics: Arc<RwLock<Metrics>>,
}

impl Default for Repo {
    fn default() -> Self {
        Self::new()
    }
}

impl Repo {
    #[must_use]
    pub fn new() -> Self {
        Self {
            metrics: Arc::new(RwLock::new(Metrics::default())),
        }
    }

    pub async fn get_metrics(&self) -> RwLockReadGuard<'_, Metrics> {
        self.metrics.read().await
    }
}

#[cfg(test)]
mod tests {

    mod the_keeper {
        use crate::core::statistics::{Event, Keeper, Metrics};

        #[tokio::test]
        async fn should_start_with_zeroed_metrics() {
            let keeper = Keeper::new();

            let metrics = keeper.repository.get_metrics().await;

            assert_eq!(*metrics, Metrics::default());
        }

        #[tokio::test]
        async fn should_create_an_event_sender_to_send_statistical_events() {
            let mut keeper = Keeper::new();

            let event_sender = keeper.run_event_listener();

            let result = event_sender.send_event(Event::Udp4Connect).await;

            assert!(result.is_some());
        }
    }

    mod the_event_handler {
        use crate::core::statistics::{event_handler, Event, Repo};

        #[tokio::test]
        async fn should_increase_the_tcp4_announces_counter_when_it_receives_a_tcp4_announce_event() {
            let repository = Repo::new();

            event_handler(Event::Tcp4Announce, &repository).await;

            assert_eq!(repository.get_metrics().await.tcp4_announces_handled, 1);
        }

        #[tokio::test]
        async fn should_increase_the_tcp6_scrapes_counter_when_it_receives_a_tcp6_scrape_event() {
            let repository = Repo::new();

            event_handler(Event::Tcp6Scrape, &repository).await;

            assert_eq!(repository.get_metrics().await.tcp6_scrapes_handled, 1);
        }

        #[tokio::test]
        async fn should_increase_the_udp4_connections_counter_when_it_receives_a_udp4_connect_event() {
            let repository = Repo::new();

            event_handler(Event::Udp4Connect, &repository).await;

            assert_eq!(repository.get_metrics().await.udp4_connections_handled, 1);
        }

        #[tokio::test]
        async fn should_increase_the_udp6_announces_counter_when_it_receives_a_udp6_announce_event() {
            let repository = Repo::new();

            event_handler(Event::Udp6Announce, &repository).await;

            assert_eq!(repository.get_metrics().await.udp6_announces_handled, 1);
        }

        #[tokio::test]
        async fn should_increase_the_ws_announces_counter_when_it_receives_a_ws_announce_event() {
            let repository = Repo::new();

            event_handler(Event::WsAnnounce, &repository).await;

            assert_eq!(repository.get_metrics().await.ws_announces_handled, 1);
        }

        #[tokio::test]
        async fn should_increase_the_ws_scrapes_counter_when_it_receives_a_ws_scrape_event() {
            let repository = Repo::new();

            event_handler(Event::WsScrape, &repository).await;

            assert_eq!(repository.get_metrics().await.ws_scrapes_handled, 1);
        }
    }
}
