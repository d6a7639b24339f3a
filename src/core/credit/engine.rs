//! Delta computation and transaction emission.
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reef_tracker_configuration::CreditPolicy;
use reef_tracker_primitives::info_hash::InfoHash;
use reef_tracker_primitives::peer::{self, Peer};
use reef_tracker_primitives::NumberOfBytes;
use tracing::{debug, info, warn};

use super::{Session, SessionKey};
use crate::core::repositories::{
    CreditTransaction, Ledger, Observability, TrackerEvent, TransactionKind, UserId, UserProfile,
};

/// The credit engine. One instance per tracker process.
///
/// Sessions are in-memory only; after a restart the first announce of every
/// client opens a fresh session and contributes no delta.
pub struct CreditEngine {
    policy: CreditPolicy,
    sessions: Mutex<HashMap<SessionKey, Session>>,
    /// Who a swarm slot belongs to. Lets eviction and expiry diffs, which
    /// only know `(info_hash, peer_id)`, close the right session.
    peer_owners: Mutex<HashMap<(InfoHash, peer::Id), UserId>>,
    ledger: Arc<dyn Ledger>,
    observability: Arc<dyn Observability>,
}

impl CreditEngine {
    #[must_use]
    pub fn new(policy: CreditPolicy, ledger: Arc<dyn Ledger>, observability: Arc<dyn Observability>) -> Self {
        Self {
            policy,
            sessions: Mutex::new(HashMap::new()),
            peer_owners: Mutex::new(HashMap::new()),
            ledger,
            observability,
        }
    }

    /// Diffs the announce against the user's session and returns the credit
    /// transactions to write. The caller persists them with
    /// [`settle`](Self::settle) after releasing the swarm lock.
    ///
    /// `swarm_has_receivers` tells the cheating heuristics whether any other
    /// peer in the swarm could have received uploaded bytes.
    pub fn process_announce(
        &self,
        profile: &UserProfile,
        info_hash: &InfoHash,
        peer: &Peer,
        swarm_has_receivers: bool,
    ) -> Vec<CreditTransaction> {
        let key = SessionKey {
            user_id: profile.user_id,
            info_hash: *info_hash,
        };
        let now = peer.updated;

        let (upload_delta, download_delta, elapsed) = {
            let mut sessions = self.sessions.lock().expect("session table lock is never poisoned");

            let deltas = match sessions.get(&key) {
                Some(session) => Self::diff_session(session, peer, self.policy.session_reset_threshold_secs),
                None => None,
            };

            match deltas {
                Some((upload_delta, download_delta, elapsed)) => {
                    let session = sessions.get_mut(&key).expect("session was just read");
                    session.last_uploaded = peer.uploaded;
                    session.last_downloaded = peer.downloaded;
                    session.last_announce = now;
                    (upload_delta, download_delta, elapsed)
                }
                None => {
                    // First announce, gap past the reset threshold, or a
                    // counter rollback: baseline only, zero delta.
                    sessions.insert(key, Session::opened_at(now, peer.uploaded, peer.downloaded));
                    (0, 0, Duration::ZERO)
                }
            }
        };

        if peer.event == reef_tracker_primitives::announce_event::AnnounceEvent::Stopped {
            self.close_session(info_hash, &peer.peer_id, &profile.user_id);
        } else {
            self.peer_owners
                .lock()
                .expect("owner table lock is never poisoned")
                .insert((*info_hash, peer.peer_id), profile.user_id);
        }

        self.report_suspicious_deltas(profile, info_hash, upload_delta, elapsed, swarm_has_receivers);

        let mut transactions = Vec::new();

        if upload_delta > 0 {
            transactions.push(CreditTransaction {
                user_id: profile.user_id,
                info_hash: *info_hash,
                kind: TransactionKind::Upload,
                bytes: apply_multiplier(upload_delta, self.policy.upload_reward_rate),
                multiplier_applied: self.policy.upload_reward_rate,
                timestamp: now,
            });
        }

        if download_delta > 0 {
            transactions.push(CreditTransaction {
                user_id: profile.user_id,
                info_hash: *info_hash,
                kind: TransactionKind::Download,
                bytes: apply_multiplier(download_delta, profile.download_multiplier),
                multiplier_applied: profile.download_multiplier,
                timestamp: now,
            });
        }

        debug!(
            user_id = profile.user_id,
            %info_hash,
            upload_delta,
            download_delta,
            "credit deltas computed"
        );

        transactions
    }

    /// `Some((upload_delta, download_delta, elapsed))` when the session
    /// continues; `None` when a new one must be opened.
    fn diff_session(session: &Session, peer: &Peer, reset_threshold_secs: u64) -> Option<(i64, i64, Duration)> {
        let elapsed = peer.updated.saturating_sub(session.last_announce);

        if elapsed > Duration::from_secs(reset_threshold_secs) {
            return None;
        }

        if peer.uploaded < session.last_uploaded || peer.downloaded < session.last_downloaded {
            return None;
        }

        Some((
            peer.uploaded.0 - session.last_uploaded.0,
            peer.downloaded.0 - session.last_downloaded.0,
            elapsed,
        ))
    }

    /// Closes the session a swarm slot belonged to. Called for `stopped`
    /// announces and for eviction/expiry diffs.
    pub fn close_session_for_peer(&self, info_hash: &InfoHash, peer_id: &peer::Id) {
        let owner = self
            .peer_owners
            .lock()
            .expect("owner table lock is never poisoned")
            .remove(&(*info_hash, *peer_id));

        if let Some(user_id) = owner {
            self.sessions
                .lock()
                .expect("session table lock is never poisoned")
                .remove(&SessionKey {
                    user_id,
                    info_hash: *info_hash,
                });
        }
    }

    fn close_session(&self, info_hash: &InfoHash, peer_id: &peer::Id, user_id: &UserId) {
        self.peer_owners
            .lock()
            .expect("owner table lock is never poisoned")
            .remove(&(*info_hash, *peer_id));
        self.sessions
            .lock()
            .expect("session table lock is never poisoned")
            .remove(&SessionKey {
                user_id: *user_id,
                info_hash: *info_hash,
            });
    }

    fn report_suspicious_deltas(
        &self,
        profile: &UserProfile,
        info_hash: &InfoHash,
        upload_delta: i64,
        elapsed: Duration,
        swarm_has_receivers: bool,
    ) {
        if upload_delta <= 0 {
            return;
        }

        if !swarm_has_receivers {
            self.observability.emit(TrackerEvent::SuspiciousUploadNoReceivers {
                user_id: profile.user_id,
                info_hash: *info_hash,
                delta: NumberOfBytes(upload_delta),
            });
        }

        #[allow(clippy::cast_precision_loss)]
        let capacity_bound = self.policy.link_capacity_bytes_per_sec as f64 * elapsed.as_secs_f64();
        #[allow(clippy::cast_precision_loss)]
        if !elapsed.is_zero() && upload_delta as f64 > capacity_bound {
            self.observability.emit(TrackerEvent::SuspiciousUploadRate {
                user_id: profile.user_id,
                info_hash: *info_hash,
                delta: NumberOfBytes(upload_delta),
                elapsed,
            });
        }
    }

    /// Writes the transactions through the ledger port: each one gets its
    /// own deadline and up to `ledger_write_retries` retries on transient
    /// errors. Permanent errors and exhausted retries drop the transaction
    /// with a log line. Meant to run after the announce response is already
    /// on its way.
    pub async fn settle(&self, transactions: Vec<CreditTransaction>) {
        for transaction in transactions {
            self.write_with_retry(&transaction).await;
        }
    }

    async fn write_with_retry(&self, transaction: &CreditTransaction) {
        let deadline = Duration::from_secs(self.policy.ledger_write_timeout_secs);

        for attempt in 0..=self.policy.ledger_write_retries {
            match tokio::time::timeout(deadline, self.ledger.write_transaction(transaction)).await {
                Ok(Ok(())) => return,
                Ok(Err(error)) if error.is_transient() => {
                    info!(attempt, %error, "transient ledger failure, retrying");
                }
                Ok(Err(error)) => {
                    warn!(%error, user_id = transaction.user_id, "dropping credit transaction after permanent ledger failure");
                    return;
                }
                Err(_) => {
                    info!(attempt, "ledger write timed out, retrying");
                }
            }
        }

        warn!(
            user_id = transaction.user_id,
            info_hash = %transaction.info_hash,
            "dropping credit transaction after exhausting ledger retries"
        );
    }
}

fn apply_multiplier(delta: i64, multiplier: f64) -> u64 {
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let bytes = (delta as f64 * multiplier).round() as u64;
    bytes
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use reef_tracker_configuration::CreditPolicy;
    use reef_tracker_primitives::announce_event::AnnounceEvent;
    use reef_tracker_primitives::info_hash::InfoHash;
    use reef_tracker_primitives::peer::fixture::PeerBuilder;
    use reef_tracker_primitives::peer::Peer;
    use reef_tracker_primitives::NumberOfBytes;

    use super::CreditEngine;
    use crate::core::repositories::in_memory::{InMemoryLedger, RecordingObservability};
    use crate::core::repositories::{TrackerEvent, TransactionKind, UserClass, UserProfile};

    fn sample_info_hash() -> InfoHash {
        InfoHash([0xAA; 20])
    }

    fn member(multiplier: f64) -> UserProfile {
        UserProfile {
            user_id: 1,
            class: UserClass::Member,
            download_multiplier: multiplier,
            is_banned: false,
        }
    }

    fn announcing_peer(uploaded: i64, downloaded: i64, at_secs: u64) -> Peer {
        let mut peer = PeerBuilder::leecher().last_updated_on(Duration::from_secs(at_secs)).build();
        peer.uploaded = NumberOfBytes(uploaded);
        peer.downloaded = NumberOfBytes(downloaded);
        peer
    }

    struct Setup {
        engine: CreditEngine,
        ledger: Arc<InMemoryLedger>,
        observability: Arc<RecordingObservability>,
    }

    fn engine_with(policy: CreditPolicy) -> Setup {
        let ledger = Arc::new(InMemoryLedger::default());
        let observability = Arc::new(RecordingObservability::default());

        Setup {
            engine: CreditEngine::new(policy, ledger.clone(), observability.clone()),
            ledger,
            observability,
        }
    }

    fn engine() -> Setup {
        engine_with(CreditPolicy::default())
    }

    #[test]
    fn the_first_announce_of_a_session_should_contribute_zero_delta() {
        let setup = engine();

        let transactions =
            setup
                .engine
                .process_announce(&member(1.0), &sample_info_hash(), &announcing_peer(5000, 3000, 100), true);

        assert!(transactions.is_empty());
    }

    #[test]
    fn successive_announces_should_emit_the_counter_diffs() {
        let setup = engine();
        let profile = member(1.0);

        setup
            .engine
            .process_announce(&profile, &sample_info_hash(), &announcing_peer(0, 0, 100), true);

        let transactions = setup
            .engine
            .process_announce(&profile, &sample_info_hash(), &announcing_peer(1000, 500, 110), true);

        assert_eq!(transactions.len(), 2);
        assert_eq!(transactions[0].kind, TransactionKind::Upload);
        assert_eq!(transactions[0].bytes, 1000);
        assert_eq!(transactions[1].kind, TransactionKind::Download);
        assert_eq!(transactions[1].bytes, 500);
    }

    #[test]
    fn an_announce_with_unchanged_counters_should_emit_nothing() {
        let setup = engine();
        let profile = member(1.0);

        setup
            .engine
            .process_announce(&profile, &sample_info_hash(), &announcing_peer(1000, 500, 100), true);
        setup
            .engine
            .process_announce(&profile, &sample_info_hash(), &announcing_peer(1000, 500, 110), true);

        let transactions = setup
            .engine
            .process_announce(&profile, &sample_info_hash(), &announcing_peer(1000, 500, 120), true);

        assert!(transactions.is_empty());
    }

    #[test]
    fn the_sum_of_upload_deltas_should_equal_the_counter_span() {
        let setup = engine();
        let profile = member(1.0);

        let counters = [0i64, 100, 250, 250, 900, 1500];
        let mut total = 0u64;

        for (i, uploaded) in counters.iter().enumerate() {
            let peer = announcing_peer(*uploaded, 0, 100 + (i as u64) * 10);
            for transaction in setup.engine.process_announce(&profile, &sample_info_hash(), &peer, true) {
                if transaction.kind == TransactionKind::Upload {
                    total += transaction.bytes;
                }
            }
        }

        assert_eq!(total, 1500);
    }

    #[test]
    fn a_counter_decrease_should_open_a_new_session_with_zero_delta() {
        let setup = engine();
        let profile = member(1.0);

        setup
            .engine
            .process_announce(&profile, &sample_info_hash(), &announcing_peer(5000, 0, 100), true);

        let transactions = setup
            .engine
            .process_announce(&profile, &sample_info_hash(), &announcing_peer(1000, 0, 110), true);
        assert!(transactions.is_empty());

        // The decreased value became the new baseline.
        let transactions = setup
            .engine
            .process_announce(&profile, &sample_info_hash(), &announcing_peer(1300, 0, 120), true);
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].bytes, 300);
    }

    #[test]
    fn a_gap_past_the_reset_threshold_should_open_a_new_session() {
        let setup = engine();
        let profile = member(1.0);

        setup
            .engine
            .process_announce(&profile, &sample_info_hash(), &announcing_peer(0, 0, 100), true);

        // 31 minutes of silence with the default 30 minute threshold.
        let transactions = setup
            .engine
            .process_announce(&profile, &sample_info_hash(), &announcing_peer(9000, 0, 100 + 31 * 60), true);

        assert!(transactions.is_empty());
    }

    #[test]
    fn the_download_multiplier_should_scale_emitted_bytes() {
        let setup = engine();
        let newbie = UserProfile {
            user_id: 2,
            class: UserClass::Newbie,
            download_multiplier: 2.0,
            is_banned: false,
        };

        setup
            .engine
            .process_announce(&newbie, &sample_info_hash(), &announcing_peer(0, 0, 100), true);

        let transactions = setup
            .engine
            .process_announce(&newbie, &sample_info_hash(), &announcing_peer(0, 1000, 110), true);

        assert_eq!(transactions[0].kind, TransactionKind::Download);
        assert_eq!(transactions[0].bytes, 2000);
        assert!((transactions[0].multiplier_applied - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn a_multiplier_change_should_apply_from_the_next_emission() {
        let setup = engine();

        setup
            .engine
            .process_announce(&member(1.0), &sample_info_hash(), &announcing_peer(0, 0, 100), true);

        // Same user, upgraded class mid-session.
        let mut upgraded = member(0.5);
        upgraded.class = UserClass::Elite;

        let transactions = setup
            .engine
            .process_announce(&upgraded, &sample_info_hash(), &announcing_peer(0, 1000, 110), true);

        assert_eq!(transactions[0].bytes, 500);
    }

    #[test]
    fn a_stopped_announce_should_settle_the_final_delta_and_close_the_session() {
        let setup = engine();
        let profile = member(1.0);

        setup
            .engine
            .process_announce(&profile, &sample_info_hash(), &announcing_peer(0, 0, 100), true);

        let mut leaving = announcing_peer(700, 0, 110);
        leaving.event = AnnounceEvent::Stopped;

        let transactions = setup.engine.process_announce(&profile, &sample_info_hash(), &leaving, true);
        assert_eq!(transactions[0].bytes, 700);

        // The next announce starts from a fresh baseline.
        let transactions = setup
            .engine
            .process_announce(&profile, &sample_info_hash(), &announcing_peer(9000, 0, 120), true);
        assert!(transactions.is_empty());
    }

    #[test]
    fn closing_a_session_by_peer_should_use_the_owner_index() {
        let setup = engine();
        let profile = member(1.0);
        let peer = announcing_peer(0, 0, 100);

        setup.engine.process_announce(&profile, &sample_info_hash(), &peer, true);

        setup.engine.close_session_for_peer(&sample_info_hash(), &peer.peer_id);

        // Fresh baseline after the forced close.
        let transactions = setup
            .engine
            .process_announce(&profile, &sample_info_hash(), &announcing_peer(5000, 0, 110), true);
        assert!(transactions.is_empty());
    }

    #[test]
    fn an_upload_with_no_possible_receiver_should_be_flagged() {
        let setup = engine();
        let profile = member(1.0);

        setup
            .engine
            .process_announce(&profile, &sample_info_hash(), &announcing_peer(0, 0, 100), false);
        setup
            .engine
            .process_announce(&profile, &sample_info_hash(), &announcing_peer(1000, 0, 110), false);

        let events = setup.observability.events();
        assert!(events
            .iter()
            .any(|event| matches!(event, TrackerEvent::SuspiciousUploadNoReceivers { .. })));
    }

    #[test]
    fn an_upload_faster_than_the_link_capacity_should_be_flagged() {
        let policy = CreditPolicy {
            link_capacity_bytes_per_sec: 100,
            ..CreditPolicy::default()
        };
        let setup = engine_with(policy);
        let profile = member(1.0);

        setup
            .engine
            .process_announce(&profile, &sample_info_hash(), &announcing_peer(0, 0, 100), true);
        // 10_000 bytes in 10 seconds against a 100 B/s ceiling.
        setup
            .engine
            .process_announce(&profile, &sample_info_hash(), &announcing_peer(10_000, 0, 110), true);

        let events = setup.observability.events();
        assert!(events
            .iter()
            .any(|event| matches!(event, TrackerEvent::SuspiciousUploadRate { .. })));
    }

    #[tokio::test]
    async fn settle_should_retry_transient_ledger_failures() {
        let setup = engine();
        let profile = member(1.0);

        setup
            .engine
            .process_announce(&profile, &sample_info_hash(), &announcing_peer(0, 0, 100), true);
        let transactions = setup
            .engine
            .process_announce(&profile, &sample_info_hash(), &announcing_peer(1000, 0, 110), true);

        setup.ledger.fail_next_writes(2);
        setup.engine.settle(transactions).await;

        assert_eq!(setup.ledger.transactions().len(), 1);
        assert_eq!(setup.ledger.transactions()[0].bytes, 1000);
    }

    #[tokio::test]
    async fn settle_should_drop_the_transaction_when_retries_are_exhausted() {
        let setup = engine();
        let profile = member(1.0);

        setup
            .engine
            .process_announce(&profile, &sample_info_hash(), &announcing_peer(0, 0, 100), true);
        let transactions = setup
            .engine
            .process_announce(&profile, &sample_info_hash(), &announcing_peer(1000, 0, 110), true);

        // Default policy allows 3 retries (4 attempts in total).
        setup.ledger.fail_next_writes(10);
        setup.engine.settle(transactions).await;

        assert!(setup.ledger.transactions().is_empty());
    }
}
