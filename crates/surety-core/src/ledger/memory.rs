//! In-memory simulation of the remote contract runtime.
//!
//! [`InMemoryLedger`] stands in for the consensus contract: it takes
//! registrations, assigns partition indices from a seedable RNG, emits
//! request events, and enforces the contract-side rejection rules on
//! submitted responses (unregistered oracle, index not held, unknown or
//! closed request, duplicate vote). A request closes once
//! `consensus_threshold` identical status votes accumulate; later votes
//! get the same stale-request rejection a real contract would produce.
//!
//! The ledger is the authoritative side of the simulation. Local code
//! never inspects it during dispatch; the inspection methods at the bottom
//! exist for tests and operator tooling.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::LedgerConfig;
use crate::event::{FlightKey, OracleRequestEvent, ResponseSubmission, SequencedEvent};
use crate::identity::{AccountId, Identity};
use crate::registry::PartitionIndex;
use crate::status::FlightStatus;

use super::{EventStream, LedgerClient, LedgerError, StakeWei};

/// Capacity of the live event fan-out channel.
///
/// A subscriber that falls further behind than this sees a
/// [`LedgerError::Stream`] item and continues from the live edge.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Contract-side state of one request.
#[derive(Debug)]
struct RequestState {
    partition_index: PartitionIndex,
    votes: Vec<(AccountId, FlightStatus)>,
    accepted: Option<FlightStatus>,
}

/// Mutable ledger state behind one lock.
#[derive(Debug)]
struct LedgerState {
    rng: StdRng,
    oracles: HashMap<AccountId, Vec<PartitionIndex>>,
    log: Vec<SequencedEvent>,
    requests: HashMap<Uuid, RequestState>,
}

/// Simulated remote contract runtime.
#[derive(Debug)]
pub struct InMemoryLedger {
    required_stake_wei: StakeWei,
    index_range: u8,
    indices_per_oracle: u8,
    consensus_threshold: usize,
    state: Mutex<LedgerState>,
    events: broadcast::Sender<SequencedEvent>,
}

impl InMemoryLedger {
    /// Build a ledger from its configuration section.
    #[must_use]
    pub fn new(config: &LedgerConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            required_stake_wei: config.required_stake_wei,
            index_range: config.index_range,
            indices_per_oracle: config.indices_per_oracle,
            consensus_threshold: config.consensus_threshold,
            state: Mutex::new(LedgerState {
                rng: StdRng::seed_from_u64(config.seed),
                oracles: HashMap::new(),
                log: Vec::new(),
                requests: HashMap::new(),
            }),
            events,
        }
    }

    /// Emit a request for `flight`, fanning out to a partition index the
    /// ledger picks the way the contract would.
    pub async fn emit_request(&self, flight: FlightKey, timestamp: u64) -> OracleRequestEvent {
        let mut state = self.state.lock().await;
        let raw = rand::Rng::gen_range(&mut state.rng, 0..self.index_range);
        let index = PartitionIndex::new_unchecked(raw);
        Self::emit_locked(&mut state, &self.events, index, flight, timestamp)
    }

    /// Emit a request pinned to a specific partition index.
    ///
    /// Used by tests and demo tooling that need a known fan-out target.
    pub async fn emit_request_at(
        &self,
        index: PartitionIndex,
        flight: FlightKey,
        timestamp: u64,
    ) -> OracleRequestEvent {
        let mut state = self.state.lock().await;
        Self::emit_locked(&mut state, &self.events, index, flight, timestamp)
    }

    fn emit_locked(
        state: &mut LedgerState,
        events: &broadcast::Sender<SequencedEvent>,
        index: PartitionIndex,
        flight: FlightKey,
        timestamp: u64,
    ) -> OracleRequestEvent {
        let event = OracleRequestEvent {
            partition_index: index,
            flight,
            timestamp,
            correlation_id: Uuid::new_v4(),
        };
        state.requests.insert(
            event.correlation_id,
            RequestState {
                partition_index: index,
                votes: Vec::new(),
                accepted: None,
            },
        );
        let sequenced = SequencedEvent {
            offset: state.log.len() as u64,
            event: event.clone(),
        };
        debug!(
            offset = sequenced.offset,
            index = %index,
            correlation_id = %event.correlation_id,
            "oracle request emitted"
        );
        state.log.push(sequenced.clone());
        // No receivers yet is fine; the log keeps the backlog.
        let _ = events.send(sequenced);
        event
    }

    /// Votes recorded so far for `correlation_id`, in arrival order.
    pub async fn responses(&self, correlation_id: Uuid) -> Vec<(AccountId, FlightStatus)> {
        self.state
            .lock()
            .await
            .requests
            .get(&correlation_id)
            .map(|request| request.votes.clone())
            .unwrap_or_default()
    }

    /// The status consensus accepted, if the request has closed.
    pub async fn accepted_status(&self, correlation_id: Uuid) -> Option<FlightStatus> {
        self.state
            .lock()
            .await
            .requests
            .get(&correlation_id)
            .and_then(|request| request.accepted)
    }

    /// Number of registered oracles.
    pub async fn oracle_count(&self) -> usize {
        self.state.lock().await.oracles.len()
    }

    /// Number of events emitted so far (the next subscription offset).
    pub async fn event_count(&self) -> u64 {
        self.state.lock().await.log.len() as u64
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn register_oracle(
        &self,
        identity: &Identity,
        stake_wei: StakeWei,
    ) -> Result<(), LedgerError> {
        if stake_wei < self.required_stake_wei {
            return Err(LedgerError::InsufficientStake {
                required_wei: self.required_stake_wei,
                offered_wei: stake_wei,
            });
        }
        let mut state = self.state.lock().await;
        if state.oracles.contains_key(&identity.account) {
            return Err(LedgerError::AlreadyRegistered(identity.account.clone()));
        }
        let picks = rand::seq::index::sample(
            &mut state.rng,
            usize::from(self.index_range),
            usize::from(self.indices_per_oracle),
        );
        let indices = picks
            .into_iter()
            .map(|raw| PartitionIndex::new_unchecked(raw as u8))
            .collect();
        state.oracles.insert(identity.account.clone(), indices);
        Ok(())
    }

    async fn assigned_indices(
        &self,
        identity: &Identity,
    ) -> Result<Vec<PartitionIndex>, LedgerError> {
        self.state
            .lock()
            .await
            .oracles
            .get(&identity.account)
            .cloned()
            .ok_or_else(|| LedgerError::NotRegistered(identity.account.clone()))
    }

    async fn subscribe(&self, from_offset: u64) -> Result<EventStream, LedgerError> {
        // Take the live receiver under the same lock emit_request holds
        // while appending, so nothing falls between backlog and live.
        let state = self.state.lock().await;
        let backlog: VecDeque<SequencedEvent> = state
            .log
            .iter()
            .filter(|sequenced| sequenced.offset >= from_offset)
            .cloned()
            .collect();
        let live = self.events.subscribe();
        drop(state);

        let stream = futures::stream::unfold(
            Subscription {
                backlog,
                live,
                next_offset: from_offset,
            },
            |mut subscription| async move {
                loop {
                    if let Some(sequenced) = subscription.backlog.pop_front() {
                        if sequenced.offset < subscription.next_offset {
                            continue;
                        }
                        subscription.next_offset = sequenced.offset + 1;
                        return Some((Ok(sequenced), subscription));
                    }
                    match subscription.live.recv().await {
                        Ok(sequenced) => {
                            // Events already replayed from the backlog show
                            // up again on the live channel; skip them.
                            if sequenced.offset < subscription.next_offset {
                                continue;
                            }
                            subscription.next_offset = sequenced.offset + 1;
                            return Some((Ok(sequenced), subscription));
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            return Some((
                                Err(LedgerError::Stream(format!(
                                    "subscriber lagged, {skipped} events skipped"
                                ))),
                                subscription,
                            ));
                        }
                        Err(broadcast::error::RecvError::Closed) => return None,
                    }
                }
            },
        );
        Ok(Box::pin(stream))
    }

    async fn submit_response(&self, submission: &ResponseSubmission) -> Result<(), LedgerError> {
        let mut state = self.state.lock().await;
        let account = &submission.identity.account;
        let Some(held) = state.oracles.get(account) else {
            return Err(LedgerError::NotRegistered(account.clone()));
        };
        if !held.contains(&submission.partition_index) {
            return Err(LedgerError::IndexNotHeld {
                account: account.clone(),
                index: submission.partition_index,
            });
        }
        let Some(request) = state.requests.get_mut(&submission.correlation_id) else {
            return Err(LedgerError::UnknownRequest(submission.correlation_id));
        };
        if request.accepted.is_some() {
            return Err(LedgerError::RequestClosed(submission.correlation_id));
        }
        if request.partition_index != submission.partition_index {
            return Err(LedgerError::IndexNotHeld {
                account: account.clone(),
                index: submission.partition_index,
            });
        }
        if request.votes.iter().any(|(voter, _)| voter == account) {
            return Err(LedgerError::DuplicateResponse {
                account: account.clone(),
                correlation_id: submission.correlation_id,
            });
        }
        request.votes.push((account.clone(), submission.status));
        let agreeing = request
            .votes
            .iter()
            .filter(|(_, status)| *status == submission.status)
            .count();
        if agreeing >= self.consensus_threshold {
            request.accepted = Some(submission.status);
            info!(
                correlation_id = %submission.correlation_id,
                status = submission.status.code(),
                votes = request.votes.len(),
                "consensus reached; request closed"
            );
        }
        Ok(())
    }
}

/// Per-subscriber cursor over backlog then live events.
struct Subscription {
    backlog: VecDeque<SequencedEvent>,
    live: broadcast::Receiver<SequencedEvent>,
    next_offset: u64,
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use crate::identity::IdentityPool;

    use super::*;

    fn test_config() -> LedgerConfig {
        LedgerConfig {
            required_stake_wei: 100,
            index_range: 10,
            indices_per_oracle: 3,
            consensus_threshold: 3,
            seed: 7,
        }
    }

    fn pool() -> IdentityPool {
        IdentityPool::simulated(1, 30)
    }

    fn flight() -> FlightKey {
        FlightKey {
            airline: AccountId::derive(1, 1),
            flight: "ND1309".to_string(),
        }
    }

    #[tokio::test]
    async fn registration_assigns_distinct_indices_in_range() {
        let ledger = InMemoryLedger::new(&test_config());
        let identity = pool().get(4).unwrap().clone();
        ledger.register_oracle(&identity, 100).await.unwrap();

        let indices = ledger.assigned_indices(&identity).await.unwrap();
        assert_eq!(indices.len(), 3);
        for pair in indices.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
        for index in indices {
            assert!(index.value() < 10);
        }
    }

    #[tokio::test]
    async fn assignment_is_stable_after_registration() {
        let ledger = InMemoryLedger::new(&test_config());
        let identity = pool().get(4).unwrap().clone();
        ledger.register_oracle(&identity, 100).await.unwrap();

        let first = ledger.assigned_indices(&identity).await.unwrap();
        let second = ledger.assigned_indices(&identity).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn underfunded_registration_rejected() {
        let ledger = InMemoryLedger::new(&test_config());
        let identity = pool().get(4).unwrap().clone();
        let err = ledger.register_oracle(&identity, 99).await.unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientStake {
                required_wei: 100,
                offered_wei: 99
            }
        );
    }

    #[tokio::test]
    async fn duplicate_registration_rejected() {
        let ledger = InMemoryLedger::new(&test_config());
        let identity = pool().get(4).unwrap().clone();
        ledger.register_oracle(&identity, 100).await.unwrap();
        let err = ledger.register_oracle(&identity, 100).await.unwrap_err();
        assert_eq!(err, LedgerError::AlreadyRegistered(identity.account));
    }

    #[tokio::test]
    async fn unregistered_identity_has_no_indices() {
        let ledger = InMemoryLedger::new(&test_config());
        let identity = pool().get(4).unwrap().clone();
        let err = ledger.assigned_indices(&identity).await.unwrap_err();
        assert_eq!(err, LedgerError::NotRegistered(identity.account));
    }

    #[tokio::test]
    async fn subscription_replays_backlog_then_delivers_live() {
        let ledger = InMemoryLedger::new(&test_config());
        let first = ledger.emit_request(flight(), 1_000).await;
        let second = ledger.emit_request(flight(), 2_000).await;

        let mut stream = ledger.subscribe(0).await.unwrap();
        let got_first = stream.next().await.unwrap().unwrap();
        let got_second = stream.next().await.unwrap().unwrap();
        assert_eq!(got_first.event, first);
        assert_eq!(got_second.event, second);

        let third = ledger.emit_request(flight(), 3_000).await;
        let got_third = stream.next().await.unwrap().unwrap();
        assert_eq!(got_third.offset, 2);
        assert_eq!(got_third.event, third);
    }

    #[tokio::test]
    async fn resubscription_resumes_from_offset() {
        let ledger = InMemoryLedger::new(&test_config());
        ledger.emit_request(flight(), 1_000).await;
        let second = ledger.emit_request(flight(), 2_000).await;

        let mut stream = ledger.subscribe(1).await.unwrap();
        let got = stream.next().await.unwrap().unwrap();
        assert_eq!(got.offset, 1);
        assert_eq!(got.event, second);
    }

    #[tokio::test]
    async fn vote_rules_enforced() {
        let ledger = InMemoryLedger::new(&test_config());
        let voter = pool().get(4).unwrap().clone();
        ledger.register_oracle(&voter, 100).await.unwrap();
        let held = ledger.assigned_indices(&voter).await.unwrap();

        // Pin the request to an index the voter is known to hold.
        let event = ledger.emit_request_at(held[0], flight(), 1_000).await;

        // Vote under an index the oracle does not hold.
        let unheld = (0..10u8)
            .map(PartitionIndex::new_unchecked)
            .find(|index| !held.contains(index))
            .unwrap();
        let mut bad = ResponseSubmission::answering(&event, voter.clone(), FlightStatus::OnTime);
        bad.partition_index = unheld;
        assert!(matches!(
            ledger.submit_response(&bad).await.unwrap_err(),
            LedgerError::IndexNotHeld { .. }
        ));

        // First vote lands.
        let vote = ResponseSubmission::answering(&event, voter.clone(), FlightStatus::OnTime);
        ledger.submit_response(&vote).await.unwrap();

        // Second vote from the same oracle is a duplicate.
        assert!(matches!(
            ledger.submit_response(&vote).await.unwrap_err(),
            LedgerError::DuplicateResponse { .. }
        ));

        // Unknown request.
        let mut stray = vote.clone();
        stray.correlation_id = Uuid::new_v4();
        assert!(matches!(
            ledger.submit_response(&stray).await.unwrap_err(),
            LedgerError::UnknownRequest(_)
        ));
    }

    #[tokio::test]
    async fn consensus_closes_the_request() {
        let ledger = InMemoryLedger::new(&test_config());

        // 12 oracles place 36 assignments over 10 indices, so some index
        // is held by at least 4 of them.
        let pool = pool();
        let mut holders: HashMap<PartitionIndex, Vec<Identity>> = HashMap::new();
        for slot in 0..12 {
            let identity = pool.get(slot).unwrap().clone();
            ledger.register_oracle(&identity, 100).await.unwrap();
            for index in ledger.assigned_indices(&identity).await.unwrap() {
                holders.entry(index).or_default().push(identity.clone());
            }
        }
        let (index, voters) = holders
            .into_iter()
            .find(|(_, voters)| voters.len() >= 4)
            .expect("pigeonhole guarantees a 4-holder index");

        let event = ledger.emit_request_at(index, flight(), 1_000).await;
        for voter in voters.iter().take(3) {
            let vote =
                ResponseSubmission::answering(&event, voter.clone(), FlightStatus::LateWeather);
            ledger.submit_response(&vote).await.unwrap();
        }
        assert_eq!(
            ledger.accepted_status(event.correlation_id).await,
            Some(FlightStatus::LateWeather)
        );

        // A straggler after consensus gets the stale-request rejection.
        let late =
            ResponseSubmission::answering(&event, voters[3].clone(), FlightStatus::LateWeather);
        assert!(matches!(
            ledger.submit_response(&late).await.unwrap_err(),
            LedgerError::RequestClosed(_)
        ));
    }
}
