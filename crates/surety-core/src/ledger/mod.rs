//! Ledger client abstraction.
//!
//! The remote contract runtime — registration, index assignment, the
//! request event stream, and response submission — is consumed through the
//! [`LedgerClient`] trait. The daemon never sees consensus or persistence
//! details; it observes only the narrow operations below and the
//! [`LedgerError`] taxonomy.
//!
//! [`memory::InMemoryLedger`] is the simulation backend used by the daemon
//! and the test suite.

pub mod memory;

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;
use uuid::Uuid;

use crate::event::{ResponseSubmission, SequencedEvent};
use crate::identity::{AccountId, Identity};
use crate::registry::PartitionIndex;

/// Stake amounts in wei.
pub type StakeWei = u128;

/// Stream of sequenced request events.
///
/// `Err` items are transport-level stream errors; consumers log them and
/// keep reading. The stream ending means the subscription dropped and the
/// consumer should re-subscribe from its last offset.
pub type EventStream = BoxStream<'static, Result<SequencedEvent, LedgerError>>;

/// Failures surfaced by the remote service.
///
/// Every variant is recoverable at the call site: registration failures
/// skip one identity, submission rejections skip one vote, stream errors
/// keep the subscription alive. Callers decide severity; the taxonomy only
/// names what happened.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LedgerError {
    /// The identity already completed the registration handshake.
    #[error("account {0} is already registered as an oracle")]
    AlreadyRegistered(AccountId),

    /// The attached stake is below the contract's requirement.
    #[error("stake {offered_wei} wei below required {required_wei} wei")]
    InsufficientStake {
        /// Stake the contract requires.
        required_wei: StakeWei,
        /// Stake that was attached.
        offered_wei: StakeWei,
    },

    /// The identity never completed registration.
    #[error("account {0} is not a registered oracle")]
    NotRegistered(AccountId),

    /// The identity does not hold the partition index it voted under.
    #[error("account {account} does not hold partition index {index}")]
    IndexNotHeld {
        /// The submitting account.
        account: AccountId,
        /// The index the vote claimed.
        index: PartitionIndex,
    },

    /// The request reached consensus before this vote arrived.
    #[error("request {0} is already closed")]
    RequestClosed(Uuid),

    /// No open request matches the submission.
    #[error("no open request matches correlation id {0}")]
    UnknownRequest(Uuid),

    /// The identity already voted on this request.
    #[error("account {account} already responded to request {correlation_id}")]
    DuplicateResponse {
        /// The submitting account.
        account: AccountId,
        /// The request that already holds its vote.
        correlation_id: Uuid,
    },

    /// Transport-level error on the event subscription.
    #[error("event stream error: {0}")]
    Stream(String),

    /// The remote service could not be reached at all.
    #[error("remote service unreachable: {0}")]
    Unreachable(String),

    /// A remote call exceeded its bounded timeout.
    #[error("{operation} timed out after {limit_ms} ms")]
    Timeout {
        /// The operation that hung.
        operation: &'static str,
        /// The configured bound.
        limit_ms: u64,
    },
}

/// Narrow interface to the remote contract runtime.
///
/// # Ordering contract
///
/// `register_oracle` resolves only once the registration is confirmed by
/// the remote service, so a caller that awaits it before calling
/// `assigned_indices` gets the required confirmed-before-query sequencing
/// for free. Calls for *different* identities carry no ordering
/// requirement and may run concurrently.
///
/// # Submission semantics
///
/// `submit_response` is a state-mutating call acknowledged by the service
/// (not a read-only probe); rejection reasons come back as typed
/// [`LedgerError`] values so callers can log and move on.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Register `identity` as an oracle, attaching `stake_wei`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::AlreadyRegistered`],
    /// [`LedgerError::InsufficientStake`], or a transport failure.
    async fn register_oracle(
        &self,
        identity: &Identity,
        stake_wei: StakeWei,
    ) -> Result<(), LedgerError>;

    /// The partition indices the service assigned to `identity`.
    ///
    /// Deterministic per identity once registration confirmed; the remote
    /// service is authoritative.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotRegistered`] or a transport failure.
    async fn assigned_indices(&self, identity: &Identity)
        -> Result<Vec<PartitionIndex>, LedgerError>;

    /// Subscribe to the request event stream starting at `from_offset`.
    ///
    /// The stream replays any backlog at or past the offset before
    /// delivering live events, so a consumer can resume after a transport
    /// drop without reprocessing events it already handled.
    ///
    /// # Errors
    ///
    /// Returns a transport failure if the subscription cannot be opened.
    async fn subscribe(&self, from_offset: u64) -> Result<EventStream, LedgerError>;

    /// Submit one oracle's response and await the acknowledgement.
    ///
    /// # Errors
    ///
    /// Returns the rejection reason: [`LedgerError::NotRegistered`],
    /// [`LedgerError::IndexNotHeld`], [`LedgerError::UnknownRequest`],
    /// [`LedgerError::RequestClosed`], or
    /// [`LedgerError::DuplicateResponse`].
    async fn submit_response(&self, submission: &ResponseSubmission) -> Result<(), LedgerError>;
}
