//! Registration coordinator.
//!
//! Drives every identity in the oracle sub-range through the one-time
//! registration handshake and populates the index registry from the
//! indices the remote service assigned. Runs once at startup.
//!
//! Failure isolation: each identity's handshake is independent. A failed
//! registration or index query logs and skips that identity; the rest of
//! the pool keeps going and the daemon comes up with partial coverage
//! rather than halting.

use std::sync::Arc;
use std::time::Duration;

use surety_core::ledger::StakeWei;
use surety_core::{Identity, IndexRegistry, LedgerClient, LedgerError};
use tracing::{debug, error, info, warn};

use crate::submit::bounded;

/// Outcome of one registration pass over the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationReport {
    /// Identities that completed the handshake and hold registry entries.
    pub registered: usize,
    /// Identities skipped after a registration or index-query failure.
    pub failed: usize,
    /// Total (index, identity) assignments recorded.
    pub assignments: usize,
}

impl RegistrationReport {
    /// Whether startup should be treated as failed.
    ///
    /// Zero registered oracles means the process would sit on the event
    /// stream with nothing to say; that is surfaced to the operator
    /// instead of silently running.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.registered == 0
    }
}

/// Runs the registration handshake for the oracle identity pool.
pub struct RegistrationCoordinator {
    ledger: Arc<dyn LedgerClient>,
    registry: Arc<IndexRegistry>,
    stake_wei: StakeWei,
    rpc_timeout: Duration,
}

impl RegistrationCoordinator {
    /// Create a coordinator submitting `stake_wei` per registration, with
    /// every remote call bounded by `rpc_timeout`.
    #[must_use]
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        registry: Arc<IndexRegistry>,
        stake_wei: StakeWei,
        rpc_timeout: Duration,
    ) -> Self {
        Self {
            ledger,
            registry,
            stake_wei,
            rpc_timeout,
        }
    }

    /// Register `oracles` and populate the registry.
    ///
    /// Registrations are issued in pool order but the per-identity
    /// sequences interleave freely; the only ordering requirement is
    /// intra-identity (confirmed registration before the index query),
    /// which [`LedgerClient::register_oracle`] resolving on confirmation
    /// provides.
    pub async fn run(&self, oracles: &[Identity]) -> RegistrationReport {
        info!(count = oracles.len(), "registering oracle identities");

        let outcomes =
            futures::future::join_all(oracles.iter().map(|identity| self.register_one(identity)))
                .await;

        let mut report = RegistrationReport {
            registered: 0,
            failed: 0,
            assignments: 0,
        };
        for outcome in outcomes {
            match outcome {
                Some(assignments) => {
                    report.registered += 1;
                    report.assignments += assignments;
                }
                None => report.failed += 1,
            }
        }
        info!(
            registered = report.registered,
            failed = report.failed,
            assignments = report.assignments,
            "registration pass complete"
        );
        report
    }

    /// One identity's handshake: register, await confirmation, query
    /// indices, record them. Returns the number of assignments recorded,
    /// or `None` if the identity contributed nothing.
    async fn register_one(&self, identity: &Identity) -> Option<usize> {
        match bounded(
            "register_oracle",
            self.rpc_timeout,
            self.ledger.register_oracle(identity, self.stake_wei),
        )
        .await
        {
            Ok(()) => debug!(oracle = %identity, "registration confirmed"),
            // Re-registration on a restart is expected; the assigned
            // indices are still valid and must be recovered.
            Err(LedgerError::AlreadyRegistered(_)) => {
                debug!(oracle = %identity, "already registered; recovering indices");
            }
            Err(error) => {
                warn!(oracle = %identity, %error, "registration failed; skipping identity");
                return None;
            }
        }

        let indices = match bounded(
            "assigned_indices",
            self.rpc_timeout,
            self.ledger.assigned_indices(identity),
        )
        .await
        {
            Ok(indices) => indices,
            Err(error) => {
                warn!(oracle = %identity, %error, "index query failed; skipping identity");
                return None;
            }
        };

        info!(oracle = %identity, ?indices, "assigned partition indices");
        let mut recorded = 0;
        for index in indices {
            match self.registry.insert(index, identity.clone()).await {
                Ok(()) => recorded += 1,
                // A duplicate assignment means this identity went through
                // the handshake twice; the registry entry is already
                // correct, so log the violation and keep the process up.
                Err(error) => error!(oracle = %identity, %error, "registry invariant violated"),
            }
        }
        Some(recorded)
    }
}
