//! Simulated signer identities.
//!
//! The oracle network runs against a fixed ordered pool of signer handles,
//! mirroring the account list a local development chain hands out. Accounts
//! are derived deterministically from a pool seed so that runs are
//! reproducible; the handle itself is opaque to the rest of the system.
//!
//! The pool reserves its leading slots for other roles (contract owner,
//! airlines, passengers); oracles are drawn from a configurable sub-range.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Opaque printable signer handle.
///
/// Rendered as a 0x-prefixed 20-byte hex string, matching the address
/// format of the chain accounts it simulates. Only equality and display
/// matter to callers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    /// Derive the account handle for pool slot `slot` under `pool_seed`.
    #[must_use]
    pub fn derive(pool_seed: u64, slot: usize) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"surety-account-v1");
        hasher.update(pool_seed.to_be_bytes());
        hasher.update((slot as u64).to_be_bytes());
        let digest = hasher.finalize();
        let mut out = String::with_capacity(42);
        out.push_str("0x");
        for byte in &digest[..20] {
            out.push_str(&format!("{byte:02x}"));
        }
        Self(out)
    }

    /// The printable form of the handle.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A signer identity participating as a simulated oracle.
///
/// `ordinal` is the identity's position in the full pool and is used only
/// for logging and bookkeeping; the remote service knows the identity by
/// its `account` handle alone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    /// Position in the identity pool.
    pub ordinal: usize,
    /// Opaque signer handle.
    pub account: AccountId,
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "oracle[{}]({})", self.ordinal, self.account)
    }
}

/// Fixed ordered list of signer identities, built once at startup.
#[derive(Debug, Clone)]
pub struct IdentityPool {
    identities: Vec<Identity>,
}

impl IdentityPool {
    /// Build a pool of `size` identities derived from `pool_seed`.
    #[must_use]
    pub fn simulated(pool_seed: u64, size: usize) -> Self {
        let identities = (0..size)
            .map(|ordinal| Identity {
                ordinal,
                account: AccountId::derive(pool_seed, ordinal),
            })
            .collect();
        Self { identities }
    }

    /// Total number of identities in the pool.
    #[must_use]
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    /// Whether the pool is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    /// The sub-range `[offset, offset + count)` reserved for oracle
    /// simulation, in pool order.
    ///
    /// Returns fewer than `count` identities if the range runs past the end
    /// of the pool; configuration validation rejects that case up front, so
    /// hitting it here means the caller bypassed validation.
    #[must_use]
    pub fn oracle_range(&self, offset: usize, count: usize) -> &[Identity] {
        let start = offset.min(self.identities.len());
        let end = offset.saturating_add(count).min(self.identities.len());
        &self.identities[start..end]
    }

    /// Identity at `ordinal`, if the pool is that large.
    #[must_use]
    pub fn get(&self, ordinal: usize) -> Option<&Identity> {
        self.identities.get(ordinal)
    }
}
