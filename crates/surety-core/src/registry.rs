//! Partition index registry.
//!
//! The remote contract assigns every registered oracle a small set of
//! partition indices and later fans each request out to one index. The
//! registry is the local inverse of that assignment: index -> identities,
//! built once by the registration coordinator and read by the dispatcher
//! for the life of the process.
//!
//! Access pattern: append-only inserts during the registration phase,
//! read-only lookups during dispatch. Insertion and early dispatch may
//! overlap, so both paths go through a `tokio::sync::RwLock`.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::identity::Identity;

/// A partition index assigned by the remote service.
///
/// Small non-negative integer in `[0, index_range)`; not unique per
/// identity — several oracles typically share each index.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PartitionIndex(u8);

impl PartitionIndex {
    /// Wrap a raw index without range checking.
    ///
    /// The remote service is authoritative for the valid range; local code
    /// never fabricates indices, it only echoes what the service assigned.
    #[must_use]
    pub const fn new_unchecked(raw: u8) -> Self {
        Self(raw)
    }

    /// The raw index value.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Display for PartitionIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registry invariant violations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// An identity was inserted twice under the same index.
    ///
    /// Registration runs once per identity, so a duplicate insert means an
    /// identity went through the handshake twice.
    #[error("identity {identity} already registered under index {index}")]
    DuplicateAssignment {
        /// The identity that was already present.
        identity: Identity,
        /// The index it was already registered under.
        index: PartitionIndex,
    },
}

/// Mapping from partition index to the identities assigned that index.
///
/// Lists preserve insertion order. The dispatcher only ever needs
/// [`IndexRegistry::matching`]; registration internals stay behind this
/// narrow surface.
#[derive(Debug, Default)]
pub struct IndexRegistry {
    inner: RwLock<HashMap<PartitionIndex, Vec<Identity>>>,
}

impl IndexRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `identity` under `index`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateAssignment`] if the identity is
    /// already present under that index.
    pub async fn insert(
        &self,
        index: PartitionIndex,
        identity: Identity,
    ) -> Result<(), RegistryError> {
        let mut inner = self.inner.write().await;
        let entry = inner.entry(index).or_default();
        if entry.contains(&identity) {
            return Err(RegistryError::DuplicateAssignment { identity, index });
        }
        entry.push(identity);
        Ok(())
    }

    /// Identities registered under `index`, in insertion order.
    ///
    /// An empty result is expected when the remote assignment range exceeds
    /// the local registration count; callers treat it as a skip, not an
    /// error.
    pub async fn matching(&self, index: PartitionIndex) -> Vec<Identity> {
        self.inner
            .read()
            .await
            .get(&index)
            .cloned()
            .unwrap_or_default()
    }

    /// Total number of (index, identity) assignments held.
    pub async fn assignment_count(&self) -> usize {
        self.inner.read().await.values().map(Vec::len).sum()
    }

    /// Number of distinct indices with at least one identity.
    pub async fn index_count(&self) -> usize {
        self.inner.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use crate::identity::IdentityPool;

    use super::*;

    fn identities(n: usize) -> Vec<Identity> {
        IdentityPool::simulated(1, n).oracle_range(0, n).to_vec()
    }

    #[tokio::test]
    async fn matching_returns_identities_in_insertion_order() {
        let registry = IndexRegistry::new();
        let ids = identities(3);
        let index = PartitionIndex::new_unchecked(4);
        for identity in &ids {
            registry.insert(index, identity.clone()).await.unwrap();
        }
        assert_eq!(registry.matching(index).await, ids);
    }

    #[tokio::test]
    async fn matching_unknown_index_is_empty() {
        let registry = IndexRegistry::new();
        assert!(registry
            .matching(PartitionIndex::new_unchecked(9))
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn duplicate_insert_is_an_invariant_violation() {
        let registry = IndexRegistry::new();
        let identity = identities(1).remove(0);
        let index = PartitionIndex::new_unchecked(2);
        registry.insert(index, identity.clone()).await.unwrap();
        let err = registry.insert(index, identity.clone()).await.unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateAssignment { identity, index }
        );
    }

    #[tokio::test]
    async fn same_identity_under_different_indices_is_fine() {
        let registry = IndexRegistry::new();
        let identity = identities(1).remove(0);
        for raw in [1u8, 5, 8] {
            registry
                .insert(PartitionIndex::new_unchecked(raw), identity.clone())
                .await
                .unwrap();
        }
        assert_eq!(registry.assignment_count().await, 3);
        assert_eq!(registry.index_count().await, 3);
    }

    #[tokio::test]
    async fn concurrent_inserts_are_all_recorded() {
        let registry = std::sync::Arc::new(IndexRegistry::new());
        let ids = identities(16);
        let mut handles = Vec::new();
        for (slot, identity) in ids.into_iter().enumerate() {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                let index = PartitionIndex::new_unchecked((slot % 4) as u8);
                registry.insert(index, identity).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(registry.assignment_count().await, 16);
    }
}
