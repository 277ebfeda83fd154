//! surety-core - domain library for the flight-status oracle network
//! simulator.
//!
//! This crate holds everything the daemon shares with tests and tooling:
//!
//! - [`identity`]: the fixed pool of simulated signer identities
//! - [`registry`]: partition index -> identity mapping built at registration
//! - [`status`]: the fixed flight-status code domain
//! - [`event`]: oracle request events and response submissions
//! - [`ledger`]: the `LedgerClient` abstraction over the remote contract
//!   runtime, its error taxonomy, and the in-memory simulation backend
//! - [`config`]: TOML configuration with fail-closed validation
//!
//! The remote consensus contract itself is out of scope; it is consumed
//! through [`ledger::LedgerClient`] as an opaque service.

pub mod config;
pub mod event;
pub mod identity;
pub mod ledger;
pub mod registry;
pub mod status;

pub use config::{ConfigError, OracleNetConfig};
pub use event::{FlightKey, OracleRequestEvent, ResponseSubmission, SequencedEvent};
pub use identity::{AccountId, Identity, IdentityPool};
pub use ledger::{EventStream, LedgerClient, LedgerError};
pub use registry::{IndexRegistry, PartitionIndex, RegistryError};
pub use status::FlightStatus;
