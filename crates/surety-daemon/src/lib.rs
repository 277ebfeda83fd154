//! surety-daemon - oracle network simulator daemon.
//!
//! Startup runs the [`registration`] coordinator once to populate the index
//! registry, then the [`dispatcher`] loop answers request events for the
//! life of the process. [`submit`] carries the shared bounded-timeout
//! remote-call contract; [`traffic`] feeds the simulated ledger with
//! synthetic flight requests so the loop has something to answer.

pub mod dispatcher;
pub mod registration;
pub mod submit;
pub mod traffic;
