//! Remote ledger seam.
//!
//! The educational-records ledger is an external collaborator. The core only
//! needs two capabilities from it: reading a field of an entity, and
//! submitting a mutating call then waiting for it to settle. This crate
//! defines those capabilities as traits and ships in-memory doubles for tests
//! and demos.

pub mod mocks;
pub mod traits;

pub use mocks::{InMemoryLedger, ScriptedSubmitter};
pub use traits::{ActionSubmitter, LedgerReader};
