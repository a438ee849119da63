//! Core type definitions for the Scholar Ledger core.
//!
//! This crate provides the shared vocabulary used by the cache, the
//! authorization gate and the action lifecycle. No business logic, just types
//! plus the clock abstraction every time-dependent component reads through.

pub mod action;
pub mod clock;
pub mod error;
pub mod ids;
pub mod key;

pub use action::{ActionRequest, FieldValue, SettlementResult};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ReadError, SettleError, SubmitError};
pub use ids::{ActionId, SubmissionRef};
pub use key::EntityKey;
