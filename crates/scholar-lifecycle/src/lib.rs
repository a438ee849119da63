//! Action lifecycle for mutating ledger calls.
//!
//! ```text
//! Idle -> Submitting -> AwaitingConfirmation -> Confirmed
//!              |                  |
//!              +------> Failed <--+
//! ```
//!
//! A lifecycle tracks one logical action at a time. Submission is refused
//! unless the caller holds an allowing [`AuthorizationVerdict`], and while a
//! previous attempt is still in flight. Every attempt gets a fresh
//! [`ActionRecord`]; terminal records never change again.
//!
//! [`AuthorizationVerdict`]: scholar_gate::AuthorizationVerdict

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod record;
pub mod state;

pub use config::LifecycleConfig;
pub use error::{ActionError, ActionErrorKind, SubmitRefusal};
pub use lifecycle::{ActionHandle, ActionLifecycle, ConfirmationHook};
pub use record::ActionRecord;
pub use state::{ActionState, StateTransition};
