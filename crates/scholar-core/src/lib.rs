//! # Scholar Ledger Core
//!
//! Client-side core for ledger-backed educational records: reads go through
//! a TTL [`ResultCache`](scholar_cache::ResultCache), mutating actions are
//! guarded by an [`AuthorizationGate`](scholar_gate::AuthorizationGate), and
//! submitted actions are tracked to a terminal outcome by an
//! [`ActionLifecycle`](scholar_lifecycle::ActionLifecycle).
//!
//! [`ActionPipeline`] wires the three together.
//!
//! ```no_run
//! use std::sync::Arc;
//! use scholar_core::{ActionPipeline, CoreConfig, PredicateDecl};
//! use scholar_ledger::{InMemoryLedger, ScriptedSubmitter};
//! use scholar_types::ActionRequest;
//!
//! # async fn demo() -> Result<(), scholar_core::CoreError> {
//! let pipeline = ActionPipeline::new(
//!     Arc::new(InMemoryLedger::new()),
//!     Arc::new(ScriptedSubmitter::new()),
//!     CoreConfig::default(),
//! )?;
//! let gate = pipeline.gate("awardPoints", &[PredicateDecl::flag("enrolled", "0xabc", "enrolled")]);
//! let handle = pipeline
//!     .authorize_and_submit(&gate, ActionRequest::new("awardPoints", serde_json::json!({})))
//!     .await?;
//! let record = pipeline.wait(&handle).await;
//! # let _ = record;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod declaration;
pub mod error;
pub mod pipeline;
pub mod telemetry;

pub use config::CoreConfig;
pub use declaration::{FieldTest, PredicateDecl};
pub use error::{ConfigError, CoreError};
pub use pipeline::ActionPipeline;
pub use telemetry::init_tracing;

pub use scholar_cache::{CacheConfig, CachedReader, ResultCache};
pub use scholar_gate::{AuthorizationGate, AuthorizationVerdict, GateConfig, Predicate, PredicateValue};
pub use scholar_lifecycle::{
    ActionError, ActionHandle, ActionLifecycle, ActionRecord, ActionState, LifecycleConfig,
    SubmitRefusal,
};
