//! Authorization Gate: ordered predicate evaluation in front of every
//! mutating ledger action.
//!
//! ## Evaluation rules
//!
//! 1. Predicates are scanned in declaration order.
//! 2. Any predicate still `Unknown` yields a "checks incomplete" verdict, even
//!    when a later predicate is known to be false. Callers never act on
//!    partial information.
//! 3. Otherwise the first unsatisfied predicate (fact differs from its
//!    expected value) names the denial reason.
//! 4. All satisfied (or no predicates at all) allows the action.
//!
//! Denial is a normal verdict, never an error. Verdicts are computed fresh on
//! every call and never cached; the predicate inputs may come from the
//! result cache upstream.

pub mod gate;
pub mod predicate;
pub mod sources;
pub mod traits;
pub mod verdict;

pub use gate::{AuthorizationGate, EmptyGatePolicy, GateConfig, NO_CHECKS_CONFIGURED};
pub use predicate::{Predicate, PredicateValue};
pub use sources::{FieldPredicate, StaticPredicate};
pub use traits::PredicateSource;
pub use verdict::{evaluate, AuthorizationVerdict, VerdictOutcome, CHECKS_INCOMPLETE};
