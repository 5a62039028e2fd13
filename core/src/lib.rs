//! The proof model for deduct.
//!
//! [`Proof`] owns the lines, subproof structure and goals of one proof and
//! keeps every line's status current: text edits verify after a debounce,
//! rule and premise changes verify at once, and anything that could make a
//! result stale sends the affected lines back to `None`.
//!
//! Verification goes through a [`VerificationEngine`], which prefers an
//! [`ExternalChecker`] when one is configured and falls back to the rule
//! checks in `deduct-types`.

mod engine;
mod errors;
mod events;
mod goal;
mod interchange;
mod line;
mod proof;
mod scheduler;
mod scope;

pub use engine::{CheckRequest, CheckerFault, ExternalChecker, Target, Verdict, VerificationEngine};
pub use errors::{InterchangeError, StructureError};
pub use events::{Listener, ProofEvent};
pub use goal::GoalView;
pub use interchange::{FORMAT_VERSION, LineRecord, ProofDocument, deserialize, serialize};
pub use line::LineView;
pub use proof::{Proof, ProofContext, ProofSnapshot, ProofSummary, check_locally};
pub use scheduler::{DEFAULT_DEBOUNCE, DebounceScheduler};
