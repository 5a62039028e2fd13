//! Core domain types for deduct.
//!
//! This crate contains the sentence language, the rule catalog and the claim
//! model. There is no IO and no async here; everything is usable from any
//! layer, including the external checker.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory
#![allow(clippy::missing_panics_doc)] // Panics are documented in assertions

mod claim;
mod expression;
mod ids;
pub mod parser;
mod rule;
mod status;

pub use claim::{Claim, Premise};
pub use expression::Expression;
pub use ids::{GoalId, LineId};
pub use parser::ParseFailure;
pub use rule::{RuleKind, RuleViolation, UnknownRule};
pub use status::{ErrorRange, Status};
