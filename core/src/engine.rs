//! Dual-path verification.
//!
//! An [`ExternalChecker`], when configured, is asked first and its answer is
//! final. A [`CheckerFault`] means the checker could not answer at all; the
//! engine then logs the fault and uses the in-process rule check instead.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::interchange::ProofDocument;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    Invalid(String),
}

/// What a check is about. Serialized as `{"line": n}` or `{"goal": n}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Line(usize),
    Goal(usize),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Line(index) => write!(f, "line {}", index + 1),
            Self::Goal(index) => write!(f, "goal {}", index + 1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRequest {
    pub proof: ProofDocument,
    pub target: Target,
}

/// The checker could not produce an answer.
#[derive(Debug, Error)]
pub enum CheckerFault {
    #[error("checker unavailable: {0}")]
    Unavailable(String),
    #[error("checker did not answer within {0:?}")]
    Timeout(Duration),
    #[error("checker transport failed: {0}")]
    Transport(String),
    #[error("checker sent an unreadable response: {0}")]
    Protocol(String),
    #[error("checker rejected the request ({code}): {message}")]
    Rejected { code: i64, message: String },
}

/// An authoritative checker living outside this process.
///
/// Implementations block until they have an answer or give up.
pub trait ExternalChecker: Send + Sync {
    fn check(&self, request: &CheckRequest) -> Result<Verdict, CheckerFault>;
}

#[derive(Clone, Default)]
pub struct VerificationEngine {
    checker: Option<Arc<dyn ExternalChecker>>,
}

impl VerificationEngine {
    /// Rule checks only, no external checker.
    #[must_use]
    pub fn local() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_checker(checker: Arc<dyn ExternalChecker>) -> Self {
        Self {
            checker: Some(checker),
        }
    }

    #[must_use]
    pub fn has_checker(&self) -> bool {
        self.checker.is_some()
    }

    /// Asks the external checker about `target`, or runs `fallback` when
    /// there is none or it faults. `document` is only built when needed.
    pub fn verify(
        &self,
        target: Target,
        document: impl FnOnce() -> ProofDocument,
        fallback: impl FnOnce() -> Verdict,
    ) -> Verdict {
        if let Some(checker) = &self.checker {
            let request = CheckRequest {
                proof: document(),
                target,
            };
            match checker.check(&request) {
                Ok(verdict) => {
                    tracing::debug!("external checker answered for {target}");
                    return verdict;
                }
                Err(fault) => {
                    tracing::warn!("{fault}; checking {target} in process");
                }
            }
        }
        fallback()
    }
}

impl fmt::Debug for VerificationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationEngine")
            .field("external", &self.has_checker())
            .finish()
    }
}
