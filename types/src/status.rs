use std::fmt;

use serde::{Deserialize, Serialize};

use crate::parser::ParseFailure;

/// Verification state of a proof line or goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Not verified since the last edit, blank, or an assumption.
    #[default]
    None,
    InvalidExpression,
    NoRule,
    InvalidClaim,
    Correct,
}

impl Status {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::InvalidExpression => "invalid_expression",
            Self::NoRule => "no_rule",
            Self::InvalidClaim => "invalid_claim",
            Self::Correct => "correct",
        }
    }

    /// True for the states that indicate a problem the user must fix.
    #[must_use]
    pub const fn is_error(self) -> bool {
        matches!(
            self,
            Self::InvalidExpression | Self::NoRule | Self::InvalidClaim
        )
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Half-open byte span into a line's expression text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorRange {
    start: usize,
    end: usize,
}

impl ErrorRange {
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "error range start after end");
        Self { start, end }
    }

    /// Highlight for a parse failure; an unknown offset highlights nothing.
    #[must_use]
    pub fn from_failure(failure: &ParseFailure) -> Option<Self> {
        failure
            .offset()
            .map(|start| Self::new(start, start + failure.length()))
    }

    #[must_use]
    pub fn start(self) -> usize {
        self.start
    }

    #[must_use]
    pub fn end(self) -> usize {
        self.end
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.start == self.end
    }

    /// The highlighted slice of `text`, if the span still fits it.
    #[must_use]
    pub fn slice(self, text: &str) -> Option<&str> {
        text.get(self.start..self.end)
    }
}
