//! Errors returned by structural edits and by the interchange codec.
//!
//! Structural edits that fail leave the proof untouched. Line numbers in the
//! messages are 1-based, as the editor shows them.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructureError {
    #[error("index {index} is out of bounds for {len} rows")]
    IndexOutOfBounds { index: usize, len: usize },
    #[error("line {} would break the subproof nesting", .index + 1)]
    IllFormedNesting { index: usize },
    #[error("line {} is not in a subproof", .index + 1)]
    NotInSubproof { index: usize },
    #[error("line {} cannot be cited by line {}", .premise + 1, .line + 1)]
    PremiseNotAccessible { line: usize, premise: usize },
    #[error("line {} is an assumption and cannot cite premises", .index + 1)]
    AssumptionHasNoPremises { index: usize },
    #[error("the last goal cannot be removed")]
    LastGoal,
}

#[derive(Debug, Error)]
pub enum InterchangeError {
    #[error("malformed proof document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported proof document version {0}")]
    UnsupportedVersion(u32),
    #[error("line {} cites line {}, which is not accessible from it", .line + 1, .premise + 1)]
    BadPremise { line: usize, premise: usize },
    #[error("line {} cites premises but is an assumption", .line + 1)]
    AssumptionWithPremises { line: usize },
    #[error(transparent)]
    Structure(#[from] StructureError),
}
