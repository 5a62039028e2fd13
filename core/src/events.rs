//! Change notifications for presentation layers.
//!
//! Mutations collect events into a buffer while locks are held; the buffer is
//! handed to the listeners only after every lock has been released, so a
//! listener may read the proof back.

use std::fmt;
use std::sync::{PoisonError, RwLock};

use deduct_types::{ErrorRange, GoalId, LineId, RuleKind, Status};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProofEvent {
    /// A new line, with the level it keeps for its whole life.
    LineAdded {
        line: LineId,
        number: usize,
        level: usize,
        assumption: bool,
    },
    LineRemoved {
        line: LineId,
    },
    LineNumberChanged {
        line: LineId,
        number: usize,
    },
    ExpressionTextChanged {
        line: LineId,
        text: String,
    },
    StatusChanged {
        line: LineId,
        status: Status,
        message: Option<String>,
    },
    ErrorRangeChanged {
        line: LineId,
        range: Option<ErrorRange>,
    },
    PremisesChanged {
        line: LineId,
        premises: Vec<LineId>,
    },
    SelectedRuleChanged {
        line: LineId,
        rule: Option<RuleKind>,
    },
    GoalAdded {
        goal: GoalId,
        number: usize,
    },
    GoalRemoved {
        goal: GoalId,
    },
    GoalNumberChanged {
        goal: GoalId,
        number: usize,
    },
    GoalTextChanged {
        goal: GoalId,
        text: String,
    },
    GoalStatusChanged {
        goal: GoalId,
        status: Status,
        message: Option<String>,
    },
    GoalErrorRangeChanged {
        goal: GoalId,
        range: Option<ErrorRange>,
    },
}

pub type Listener = Box<dyn Fn(&ProofEvent) + Send + Sync>;

#[derive(Default)]
pub(crate) struct Listeners {
    inner: RwLock<Vec<Listener>>,
}

impl Listeners {
    pub fn subscribe(&self, listener: Listener) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    /// Delivers `events` in order. Listeners must not subscribe from inside a
    /// callback.
    pub fn dispatch(&self, events: Vec<ProofEvent>) {
        if events.is_empty() {
            return;
        }
        let listeners = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        for event in &events {
            for listener in listeners.iter() {
                listener(event);
            }
        }
    }
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.inner.read().map_or(0, |listeners| listeners.len());
        f.debug_struct("Listeners").field("count", &count).finish()
    }
}
