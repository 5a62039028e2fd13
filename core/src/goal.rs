use deduct_types::{ErrorRange, Expression, GoalId, Status, parser};

use crate::events::ProofEvent;

/// A sentence the proof as a whole has to reach.
///
/// Goals carry no premises and no debounce timer; they are checked only on
/// request and drop back to `None` whenever any line changes.
#[derive(Debug)]
pub(crate) struct Goal {
    id: GoalId,
    number: usize,
    text: String,
    status: Status,
    message: Option<String>,
    error_range: Option<ErrorRange>,
    revision: u64,
}

/// How a goal's text parsed.
pub(crate) enum GoalText {
    Blank,
    Malformed {
        message: String,
        range: Option<ErrorRange>,
    },
    Sentence(Expression),
}

impl Goal {
    pub fn new(id: GoalId, number: usize) -> Self {
        Self {
            id,
            number,
            text: String::new(),
            status: Status::None,
            message: None,
            error_range: None,
            revision: 0,
        }
    }

    pub fn id(&self) -> GoalId {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn set_number(&mut self, number: usize, events: &mut Vec<ProofEvent>) {
        if self.number != number {
            self.number = number;
            events.push(ProofEvent::GoalNumberChanged {
                goal: self.id,
                number,
            });
        }
    }

    pub fn set_text(&mut self, text: &str, events: &mut Vec<ProofEvent>) -> bool {
        if self.text == text {
            return false;
        }
        self.text = text.to_string();
        events.push(ProofEvent::GoalTextChanged {
            goal: self.id,
            text: self.text.clone(),
        });
        self.reset(events);
        true
    }

    pub fn reset(&mut self, events: &mut Vec<ProofEvent>) {
        self.revision += 1;
        self.apply(Status::None, None, None, events);
    }

    pub fn parse(&self) -> GoalText {
        match parser::parse(&self.text) {
            Ok(Some(expression)) => GoalText::Sentence(expression),
            Ok(None) => GoalText::Blank,
            Err(failure) => GoalText::Malformed {
                message: failure.message().to_string(),
                range: ErrorRange::from_failure(&failure),
            },
        }
    }

    /// Applies a result computed at `revision`; stale results are dropped.
    pub fn commit(
        &mut self,
        revision: u64,
        status: Status,
        message: Option<String>,
        range: Option<ErrorRange>,
        events: &mut Vec<ProofEvent>,
    ) -> bool {
        if self.revision != revision {
            return false;
        }
        self.apply(status, message, range, events);
        true
    }

    fn apply(
        &mut self,
        status: Status,
        message: Option<String>,
        range: Option<ErrorRange>,
        events: &mut Vec<ProofEvent>,
    ) {
        if self.status != status || self.message != message {
            self.status = status;
            self.message = message;
            events.push(ProofEvent::GoalStatusChanged {
                goal: self.id,
                status,
                message: self.message.clone(),
            });
        }
        if self.error_range != range {
            self.error_range = range;
            events.push(ProofEvent::GoalErrorRangeChanged {
                goal: self.id,
                range,
            });
        }
    }

    pub fn view(&self) -> GoalView {
        GoalView {
            id: self.id,
            number: self.number,
            text: self.text.clone(),
            status: self.status,
            message: self.message.clone(),
            error_range: self.error_range,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalView {
    pub id: GoalId,
    pub number: usize,
    pub text: String,
    pub status: Status,
    pub message: Option<String>,
    pub error_range: Option<ErrorRange>,
}
