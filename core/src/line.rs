//! Per-line state.
//!
//! A [`Line`] caches its parsed sentence and last built claim. Every setter
//! records the notifications it causes into the caller's event buffer and
//! reports nothing when the value did not change.

use std::collections::BTreeSet;

use deduct_types::{Claim, ErrorRange, Expression, LineId, ParseFailure, RuleKind, Status, parser};
use tokio::task::AbortHandle;

use crate::events::ProofEvent;

pub(crate) const CORRECT_MESSAGE: &str = "Line is Correct!";
pub(crate) const NO_RULE_MESSAGE: &str = "Rule Not Specified";

#[derive(Debug, Clone)]
enum Parsed {
    Blank,
    Sentence(Expression),
    Malformed(ParseFailure),
}

/// Result of a verification pass, applied with [`Line::commit`].
#[derive(Debug, Clone)]
pub(crate) struct Outcome {
    pub status: Status,
    pub message: Option<String>,
    pub range: Option<ErrorRange>,
    pub claim: Option<Claim>,
}

impl Outcome {
    pub fn none() -> Self {
        Self {
            status: Status::None,
            message: None,
            range: None,
            claim: None,
        }
    }

    pub fn invalid_claim(message: impl Into<String>) -> Self {
        Self {
            status: Status::InvalidClaim,
            message: Some(message.into()),
            range: None,
            claim: None,
        }
    }
}

/// What the first phase of verification found out about a line on its own.
pub(crate) enum Prepared {
    Settled(Outcome),
    Claim {
        conclusion: Expression,
        rule: RuleKind,
        premises: BTreeSet<LineId>,
    },
}

#[derive(Debug)]
pub(crate) struct Line {
    id: LineId,
    number: usize,
    level: usize,
    assumption: bool,
    text: String,
    parsed: Option<Parsed>,
    claim: Option<Claim>,
    premises: BTreeSet<LineId>,
    rule: Option<RuleKind>,
    status: Status,
    message: Option<String>,
    error_range: Option<ErrorRange>,
    /// Bumped by every change that makes an in-flight verification stale.
    revision: u64,
    timer: Option<AbortHandle>,
    timer_generation: u64,
}

impl Line {
    pub fn new(id: LineId, number: usize, level: usize, assumption: bool) -> Self {
        Self {
            id,
            number,
            level,
            assumption,
            text: String::new(),
            parsed: None,
            claim: None,
            premises: BTreeSet::new(),
            rule: None,
            status: Status::None,
            message: None,
            error_range: None,
            revision: 0,
            timer: None,
            timer_generation: 0,
        }
    }

    pub fn id(&self) -> LineId {
        self.id
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn is_assumption(&self) -> bool {
        self.assumption
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn rule(&self) -> Option<RuleKind> {
        self.rule
    }

    pub fn premises(&self) -> &BTreeSet<LineId> {
        &self.premises
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn claim(&self) -> Option<&Claim> {
        self.claim.as_ref()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn set_number(&mut self, number: usize, events: &mut Vec<ProofEvent>) {
        if self.number != number {
            self.number = number;
            events.push(ProofEvent::LineNumberChanged {
                line: self.id,
                number,
            });
        }
    }

    /// Replaces the text. Returns false when the text is unchanged.
    pub fn set_text(&mut self, text: &str, events: &mut Vec<ProofEvent>) -> bool {
        if self.text == text {
            return false;
        }
        self.text = text.to_string();
        self.parsed = None;
        events.push(ProofEvent::ExpressionTextChanged {
            line: self.id,
            text: self.text.clone(),
        });
        self.invalidate(events);
        true
    }

    pub fn set_rule(&mut self, rule: Option<RuleKind>, events: &mut Vec<ProofEvent>) -> bool {
        if self.rule == rule {
            return false;
        }
        self.rule = rule;
        self.revision += 1;
        events.push(ProofEvent::SelectedRuleChanged {
            line: self.id,
            rule,
        });
        true
    }

    pub fn set_premises(&mut self, premises: BTreeSet<LineId>, events: &mut Vec<ProofEvent>) {
        if self.premises == premises {
            return;
        }
        self.premises = premises;
        self.revision += 1;
        events.push(ProofEvent::PremisesChanged {
            line: self.id,
            premises: self.premises.iter().copied().collect(),
        });
    }

    /// Drops the cached claim and returns to `None`, keeping the parsed
    /// sentence. Pending verifications of the old state are discarded.
    pub fn invalidate(&mut self, events: &mut Vec<ProofEvent>) {
        self.claim = None;
        self.revision += 1;
        self.apply(Status::None, None, None, events);
    }

    /// The parsed sentence, parsing on first use.
    pub fn sentence(&mut self) -> Option<&Expression> {
        match self.parse() {
            Parsed::Sentence(expression) => Some(expression),
            Parsed::Blank | Parsed::Malformed(_) => None,
        }
    }

    fn parse(&mut self) -> &Parsed {
        let text = &self.text;
        self.parsed.get_or_insert_with(|| match parser::parse(text) {
            Ok(Some(expression)) => Parsed::Sentence(expression),
            Ok(None) => Parsed::Blank,
            Err(failure) => Parsed::Malformed(failure),
        })
    }

    /// Everything verification can decide without looking at other lines.
    pub fn prepare(&mut self, allowed: &BTreeSet<RuleKind>) -> Prepared {
        let conclusion = match self.parse() {
            Parsed::Blank => return Prepared::Settled(Outcome::none()),
            Parsed::Malformed(failure) => {
                return Prepared::Settled(Outcome {
                    status: Status::InvalidExpression,
                    message: Some(failure.message().to_string()),
                    range: ErrorRange::from_failure(failure),
                    claim: None,
                });
            }
            Parsed::Sentence(expression) => expression.clone(),
        };
        if self.assumption {
            return Prepared::Settled(Outcome::none());
        }
        let Some(rule) = self.rule else {
            return Prepared::Settled(Outcome {
                status: Status::NoRule,
                message: Some(NO_RULE_MESSAGE.to_string()),
                range: None,
                claim: None,
            });
        };
        if !allowed.is_empty() && !allowed.contains(&rule) {
            return Prepared::Settled(Outcome::invalid_claim(format!(
                "The Rule \"{}\" has been restricted for this proof",
                rule.display_name()
            )));
        }
        Prepared::Claim {
            conclusion,
            rule,
            premises: self.premises.clone(),
        }
    }

    /// Applies a verification result computed at `revision`. Returns false
    /// and changes nothing if the line was edited since.
    pub fn commit(&mut self, revision: u64, outcome: Outcome, events: &mut Vec<ProofEvent>) -> bool {
        if self.revision != revision {
            return false;
        }
        self.claim = outcome.claim;
        self.apply(outcome.status, outcome.message, outcome.range, events);
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
            events.push(ProofEvent::StatusChanged {
                line: self.id,
                status,
                message: self.message.clone(),
            });
        }
        if self.error_range != range {
            self.error_range = range;
            events.push(ProofEvent::ErrorRangeChanged {
                line: self.id,
                range,
            });
        }
    }

    /// Replaces the pending timer slot and returns the generation the new
    /// timer must present when it fires.
    pub fn arm_timer(&mut self) -> u64 {
        self.stop_timer();
        self.timer_generation += 1;
        self.timer_generation
    }

    pub fn set_timer(&mut self, generation: u64, timer: AbortHandle) {
        if generation == self.timer_generation {
            self.timer = Some(timer);
        } else {
            timer.abort();
        }
    }

    pub fn stop_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    /// Claims the timer slot for a firing timer. False if the timer was
    /// replaced or cancelled after it was started.
    pub fn take_timer(&mut self, generation: u64) -> bool {
        if generation != self.timer_generation || self.timer.is_none() {
            return false;
        }
        self.timer = None;
        true
    }
}

/// Read-only copy of a line for presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineView {
    pub id: LineId,
    pub number: usize,
    pub level: usize,
    pub assumption: bool,
    pub text: String,
    /// Cited lines, by line number.
    pub premises: Vec<usize>,
    pub rule: Option<RuleKind>,
    pub status: Status,
    pub message: Option<String>,
    pub error_range: Option<ErrorRange>,
}

impl LineView {
    pub(crate) fn capture(line: &Line, premises: Vec<usize>) -> Self {
        Self {
            id: line.id,
            number: line.number,
            level: line.level,
            assumption: line.assumption,
            text: line.text.clone(),
            premises,
            rule: line.rule,
            status: line.status,
            message: line.message.clone(),
            error_range: line.error_range,
        }
    }
}
