//! The proof model.
//!
//! Lines live in an arena keyed by [`LineId`]; order, premise references and
//! the subproof layout are kept beside it. Locking follows one order
//! everywhere: the structure lock first, then at most one line or goal at a
//! time. Structural edits take the structure lock for writing, so a
//! verification never sees a half-renumbered proof. Text edits, rule changes
//! and verification only read the structure.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use deduct_types::{Claim, Expression, GoalId, LineId, Premise, RuleKind, Status};
use tokio::runtime::Handle;

use crate::engine::{CheckRequest, Target, Verdict, VerificationEngine};
use crate::errors::{InterchangeError, StructureError};
use crate::events::{Listener, Listeners, ProofEvent};
use crate::goal::{Goal, GoalText, GoalView};
use crate::interchange::{FORMAT_VERSION, LineRecord, ProofDocument};
use crate::line::{CORRECT_MESSAGE, Line, LineView, Outcome, Prepared};
use crate::scheduler::{self, DEFAULT_DEBOUNCE, DebounceScheduler};
use crate::scope::{self, Layout, Row};

const GOAL_REACHED: &str = "The goal has been reached";
const GOAL_NOT_REACHED: &str = "The goal has not been reached";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn invalid_expression_at(index: usize) -> String {
    format!("The expression at line {} is invalid", index + 1)
}

fn squeeze(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Collaborators a proof is built with.
#[derive(Debug, Clone)]
pub struct ProofContext {
    pub engine: VerificationEngine,
    pub scheduler: DebounceScheduler,
    pub debounce: Duration,
}

impl Default for ProofContext {
    fn default() -> Self {
        Self {
            engine: VerificationEngine::local(),
            scheduler: DebounceScheduler::disabled(),
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

impl ProofContext {
    #[must_use]
    pub fn new(engine: VerificationEngine) -> Self {
        Self {
            engine,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_scheduler(mut self, scheduler: DebounceScheduler) -> Self {
        self.scheduler = scheduler;
        self
    }

    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}

/// Status of every line and goal after [`Proof::verify_proof`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofSummary {
    pub lines: Vec<Status>,
    pub goals: Vec<Status>,
}

impl ProofSummary {
    /// True if any line or goal is in an error state.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.lines.iter().chain(&self.goals).any(|status| status.is_error())
    }

    /// True if nothing is in error and every goal is reached.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.has_errors()
            && !self.goals.is_empty()
            && self.goals.iter().all(|&status| status == Status::Correct)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofSnapshot {
    pub lines: Vec<LineView>,
    pub goals: Vec<GoalView>,
}

struct ProofState {
    order: Vec<LineId>,
    positions: HashMap<LineId, usize>,
    lines: HashMap<LineId, Arc<Mutex<Line>>>,
    /// Premise to the lines citing it.
    dependents: HashMap<LineId, BTreeSet<LineId>>,
    layout: Layout,
    goals: Vec<Arc<Mutex<Goal>>>,
    allowed: BTreeSet<RuleKind>,
    next_line: u64,
    next_goal: u64,
}

impl ProofState {
    fn empty(allowed: BTreeSet<RuleKind>) -> Self {
        Self {
            order: Vec::new(),
            positions: HashMap::new(),
            lines: HashMap::new(),
            dependents: HashMap::new(),
            layout: Layout::new(Vec::new()),
            goals: Vec::new(),
            allowed,
            next_line: 1,
            next_goal: 1,
        }
    }

    fn check_line(&self, index: usize) -> Result<(), StructureError> {
        if index < self.order.len() {
            Ok(())
        } else {
            Err(StructureError::IndexOutOfBounds {
                index,
                len: self.order.len(),
            })
        }
    }

    fn line(&self, index: usize) -> Result<&Arc<Mutex<Line>>, StructureError> {
        self.check_line(index)?;
        Ok(self.handle(index))
    }

    /// Handle for an index the caller has already checked.
    fn handle(&self, index: usize) -> &Arc<Mutex<Line>> {
        &self.lines[&self.order[index]]
    }

    fn goal(&self, index: usize) -> Result<&Arc<Mutex<Goal>>, StructureError> {
        self.goals
            .get(index)
            .ok_or(StructureError::IndexOutOfBounds {
                index,
                len: self.goals.len(),
            })
    }

    fn position(&self, id: LineId) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    fn next_line_id(&mut self) -> LineId {
        let id = LineId::new(self.next_line);
        self.next_line += 1;
        id
    }

    fn next_goal_id(&mut self) -> GoalId {
        let id = GoalId::new(self.next_goal);
        self.next_goal += 1;
        id
    }

    fn insert(
        &mut self,
        index: usize,
        row: Row,
        events: &mut Vec<ProofEvent>,
    ) -> Result<LineId, StructureError> {
        if index > self.order.len() {
            return Err(StructureError::IndexOutOfBounds {
                index,
                len: self.order.len(),
            });
        }
        let mut rows = self.layout.rows().to_vec();
        rows.insert(index, row);
        scope::validate(&rows)?;
        Ok(self.insert_valid(index, rows, events))
    }

    /// Inserts the row at `index` of the already validated `rows`.
    fn insert_valid(&mut self, index: usize, rows: Vec<Row>, events: &mut Vec<ProofEvent>) -> LineId {
        let before = self.subproofs();
        let row = rows[index];
        let id = self.next_line_id();
        self.lines.insert(
            id,
            Arc::new(Mutex::new(Line::new(id, index, row.level, row.assumption))),
        );
        self.order.insert(index, id);
        events.push(ProofEvent::LineAdded {
            line: id,
            number: index,
            level: row.level,
            assumption: row.assumption,
        });
        self.relayout(rows, events);
        self.invalidate_reshaped(&before, events);
        self.reset_goals(events);
        id
    }

    fn remove(&mut self, index: usize, events: &mut Vec<ProofEvent>) -> Result<Vec<LineId>, StructureError> {
        self.check_line(index)?;
        let range = self.layout.subproof_range(index);
        let mut rows = self.layout.rows().to_vec();
        rows.drain(range.clone());
        scope::validate(&rows)?;

        let before = self.subproofs();
        let removed: Vec<LineId> = self.order.drain(range).collect();
        for id in &removed {
            if let Some(line) = self.lines.remove(id) {
                lock(&line).stop_timer();
            }
            self.dependents.remove(id);
            events.push(ProofEvent::LineRemoved { line: *id });
        }
        self.relayout(rows, events);
        self.invalidate_reshaped(&before, events);
        self.reset_goals(events);
        Ok(removed)
    }

    /// The lines of every subproof, keyed by the assumption opening it.
    fn subproofs(&self) -> HashMap<LineId, Vec<LineId>> {
        (0..self.order.len())
            .filter(|&index| {
                let row = self.layout.rows()[index];
                row.assumption && row.level > 0
            })
            .map(|index| {
                let lines = self
                    .layout
                    .subproof_range(index)
                    .map(|line| self.order[line])
                    .collect();
                (self.order[index], lines)
            })
            .collect()
    }

    /// Lines citing a subproof whose lines changed since `before` lose their
    /// claim, since it embeds the old conclusions.
    fn invalidate_reshaped(&self, before: &HashMap<LineId, Vec<LineId>>, events: &mut Vec<ProofEvent>) {
        for (assumption, lines) in self.subproofs() {
            if before.get(&assumption) == Some(&lines) {
                continue;
            }
            let Some(citing) = self.dependents.get(&assumption) else {
                continue;
            };
            for id in citing {
                if let Some(line) = self.lines.get(id) {
                    lock(line).invalidate(events);
                }
            }
        }
    }

    /// Installs a new layout, renumbers every line and drops premise
    /// references that are no longer accessible. Lines that lose a premise
    /// go back to `None`.
    fn relayout(&mut self, rows: Vec<Row>, events: &mut Vec<ProofEvent>) {
        debug_assert_eq!(rows.len(), self.order.len());
        self.positions = self
            .order
            .iter()
            .enumerate()
            .map(|(index, &id)| (id, index))
            .collect();
        self.layout = Layout::new(rows);
        self.dependents.clear();

        for (index, id) in self.order.iter().enumerate() {
            let mut line = lock(&self.lines[id]);
            line.set_number(index, events);
            let kept: BTreeSet<LineId> = line
                .premises()
                .iter()
                .copied()
                .filter(|premise| {
                    self.positions
                        .get(premise)
                        .is_some_and(|&position| self.layout.is_accessible(position, index))
                })
                .collect();
            if kept != *line.premises() {
                line.set_premises(kept.clone(), events);
                line.invalidate(events);
            }
            for premise in kept {
                self.dependents.entry(premise).or_default().insert(*id);
            }
        }
    }

    fn reset_goals(&self, events: &mut Vec<ProofEvent>) {
        for goal in &self.goals {
            lock(goal).reset(events);
        }
    }

    fn renumber_goals(&self, events: &mut Vec<ProofEvent>) {
        for (number, goal) in self.goals.iter().enumerate() {
            lock(goal).set_number(number, events);
        }
    }

    /// Lines whose claim embeds the sentence of `id`: those citing it, and
    /// those citing the subproof it concludes.
    fn stale_dependents(&self, id: LineId) -> BTreeSet<LineId> {
        let mut stale = self.dependents.get(&id).cloned().unwrap_or_default();
        if let Some(index) = self.position(id)
            && let Some(assumption) = self.layout.concluded_subproof(index)
            && let Some(citing) = self.dependents.get(&self.order[assumption])
        {
            stale.extend(citing.iter().copied());
        }
        stale
    }

    fn premise_numbers(&self, line: &Line) -> Vec<usize> {
        let mut numbers: Vec<usize> = line
            .premises()
            .iter()
            .filter_map(|&premise| self.position(premise))
            .collect();
        numbers.sort_unstable();
        numbers
    }

    fn read_sentence(&self, index: usize) -> Option<Expression> {
        lock(self.handle(index)).sentence().cloned()
    }

    /// Builds the premises of line `index` from the current text of each
    /// cited line. Fails with a message naming the first unparsable line.
    fn build_premises(&self, index: usize, premises: &BTreeSet<LineId>) -> Result<Vec<Premise>, String> {
        let mut cited: Vec<usize> = premises
            .iter()
            .filter_map(|&premise| self.position(premise))
            .collect();
        cited.sort_unstable();

        cited
            .into_iter()
            .map(|premise| {
                let expression = self
                    .read_sentence(premise)
                    .ok_or_else(|| invalid_expression_at(premise))?;
                if !self.layout.is_subproof_premise(premise, index) {
                    return Ok(Premise::new(expression));
                }
                let conclusions = self
                    .layout
                    .subproof_conclusions(premise)
                    .into_iter()
                    .map(|conclusion| {
                        self.read_sentence(conclusion)
                            .ok_or_else(|| invalid_expression_at(conclusion))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Premise::with_subproof(expression, conclusions))
            })
            .collect()
    }

    /// Every line the derivation of `root` rests on, `root` included. A
    /// cited subproof contributes all of its lines.
    fn derivation(&self, root: usize) -> BTreeSet<usize> {
        let mut cone = BTreeSet::new();
        let mut pending = vec![root];
        while let Some(index) = pending.pop() {
            if !cone.insert(index) {
                continue;
            }
            let premises = lock(self.handle(index)).premises().clone();
            for premise in premises.into_iter().filter_map(|id| self.position(id)) {
                if self.layout.is_subproof_premise(premise, index) {
                    pending.extend(self.layout.subproof_range(premise));
                } else {
                    pending.push(premise);
                }
            }
        }
        cone
    }

    fn document(&self) -> ProofDocument {
        let lines = self
            .order
            .iter()
            .map(|id| {
                let line = lock(&self.lines[id]);
                LineRecord {
                    text: line.text().to_string(),
                    assumption: line.is_assumption(),
                    depth: line.level(),
                    premises: self.premise_numbers(&line),
                    rule: line.rule(),
                }
            })
            .collect();
        let goals = self
            .goals
            .iter()
            .map(|goal| lock(goal).text().to_string())
            .collect();
        ProofDocument {
            version: FORMAT_VERSION,
            restricted_rules: self.allowed.clone(),
            lines,
            goals,
        }
    }
}

struct ProofShared {
    state: RwLock<ProofState>,
    engine: VerificationEngine,
    timers: Option<Handle>,
    debounce: Duration,
    listeners: Listeners,
    modifications: AtomicU64,
}

impl ProofShared {
    fn read(&self) -> RwLockReadGuard<'_, ProofState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ProofState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Restarts the debounce timer of `line`. Called with the line locked,
    /// so the timer cannot fire before its handle is stored.
    fn schedule(self: &Arc<Self>, line: &mut Line) {
        let Some(handle) = &self.timers else {
            return;
        };
        let generation = line.arm_timer();
        let id = line.id();
        let shared = Arc::downgrade(self);
        let timer = scheduler::start_timer(handle, self.debounce, move || {
            if let Some(shared) = shared.upgrade() {
                shared.fire(id, generation);
            }
        });
        line.set_timer(generation, timer);
        tracing::debug!("debounce timer armed for {id}");
    }

    fn fire(&self, id: LineId, generation: u64) {
        let mut events = Vec::new();
        {
            let state = self.read();
            let Some(index) = state.position(id) else {
                return;
            };
            if !lock(state.handle(index)).take_timer(generation) {
                return;
            }
            tracing::debug!("debounce elapsed for line {}", index + 1);
            self.verify_line(&state, index, &mut events);
        }
        self.listeners.dispatch(events);
    }

    fn verify_line(&self, state: &ProofState, index: usize, events: &mut Vec<ProofEvent>) -> Status {
        let handle = state.handle(index);
        let (revision, prepared) = {
            let mut line = lock(handle);
            line.stop_timer();
            (line.revision(), line.prepare(&state.allowed))
        };

        let outcome = match prepared {
            Prepared::Settled(outcome) => outcome,
            Prepared::Claim {
                conclusion,
                rule,
                premises,
            } => match state.build_premises(index, &premises) {
                Err(message) => Outcome::invalid_claim(message),
                Ok(premises) => {
                    let claim = Claim::new(conclusion, premises, rule);
                    let verdict = self.engine.verify(
                        Target::Line(index),
                        || state.document(),
                        || match claim.check() {
                            Ok(()) => Verdict::Valid,
                            Err(violation) => Verdict::Invalid(violation.message().to_string()),
                        },
                    );
                    let (status, message) = match verdict {
                        Verdict::Valid => (Status::Correct, CORRECT_MESSAGE.to_string()),
                        Verdict::Invalid(message) => (Status::InvalidClaim, message),
                    };
                    Outcome {
                        status,
                        message: Some(message),
                        range: None,
                        claim: Some(claim),
                    }
                }
            },
        };

        let mut line = lock(handle);
        if !line.commit(revision, outcome, events) {
            tracing::debug!("discarding stale verification of line {}", index + 1);
        }
        line.status()
    }

    fn verify_goal(&self, state: &ProofState, index: usize, events: &mut Vec<ProofEvent>) -> Status {
        let handle = &state.goals[index];
        let (revision, text) = {
            let goal = lock(handle);
            (goal.revision(), goal.parse())
        };
        let (status, message, range) = match text {
            GoalText::Blank => (Status::None, None, None),
            GoalText::Malformed { message, range } => {
                (Status::InvalidExpression, Some(message), range)
            }
            GoalText::Sentence(goal) => {
                let verdict = self.engine.verify(
                    Target::Goal(index),
                    || state.document(),
                    || self.reach(state, &goal, events),
                );
                match verdict {
                    Verdict::Valid => (Status::Correct, Some(GOAL_REACHED.to_string()), None),
                    Verdict::Invalid(message) => (Status::InvalidClaim, Some(message), None),
                }
            }
        };
        let mut goal = lock(handle);
        goal.commit(revision, status, message, range, events);
        goal.status()
    }

    /// In-process goal check: some top-level line states the goal and
    /// everything its derivation rests on is correct.
    fn reach(&self, state: &ProofState, goal: &Expression, events: &mut Vec<ProofEvent>) -> Verdict {
        let candidates: Vec<usize> = (0..state.order.len())
            .filter(|&index| {
                state.layout.rows()[index].level == 0
                    && state.read_sentence(index).as_ref() == Some(goal)
            })
            .collect();

        let mut failure = None;
        for candidate in candidates {
            let broken = state
                .derivation(candidate)
                .into_iter()
                .filter(|&index| !state.layout.rows()[index].assumption)
                .find(|&index| self.verify_line(state, index, events) != Status::Correct);
            match broken {
                None => return Verdict::Valid,
                Some(index) => {
                    failure.get_or_insert(index);
                }
            }
        }
        match failure {
            Some(index) => Verdict::Invalid(format!(
                "Line {}, used to reach the goal, is not correct",
                index + 1
            )),
            None => Verdict::Invalid(GOAL_NOT_REACHED.to_string()),
        }
    }
}

/// A natural-deduction proof: ordered lines, nested subproofs and goals.
///
/// All methods take `&self`; the proof can be shared between the editing
/// thread and its debounce timers.
pub struct Proof {
    shared: Arc<ProofShared>,
    // Keeps an owned timer runtime alive for as long as the proof.
    _scheduler: DebounceScheduler,
}

impl Proof {
    /// An empty proof with one blank goal. `allowed` lists the rules the
    /// proof is restricted to; empty means unrestricted.
    pub fn new(allowed: impl IntoIterator<Item = RuleKind>, context: ProofContext) -> Self {
        let mut state = ProofState::empty(allowed.into_iter().collect());
        let goal = state.next_goal_id();
        state.goals.push(Arc::new(Mutex::new(Goal::new(goal, 0))));
        Self::with_state(state, context)
    }

    /// Rebuilds a proof from a validated document. Nothing is verified.
    pub fn from_document(
        document: &ProofDocument,
        context: ProofContext,
    ) -> Result<Self, InterchangeError> {
        document.validate()?;
        let layout = document.layout()?;
        let mut state = ProofState::empty(document.restricted_rules.clone());
        let mut quiet = Vec::new();

        for (index, record) in document.lines.iter().enumerate() {
            let id = state.next_line_id();
            let mut line = Line::new(id, index, record.depth, record.assumption);
            line.set_text(&record.text, &mut quiet);
            line.set_rule(record.rule, &mut quiet);
            state.order.push(id);
            state.lines.insert(id, Arc::new(Mutex::new(line)));
        }
        for (index, record) in document.lines.iter().enumerate() {
            let premises: BTreeSet<LineId> = record
                .premises
                .iter()
                .map(|&premise| state.order[premise])
                .collect();
            lock(state.handle(index)).set_premises(premises, &mut quiet);
        }
        state.relayout(layout.rows().to_vec(), &mut quiet);

        for (number, text) in document.goals.iter().enumerate() {
            let id = state.next_goal_id();
            let mut goal = Goal::new(id, number);
            goal.set_text(text, &mut quiet);
            state.goals.push(Arc::new(Mutex::new(goal)));
        }
        Ok(Self::with_state(state, context))
    }

    fn with_state(state: ProofState, context: ProofContext) -> Self {
        let shared = Arc::new(ProofShared {
            state: RwLock::new(state),
            engine: context.engine,
            timers: context.scheduler.handle(),
            debounce: context.debounce,
            listeners: Listeners::default(),
            modifications: AtomicU64::new(0),
        });
        Self {
            shared,
            _scheduler: context.scheduler,
        }
    }

    fn finish(&self, events: Vec<ProofEvent>, modified: bool) {
        if modified {
            self.shared.modifications.fetch_add(1, Ordering::SeqCst);
        }
        self.shared.listeners.dispatch(events);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.read().order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn goal_count(&self) -> usize {
        self.shared.read().goals.len()
    }

    #[must_use]
    pub fn premise_count(&self) -> usize {
        self.shared.read().layout.premise_count()
    }

    #[must_use]
    pub fn line_id(&self, index: usize) -> Option<LineId> {
        self.shared.read().order.get(index).copied()
    }

    #[must_use]
    pub fn index_of(&self, id: LineId) -> Option<usize> {
        self.shared.read().position(id)
    }

    #[must_use]
    pub fn restricted_rules(&self) -> BTreeSet<RuleKind> {
        self.shared.read().allowed.clone()
    }

    /// Bumped by every edit; verification alone does not count.
    #[must_use]
    pub fn modification_count(&self) -> u64 {
        self.shared.modifications.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self, listener: impl Fn(&ProofEvent) + Send + Sync + 'static) {
        let listener: Listener = Box::new(listener);
        self.shared.listeners.subscribe(listener);
    }

    /// Appends a premise (a level-0 assumption) after the existing ones.
    pub fn add_premise(&self) -> LineId {
        let mut events = Vec::new();
        let id = {
            let mut state = self.shared.write();
            let index = state.layout.premise_count();
            let mut rows = state.layout.rows().to_vec();
            rows.insert(index, Row::new(0, true));
            debug_assert!(scope::validate(&rows).is_ok());
            state.insert_valid(index, rows, &mut events)
        };
        self.finish(events, true);
        id
    }

    pub fn add_line(&self, index: usize, assumption: bool, level: usize) -> Result<LineId, StructureError> {
        let mut events = Vec::new();
        let id = self
            .shared
            .write()
            .insert(index, Row::new(level, assumption), &mut events)?;
        self.finish(events, true);
        Ok(id)
    }

    /// Opens a subproof one level below line `after`, right after it but
    /// never among the premises.
    pub fn start_subproof(&self, after: usize) -> Result<LineId, StructureError> {
        let mut events = Vec::new();
        let id = {
            let mut state = self.shared.write();
            state.check_line(after)?;
            let level = state.layout.rows()[after].level + 1;
            let index = (after + 1).max(state.layout.premise_count());
            state.insert(index, Row::new(level, true), &mut events)?
        };
        self.finish(events, true);
        Ok(id)
    }

    /// Adds a line one level up, right after the subproof containing `line`.
    pub fn end_subproof(&self, line: usize) -> Result<LineId, StructureError> {
        let mut events = Vec::new();
        let id = {
            let mut state = self.shared.write();
            state.check_line(line)?;
            let end = state.layout.enclosing_end(line)?;
            let level = state.layout.rows()[line].level - 1;
            state.insert(end, Row::new(level, false), &mut events)?
        };
        self.finish(events, true);
        Ok(id)
    }

    /// Deletes a line; deleting a subproof's assumption deletes the whole
    /// subproof. Returns the removed ids in line order.
    pub fn delete(&self, index: usize) -> Result<Vec<LineId>, StructureError> {
        let mut events = Vec::new();
        let removed = self.shared.write().remove(index, &mut events)?;
        tracing::debug!("deleted {} line(s) at {}", removed.len(), index + 1);
        self.finish(events, true);
        Ok(removed)
    }

    /// Replaces a line's text and restarts its debounce timer. Lines whose
    /// claims used the old sentence go back to `None` without re-verifying.
    pub fn set_expression_text(&self, index: usize, text: &str) -> Result<(), StructureError> {
        let mut events = Vec::new();
        let changed = {
            let state = self.shared.read();
            let handle = state.line(index)?;
            let (id, changed) = {
                let mut line = lock(handle);
                let changed = line.set_text(text, &mut events);
                if changed {
                    self.shared.schedule(&mut line);
                }
                (line.id(), changed)
            };
            if changed {
                for dependent in state.stale_dependents(id) {
                    if let Some(line) = state.lines.get(&dependent) {
                        lock(line).invalidate(&mut events);
                    }
                }
                state.reset_goals(&mut events);
            }
            changed
        };
        self.finish(events, changed);
        Ok(())
    }

    /// Selects a rule and verifies the line at once.
    pub fn set_rule(&self, index: usize, rule: Option<RuleKind>) -> Result<Status, StructureError> {
        let mut events = Vec::new();
        let (changed, status) = {
            let state = self.shared.read();
            let changed = lock(state.line(index)?).set_rule(rule, &mut events);
            if changed {
                state.reset_goals(&mut events);
            }
            (changed, self.shared.verify_line(&state, index, &mut events))
        };
        self.finish(events, changed);
        Ok(status)
    }

    /// Cites or un-cites `premise` from line `index`, then verifies the line.
    /// Returns true if the premise was added.
    pub fn toggle_premise(&self, index: usize, premise: usize) -> Result<bool, StructureError> {
        let mut events = Vec::new();
        let added = {
            let mut state = self.shared.write();
            state.check_line(index)?;
            state.check_line(premise)?;
            if state.layout.rows()[index].assumption {
                return Err(StructureError::AssumptionHasNoPremises { index });
            }
            let premise_id = state.order[premise];
            let line_id = state.order[index];
            let is_cited = lock(state.handle(index)).premises().contains(&premise_id);
            if !is_cited && !state.layout.is_accessible(premise, index) {
                return Err(StructureError::PremiseNotAccessible {
                    line: index,
                    premise,
                });
            }

            {
                let mut line = lock(state.handle(index));
                let mut premises = line.premises().clone();
                if is_cited {
                    premises.remove(&premise_id);
                } else {
                    premises.insert(premise_id);
                }
                line.set_premises(premises, &mut events);
            }
            let citing = state.dependents.entry(premise_id).or_default();
            if is_cited {
                citing.remove(&line_id);
            } else {
                citing.insert(line_id);
            }
            state.reset_goals(&mut events);
            self.shared.verify_line(&state, index, &mut events);
            !is_cited
        };
        self.finish(events, true);
        Ok(added)
    }

    /// Lines that line `index` may cite.
    pub fn accessible_premises(&self, index: usize) -> Result<BTreeSet<usize>, StructureError> {
        let state = self.shared.read();
        state.check_line(index)?;
        Ok(state.layout.accessible(index))
    }

    /// The lines an editor highlights as citable from line `index`.
    pub fn highlighted(&self, index: usize) -> Result<BTreeSet<usize>, StructureError> {
        self.accessible_premises(index)
    }

    /// Verifies one line now, cancelling its pending timer.
    pub fn verify_line(&self, index: usize) -> Result<Status, StructureError> {
        let mut events = Vec::new();
        let status = {
            let state = self.shared.read();
            state.check_line(index)?;
            self.shared.verify_line(&state, index, &mut events)
        };
        self.finish(events, false);
        Ok(status)
    }

    pub fn verify_goal(&self, index: usize) -> Result<Status, StructureError> {
        let mut events = Vec::new();
        let status = {
            let state = self.shared.read();
            state.goal(index)?;
            self.shared.verify_goal(&state, index, &mut events)
        };
        self.finish(events, false);
        Ok(status)
    }

    /// Verifies every line in order, then every goal.
    pub fn verify_proof(&self) -> ProofSummary {
        let mut events = Vec::new();
        let summary = {
            let state = self.shared.read();
            let lines = (0..state.order.len())
                .map(|index| self.shared.verify_line(&state, index, &mut events))
                .collect();
            let goals = (0..state.goals.len())
                .map(|index| self.shared.verify_goal(&state, index, &mut events))
                .collect();
            ProofSummary { lines, goals }
        };
        self.finish(events, false);
        summary
    }

    /// Writes a suggested conclusion into a blank line and verifies it.
    ///
    /// Only applies to a blank, non-assumption line whose rule can suggest
    /// conclusions. Candidates that merely restate a citable line are
    /// skipped unless nothing else is left. Returns the text written.
    pub fn auto_fill(&self, index: usize) -> Result<Option<String>, StructureError> {
        let text = {
            let state = self.shared.read();
            let handle = state.line(index)?;
            let (rule, premises) = {
                let line = lock(handle);
                if line.is_assumption() || !line.text().trim().is_empty() {
                    return Ok(None);
                }
                let Some(rule) = line.rule().filter(|rule| rule.can_auto_fill()) else {
                    return Ok(None);
                };
                (rule, line.premises().clone())
            };
            let Ok(premises) = state.build_premises(index, &premises) else {
                return Ok(None);
            };
            let candidates = rule.auto_fill_candidates(&premises);
            let Some(first) = candidates.first() else {
                return Ok(None);
            };

            let taken: HashSet<String> = state
                .layout
                .accessible(index)
                .into_iter()
                .flat_map(|premise| {
                    let mut line = lock(state.handle(premise));
                    let mut forms = vec![squeeze(line.text())];
                    if let Some(sentence) = line.sentence() {
                        forms.push(squeeze(&sentence.to_string()));
                    }
                    forms
                })
                .collect();
            candidates
                .iter()
                .find(|candidate| !taken.contains(&squeeze(candidate)))
                .unwrap_or(first)
                .clone()
        };
        self.set_expression_text(index, &text)?;
        self.verify_line(index)?;
        Ok(Some(text))
    }

    /// Inserts a blank goal at `index`.
    pub fn add_goal(&self, index: usize) -> Result<GoalId, StructureError> {
        let mut events = Vec::new();
        let id = {
            let mut state = self.shared.write();
            if index > state.goals.len() {
                return Err(StructureError::IndexOutOfBounds {
                    index,
                    len: state.goals.len(),
                });
            }
            let id = state.next_goal_id();
            state
                .goals
                .insert(index, Arc::new(Mutex::new(Goal::new(id, index))));
            events.push(ProofEvent::GoalAdded { goal: id, number: index });
            state.renumber_goals(&mut events);
            id
        };
        self.finish(events, true);
        Ok(id)
    }

    pub fn remove_goal(&self, index: usize) -> Result<(), StructureError> {
        let mut events = Vec::new();
        {
            let mut state = self.shared.write();
            state.goal(index)?;
            if state.goals.len() == 1 {
                return Err(StructureError::LastGoal);
            }
            let goal = state.goals.remove(index);
            events.push(ProofEvent::GoalRemoved {
                goal: lock(&goal).id(),
            });
            state.renumber_goals(&mut events);
        }
        self.finish(events, true);
        Ok(())
    }

    pub fn set_goal_text(&self, index: usize, text: &str) -> Result<(), StructureError> {
        let mut events = Vec::new();
        let changed = {
            let state = self.shared.read();
            lock(state.goal(index)?).set_text(text, &mut events)
        };
        self.finish(events, changed);
        Ok(())
    }

    /// Replaces the rule restriction. Every line goes back to `None`.
    pub fn set_restricted_rules(&self, allowed: impl IntoIterator<Item = RuleKind>) {
        let mut events = Vec::new();
        {
            let mut state = self.shared.write();
            state.allowed = allowed.into_iter().collect();
            for id in &state.order {
                lock(&state.lines[id]).invalidate(&mut events);
            }
            state.reset_goals(&mut events);
        }
        self.finish(events, true);
    }

    #[must_use]
    pub fn line(&self, index: usize) -> Option<LineView> {
        let state = self.shared.read();
        let handle = state.line(index).ok()?;
        let line = lock(handle);
        Some(LineView::capture(&line, state.premise_numbers(&line)))
    }

    #[must_use]
    pub fn goal(&self, index: usize) -> Option<GoalView> {
        let state = self.shared.read();
        let handle = state.goal(index).ok()?;
        Some(lock(handle).view())
    }

    /// The claim built by the last verification of line `index`, if it is
    /// still current.
    #[must_use]
    pub fn claim(&self, index: usize) -> Option<Claim> {
        let state = self.shared.read();
        let handle = state.line(index).ok()?;
        lock(handle).claim().cloned()
    }

    #[must_use]
    pub fn snapshot(&self) -> ProofSnapshot {
        let state = self.shared.read();
        let lines = state
            .order
            .iter()
            .map(|id| {
                let line = lock(&state.lines[id]);
                LineView::capture(&line, state.premise_numbers(&line))
            })
            .collect();
        let goals = state.goals.iter().map(|goal| lock(goal).view()).collect();
        ProofSnapshot { lines, goals }
    }

    /// The interchange form of the current proof.
    #[must_use]
    pub fn document(&self) -> ProofDocument {
        self.shared.read().document()
    }
}

/// Answers a check request with the in-process rules only.
///
/// This is what `deduct check-server` runs, so an external checker built from
/// this crate agrees with the fallback path.
pub fn check_locally(request: &CheckRequest) -> Result<Verdict, InterchangeError> {
    let proof = Proof::from_document(&request.proof, ProofContext::default())?;
    let status = match request.target {
        Target::Line(index) => proof.verify_line(index)?,
        Target::Goal(index) => proof.verify_goal(index)?,
    };
    if status == Status::Correct {
        return Ok(Verdict::Valid);
    }
    let message = match request.target {
        Target::Line(index) => proof.line(index).and_then(|line| line.message),
        Target::Goal(index) => proof.goal(index).and_then(|goal| goal.message),
    };
    Ok(Verdict::Invalid(
        message.unwrap_or_else(|| format!("{} is {}", request.target, status)),
    ))
}

impl Drop for Proof {
    fn drop(&mut self) {
        let state = self.shared.read();
        for line in state.lines.values() {
            lock(line).stop_timer();
        }
    }
}

impl fmt::Debug for Proof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.read();
        f.debug_struct("Proof")
            .field("lines", &state.order.len())
            .field("goals", &state.goals.len())
            .field("engine", &self.shared.engine)
            .finish_non_exhaustive()
    }
}
