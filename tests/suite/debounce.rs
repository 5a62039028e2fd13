//! Debounced verification on a real timer runtime.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use deduct_core::{
    DebounceScheduler, Proof, ProofContext, ProofEvent, Target, Verdict, VerificationEngine,
};
use deduct_types::{RuleKind, Status};

use crate::common::CountingChecker;

const QUIET: Duration = Duration::from_millis(150);

fn timed_proof(checker: &Arc<CountingChecker>) -> Proof {
    let context = ProofContext::new(VerificationEngine::with_checker(checker.clone()))
        .with_scheduler(DebounceScheduler::runtime().unwrap())
        .with_debounce(QUIET);
    Proof::new([], context)
}

/// Waits for `done`, giving up after a generous bound.
fn eventually(done: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    false
}

#[test]
fn rapid_edits_verify_once_after_the_last() {
    let checker = Arc::new(CountingChecker::new(|_| Ok(Verdict::Valid)));
    let proof = timed_proof(&checker);
    proof.add_premise();
    proof.set_expression_text(0, "P").unwrap();
    proof.add_line(1, false, 0).unwrap();
    proof.set_rule(1, Some(RuleKind::Reiteration)).unwrap();
    proof.toggle_premise(1, 0).unwrap();
    let before = checker.calls();

    let mut last_edit = Instant::now();
    for text in ["P", "P ", "P  ", "P   ", "P"] {
        proof.set_expression_text(1, text).unwrap();
        last_edit = Instant::now();
        thread::sleep(QUIET / 5);
    }

    assert!(eventually(|| checker.calls() > before));
    thread::sleep(QUIET * 2);
    assert_eq!(checker.calls(), before + 1);

    let (fired_at, request) = checker.requests().pop().unwrap();
    assert!(fired_at.duration_since(last_edit) >= QUIET);
    assert_eq!(request.target, Target::Line(1));
    assert_eq!(proof.line(1).unwrap().status, Status::Correct);
}

#[test]
fn explicit_verification_cancels_the_pending_timer() {
    let checker = Arc::new(CountingChecker::new(|_| Ok(Verdict::Valid)));
    let proof = timed_proof(&checker);
    proof.add_premise();
    proof.set_expression_text(0, "P").unwrap();
    proof.add_line(1, false, 0).unwrap();
    proof.set_rule(1, Some(RuleKind::Reiteration)).unwrap();
    proof.toggle_premise(1, 0).unwrap();

    proof.set_expression_text(1, "P").unwrap();
    let before = checker.calls();
    assert_eq!(proof.verify_line(1).unwrap(), Status::Correct);
    assert_eq!(checker.calls(), before + 1);

    thread::sleep(QUIET * 3);
    assert_eq!(checker.calls(), before + 1);
}

#[test]
fn timers_notify_listeners() {
    let checker = Arc::new(CountingChecker::new(|_| Ok(Verdict::Valid)));
    let proof = timed_proof(&checker);
    let statuses = Arc::new(Mutex::new(Vec::new()));
    {
        let statuses = statuses.clone();
        proof.subscribe(move |event| {
            if let ProofEvent::StatusChanged { status, .. } = event {
                statuses.lock().unwrap().push(*status);
            }
        });
    }
    proof.add_line(0, false, 0).unwrap();
    proof.set_expression_text(0, "P &").unwrap();

    assert!(eventually(|| statuses
        .lock()
        .unwrap()
        .contains(&Status::InvalidExpression)));
    // Settled without a rule check, so the checker was never asked.
    assert_eq!(checker.calls(), 0);
}

#[test]
fn dropping_the_proof_stops_its_timers() {
    let checker = Arc::new(CountingChecker::new(|_| Ok(Verdict::Valid)));
    {
        let proof = timed_proof(&checker);
        proof.add_premise();
        proof.set_expression_text(0, "P").unwrap();
        proof.add_line(1, false, 0).unwrap();
        proof.set_rule(1, Some(RuleKind::Reiteration)).unwrap();
        proof.toggle_premise(1, 0).unwrap();
        proof.set_expression_text(1, "P ").unwrap();
    }
    let after_drop = checker.calls();
    thread::sleep(QUIET * 3);
    assert_eq!(checker.calls(), after_drop);
}
