//! Shared test utilities and fixtures
//!
//! Common infrastructure for integration tests.

#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use deduct_core::{CheckRequest, CheckerFault, ExternalChecker, Proof, ProofContext, Verdict};
use deduct_types::RuleKind;

/// An empty unrestricted proof verified in process.
pub fn local_proof() -> Proof {
    Proof::new([], ProofContext::default())
}

/// Appends a premise with `text` and returns its index.
pub fn premise(proof: &Proof, text: &str) -> usize {
    let id = proof.add_premise();
    let index = proof.index_of(id).unwrap();
    proof.set_expression_text(index, text).unwrap();
    index
}

/// Appends a level-`level` line justified by `rule` from `premises`.
pub fn derive(proof: &Proof, level: usize, text: &str, rule: RuleKind, premises: &[usize]) -> usize {
    let index = proof.len();
    proof.add_line(index, false, level).unwrap();
    proof.set_expression_text(index, text).unwrap();
    proof.set_rule(index, Some(rule)).unwrap();
    for &premise in premises {
        proof.toggle_premise(index, premise).unwrap();
    }
    index
}

/// Appends an assumption opening a subproof at `level`.
pub fn assume(proof: &Proof, level: usize, text: &str) -> usize {
    let index = proof.len();
    proof.add_line(index, true, level).unwrap();
    proof.set_expression_text(index, text).unwrap();
    index
}

/// Records every request and answers with a fixed result.
pub struct CountingChecker {
    answer: fn(&CheckRequest) -> Result<Verdict, CheckerFault>,
    calls: AtomicUsize,
    seen: Mutex<Vec<(Instant, CheckRequest)>>,
}

impl CountingChecker {
    pub fn new(answer: fn(&CheckRequest) -> Result<Verdict, CheckerFault>) -> Self {
        Self {
            answer,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<(Instant, CheckRequest)> {
        self.seen.lock().unwrap().clone()
    }
}

impl ExternalChecker for CountingChecker {
    fn check(&self, request: &CheckRequest) -> Result<Verdict, CheckerFault> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .unwrap()
            .push((Instant::now(), request.clone()));
        (self.answer)(request)
    }
}

/// A small finished proof: modus ponens, a conditional proof and a goal.
pub const SAMPLE_PROOF: &str = r#"{
  "version": 1,
  "restricted_rules": [],
  "lines": [
    {"text": "P", "assumption": true},
    {"text": "P -> Q", "assumption": true},
    {"text": "Q", "premises": [0, 1], "rule": "modus_ponens"},
    {"text": "R", "assumption": true, "depth": 1},
    {"text": "Q", "depth": 1, "premises": [2], "rule": "reiteration"},
    {"text": "R -> Q", "premises": [3], "rule": "conditional_proof"},
    {"text": "Q & (R -> Q)", "premises": [2, 5], "rule": "conjunction"},
    {"text": "", "premises": [0, 1], "rule": "modus_ponens"}
  ],
  "goals": ["Q & (R -> Q)"]
}"#;
