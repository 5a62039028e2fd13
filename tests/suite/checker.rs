//! The process checker talking to `deduct check-server`.

use std::sync::Arc;
use std::time::Duration;

use deduct_checker::{CheckerConfig, ProcessChecker};
use deduct_core::{
    CheckRequest, CheckerFault, ExternalChecker, Proof, ProofContext, Target, Verdict,
    VerificationEngine, deserialize,
};
use deduct_types::Status;

use crate::common::{CountingChecker, SAMPLE_PROOF};

fn server() -> ProcessChecker {
    let config = CheckerConfig::new(env!("CARGO_BIN_EXE_deduct"))
        .with_args(["check-server"])
        .with_timeout(Duration::from_secs(20));
    ProcessChecker::new(config).unwrap()
}

fn sample(engine: VerificationEngine) -> Proof {
    deserialize(SAMPLE_PROOF, ProofContext::new(engine)).unwrap()
}

#[test]
fn check_server_agrees_with_the_local_rules() {
    let checker = server();
    let document = sample(VerificationEngine::local()).document();

    let valid = checker.check(&CheckRequest {
        proof: document.clone(),
        target: Target::Line(2),
    });
    assert_eq!(valid.unwrap(), Verdict::Valid);

    let mut broken = document;
    broken.lines[2].text = "R".to_string();
    let invalid = checker
        .check(&CheckRequest {
            proof: broken,
            target: Target::Line(2),
        })
        .unwrap();
    assert!(matches!(invalid, Verdict::Invalid(ref message) if message.contains('R')));
}

#[test]
fn out_of_range_targets_are_refused_by_the_server() {
    let verdict = server()
        .check(&CheckRequest {
            proof: sample(VerificationEngine::local()).document(),
            target: Target::Line(40),
        })
        .unwrap();
    let Verdict::Invalid(message) = verdict else {
        panic!("a target past the end must be refused");
    };
    assert!(message.starts_with("The checker rejected this proof"), "{message}");
}

#[test]
fn whole_proof_through_the_server() {
    let proof = sample(VerificationEngine::with_checker(Arc::new(server())));
    let summary = proof.verify_proof();
    assert!(summary.is_complete(), "{summary:?}");
}

#[test]
fn checker_verdicts_are_used_verbatim() {
    let checker = Arc::new(CountingChecker::new(|_| {
        Ok(Verdict::Invalid("rejected upstream".to_string()))
    }));
    let proof = sample(VerificationEngine::with_checker(checker.clone()));

    assert_eq!(proof.verify_line(2).unwrap(), Status::InvalidClaim);
    assert_eq!(
        proof.line(2).unwrap().message.as_deref(),
        Some("rejected upstream")
    );
    assert_eq!(checker.calls(), 1);
    // Assumptions and blank lines never reach the checker.
    proof.verify_line(0).unwrap();
    proof.verify_line(7).unwrap();
    assert_eq!(checker.calls(), 1);
}

#[test]
fn checker_faults_fall_back_to_local_rules() {
    let checker = Arc::new(CountingChecker::new(|_| {
        Err(CheckerFault::Unavailable("offline".to_string()))
    }));
    let proof = sample(VerificationEngine::with_checker(checker.clone()));
    let summary = proof.verify_proof();
    assert!(summary.is_complete(), "{summary:?}");
    assert!(checker.calls() > 0);

    let unreachable = ProcessChecker::new(CheckerConfig::new("deduct-no-such-binary")).unwrap();
    let proof = sample(VerificationEngine::with_checker(Arc::new(unreachable)));
    assert_eq!(proof.verify_line(2).unwrap(), Status::Correct);
}

#[test]
fn goal_requests_carry_the_whole_proof() {
    let checker = Arc::new(CountingChecker::new(|_| Ok(Verdict::Valid)));
    let proof = sample(VerificationEngine::with_checker(checker.clone()));
    assert_eq!(proof.verify_goal(0).unwrap(), Status::Correct);

    let (_, request) = checker.requests().pop().unwrap();
    assert_eq!(request.target, Target::Goal(0));
    assert_eq!(request.proof, proof.document());
}
