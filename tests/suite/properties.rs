//! Whole-proof properties: independence, idempotence, invalidation and scope.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use deduct_core::{Proof, ProofContext, ProofEvent, StructureError, deserialize};
use deduct_types::{RuleKind, Status};

use crate::common::{SAMPLE_PROOF, assume, derive, local_proof, premise};

fn sample() -> Proof {
    deserialize(SAMPLE_PROOF, ProofContext::default()).unwrap()
}

#[test]
fn line_by_line_agrees_with_whole_proof() {
    let whole = sample();
    let summary = whole.verify_proof();

    for index in 0..summary.lines.len() {
        let single = sample();
        assert_eq!(
            single.verify_line(index).unwrap(),
            summary.lines[index],
            "line {}",
            index + 1
        );
        assert_eq!(single.line(index), whole.line(index));
    }
    assert!(summary.is_complete(), "{summary:?}");
}

#[test]
fn verification_is_idempotent() {
    let proof = sample();
    proof.verify_proof();
    let first = proof.snapshot();
    let count = proof.modification_count();

    proof.verify_proof();
    for index in 0..proof.len() {
        proof.verify_line(index).unwrap();
    }
    assert_eq!(proof.snapshot(), first);
    assert_eq!(proof.modification_count(), count);
}

#[test]
fn editing_a_line_only_resets_its_dependents() {
    let proof = sample();
    proof.verify_proof();
    let events = Arc::new(Mutex::new(Vec::new()));
    {
        let events = events.clone();
        proof.subscribe(move |event| events.lock().unwrap().push(event.clone()));
    }

    // Line 3 ("Q") is cited by lines 5 and 7.
    proof.set_expression_text(2, "Q ").unwrap();
    let snapshot = proof.snapshot();
    let none: BTreeSet<usize> = snapshot
        .lines
        .iter()
        .filter(|line| line.status == Status::None)
        .map(|line| line.number)
        .collect();
    assert_eq!(none, BTreeSet::from([0, 1, 2, 3, 4, 6, 7]));
    assert_eq!(snapshot.lines[5].status, Status::Correct);
    assert_eq!(snapshot.goals[0].status, Status::None);

    // Nothing was re-verified eagerly.
    let events = events.lock().unwrap();
    assert!(
        !events
            .iter()
            .any(|event| matches!(event, ProofEvent::StatusChanged { status: Status::Correct, .. }))
    );
}

#[test]
fn editing_a_subproof_conclusion_resets_the_consuming_line() {
    let proof = sample();
    proof.verify_proof();
    proof.set_expression_text(4, "Q").unwrap();
    assert_eq!(proof.line(5).unwrap().status, Status::Correct);

    proof.set_expression_text(4, "R").unwrap();
    assert_eq!(proof.line(5).unwrap().status, Status::None);
    assert_eq!(proof.verify_line(5).unwrap(), Status::InvalidClaim);
}

#[test]
fn out_of_scope_premises_are_rejected_without_mutation() {
    let proof = local_proof();
    let p = premise(&proof, "P");
    let a = assume(&proof, 1, "Q");
    let inner = derive(&proof, 1, "P", RuleKind::Reiteration, &[p]);
    let outer = derive(&proof, 0, "Q -> P", RuleKind::ConditionalProof, &[a]);
    let before = proof.snapshot();
    let count = proof.modification_count();

    assert_eq!(
        proof.accessible_premises(outer).unwrap(),
        BTreeSet::from([p, a])
    );
    assert_eq!(proof.highlighted(outer).unwrap(), proof.accessible_premises(outer).unwrap());
    assert_eq!(
        proof.toggle_premise(outer, inner),
        Err(StructureError::PremiseNotAccessible {
            line: outer,
            premise: inner
        })
    );
    assert_eq!(
        proof.toggle_premise(inner, outer),
        Err(StructureError::PremiseNotAccessible {
            line: inner,
            premise: outer
        })
    );
    assert_eq!(proof.snapshot(), before);
    assert_eq!(proof.modification_count(), count);
}

#[test]
fn structural_edits_renumber_and_keep_premises() {
    let proof = local_proof();
    let p = premise(&proof, "P");
    let line = derive(&proof, 0, "P", RuleKind::Reiteration, &[p]);
    let id = proof.line_id(line).unwrap();

    let q = premise(&proof, "Q");
    assert_eq!(q, 1);
    assert_eq!(proof.index_of(id), Some(2));
    let view = proof.line(2).unwrap();
    assert_eq!(view.number, 2);
    assert_eq!(view.premises, vec![0]);

    proof.delete(q).unwrap();
    assert_eq!(proof.index_of(id), Some(1));
    assert_eq!(proof.line(1).unwrap().premises, vec![0]);
}

#[test]
fn restriction_is_an_allow_list() {
    let proof = Proof::new([RuleKind::ModusPonens], ProofContext::default());
    let p = premise(&proof, "P");
    let pq = premise(&proof, "P -> Q");
    let allowed = derive(&proof, 0, "Q", RuleKind::ModusPonens, &[p, pq]);
    let blocked = derive(&proof, 0, "P", RuleKind::Reiteration, &[p]);

    assert_eq!(proof.line(allowed).unwrap().status, Status::Correct);
    assert_eq!(proof.line(blocked).unwrap().status, Status::InvalidClaim);

    proof.set_restricted_rules([]);
    assert_eq!(proof.verify_line(blocked).unwrap(), Status::Correct);
}

#[test]
fn auto_fill_suggests_the_licensed_conclusion() {
    let proof = sample();
    assert_eq!(proof.auto_fill(7).unwrap().as_deref(), Some("Q"));
    assert_eq!(proof.line(7).unwrap().status, Status::Correct);
}
