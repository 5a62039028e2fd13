//! The reference scenarios, run against the in-process rules.

use deduct_core::StructureError;
use deduct_types::{ErrorRange, Expression, RuleKind, Status};

use crate::common::{assume, derive, local_proof, premise};

#[test]
fn reiterating_a_premise_is_correct() {
    let proof = local_proof();
    let p = premise(&proof, "P");
    let line = derive(&proof, 0, "P", RuleKind::Reiteration, &[p]);

    let view = proof.line(line).unwrap();
    assert_eq!(view.status, Status::Correct);
    assert_eq!(view.message.as_deref(), Some("Line is Correct!"));
}

#[test]
fn reiterating_something_else_is_an_invalid_claim() {
    let proof = local_proof();
    let p = premise(&proof, "P");
    let line = derive(&proof, 0, "Q", RuleKind::Reiteration, &[p]);

    let view = proof.line(line).unwrap();
    assert_eq!(view.status, Status::InvalidClaim);
    let message = view.message.unwrap();
    assert!(message.contains("Q"), "{message}");
}

#[test]
fn malformed_text_highlights_the_trailing_operator() {
    let proof = local_proof();
    proof.add_line(0, false, 0).unwrap();
    proof.set_expression_text(0, "P &").unwrap();

    assert_eq!(proof.verify_line(0).unwrap(), Status::InvalidExpression);
    let view = proof.line(0).unwrap();
    let range = view.error_range.expect("a malformed line has a range");
    assert_eq!(range, ErrorRange::new(2, 3));
    assert_eq!(range.slice(&view.text), Some("&"));
}

#[test]
fn conditional_proof_consumes_its_subproof() {
    let proof = local_proof();
    let assumption = assume(&proof, 1, "P");
    let inner = derive(&proof, 1, "P", RuleKind::Reiteration, &[assumption]);
    let conclusion = derive(&proof, 0, "P -> P", RuleKind::ConditionalProof, &[assumption]);

    assert_eq!(proof.line(inner).unwrap().status, Status::Correct);
    assert_eq!(proof.line(conclusion).unwrap().status, Status::Correct);

    let claim = proof.claim(conclusion).expect("a correct line keeps its claim");
    assert_eq!(claim.premises().len(), 1);
    assert_eq!(
        claim.premises()[0].subproof_conclusions(),
        Some(&[Expression::atom("P")][..])
    );
}

#[test]
fn deleting_a_cited_premise_resets_then_fails_the_line() {
    let proof = local_proof();
    let p = premise(&proof, "P");
    let line = derive(&proof, 0, "P", RuleKind::Reiteration, &[p]);
    assert_eq!(proof.line(line).unwrap().status, Status::Correct);

    proof.delete(p).unwrap();
    let view = proof.line(0).unwrap();
    assert_eq!(view.status, Status::None);
    assert!(view.premises.is_empty());
    assert!(proof.claim(0).is_none());

    assert_eq!(proof.verify_line(0).unwrap(), Status::InvalidClaim);
    assert_eq!(
        proof.line(0).unwrap().message.as_deref(),
        Some("Reiteration requires exactly 1 premise, but 0 were cited")
    );
}

#[test]
fn assumptions_cannot_cite_premises() {
    let proof = local_proof();
    let p = premise(&proof, "P");
    let assumption = assume(&proof, 1, "Q");
    assert_eq!(
        proof.toggle_premise(assumption, p),
        Err(StructureError::AssumptionHasNoPremises { index: assumption })
    );
}

#[test]
fn missing_rule_is_reported() {
    let proof = local_proof();
    proof.add_line(0, false, 0).unwrap();
    proof.set_expression_text(0, "P | Q").unwrap();
    assert_eq!(proof.verify_line(0).unwrap(), Status::NoRule);
    assert_eq!(
        proof.line(0).unwrap().message.as_deref(),
        Some("Rule Not Specified")
    );
}

#[test]
fn blank_lines_stay_none() {
    let proof = local_proof();
    proof.add_line(0, false, 0).unwrap();
    proof.set_expression_text(0, "   ").unwrap();
    assert_eq!(proof.verify_line(0).unwrap(), Status::None);
    assert!(proof.line(0).unwrap().error_range.is_none());
}
