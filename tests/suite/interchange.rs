//! Saving and loading proofs.

use deduct_core::{InterchangeError, ProofContext, ProofDocument, deserialize, serialize};
use deduct_types::{RuleKind, Status};

use crate::common::{SAMPLE_PROOF, assume, derive, local_proof, premise};

#[test]
fn round_trip_preserves_everything_saved() {
    let proof = local_proof();
    let p = premise(&proof, "P");
    let q = premise(&proof, "Q");
    let a = assume(&proof, 1, "R");
    derive(&proof, 1, "P & Q", RuleKind::Conjunction, &[p, q]);
    derive(&proof, 0, "R -> P & Q", RuleKind::ConditionalProof, &[a]);
    proof.add_line(5, false, 0).unwrap();
    proof.set_goal_text(0, "R -> P & Q").unwrap();
    proof.add_goal(1).unwrap();
    proof.set_goal_text(1, "P").unwrap();
    proof.set_restricted_rules([RuleKind::Conjunction, RuleKind::ConditionalProof]);

    let json = serialize(&proof).unwrap();
    let loaded = deserialize(&json, ProofContext::default()).unwrap();
    assert_eq!(loaded.document(), proof.document());
    assert_eq!(serialize(&loaded).unwrap(), json);

    let before = proof.snapshot();
    let after = loaded.snapshot();
    assert_eq!(before.lines.len(), after.lines.len());
    for (old, new) in before.lines.iter().zip(&after.lines) {
        assert_eq!(
            (&old.text, old.level, old.assumption, &old.premises, old.rule),
            (&new.text, new.level, new.assumption, &new.premises, new.rule)
        );
    }
    let goals: Vec<&str> = after.goals.iter().map(|goal| goal.text.as_str()).collect();
    assert_eq!(goals, ["R -> P & Q", "P"]);
    assert_eq!(
        loaded.restricted_rules(),
        [RuleKind::Conjunction, RuleKind::ConditionalProof].into()
    );
}

#[test]
fn loaded_proofs_start_unverified() {
    let proof = deserialize(SAMPLE_PROOF, ProofContext::default()).unwrap();
    assert!(
        proof
            .snapshot()
            .lines
            .iter()
            .all(|line| line.status == Status::None)
    );
    assert_eq!(proof.modification_count(), 0);
}

#[test]
fn documents_without_goals_keep_none() {
    let proof = deserialize(r#"{"version": 1, "lines": []}"#, ProofContext::default()).unwrap();
    assert!(proof.is_empty());
    assert_eq!(proof.goal_count(), 0);
    assert!(proof.verify_proof().goals.is_empty());
}

fn rejected(json: &str) -> InterchangeError {
    deserialize(json, ProofContext::default()).unwrap_err()
}

#[test]
fn invalid_documents_are_rejected() {
    assert!(matches!(rejected("not json"), InterchangeError::Json(_)));
    assert!(matches!(
        rejected(r#"{"version": 1, "lines": [{"text": "P", "rule": "modus_bogus"}]}"#),
        InterchangeError::Json(_)
    ));
    assert!(matches!(
        rejected(r#"{"version": 7, "lines": []}"#),
        InterchangeError::UnsupportedVersion(7)
    ));
    assert!(matches!(
        rejected(r#"{"version": 1, "lines": [{"text": "P"}, {"text": "Q", "premises": [1]}]}"#),
        InterchangeError::BadPremise { line: 1, premise: 1 }
    ));
    assert!(matches!(
        rejected(r#"{"version": 1, "lines": [{"text": "P", "assumption": true, "premises": [0]}]}"#),
        InterchangeError::AssumptionWithPremises { line: 0 }
    ));
    assert!(matches!(
        rejected(r#"{"version": 1, "lines": [{"text": "P", "depth": 2}]}"#),
        InterchangeError::Structure(_)
    ));
    assert!(ProofDocument::from_json(r#"{"version": 1, "lines": [{"text": "P", "depth": 1}]}"#).is_err());
}
