//! JSON interchange format.
//!
//! The same document is what the editor saves and what the external checker
//! receives. Premises are referenced by 0-based line number.

use std::collections::BTreeSet;

use deduct_types::RuleKind;
use serde::{Deserialize, Serialize};

use crate::errors::InterchangeError;
use crate::proof::{Proof, ProofContext};
use crate::scope::{self, Layout, Row};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofDocument {
    pub version: u32,
    /// Rules the proof is restricted to; empty allows every rule.
    #[serde(default)]
    pub restricted_rules: BTreeSet<RuleKind>,
    #[serde(default)]
    pub lines: Vec<LineRecord>,
    #[serde(default)]
    pub goals: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRecord {
    pub text: String,
    #[serde(default)]
    pub assumption: bool,
    #[serde(default)]
    pub depth: usize,
    #[serde(default)]
    pub premises: Vec<usize>,
    #[serde(default)]
    pub rule: Option<RuleKind>,
}

impl Default for ProofDocument {
    fn default() -> Self {
        Self {
            version: FORMAT_VERSION,
            restricted_rules: BTreeSet::new(),
            lines: Vec::new(),
            goals: Vec::new(),
        }
    }
}

impl ProofDocument {
    /// Parses and validates a document.
    pub fn from_json(text: &str) -> Result<Self, InterchangeError> {
        let document: Self = serde_json::from_str(text)?;
        document.validate()?;
        Ok(document)
    }

    pub fn to_json(&self) -> Result<String, InterchangeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks the version, the nesting, and that every premise reference is
    /// one the cited line could record.
    pub fn validate(&self) -> Result<(), InterchangeError> {
        if self.version != FORMAT_VERSION {
            return Err(InterchangeError::UnsupportedVersion(self.version));
        }
        let layout = self.layout()?;
        for (line, record) in self.lines.iter().enumerate() {
            if record.assumption && !record.premises.is_empty() {
                return Err(InterchangeError::AssumptionWithPremises { line });
            }
            if let Some(&premise) = record
                .premises
                .iter()
                .find(|&&premise| !layout.is_accessible(premise, line))
            {
                return Err(InterchangeError::BadPremise { line, premise });
            }
        }
        Ok(())
    }

    pub(crate) fn layout(&self) -> Result<Layout, InterchangeError> {
        let rows: Vec<Row> = self
            .lines
            .iter()
            .map(|record| Row::new(record.depth, record.assumption))
            .collect();
        scope::validate(&rows)?;
        Ok(Layout::new(rows))
    }
}

pub fn serialize(proof: &Proof) -> Result<String, InterchangeError> {
    proof.document().to_json()
}

pub fn deserialize(text: &str, context: ProofContext) -> Result<Proof, InterchangeError> {
    Proof::from_document(&ProofDocument::from_json(text)?, context)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(text: &str, assumption: bool, depth: usize, premises: &[usize]) -> LineRecord {
        LineRecord {
            text: text.to_string(),
            assumption,
            depth,
            premises: premises.to_vec(),
            rule: None,
        }
    }

    #[test]
    fn reads_minimal_document() {
        let json = r#"{"version": 1, "lines": [{"text": "P", "assumption": true}]}"#;
        let document = ProofDocument::from_json(json).unwrap();
        assert_eq!(document.lines, vec![record("P", true, 0, &[])]);
        assert!(document.goals.is_empty());
    }

    #[test]
    fn rule_identifiers_are_snake_case() {
        let mut document = ProofDocument::default();
        document.lines.push(record("P", true, 0, &[]));
        let mut line = record("P", false, 0, &[0]);
        line.rule = Some(RuleKind::ModusPonens);
        document.lines.push(line);
        let json = document.to_json().unwrap();
        assert!(json.contains("\"modus_ponens\""), "{json}");
        assert_eq!(ProofDocument::from_json(&json).unwrap(), document);
    }

    #[test]
    fn rejects_future_versions() {
        let err = ProofDocument::from_json(r#"{"version": 2}"#).unwrap_err();
        assert!(matches!(err, InterchangeError::UnsupportedVersion(2)));
    }

    #[test]
    fn rejects_inaccessible_premises() {
        let mut document = ProofDocument::default();
        document.lines = vec![
            record("Q", true, 1, &[]),
            record("Q", false, 1, &[]),
            record("R", false, 0, &[1]),
        ];
        assert!(matches!(
            document.validate(),
            Err(InterchangeError::BadPremise { line: 2, premise: 1 })
        ));
    }

    #[test]
    fn rejects_ill_formed_nesting() {
        let mut document = ProofDocument::default();
        document.lines = vec![record("P", false, 1, &[])];
        assert!(matches!(
            document.validate(),
            Err(InterchangeError::Structure(_))
        ));
    }
}
