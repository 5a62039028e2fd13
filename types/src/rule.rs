//! The inference rule catalog.
//!
//! Every rule is a variant of [`RuleKind`]; checking is a pure function of a
//! [`Claim`]. Adding a rule means adding a variant, its names, and an arm in
//! [`RuleKind::check`] (plus [`RuleKind::auto_fill_candidates`] when the
//! conclusion can be computed from the premises).

use std::fmt;
use std::iter;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::claim::{Claim, Premise};
use crate::expression::Expression;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Reiteration,
    Conjunction,
    Simplification,
    Addition,
    DisjunctiveSyllogism,
    ModusPonens,
    ModusTollens,
    HypotheticalSyllogism,
    DoubleNegation,
    BiconditionalIntroduction,
    BiconditionalElimination,
    Contradiction,
    PrincipleOfExplosion,
    ExcludedMiddle,
    ConditionalProof,
    IndirectProof,
    ProofByCases,
    UniversalInstantiation,
    ExistentialGeneralization,
}

/// A claim that the selected rule does not license.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct RuleViolation(String);

impl RuleViolation {
    #[must_use]
    pub fn message(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown rule '{0}'")]
pub struct UnknownRule(pub String);

impl RuleKind {
    pub const ALL: [RuleKind; 19] = [
        Self::Reiteration,
        Self::Conjunction,
        Self::Simplification,
        Self::Addition,
        Self::DisjunctiveSyllogism,
        Self::ModusPonens,
        Self::ModusTollens,
        Self::HypotheticalSyllogism,
        Self::DoubleNegation,
        Self::BiconditionalIntroduction,
        Self::BiconditionalElimination,
        Self::Contradiction,
        Self::PrincipleOfExplosion,
        Self::ExcludedMiddle,
        Self::ConditionalProof,
        Self::IndirectProof,
        Self::ProofByCases,
        Self::UniversalInstantiation,
        Self::ExistentialGeneralization,
    ];

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Reiteration => "Reiteration",
            Self::Conjunction => "Conjunction",
            Self::Simplification => "Simplification",
            Self::Addition => "Addition",
            Self::DisjunctiveSyllogism => "Disjunctive Syllogism",
            Self::ModusPonens => "Modus Ponens",
            Self::ModusTollens => "Modus Tollens",
            Self::HypotheticalSyllogism => "Hypothetical Syllogism",
            Self::DoubleNegation => "Double Negation",
            Self::BiconditionalIntroduction => "Biconditional Introduction",
            Self::BiconditionalElimination => "Biconditional Elimination",
            Self::Contradiction => "Contradiction",
            Self::PrincipleOfExplosion => "Principle of Explosion",
            Self::ExcludedMiddle => "Excluded Middle",
            Self::ConditionalProof => "Conditional Proof",
            Self::IndirectProof => "Indirect Proof",
            Self::ProofByCases => "Proof by Cases",
            Self::UniversalInstantiation => "Universal Instantiation",
            Self::ExistentialGeneralization => "Existential Generalization",
        }
    }

    /// Stable identifier used in saved proofs and configuration.
    #[must_use]
    pub const fn identifier(self) -> &'static str {
        match self {
            Self::Reiteration => "reiteration",
            Self::Conjunction => "conjunction",
            Self::Simplification => "simplification",
            Self::Addition => "addition",
            Self::DisjunctiveSyllogism => "disjunctive_syllogism",
            Self::ModusPonens => "modus_ponens",
            Self::ModusTollens => "modus_tollens",
            Self::HypotheticalSyllogism => "hypothetical_syllogism",
            Self::DoubleNegation => "double_negation",
            Self::BiconditionalIntroduction => "biconditional_introduction",
            Self::BiconditionalElimination => "biconditional_elimination",
            Self::Contradiction => "contradiction",
            Self::PrincipleOfExplosion => "principle_of_explosion",
            Self::ExcludedMiddle => "excluded_middle",
            Self::ConditionalProof => "conditional_proof",
            Self::IndirectProof => "indirect_proof",
            Self::ProofByCases => "proof_by_cases",
            Self::UniversalInstantiation => "universal_instantiation",
            Self::ExistentialGeneralization => "existential_generalization",
        }
    }

    /// Rules whose justification is a whole subproof rather than single lines.
    #[must_use]
    pub const fn consumes_subproof(self) -> bool {
        matches!(
            self,
            Self::ConditionalProof | Self::IndirectProof | Self::ProofByCases
        )
    }

    /// Whether a conclusion can be suggested from the premises alone.
    #[must_use]
    pub const fn can_auto_fill(self) -> bool {
        !matches!(
            self,
            Self::Addition
                | Self::PrincipleOfExplosion
                | Self::ExcludedMiddle
                | Self::UniversalInstantiation
                | Self::ExistentialGeneralization
        )
    }

    pub fn check(self, claim: &Claim) -> Result<(), RuleViolation> {
        let conclusion = claim.conclusion();
        match self {
            Self::Reiteration => {
                let premises = self.plain_premises(claim, 1)?;
                if premises[0] == conclusion {
                    Ok(())
                } else {
                    Err(violation(format!(
                        "\"{conclusion}\" is not the same as the cited premise \"{}\"",
                        premises[0]
                    )))
                }
            }
            Self::Conjunction => check_conjunction(self.any_plain_premises(claim)?, conclusion),
            Self::Simplification => {
                let premises = self.plain_premises(claim, 1)?;
                check_simplification(premises[0], conclusion)
            }
            Self::Addition => {
                let premises = self.plain_premises(claim, 1)?;
                let premise = premises[0];
                match conclusion.disjuncts() {
                    Some(ops) if ops.contains(premise) => Ok(()),
                    Some(_) => Err(violation(format!(
                        "\"{conclusion}\" does not contain the cited premise \"{premise}\" as a disjunct"
                    ))),
                    None => Err(violation(format!("\"{conclusion}\" is not a disjunction"))),
                }
            }
            Self::DisjunctiveSyllogism => {
                let premises = self.any_plain_premises(claim)?;
                self.expect_candidate(conclusion, disjunctive_syllogism(&premises), || {
                    "Disjunctive Syllogism requires a disjunction and the negation of each \
                     disjunct being eliminated"
                        .to_string()
                })
            }
            Self::ModusPonens => {
                let premises = self.plain_premises(claim, 2)?;
                self.expect_candidate(conclusion, modus_ponens(&premises), || {
                    missing_pair(&premises, "an implication and its antecedent")
                })
            }
            Self::ModusTollens => {
                let premises = self.plain_premises(claim, 2)?;
                self.expect_candidate(conclusion, modus_tollens(&premises), || {
                    missing_pair(&premises, "an implication and the negation of its consequent")
                })
            }
            Self::HypotheticalSyllogism => {
                let premises = self.plain_premises(claim, 2)?;
                self.expect_candidate(conclusion, hypothetical_syllogism(&premises), || {
                    missing_pair(&premises, "two chained implications")
                })
            }
            Self::DoubleNegation => {
                let premises = self.plain_premises(claim, 1)?;
                let premise = premises[0];
                let added = conclusion.negated().and_then(Expression::negated) == Some(premise);
                let removed = premise.negated().and_then(Expression::negated) == Some(conclusion);
                if added || removed {
                    Ok(())
                } else {
                    Err(violation(format!(
                        "\"{conclusion}\" and \"{premise}\" do not differ by a double negation"
                    )))
                }
            }
            Self::BiconditionalIntroduction => {
                let premises = self.plain_premises(claim, 2)?;
                self.expect_candidate(conclusion, biconditional_introduction(&premises), || {
                    missing_pair(&premises, "an implication and its converse")
                })
            }
            Self::BiconditionalElimination => {
                let premises = self.plain_premises(claim, 2)?;
                self.expect_candidate(conclusion, biconditional_elimination(&premises), || {
                    missing_pair(&premises, "a biconditional and one of its sides")
                })
            }
            Self::Contradiction => {
                let premises = self.plain_premises(claim, 2)?;
                if !contradicts(&premises) {
                    return Err(violation(missing_pair(
                        &premises,
                        "a sentence and its negation",
                    )));
                }
                if *conclusion == Expression::Contradiction {
                    Ok(())
                } else {
                    Err(violation(format!(
                        "Contradiction concludes ⊥, not \"{conclusion}\""
                    )))
                }
            }
            Self::PrincipleOfExplosion => {
                let premises = self.plain_premises(claim, 1)?;
                if *premises[0] == Expression::Contradiction {
                    Ok(())
                } else {
                    Err(violation(format!(
                        "The cited premise \"{}\" is not ⊥",
                        premises[0]
                    )))
                }
            }
            Self::ExcludedMiddle => {
                self.plain_premises(claim, 0)?;
                let excluded = conclusion.disjuncts().is_some_and(|ops| {
                    ops.len() == 2
                        && (ops[1].negated() == Some(&ops[0]) || ops[0].negated() == Some(&ops[1]))
                });
                if excluded {
                    Ok(())
                } else {
                    Err(violation(format!(
                        "\"{conclusion}\" is not a sentence disjoined with its negation"
                    )))
                }
            }
            Self::ConditionalProof => {
                let (assumption, conclusions) = self.single_subproof(claim)?;
                let Some((antecedent, consequent)) = conclusion.as_implication() else {
                    return Err(violation(format!("\"{conclusion}\" is not an implication")));
                };
                if antecedent != assumption {
                    return Err(violation(format!(
                        "The antecedent \"{antecedent}\" is not the subproof's assumption \"{assumption}\""
                    )));
                }
                if conclusions.contains(consequent) {
                    Ok(())
                } else {
                    Err(violation(format!(
                        "The consequent \"{consequent}\" is not derived in the subproof"
                    )))
                }
            }
            Self::IndirectProof => {
                let (assumption, conclusions) = self.single_subproof(claim)?;
                if !conclusions.contains(&Expression::Contradiction) {
                    return Err(violation("The subproof does not derive ⊥"));
                }
                if indirect_proof(assumption).contains(conclusion) {
                    Ok(())
                } else {
                    Err(violation(format!(
                        "\"{conclusion}\" is not the negation of the subproof's assumption \"{assumption}\""
                    )))
                }
            }
            Self::ProofByCases => self.check_cases(claim),
            Self::UniversalInstantiation => {
                let premises = self.plain_premises(claim, 1)?;
                let Expression::Forall { var, body } = premises[0] else {
                    return Err(violation(format!(
                        "The cited premise \"{}\" is not a universal",
                        premises[0]
                    )));
                };
                if body.is_instantiated_by(var, conclusion) {
                    Ok(())
                } else {
                    Err(violation(format!(
                        "\"{conclusion}\" is not an instance of \"{}\"",
                        premises[0]
                    )))
                }
            }
            Self::ExistentialGeneralization => {
                let premises = self.plain_premises(claim, 1)?;
                let Expression::Exists { var, body } = conclusion else {
                    return Err(violation(format!("\"{conclusion}\" is not an existential")));
                };
                if body.is_instantiated_by(var, premises[0]) {
                    Ok(())
                } else {
                    Err(violation(format!(
                        "The cited premise \"{}\" is not an instance of \"{conclusion}\"",
                        premises[0]
                    )))
                }
            }
        }
    }

    /// Conclusions this rule would license from `premises`, most likely first,
    /// without duplicates.
    #[must_use]
    pub fn auto_fill_candidates(self, premises: &[Premise]) -> Vec<String> {
        if !self.can_auto_fill() {
            return Vec::new();
        }
        let plain: Vec<&Expression> = premises
            .iter()
            .filter(|premise| !premise.is_subproof())
            .map(Premise::expression)
            .collect();
        let subproofs: Vec<(&Expression, &[Expression])> = premises
            .iter()
            .filter_map(|premise| {
                premise
                    .subproof_conclusions()
                    .map(|conclusions| (premise.expression(), conclusions))
            })
            .collect();

        let candidates: Vec<Expression> = match self {
            Self::Reiteration => plain.iter().map(|&p| p.clone()).collect(),
            Self::Conjunction if plain.len() >= 2 => {
                vec![Expression::And(plain.iter().map(|&p| p.clone()).collect())]
            }
            Self::Simplification => plain
                .iter()
                .filter_map(|&p| p.conjuncts())
                .flatten()
                .cloned()
                .collect(),
            Self::DisjunctiveSyllogism => disjunctive_syllogism(&plain),
            Self::ModusPonens => modus_ponens(&plain),
            Self::ModusTollens => modus_tollens(&plain),
            Self::HypotheticalSyllogism => hypothetical_syllogism(&plain),
            Self::DoubleNegation => plain
                .iter()
                .flat_map(|&p| {
                    let stripped = p.negated().and_then(Expression::negated).cloned();
                    stripped
                        .into_iter()
                        .chain(iter::once(p.clone().negate().negate()))
                })
                .collect(),
            Self::BiconditionalIntroduction => biconditional_introduction(&plain),
            Self::BiconditionalElimination => biconditional_elimination(&plain),
            Self::Contradiction if contradicts(&plain) => vec![Expression::Contradiction],
            Self::ConditionalProof => subproofs
                .iter()
                .flat_map(|&(assumption, conclusions)| {
                    conclusions
                        .iter()
                        .rev()
                        .map(move |c| assumption.clone().implies(c.clone()))
                })
                .collect(),
            Self::IndirectProof => subproofs
                .iter()
                .filter(|(_, conclusions)| conclusions.contains(&Expression::Contradiction))
                .flat_map(|&(assumption, _)| indirect_proof(assumption))
                .collect(),
            Self::ProofByCases => common_conclusions(&subproofs),
            _ => Vec::new(),
        };

        let mut seen = Vec::new();
        for candidate in candidates {
            let text = candidate.to_string();
            if !seen.contains(&text) {
                seen.push(text);
            }
        }
        seen
    }

    /// Premises of a rule that cites individual lines, checked for count.
    fn plain_premises<'a>(
        self,
        claim: &'a Claim,
        expected: usize,
    ) -> Result<Vec<&'a Expression>, RuleViolation> {
        let premises = self.any_plain_premises(claim)?;
        if premises.len() == expected {
            Ok(premises)
        } else {
            Err(violation(format!(
                "{} requires exactly {}, but {} cited",
                self.display_name(),
                count(expected, "premise"),
                cited(premises.len()),
            )))
        }
    }

    fn any_plain_premises<'a>(self, claim: &'a Claim) -> Result<Vec<&'a Expression>, RuleViolation> {
        claim
            .premises()
            .iter()
            .map(|premise| {
                if premise.is_subproof() {
                    Err(violation(format!(
                        "{} cannot cite the subproof assumed by \"{}\"",
                        self.display_name(),
                        premise.expression()
                    )))
                } else {
                    Ok(premise.expression())
                }
            })
            .collect()
    }

    fn single_subproof(
        self,
        claim: &Claim,
    ) -> Result<(&Expression, &[Expression]), RuleViolation> {
        let mut subproofs = claim.premises().iter().filter_map(|premise| {
            premise
                .subproof_conclusions()
                .map(|conclusions| (premise.expression(), conclusions))
        });
        let Some((assumption, conclusions)) = subproofs.next() else {
            return Err(self.missing_subproof());
        };
        if claim.premises().len() != 1 {
            return Err(violation(format!(
                "{} requires exactly 1 subproof premise, but {} cited",
                self.display_name(),
                cited(claim.premises().len())
            )));
        }
        if conclusions.is_empty() {
            return Err(violation(format!(
                "The subproof assuming \"{assumption}\" derives nothing"
            )));
        }
        Ok((assumption, conclusions))
    }

    fn missing_subproof(self) -> RuleViolation {
        violation(format!(
            "{} requires a subproof premise whose assumption opens a subproof directly \
             inside this line's scope",
            self.display_name()
        ))
    }

    fn check_cases(self, claim: &Claim) -> Result<(), RuleViolation> {
        let conclusion = claim.conclusion();
        let disjunctions: Vec<&Expression> = claim
            .premises()
            .iter()
            .filter(|premise| !premise.is_subproof())
            .map(Premise::expression)
            .collect();
        let subproofs: Vec<(&Expression, &[Expression])> = claim
            .premises()
            .iter()
            .filter_map(|premise| {
                premise
                    .subproof_conclusions()
                    .map(|conclusions| (premise.expression(), conclusions))
            })
            .collect();
        if subproofs.is_empty() {
            return Err(self.missing_subproof());
        }
        let [disjunction] = disjunctions.as_slice() else {
            return Err(violation(format!(
                "Proof by Cases requires exactly one disjunction among its premises, but {} cited",
                cited(disjunctions.len())
            )));
        };
        let Some(cases) = disjunction.disjuncts() else {
            return Err(violation(format!(
                "The cited premise \"{disjunction}\" is not a disjunction"
            )));
        };
        for &(assumption, _) in &subproofs {
            if !cases.contains(assumption) {
                return Err(violation(format!(
                    "The subproof assuming \"{assumption}\" is not a case of \"{disjunction}\""
                )));
            }
        }
        for case in cases {
            let derived = subproofs
                .iter()
                .filter(|(assumption, _)| *assumption == case)
                .any(|(_, conclusions)| conclusions.contains(conclusion));
            if !derived {
                return Err(violation(format!(
                    "No cited subproof assumes the case \"{case}\" and derives \"{conclusion}\""
                )));
            }
        }
        Ok(())
    }

    fn expect_candidate(
        self,
        conclusion: &Expression,
        candidates: Vec<Expression>,
        missing: impl FnOnce() -> String,
    ) -> Result<(), RuleViolation> {
        if candidates.is_empty() {
            return Err(violation(missing()));
        }
        if candidates.contains(conclusion) {
            return Ok(());
        }
        let expected: Vec<String> = candidates.iter().map(|c| format!("\"{c}\"")).collect();
        Err(violation(format!(
            "\"{conclusion}\" does not follow by {}; expected {}",
            self.display_name(),
            expected.join(" or ")
        )))
    }
}

fn violation(message: impl Into<String>) -> RuleViolation {
    RuleViolation(message.into())
}

fn count(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("1 {noun}")
    } else {
        format!("{n} {noun}s")
    }
}

fn cited(n: usize) -> String {
    if n == 1 {
        "1 was".to_string()
    } else {
        format!("{n} were")
    }
}

fn missing_pair(premises: &[&Expression], wanted: &str) -> String {
    let listed: Vec<String> = premises.iter().map(|p| format!("\"{p}\"")).collect();
    format!("The cited premises {} are not {wanted}", listed.join(" and "))
}

/// Ordered pairs of distinct premises.
fn pairs<'a>(
    premises: &'a [&'a Expression],
) -> impl Iterator<Item = (&'a Expression, &'a Expression)> + 'a {
    premises.iter().enumerate().flat_map(move |(i, &a)| {
        premises
            .iter()
            .enumerate()
            .filter(move |&(j, _)| j != i)
            .map(move |(_, &b)| (a, b))
    })
}

fn modus_ponens(premises: &[&Expression]) -> Vec<Expression> {
    pairs(premises)
        .filter_map(|(implication, other)| {
            let (antecedent, consequent) = implication.as_implication()?;
            (antecedent == other).then(|| consequent.clone())
        })
        .collect()
}

fn modus_tollens(premises: &[&Expression]) -> Vec<Expression> {
    pairs(premises)
        .filter_map(|(implication, other)| {
            let (antecedent, consequent) = implication.as_implication()?;
            (other.negated() == Some(consequent)).then(|| antecedent.clone().negate())
        })
        .collect()
}

fn hypothetical_syllogism(premises: &[&Expression]) -> Vec<Expression> {
    pairs(premises)
        .filter_map(|(first, second)| {
            let (a, b) = first.as_implication()?;
            let (b2, c) = second.as_implication()?;
            (b == b2).then(|| a.clone().implies(c.clone()))
        })
        .collect()
}

fn biconditional_introduction(premises: &[&Expression]) -> Vec<Expression> {
    pairs(premises)
        .filter_map(|(forward, backward)| {
            let (a, b) = forward.as_implication()?;
            let (b2, a2) = backward.as_implication()?;
            (a == a2 && b == b2).then(|| a.clone().iff(b.clone()))
        })
        .collect()
}

fn biconditional_elimination(premises: &[&Expression]) -> Vec<Expression> {
    pairs(premises)
        .filter_map(|(biconditional, side)| {
            let Expression::Iff(left, right) = biconditional else {
                return None;
            };
            if **left == *side {
                Some((**right).clone())
            } else if **right == *side {
                Some((**left).clone())
            } else {
                None
            }
        })
        .collect()
}

fn contradicts(premises: &[&Expression]) -> bool {
    pairs(premises).any(|(sentence, other)| other.negated() == Some(sentence))
}

fn disjunctive_syllogism(premises: &[&Expression]) -> Vec<Expression> {
    let mut candidates = Vec::new();
    for (i, disjunction) in premises.iter().enumerate() {
        let Some(disjuncts) = disjunction.disjuncts() else {
            continue;
        };
        let eliminated: Option<Vec<&Expression>> = premises
            .iter()
            .enumerate()
            .filter(|&(j, _)| j != i)
            .map(|(_, p)| p.negated().filter(|inner| disjuncts.contains(*inner)))
            .collect();
        let Some(eliminated) = eliminated else {
            continue;
        };
        if eliminated.is_empty() {
            continue;
        }
        let remaining: Vec<Expression> = disjuncts
            .iter()
            .filter(|d| !eliminated.contains(d))
            .cloned()
            .collect();
        if !remaining.is_empty() {
            candidates.push(Expression::disjunction(remaining));
        }
    }
    candidates
}

fn indirect_proof(assumption: &Expression) -> Vec<Expression> {
    let mut candidates = Vec::new();
    if let Some(inner) = assumption.negated() {
        candidates.push(inner.clone());
    }
    candidates.push(assumption.clone().negate());
    candidates
}

fn common_conclusions(subproofs: &[(&Expression, &[Expression])]) -> Vec<Expression> {
    let Some(((_, first), rest)) = subproofs.split_first() else {
        return Vec::new();
    };
    first
        .iter()
        .rev()
        .filter(|&c| rest.iter().all(|(_, conclusions)| conclusions.contains(c)))
        .cloned()
        .collect()
}

fn check_conjunction(premises: Vec<&Expression>, conclusion: &Expression) -> Result<(), RuleViolation> {
    if premises.len() < 2 {
        return Err(violation(format!(
            "Conjunction requires at least 2 premises, but {} cited",
            cited(premises.len())
        )));
    }
    let Some(conjuncts) = conclusion.conjuncts() else {
        return Err(violation(format!("\"{conclusion}\" is not a conjunction")));
    };
    if let Some(extra) = conjuncts.iter().find(|c| !premises.contains(c)) {
        return Err(violation(format!(
            "The conjunct \"{extra}\" is not one of the cited premises"
        )));
    }
    if let Some(unused) = premises.iter().find(|&&p| !conjuncts.contains(p)) {
        return Err(violation(format!(
            "The cited premise \"{unused}\" does not appear in \"{conclusion}\""
        )));
    }
    Ok(())
}

fn check_simplification(premise: &Expression, conclusion: &Expression) -> Result<(), RuleViolation> {
    let Some(conjuncts) = premise.conjuncts() else {
        return Err(violation(format!(
            "The cited premise \"{premise}\" is not a conjunction"
        )));
    };
    let subset = conclusion
        .conjuncts()
        .is_some_and(|parts| parts.iter().all(|part| conjuncts.contains(part)));
    if conjuncts.contains(conclusion) || subset {
        Ok(())
    } else {
        Err(violation(format!(
            "\"{conclusion}\" is not a conjunct of \"{premise}\""
        )))
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for RuleKind {
    type Err = UnknownRule;

    /// Accepts the identifier (`modus_ponens`) or the display name,
    /// ignoring case (`Modus Ponens`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|rule| {
                rule.identifier() == trimmed || rule.display_name().eq_ignore_ascii_case(trimmed)
            })
            .ok_or_else(|| UnknownRule(trimmed.to_string()))
    }
}
