//! Logical sentence syntax trees.
//!
//! An [`Expression`] is immutable once built. Equality is structural: two
//! sentences written differently (`P&Q` and `P ∧ Q`) compare equal, while
//! `P ∧ Q` and `Q ∧ P` do not. Unparenthesized chains of `∧`/`∨` are
//! flattened by the parser into a single n-ary node.

use std::fmt;
use std::str::FromStr;

use crate::parser::{self, ParseFailure};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Expression {
    /// `⊥`
    Contradiction,
    /// `⊤`
    Tautology,
    /// A proposition letter (`P`) or a predicate application (`Likes(a, b)`).
    Predicate { name: String, args: Vec<String> },
    Not(Box<Expression>),
    And(Vec<Expression>),
    Or(Vec<Expression>),
    Implies(Box<Expression>, Box<Expression>),
    Iff(Box<Expression>, Box<Expression>),
    Forall { var: String, body: Box<Expression> },
    Exists { var: String, body: Box<Expression> },
}

// Binding strength, loosest first. Used only for rendering.
const PREC_IFF: u8 = 1;
const PREC_IMPLIES: u8 = 2;
const PREC_OR: u8 = 3;
const PREC_AND: u8 = 4;
const PREC_UNARY: u8 = 5;
const PREC_ATOM: u8 = 6;

impl Expression {
    #[must_use]
    pub fn atom(name: impl Into<String>) -> Self {
        Self::Predicate {
            name: name.into(),
            args: Vec::new(),
        }
    }

    #[must_use]
    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    #[must_use]
    pub fn implies(self, consequent: Expression) -> Self {
        Self::Implies(Box::new(self), Box::new(consequent))
    }

    #[must_use]
    pub fn iff(self, other: Expression) -> Self {
        Self::Iff(Box::new(self), Box::new(other))
    }

    /// Builds a conjunction, collapsing the one-operand case to the operand.
    #[must_use]
    pub fn conjunction(mut operands: Vec<Expression>) -> Self {
        if operands.len() == 1 {
            operands.remove(0)
        } else {
            Self::And(operands)
        }
    }

    /// Builds a disjunction, collapsing the one-operand case to the operand.
    #[must_use]
    pub fn disjunction(mut operands: Vec<Expression>) -> Self {
        if operands.len() == 1 {
            operands.remove(0)
        } else {
            Self::Or(operands)
        }
    }

    /// The operand of a negation.
    #[must_use]
    pub fn negated(&self) -> Option<&Expression> {
        match self {
            Self::Not(inner) => Some(inner),
            _ => None,
        }
    }

    /// Antecedent and consequent of an implication.
    #[must_use]
    pub fn as_implication(&self) -> Option<(&Expression, &Expression)> {
        match self {
            Self::Implies(antecedent, consequent) => Some((antecedent, consequent)),
            _ => None,
        }
    }

    #[must_use]
    pub fn conjuncts(&self) -> Option<&[Expression]> {
        match self {
            Self::And(operands) => Some(operands),
            _ => None,
        }
    }

    #[must_use]
    pub fn disjuncts(&self) -> Option<&[Expression]> {
        match self {
            Self::Or(operands) => Some(operands),
            _ => None,
        }
    }

    /// Returns true if `self` is `instance` with every free occurrence of
    /// `var` replaced by one and the same term.
    ///
    /// A `var` that does not occur free in `self` matches only an identical
    /// expression.
    #[must_use]
    pub fn is_instantiated_by(&self, var: &str, instance: &Expression) -> bool {
        let mut binding = None;
        matches_instance(self, var, instance, &mut binding)
    }

    fn precedence(&self) -> u8 {
        match self {
            Self::Iff(..) => PREC_IFF,
            Self::Implies(..) => PREC_IMPLIES,
            Self::Or(_) => PREC_OR,
            Self::And(_) => PREC_AND,
            Self::Not(_) | Self::Forall { .. } | Self::Exists { .. } => PREC_UNARY,
            Self::Contradiction | Self::Tautology | Self::Predicate { .. } => PREC_ATOM,
        }
    }
}

fn matches_instance(
    pattern: &Expression,
    var: &str,
    target: &Expression,
    binding: &mut Option<String>,
) -> bool {
    match (pattern, target) {
        (Expression::Contradiction, Expression::Contradiction)
        | (Expression::Tautology, Expression::Tautology) => true,
        (
            Expression::Predicate { name, args },
            Expression::Predicate {
                name: target_name,
                args: target_args,
            },
        ) => {
            if name != target_name || args.len() != target_args.len() {
                return false;
            }
            args.iter().zip(target_args).all(|(arg, term)| {
                if arg != var {
                    return arg == term;
                }
                match binding {
                    Some(bound) => bound == term,
                    None => {
                        *binding = Some(term.clone());
                        true
                    }
                }
            })
        }
        (Expression::Not(inner), Expression::Not(target_inner)) => {
            matches_instance(inner, var, target_inner, binding)
        }
        (Expression::And(ops), Expression::And(target_ops))
        | (Expression::Or(ops), Expression::Or(target_ops)) => {
            ops.len() == target_ops.len()
                && ops
                    .iter()
                    .zip(target_ops)
                    .all(|(op, target_op)| matches_instance(op, var, target_op, binding))
        }
        (Expression::Implies(a, b), Expression::Implies(target_a, target_b))
        | (Expression::Iff(a, b), Expression::Iff(target_a, target_b)) => {
            matches_instance(a, var, target_a, binding)
                && matches_instance(b, var, target_b, binding)
        }
        (
            Expression::Forall { var: bound, body },
            Expression::Forall {
                var: target_bound,
                body: target_body,
            },
        )
        | (
            Expression::Exists { var: bound, body },
            Expression::Exists {
                var: target_bound,
                body: target_body,
            },
        ) => {
            if bound != target_bound {
                return false;
            }
            if bound == var {
                // Shadowed: no free occurrences below this binder.
                body == target_body
            } else {
                matches_instance(body, var, target_body, binding)
            }
        }
        _ => false,
    }
}

impl FromStr for Expression {
    type Err = ParseFailure;

    /// Parses a sentence; blank text is rejected as a failure with no span.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parser::parse(s)?.ok_or_else(ParseFailure::blank)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Contradiction => f.write_str("⊥"),
            Self::Tautology => f.write_str("⊤"),
            Self::Predicate { name, args } => {
                f.write_str(name)?;
                if !args.is_empty() {
                    write!(f, "({})", args.join(", "))?;
                }
                Ok(())
            }
            Self::Not(inner) => {
                f.write_str("¬")?;
                write_operand(f, inner, PREC_UNARY)
            }
            Self::And(operands) => write_chain(f, operands, " ∧ ", PREC_AND + 1),
            Self::Or(operands) => write_chain(f, operands, " ∨ ", PREC_OR + 1),
            Self::Implies(antecedent, consequent) => {
                write_operand(f, antecedent, PREC_IMPLIES + 1)?;
                f.write_str(" → ")?;
                write_operand(f, consequent, PREC_IMPLIES)
            }
            Self::Iff(left, right) => {
                write_operand(f, left, PREC_IFF + 1)?;
                f.write_str(" ↔ ")?;
                write_operand(f, right, PREC_IFF)
            }
            Self::Forall { var, body } => {
                write!(f, "∀{var} ")?;
                write_operand(f, body, PREC_UNARY)
            }
            Self::Exists { var, body } => {
                write!(f, "∃{var} ")?;
                write_operand(f, body, PREC_UNARY)
            }
        }
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, operand: &Expression, min_prec: u8) -> fmt::Result {
    if operand.precedence() < min_prec {
        write!(f, "({operand})")
    } else {
        write!(f, "{operand}")
    }
}

fn write_chain(
    f: &mut fmt::Formatter<'_>,
    operands: &[Expression],
    separator: &str,
    min_prec: u8,
) -> fmt::Result {
    for (i, operand) in operands.iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        write_operand(f, operand, min_prec)?;
    }
    Ok(())
}
