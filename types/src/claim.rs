use crate::expression::Expression;
use crate::rule::{RuleKind, RuleViolation};

/// One justification cited by a claim.
///
/// `subproof` is present only when the cited line is an assumption whose
/// subproof sits directly inside the claiming line's scope; it then holds the
/// conclusions derived inside that subproof, in line order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Premise {
    expression: Expression,
    subproof: Option<Vec<Expression>>,
}

impl Premise {
    #[must_use]
    pub fn new(expression: Expression) -> Self {
        Self {
            expression,
            subproof: None,
        }
    }

    #[must_use]
    pub fn with_subproof(assumption: Expression, conclusions: Vec<Expression>) -> Self {
        Self {
            expression: assumption,
            subproof: Some(conclusions),
        }
    }

    #[must_use]
    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    #[must_use]
    pub fn subproof_conclusions(&self) -> Option<&[Expression]> {
        self.subproof.as_deref()
    }

    #[must_use]
    pub fn is_subproof(&self) -> bool {
        self.subproof.is_some()
    }
}

/// A conclusion, the premises cited for it, and the rule said to derive it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    conclusion: Expression,
    premises: Vec<Premise>,
    rule: RuleKind,
}

impl Claim {
    #[must_use]
    pub fn new(conclusion: Expression, premises: Vec<Premise>, rule: RuleKind) -> Self {
        Self {
            conclusion,
            premises,
            rule,
        }
    }

    #[must_use]
    pub fn conclusion(&self) -> &Expression {
        &self.conclusion
    }

    #[must_use]
    pub fn premises(&self) -> &[Premise] {
        &self.premises
    }

    #[must_use]
    pub fn rule(&self) -> RuleKind {
        self.rule
    }

    pub fn check(&self) -> Result<(), RuleViolation> {
        self.rule.check(self)
    }
}
