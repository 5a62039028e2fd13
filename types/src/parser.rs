//! Sentence parser.
//!
//! Accepts ASCII and Unicode spellings of each connective:
//!
//! | Connective | Spellings |
//! |---|---|
//! | negation | `~` `¬` `!` |
//! | conjunction | `&` `∧` `^` |
//! | disjunction | `\|` `∨` `or` |
//! | implication | `->` `→` |
//! | biconditional | `<->` `↔` |
//! | contradiction / tautology | `_\|_` `⊥` / `⊤` |
//! | quantifiers | `forall` `∀`, `exists` `∃` |
//!
//! Precedence, loosest first: `↔`, `→` (both right-associative), `∨`, `∧`,
//! then the prefix operators. Nesting deeper than [`MAX_DEPTH`] is rejected.

use thiserror::Error;

use crate::expression::Expression;

/// Deepest nesting of parentheses, prefix operators and right-associative
/// chains a sentence may have.
pub const MAX_DEPTH: usize = 128;

/// A malformed sentence, with the byte span to highlight.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ParseFailure {
    offset: Option<usize>,
    length: usize,
    message: String,
}

impl ParseFailure {
    fn at(span: Span, message: impl Into<String>) -> Self {
        Self {
            offset: Some(span.start),
            length: span.end - span.start,
            message: message.into(),
        }
    }

    pub(crate) fn blank() -> Self {
        Self {
            offset: None,
            length: 0,
            message: "no expression".to_string(),
        }
    }

    /// Byte offset of the offending text, if known.
    #[must_use]
    pub fn offset(&self) -> Option<usize> {
        self.offset
    }

    #[must_use]
    pub fn length(&self) -> usize {
        self.length
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Parses `text` into an expression.
///
/// Returns `Ok(None)` for empty or whitespace-only text: a blank line holds
/// no expression, which is not the same thing as a malformed one.
pub fn parse(text: &str) -> Result<Option<Expression>, ParseFailure> {
    let tokens = tokenize(text)?;
    if tokens.is_empty() {
        return Ok(None);
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expression = parser.parse_biconditional()?;
    if let Some(token) = parser.peek() {
        return Err(ParseFailure::at(
            token.span,
            format!("unexpected {}", token.kind.describe()),
        ));
    }
    Ok(Some(expression))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    start: usize,
    end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenKind {
    Ident(String),
    LParen,
    RParen,
    Comma,
    Not,
    And,
    Or,
    Implies,
    Iff,
    Forall,
    Exists,
    Bottom,
    Top,
}

impl TokenKind {
    fn describe(&self) -> String {
        match self {
            Self::Ident(name) => format!("'{name}'"),
            Self::LParen => "'('".to_string(),
            Self::RParen => "')'".to_string(),
            Self::Comma => "','".to_string(),
            Self::Not => "negation".to_string(),
            Self::And => "conjunction".to_string(),
            Self::Or => "disjunction".to_string(),
            Self::Implies => "implication".to_string(),
            Self::Iff => "biconditional".to_string(),
            Self::Forall | Self::Exists => "quantifier".to_string(),
            Self::Bottom | Self::Top => "constant".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Token {
    kind: TokenKind,
    span: Span,
}

fn is_identifier_start(ch: char) -> bool {
    ch.is_ascii_alphabetic()
}

fn is_identifier_continue(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

fn tokenize(source: &str) -> Result<Vec<Token>, ParseFailure> {
    let mut out = Vec::new();
    let mut chars = source.char_indices().peekable();
    while let Some((start, ch)) = chars.next() {
        if ch.is_whitespace() {
            continue;
        }
        if is_identifier_start(ch) {
            let mut end = start + ch.len_utf8();
            while let Some((i, c)) = chars.peek().copied() {
                if is_identifier_continue(c) {
                    end = i + c.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            let kind = match &source[start..end] {
                "forall" => TokenKind::Forall,
                "exists" => TokenKind::Exists,
                "or" => TokenKind::Or,
                word => TokenKind::Ident(word.to_string()),
            };
            out.push(Token {
                kind,
                span: Span { start, end },
            });
            continue;
        }

        let rest = &source[start..];
        // `extra` counts the characters consumed beyond `ch`.
        let (kind, len, extra) = if rest.starts_with("<->") {
            (TokenKind::Iff, 3, 2)
        } else if rest.starts_with("->") {
            (TokenKind::Implies, 2, 1)
        } else if rest.starts_with("_|_") {
            (TokenKind::Bottom, 3, 2)
        } else {
            let kind = match ch {
                '(' => TokenKind::LParen,
                ')' => TokenKind::RParen,
                ',' => TokenKind::Comma,
                '~' | '¬' | '!' => TokenKind::Not,
                '&' | '∧' | '^' => TokenKind::And,
                '|' | '∨' => TokenKind::Or,
                '→' => TokenKind::Implies,
                '↔' => TokenKind::Iff,
                '∀' => TokenKind::Forall,
                '∃' => TokenKind::Exists,
                '⊥' => TokenKind::Bottom,
                '⊤' => TokenKind::Top,
                other => {
                    return Err(ParseFailure::at(
                        Span {
                            start,
                            end: start + other.len_utf8(),
                        },
                        format!("unexpected character '{other}'"),
                    ));
                }
            };
            (kind, ch.len_utf8(), 0)
        };
        for _ in 0..extra {
            chars.next();
        }
        out.push(Token {
            kind,
            span: Span {
                start,
                end: start + len,
            },
        });
    }
    Ok(out)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek().is_some_and(|token| &token.kind == kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Failure for running out of input: highlights the last token, which is
    /// the operator or delimiter left waiting for an operand.
    fn premature_end(&self, expected: &str) -> ParseFailure {
        let last = self
            .tokens
            .last()
            .map_or(Span { start: 0, end: 0 }, |token| token.span);
        ParseFailure::at(last, format!("expected {expected} after this"))
    }

    fn next_or_end(&mut self, expected: &str) -> Result<Token, ParseFailure> {
        let token = self
            .peek()
            .cloned()
            .ok_or_else(|| self.premature_end(expected))?;
        self.pos += 1;
        Ok(token)
    }

    /// Runs `parse` one level deeper. Past [`MAX_DEPTH`] the token just
    /// consumed is reported instead.
    fn nested(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<Expression, ParseFailure>,
    ) -> Result<Expression, ParseFailure> {
        if self.depth >= MAX_DEPTH {
            let span = self
                .tokens
                .get(self.pos.saturating_sub(1))
                .map_or(Span { start: 0, end: 0 }, |token| token.span);
            return Err(ParseFailure::at(span, "sentence nested too deeply"));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn parse_biconditional(&mut self) -> Result<Expression, ParseFailure> {
        let left = self.parse_implication()?;
        if self.eat(&TokenKind::Iff) {
            let right = self.nested(Self::parse_biconditional)?;
            return Ok(left.iff(right));
        }
        Ok(left)
    }

    fn parse_implication(&mut self) -> Result<Expression, ParseFailure> {
        let antecedent = self.parse_disjunction()?;
        if self.eat(&TokenKind::Implies) {
            let consequent = self.nested(Self::parse_implication)?;
            return Ok(antecedent.implies(consequent));
        }
        Ok(antecedent)
    }

    fn parse_disjunction(&mut self) -> Result<Expression, ParseFailure> {
        let mut operands = vec![self.parse_conjunction()?];
        while self.eat(&TokenKind::Or) {
            operands.push(self.parse_conjunction()?);
        }
        Ok(Expression::disjunction(operands))
    }

    fn parse_conjunction(&mut self) -> Result<Expression, ParseFailure> {
        let mut operands = vec![self.parse_unary()?];
        while self.eat(&TokenKind::And) {
            operands.push(self.parse_unary()?);
        }
        Ok(Expression::conjunction(operands))
    }

    fn parse_unary(&mut self) -> Result<Expression, ParseFailure> {
        let token = self.next_or_end("a sentence")?;
        match token.kind {
            TokenKind::Not => Ok(self.nested(Self::parse_unary)?.negate()),
            TokenKind::Forall => self.parse_quantified(true),
            TokenKind::Exists => self.parse_quantified(false),
            TokenKind::LParen => {
                let inner = self.nested(Self::parse_biconditional)?;
                let close = self.next_or_end("')'")?;
                if close.kind != TokenKind::RParen {
                    return Err(ParseFailure::at(
                        close.span,
                        format!("expected ')', found {}", close.kind.describe()),
                    ));
                }
                Ok(inner)
            }
            TokenKind::Bottom => Ok(Expression::Contradiction),
            TokenKind::Top => Ok(Expression::Tautology),
            TokenKind::Ident(name) => {
                let args = if self.eat(&TokenKind::LParen) {
                    self.parse_arguments()?
                } else {
                    Vec::new()
                };
                Ok(Expression::Predicate { name, args })
            }
            other => Err(ParseFailure::at(
                token.span,
                format!("expected a sentence, found {}", other.describe()),
            )),
        }
    }

    fn parse_quantified(&mut self, universal: bool) -> Result<Expression, ParseFailure> {
        let var = self.next_or_end("a variable")?;
        let TokenKind::Ident(var) = var.kind else {
            return Err(ParseFailure::at(
                var.span,
                format!("expected a variable, found {}", var.kind.describe()),
            ));
        };
        let body = Box::new(self.nested(Self::parse_unary)?);
        Ok(if universal {
            Expression::Forall { var, body }
        } else {
            Expression::Exists { var, body }
        })
    }

    fn parse_arguments(&mut self) -> Result<Vec<String>, ParseFailure> {
        let mut args = Vec::new();
        loop {
            let term = self.next_or_end("a term")?;
            let TokenKind::Ident(name) = term.kind else {
                return Err(ParseFailure::at(
                    term.span,
                    format!("expected a term, found {}", term.kind.describe()),
                ));
            };
            args.push(name);
            let separator = self.next_or_end("',' or ')'")?;
            match separator.kind {
                TokenKind::Comma => {}
                TokenKind::RParen => return Ok(args),
                other => {
                    return Err(ParseFailure::at(
                        separator.span,
                        format!("expected ',' or ')', found {}", other.describe()),
                    ));
                }
            }
        }
    }
}
