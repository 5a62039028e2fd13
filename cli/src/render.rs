//! Plain-text rendering of proof rows.

use std::fmt::Write;

use deduct_core::{GoalView, LineView};
use deduct_types::{RuleKind, Status};

fn glyph(status: Status) -> char {
    match status {
        Status::Correct => '✓',
        Status::None => '·',
        Status::NoRule => '?',
        Status::InvalidExpression => '!',
        Status::InvalidClaim => '✗',
    }
}

/// `3  ✓  │ Q  [Modus Ponens: 1, 2]`, with the message on the next line for
/// rows in error.
pub fn line_row(line: &LineView) -> String {
    let mut row = format!(
        "{:<3}{}  {}{}",
        line.number + 1,
        glyph(line.status),
        "│ ".repeat(line.level),
        line.text.trim()
    );
    if line.assumption {
        row.push_str("  [Assumption]");
    } else if let Some(rule) = line.rule {
        let premises: Vec<String> = line.premises.iter().map(|p| (p + 1).to_string()).collect();
        if premises.is_empty() {
            let _ = write!(row, "  [{}]", rule.display_name());
        } else {
            let _ = write!(row, "  [{}: {}]", rule.display_name(), premises.join(", "));
        }
    }
    push_message(&mut row, line.status, line.message.as_deref());
    row
}

pub fn goal_row(goal: &GoalView) -> String {
    let mut row = format!("G{:<2}{}  {}", goal.number + 1, glyph(goal.status), goal.text.trim());
    push_message(&mut row, goal.status, goal.message.as_deref());
    row
}

fn push_message(row: &mut String, status: Status, message: Option<&str>) {
    if let Some(message) = message.filter(|_| status.is_error()) {
        let _ = write!(row, "\n       {message}");
    }
}

/// One row per rule for `deduct rules`.
pub fn rule_table() -> String {
    let mut table = String::new();
    for rule in RuleKind::ALL {
        let mut notes = Vec::new();
        if rule.consumes_subproof() {
            notes.push("subproof");
        }
        if rule.can_auto_fill() {
            notes.push("auto-fill");
        }
        let _ = writeln!(
            table,
            "{:<28}{:<30}{}",
            rule.identifier(),
            rule.display_name(),
            notes.join(", ")
        );
    }
    table
}

#[cfg(test)]
mod tests {
    use deduct_types::LineId;

    use super::*;

    fn view(status: Status, message: Option<&str>) -> LineView {
        LineView {
            id: LineId::new(1),
            number: 2,
            level: 1,
            assumption: false,
            text: "Q ".to_string(),
            premises: vec![0, 1],
            rule: Some(RuleKind::ModusPonens),
            status,
            message: message.map(str::to_string),
            error_range: None,
        }
    }

    #[test]
    fn correct_row_cites_premises_by_number() {
        let row = line_row(&view(Status::Correct, Some("Line is Correct!")));
        assert_eq!(row, "3  ✓  │ Q  [Modus Ponens: 1, 2]");
    }

    #[test]
    fn error_rows_carry_their_message() {
        let row = line_row(&view(Status::InvalidClaim, Some("wrong")));
        assert!(row.ends_with("\n       wrong"), "{row}");
    }

    #[test]
    fn every_rule_is_listed() {
        assert_eq!(rule_table().lines().count(), RuleKind::ALL.len());
    }
}
