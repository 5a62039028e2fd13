//! Subproof structure and premise accessibility.
//!
//! A proof's shape is fully described by each row's nesting level and
//! assumption flag. [`Layout`] turns that sequence into a tree of blocks: the
//! root block spans the whole proof, and every assumption below level 0 opens
//! a block that runs until the first later row that is shallower, or at the
//! same level and itself an assumption (a sibling subproof).

use std::collections::BTreeSet;
use std::ops::Range;

use crate::errors::StructureError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Row {
    pub level: usize,
    pub assumption: bool,
}

impl Row {
    pub fn new(level: usize, assumption: bool) -> Self {
        Self { level, assumption }
    }

    fn opens_block(self) -> bool {
        self.assumption && self.level > 0
    }
}

/// Checks the nesting rules for a sequence of rows.
///
/// Each row may be at most one level deeper than the previous one (the row
/// before the first counts as level 0), only assumptions may go deeper, and
/// level-0 assumptions must all come before anything else.
pub(crate) fn validate(rows: &[Row]) -> Result<(), StructureError> {
    let mut previous = 0;
    let mut in_premises = true;
    for (index, row) in rows.iter().enumerate() {
        let deeper = row.level > previous;
        if row.level > previous + 1 || (deeper && !row.assumption) {
            return Err(StructureError::IllFormedNesting { index });
        }
        let premise = row.assumption && row.level == 0;
        if premise && !in_premises {
            return Err(StructureError::IllFormedNesting { index });
        }
        in_premises &= premise;
        previous = row.level;
    }
    Ok(())
}

#[derive(Debug, Clone)]
struct Block {
    /// Row that opens the block; `None` for the root.
    opener: Option<usize>,
    end: usize,
    parent: Option<usize>,
}

/// Block tree for one arrangement of rows.
#[derive(Debug, Clone)]
pub(crate) struct Layout {
    rows: Vec<Row>,
    blocks: Vec<Block>,
    /// Innermost block of each row. An assumption's block is the one it opens.
    block_of: Vec<usize>,
}

impl Layout {
    /// Builds the block tree. `rows` must already satisfy [`validate`].
    pub fn new(rows: Vec<Row>) -> Self {
        let len = rows.len();
        let mut blocks = vec![Block {
            opener: None,
            end: len,
            parent: None,
        }];
        let mut open = vec![0usize];
        let mut block_of = Vec::with_capacity(len);

        for (index, row) in rows.iter().enumerate() {
            while let Some(&top) = open.last() {
                let Some(opener) = blocks[top].opener else {
                    break;
                };
                let depth = rows[opener].level;
                if row.level < depth || (row.level == depth && row.assumption) {
                    blocks[top].end = index;
                    open.pop();
                } else {
                    break;
                }
            }
            let current = open.last().copied().unwrap_or(0);
            if row.opens_block() {
                blocks.push(Block {
                    opener: Some(index),
                    end: len,
                    parent: Some(current),
                });
                let id = blocks.len() - 1;
                open.push(id);
                block_of.push(id);
            } else {
                debug_assert!(
                    blocks[current]
                        .opener
                        .is_none_or(|opener| rows[opener].level == row.level),
                    "row {index} sits at the wrong level for its subproof"
                );
                block_of.push(current);
            }
        }

        Self {
            rows,
            blocks,
            block_of,
        }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    fn contains(&self, block: usize, index: usize) -> bool {
        let start = self.blocks[block].opener.unwrap_or(0);
        start <= index && index < self.blocks[block].end
    }

    /// Number of leading level-0 assumptions.
    pub fn premise_count(&self) -> usize {
        self.rows
            .iter()
            .take_while(|row| row.assumption && row.level == 0)
            .count()
    }

    /// Rows that `line` may cite. Assumptions cite nothing.
    pub fn accessible(&self, line: usize) -> BTreeSet<usize> {
        if line >= self.len() || self.rows[line].assumption {
            return BTreeSet::new();
        }
        (0..line)
            .filter(|&premise| self.is_accessible(premise, line))
            .collect()
    }

    pub fn is_accessible(&self, premise: usize, line: usize) -> bool {
        if premise >= line || line >= self.len() || self.rows[line].assumption {
            return false;
        }
        let block = self.block_of[premise];
        if self.contains(block, line) {
            return true;
        }
        self.rows[premise].opens_block()
            && self.blocks[block].end <= line
            && self.blocks[block].parent == Some(self.block_of[line])
    }

    /// Whether citing `premise` from `line` cites a whole subproof rather
    /// than a single row.
    pub fn is_subproof_premise(&self, premise: usize, line: usize) -> bool {
        let row = self.rows[premise];
        row.assumption && row.level == self.rows[line].level + 1
    }

    /// Rows covered by the subproof `assumption` opens, the assumption
    /// included. A row that opens nothing covers only itself.
    pub fn subproof_range(&self, assumption: usize) -> Range<usize> {
        if !self.rows[assumption].opens_block() {
            return assumption..assumption + 1;
        }
        assumption..self.blocks[self.block_of[assumption]].end
    }

    /// Conclusions of the subproof opened by `assumption`: its non-assumption
    /// rows at the subproof's own level, in order.
    pub fn subproof_conclusions(&self, assumption: usize) -> Vec<usize> {
        let level = self.rows[assumption].level;
        self.subproof_range(assumption)
            .skip(1)
            .filter(|&index| {
                let row = self.rows[index];
                !row.assumption && row.level == level
            })
            .collect()
    }

    /// The assumption whose subproof lists `index` among its conclusions.
    pub fn concluded_subproof(&self, index: usize) -> Option<usize> {
        let row = self.rows[index];
        if row.assumption {
            return None;
        }
        let opener = self.blocks[self.block_of[index]].opener?;
        (self.rows[opener].level == row.level).then_some(opener)
    }

    /// End (exclusive) of the innermost subproof containing `index`.
    pub fn enclosing_end(&self, index: usize) -> Result<usize, StructureError> {
        let block = &self.blocks[self.block_of[index]];
        match block.opener {
            Some(_) => Ok(block.end),
            None => Err(StructureError::NotInSubproof { index }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(rows: &[(usize, bool)]) -> Layout {
        let rows: Vec<Row> = rows.iter().map(|&(l, a)| Row::new(l, a)).collect();
        validate(&rows).expect("test layout is well formed");
        Layout::new(rows)
    }

    fn set(items: &[usize]) -> BTreeSet<usize> {
        items.iter().copied().collect()
    }

    #[test]
    fn rejects_skipped_levels_and_late_premises() {
        let skip = [Row::new(0, true), Row::new(2, true)];
        assert_eq!(
            validate(&skip),
            Err(StructureError::IllFormedNesting { index: 1 })
        );
        let deeper_claim = [Row::new(0, true), Row::new(1, false)];
        assert!(validate(&deeper_claim).is_err());
        let late_premise = [Row::new(0, false), Row::new(0, true)];
        assert!(validate(&late_premise).is_err());
    }

    #[test]
    fn closed_subproof_is_cited_as_a_whole() {
        // 0 P (premise)
        // 1 | Q (assumption)
        // 2 | Q
        // 3 Q -> Q
        let layout = layout(&[(0, true), (1, true), (1, false), (0, false)]);
        assert_eq!(layout.accessible(2), set(&[0, 1]));
        assert_eq!(layout.accessible(3), set(&[0, 1]));
        assert!(layout.is_subproof_premise(1, 3));
        assert_eq!(layout.subproof_conclusions(1), vec![2]);
        assert_eq!(layout.subproof_range(1), 1..3);
    }

    #[test]
    fn sibling_assumption_closes_previous_subproof() {
        // 0 | A
        // 1 | A
        // 2 | B
        // 3 | B
        // 4 X
        let layout = layout(&[(1, true), (1, false), (1, true), (1, false), (0, false)]);
        assert_eq!(layout.subproof_range(0), 0..2);
        assert_eq!(layout.accessible(3), set(&[2]));
        assert_eq!(layout.accessible(4), set(&[0, 2]));
    }

    #[test]
    fn nested_subproof_is_only_visible_to_its_parent() {
        // 0 | A
        // 1 | | B
        // 2 | | B
        // 3 | C
        // 4 D
        let layout = layout(&[(1, true), (2, true), (2, false), (1, false), (0, false)]);
        assert_eq!(layout.accessible(3), set(&[0, 1]));
        assert_eq!(layout.accessible(4), set(&[0]));
        assert_eq!(layout.subproof_conclusions(0), vec![3]);
        assert_eq!(layout.concluded_subproof(3), Some(0));
        assert_eq!(layout.concluded_subproof(2), Some(1));
    }

    #[test]
    fn assumptions_cite_nothing() {
        let layout = layout(&[(0, true), (0, true), (0, false)]);
        assert!(layout.accessible(1).is_empty());
        assert_eq!(layout.premise_count(), 2);
    }

    #[test]
    fn enclosing_end_requires_a_subproof() {
        let layout = layout(&[(0, true), (1, true), (1, false), (0, false)]);
        assert_eq!(layout.enclosing_end(2), Ok(3));
        assert_eq!(
            layout.enclosing_end(3),
            Err(StructureError::NotInSubproof { index: 3 })
        );
    }
}
