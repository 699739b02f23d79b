//! Folding ranges: collapsible policy statements.

use crate::hir::PolicyIndex;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FoldingKind {
    Region,
    /// Plain block, e.g. the body after the annotations.
    Block,
}

/// A folding range with line information.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FoldingRange {
    /// Start line (0-indexed)
    pub start_line: u32,
    /// End line (0-indexed)
    pub end_line: u32,
    pub kind: FoldingKind,
}

/// One region per policy, plus one from the effect keyword to the end of
/// the statement when annotations precede the effect.
pub fn folding_ranges(index: &PolicyIndex) -> Vec<FoldingRange> {
    let mut ranges = Vec::new();
    for policy in &index.policies {
        ranges.push(FoldingRange {
            start_line: policy.range.start.line,
            end_line: policy.range.end.line,
            kind: FoldingKind::Region,
        });
        if policy.effect_range.start.line > policy.range.start.line {
            ranges.push(FoldingRange {
                start_line: policy.effect_range.start.line,
                end_line: policy.range.end.line,
                kind: FoldingKind::Block,
            });
        }
    }
    ranges
}
