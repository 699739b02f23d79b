//! Semantic tokens: syntax highlighting from the dialect indexes.
//!
//! The indexes record absolute single-line tokens while parsing; this
//! module sorts them and encodes them the way editors consume them, as
//! `(deltaLine, deltaStart, length, tokenType, modifiers)` tuples.

use crate::hir::{SemanticToken, TokenModifiers, TokenType};

use super::analysis::DocumentIndex;

/// Token type and modifier names, in the order the encoded indexes refer to.
pub struct Legend {
    pub token_types: &'static [&'static str],
    pub token_modifiers: &'static [&'static str],
}

pub const LEGEND: Legend = Legend {
    token_types: &TokenType::LEGEND,
    token_modifiers: &TokenModifiers::LEGEND,
};

/// Tokens of a document sorted by position. Dialects without highlighting
/// yield none.
pub fn semantic_tokens(index: &DocumentIndex) -> Vec<SemanticToken> {
    let mut tokens = index.tokens().to_vec();
    tokens.sort_by_key(|t| (t.line, t.col));
    // Overlapping tokens are not representable; keep the first.
    tokens.dedup_by(|next, kept| next.line == kept.line && next.col < kept.col + kept.length);
    tokens
}

/// Relative encoding of sorted tokens.
pub fn encode(tokens: &[SemanticToken]) -> Vec<u32> {
    let mut data = Vec::with_capacity(tokens.len() * 5);
    let (mut prev_line, mut prev_col) = (0, 0);
    for token in tokens {
        let delta_line = token.line - prev_line;
        let delta_start = if delta_line == 0 { token.col - prev_col } else { token.col };
        data.extend([
            delta_line,
            delta_start,
            token.length,
            token.token_type.to_lsp_index(),
            token.modifiers.bits(),
        ]);
        prev_line = token.line;
        prev_col = token.col;
    }
    data
}
