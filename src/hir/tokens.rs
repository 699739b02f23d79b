//! Semantic token model shared by the indexers and the IDE layer.

use crate::base::Range;

/// Token types, in legend order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    Namespace,
    Type,
    Property,
    Macro,
    Function,
}

impl TokenType {
    /// Legend names, indexed by [`TokenType::to_lsp_index`].
    pub const LEGEND: [&'static str; 5] = ["namespace", "type", "property", "macro", "function"];

    pub fn to_lsp_index(self) -> u32 {
        match self {
            TokenType::Namespace => 0,
            TokenType::Type => 1,
            TokenType::Property => 2,
            TokenType::Macro => 3,
            TokenType::Function => 4,
        }
    }
}

/// Token modifier bit set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TokenModifiers(u32);

impl TokenModifiers {
    pub const NONE: TokenModifiers = TokenModifiers(0);
    pub const DECLARATION: TokenModifiers = TokenModifiers(1);
    pub const DEPRECATED: TokenModifiers = TokenModifiers(1 << 1);

    pub const LEGEND: [&'static str; 2] = ["declaration", "deprecated"];

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, other: TokenModifiers) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for TokenModifiers {
    type Output = TokenModifiers;

    fn bitor(self, rhs: TokenModifiers) -> TokenModifiers {
        TokenModifiers(self.0 | rhs.0)
    }
}

/// A single-line token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemanticToken {
    /// Line number (0-indexed)
    pub line: u32,
    /// Column number (0-indexed, UTF-8 bytes)
    pub col: u32,
    /// Length of the token in bytes
    pub length: u32,
    pub token_type: TokenType,
    pub modifiers: TokenModifiers,
}

impl SemanticToken {
    pub fn new(range: Range, token_type: TokenType, modifiers: TokenModifiers) -> Self {
        Self {
            line: range.start.line,
            col: range.start.col,
            length: range.end.col.saturating_sub(range.start.col),
            token_type,
            modifiers,
        }
    }
}

/// Push tokens for a possibly qualified type name at `(line, col)`:
/// `NS::Sub::User` yields a namespace token for `NS::Sub` and a type token
/// for `User`.
pub fn push_qualified(tokens: &mut Vec<SemanticToken>, line: u32, col: u32, name: &str) {
    match name.rfind("::") {
        Some(split) => {
            tokens.push(SemanticToken::new(
                Range::on_line(line, col, split as u32),
                TokenType::Namespace,
                TokenModifiers::NONE,
            ));
            let type_col = col + split as u32 + 2;
            tokens.push(SemanticToken::new(
                Range::on_line(line, type_col, (name.len() - split - 2) as u32),
                TokenType::Type,
                TokenModifiers::NONE,
            ));
        }
        None => tokens.push(SemanticToken::new(
            Range::on_line(line, col, name.len() as u32),
            TokenType::Type,
            TokenModifiers::NONE,
        )),
    }
}
