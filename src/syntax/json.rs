//! Streaming, path-aware JSON walker.
//!
//! The JSON dialects (schema, entities, template links, requests, JSON
//! policies) are visited exactly once per parse, so no tree is built. The
//! walker lexes with [`logos`], tolerates JSONC comments and recovers from
//! malformed input by skipping tokens it cannot place. It never panics and
//! never fails: a truncated document simply produces fewer events.
//!
//! Path conventions follow the usual visitor contract:
//! - `on_object_property` receives the path of the object that owns the key
//! - value events (`on_object_begin`, `on_array_begin`, `on_literal_value`)
//!   and the matching end events receive the path of the value itself

use std::borrow::Cow;
use std::fmt;

use logos::Logos;
use smol_str::SmolStr;

use crate::base::{LineCol, LineIndex, Range, TextSize};

/// Nesting beyond this depth is skipped rather than visited.
const MAX_DEPTH: usize = 256;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*([^*]|\*+[^*/])*\*+/")]
enum Token {
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(":")]
    Colon,
    #[token(",")]
    Comma,
    #[regex(r#""([^"\\\n]|\\.)*""#)]
    String,
    #[regex(r"-?[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?")]
    Number,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,
}

/// Location of a single token. Tokens never span lines.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct JsonSpan {
    /// Byte offset into the document.
    pub offset: u32,
    /// Byte length of the token, quotes included.
    pub len: u32,
    /// Line/column of the first byte.
    pub start: LineCol,
}

impl JsonSpan {
    /// Full token range.
    pub fn range(&self) -> Range {
        Range::on_line(self.start.line, self.start.col, self.len)
    }

    /// Token range without the surrounding quotes.
    pub fn trimmed(&self) -> Range {
        Range::on_line_trimmed(self.start.line, self.start.col, self.len)
    }

    /// Position just after the token.
    pub fn end(&self) -> LineCol {
        LineCol::new(self.start.line, self.start.col + self.len)
    }
}

/// One step of a JSON path.
#[derive(Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(SmolStr),
    Index(usize),
}

impl fmt::Debug for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => write!(f, "{key:?}"),
            PathSegment::Index(index) => write!(f, "{index}"),
        }
    }
}

/// The sequence of keys and indices leading to the current event.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct JsonPath {
    segments: Vec<PathSegment>,
}

impl JsonPath {
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// The object key at position `index`, `None` for array indices.
    pub fn key(&self, index: usize) -> Option<&str> {
        match self.segments.get(index)? {
            PathSegment::Key(key) => Some(key.as_str()),
            PathSegment::Index(_) => None,
        }
    }

    /// The key `back` steps from the end (`0` is the last segment).
    pub fn key_from_end(&self, back: usize) -> Option<&str> {
        let index = self.segments.len().checked_sub(back + 1)?;
        self.key(index)
    }

    pub fn last_key(&self) -> Option<&str> {
        self.key_from_end(0)
    }

    /// Whether `index` is an array position.
    pub fn is_index(&self, index: usize) -> bool {
        matches!(self.segments.get(index), Some(PathSegment::Index(_)))
    }

    /// Whether any key along the path equals `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, PathSegment::Key(k) if k == key))
    }

    /// Whether this path starts with `prefix`.
    pub fn starts_with(&self, prefix: &JsonPath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    fn push(&mut self, segment: PathSegment) {
        self.segments.push(segment);
    }

    fn pop(&mut self) {
        self.segments.pop();
    }
}

impl fmt::Debug for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.segments.iter()).finish()
    }
}

/// A scalar value.
#[derive(Clone, Debug, PartialEq)]
pub enum JsonLiteral<'a> {
    /// Unescaped string content.
    String(Cow<'a, str>),
    /// The number exactly as written.
    Number(&'a str),
    Bool(bool),
    Null,
}

impl JsonLiteral<'_> {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            JsonLiteral::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Callbacks for [`walk`]. Every method has an empty default.
pub trait JsonVisitor {
    fn on_object_begin(&mut self, _span: JsonSpan, _path: &JsonPath) {}
    fn on_object_end(&mut self, _span: JsonSpan, _path: &JsonPath) {}
    fn on_array_begin(&mut self, _span: JsonSpan, _path: &JsonPath) {}
    fn on_array_end(&mut self, _span: JsonSpan, _path: &JsonPath) {}
    fn on_object_property(&mut self, _key: &str, _span: JsonSpan, _path: &JsonPath) {}
    fn on_literal_value(&mut self, _value: &JsonLiteral<'_>, _span: JsonSpan, _path: &JsonPath) {}
}

/// Walk `text`, reporting every structural event to `visitor`.
pub fn walk<V: JsonVisitor + ?Sized>(text: &str, visitor: &mut V) {
    let tokens = Token::lexer(text)
        .spanned()
        .filter_map(|(token, span)| token.ok().map(|t| (t, span.start, span.end)))
        .collect();
    let mut walker = Walker {
        text,
        index: LineIndex::new(text),
        tokens,
        pos: 0,
        path: JsonPath::default(),
        depth: 0,
    };
    while walker.peek().is_some() {
        walker.value(visitor);
    }
}

struct Walker<'a> {
    text: &'a str,
    index: LineIndex,
    tokens: Vec<(Token, usize, usize)>,
    pos: usize,
    path: JsonPath,
    depth: usize,
}

impl<'a> Walker<'a> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).map(|(token, _, _)| *token)
    }

    fn bump(&mut self) -> Option<(Token, JsonSpan, &'a str)> {
        let (token, start, end) = *self.tokens.get(self.pos)?;
        self.pos += 1;
        let span = JsonSpan {
            offset: start as u32,
            len: (end - start) as u32,
            start: self.index.line_col(TextSize::from(start as u32)),
        };
        Some((token, span, &self.text[start..end]))
    }

    fn value<V: JsonVisitor + ?Sized>(&mut self, visitor: &mut V) {
        match self.peek() {
            Some(Token::LBrace) => self.object(visitor),
            Some(Token::LBracket) => self.array(visitor),
            Some(_) => {
                if let Some((token, span, raw)) = self.bump() {
                    let literal = match token {
                        Token::String => JsonLiteral::String(unescape(raw)),
                        Token::Number => JsonLiteral::Number(raw),
                        Token::True => JsonLiteral::Bool(true),
                        Token::False => JsonLiteral::Bool(false),
                        Token::Null => JsonLiteral::Null,
                        // stray punctuation is dropped
                        _ => return,
                    };
                    visitor.on_literal_value(&literal, span, &self.path);
                }
            }
            None => {}
        }
    }

    fn object<V: JsonVisitor + ?Sized>(&mut self, visitor: &mut V) {
        let Some((_, open, _)) = self.bump() else {
            return;
        };
        if self.depth >= MAX_DEPTH {
            self.skip_container();
            return;
        }
        self.depth += 1;
        visitor.on_object_begin(open, &self.path);
        while let Some(token) = self.peek() {
            match token {
                Token::RBrace => {
                    if let Some((_, close, _)) = self.bump() {
                        visitor.on_object_end(close, &self.path);
                    }
                    break;
                }
                Token::String => {
                    let Some((_, span, raw)) = self.bump() else {
                        break;
                    };
                    let key = unescape(raw);
                    visitor.on_object_property(&key, span, &self.path);
                    if self.peek() == Some(Token::Colon) {
                        self.bump();
                    }
                    match self.peek() {
                        Some(Token::Comma | Token::RBrace | Token::String) | None => {}
                        Some(_) => {
                            self.path.push(PathSegment::Key(SmolStr::new(&key)));
                            self.value(visitor);
                            self.path.pop();
                        }
                    }
                }
                // a closing bracket can only belong to an enclosing array
                Token::RBracket if self.depth > 1 => break,
                _ => {
                    self.bump();
                }
            }
        }
        self.depth -= 1;
    }

    fn array<V: JsonVisitor + ?Sized>(&mut self, visitor: &mut V) {
        let Some((_, open, _)) = self.bump() else {
            return;
        };
        if self.depth >= MAX_DEPTH {
            self.skip_container();
            return;
        }
        self.depth += 1;
        visitor.on_array_begin(open, &self.path);
        let mut index = 0;
        while let Some(token) = self.peek() {
            match token {
                Token::RBracket => {
                    if let Some((_, close, _)) = self.bump() {
                        visitor.on_array_end(close, &self.path);
                    }
                    break;
                }
                Token::Comma | Token::Colon => {
                    self.bump();
                }
                Token::RBrace if self.depth > 1 => break,
                Token::RBrace => {
                    self.bump();
                }
                _ => {
                    self.path.push(PathSegment::Index(index));
                    self.value(visitor);
                    self.path.pop();
                    index += 1;
                }
            }
        }
        self.depth -= 1;
    }

    fn skip_container(&mut self) {
        let mut nesting = 1usize;
        while let Some((token, _, _)) = self.bump() {
            match token {
                Token::LBrace | Token::LBracket => nesting += 1,
                Token::RBrace | Token::RBracket => {
                    nesting -= 1;
                    if nesting == 0 {
                        return;
                    }
                }
                _ => {}
            }
        }
    }
}

/// Strip the quotes of a string token and resolve escapes.
fn unescape(raw: &str) -> Cow<'_, str> {
    let inner = raw
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(raw);
    if !inner.contains('\\') {
        return Cow::Borrowed(inner);
    }
    Cow::Owned(decode_with_offsets(inner).0)
}

/// Decode escapes in the raw content of a string token (quotes excluded).
///
/// Returns the decoded text together with, for every byte of the decoded
/// text, the byte offset of the raw character that produced it; a final
/// entry maps the end. Used to map matches in decoded text back to source
/// columns.
pub fn decode_with_offsets(raw: &str) -> (String, Vec<usize>) {
    let mut decoded = String::with_capacity(raw.len());
    let mut offsets = Vec::with_capacity(raw.len() + 1);
    let mut chars = raw.char_indices().peekable();
    while let Some((at, c)) = chars.next() {
        let resolved = if c == '\\' {
            match chars.next() {
                Some((_, 'n')) => '\n',
                Some((_, 't')) => '\t',
                Some((_, 'r')) => '\r',
                Some((_, 'b')) => '\u{8}',
                Some((_, 'f')) => '\u{c}',
                Some((_, 'u')) => {
                    let mut code = 0u32;
                    for _ in 0..4 {
                        match chars.peek().and_then(|(_, h)| h.to_digit(16)) {
                            Some(digit) => {
                                code = code * 16 + digit;
                                chars.next();
                            }
                            None => break,
                        }
                    }
                    char::from_u32(code).unwrap_or('\u{fffd}')
                }
                Some((_, other)) => other,
                None => '\\',
            }
        } else {
            c
        };
        for _ in 0..resolved.len_utf8() {
            offsets.push(at);
        }
        decoded.push(resolved);
    }
    offsets.push(raw.len());
    (decoded, offsets)
}
