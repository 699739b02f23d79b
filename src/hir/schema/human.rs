//! Human-readable schema scanner.
//!
//! Line oriented: a declaration starts on the line holding its keyword and
//! is closed by the first line whose code ends with `;`. Only declarations
//! and the type / action names they mention are recovered here.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use smol_str::SmolStr;

use super::{CompletionGraph, SchemaCollection, SchemaFormat, SchemaIndex, SchemaRecord};
use crate::base::{LineCol, Range};
use crate::hir::records::RefTable;
use crate::hir::resolve::{action_literal, is_ident, member_of_literal, qualify};
use crate::hir::tokens::{SemanticToken, TokenModifiers, TokenType, push_qualified};

const PATH: &str = r"[_\p{XID_Start}]\p{XID_Continue}*(?:::[_\p{XID_Start}]\p{XID_Continue}*)*";

static NAMESPACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^\s*namespace\s+(?P<name>{PATH})\s*\{{")).expect("namespace regex is valid")
});

static DECLARATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?P<keyword>entity|action|type)\s+").expect("declaration regex is valid"));

static IN_CLAUSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bin\b\s*").expect("in regex is valid"));

static APPLIES_TO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:principal|resource)\s*:\s*").expect("applies-to regex is valid"));

static ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r#"(?P<path>{PATH})(?:::"(?P<qid>(?:[^"\\]|\\.)*)")?|"(?P<id>(?:[^"\\]|\\.)*)""#
    ))
    .expect("list item regex is valid")
});

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Keyword {
    Entity,
    Action,
    Type,
}

impl Keyword {
    fn collection(self) -> SchemaCollection {
        match self {
            Self::Entity => SchemaCollection::EntityTypes,
            Self::Action => SchemaCollection::Actions,
            Self::Type => SchemaCollection::CommonTypes,
        }
    }
}

/// What the items of a name list refer to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ListKind {
    EntityParents,
    ActionParents,
    ScopeTypes,
}

struct Declaration {
    keyword: Keyword,
    /// `declarationStartLine` plus the keyword column.
    start: LineCol,
    names: Vec<(SmolStr, Range)>,
    body_started: bool,
}

struct Scanner {
    namespace: SmolStr,
    declaration: Option<Declaration>,
    open_list: Option<ListKind>,
    records: Vec<SchemaRecord>,
    refs: RefTable,
    tokens: Vec<SemanticToken>,
}

/// Byte offset where a `//` comment starts, ignoring string contents.
fn code_end(line: &str) -> usize {
    let bytes = line.as_bytes();
    let mut in_string = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if in_string => i += 1,
            b'"' => in_string = !in_string,
            b'/' if !in_string && bytes.get(i + 1) == Some(&b'/') => return i,
            _ => {}
        }
        i += 1;
    }
    bytes.len()
}

/// Comma-separated declared names starting at `from`; returns the names
/// with their byte spans and the offset just after the last name.
fn declared_names(code: &str, from: usize) -> (Vec<(SmolStr, usize, usize)>, usize) {
    let bytes = code.as_bytes();
    let mut names = Vec::new();
    let mut pos = from;
    loop {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        let rest = &code[pos..];
        let name = if let Some(quoted) = rest.strip_prefix('"') {
            let Some(close) = quoted.find('"') else {
                break;
            };
            names.push((SmolStr::new(&quoted[..close]), pos + 1, close));
            close + 2
        } else {
            let len = rest
                .char_indices()
                .find(|&(i, c)| !(unicode_ident::is_xid_continue(c) || (i == 0 && c == '_')))
                .map_or(rest.len(), |(i, _)| i);
            if len == 0 || !is_ident(&rest[..len]) {
                break;
            }
            names.push((SmolStr::new(&rest[..len]), pos, len));
            len
        };
        pos += name;
        let mut next = pos;
        while next < bytes.len() && bytes[next].is_ascii_whitespace() {
            next += 1;
        }
        if bytes.get(next) != Some(&b',') {
            break;
        }
        pos = next + 1;
    }
    (names, pos)
}

impl Scanner {
    fn item(&mut self, kind: ListKind, caps: &Captures<'_>, line: u32, base: usize) {
        let ns = self.namespace.clone();
        let at = |m: regex::Match<'_>| Range::on_line(line, (base + m.start()) as u32, m.len() as u32);
        match (kind, caps.name("path"), caps.name("qid"), caps.name("id")) {
            (ListKind::EntityParents | ListKind::ScopeTypes, Some(path), None, _) => {
                self.refs.push_type(qualify(&ns, path.as_str()), at(path));
                push_qualified(&mut self.tokens, line, (base + path.start()) as u32, path.as_str());
            }
            (ListKind::ActionParents, Some(path), Some(qid), _) => {
                let literal = member_of_literal(&ns, Some(path.as_str()), qid.as_str());
                self.refs.push_action(literal, at(qid));
            }
            (ListKind::ActionParents, Some(name), None, _) => {
                self.refs.push_action(action_literal(&ns, name.as_str()), at(name));
            }
            (ListKind::ActionParents, None, _, Some(id)) => {
                self.refs.push_action(action_literal(&ns, id.as_str()), at(id));
            }
            _ => {}
        }
    }

    /// Items of a list whose `[` was opened on an earlier line. Returns the
    /// offset after the closing `]`, or `None` if the list stays open.
    fn continue_list(&mut self, kind: ListKind, code: &str, line: u32, base: usize) -> Option<usize> {
        let close = code.find(']');
        let inside = &code[..close.unwrap_or(code.len())];
        for caps in ITEM.captures_iter(inside) {
            self.item(kind, &caps, line, base);
        }
        match close {
            Some(close) => {
                self.open_list = None;
                Some(close + 1)
            }
            None => None,
        }
    }

    /// A single name or a bracketed list starting at `code[at..]`.
    fn clause(&mut self, kind: ListKind, code: &str, at: usize, line: u32) -> usize {
        let rest = &code[at..];
        if let Some(list) = rest.strip_prefix('[') {
            self.open_list = Some(kind);
            return match self.continue_list(kind, list, line, at + 1) {
                Some(after) => at + 1 + after,
                None => code.len(),
            };
        }
        match ITEM.captures(rest) {
            Some(caps) if caps.get(0).is_some_and(|m| m.start() == 0) => {
                let len = caps.get(0).map_or(0, |m| m.len());
                self.item(kind, &caps, line, at);
                at + len
            }
            _ => at,
        }
    }

    /// Parent and scope clauses inside the current declaration.
    fn clauses(&mut self, code: &str, from: usize, line: u32) {
        let mut pos = from;
        if let Some(kind) = self.open_list {
            match self.continue_list(kind, &code[pos..], line, pos) {
                Some(after) => pos += after,
                None => return,
            }
        }
        let Some(declaration) = self.declaration.as_mut() else {
            return;
        };
        let keyword = declaration.keyword;
        if !declaration.body_started {
            let header_end = code[pos..].find('{').map_or(code.len(), |i| pos + i);
            declaration.body_started = header_end < code.len();
            let parents = match keyword {
                Keyword::Entity => Some(ListKind::EntityParents),
                Keyword::Action => Some(ListKind::ActionParents),
                Keyword::Type => None,
            };
            if let Some(kind) = parents {
                let found = IN_CLAUSE.find(&code[pos..header_end]).map(|m| pos + m.end());
                if let Some(at) = found {
                    pos = self.clause(kind, code, at, line);
                }
            }
        }
        if keyword == Keyword::Action {
            while let Some(m) = APPLIES_TO.find_at(code, pos) {
                let end = m.end();
                pos = self.clause(ListKind::ScopeTypes, code, end, line).max(end);
            }
        }
    }

    fn close(&mut self, end: LineCol) {
        let Some(declaration) = self.declaration.take() else {
            return;
        };
        self.open_list = None;
        let collection = declaration.keyword.collection();
        for (name, etype_range) in declaration.names {
            let etype = match declaration.keyword {
                Keyword::Action => action_literal(&self.namespace, &name),
                _ => qualify(&self.namespace, &name),
            };
            self.records.push(SchemaRecord {
                collection,
                etype,
                range: Range::new(declaration.start, end),
                etype_range,
            });
        }
    }

    fn line(&mut self, line_no: u32, line: &str) {
        let code = &line[..code_end(line)];
        let trimmed = code.trim_end();

        if self.declaration.is_none() {
            if let Some(caps) = NAMESPACE.captures(code) {
                if let Some(name) = caps.name("name") {
                    self.namespace = SmolStr::new(name.as_str());
                    self.tokens.push(SemanticToken::new(
                        Range::on_line(line_no, name.start() as u32, name.len() as u32),
                        TokenType::Namespace,
                        TokenModifiers::DECLARATION,
                    ));
                }
                return;
            }
            if trimmed.trim_start().starts_with('}') {
                self.namespace = SmolStr::default();
                return;
            }
            let Some(caps) = DECLARATION.captures(code) else {
                return;
            };
            let (Some(keyword), Some(whole)) = (caps.name("keyword"), caps.get(0)) else {
                return;
            };
            let keyword_kind = match keyword.as_str() {
                "entity" => Keyword::Entity,
                "action" => Keyword::Action,
                _ => Keyword::Type,
            };
            let (names, after) = declared_names(code, whole.end());
            if names.is_empty() {
                return;
            }
            let names = names
                .into_iter()
                .map(|(name, col, len)| {
                    let range = Range::on_line(line_no, col as u32, len as u32);
                    self.tokens
                        .push(SemanticToken::new(range, TokenType::Type, TokenModifiers::DECLARATION));
                    (name, range)
                })
                .collect();
            self.declaration = Some(Declaration {
                keyword: keyword_kind,
                start: LineCol::new(line_no, keyword.start() as u32),
                names,
                body_started: false,
            });
            self.clauses(code, after, line_no);
        } else {
            self.clauses(code, 0, line_no);
        }

        if trimmed.ends_with(';') {
            self.close(LineCol::new(line_no, trimmed.len() as u32));
        }
    }
}

/// Index a human-readable schema. The completion graph is left empty.
pub fn parse_schema_human(text: &str) -> SchemaIndex {
    let mut scanner = Scanner {
        namespace: SmolStr::default(),
        declaration: None,
        open_list: None,
        records: Vec::new(),
        refs: RefTable::default(),
        tokens: Vec::new(),
    };
    for (line_no, line) in text.split('\n').enumerate() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        scanner.line(line_no as u32, line);
    }
    SchemaIndex {
        format: SchemaFormat::Human,
        records: scanner.records,
        refs: scanner.refs,
        completions: CompletionGraph::default(),
        tokens: scanner.tokens,
    }
}
