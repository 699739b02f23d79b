//! Entities document indexer.
//!
//! One [`EntityRecord`] per object of the top-level array. The key names
//! come from an [`EntityNaming`] chosen once per document.

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use super::json_refs::{UidCollector, scan_string_literal};
use super::records::{RefTable, format_uid};
use super::tokens::{SemanticToken, TokenModifiers, TokenType};
use crate::base::{LineCol, Range};
use crate::syntax::EntityNaming;
use crate::syntax::json::{JsonLiteral, JsonPath, JsonSpan, JsonVisitor, walk};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityRecord {
    /// `Type::"id"`.
    pub uid: SmolStr,
    pub range: Range,
    pub uid_key_range: Range,
    pub uid_type_range: Option<Range>,
    pub attrs_key_range: Option<Range>,
    /// Set only when at least one attribute name was seen.
    pub attrs_range: Option<Range>,
    /// Last occurrence wins for duplicated names.
    pub attr_name_ranges: FxHashMap<SmolStr, Range>,
    pub parents_key_range: Option<Range>,
    /// Set only when at least one parent element was seen.
    pub parents_range: Option<Range>,
}

impl EntityRecord {
    /// Where to report a problem with attribute `name`, falling back to the
    /// attrs block and then to the uid.
    pub fn attr_range(&self, name: &str) -> Range {
        self.attr_name_ranges
            .get(name)
            .copied()
            .or(self.attrs_key_range)
            .unwrap_or(self.uid_key_range)
    }

    pub fn parents_or_uid_range(&self) -> Range {
        self.parents_key_range.unwrap_or(self.uid_key_range)
    }

    pub fn type_or_uid_range(&self) -> Range {
        self.uid_type_range.unwrap_or(self.uid_key_range)
    }
}

#[derive(Debug, Default)]
pub struct EntitiesIndex {
    pub entities: Vec<EntityRecord>,
    pub refs: RefTable,
    pub tokens: Vec<SemanticToken>,
}

impl EntitiesIndex {
    pub fn find(&self, uid: &str) -> Option<&EntityRecord> {
        self.entities.iter().find(|e| e.uid == uid)
    }
}

#[derive(Default)]
struct Draft {
    start: LineCol,
    uid: Option<SmolStr>,
    uid_type: Option<SmolStr>,
    uid_id: Option<SmolStr>,
    uid_key_range: Option<Range>,
    uid_type_range: Option<Range>,
    attrs_key: Option<JsonSpan>,
    attrs_range: Option<Range>,
    attr_name_ranges: FxHashMap<SmolStr, Range>,
    parents_key: Option<JsonSpan>,
    parents_range: Option<Range>,
    parent_count: usize,
}

struct EntitiesVisitor<'t> {
    text: &'t str,
    naming: EntityNaming,
    index: EntitiesIndex,
    draft: Draft,
    uids: UidCollector,
}

impl EntitiesVisitor<'_> {
    fn under(&self, path: &JsonPath, key: &str) -> bool {
        path.key(1) == Some(key)
    }

    fn finish(&mut self, end: LineCol) {
        let draft = std::mem::take(&mut self.draft);
        let uid = draft.uid.or_else(|| match (&draft.uid_type, &draft.uid_id) {
            (Some(ty), Some(id)) => Some(format_uid(ty, id)),
            (Some(ty), None) => Some(format_uid(ty, "")),
            _ => None,
        });
        let (Some(uid), Some(uid_key_range)) = (uid, draft.uid_key_range) else {
            return;
        };
        self.index.entities.push(EntityRecord {
            uid,
            range: Range::new(draft.start, end),
            uid_key_range,
            uid_type_range: draft.uid_type_range,
            attrs_key_range: draft.attrs_key.map(|s| s.trimmed()),
            attrs_range: draft.attrs_range,
            attr_name_ranges: draft.attr_name_ranges,
            parents_key_range: draft.parents_key.map(|s| s.trimmed()),
            parents_range: draft.parents_range,
        });
    }
}

impl JsonVisitor for EntitiesVisitor<'_> {
    fn on_object_begin(&mut self, span: JsonSpan, path: &JsonPath) {
        self.uids.begin_object();
        match path.len() {
            1 => {
                self.draft = Draft {
                    start: span.start,
                    ..Draft::default()
                };
            }
            3 if self.under(path, self.naming.parents) => self.draft.parent_count += 1,
            _ => {}
        }
    }

    fn on_object_end(&mut self, span: JsonSpan, path: &JsonPath) {
        self.uids.end_object(&mut self.index.refs);
        match path.len() {
            1 => self.finish(span.end()),
            2 if path.last_key() == Some(self.naming.attrs) && !self.draft.attr_name_ranges.is_empty() => {
                if let Some(key) = self.draft.attrs_key {
                    self.draft.attrs_range = Some(Range::new(key.trimmed().start, span.end()));
                }
            }
            _ => {}
        }
    }

    fn on_array_end(&mut self, span: JsonSpan, path: &JsonPath) {
        if path.len() == 2 && path.last_key() == Some(self.naming.parents) && self.draft.parent_count > 0 {
            if let Some(key) = self.draft.parents_key {
                self.draft.parents_range = Some(Range::new(key.trimmed().start, span.end()));
            }
        }
    }

    fn on_object_property(&mut self, key: &str, span: JsonSpan, path: &JsonPath) {
        match path.len() {
            1 if key == self.naming.uid => self.draft.uid_key_range = Some(span.trimmed()),
            1 if key == self.naming.attrs => self.draft.attrs_key = Some(span),
            1 if key == self.naming.parents => self.draft.parents_key = Some(span),
            2 if self.under(path, self.naming.attrs) => {
                self.draft.attr_name_ranges.insert(SmolStr::new(key), span.trimmed());
                self.index
                    .tokens
                    .push(SemanticToken::new(span.range(), TokenType::Property, TokenModifiers::NONE));
                return;
            }
            _ => {}
        }
        match key {
            "__expr" => self.index.tokens.push(SemanticToken::new(
                span.range(),
                TokenType::Macro,
                TokenModifiers::DEPRECATED,
            )),
            "__extn" => self
                .index
                .tokens
                .push(SemanticToken::new(span.range(), TokenType::Macro, TokenModifiers::NONE)),
            _ if key == self.naming.entity_escape => self
                .index
                .tokens
                .push(SemanticToken::new(span.range(), TokenType::Macro, TokenModifiers::NONE)),
            _ => {}
        }
    }

    fn on_literal_value(&mut self, value: &JsonLiteral<'_>, span: JsonSpan, path: &JsonPath) {
        let key = path.last_key();
        self.uids.literal(key, value, span);

        let len = path.len();
        if len > 2
            && key == Some(self.naming.entity_type)
            && (self.under(path, self.naming.uid)
                || self.under(path, self.naming.parents)
                || path.key_from_end(1) == Some(self.naming.entity_escape))
        {
            self.index
                .tokens
                .push(SemanticToken::new(span.range(), TokenType::Type, TokenModifiers::NONE));
        } else if len > 2 && key == Some("fn") && path.key_from_end(1) == Some("__extn") {
            self.index
                .tokens
                .push(SemanticToken::new(span.range(), TokenType::Function, TokenModifiers::NONE));
        }

        if self.under(path, self.naming.uid) {
            let Some(text) = value.as_str() else {
                return;
            };
            if key == Some(self.naming.entity_type) {
                self.draft.uid_type = Some(SmolStr::new(text));
                self.draft.uid_type_range = Some(span.trimmed());
            } else if key == Some(self.naming.entity_id) {
                self.draft.uid_id = Some(SmolStr::new(text));
            } else if len == 2 {
                // legacy `"uid": "Type::\"id\""`
                self.draft.uid = Some(SmolStr::new(text));
                scan_string_literal(self.text, span, &mut self.index.refs);
            }
        } else if len == 3 && self.under(path, self.naming.parents) {
            self.draft.parent_count += 1;
            scan_string_literal(self.text, span, &mut self.index.refs);
        }
    }
}

/// Index an entities document with the given key naming.
pub fn parse_entities(text: &str, naming: EntityNaming) -> EntitiesIndex {
    let mut visitor = EntitiesVisitor {
        text,
        naming,
        index: EntitiesIndex::default(),
        draft: Draft::default(),
        uids: UidCollector::new(naming.entity_type, naming.entity_id),
    };
    walk(text, &mut visitor);
    visitor.index
}
