//! Reference harvesting shared by the JSON dialect indexers.
//!
//! Entity uids appear in two encodings: an object with a type key and an id
//! key, and a string literal holding `Type::"id"`. Both end up in a
//! [`RefTable`].

use smol_str::SmolStr;

use super::records::{RefTable, format_uid};
use crate::base::Range;
use crate::syntax::entity_ref::{self, is_action_type};
use crate::syntax::json::{JsonLiteral, JsonSpan, decode_with_offsets};

/// A partially seen uid object.
#[derive(Clone, Debug, Default)]
pub struct UidDraft {
    pub entity_type: Option<(SmolStr, Range)>,
    pub id: Option<(SmolStr, Range)>,
}

impl UidDraft {
    /// `Type::"id"` once both halves are known.
    pub fn uid(&self) -> Option<SmolStr> {
        let (ty, _) = self.entity_type.as_ref()?;
        let (id, _) = self.id.as_ref()?;
        Some(format_uid(ty, id))
    }

    /// Record this draft as a type reference, or as an action id when the
    /// type is an action type.
    pub fn record(&self, refs: &mut RefTable) {
        let Some((ty, ty_range)) = &self.entity_type else {
            return;
        };
        match &self.id {
            Some((id, id_range)) if is_action_type(ty) => refs.push_action(format_uid(ty, id), *id_range),
            _ => refs.push_type(ty.clone(), *ty_range),
        }
    }
}

/// One [`UidDraft`] per open object, fed by the walker callbacks.
#[derive(Debug)]
pub struct UidCollector {
    type_key: &'static str,
    id_key: &'static str,
    frames: Vec<UidDraft>,
}

impl UidCollector {
    pub fn new(type_key: &'static str, id_key: &'static str) -> Self {
        Self {
            type_key,
            id_key,
            frames: Vec::new(),
        }
    }

    pub fn begin_object(&mut self) {
        self.frames.push(UidDraft::default());
    }

    /// Feed a literal whose innermost path segment is `key`.
    pub fn literal(&mut self, key: Option<&str>, value: &JsonLiteral<'_>, span: JsonSpan) {
        let (Some(key), Some(text), Some(frame)) = (key, value.as_str(), self.frames.last_mut()) else {
            return;
        };
        if key == self.type_key {
            frame.entity_type = Some((SmolStr::new(text), span.trimmed()));
        } else if key == self.id_key {
            frame.id = Some((SmolStr::new(text), span.trimmed()));
        }
    }

    /// Close the innermost object, recording its uid if it had a type.
    pub fn end_object(&mut self, refs: &mut RefTable) -> Option<UidDraft> {
        let draft = self.frames.pop()?;
        draft.record(refs);
        Some(draft)
    }
}

/// Harvest `Type::"id"` and `Ns::Type` references embedded in the string
/// literal at `span` of `text`. Ranges point at the raw (escaped) source.
pub fn scan_string_literal(text: &str, span: JsonSpan, refs: &mut RefTable) {
    let start = span.offset as usize + 1;
    let end = (span.offset + span.len) as usize;
    let Some(raw) = text.get(start..end.saturating_sub(1).max(start)) else {
        return;
    };
    let (decoded, offsets) = decode_with_offsets(raw);
    let line = span.start.line;
    let base = span.start.col + 1;
    let raw_range = |from: usize, to: usize| {
        let from = offsets.get(from).copied().unwrap_or(raw.len()) as u32;
        let to = offsets.get(to).copied().unwrap_or(raw.len()) as u32;
        Range::on_line(line, base + from, to.saturating_sub(from))
    };
    for found in entity_ref::scan_value(&decoded) {
        if found.is_action() {
            let id_end = found.id_offset + found.id.map_or(0, str::len);
            refs.push_action(found.literal(), raw_range(found.id_offset, id_end));
        } else {
            let type_end = found.type_offset + found.type_name.len();
            refs.push_type(found.type_name, raw_range(found.type_offset, type_end));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::json::{JsonPath, JsonVisitor, walk};

    struct Collect<'t> {
        text: &'t str,
        uids: UidCollector,
        refs: RefTable,
    }

    impl JsonVisitor for Collect<'_> {
        fn on_object_begin(&mut self, _span: JsonSpan, _path: &JsonPath) {
            self.uids.begin_object();
        }
        fn on_object_end(&mut self, _span: JsonSpan, _path: &JsonPath) {
            self.uids.end_object(&mut self.refs);
        }
        fn on_literal_value(&mut self, value: &JsonLiteral<'_>, span: JsonSpan, path: &JsonPath) {
            if path.last_key() == Some("note") {
                scan_string_literal(self.text, span, &mut self.refs);
            }
            self.uids.literal(path.last_key(), value, span);
        }
    }

    fn collect(text: &str) -> RefTable {
        let mut visitor = Collect {
            text,
            uids: UidCollector::new("type", "id"),
            refs: RefTable::default(),
        };
        walk(text, &mut visitor);
        visitor.refs
    }

    #[test]
    fn test_uid_objects_become_references() {
        let refs = collect(r#"{"principal": {"type": "NS::User", "id": "alice"}}"#);
        assert_eq!(refs.referenced_types.len(), 1);
        assert_eq!(refs.referenced_types[0].name, "NS::User");
        assert_eq!(refs.referenced_types[0].range, Range::on_line(0, 24, 8));
    }

    #[test]
    fn test_action_uid_objects_become_action_ids() {
        let refs = collect(r#"{"action": {"type": "NS::Action", "id": "view"}}"#);
        assert!(refs.referenced_types.is_empty());
        assert_eq!(refs.action_ids[0].name, r#"NS::Action::"view""#);
    }

    #[test]
    fn test_string_literal_ranges_point_at_raw_source() {
        let text = r#"{"note": "NS::User::\"a\""}"#;
        let refs = collect(text);
        assert_eq!(refs.referenced_types[0].name, "NS::User");
        // the literal opens at column 9, the type starts right after the quote
        assert_eq!(refs.referenced_types[0].range, Range::on_line(0, 10, 8));
    }

    #[test]
    fn test_draft_uid() {
        let draft = UidDraft {
            entity_type: Some(("User".into(), Range::default())),
            id: Some(("bob".into(), Range::default())),
        };
        assert_eq!(draft.uid().as_deref(), Some(r#"User::"bob""#));
    }
}
