//! Template-links indexer.
//!
//! Accepts both spellings of a link: `template_id`/`link_id`/`args` and
//! `templateId`/`newId`/`values`. Slot values may be uid objects or
//! `Type::"id"` strings.

use smol_str::SmolStr;

use super::json_refs::{UidCollector, scan_string_literal};
use super::records::RefTable;
use crate::base::{LineCol, Range};
use crate::syntax::json::{JsonLiteral, JsonPath, JsonSpan, JsonVisitor, walk};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotBinding {
    /// `?principal` or `?resource`.
    pub slot: SmolStr,
    pub key_range: Range,
    /// Bound uid, `Type::"id"`.
    pub uid: Option<SmolStr>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateLinkRecord {
    pub range: Range,
    pub template_id: Option<(SmolStr, Range)>,
    pub link_id: Option<(SmolStr, Range)>,
    pub slots: Vec<SlotBinding>,
}

#[derive(Debug, Default)]
pub struct TemplateLinksIndex {
    pub links: Vec<TemplateLinkRecord>,
    pub refs: RefTable,
}

fn is_template_key(key: &str) -> bool {
    matches!(key, "template_id" | "templateId")
}

fn is_link_key(key: &str) -> bool {
    matches!(key, "link_id" | "new_id" | "newId")
}

fn is_slot_path(path: &JsonPath) -> bool {
    path.last_key().is_some_and(|k| k.starts_with('?'))
        && matches!(path.key_from_end(1), Some("args" | "values"))
}

#[derive(Default)]
struct Frame {
    start: LineCol,
    is_link: bool,
    template_id: Option<(SmolStr, Range)>,
    link_id: Option<(SmolStr, Range)>,
    slots: Vec<SlotBinding>,
}

struct LinksVisitor<'t> {
    text: &'t str,
    index: TemplateLinksIndex,
    frames: Vec<Frame>,
    uids: UidCollector,
}

impl LinksVisitor<'_> {
    fn link_frame(&mut self) -> Option<&mut Frame> {
        self.frames.iter_mut().rev().find(|f| f.is_link)
    }

    fn bind(&mut self, slot: &str, uid: Option<SmolStr>) {
        let Some(frame) = self.link_frame() else {
            return;
        };
        if let Some(binding) = frame.slots.iter_mut().rev().find(|b| b.slot == slot) {
            binding.uid = uid;
        }
    }
}

impl JsonVisitor for LinksVisitor<'_> {
    fn on_object_begin(&mut self, span: JsonSpan, _path: &JsonPath) {
        self.uids.begin_object();
        self.frames.push(Frame {
            start: span.start,
            ..Frame::default()
        });
    }

    fn on_object_end(&mut self, span: JsonSpan, path: &JsonPath) {
        let draft = self.uids.end_object(&mut self.index.refs);
        let Some(frame) = self.frames.pop() else {
            return;
        };
        if let Some(slot) = path.last_key().filter(|_| is_slot_path(path)) {
            self.bind(slot, draft.and_then(|d| d.uid()));
        }
        if frame.is_link {
            self.index.links.push(TemplateLinkRecord {
                range: Range::new(frame.start, span.end()),
                template_id: frame.template_id,
                link_id: frame.link_id,
                slots: frame.slots,
            });
        }
    }

    fn on_object_property(&mut self, key: &str, span: JsonSpan, path: &JsonPath) {
        if is_template_key(key) || is_link_key(key) {
            if let Some(frame) = self.frames.last_mut() {
                frame.is_link = true;
            }
        } else if key.starts_with('?') && matches!(path.last_key(), Some("args" | "values")) {
            if let Some(frame) = self.link_frame() {
                frame.slots.push(SlotBinding {
                    slot: SmolStr::new(key),
                    key_range: span.trimmed(),
                    uid: None,
                });
            }
        }
    }

    fn on_literal_value(&mut self, value: &JsonLiteral<'_>, span: JsonSpan, path: &JsonPath) {
        let key = path.last_key();
        self.uids.literal(key, value, span);
        let (Some(key), Some(text)) = (key, value.as_str()) else {
            return;
        };
        if is_slot_path(path) {
            scan_string_literal(self.text, span, &mut self.index.refs);
            self.bind(key, Some(SmolStr::new(text)));
            return;
        }
        let Some(frame) = self.frames.last_mut() else {
            return;
        };
        let entry = Some((SmolStr::new(text), span.trimmed()));
        if is_template_key(key) {
            frame.template_id = entry;
        } else if is_link_key(key) {
            frame.link_id = entry;
        }
    }
}

/// Index a template-links document.
pub fn parse_template_links(text: &str) -> TemplateLinksIndex {
    let mut visitor = LinksVisitor {
        text,
        index: TemplateLinksIndex::default(),
        frames: Vec::new(),
        uids: UidCollector::new("type", "id"),
    };
    walk(text, &mut visitor);
    visitor.index
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_links_with_string_and_object_slots() {
        let text = r#"[
  {
    "template_id": "t0",
    "link_id": "l0",
    "args": {
      "?principal": "NS::User::\"alice\"",
      "?resource": { "type": "NS::Photo", "id": "p1" }
    }
  }
]"#;
        let index = parse_template_links(text);
        assert_eq!(index.links.len(), 1);
        let link = &index.links[0];
        assert_eq!(link.template_id.as_ref().map(|(id, _)| id.as_str()), Some("t0"));
        assert_eq!(link.link_id.as_ref().map(|(_, r)| *r), Some(Range::on_line(3, 16, 2)));
        assert_eq!(link.slots.len(), 2);
        assert_eq!(link.slots[0].uid.as_deref(), Some(r#"NS::User::"alice""#));
        assert_eq!(link.slots[1].uid.as_deref(), Some(r#"NS::Photo::"p1""#));

        let types: Vec<_> = index.refs.referenced_types.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(types, vec!["NS::User", "NS::Photo"]);
    }

    #[test]
    fn test_alternate_spelling() {
        let text = r#"[{"templateId": "t", "newId": "n", "values": {"?principal": {"type": "U", "id": "x"}}}]"#;
        let index = parse_template_links(text);
        let link = &index.links[0];
        assert_eq!(link.link_id.as_ref().map(|(id, _)| id.as_str()), Some("n"));
        assert_eq!(link.slots[0].slot, "?principal");
        assert_eq!(link.slots[0].uid.as_deref(), Some(r#"U::"x""#));
    }
}
