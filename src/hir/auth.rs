//! Authorization-request indexer.
//!
//! A request is any object owning `principal`, `action` or `resource`; a
//! document may hold one request or an array of them.

use smol_str::SmolStr;

use super::json_refs::{UidCollector, scan_string_literal};
use super::records::RefTable;
use crate::base::{LineCol, Range};
use crate::syntax::json::{JsonLiteral, JsonPath, JsonSpan, JsonVisitor, walk};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthRequestRecord {
    pub range: Range,
    pub principal: Option<SmolStr>,
    pub action: Option<SmolStr>,
    pub resource: Option<SmolStr>,
    /// From the `context` key to the end of its value.
    pub context_range: Option<Range>,
}

#[derive(Debug, Default)]
pub struct AuthIndex {
    pub requests: Vec<AuthRequestRecord>,
    pub refs: RefTable,
}

#[derive(Default)]
struct Frame {
    is_request: bool,
    context_key: Option<LineCol>,
    record: AuthRequestRecord,
}

impl Frame {
    fn slot(&mut self, key: &str) -> Option<&mut Option<SmolStr>> {
        match key {
            "principal" => Some(&mut self.record.principal),
            "action" => Some(&mut self.record.action),
            "resource" => Some(&mut self.record.resource),
            _ => None,
        }
    }
}

struct AuthVisitor<'t> {
    text: &'t str,
    index: AuthIndex,
    frames: Vec<Frame>,
    uids: UidCollector,
}

impl JsonVisitor for AuthVisitor<'_> {
    fn on_object_begin(&mut self, span: JsonSpan, _path: &JsonPath) {
        self.uids.begin_object();
        let mut frame = Frame::default();
        frame.record.range.start = span.start;
        self.frames.push(frame);
    }

    fn on_object_end(&mut self, span: JsonSpan, path: &JsonPath) {
        let draft = self.uids.end_object(&mut self.index.refs);
        let Some(mut frame) = self.frames.pop() else {
            return;
        };
        if let (Some(key), Some(owner)) = (path.last_key(), self.frames.last_mut()) {
            if key == "context" {
                if let Some(start) = owner.context_key {
                    owner.record.context_range = Some(Range::new(start, span.end()));
                }
            } else if let Some(slot) = owner.slot(key) {
                *slot = draft.and_then(|d| d.uid());
            }
        }
        if frame.is_request {
            frame.record.range.end = span.end();
            self.index.requests.push(frame.record);
        }
    }

    fn on_object_property(&mut self, key: &str, span: JsonSpan, _path: &JsonPath) {
        let Some(frame) = self.frames.last_mut() else {
            return;
        };
        match key {
            "principal" | "action" | "resource" => frame.is_request = true,
            "context" => frame.context_key = Some(span.trimmed().start),
            _ => {}
        }
    }

    fn on_literal_value(&mut self, value: &JsonLiteral<'_>, span: JsonSpan, path: &JsonPath) {
        let key = path.last_key();
        self.uids.literal(key, value, span);
        let (Some(key), Some(text)) = (key, value.as_str()) else {
            return;
        };
        let Some(frame) = self.frames.last_mut() else {
            return;
        };
        if let Some(slot) = frame.slot(key) {
            *slot = Some(SmolStr::new(text));
            scan_string_literal(self.text, span, &mut self.index.refs);
        }
    }
}

/// Index an authorization-request document.
pub fn parse_auth_request(text: &str) -> AuthIndex {
    let mut visitor = AuthVisitor {
        text,
        index: AuthIndex::default(),
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
    fn test_request_with_mixed_uid_encodings() {
        let text = r#"{
  "principal": "NS::User::\"alice\"",
  "action": { "type": "NS::Action", "id": "view" },
  "resource": { "type": "NS::Photo", "id": "p" },
  "context": { "ip": "10.0.0.1" }
}"#;
        let index = parse_auth_request(text);
        assert_eq!(index.requests.len(), 1);
        let request = &index.requests[0];
        assert_eq!(request.principal.as_deref(), Some(r#"NS::User::"alice""#));
        assert_eq!(request.action.as_deref(), Some(r#"NS::Action::"view""#));
        assert_eq!(request.resource.as_deref(), Some(r#"NS::Photo::"p""#));
        assert_eq!(request.context_range, Some(Range::new(LineCol::new(4, 3), LineCol::new(4, 33))));
        assert_eq!(request.range, Range::new(LineCol::new(0, 0), LineCol::new(5, 1)));

        assert_eq!(index.refs.action_ids[0].name, r#"NS::Action::"view""#);
        let types: Vec<_> = index.refs.referenced_types.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(types, vec!["NS::User", "NS::Photo"]);
    }

    #[test]
    fn test_array_of_requests() {
        let text = r#"[{"principal": "A::\"1\""}, {"resource": "B::\"2\""}]"#;
        let index = parse_auth_request(text);
        assert_eq!(index.requests.len(), 2);
        assert_eq!(index.requests[1].resource.as_deref(), Some(r#"B::"2""#));
    }
}
