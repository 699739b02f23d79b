//! JSON-encoded policy indexer.
//!
//! Any object that owns an `effect` property is a policy, which covers a
//! single policy document as well as the `staticPolicies`/`templates` maps
//! of a policy set.

use smol_str::SmolStr;

use super::json_refs::UidCollector;
use super::records::RefTable;
use crate::base::{LineCol, Range};
use crate::syntax::json::{JsonLiteral, JsonPath, JsonSpan, JsonVisitor, PathSegment, walk};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JsonPolicyRecord {
    /// `annotations.id`, else the key of the policy in its map, else `policy<N>`.
    pub id: SmolStr,
    pub range: Range,
    /// The value of the `effect` property, without quotes.
    pub effect_range: Range,
}

#[derive(Debug, Default)]
pub struct JsonPolicyIndex {
    pub policies: Vec<JsonPolicyRecord>,
    pub refs: RefTable,
}

struct Frame {
    start: LineCol,
    key: Option<SmolStr>,
    annotation_id: Option<SmolStr>,
    effect: Option<Range>,
    is_policy: bool,
}

struct PolicyJsonVisitor {
    index: JsonPolicyIndex,
    frames: Vec<Frame>,
    uids: UidCollector,
}

impl JsonVisitor for PolicyJsonVisitor {
    fn on_object_begin(&mut self, span: JsonSpan, path: &JsonPath) {
        let key = match path.segments().last() {
            Some(PathSegment::Key(key)) => Some(key.clone()),
            _ => None,
        };
        self.frames.push(Frame {
            start: span.start,
            key,
            annotation_id: None,
            effect: None,
            is_policy: false,
        });
        self.uids.begin_object();
    }

    fn on_object_end(&mut self, span: JsonSpan, _path: &JsonPath) {
        self.uids.end_object(&mut self.index.refs);
        let Some(frame) = self.frames.pop() else {
            return;
        };
        if !frame.is_policy {
            return;
        }
        let ordinal = self.index.policies.len();
        let id = frame
            .annotation_id
            .or(frame.key)
            .unwrap_or_else(|| smol_str::format_smolstr!("policy{ordinal}"));
        self.index.policies.push(JsonPolicyRecord {
            id,
            range: Range::new(frame.start, span.end()),
            effect_range: frame.effect.unwrap_or(Range::empty(frame.start)),
        });
    }

    fn on_object_property(&mut self, key: &str, _span: JsonSpan, _path: &JsonPath) {
        if key != "effect" {
            return;
        }
        if let Some(frame) = self.frames.last_mut() {
            frame.is_policy = true;
        }
    }

    fn on_literal_value(&mut self, value: &JsonLiteral<'_>, span: JsonSpan, path: &JsonPath) {
        let key = path.last_key();
        match key {
            Some("effect") => {
                if let Some(frame) = self.frames.last_mut() {
                    frame.effect = Some(span.trimmed());
                }
            }
            Some("entity_type") => {
                if let Some(ty) = value.as_str() {
                    self.index.refs.push_type(ty, span.trimmed());
                }
            }
            Some("id") if path.key_from_end(1) == Some("annotations") => {
                let owner = self.frames.len().checked_sub(2);
                if let (Some(owner), Some(text)) = (owner, value.as_str()) {
                    self.frames[owner].annotation_id = Some(SmolStr::new(text));
                }
            }
            _ => {}
        }
        self.uids.literal(key, value, span);
    }
}

/// Index a JSON policy or policy-set document.
pub fn parse_policy_json(text: &str) -> JsonPolicyIndex {
    let mut visitor = PolicyJsonVisitor {
        index: JsonPolicyIndex::default(),
        frames: Vec::new(),
        uids: UidCollector::new("type", "id"),
    };
    walk(text, &mut visitor);
    visitor.index
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLICY_SET: &str = r#"{
  "staticPolicies": {
    "p1": {
      "effect": "permit",
      "principal": { "op": "==", "entity": { "type": "NS::User", "id": "alice" } },
      "action": { "op": "==", "entity": { "type": "NS::Action", "id": "view" } },
      "resource": { "op": "is", "entity_type": "NS::Photo" },
      "conditions": []
    }
  },
  "templates": {
    "t1": {
      "effect": "forbid",
      "annotations": { "id": "named" },
      "principal": { "op": "==", "slot": "?principal" },
      "action": { "op": "All" },
      "resource": { "op": "All" },
      "conditions": []
    }
  }
}"#;

    #[test]
    fn test_policies_found_in_maps() {
        let index = parse_policy_json(POLICY_SET);
        let ids: Vec<_> = index.policies.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "named"]);
        assert_eq!(index.policies[0].effect_range, Range::on_line(3, 17, 6));
        assert_eq!(index.policies[0].range.start, LineCol::new(2, 10));
        assert_eq!(index.policies[0].range.end, LineCol::new(8, 5));
    }

    #[test]
    fn test_references_collected() {
        let index = parse_policy_json(POLICY_SET);
        let types: Vec<_> = index.refs.referenced_types.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(types, vec!["NS::User", "NS::Photo"]);
        assert_eq!(index.refs.action_ids[0].name, r#"NS::Action::"view""#);
    }

    #[test]
    fn test_single_policy_gets_ordinal_id() {
        let index = parse_policy_json(r#"{"effect": "permit", "principal": {"op": "All"}}"#);
        assert_eq!(index.policies[0].id, "policy0");
    }
}
