//! Completion graph: qualified type name to attribute shape.
//!
//! Built while walking a JSON-form schema. Every type descriptor object
//! (a shape, a common type, an action context, an attribute or a set
//! element) opens a [`Frame`] recording the path depth at which it began;
//! the frame is popped and folded into its parent when the walker leaves
//! that depth again. Wrapper kinds (`Set`, `Entity`, `Extension`) are only
//! resolved at that point, once their `element`/`name` field has been seen.

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use smol_str::{SmolStr, format_smolstr};

use crate::hir::resolve::{action_literal, is_extension, is_primitive, normalize_builtin, qualify};
use crate::syntax::json::{JsonLiteral, JsonPath};

/// Attributes of one shape, in declaration order.
pub type AttributeMap = IndexMap<SmolStr, AttributeDescriptor>;

/// Qualified entity type, common type or action literal to its attributes.
/// Action entries hold the action's `context` shape.
pub type CompletionGraph = FxHashMap<SmolStr, AttributeMap>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeDescriptor {
    /// `String`, `Long`, `Boolean`, `Record`, `Set`, `Set<T>`, an extension
    /// type name, or a qualified entity / common type name.
    pub description: SmolStr,
    /// The nested shape when `description` is `Record`.
    pub children: Option<AttributeMap>,
}

impl AttributeDescriptor {
    pub fn new(description: impl Into<SmolStr>) -> Self {
        Self {
            description: description.into(),
            children: None,
        }
    }

    pub fn record(children: AttributeMap) -> Self {
        Self {
            description: SmolStr::new_static("Record"),
            children: Some(children),
        }
    }

    /// Whether the description names another graph entry.
    pub fn is_type_reference(&self) -> bool {
        self.children.is_none()
            && !is_primitive(&self.description)
            && !is_extension(&self.description)
            && !self.description.starts_with("Set")
            && self.description != "Record"
    }
}

#[derive(Debug)]
enum Slot {
    /// A top-level shape stored under this graph key.
    Root(SmolStr),
    Attribute(SmolStr),
    Element,
}

#[derive(Debug)]
struct Frame {
    depth: usize,
    slot: Slot,
    kind: Option<SmolStr>,
    name: Option<SmolStr>,
    element: Option<SmolStr>,
    has_attributes: bool,
    attributes: AttributeMap,
}

impl Frame {
    fn new(depth: usize, slot: Slot) -> Self {
        Self {
            depth,
            slot,
            kind: None,
            name: None,
            element: None,
            has_attributes: false,
            attributes: AttributeMap::default(),
        }
    }

    fn into_descriptor(self, ns: &str) -> Option<(Slot, AttributeDescriptor)> {
        let kind = match self.kind.as_deref() {
            Some(kind) => normalize_builtin(kind),
            None if self.has_attributes => "Record",
            None => return None,
        };
        let descriptor = match kind {
            "Record" => AttributeDescriptor::record(self.attributes),
            "Set" => match self.element {
                Some(element) => AttributeDescriptor::new(format_smolstr!("Set<{element}>")),
                None => AttributeDescriptor::new("Set"),
            },
            "Entity" | "EntityOrCommon" | "Extension" => match self.name.as_deref().map(normalize_builtin) {
                Some(name) if is_primitive(name) || is_extension(name) => AttributeDescriptor::new(name),
                Some(name) if kind == "Extension" => AttributeDescriptor::new(name),
                Some(name) => AttributeDescriptor::new(qualify(ns, name)),
                None => AttributeDescriptor::new(kind),
            },
            primitive if is_primitive(primitive) => AttributeDescriptor::new(primitive),
            common => AttributeDescriptor::new(qualify(ns, common)),
        };
        Some((self.slot, descriptor))
    }
}

/// Graph key for a top-level descriptor object at `path`.
fn root_key(path: &JsonPath) -> Option<SmolStr> {
    let ns = path.key(0)?;
    match (path.len(), path.key(1)?) {
        (3, "commonTypes") => Some(qualify(ns, path.key(2)?)),
        (4, "entityTypes") if path.key(3) == Some("shape") => Some(qualify(ns, path.key(2)?)),
        (5, "actions") if path.key(3) == Some("appliesTo") && path.key(4) == Some("context") => {
            Some(action_literal(ns, path.key(2)?))
        }
        _ => None,
    }
}

/// Incremental graph construction, fed by the schema walker.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    frames: Vec<Frame>,
    graph: CompletionGraph,
    /// Shapes that are literally a named type: (owner, target).
    links: Vec<(SmolStr, SmolStr)>,
}

impl GraphBuilder {
    pub fn object_begin(&mut self, path: &JsonPath) {
        if let Some(key) = root_key(path) {
            self.frames.push(Frame::new(path.len(), Slot::Root(key)));
            return;
        }
        let Some(top) = self.frames.last_mut() else {
            return;
        };
        let len = path.len();
        if len == top.depth + 1 && path.last_key() == Some("attributes") {
            top.has_attributes = true;
        } else if len == top.depth + 2 && path.key(top.depth) == Some("attributes") {
            if let Some(name) = path.last_key() {
                let frame = Frame::new(len, Slot::Attribute(SmolStr::new(name)));
                self.frames.push(frame);
            }
        } else if len == top.depth + 1 && path.last_key() == Some("element") {
            self.frames.push(Frame::new(len, Slot::Element));
        }
    }

    pub fn literal(&mut self, path: &JsonPath, value: &JsonLiteral<'_>) {
        let (Some(top), Some(text)) = (self.frames.last_mut(), value.as_str()) else {
            return;
        };
        if path.len() != top.depth + 1 {
            return;
        }
        match path.last_key() {
            Some("type") => top.kind = Some(SmolStr::new(text)),
            Some("name") => top.name = Some(SmolStr::new(text)),
            _ => {}
        }
    }

    pub fn object_end(&mut self, path: &JsonPath) {
        if self.frames.last().is_none_or(|top| top.depth != path.len()) {
            return;
        }
        let Some(frame) = self.frames.pop() else {
            return;
        };
        let ns = path.key(0).unwrap_or_default();
        let Some((slot, descriptor)) = frame.into_descriptor(ns) else {
            return;
        };
        match slot {
            Slot::Root(key) => match descriptor.children {
                Some(children) => {
                    self.graph.insert(key, children);
                }
                None if descriptor.is_type_reference() => self.links.push((key, descriptor.description)),
                None => {}
            },
            Slot::Attribute(name) => {
                if let Some(parent) = self.frames.last_mut() {
                    parent.attributes.insert(name, descriptor);
                }
            }
            Slot::Element => {
                if let Some(parent) = self.frames.last_mut() {
                    parent.element = Some(descriptor.description);
                }
            }
        }
    }

    /// Resolve shapes that name another type and give every declared type
    /// an entry.
    pub fn finish(mut self, declared: impl IntoIterator<Item = SmolStr>) -> CompletionGraph {
        for _ in 0..self.links.len() {
            let mut progressed = false;
            for (owner, target) in &self.links {
                if self.graph.get(owner).is_some_and(|m| !m.is_empty()) {
                    continue;
                }
                if let Some(shape) = self.graph.get(target).filter(|m| !m.is_empty()).cloned() {
                    self.graph.insert(owner.clone(), shape);
                    progressed = true;
                }
            }
            if !progressed {
                break;
            }
        }
        for name in declared {
            self.graph.entry(name).or_default();
        }
        self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::json::{JsonSpan, JsonVisitor, walk};

    struct Feed(GraphBuilder);

    impl JsonVisitor for Feed {
        fn on_object_begin(&mut self, _span: JsonSpan, path: &JsonPath) {
            self.0.object_begin(path);
        }
        fn on_object_end(&mut self, _span: JsonSpan, path: &JsonPath) {
            self.0.object_end(path);
        }
        fn on_literal_value(&mut self, value: &JsonLiteral<'_>, _span: JsonSpan, path: &JsonPath) {
            self.0.literal(path, value);
        }
    }

    fn build(text: &str) -> CompletionGraph {
        let mut feed = Feed(GraphBuilder::default());
        walk(text, &mut feed);
        feed.0.finish([])
    }

    const SCHEMA: &str = r#"{
  "NS": {
    "commonTypes": {
      "Addr": { "type": "Record", "attributes": { "street": { "type": "String" } } }
    },
    "entityTypes": {
      "User": {
        "memberOfTypes": ["Group"],
        "shape": {
          "type": "Record",
          "attributes": {
            "name": { "type": "String" },
            "active": { "type": "Bool" },
            "tags": { "type": "Set", "element": { "type": "String" } },
            "groups": { "type": "Set", "element": { "type": "Entity", "name": "Group" } },
            "manager": { "name": "User", "type": "Entity" },
            "ip": { "type": "Extension", "name": "ipaddr" },
            "home": { "type": "Addr" },
            "nested": { "type": "Record", "attributes": { "depth": { "type": "Long" } } }
          }
        }
      },
      "Group": {},
      "Office": { "shape": { "type": "Addr" } }
    },
    "actions": {
      "view": { "appliesTo": { "context": { "type": "Record", "attributes": { "mfa": { "type": "Boolean" } } } } }
    }
  }
}"#;

    #[test]
    fn test_attribute_kinds() {
        let graph = build(SCHEMA);
        let user = &graph["NS::User"];
        let kinds: Vec<_> = user.iter().map(|(k, v)| (k.as_str(), v.description.as_str())).collect();
        assert_eq!(
            kinds,
            vec![
                ("name", "String"),
                ("active", "Boolean"),
                ("tags", "Set<String>"),
                ("groups", "Set<NS::Group>"),
                ("manager", "NS::User"),
                ("ip", "ipaddr"),
                ("home", "NS::Addr"),
                ("nested", "Record"),
            ]
        );
        let nested = user["nested"].children.as_ref().unwrap();
        assert_eq!(nested["depth"].description, "Long");
    }

    #[test]
    fn test_common_types_and_contexts() {
        let graph = build(SCHEMA);
        assert_eq!(graph["NS::Addr"]["street"].description, "String");
        assert_eq!(graph[r#"NS::Action::"view""#]["mfa"].description, "Boolean");
    }

    #[test]
    fn test_shape_linked_to_common_type_is_copied() {
        let graph = build(SCHEMA);
        assert_eq!(graph["NS::Office"]["street"].description, "String");
    }

    #[test]
    fn test_declared_types_get_entries() {
        let mut feed = Feed(GraphBuilder::default());
        walk(SCHEMA, &mut feed);
        let graph = feed.0.finish([SmolStr::new("NS::Group")]);
        assert!(graph["NS::Group"].is_empty());
    }

    #[test]
    fn test_self_reference_builds() {
        let text = r#"{"": {"commonTypes": {"Node": {"type": "Record", "attributes": {"next": {"type": "Node"}}}}}}"#;
        let graph = build(text);
        assert_eq!(graph["Node"]["next"].description, "Node");
        assert!(graph["Node"]["next"].is_type_reference());
    }
}
