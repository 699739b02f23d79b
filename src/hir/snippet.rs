//! Attribute skeletons rendered as editor snippets.
//!
//! Placeholders use the `$n`, `${n:default}` and `${n|a,b|}` forms. The
//! placeholder index is threaded through the whole recursion so it never
//! repeats within one snippet.

use std::fmt::Write as _;

use smol_str::SmolStr;

use super::schema::{AttributeMap, CompletionGraph};
use crate::syntax::EntityNaming;

/// Example argument for each extension constructor.
const EXTENSION_EXAMPLES: [(&str, &str, &str); 4] = [
    ("ipaddr", "ip", "127.0.0.1"),
    ("decimal", "decimal", "12345.6789"),
    ("datetime", "datetime", "2024-10-15T11:35:00Z"),
    ("duration", "duration", "1d2h3m4s5ms"),
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snippet {
    pub value: String,
    /// Next unused placeholder index.
    pub tabstop: u32,
}

/// Renders attribute shapes against one schema.
pub struct SnippetWriter<'g> {
    graph: &'g CompletionGraph,
    entity_types: &'g [SmolStr],
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '"' | '\\' | '$' | '}') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl<'g> SnippetWriter<'g> {
    pub fn new(graph: &'g CompletionGraph, entity_types: &'g [SmolStr]) -> Self {
        Self { graph, entity_types }
    }

    fn is_entity_type(&self, name: &str) -> bool {
        self.entity_types.iter().any(|e| e == name)
    }

    /// Render `attributes` as a JSON object at nesting level `indent`.
    ///
    /// `stack` holds the named types being expanded on the current branch;
    /// a named type already on it is rendered as `{}` instead of recursing.
    pub fn snippetify(&self, attributes: &AttributeMap, mut tabstop: u32, stack: &mut Vec<SmolStr>, indent: usize) -> Snippet {
        if attributes.is_empty() {
            return Snippet {
                value: "{}".to_owned(),
                tabstop,
            };
        }
        let prefix = "  ".repeat(indent);
        let mut entries = Vec::with_capacity(attributes.len());
        for (key, attribute) in attributes {
            let ty = attribute.description.as_str();
            let extension = EXTENSION_EXAMPLES.iter().find(|(name, _, _)| *name == ty);
            let value = if ty == "Boolean" {
                let value = format!("${{{tabstop}|false,true|}}");
                tabstop += 1;
                value
            } else if ty == "String" {
                let value = format!("\"${tabstop}\"");
                tabstop += 1;
                value
            } else if ty == "Long" {
                let value = format!("${{{tabstop}:0}}");
                tabstop += 1;
                value
            } else if ty == "Set" || ty.starts_with("Set<") {
                let value = format!("[${tabstop}]");
                tabstop += 1;
                value
            } else if let Some((_, function, example)) = extension {
                let value = format!(r#"{{ "fn": "{function}", "arg": "${{{tabstop}:{example}}}" }}"#);
                tabstop += 1;
                value
            } else if let Some(children) = &attribute.children {
                let nested = self.snippetify(children, tabstop, stack, indent + 1);
                tabstop = nested.tabstop;
                nested.value
            } else if self.is_entity_type(ty) {
                let value = format!(r#"{{ "type": "{}", "id": "${tabstop}" }}"#, escape(ty));
                tabstop += 1;
                value
            } else {
                match self.graph.get(ty) {
                    Some(shape) if !shape.is_empty() && !stack.iter().any(|s| s == ty) => {
                        stack.push(attribute.description.clone());
                        let nested = self.snippetify(shape, tabstop, stack, indent + 1);
                        stack.pop();
                        tabstop = nested.tabstop;
                        nested.value
                    }
                    _ => "{}".to_owned(),
                }
            };
            entries.push(format!("\n{prefix}\"{}\": {value}", escape(key)));
        }
        Snippet {
            value: format!("{{{}\n{}}}", entries.join(","), "  ".repeat(indent.saturating_sub(1))),
            tabstop,
        }
    }

    /// A whole entity object of type `entity_type` using `naming` for its
    /// keys. The id is `$1`, attributes start at `$2` and the parents list
    /// takes the last placeholder.
    pub fn entity(&self, entity_type: &str, naming: &EntityNaming) -> String {
        let mut stack = vec![SmolStr::new(entity_type)];
        let attrs = match self.graph.get(entity_type) {
            Some(shape) => self.snippetify(shape, 2, &mut stack, 2),
            None => Snippet {
                value: "{}".to_owned(),
                tabstop: 2,
            },
        };
        let mut out = String::from("{\n");
        let _ = writeln!(
            out,
            r#"  "{}": {{ "{}": "{}", "{}": "$1" }},"#,
            naming.uid,
            naming.entity_type,
            escape(entity_type),
            naming.entity_id
        );
        let _ = writeln!(out, r#"  "{}": {},"#, naming.attrs, attrs.value);
        let _ = writeln!(out, r#"  "{}": [${}]"#, naming.parents, attrs.tabstop);
        out.push('}');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hir::schema::AttributeDescriptor;

    fn graph() -> (CompletionGraph, Vec<SmolStr>) {
        let mut address = AttributeMap::default();
        address.insert("street".into(), AttributeDescriptor::new("String"));

        let mut user = AttributeMap::default();
        user.insert("active".into(), AttributeDescriptor::new("Boolean"));
        user.insert("age".into(), AttributeDescriptor::new("Long"));
        user.insert("address".into(), AttributeDescriptor::record(address));
        user.insert("ip".into(), AttributeDescriptor::new("ipaddr"));
        user.insert("manager".into(), AttributeDescriptor::new("NS::User"));
        user.insert("tags".into(), AttributeDescriptor::new("Set<String>"));

        let mut node = AttributeMap::default();
        node.insert("label".into(), AttributeDescriptor::new("String"));
        node.insert("next".into(), AttributeDescriptor::new("NS::Node"));

        let mut a = AttributeMap::default();
        a.insert("b".into(), AttributeDescriptor::new("NS::B"));
        let mut b = AttributeMap::default();
        b.insert("a".into(), AttributeDescriptor::new("NS::A"));

        let mut graph = CompletionGraph::default();
        graph.insert("NS::User".into(), user);
        graph.insert("NS::Node".into(), node);
        graph.insert("NS::A".into(), a);
        graph.insert("NS::B".into(), b);
        graph.insert("NS::Empty".into(), AttributeMap::default());
        (graph, vec![SmolStr::new("NS::User")])
    }

    #[test]
    fn test_placeholders_are_numbered_in_order() {
        let (graph, entity_types) = graph();
        let writer = SnippetWriter::new(&graph, &entity_types);
        let mut stack = vec![SmolStr::new("NS::User")];
        let snippet = writer.snippetify(&graph["NS::User"], 1, &mut stack, 1);
        let expected = r#"{
  "active": ${1|false,true|},
  "age": ${2:0},
  "address": {
    "street": "$3"
  },
  "ip": { "fn": "ip", "arg": "${4:127.0.0.1}" },
  "manager": { "type": "NS::User", "id": "$5" },
  "tags": [$6]
}"#;
        assert_eq!(snippet.value, expected);
        assert_eq!(snippet.tabstop, 7);
        assert_eq!(stack, vec![SmolStr::new("NS::User")]);
    }

    #[test]
    fn test_direct_self_reference_terminates() {
        let (graph, entity_types) = graph();
        let writer = SnippetWriter::new(&graph, &entity_types);
        let mut stack = vec![SmolStr::new("NS::Node")];
        let snippet = writer.snippetify(&graph["NS::Node"], 1, &mut stack, 1);
        assert_eq!(snippet.value, "{\n  \"label\": \"$1\",\n  \"next\": {}\n}");
    }

    #[test]
    fn test_indirect_cycle_terminates() {
        let (graph, entity_types) = graph();
        let writer = SnippetWriter::new(&graph, &entity_types);
        let mut stack = vec![SmolStr::new("NS::A")];
        let snippet = writer.snippetify(&graph["NS::A"], 1, &mut stack, 1);
        assert_eq!(snippet.value, "{\n  \"b\": {\n    \"a\": {}\n  }\n}");
        assert_eq!(snippet.tabstop, 1);
    }

    #[test]
    fn test_empty_shape() {
        let (graph, entity_types) = graph();
        let writer = SnippetWriter::new(&graph, &entity_types);
        let snippet = writer.snippetify(&graph["NS::Empty"], 4, &mut Vec::new(), 1);
        assert_eq!(snippet, Snippet { value: "{}".into(), tabstop: 4 });
    }

    #[test]
    fn test_entity_template() {
        let mut graph = CompletionGraph::default();
        let mut shape = AttributeMap::default();
        shape.insert("name".into(), AttributeDescriptor::new("String"));
        graph.insert("NS::Photo".into(), shape);
        let entity_types = vec![SmolStr::new("NS::Photo")];
        let writer = SnippetWriter::new(&graph, &entity_types);

        let expected = "{\n  \"uid\": { \"type\": \"NS::Photo\", \"id\": \"$1\" },\n  \"attrs\": {\n    \"name\": \"$2\"\n  },\n  \"parents\": [$3]\n}";
        assert_eq!(writer.entity("NS::Photo", &EntityNaming::CEDAR), expected);

        let avp = writer.entity("NS::Photo", &EntityNaming::AVP);
        assert!(avp.starts_with("{\n  \"identifier\": { \"entityType\": \"NS::Photo\", \"entityId\": \"$1\" },"));
        assert!(avp.contains("\"attributes\": {"));
    }
}
