//! JSON-form schema indexer.

use smol_str::SmolStr;

use super::graph::GraphBuilder;
use super::{SchemaCollection, SchemaFormat, SchemaIndex, SchemaRecord};
use crate::base::Range;
use crate::hir::records::RefTable;
use crate::hir::resolve::{action_literal, is_extension, is_primitive, member_of_literal, normalize_builtin, qualify};
use crate::hir::tokens::{SemanticToken, TokenModifiers, TokenType};
use crate::syntax::json::{JsonLiteral, JsonPath, JsonSpan, JsonVisitor, walk};

/// Type keywords that never name a declared type.
fn is_type_keyword(name: &str) -> bool {
    matches!(
        normalize_builtin(name),
        "Record" | "Set" | "Entity" | "EntityOrCommon" | "Extension"
    ) || is_primitive(normalize_builtin(name))
}

/// `type`/`name`/`id` literals of one object.
#[derive(Default)]
struct ObjectFields {
    type_field: Option<(SmolStr, Range)>,
    name_field: Option<(SmolStr, Range)>,
    id_field: Option<(SmolStr, Range)>,
}

struct SchemaJsonVisitor {
    records: Vec<SchemaRecord>,
    refs: RefTable,
    tokens: Vec<SemanticToken>,
    graph: GraphBuilder,
    declaration: Option<(SchemaCollection, SmolStr, JsonSpan)>,
    objects: Vec<ObjectFields>,
}

impl SchemaJsonVisitor {
    fn token(&mut self, span: JsonSpan, token_type: TokenType, modifiers: TokenModifiers) {
        self.tokens.push(SemanticToken::new(span.range(), token_type, modifiers));
    }

    fn close_object(&mut self, fields: ObjectFields, path: &JsonPath) {
        let ns = path.key(0).unwrap_or_default();
        if path.len() == 5 && path.key(1) == Some("actions") && path.key(3) == Some("memberOf") {
            if let Some((id, range)) = fields.id_field {
                let ty = fields.type_field.as_ref().map(|(ty, _)| ty.as_str());
                self.refs.push_action(member_of_literal(ns, ty, &id), range);
            }
            return;
        }
        match (&fields.type_field, fields.name_field) {
            (Some((ty, _)), Some((name, range)))
                if matches!(normalize_builtin(ty), "Entity" | "EntityOrCommon") =>
            {
                let name = normalize_builtin(&name);
                if !is_primitive(name) && !is_extension(name) {
                    self.refs.push_type(qualify(ns, name), range);
                }
            }
            (Some((ty, range)), _) if !is_type_keyword(ty) => {
                self.refs.push_type(qualify(ns, ty), *range);
            }
            _ => {}
        }
    }
}

impl JsonVisitor for SchemaJsonVisitor {
    fn on_object_begin(&mut self, _span: JsonSpan, path: &JsonPath) {
        self.objects.push(ObjectFields::default());
        self.graph.object_begin(path);
    }

    fn on_object_end(&mut self, span: JsonSpan, path: &JsonPath) {
        self.graph.object_end(path);
        if let Some(fields) = self.objects.pop() {
            self.close_object(fields, path);
        }
        if path.len() == 3 {
            if let Some((collection, etype, key)) = self.declaration.take() {
                self.records.push(SchemaRecord {
                    collection,
                    etype,
                    range: Range::new(key.start, span.end()),
                    etype_range: key.trimmed(),
                });
            }
        }
    }

    fn on_object_property(&mut self, key: &str, span: JsonSpan, path: &JsonPath) {
        let len = path.len();
        if len == 0 {
            self.token(span, TokenType::Namespace, TokenModifiers::DECLARATION);
            return;
        }
        if len == 2 {
            let ns = path.key(0).unwrap_or_default();
            let declared = match path.key(1) {
                Some("commonTypes") => Some((SchemaCollection::CommonTypes, qualify(ns, key))),
                Some("entityTypes") => Some((SchemaCollection::EntityTypes, qualify(ns, key))),
                Some("actions") => Some((SchemaCollection::Actions, action_literal(ns, key))),
                _ => None,
            };
            if let Some((collection, etype)) = declared {
                self.declaration = Some((collection, etype, span));
                self.token(span, TokenType::Type, TokenModifiers::DECLARATION);
                return;
            }
        }
        if path.last_key() == Some("attributes") {
            self.token(span, TokenType::Property, TokenModifiers::DECLARATION);
        }
    }

    fn on_literal_value(&mut self, value: &JsonLiteral<'_>, span: JsonSpan, path: &JsonPath) {
        self.graph.literal(path, value);
        let Some(text) = value.as_str() else {
            return;
        };
        let len = path.len();
        let ns = path.key(0).unwrap_or_default();

        if len == 5 && path.key(1) == Some("entityTypes") && path.key(3) == Some("memberOfTypes") {
            self.refs.push_type(qualify(ns, text), span.trimmed());
            self.token(span, TokenType::Type, TokenModifiers::NONE);
            return;
        }
        if len == 6
            && path.key(1) == Some("actions")
            && matches!(path.key(4), Some("principalTypes" | "resourceTypes"))
        {
            self.refs.push_type(qualify(ns, text), span.trimmed());
            self.token(span, TokenType::Type, TokenModifiers::NONE);
            return;
        }
        if len == 6
            && path.key(1) == Some("actions")
            && path.key(3) == Some("memberOf")
            && matches!(path.key(5), Some("id" | "type"))
        {
            self.token(span, TokenType::Type, TokenModifiers::NONE);
        } else if path.last_key() == Some("name") {
            let token_type = if is_extension(text) {
                TokenType::Function
            } else {
                TokenType::Type
            };
            self.token(span, token_type, TokenModifiers::NONE);
        }

        let Some(fields) = self.objects.last_mut() else {
            return;
        };
        let entry = Some((SmolStr::new(text), span.trimmed()));
        match path.last_key() {
            Some("type") => fields.type_field = entry,
            Some("name") => fields.name_field = entry,
            Some("id") => fields.id_field = entry,
            _ => {}
        }
    }
}

/// Index a JSON-form schema, including its completion graph.
pub fn parse_schema_json(text: &str) -> SchemaIndex {
    let mut visitor = SchemaJsonVisitor {
        records: Vec::new(),
        refs: RefTable::default(),
        tokens: Vec::new(),
        graph: GraphBuilder::default(),
        declaration: None,
        objects: Vec::new(),
    };
    walk(text, &mut visitor);
    let declared: Vec<SmolStr> = visitor.records.iter().map(|r| r.etype.clone()).collect();
    SchemaIndex {
        format: SchemaFormat::Json,
        completions: visitor.graph.finish(declared),
        records: visitor.records,
        refs: visitor.refs,
        tokens: visitor.tokens,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::LineCol;

    const SCHEMA: &str = r#"{
  "NS": {
    "entityTypes": {
      "User": {
        "memberOfTypes": ["Group"],
        "shape": {
          "type": "Record",
          "attributes": {
            "manager": { "type": "Entity", "name": "User" },
            "home": { "type": "Addr" }
          }
        }
      },
      "Group": {}
    },
    "commonTypes": {
      "Addr": { "type": "Record", "attributes": {} }
    },
    "actions": {
      "view": {
        "memberOf": [{ "id": "read" }],
        "appliesTo": { "principalTypes": ["User"], "resourceTypes": ["Other::Photo"] }
      },
      "read": {}
    }
  }
}"#;

    #[test]
    fn test_records_are_qualified() {
        let index = parse_schema_json(SCHEMA);
        let etypes: Vec<_> = index.records.iter().map(|r| r.etype.as_str()).collect();
        assert_eq!(
            etypes,
            vec!["NS::User", "NS::Group", "NS::Addr", r#"NS::Action::"view""#, r#"NS::Action::"read""#]
        );
        let user = index.definition("NS::User").unwrap();
        assert_eq!(user.collection, SchemaCollection::EntityTypes);
        assert_eq!(user.etype_range, Range::on_line(3, 7, 4));
        assert_eq!(user.range, Range::new(LineCol::new(3, 6), LineCol::new(12, 7)));
        assert_eq!(index.definition("NS::Group").map(|r| r.range.start), Some(LineCol::new(13, 6)));
    }

    #[test]
    fn test_member_of_types_resolve_in_namespace() {
        let index = parse_schema_json(SCHEMA);
        assert_eq!(index.refs.referenced_types[0].name, "NS::Group");
        assert_eq!(index.refs.referenced_types[0].range, Range::on_line(4, 27, 5));
    }

    #[test]
    fn test_reference_table() {
        let index = parse_schema_json(SCHEMA);
        let types: Vec<_> = index.refs.referenced_types.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(types, vec!["NS::Group", "NS::User", "NS::Addr", "NS::User", "Other::Photo"]);
        assert_eq!(index.refs.action_ids[0].name, r#"NS::Action::"read""#);
    }

    #[test]
    fn test_graph_has_declared_entries() {
        let index = parse_schema_json(SCHEMA);
        assert!(index.completions.contains_key("NS::Group"));
        assert!(index.completions.contains_key(r#"NS::Action::"read""#));
        assert_eq!(index.completions["NS::User"]["home"].description, "NS::Addr");
    }

    #[test]
    fn test_declaration_tokens() {
        let index = parse_schema_json(SCHEMA);
        let first = &index.tokens[0];
        assert_eq!(first.token_type, TokenType::Namespace);
        assert!(first.modifiers.contains(TokenModifiers::DECLARATION));
        assert!(index.tokens.iter().any(|t| t.token_type == TokenType::Property));
    }

    #[test]
    fn test_empty_namespace() {
        let index = parse_schema_json(r#"{"": {"entityTypes": {"User": {}}, "actions": {"a": {}}}}"#);
        let etypes: Vec<_> = index.records.iter().map(|r| r.etype.as_str()).collect();
        assert_eq!(etypes, vec!["User", r#"Action::"a""#]);
    }
}
