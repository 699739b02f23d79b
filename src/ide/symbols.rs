//! Document symbols: outline entries for policies, entities and schema
//! declarations.

use smol_str::SmolStr;

use super::analysis::DocumentIndex;
use crate::base::Range;
use crate::hir::{EntitiesIndex, PolicyIndex, SchemaCollection, SchemaIndex};

/// Symbol kinds, numbered as LSP numbers them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymbolKind {
    Class = 5,
    Function = 12,
    Object = 19,
    Array = 18,
    Struct = 23,
    Event = 24,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SymbolInfo {
    pub name: SmolStr,
    pub detail: Option<SmolStr>,
    pub kind: SymbolKind,
    /// The whole construct.
    pub range: Range,
    /// The part revealed when the symbol is selected.
    pub selection_range: Range,
    pub children: Vec<SymbolInfo>,
}

impl SymbolInfo {
    fn new(name: impl Into<SmolStr>, kind: SymbolKind, range: Range, selection_range: Range) -> Self {
        Self {
            name: name.into(),
            detail: None,
            kind,
            range,
            selection_range,
            children: Vec::new(),
        }
    }
}

pub fn document_symbols(index: &DocumentIndex) -> Vec<SymbolInfo> {
    match index {
        DocumentIndex::Policy(index) => policy_symbols(index),
        DocumentIndex::Entities(index) => entity_symbols(index),
        DocumentIndex::Schema(index) => schema_symbols(index),
        _ => Vec::new(),
    }
}

fn policy_symbols(index: &PolicyIndex) -> Vec<SymbolInfo> {
    index
        .policies
        .iter()
        .map(|policy| SymbolInfo::new(policy.id.clone(), SymbolKind::Function, policy.range, policy.effect_range))
        .collect()
}

/// One symbol per entity; `attrs` and `parents` children only when the
/// entity has a non-empty block for them.
fn entity_symbols(index: &EntitiesIndex) -> Vec<SymbolInfo> {
    index
        .entities
        .iter()
        .map(|entity| {
            let mut symbol = SymbolInfo::new(entity.uid.clone(), SymbolKind::Object, entity.range, entity.uid_key_range);
            if let (Some(range), Some(key)) = (entity.attrs_range, entity.attrs_key_range) {
                symbol.children.push(SymbolInfo::new("attrs", SymbolKind::Object, range, key));
            }
            if let (Some(range), Some(key)) = (entity.parents_range, entity.parents_key_range) {
                symbol.children.push(SymbolInfo::new("parents", SymbolKind::Array, range, key));
            }
            symbol
        })
        .collect()
}

fn schema_symbols(index: &SchemaIndex) -> Vec<SymbolInfo> {
    index
        .records
        .iter()
        .map(|record| {
            let kind = match record.collection {
                SchemaCollection::CommonTypes => SymbolKind::Struct,
                SchemaCollection::EntityTypes => SymbolKind::Class,
                SchemaCollection::Actions => SymbolKind::Event,
            };
            SymbolInfo {
                detail: Some(SmolStr::new_static(record.collection.as_str())),
                ..SymbolInfo::new(record.etype.clone(), kind, record.range, record.etype_range)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hir::{parse_entities, parse_policies, parse_schema_json};
    use crate::syntax::EntityNaming;
    use std::sync::Arc;

    #[test]
    fn test_policy_symbols() {
        let index = parse_policies("@id(\"admins\")\npermit (principal, action, resource);\n");
        let symbols = document_symbols(&DocumentIndex::Policy(Arc::new(index)));
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].name, "admins");
        assert_eq!(symbols[0].selection_range, Range::on_line(1, 0, 6));
    }

    #[test]
    fn test_entity_children_only_when_present() {
        let text = r#"[
  {"uid": {"type": "User", "id": "alice"}, "attrs": {"age": 3}, "parents": []},
  {"uid": {"type": "User", "id": "bob"}, "attrs": {}, "parents": [{"type": "Group", "id": "g"}]}
]"#;
        let index = parse_entities(text, EntityNaming::CEDAR);
        let symbols = document_symbols(&DocumentIndex::Entities(Arc::new(index)));
        assert_eq!(symbols.len(), 2);
        assert_eq!(symbols[0].name, r#"User::"alice""#);
        let first: Vec<_> = symbols[0].children.iter().map(|c| c.name.as_str()).collect();
        let second: Vec<_> = symbols[1].children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(first, vec!["attrs"]);
        assert_eq!(second, vec!["parents"]);
    }

    #[test]
    fn test_schema_symbols_use_name_ranges() {
        let text = r#"{"NS": {"entityTypes": {"User": {}}, "actions": {"view": {}}}}"#;
        let index = parse_schema_json(text);
        let symbols = document_symbols(&DocumentIndex::Schema(Arc::new(index)));
        let names: Vec<_> = symbols.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["NS::User", r#"NS::Action::"view""#]);
        assert_eq!(symbols[0].kind, SymbolKind::Class);
        assert_eq!(symbols[0].selection_range, Range::on_line(0, 25, 4));
        assert_eq!(symbols[1].detail.as_deref(), Some("actions"));
    }
}
