//! Records shared by the dialect indexes.

use std::sync::Arc;

use smol_str::SmolStr;
use tokio::sync::OnceCell;

use crate::base::{LineCol, Range};

/// A type or action name recognized in a document, with where it was seen.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferencedRange {
    /// Qualified type name (`NS::User`) or action literal (`NS::Action::"view"`).
    pub name: SmolStr,
    pub range: Range,
}

impl ReferencedRange {
    pub fn new(name: impl Into<SmolStr>, range: Range) -> Self {
        Self {
            name: name.into(),
            range,
        }
    }
}

/// Type and action references of one document, in source order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RefTable {
    pub referenced_types: Vec<ReferencedRange>,
    pub action_ids: Vec<ReferencedRange>,
}

impl RefTable {
    pub fn push_type(&mut self, name: impl Into<SmolStr>, range: Range) {
        self.referenced_types.push(ReferencedRange::new(name, range));
    }

    pub fn push_action(&mut self, name: impl Into<SmolStr>, range: Range) {
        self.action_ids.push(ReferencedRange::new(name, range));
    }

    /// Reference under `pos`, action ids first.
    pub fn at(&self, pos: LineCol) -> Option<&ReferencedRange> {
        self.action_ids
            .iter()
            .chain(self.referenced_types.iter())
            .find(|r| r.range.contains(pos))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReferencedRange> {
        self.referenced_types.iter().chain(self.action_ids.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.referenced_types.is_empty() && self.action_ids.is_empty()
    }
}

/// Entity types admissible in each policy-head slot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EntityTypes {
    pub principals: Vec<SmolStr>,
    pub resources: Vec<SmolStr>,
    /// Action literals, e.g. `NS::Action::"view"`.
    pub actions: Vec<SmolStr>,
}

impl EntityTypes {
    pub fn is_empty(&self) -> bool {
        self.principals.is_empty() && self.resources.is_empty() && self.actions.is_empty()
    }
}

/// One policy statement of a policy-text document.
#[derive(Debug)]
pub struct PolicyRecord {
    /// From `@id("...")`, else `policy<N>`.
    pub id: SmolStr,
    /// Whole statement. Starts where its first code begins, which is past
    /// column 0 only when it follows another statement on the same line.
    pub range: Range,
    /// The `permit`/`forbid` keyword.
    pub effect_range: Range,
    /// Source text covered by `range`.
    pub text: Arc<str>,
    /// Narrowing result, computed at most once per record.
    pub entity_types: OnceCell<EntityTypes>,
}

impl PolicyRecord {
    pub fn new(id: impl Into<SmolStr>, range: Range, effect_range: Range, text: impl Into<Arc<str>>) -> Self {
        Self {
            id: id.into(),
            range,
            effect_range,
            text: text.into(),
            entity_types: OnceCell::new(),
        }
    }

    /// First source line of the statement; oracle offsets inside
    /// [`PolicyRecord::text`] are relative to it.
    pub fn start_line(&self) -> u32 {
        self.range.start.line
    }
}

/// `Type::"id"`, the canonical spelling of an entity uid.
pub fn format_uid(entity_type: &str, id: &str) -> SmolStr {
    smol_str::format_smolstr!("{entity_type}::\"{id}\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ref_table_prefers_actions() {
        let mut table = RefTable::default();
        table.push_type("NS::Action", Range::on_line(0, 0, 10));
        table.push_action(r#"NS::Action::"view""#, Range::on_line(0, 4, 14));
        let hit = table.at(LineCol::new(0, 6)).unwrap();
        assert_eq!(hit.name, r#"NS::Action::"view""#);
    }

    #[test]
    fn test_format_uid() {
        assert_eq!(format_uid("NS::User", "alice"), r#"NS::User::"alice""#);
    }

    #[tokio::test]
    async fn test_entity_types_computed_once() {
        let record = PolicyRecord::new("policy0", Range::default(), Range::default(), "");
        let first = record
            .entity_types
            .get_or_init(|| async {
                EntityTypes {
                    principals: vec!["NS::User".into()],
                    ..EntityTypes::default()
                }
            })
            .await;
        assert_eq!(first.principals.len(), 1);
        let second = record
            .entity_types
            .get_or_init(|| async { EntityTypes::default() })
            .await;
        assert_eq!(second.principals.len(), 1);
    }
}
