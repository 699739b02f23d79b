//! Schema indexes for both schema dialects.
//!
//! The JSON form is indexed in one walk that also builds the
//! [`CompletionGraph`]. The human-readable form is scanned line by line for
//! declarations only; its graph is attached afterwards with
//! [`SchemaIndex::with_completions`] from the JSON translation of the text.

pub mod graph;
mod human;
mod json;

pub use graph::{AttributeDescriptor, AttributeMap, CompletionGraph};
pub use human::parse_schema_human;
pub use json::parse_schema_json;

use smol_str::SmolStr;

use super::records::RefTable;
use super::tokens::SemanticToken;
use crate::base::Range;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SchemaFormat {
    Json,
    Human,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SchemaCollection {
    CommonTypes,
    EntityTypes,
    Actions,
}

impl SchemaCollection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CommonTypes => "commonTypes",
            Self::EntityTypes => "entityTypes",
            Self::Actions => "actions",
        }
    }
}

/// One declared common type, entity type or action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchemaRecord {
    pub collection: SchemaCollection,
    /// Qualified name; actions use `Ns::Action::"id"`.
    pub etype: SmolStr,
    /// The whole declaration.
    pub range: Range,
    /// Just the declared name.
    pub etype_range: Range,
}

#[derive(Debug)]
pub struct SchemaIndex {
    pub format: SchemaFormat,
    pub records: Vec<SchemaRecord>,
    pub refs: RefTable,
    pub completions: CompletionGraph,
    pub tokens: Vec<SemanticToken>,
}

impl SchemaIndex {
    pub fn with_completions(mut self, completions: CompletionGraph) -> Self {
        self.completions = completions;
        self
    }

    /// The declaration of a qualified type or action literal.
    pub fn definition(&self, name: &str) -> Option<&SchemaRecord> {
        self.records.iter().find(|r| r.etype == name)
    }

    pub fn records_in(&self, collection: SchemaCollection) -> impl Iterator<Item = &SchemaRecord> {
        self.records.iter().filter(move |r| r.collection == collection)
    }

    pub fn entity_types(&self) -> impl Iterator<Item = &SmolStr> {
        self.records_in(SchemaCollection::EntityTypes).map(|r| &r.etype)
    }

    pub fn actions(&self) -> impl Iterator<Item = &SmolStr> {
        self.records_in(SchemaCollection::Actions).map(|r| &r.etype)
    }
}
