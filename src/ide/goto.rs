//! Go-to-definition: from a type or action reference in any dialect to
//! its declaration in the schema.

use smol_str::SmolStr;

use super::analysis::{AnalysisHost, DocumentIndex};
use crate::base::{DocUri, LineCol, Range};
use crate::hir::{Document, RefTable, SchemaIndex, SchemaRecord};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GotoTarget {
    pub uri: DocUri,
    /// The declared name, not the whole declaration.
    pub range: Range,
    pub name: SmolStr,
}

/// The schema record declaring the reference under `pos`.
pub fn find_definition<'s>(refs: &RefTable, pos: LineCol, schema: &'s SchemaIndex) -> Option<&'s SchemaRecord> {
    let reference = refs.at(pos)?;
    schema.definition(&reference.name)
}

impl AnalysisHost {
    /// Definition of the reference under `pos`. References inside a schema
    /// resolve against that schema; all other dialects use the schema the
    /// document validates against.
    pub async fn goto_definition(&self, doc: &Document, pos: LineCol) -> Option<GotoTarget> {
        let index = self.index(doc).await?;
        let (schema_uri, schema) = match &index {
            DocumentIndex::Schema(schema) => (doc.uri.clone(), schema.clone()),
            _ => {
                let (schema_doc, _) = self.open_schema(&doc.uri).await?;
                let schema = self.schema_index(&schema_doc).await;
                (schema_doc.uri, schema)
            }
        };
        let record = find_definition(index.refs(), pos, &schema)?;
        Some(GotoTarget {
            uri: schema_uri,
            range: record.etype_range,
            name: record.etype.clone(),
        })
    }
}
