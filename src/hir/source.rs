//! Open documents and their versions.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::base::{DocUri, DocVersion};
use crate::syntax::Dialect;

/// A snapshot of one document at one version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    pub uri: DocUri,
    pub version: DocVersion,
    pub text: Arc<str>,
}

impl Document {
    pub fn new(uri: impl Into<DocUri>, version: DocVersion, text: impl Into<Arc<str>>) -> Self {
        Self {
            uri: uri.into(),
            version,
            text: text.into(),
        }
    }

    pub fn dialect(&self) -> Option<Dialect> {
        Dialect::detect(&self.uri)
    }

    /// Text of line `line` without its terminator.
    pub fn line(&self, line: u32) -> Option<&str> {
        self.text
            .split('\n')
            .nth(line as usize)
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
    }
}

/// In-memory document contents keyed by URI.
///
/// Every edit bumps the stored version, so caches keyed on
/// (uri, version) see it as a new document.
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: RwLock<IndexMap<DocUri, Document>>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `text` for `uri`, returning the new snapshot. The version
    /// starts at 1 and increases on every call, even if the text is
    /// unchanged.
    pub fn set_text(&self, uri: impl Into<DocUri>, text: impl Into<Arc<str>>) -> Document {
        let uri = uri.into();
        let mut documents = self.documents.write();
        let version = documents
            .get(&uri)
            .map_or(DocVersion::new(1), |doc| doc.version.next());
        let document = Document::new(uri.clone(), version, text);
        documents.insert(uri, document.clone());
        document
    }

    pub fn get(&self, uri: &DocUri) -> Option<Document> {
        self.documents.read().get(uri).cloned()
    }

    pub fn version(&self, uri: &DocUri) -> Option<DocVersion> {
        self.documents.read().get(uri).map(|doc| doc.version)
    }

    pub fn remove(&self, uri: &DocUri) -> Option<Document> {
        self.documents.write().shift_remove(uri)
    }

    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All URIs in insertion order.
    pub fn uris(&self) -> Vec<DocUri> {
        self.documents.read().keys().cloned().collect()
    }
}
