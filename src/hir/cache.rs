//! Version-gated per-document caches and the schema dependency graph.

use std::sync::Arc;

use indexmap::IndexSet;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::base::{DocUri, DocVersion};

/// Memoizes one value per document, valid only for the version it was
/// computed at.
///
/// Locks are held only for the lookup or the insert, never while the value
/// is being computed.
#[derive(Debug)]
pub struct VersionCache<T> {
    entries: RwLock<FxHashMap<DocUri, (DocVersion, Arc<T>)>>,
}

impl<T> Default for VersionCache<T> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(FxHashMap::default()),
        }
    }
}

impl<T> VersionCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached value if it was computed at `version`.
    pub fn get(&self, uri: &DocUri, version: DocVersion) -> Option<Arc<T>> {
        self.entries
            .read()
            .get(uri)
            .filter(|(cached, _)| *cached == version)
            .map(|(_, value)| Arc::clone(value))
    }

    /// The cached value whatever its version.
    pub fn latest(&self, uri: &DocUri) -> Option<(DocVersion, Arc<T>)> {
        self.entries.read().get(uri).cloned()
    }

    pub fn insert(&self, uri: DocUri, version: DocVersion, value: T) -> Arc<T> {
        let value = Arc::new(value);
        self.entries.write().insert(uri, (version, Arc::clone(&value)));
        value
    }

    /// Return the value cached at `version`, computing and storing it on a
    /// miss.
    pub fn get_or_insert_with(&self, uri: &DocUri, version: DocVersion, compute: impl FnOnce() -> T) -> Arc<T> {
        if let Some(value) = self.get(uri, version) {
            trace!(uri = %uri, version = version.0, "cache hit");
            return value;
        }
        trace!(uri = %uri, version = version.0, "reparse");
        let value = Arc::new(compute());

        let mut entries = self.entries.write();
        // Another caller may have stored the same version meanwhile.
        if let Some((cached, existing)) = entries.get(uri) {
            if *cached == version {
                return Arc::clone(existing);
            }
        }
        entries.insert(uri.clone(), (version, Arc::clone(&value)));
        value
    }

    pub fn remove(&self, uri: &DocUri) -> Option<Arc<T>> {
        self.entries.write().remove(uri).map(|(_, value)| value)
    }

    pub fn contains(&self, uri: &DocUri) -> bool {
        self.entries.read().contains_key(uri)
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Schema document to the documents validated against it.
///
/// Edges are added on validation and removed when the cascade can no
/// longer reopen a dependent.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    edges: RwLock<FxHashMap<DocUri, IndexSet<DocUri>>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `dependent` was validated against `schema`. Returns
    /// `true` if the edge is new.
    pub fn associate(&self, schema: &DocUri, dependent: &DocUri) -> bool {
        {
            let edges = self.edges.read();
            if edges.get(schema).is_some_and(|set| set.contains(dependent)) {
                return false;
            }
        }
        self.edges
            .write()
            .entry(schema.clone())
            .or_default()
            .insert(dependent.clone())
    }

    /// Remove the edge from `schema` to `dependent`. Returns `true` if it
    /// existed.
    pub fn dissociate(&self, schema: &DocUri, dependent: &DocUri) -> bool {
        self.edges
            .write()
            .get_mut(schema)
            .is_some_and(|set| set.shift_remove(dependent))
    }

    /// Dependents of `schema` in registration order.
    pub fn dependents(&self, schema: &DocUri) -> Vec<DocUri> {
        self.edges
            .read()
            .get(schema)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        self.edges.write().clear();
    }
}
