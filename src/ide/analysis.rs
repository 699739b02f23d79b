//! AnalysisHost: the per-process state behind every IDE request.
//!
//! The host owns one [`VersionCache`] per dialect, the validation cache,
//! the schema-level narrowing cache and the schema dependency graph. It is
//! cheap to clone; clones share all state, which is how revalidation tasks
//! spawned for dependent documents reach the same caches.
//!
//! Documents come from a [`DocumentHost`], the editor side of the
//! integration. [`MemoryHost`] keeps them in a [`DocumentStore`].

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::runtime::Handle;
use tokio_util::task::TaskTracker;
use tracing::{trace, warn};

use crate::base::{DocUri, DocVersion};
use crate::error::HostError;
use crate::hir::{
    AuthIndex, DependencyGraph, Diagnostic, Document, DocumentStore, EntitiesIndex, EntityTypes, JsonPolicyIndex,
    PolicyIndex, RefTable, SchemaFormat, SchemaIndex, SemanticToken, TemplateLinksIndex, VersionCache,
    parse_auth_request, parse_entities, parse_policies, parse_policy_json, parse_schema_human, parse_schema_json,
    parse_template_links,
};
use crate::oracle::{DEFAULT_HEAD, SchemaSource, ValidationOracle};
use crate::project::{SchemaLocation, SchemaLocator, SchemaOrigin};
use crate::syntax::{Dialect, EntityNaming};

// ============================================================================
// DOCUMENT HOST
// ============================================================================

/// The editor side: document contents, schema lookup and diagnostics sink.
#[async_trait]
pub trait DocumentHost: Send + Sync {
    /// Open `uri`, reading it if it is not already open.
    async fn open(&self, uri: &DocUri) -> Result<Document, HostError>;

    /// Version of the open document, `None` once it is closed.
    fn current_version(&self, uri: &DocUri) -> Option<DocVersion>;

    /// The schema `uri` validates against.
    fn schema_for(&self, uri: &DocUri) -> Option<SchemaLocation>;

    /// Replace the diagnostics shown for `uri`.
    fn publish_diagnostics(&self, uri: &DocUri, diagnostics: Vec<Diagnostic>);
}

/// A [`DocumentHost`] over in-memory documents, falling back to disk for
/// `file://` URIs that were never set.
#[derive(Debug, Default)]
pub struct MemoryHost {
    documents: DocumentStore,
    locator: SchemaLocator,
    schema: Option<DocUri>,
    published: Mutex<FxHashMap<DocUri, Vec<Diagnostic>>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_locator(mut self, locator: SchemaLocator) -> Self {
        self.locator = locator;
        self
    }

    /// Validate every document against `schema` instead of locating one.
    pub fn with_schema(mut self, schema: impl Into<DocUri>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn set_text(&self, uri: impl Into<DocUri>, text: &str) -> Document {
        self.documents.set_text(uri, text)
    }

    pub fn close(&self, uri: &DocUri) -> Option<Document> {
        self.documents.remove(uri)
    }

    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    /// Last published diagnostics for `uri`.
    pub fn diagnostics(&self, uri: &DocUri) -> Option<Vec<Diagnostic>> {
        self.published.lock().get(uri).cloned()
    }

    pub fn clear_diagnostics(&self) {
        self.published.lock().clear();
    }
}

#[async_trait]
impl DocumentHost for MemoryHost {
    async fn open(&self, uri: &DocUri) -> Result<Document, HostError> {
        if let Some(document) = self.documents.get(uri) {
            return Ok(document);
        }
        let path = uri.to_file_path().ok_or_else(|| HostError::NotFound(uri.clone()))?;
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| HostError::Io { path, source })?;
        Ok(self.documents.set_text(uri.clone(), text))
    }

    fn current_version(&self, uri: &DocUri) -> Option<DocVersion> {
        self.documents.version(uri)
    }

    fn schema_for(&self, uri: &DocUri) -> Option<SchemaLocation> {
        match &self.schema {
            Some(schema) => Some(SchemaLocation {
                uri: schema.clone(),
                origin: SchemaOrigin::Configured,
            }),
            None => self.locator.locate(uri),
        }
    }

    fn publish_diagnostics(&self, uri: &DocUri, diagnostics: Vec<Diagnostic>) {
        self.published.lock().insert(uri.clone(), diagnostics);
    }
}

// ============================================================================
// DOCUMENT INDEX
// ============================================================================

/// The cached index of one document, whatever its dialect.
#[derive(Clone, Debug)]
pub enum DocumentIndex {
    Policy(Arc<PolicyIndex>),
    PolicyJson(Arc<JsonPolicyIndex>),
    Schema(Arc<SchemaIndex>),
    Entities(Arc<EntitiesIndex>),
    TemplateLinks(Arc<TemplateLinksIndex>),
    AuthRequest(Arc<AuthIndex>),
}

impl DocumentIndex {
    pub fn refs(&self) -> &RefTable {
        match self {
            DocumentIndex::Policy(index) => &index.refs,
            DocumentIndex::PolicyJson(index) => &index.refs,
            DocumentIndex::Schema(index) => &index.refs,
            DocumentIndex::Entities(index) => &index.refs,
            DocumentIndex::TemplateLinks(index) => &index.refs,
            DocumentIndex::AuthRequest(index) => &index.refs,
        }
    }

    /// Semantic tokens, for the dialects that produce them.
    pub fn tokens(&self) -> &[SemanticToken] {
        match self {
            DocumentIndex::Policy(index) => &index.tokens,
            DocumentIndex::Schema(index) => &index.tokens,
            DocumentIndex::Entities(index) => &index.tokens,
            _ => &[],
        }
    }
}

// ============================================================================
// ANALYSIS HOST
// ============================================================================

#[derive(Default)]
pub(crate) struct IndexDb {
    pub(crate) policies: VersionCache<PolicyIndex>,
    pub(crate) policy_json: VersionCache<JsonPolicyIndex>,
    pub(crate) schemas: VersionCache<SchemaIndex>,
    pub(crate) entities: VersionCache<EntitiesIndex>,
    pub(crate) template_links: VersionCache<TemplateLinksIndex>,
    pub(crate) auth: VersionCache<AuthIndex>,
    /// Outcome of the last validation, per document version.
    pub(crate) validity: VersionCache<bool>,
    /// Narrowing result of each valid schema under the default head.
    pub(crate) schema_types: VersionCache<EntityTypes>,
    pub(crate) dependents: DependencyGraph,
}

#[derive(Clone)]
pub struct AnalysisHost {
    pub(crate) oracle: Arc<dyn ValidationOracle>,
    pub(crate) documents: Arc<dyn DocumentHost>,
    pub(crate) db: Arc<IndexDb>,
    pub(crate) tasks: TaskTracker,
    /// Runtime revalidation tasks are spawned on, `None` when the host was
    /// built outside one and none was supplied.
    pub(crate) runtime: Option<Handle>,
    pub(crate) probe_head: Arc<str>,
}

impl AnalysisHost {
    /// Create a host. Revalidation tasks run on the Tokio runtime current at
    /// this call; use [`AnalysisHost::with_runtime`] when building the host
    /// elsewhere. Without a runtime, schema edits still invalidate their
    /// dependents but nothing is revalidated until the next request.
    pub fn new(oracle: Arc<dyn ValidationOracle>, documents: Arc<dyn DocumentHost>) -> Self {
        Self {
            oracle,
            documents,
            db: Arc::new(IndexDb::default()),
            tasks: TaskTracker::new(),
            runtime: Handle::try_current().ok(),
            probe_head: Arc::from(DEFAULT_HEAD),
        }
    }

    /// Spawn revalidation tasks on `runtime`.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Head used for schema-level narrowing probes.
    pub fn with_probe_head(mut self, head: impl Into<Arc<str>>) -> Self {
        self.probe_head = head.into();
        self
    }

    pub fn oracle(&self) -> &Arc<dyn ValidationOracle> {
        &self.oracle
    }

    pub fn documents(&self) -> &Arc<dyn DocumentHost> {
        &self.documents
    }

    // ------------------------------------------------------------------------
    // Per-dialect indexes
    // ------------------------------------------------------------------------

    pub fn policy_index(&self, doc: &Document) -> Arc<PolicyIndex> {
        self.db
            .policies
            .get_or_insert_with(&doc.uri, doc.version, || parse_policies(&doc.text))
    }

    pub fn policy_json_index(&self, doc: &Document) -> Arc<JsonPolicyIndex> {
        self.db
            .policy_json
            .get_or_insert_with(&doc.uri, doc.version, || parse_policy_json(&doc.text))
    }

    pub fn entities_index(&self, doc: &Document) -> Arc<EntitiesIndex> {
        let naming = EntityNaming::for_uri(&doc.uri);
        self.db
            .entities
            .get_or_insert_with(&doc.uri, doc.version, || parse_entities(&doc.text, naming))
    }

    pub fn template_links_index(&self, doc: &Document) -> Arc<TemplateLinksIndex> {
        self.db
            .template_links
            .get_or_insert_with(&doc.uri, doc.version, || parse_template_links(&doc.text))
    }

    pub fn auth_index(&self, doc: &Document) -> Arc<AuthIndex> {
        self.db
            .auth
            .get_or_insert_with(&doc.uri, doc.version, || parse_auth_request(&doc.text))
    }

    /// Schema index of either schema dialect. A human-readable schema gets
    /// its completion graph from the oracle's JSON translation.
    pub async fn schema_index(&self, doc: &Document) -> Arc<SchemaIndex> {
        if let Some(index) = self.db.schemas.get(&doc.uri, doc.version) {
            trace!(uri = %doc.uri, version = doc.version.0, "cache hit");
            return index;
        }
        trace!(uri = %doc.uri, version = doc.version.0, "reparse");
        let index = match doc.dialect() {
            Some(Dialect::SchemaHuman) => {
                let index = parse_schema_human(&doc.text);
                match self.oracle.translate_schema_to_json(&doc.text).await {
                    Ok(Some(json)) => index.with_completions(parse_schema_json(&json).completions),
                    Ok(None) => index,
                    Err(err) => {
                        warn!(uri = %doc.uri, error = %err, "schema translation failed");
                        index
                    }
                }
            }
            _ => parse_schema_json(&doc.text),
        };
        // A concurrent caller may have stored this version already.
        if let Some(existing) = self.db.schemas.get(&doc.uri, doc.version) {
            return existing;
        }
        self.db.schemas.insert(doc.uri.clone(), doc.version, index)
    }

    /// The index for `doc`, by dialect. `None` for unknown file names.
    pub async fn index(&self, doc: &Document) -> Option<DocumentIndex> {
        let index = match doc.dialect()? {
            Dialect::Policy => DocumentIndex::Policy(self.policy_index(doc)),
            Dialect::PolicyJson => DocumentIndex::PolicyJson(self.policy_json_index(doc)),
            Dialect::SchemaJson | Dialect::SchemaHuman => DocumentIndex::Schema(self.schema_index(doc).await),
            Dialect::Entities => DocumentIndex::Entities(self.entities_index(doc)),
            Dialect::TemplateLinks => DocumentIndex::TemplateLinks(self.template_links_index(doc)),
            Dialect::AuthRequest => DocumentIndex::AuthRequest(self.auth_index(doc)),
        };
        Some(index)
    }

    // ------------------------------------------------------------------------
    // Schemas
    // ------------------------------------------------------------------------

    /// Open the schema `doc` validates against.
    pub async fn open_schema(&self, doc: &DocUri) -> Option<(Document, SchemaLocation)> {
        let location = self.documents.schema_for(doc)?;
        match self.documents.open(&location.uri).await {
            Ok(schema) if schema.dialect().is_some_and(Dialect::is_schema) => Some((schema, location)),
            Ok(schema) => {
                warn!(uri = %schema.uri, "configured schema is not a schema file");
                None
            }
            Err(err) => {
                warn!(uri = %location.uri, error = %err, "schema could not be opened");
                None
            }
        }
    }

    /// Schema-level narrowing result stored by the last successful
    /// validation of `schema` at its current version.
    pub fn schema_entity_types(&self, schema: &Document) -> EntityTypes {
        self.db
            .schema_types
            .get(&schema.uri, schema.version)
            .map(|types| (*types).clone())
            .unwrap_or_default()
    }

    /// Documents registered as validated against `schema`.
    pub fn dependents(&self, schema: &DocUri) -> Vec<DocUri> {
        self.db.dependents.dependents(schema)
    }

    // ------------------------------------------------------------------------
    // Validation cache
    // ------------------------------------------------------------------------

    /// Validity recorded for `doc` at its version.
    pub fn cached_validity(&self, doc: &Document) -> Option<bool> {
        self.db.validity.get(&doc.uri, doc.version).map(|valid| *valid)
    }

    pub fn has_cached_validity(&self, uri: &DocUri) -> bool {
        self.db.validity.contains(uri)
    }

    /// Drop every cache and dependency edge.
    pub fn clear(&self) {
        let db = &self.db;
        db.policies.clear();
        db.policy_json.clear();
        db.schemas.clear();
        db.entities.clear();
        db.template_links.clear();
        db.auth.clear();
        db.validity.clear();
        db.schema_types.clear();
        db.dependents.clear();
    }

    /// Wait for every revalidation task spawned so far.
    pub async fn wait_for_revalidation(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }
}

pub(crate) fn schema_source(schema: &Document) -> Option<SchemaSource> {
    let format = match schema.dialect()? {
        Dialect::SchemaJson => SchemaFormat::Json,
        Dialect::SchemaHuman => SchemaFormat::Human,
        _ => return None,
    };
    Some(SchemaSource::new(Arc::clone(&schema.text), format))
}
