//! Validation orchestration and type narrowing.
//!
//! Validation results are cached per document version. A result is only
//! stored if the document is still at the version it was computed for when
//! the oracle returns; otherwise it is dropped. A schema that validates
//! successfully revalidates every document registered against it, each in
//! its own task.

use futures::FutureExt;
use futures::future::BoxFuture;
use smol_str::SmolStr;
use tracing::{debug, warn};

use super::analysis::{AnalysisHost, schema_source};
use crate::base::{DocUri, LineCol, LineIndex, Range};
use crate::hir::diagnostics::{entities_diagnostics, policy_diagnostics, schema_diagnostics, syntax_diagnostics};
use crate::hir::resolve::literal_type;
use crate::hir::{Diagnostic, Document, EntityTypes};
use crate::oracle::{DEFAULT_HEAD, ProbeScope, determine_all, policy_head};
use crate::syntax::Dialect;

impl AnalysisHost {
    /// Validate `doc` according to its dialect and publish its diagnostics.
    ///
    /// Returns the validity, or `None` when the document is not validated
    /// at all (non-`file` URIs, dialects without validation, oracle
    /// failures). `user_initiated` bypasses the validation cache.
    pub fn validate_document(&self, doc: Document, user_initiated: bool) -> BoxFuture<'static, Option<bool>> {
        let this = self.clone();
        async move {
            if !doc.uri.is_file() {
                return None;
            }
            match doc.dialect()? {
                Dialect::Policy => this.validate_policy_document(&doc, user_initiated).await,
                Dialect::SchemaJson | Dialect::SchemaHuman => {
                    Some(this.validate_schema_document(&doc, user_initiated).await)
                }
                Dialect::Entities => Some(this.validate_entities_document(&doc, user_initiated).await),
                _ => None,
            }
        }
        .boxed()
    }

    /// Syntax-check a policy document, then validate each policy against
    /// its schema. Validity reflects the syntax check only.
    pub async fn validate_policy_document(&self, doc: &Document, user_initiated: bool) -> Option<bool> {
        if !user_initiated {
            if let Some(valid) = self.cached_validity(doc) {
                return Some(valid);
            }
        }

        let syntax = match self.oracle.validate_syntax(&doc.text).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(uri = %doc.uri, error = %err, "syntax validation failed");
                return None;
            }
        };

        let mut diagnostics = Vec::new();
        if !syntax.errors.is_empty() {
            diagnostics = syntax_diagnostics(&syntax.errors, &LineIndex::new(&doc.text));
        } else if let Some((schema, location)) = self.open_schema(&doc.uri).await {
            diagnostics.extend(location.note().map(|note| Diagnostic::info(Range::default(), note)));
            if self.validate_schema_document(&schema, user_initiated).await {
                self.db.dependents.associate(&schema.uri, &doc.uri);
                if let Some(source) = schema_source(&schema) {
                    let index = self.policy_index(doc);
                    for policy in &index.policies {
                        match self.oracle.validate_policy(&source, &policy.text).await {
                            Ok(outcome) if !outcome.success => {
                                diagnostics.extend(policy_diagnostics(&outcome.errors, policy));
                            }
                            Ok(_) => {}
                            Err(err) => warn!(uri = %doc.uri, policy = %policy.id, error = %err, "policy validation failed"),
                        }
                    }
                }
            }
        }

        self.documents.publish_diagnostics(&doc.uri, diagnostics);
        self.store_validity(doc, syntax.success);
        Some(syntax.success)
    }

    /// Validate a schema document. On success, narrow its entity types
    /// under the probe head and revalidate its dependents.
    pub async fn validate_schema_document(&self, schema: &Document, user_initiated: bool) -> bool {
        if !user_initiated {
            if let Some(valid) = self.cached_validity(schema) {
                return valid;
            }
        }
        let Some(source) = schema_source(schema) else {
            return false;
        };

        let outcome = match self.oracle.validate_schema(&source).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(uri = %schema.uri, error = %err, "schema validation failed");
                return false;
            }
        };

        if outcome.success {
            self.documents.publish_diagnostics(&schema.uri, Vec::new());
            let types = determine_all(self.oracle.as_ref(), &source, &self.probe_head).await;
            self.db.schema_types.insert(schema.uri.clone(), schema.version, types);
        } else {
            let index = self.schema_index(schema).await;
            let diagnostics = schema_diagnostics(&outcome.errors, &LineIndex::new(&schema.text), &index.refs);
            self.documents.publish_diagnostics(&schema.uri, diagnostics);
        }

        self.store_validity(schema, outcome.success);
        if outcome.success {
            self.revalidate_dependents(&schema.uri);
        }
        outcome.success
    }

    /// Validate an entities document against its schema. Without a valid
    /// schema the document is invalid.
    pub async fn validate_entities_document(&self, doc: &Document, user_initiated: bool) -> bool {
        if !user_initiated {
            if let Some(valid) = self.cached_validity(doc) {
                return valid;
            }
        }

        let mut success = false;
        let mut diagnostics = Vec::new();
        if let Some((schema, location)) = self.open_schema(&doc.uri).await {
            diagnostics.extend(location.note().map(|note| Diagnostic::info(Range::default(), note)));
            if self.validate_schema_document(&schema, user_initiated).await {
                self.db.dependents.associate(&schema.uri, &doc.uri);
                if let Some(source) = schema_source(&schema) {
                    match self.oracle.validate_entities(&doc.text, &source).await {
                        Ok(outcome) => {
                            success = outcome.success;
                            let index = self.entities_index(doc);
                            diagnostics.extend(entities_diagnostics(
                                &outcome.errors,
                                &LineIndex::new(&doc.text),
                                &index,
                            ));
                        }
                        Err(err) => warn!(uri = %doc.uri, error = %err, "entities validation failed"),
                    }
                }
            }
        } else if user_initiated {
            warn!(uri = %doc.uri, "no schema file found or configured");
        }

        self.documents.publish_diagnostics(&doc.uri, diagnostics);
        self.store_validity(doc, success);
        success
    }

    /// Forget everything cached for the dependents of `schema` and
    /// revalidate each one in its own task. Returns the number of tasks
    /// spawned.
    ///
    /// Parse entries go too: policy records memoize narrowing results that
    /// were probed against the old schema. A dependent that can no longer
    /// be opened is dropped from the graph.
    pub fn revalidate_dependents(&self, schema: &DocUri) -> usize {
        let dependents = self.db.dependents.dependents(schema);
        for uri in &dependents {
            self.forget(uri);
        }
        let Some(runtime) = &self.runtime else {
            warn!(schema = %schema, "no runtime to revalidate dependents on");
            return 0;
        };
        for uri in &dependents {
            let this = self.clone();
            let schema = schema.clone();
            let uri = uri.clone();
            runtime.spawn(self.tasks.track_future(async move {
                match this.documents.open(&uri).await {
                    Ok(doc) => {
                        this.validate_document(doc, false).await;
                    }
                    Err(err) => {
                        warn!(uri = %uri, error = %err, "dependent could not be reopened");
                        this.db.dependents.dissociate(&schema, &uri);
                    }
                }
            }));
        }
        debug!(schema = %schema, count = dependents.len(), "revalidating dependents");
        dependents.len()
    }

    fn forget(&self, uri: &DocUri) {
        self.db.validity.remove(uri);
        self.db.policies.remove(uri);
        self.db.policy_json.remove(uri);
        self.db.entities.remove(uri);
    }

    fn store_validity(&self, doc: &Document, valid: bool) {
        if self.documents.current_version(&doc.uri) == Some(doc.version) {
            self.db.validity.insert(doc.uri.clone(), doc.version, valid);
        } else {
            debug!(uri = %doc.uri, version = doc.version.0, "discarding stale validation result");
        }
    }

    // ------------------------------------------------------------------------
    // Narrowing
    // ------------------------------------------------------------------------

    /// Types admissible in `scope` under `head` (default head when `None`).
    pub async fn determine_entity_types(&self, schema: &Document, scope: ProbeScope, head: Option<&str>) -> Vec<SmolStr> {
        let Some(source) = schema_source(schema) else {
            return Vec::new();
        };
        crate::oracle::determine_entity_types(self.oracle.as_ref(), &source, scope, head.unwrap_or(DEFAULT_HEAD)).await
    }

    /// Types admissible in the policy containing `pos`, probed with that
    /// policy's own head and memoized on the policy record. Outside any
    /// policy, the schema-level result.
    pub async fn fetch_entity_types(&self, schema: &Document, policy_doc: &Document, pos: LineCol) -> EntityTypes {
        let index = self.policy_index(policy_doc);
        let Some(policy) = index.policy_at(pos) else {
            return self.schema_entity_types(schema);
        };
        let Some(source) = schema_source(schema) else {
            return EntityTypes::default();
        };
        let head = policy_head(&policy.text).unwrap_or(DEFAULT_HEAD);
        policy
            .entity_types
            .get_or_init(|| determine_all(self.oracle.as_ref(), &source, head))
            .await
            .clone()
    }

    /// Candidate types for a scope variable or entity literal at `pos`.
    /// `context` narrows to actions; an entity literal to its own type.
    pub async fn narrow_entity_types(
        &self,
        schema: &Document,
        scope: &str,
        policy_doc: &Document,
        pos: LineCol,
    ) -> Vec<SmolStr> {
        match scope {
            "principal" | "resource" | "action" | "context" => {
                let types = self.fetch_entity_types(schema, policy_doc, pos).await;
                match scope {
                    "principal" => types.principals,
                    "resource" => types.resources,
                    _ => types.actions,
                }
            }
            literal => literal_type(literal)
                .or_else(|| literal.rfind("::").map(|split| &literal[..split]))
                .map(|ty| vec![SmolStr::new(ty)])
                .unwrap_or_default(),
        }
    }
}
