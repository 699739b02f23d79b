//! Validation caching and the schema-to-dependents cascade.

mod common;

use std::sync::Arc;

use cedar_index::config::IndexConfig;
use cedar_index::project::SchemaLocator;
use cedar_index::{AnalysisHost, DocUri, DocumentHost, HostError, MemoryHost, Range, Severity};
use common::{ProbeOracle, SCHEMA, SCHEMA_URI, workspace};

const POLICY: &str = "permit (principal, action == NS::Action::\"view\", resource);\n";

#[tokio::test]
async fn test_schema_edit_revalidates_every_dependent() {
    let oracle = Arc::new(ProbeOracle::for_schema());
    let documents = workspace();
    let analysis = AnalysisHost::new(oracle.clone(), documents.clone());

    let dependents = [
        documents.set_text("file:///ws/a.cedar", POLICY),
        documents.set_text("file:///ws/b.cedar", POLICY),
        documents.set_text("file:///ws/app.cedarentities.json", "[]"),
    ];
    for doc in &dependents {
        assert_eq!(analysis.validate_document(doc.clone(), false).await, Some(true));
    }
    let schema_uri = DocUri::from(SCHEMA_URI);
    assert_eq!(analysis.dependents(&schema_uri).len(), 3);
    // one validation of the schema serves all three documents
    assert_eq!(oracle.schema_calls(), 1);
    let policy_before = analysis.policy_index(&dependents[0]);
    let entities_before = analysis.entities_index(&dependents[2]);

    documents.clear_diagnostics();
    let schema = documents.set_text(SCHEMA_URI, SCHEMA);
    assert!(analysis.validate_schema_document(&schema, false).await);
    for doc in &dependents {
        assert!(!analysis.has_cached_validity(&doc.uri), "{} kept a stale result", doc.uri);
    }

    analysis.wait_for_revalidation().await;
    for doc in &dependents {
        assert!(analysis.has_cached_validity(&doc.uri), "{} was not revalidated", doc.uri);
        assert!(documents.diagnostics(&doc.uri).is_some());
    }
    // dependents reuse the fresh schema result instead of cascading again
    assert_eq!(oracle.schema_calls(), 2);
    // parse entries were dropped even though the dependents did not change
    assert!(!Arc::ptr_eq(&policy_before, &analysis.policy_index(&dependents[0])));
    assert!(!Arc::ptr_eq(&entities_before, &analysis.entities_index(&dependents[2])));
}

#[tokio::test]
async fn test_cascade_survives_a_dependent_that_cannot_be_reopened() {
    let oracle = Arc::new(ProbeOracle::for_schema());
    let documents = workspace();
    let analysis = AnalysisHost::new(oracle, documents.clone());

    let dependents = [
        documents.set_text("file:///ws/a.cedar", POLICY),
        documents.set_text("file:///ws/gone.cedar", POLICY),
        documents.set_text("file:///ws/app.cedarentities.json", "[]"),
    ];
    for doc in &dependents {
        analysis.validate_document(doc.clone(), false).await;
    }
    let gone = dependents[1].uri.clone();
    documents.close(&gone);
    assert!(matches!(documents.open(&gone).await, Err(HostError::Io { .. })));

    let schema = documents.set_text(SCHEMA_URI, SCHEMA);
    assert!(analysis.validate_schema_document(&schema, false).await);
    analysis.wait_for_revalidation().await;

    assert!(analysis.has_cached_validity(&dependents[0].uri));
    assert!(analysis.has_cached_validity(&dependents[2].uri));
    assert!(!analysis.has_cached_validity(&gone));
    assert_eq!(
        analysis.dependents(&schema.uri),
        vec![dependents[0].uri.clone(), dependents[2].uri.clone()]
    );
}

#[tokio::test]
async fn test_failed_schema_does_not_cascade() {
    let oracle = Arc::new(ProbeOracle::for_schema());
    let documents = workspace();
    let analysis = AnalysisHost::new(oracle.clone(), documents.clone());
    let doc = documents.set_text("file:///ws/a.cedar", POLICY);
    analysis.validate_document(doc.clone(), false).await;

    oracle.set_schema_valid(false);
    let schema = documents.set_text(SCHEMA_URI, SCHEMA);
    assert!(!analysis.validate_schema_document(&schema, false).await);
    assert!(analysis.has_cached_validity(&doc.uri));

    let diagnostics = documents.diagnostics(&schema.uri).unwrap();
    assert!(diagnostics.iter().any(|d| d.severity == Severity::Error));
}

#[tokio::test]
async fn test_results_for_superseded_versions_are_dropped() {
    let oracle = Arc::new(ProbeOracle::for_schema());
    let documents = workspace();
    let analysis = AnalysisHost::new(oracle, documents.clone());

    let first = documents.set_text("file:///ws/a.cedar", POLICY);
    let second = documents.set_text("file:///ws/a.cedar", POLICY);
    assert_eq!(analysis.validate_document(first.clone(), true).await, Some(true));
    assert_eq!(analysis.cached_validity(&first), None);
    assert!(!analysis.has_cached_validity(&first.uri));

    analysis.validate_document(second.clone(), true).await;
    assert_eq!(analysis.cached_validity(&second), Some(true));
}

#[tokio::test]
async fn test_indexes_are_shared_per_version() {
    let oracle = Arc::new(ProbeOracle::for_schema());
    let documents = workspace();
    let analysis = AnalysisHost::new(oracle, documents.clone());

    let doc = documents.set_text("file:///ws/a.cedar", POLICY);
    let first = analysis.policy_index(&doc);
    assert!(Arc::ptr_eq(&first, &analysis.policy_index(&doc)));

    let edited = documents.set_text("file:///ws/a.cedar", POLICY);
    let reparsed = analysis.policy_index(&edited);
    assert!(!Arc::ptr_eq(&first, &reparsed));
    assert_eq!(first.policies.len(), reparsed.policies.len());
}

#[tokio::test]
async fn test_folder_schema_found_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("cedarschema.json"), SCHEMA).unwrap();
    let policy_path = dir.path().join("a.cedar");
    std::fs::write(&policy_path, POLICY).unwrap();

    let documents = Arc::new(MemoryHost::new().with_locator(SchemaLocator::new(IndexConfig::default())));
    let analysis = AnalysisHost::new(Arc::new(ProbeOracle::for_schema()), documents.clone());
    let doc = documents.open(&DocUri::from_file_path(&policy_path)).await.unwrap();

    assert_eq!(analysis.validate_document(doc.clone(), true).await, Some(true));
    let diagnostics = documents.diagnostics(&doc.uri).unwrap();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].severity, Severity::Info);
    assert_eq!(diagnostics[0].range, Range::default());
    assert_eq!(diagnostics[0].message, "Validated with folder Cedar schema: cedarschema.json");
}
