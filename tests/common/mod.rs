//! Shared fixtures for the integration tests.
//!
//! [`ProbeOracle`] answers narrowing probes the way the real validator
//! words them, from a table of admissible types per policy head. Every
//! other policy validates cleanly.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use cedar_index::oracle::{SyntaxOutcome, ValidationOutcome};
use cedar_index::{MemoryHost, OracleError, SchemaSource, ValidationOracle};
use parking_lot::Mutex;

pub const SCHEMA_URI: &str = "file:///ws/cedarschema.json";

pub const SCHEMA: &str = r#"{
  "NS": {
    "commonTypes": {
      "Address": {
        "type": "Record",
        "attributes": {
          "city": { "type": "String" },
          "previous": { "type": "Address" }
        }
      }
    },
    "entityTypes": {
      "User": {
        "memberOfTypes": ["Group"],
        "shape": {
          "type": "Record",
          "attributes": {
            "name": { "type": "String" },
            "home": { "type": "Address" },
            "tags": { "type": "Set", "element": { "type": "String" } }
          }
        }
      },
      "Group": {},
      "Photo": {
        "shape": {
          "type": "Record",
          "attributes": { "owner": { "type": "Entity", "name": "User" } }
        }
      }
    },
    "actions": {
      "view": { "appliesTo": { "principalTypes": ["User"], "resourceTypes": ["Photo"] } },
      "join": { "appliesTo": { "principalTypes": ["User", "Group"], "resourceTypes": ["Group"] } }
    }
  }
}"#;

/// Admissible types under one head.
#[derive(Clone, Default)]
struct Answer {
    principals: Vec<String>,
    resources: Vec<String>,
    actions: Vec<String>,
}

#[derive(Default)]
pub struct ProbeOracle {
    /// `(head fragment, answer)`; the first fragment the probe contains
    /// wins, the empty fragment matches every probe.
    answers: Mutex<Vec<(String, Answer)>>,
    schema_invalid: AtomicBool,
    pub schema_calls: AtomicUsize,
    pub policies_seen: Mutex<Vec<String>>,
}

impl ProbeOracle {
    /// Answers matching [`SCHEMA`]: `view` admits users on photos, `join`
    /// users and groups on groups.
    pub fn for_schema() -> Self {
        Self::default()
            .answer(
                "action == NS::Action::\"view\"",
                &["NS::User"],
                &["NS::Photo"],
                &["NS::Action::\"view\""],
            )
            .answer(
                "action == NS::Action::\"join\"",
                &["NS::Group", "NS::User"],
                &["NS::Group"],
                &["NS::Action::\"join\""],
            )
            .answer(
                "",
                &["NS::User", "NS::Group"],
                &["NS::Photo", "NS::Group"],
                &["NS::Action::\"view\"", "NS::Action::\"join\""],
            )
    }

    pub fn answer(mut self, head: &str, principals: &[&str], resources: &[&str], actions: &[&str]) -> Self {
        self.answers.get_mut().push(entry(head, principals, resources, actions));
        self
    }

    /// Answer `head` differently from now on, as if the schema changed.
    pub fn set_answer(&self, head: &str, principals: &[&str], resources: &[&str], actions: &[&str]) {
        self.answers.lock().insert(0, entry(head, principals, resources, actions));
    }

    pub fn set_schema_valid(&self, valid: bool) {
        self.schema_invalid.store(!valid, Ordering::SeqCst);
    }

    pub fn schema_calls(&self) -> usize {
        self.schema_calls.load(Ordering::SeqCst)
    }

    fn probe_errors(&self, policy: &str) -> Option<Vec<String>> {
        let answers = self.answers.lock();
        let (_, answer) = answers.iter().find(|(head, _)| policy.contains(head.as_str()))?;
        let unexpected = |names: &[String]| {
            names
                .iter()
                .map(|n| {
                    format!(r#"Unexpected type. Expected {{"type":"Boolean"}} but saw {{"type":"Entity","name":"{n}"}}"#)
                })
                .collect()
        };
        if policy.ends_with("when { principal };") {
            Some(unexpected(&answer.principals))
        } else if policy.ends_with("when { resource };") {
            Some(unexpected(&answer.resources))
        } else if policy.ends_with("when { context.__vscode__ };") {
            Some(
                answer
                    .actions
                    .iter()
                    .map(|a| format!("attribute `__vscode__` in context for {a} not found"))
                    .collect(),
            )
        } else {
            None
        }
    }
}

fn entry(head: &str, principals: &[&str], resources: &[&str], actions: &[&str]) -> (String, Answer) {
    let owned = |names: &[&str]| names.iter().map(|n| (*n).to_owned()).collect();
    (
        head.to_owned(),
        Answer {
            principals: owned(principals),
            resources: owned(resources),
            actions: owned(actions),
        },
    )
}

#[async_trait]
impl ValidationOracle for ProbeOracle {
    async fn validate_syntax(&self, _text: &str) -> Result<SyntaxOutcome, OracleError> {
        Ok(SyntaxOutcome {
            success: true,
            ..SyntaxOutcome::default()
        })
    }

    async fn validate_schema(&self, _schema: &SchemaSource) -> Result<ValidationOutcome, OracleError> {
        self.schema_calls.fetch_add(1, Ordering::SeqCst);
        if self.schema_invalid.load(Ordering::SeqCst) {
            return Ok(ValidationOutcome::failed(["Undeclared entity types: {\"NS::Nope\"}"]));
        }
        Ok(ValidationOutcome::ok())
    }

    async fn validate_policy(&self, _schema: &SchemaSource, policy: &str) -> Result<ValidationOutcome, OracleError> {
        self.policies_seen.lock().push(policy.to_owned());
        Ok(match self.probe_errors(policy) {
            Some(errors) => ValidationOutcome::failed(errors),
            None => ValidationOutcome::ok(),
        })
    }

    async fn validate_entities(&self, _entities: &str, _schema: &SchemaSource) -> Result<ValidationOutcome, OracleError> {
        Ok(ValidationOutcome::ok())
    }

    async fn translate_schema_to_json(&self, _text: &str) -> Result<Option<String>, OracleError> {
        Ok(Some(SCHEMA.to_owned()))
    }
}

/// A host with [`SCHEMA`] open and configured as every document's schema.
pub fn workspace() -> Arc<MemoryHost> {
    let documents = Arc::new(MemoryHost::new().with_schema(SCHEMA_URI));
    documents.set_text(SCHEMA_URI, SCHEMA);
    documents
}
