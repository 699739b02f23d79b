//! Scripted oracle for the IDE unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::OracleError;
use crate::oracle::{SchemaSource, SyntaxError, SyntaxOutcome, ValidationOracle, ValidationOutcome};

#[derive(Default)]
pub(crate) struct FakeOracle {
    syntax_errors: Vec<SyntaxError>,
    schema_errors: Vec<String>,
    /// Errors reported for every policy containing the key.
    policy_errors: Vec<(String, Vec<String>)>,
    entities_errors: Vec<String>,
    translation: Option<String>,
    pub policies_seen: Mutex<Vec<String>>,
    pub schema_calls: AtomicUsize,
}

impl FakeOracle {
    pub fn with_syntax_error(mut self, message: &str, offset: usize, length: usize) -> Self {
        self.syntax_errors.push(SyntaxError {
            message: message.to_owned(),
            offset,
            length,
        });
        self
    }

    pub fn with_schema_error(mut self, message: &str) -> Self {
        self.schema_errors.push(message.to_owned());
        self
    }

    pub fn with_policy_errors(mut self, key: &str, errors: &[&str]) -> Self {
        self.policy_errors
            .push((key.to_owned(), errors.iter().map(|e| (*e).to_owned()).collect()));
        self
    }

    pub fn with_entities_error(mut self, message: &str) -> Self {
        self.entities_errors.push(message.to_owned());
        self
    }

    pub fn with_translation(mut self, json: &str) -> Self {
        self.translation = Some(json.to_owned());
        self
    }

    pub fn schema_calls(&self) -> usize {
        self.schema_calls.load(Ordering::SeqCst)
    }

    fn outcome(errors: &[String]) -> ValidationOutcome {
        if errors.is_empty() {
            ValidationOutcome::ok()
        } else {
            ValidationOutcome::failed(errors.iter().cloned())
        }
    }
}

#[async_trait]
impl ValidationOracle for FakeOracle {
    async fn validate_syntax(&self, _text: &str) -> Result<SyntaxOutcome, OracleError> {
        Ok(SyntaxOutcome {
            success: self.syntax_errors.is_empty(),
            policies: Vec::new(),
            errors: self.syntax_errors.clone(),
        })
    }

    async fn validate_schema(&self, _schema: &SchemaSource) -> Result<ValidationOutcome, OracleError> {
        self.schema_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Self::outcome(&self.schema_errors))
    }

    async fn validate_policy(&self, _schema: &SchemaSource, policy: &str) -> Result<ValidationOutcome, OracleError> {
        self.policies_seen.lock().push(policy.to_owned());
        let errors: Vec<String> = self
            .policy_errors
            .iter()
            .filter(|(key, _)| policy.contains(key.as_str()))
            .flat_map(|(_, errors)| errors.iter().cloned())
            .collect();
        Ok(Self::outcome(&errors))
    }

    async fn validate_entities(&self, _entities: &str, _schema: &SchemaSource) -> Result<ValidationOutcome, OracleError> {
        Ok(Self::outcome(&self.entities_errors))
    }

    async fn translate_schema_to_json(&self, _text: &str) -> Result<Option<String>, OracleError> {
        Ok(self.translation.clone())
    }
}
