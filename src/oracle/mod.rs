//! The validation oracle: an external validator the index consults but
//! never introspects.
//!
//! The oracle is a black box behind [`ValidationOracle`]. Everything the
//! index learns from it arrives as prose error messages, which
//! [`messages`] turns into structured values and [`probe`] mines for
//! type narrowing.

pub mod messages;
pub mod probe;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::OracleError;
use crate::hir::schema::SchemaFormat;

pub use messages::{OracleMessage, UndeclaredKind, UnrecognizedKind, classify};
pub use probe::{DEFAULT_HEAD, ProbeScope, determine_all, determine_entity_types, policy_head};

/// A syntax error with its byte span in the checked text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    pub offset: usize,
    pub length: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyntaxOutcome {
    pub success: bool,
    /// Policy texts as the oracle split them, when it reports them.
    pub policies: Vec<String>,
    pub errors: Vec<SyntaxError>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub success: bool,
    pub errors: Vec<String>,
}

impl ValidationOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            errors: Vec::new(),
        }
    }

    pub fn failed(errors: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            success: false,
            errors: errors.into_iter().map(Into::into).collect(),
        }
    }
}

/// Schema text handed to the oracle along with its dialect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchemaSource {
    pub text: Arc<str>,
    pub format: SchemaFormat,
}

impl SchemaSource {
    pub fn new(text: impl Into<Arc<str>>, format: SchemaFormat) -> Self {
        Self {
            text: text.into(),
            format,
        }
    }
}

#[async_trait]
pub trait ValidationOracle: Send + Sync {
    async fn validate_syntax(&self, text: &str) -> Result<SyntaxOutcome, OracleError>;

    async fn validate_schema(&self, schema: &SchemaSource) -> Result<ValidationOutcome, OracleError>;

    /// Validate one policy's text against a schema.
    async fn validate_policy(&self, schema: &SchemaSource, policy: &str) -> Result<ValidationOutcome, OracleError>;

    async fn validate_entities(&self, entities: &str, schema: &SchemaSource) -> Result<ValidationOutcome, OracleError>;

    /// Translate a human-readable schema into its JSON form. `Ok(None)` when
    /// the text does not translate.
    async fn translate_schema_to_json(&self, text: &str) -> Result<Option<String>, OracleError>;
}
