//! Dialect indexes and the structures derived from them.
//!
//! Each dialect parser turns one document into a record set: ranges for
//! navigation, a [`RefTable`] of type and action references, and semantic
//! tokens. Parsers never fail; malformed input just yields fewer records.
//!
//! ```text
//! policy.rs          policy text      -> PolicyIndex
//! policy_json.rs     *.cedar.json     -> JsonPolicyIndex
//! schema/            schema (both)    -> SchemaIndex + CompletionGraph
//! entities.rs        entities         -> EntitiesIndex
//! template_links.rs  template links   -> TemplateLinksIndex
//! auth.rs            auth request     -> AuthIndex
//! ```

mod json_refs;

pub mod auth;
pub mod cache;
pub mod chain;
pub mod diagnostics;
pub mod entities;
pub mod policy;
pub mod policy_json;
pub mod records;
pub mod resolve;
pub mod schema;
pub mod snippet;
pub mod source;
pub mod template_links;
pub mod tokens;

pub use auth::{AuthIndex, AuthRequestRecord, parse_auth_request};
pub use cache::{DependencyGraph, VersionCache};
pub use chain::{ChainTarget, split_property_chain, trailing_property_chain, traverse_property_chain};
pub use diagnostics::{Diagnostic, Severity};
pub use entities::{EntitiesIndex, EntityRecord, parse_entities};
pub use policy::{PolicyIndex, parse_policies};
pub use policy_json::{JsonPolicyIndex, JsonPolicyRecord, parse_policy_json};
pub use records::{EntityTypes, PolicyRecord, RefTable, ReferencedRange};
pub use schema::{
    AttributeDescriptor, AttributeMap, CompletionGraph, SchemaCollection, SchemaFormat, SchemaIndex, SchemaRecord,
    parse_schema_human, parse_schema_json,
};
pub use snippet::{Snippet, SnippetWriter};
pub use source::{Document, DocumentStore};
pub use template_links::{SlotBinding, TemplateLinkRecord, TemplateLinksIndex, parse_template_links};
pub use tokens::{SemanticToken, TokenModifiers, TokenType};
