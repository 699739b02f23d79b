//! Lexical layer shared by every dialect indexer.
//!
//! Nothing here builds a tree: the JSON walker streams events and the
//! entity-reference scanner works on plain text.

pub mod dialect;
pub mod entity_ref;
pub mod json;

pub use dialect::{Dialect, EntityNaming};
pub use entity_ref::{EntityRef, is_action_type};
pub use json::{JsonLiteral, JsonPath, JsonSpan, JsonVisitor, PathSegment, walk};
