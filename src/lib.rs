//! # cedar-index
//!
//! Incremental document indexing for Cedar policies and their JSON sibling
//! formats: schemas (JSON and human-readable), entities, template links and
//! authorization requests.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! ide     → AnalysisHost, validation, tokens, symbols, hover, completion
//!   ↓
//! oracle  → Validation oracle trait, message classification, narrowing
//!   ↓
//! hir     → Dialect indexes, schema graph, chains, snippets, caches
//!   ↓
//! syntax  → Streaming JSON walker, entity-reference scanner, dialects
//!   ↓
//! base    → Primitives (LineCol, Range, LineIndex, DocUri)
//! ```
//!
//! `project` finds schema files for a document and `config` holds the
//! settings that steer it.

/// Foundation types: positions, ranges, document URIs
pub mod base;

/// Lexing layer shared by the dialect parsers
pub mod syntax;

/// Dialect indexes and everything derived from them
pub mod hir;

/// The external validator and what can be learned from it
pub mod oracle;

/// IDE features: validation, navigation, hover, completion
pub mod ide;

pub mod config;
pub mod error;
pub mod project;

pub use base::{DocUri, DocVersion, LineCol, LineIndex, Range};
pub use config::IndexConfig;
pub use error::{ConfigError, HostError, OracleError};
pub use hir::{Diagnostic, Document, Severity};
pub use ide::{AnalysisHost, DocumentHost, MemoryHost};
pub use oracle::{SchemaSource, ValidationOracle};
pub use syntax::Dialect;
