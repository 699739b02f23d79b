//! Foundation types for the indexing core.
//!
//! This module provides fundamental types used throughout the crate:
//! - [`DocUri`], [`DocVersion`] - Document identity and edit counter
//! - [`LineCol`], [`Range`] - Source positions and half-open ranges
//! - [`LineIndex`] - Byte offset to line/column conversion
//!
//! This module has NO dependencies on other modules of the crate.

mod span;
mod uri;

pub use span::{LineCol, LineIndex, Range, TextSize};
pub use uri::{DocUri, DocVersion};
