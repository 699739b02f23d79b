//! IDE features: high-level APIs for editor handlers.
//!
//! This module sits between the dialect indexes (HIR) and whatever editor
//! protocol drives the crate. Each entry point corresponds to one editor
//! request.
//!
//! ## Design Principles
//!
//! 1. **Plain data out**: results are our own types, converted at the
//!    protocol boundary
//! 2. **Snapshot in**: every request takes a [`Document`](crate::hir::Document)
//!    at one version; caches are keyed on that version
//! 3. **Degrade, don't fail**: oracle or host failures yield empty results
//!
//! ## Usage
//!
//! ```ignore
//! use cedar_index::ide::{AnalysisHost, MemoryHost};
//!
//! let documents = Arc::new(MemoryHost::new());
//! let host = AnalysisHost::new(oracle, documents.clone());
//! let doc = documents.set_text("file:///ws/policy.cedar", "permit (principal, action, resource);");
//!
//! host.validate_document(doc.clone(), true).await;
//! let symbols = document_symbols(&host.index(&doc).await.unwrap());
//! ```

mod analysis;
mod completion;
mod folding;
mod goto;
mod help;
mod hover;
mod quickfix;
mod semantic_tokens;
mod symbols;
mod validate;

#[cfg(test)]
mod testing;

pub use analysis::{AnalysisHost, DocumentHost, DocumentIndex, MemoryHost};
pub use completion::{CompletionItem, CompletionKind, CompletionTrigger, TextEdit};
pub use folding::{FoldingKind, FoldingRange, folding_ranges};
pub use goto::{GotoTarget, find_definition};
pub use help::{FUNCTION_HELP, FunctionHelp, function_help};
pub use hover::HoverResult;
pub use quickfix::{QuickFix, quick_fix, quick_fixes};
pub use semantic_tokens::{LEGEND, Legend, encode, semantic_tokens};
pub use symbols::{SymbolInfo, SymbolKind, document_symbols};
