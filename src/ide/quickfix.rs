//! Quick fixes: replacement edits for diagnostics that carry a code.
//!
//! Only two diagnostics are fixable. An unrecognized entity type or action
//! id is replaced by the name the oracle suggested, and an undeclared
//! common type that differs from a primitive only in case is replaced by
//! that primitive. Both edits cover exactly the diagnostic's range.

use crate::hir::Diagnostic;
use crate::hir::diagnostics::codes;
use crate::oracle::messages::{self, OracleMessage};

use super::completion::TextEdit;

/// Type names a schema may use without declaring them.
const PRIMITIVE_TYPES: &[&str] = &["String", "Long", "Boolean", "Record", "Set", "Entity", "Extension"];

const UNDECLARED_COMMON_TYPE: &str = "Undeclared common type: ";

/// A single-edit fix for one diagnostic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuickFix {
    pub title: String,
    pub edit: TextEdit,
    /// Whether the editor may apply the fix without asking.
    pub preferred: bool,
    /// Whether the document should be validated again once applied;
    /// schema fixes revalidate the schema and so every dependent.
    pub revalidates_schema: bool,
}

impl QuickFix {
    fn replace(diagnostic: &Diagnostic, replacement: &str, revalidates_schema: bool) -> Self {
        Self {
            title: format!("Replace with {replacement}"),
            edit: TextEdit {
                range: diagnostic.range,
                new_text: replacement.to_owned(),
            },
            preferred: true,
            revalidates_schema,
        }
    }
}

/// The fix for `diagnostic`, if its code has one.
pub fn quick_fix(diagnostic: &Diagnostic) -> Option<QuickFix> {
    match diagnostic.code.as_deref()? {
        codes::UNRECOGNIZED => match messages::unrecognized(&diagnostic.message)? {
            OracleMessage::Unrecognized { suggestion, .. } => Some(QuickFix::replace(diagnostic, &suggestion, false)),
            _ => None,
        },
        codes::UNDECLARED => {
            let name = diagnostic.message.strip_prefix(UNDECLARED_COMMON_TYPE)?;
            let primitive = primitive_for(name)?;
            Some(QuickFix::replace(diagnostic, primitive, true))
        }
        _ => None,
    }
}

/// Fixes for every fixable diagnostic in `diagnostics`, in order.
pub fn quick_fixes(diagnostics: &[Diagnostic]) -> Vec<QuickFix> {
    diagnostics.iter().filter_map(quick_fix).collect()
}

/// The primitive `name` misspells by case. References are stored
/// qualified, so only the last path segment is compared.
fn primitive_for(name: &str) -> Option<&'static str> {
    let unqualified = name.rsplit("::").next().unwrap_or(name);
    PRIMITIVE_TYPES
        .iter()
        .copied()
        .find(|primitive| primitive.eq_ignore_ascii_case(unqualified))
}
