//! Diagnostics: oracle messages placed back onto source ranges.
//!
//! The oracle reports positions as prose (`found at 12:15`, `at offset
//! 44-53`, ...) or not at all. These helpers recover a range from the
//! message, or from the index records when the message only names an
//! identifier.

use smol_str::SmolStr;

use super::entities::EntitiesIndex;
use super::records::{PolicyRecord, RefTable};
use crate::base::{LineCol, LineIndex, Range, TextSize};
use crate::oracle::SyntaxError;
use crate::oracle::messages::{self, OracleMessage, UndeclaredKind, UnrecognizedKind};

// ============================================================================
// DIAGNOSTIC TYPES
// ============================================================================

/// Diagnostic source shown by editors.
pub const SOURCE: &str = "Cedar";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Info,
}

impl Severity {
    /// Convert to LSP severity number.
    pub fn to_lsp(self) -> u32 {
        match self {
            Severity::Error => 1,
            Severity::Info => 3,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub range: Range,
    pub severity: Severity,
    pub code: Option<SmolStr>,
    pub message: String,
    pub source: &'static str,
}

impl Diagnostic {
    pub fn error(range: Range, message: impl Into<String>) -> Self {
        Self {
            range,
            severity: Severity::Error,
            code: None,
            message: message.into(),
            source: SOURCE,
        }
    }

    pub fn info(range: Range, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            ..Self::error(range, message)
        }
    }

    pub fn with_code(mut self, code: impl Into<SmolStr>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// Diagnostic codes attached to placeable errors.
pub mod codes {
    pub const UNRECOGNIZED: &str = "unrecognized";
    pub const UNDECLARED: &str = "undeclared";
}

// ============================================================================
// RANGE RECOVERY
// ============================================================================

/// Range named by a positional message (`found at a:b` or `at line L
/// column C`), else the start of the document.
pub fn document_error_range(message: &str, line_index: &LineIndex) -> Range {
    match messages::found_at(message).or_else(|| messages::at_line(message)) {
        Some(OracleMessage::FoundAt { start, end }) => Range::new(
            line_index.line_col(TextSize::from(start as u32)),
            line_index.line_col(TextSize::from(end as u32)),
        ),
        Some(OracleMessage::AtLine { line, column }) => Range::empty(LineCol::from_one_indexed(line, column)),
        _ => Range::default(),
    }
}

/// Translate a position inside `policy.text` to a document position.
fn policy_position(policy: &PolicyRecord, local: LineCol) -> LineCol {
    let start = policy.range.start;
    if local.line == 0 {
        LineCol::new(start.line, start.col + local.col)
    } else {
        LineCol::new(start.line + local.line, local.col)
    }
}

/// Range of an `at offset a-b` message relative to `policy`, else the
/// policy's effect keyword.
pub fn policy_error_range(message: &str, policy: &PolicyRecord) -> Range {
    let Some(OracleMessage::PolicyOffset { start, end }) = messages::policy_offset(message) else {
        return policy.effect_range;
    };
    let index = LineIndex::new(&policy.text);
    let start = index.line_col(TextSize::from(start as u32));
    let end = index.line_col(TextSize::from(end as u32));
    Range::new(policy_position(policy, start), policy_position(policy, end))
}

/// First occurrence of an unrecognized name inside the policy. Type names
/// must be followed by `::` so a prefix of a longer path does not match;
/// action literals end in `"` and need no suffix.
fn unrecognized_range(policy: &PolicyRecord, name: &str) -> Option<Range> {
    let needle = if name.ends_with('"') {
        name.to_owned()
    } else {
        format!("{name}::")
    };
    policy.text.split('\n').enumerate().find_map(|(line, text)| {
        let col = text.find(&needle)?;
        let start = policy_position(policy, LineCol::new(line as u32, col as u32));
        Some(Range::new(start, LineCol::new(start.line, start.col + name.len() as u32)))
    })
}

// ============================================================================
// PER-DIALECT MAPPING
// ============================================================================

/// Diagnostics for structured syntax errors of a policy document.
pub fn syntax_diagnostics(errors: &[SyntaxError], line_index: &LineIndex) -> Vec<Diagnostic> {
    errors
        .iter()
        .map(|error| {
            let range = if error.length > 0 {
                line_index.range(error.offset, error.length)
            } else {
                document_error_range(&error.message, line_index)
            };
            Diagnostic::error(range, error.message.clone())
        })
        .collect()
}

/// Diagnostics for errors the oracle reported about one policy.
pub fn policy_diagnostics(errors: &[String], policy: &PolicyRecord) -> Vec<Diagnostic> {
    errors
        .iter()
        .map(|error| {
            let message = messages::strip_prefix(error, messages::POLICY_PREFIX);
            let placed = match messages::unrecognized(message) {
                Some(OracleMessage::Unrecognized { name, .. }) => unrecognized_range(policy, &name),
                _ => None,
            };
            match placed {
                Some(range) => Diagnostic::error(range, message).with_code(codes::UNRECOGNIZED),
                None => Diagnostic::error(policy_error_range(error, policy), message),
            }
        })
        .collect()
}

fn names_match(reference: &str, listed: &str) -> bool {
    reference == listed
        || (!listed.contains("::")
            && reference
                .strip_suffix(listed)
                .is_some_and(|prefix| prefix.ends_with("::")))
}

/// One diagnostic per reference named in an `Undeclared ...` message.
fn undeclared_diagnostics(kind: UndeclaredKind, names: &[SmolStr], refs: &RefTable, out: &mut Vec<Diagnostic>) {
    let (table, label) = match kind {
        UndeclaredKind::EntityTypes => (&refs.referenced_types, "entity type"),
        UndeclaredKind::CommonTypes => (&refs.referenced_types, "common type"),
        UndeclaredKind::Actions => (&refs.action_ids, "action"),
    };
    for reference in table {
        if names.iter().any(|listed| names_match(&reference.name, listed)) {
            let diagnostic = Diagnostic::error(reference.range, format!("Undeclared {label}: {}", reference.name));
            out.push(match kind {
                UndeclaredKind::CommonTypes => diagnostic.with_code(codes::UNDECLARED),
                _ => diagnostic,
            });
        }
    }
}

/// Diagnostics for a schema document that failed validation.
pub fn schema_diagnostics(errors: &[String], line_index: &LineIndex, refs: &RefTable) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    for error in errors {
        let message = messages::strip_prefix(error, messages::SCHEMA_PARSE_PREFIX);
        if let Some(OracleMessage::Undeclared { kind, names }) = messages::undeclared(message) {
            undeclared_diagnostics(kind, &names, refs, &mut out);
        }
        out.push(Diagnostic::error(document_error_range(message, line_index), message));
    }
    out
}

/// Ranges inside an entities document for an entity message, one per
/// entity carrying the uid.
fn entity_message_ranges(message: &OracleMessage, entities: &EntitiesIndex) -> Vec<Range> {
    let Some(uid) = message.entity_uid() else {
        return Vec::new();
    };
    entities
        .entities
        .iter()
        .filter(|entity| entity.uid == *uid)
        .map(|entity| match message {
            OracleMessage::UndeclaredEntityType { .. } => entity.type_or_uid_range(),
            OracleMessage::ParentNotAllowed { .. } => entity.parents_or_uid_range(),
            OracleMessage::AttributeMismatch { attribute, .. }
            | OracleMessage::UnexpectedAttribute { attribute, .. }
            | OracleMessage::MissingAttribute {
                attribute: Some(attribute),
                ..
            } => entity.attr_range(attribute),
            _ => entity.attr_range(""),
        })
        .collect()
}

/// Diagnostics for an entities document that failed validation.
pub fn entities_diagnostics(
    errors: &[String],
    line_index: &LineIndex,
    entities: &EntitiesIndex,
) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    for error in errors {
        if error.starts_with(messages::ENTITIES_PREFIX) {
            let message = messages::strip_prefix(error, messages::ENTITIES_PREFIX);
            if let Some(classified) = messages::classify_entity(message) {
                out.extend(
                    entity_message_ranges(&classified, entities)
                        .into_iter()
                        .map(|range| Diagnostic::error(range, message)),
                );
                continue;
            }
        }
        if let Some(OracleMessage::Undeclared { kind, names }) = messages::undeclared(error) {
            undeclared_diagnostics(kind, &names, &entities.refs, &mut out);
        }
        out.push(Diagnostic::error(document_error_range(error, line_index), error.as_str()));
    }
    out
}

/// Whether the unrecognized name is an action (for quick fixes).
pub fn is_unrecognized_action(message: &str) -> bool {
    matches!(
        messages::unrecognized(message),
        Some(OracleMessage::Unrecognized {
            kind: UnrecognizedKind::ActionId,
            ..
        })
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hir::entities::parse_entities;
    use crate::hir::policy::parse_policies;
    use crate::syntax::EntityNaming;

    #[test]
    fn test_document_error_range() {
        let index = LineIndex::new("line zero\nline one\n");
        assert_eq!(
            document_error_range("bad token found at 12:15\n", &index),
            Range::new(LineCol::new(1, 2), LineCol::new(1, 5))
        );
        assert_eq!(
            document_error_range("expected `,` at line 2 column 3", &index),
            Range::empty(LineCol::new(1, 2))
        );
        assert_eq!(document_error_range("no position", &index), Range::default());
    }

    #[test]
    fn test_syntax_errors_with_offsets() {
        let index = LineIndex::new("permit(\n  principal,\n  oops\n);");
        let errors = [SyntaxError {
            message: "unexpected token".into(),
            offset: 23,
            length: 4,
        }];
        let diagnostics = syntax_diagnostics(&errors, &index);
        assert_eq!(diagnostics[0].range, Range::on_line(2, 2, 4));
        assert_eq!(diagnostics[0].severity.to_lsp(), 1);
    }

    const POLICIES: &str = "permit(principal, action, resource);\n\nforbid (\n  principal in NS::Usr::\"a\",\n  action,\n  resource\n);\n";

    #[test]
    fn test_policy_offset_is_relative_to_policy() {
        let index = parse_policies(POLICIES);
        let policy = &index.policies[1];
        let diagnostics = policy_diagnostics(&["bad at offset 24-30: x".to_owned()], policy);
        assert_eq!(diagnostics[0].range, Range::on_line(3, 15, 6));
    }

    #[test]
    fn test_policy_error_defaults_to_effect() {
        let index = parse_policies(POLICIES);
        let policy = &index.policies[1];
        let diagnostics = policy_diagnostics(&["something odd".to_owned()], policy);
        assert_eq!(diagnostics[0].range, policy.effect_range);
        assert_eq!(diagnostics[0].code, None);
    }

    #[test]
    fn test_unrecognized_type_is_located() {
        let index = parse_policies(POLICIES);
        let policy = &index.policies[1];
        let error = "Validation error on policy policy1: Unrecognized entity type NS::Usr, did you mean NS::User?";
        let diagnostics = policy_diagnostics(&[error.to_owned()], policy);
        assert_eq!(diagnostics[0].range, Range::on_line(3, 15, 7));
        assert_eq!(diagnostics[0].code.as_deref(), Some(codes::UNRECOGNIZED));
        assert!(diagnostics[0].message.starts_with("Unrecognized entity type"));
        assert!(!is_unrecognized_action(&diagnostics[0].message));
    }

    #[test]
    fn test_policy_on_shared_line_shifts_columns() {
        let index = parse_policies("forbid(principal,action,resource); permit(principal,action,resource);");
        let policy = &index.policies[1];
        let diagnostics = policy_diagnostics(&["at offset 7-16: x".to_owned()], policy);
        assert_eq!(diagnostics[0].range, Range::on_line(0, 42, 9));
    }

    #[test]
    fn test_undeclared_schema_references() {
        let mut refs = RefTable::default();
        refs.push_type("NS::Grp", Range::on_line(4, 27, 3));
        refs.push_type("NS::User", Range::on_line(5, 10, 4));
        let index = LineIndex::new("{}");
        let errors = [r#"Undeclared entity types: {"NS::Grp"}"#.to_owned()];
        let diagnostics = schema_diagnostics(&errors, &index, &refs);
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].range, Range::on_line(4, 27, 3));
        assert_eq!(diagnostics[0].message, "Undeclared entity type: NS::Grp");
        assert_eq!(diagnostics[1].range, Range::default());
    }

    #[test]
    fn test_entity_errors_use_sub_ranges() {
        let text = r#"[
  {
    "uid": { "type": "NS::User", "id": "alice" },
    "attrs": { "age": "old" },
    "parents": []
  }
]"#;
        let entities = parse_entities(text, EntityNaming::CEDAR);
        let index = LineIndex::new(text);
        let errors = [
            r#"error while deserializing entities: In attribute "age" on NS::User::"alice", type mismatch: attribute was expected to have type long, but actually has type string"#.to_owned(),
            r#"error while deserializing entities: Expected NS::User::"alice" to have an attribute "name", but it didn't"#.to_owned(),
        ];
        let diagnostics = entities_diagnostics(&errors, &index, &entities);
        assert_eq!(diagnostics.len(), 2);
        let entity = &entities.entities[0];
        assert_eq!(diagnostics[0].range, entity.attr_name_ranges["age"]);
        assert_eq!(Some(diagnostics[1].range), entity.attrs_key_range);
        assert!(diagnostics[0].message.starts_with("In attribute"));
    }
}
