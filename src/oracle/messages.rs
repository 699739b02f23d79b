//! Classification of validation-oracle messages.
//!
//! The oracle reports errors as prose. Each recognized sentence shape has
//! one pure function here returning a structured [`OracleMessage`], so the
//! wording the rest of the crate depends on lives in one place. Unknown
//! wording classifies as `None`.

use std::sync::LazyLock;

use regex::Regex;
use smol_str::SmolStr;

use crate::hir::records::format_uid;

macro_rules! pattern {
    ($name:ident, $re:expr) => {
        static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($re).expect(concat!(stringify!($name), " is valid")));
    };
}

pattern!(FOUND_AT, r"found at (?P<start>\d+)(?::(?P<end>\d+))?\n");
pattern!(AT_LINE, r"at line (?P<line>\d+)? column (?P<column>\d+)?");
pattern!(OFFSET_POLICY, r"at offset (?P<start>\d+)(?:-(?P<end>\d+))?: ");
pattern!(
    UNRECOGNIZED,
    r"Unrecognized (?P<kind>action id|entity type) (?P<name>.+), did you mean (?P<suggestion>.+)\?"
);
pattern!(UNDECLARED, r"Undeclared (?:(?P<kind>entity|common) types|actions): \{(?P<names>.+)\}");
pattern!(
    NOT_DECLARED_TYPE,
    r#"(?P<type>.+)::"(?P<id>.+)" has type (?:.+) which is not declared in the schema"#
);
pattern!(
    EXPECTED_ATTR,
    r#"Expected (?P<type>.+)::"(?P<id>.+)" to have an attribute "(?P<expected>.+)", but it didn't"#
);
pattern!(
    EXPECTED_NESTED_ATTR,
    r#"In attribute "(?P<attribute>.+)" on (?P<type>.+)::"(?P<id>.+)", expected the record to have an attribute "(?P<expected>.+)", but it didn't"#
);
pattern!(
    MISMATCH_ATTR,
    r#"In attribute "(?P<attribute>.+)" on (?P<type>.+)::"(?P<id>.+)", type mismatch: attribute was expected to have type (?P<expected>.+), but actually has type (?P<actual>.+)"#
);
pattern!(
    EXIST_ATTR,
    r#"Attribute "(?P<attribute>.+)" on (?P<type>.+)::"(?P<id>.+)" shouldn't exist according to the schema"#
);
pattern!(
    NOT_ALLOWED_PARENT,
    r#"In parents field of (?P<type>.+)::"(?P<id>.+)", (?:.+) is not allowed to have a parent of type (?P<parent>.+) according to the schema"#
);
pattern!(
    UNEXPECTED_TYPE,
    r#"Unexpected type\. Expected \{"type":"Boolean"\} but saw \{"type":"Entity","name":"(?P<name>.+)"\}"#
);
pattern!(
    CONTEXT_ATTRIBUTE_NOT_FOUND,
    r"attribute `__vscode__` in context for (?P<action>.+) not found"
);

/// Prefixes the oracle puts in front of the interesting sentence.
pub const ENTITIES_PREFIX: &str = "error while deserializing entities";
pub const SCHEMA_PARSE_PREFIX: &str = "JSON Schema file could not be parsed: ";
pub const POLICY_PREFIX: &str = "Validation error on policy";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnrecognizedKind {
    ActionId,
    EntityType,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UndeclaredKind {
    EntityTypes,
    CommonTypes,
    Actions,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OracleMessage {
    /// Byte offsets into the whole document.
    FoundAt { start: usize, end: usize },
    /// 1-based position in the document.
    AtLine { line: u32, column: u32 },
    /// Byte offsets into a single policy's text.
    PolicyOffset { start: usize, end: usize },
    Unrecognized {
        kind: UnrecognizedKind,
        name: SmolStr,
        suggestion: SmolStr,
    },
    /// Names with their quotes removed, e.g. `NS::Action::"view"`.
    Undeclared { kind: UndeclaredKind, names: Vec<SmolStr> },
    UndeclaredEntityType { uid: SmolStr },
    MissingAttribute {
        uid: SmolStr,
        /// The enclosing record attribute, for nested records.
        attribute: Option<SmolStr>,
        expected: SmolStr,
    },
    AttributeMismatch {
        uid: SmolStr,
        attribute: SmolStr,
        expected: SmolStr,
        actual: SmolStr,
    },
    UnexpectedAttribute { uid: SmolStr, attribute: SmolStr },
    ParentNotAllowed { uid: SmolStr, parent_type: SmolStr },
    /// A probe condition was an entity of this type.
    UnexpectedType { entity_type: SmolStr },
    /// A probe context attribute was missing for this action.
    ContextAttributeNotFound { action: SmolStr },
}

impl OracleMessage {
    /// The entity uid the message is about, for entity messages.
    pub fn entity_uid(&self) -> Option<&SmolStr> {
        match self {
            Self::UndeclaredEntityType { uid }
            | Self::MissingAttribute { uid, .. }
            | Self::AttributeMismatch { uid, .. }
            | Self::UnexpectedAttribute { uid, .. }
            | Self::ParentNotAllowed { uid, .. } => Some(uid),
            _ => None,
        }
    }
}

fn text(caps: &regex::Captures<'_>, name: &str) -> SmolStr {
    caps.name(name).map(|m| SmolStr::new(m.as_str())).unwrap_or_default()
}

fn number<T: std::str::FromStr>(caps: &regex::Captures<'_>, name: &str) -> Option<T> {
    caps.name(name).and_then(|m| m.as_str().parse().ok())
}

fn uid(caps: &regex::Captures<'_>) -> SmolStr {
    format_uid(&text(caps, "type"), &text(caps, "id"))
}

pub fn found_at(message: &str) -> Option<OracleMessage> {
    let caps = FOUND_AT.captures(message)?;
    let start = number(&caps, "start")?;
    Some(OracleMessage::FoundAt {
        start,
        end: number(&caps, "end").unwrap_or(start),
    })
}

pub fn at_line(message: &str) -> Option<OracleMessage> {
    let caps = AT_LINE.captures(message)?;
    let line = number(&caps, "line").filter(|&l: &u32| l > 0)?;
    let column = number(&caps, "column").filter(|&c: &u32| c > 0)?;
    Some(OracleMessage::AtLine { line, column })
}

pub fn policy_offset(message: &str) -> Option<OracleMessage> {
    let caps = OFFSET_POLICY.captures(message)?;
    let start = number(&caps, "start")?;
    Some(OracleMessage::PolicyOffset {
        start,
        end: number(&caps, "end").unwrap_or(start),
    })
}

pub fn unrecognized(message: &str) -> Option<OracleMessage> {
    let caps = UNRECOGNIZED.captures(message)?;
    let kind = match caps.name("kind")?.as_str() {
        "action id" => UnrecognizedKind::ActionId,
        _ => UnrecognizedKind::EntityType,
    };
    Some(OracleMessage::Unrecognized {
        kind,
        name: text(&caps, "name"),
        suggestion: text(&caps, "suggestion"),
    })
}

/// Strip one level of quoting from a listed name: `"NS::Action::\"a\""`
/// becomes `NS::Action::"a"`.
fn unquote(name: &str) -> SmolStr {
    let name = name.trim();
    let inner = name
        .strip_prefix('"')
        .and_then(|n| n.strip_suffix('"'))
        .unwrap_or(name);
    SmolStr::new(inner.replace("\\\"", "\""))
}

pub fn undeclared(message: &str) -> Option<OracleMessage> {
    let caps = UNDECLARED.captures(message)?;
    let kind = match caps.name("kind").map(|m| m.as_str()) {
        Some("entity") => UndeclaredKind::EntityTypes,
        Some(_) => UndeclaredKind::CommonTypes,
        None => UndeclaredKind::Actions,
    };
    let names = caps.name("names")?.as_str().split(", ").map(unquote).collect();
    Some(OracleMessage::Undeclared { kind, names })
}

pub fn undeclared_entity_type(message: &str) -> Option<OracleMessage> {
    let caps = NOT_DECLARED_TYPE.captures(message)?;
    Some(OracleMessage::UndeclaredEntityType { uid: uid(&caps) })
}

pub fn missing_attribute(message: &str) -> Option<OracleMessage> {
    if let Some(caps) = EXPECTED_NESTED_ATTR.captures(message) {
        return Some(OracleMessage::MissingAttribute {
            uid: uid(&caps),
            attribute: Some(text(&caps, "attribute")),
            expected: text(&caps, "expected"),
        });
    }
    let caps = EXPECTED_ATTR.captures(message)?;
    Some(OracleMessage::MissingAttribute {
        uid: uid(&caps),
        attribute: None,
        expected: text(&caps, "expected"),
    })
}

pub fn attribute_mismatch(message: &str) -> Option<OracleMessage> {
    let caps = MISMATCH_ATTR.captures(message)?;
    Some(OracleMessage::AttributeMismatch {
        uid: uid(&caps),
        attribute: text(&caps, "attribute"),
        expected: text(&caps, "expected"),
        actual: text(&caps, "actual"),
    })
}

pub fn unexpected_attribute(message: &str) -> Option<OracleMessage> {
    let caps = EXIST_ATTR.captures(message)?;
    Some(OracleMessage::UnexpectedAttribute {
        uid: uid(&caps),
        attribute: text(&caps, "attribute"),
    })
}

pub fn parent_not_allowed(message: &str) -> Option<OracleMessage> {
    let caps = NOT_ALLOWED_PARENT.captures(message)?;
    Some(OracleMessage::ParentNotAllowed {
        uid: uid(&caps),
        parent_type: text(&caps, "parent"),
    })
}

pub fn unexpected_type(message: &str) -> Option<OracleMessage> {
    let caps = UNEXPECTED_TYPE.captures(message)?;
    Some(OracleMessage::UnexpectedType {
        entity_type: text(&caps, "name"),
    })
}

pub fn context_attribute_not_found(message: &str) -> Option<OracleMessage> {
    let caps = CONTEXT_ATTRIBUTE_NOT_FOUND.captures(message)?;
    Some(OracleMessage::ContextAttributeNotFound {
        action: text(&caps, "action"),
    })
}

/// Entity-document messages, in the order they are tried.
pub fn classify_entity(message: &str) -> Option<OracleMessage> {
    attribute_mismatch(message)
        .or_else(|| unexpected_attribute(message))
        .or_else(|| missing_attribute(message))
        .or_else(|| undeclared_entity_type(message))
        .or_else(|| parent_not_allowed(message))
}

/// The most specific shape `message` matches. Positional shapes are tried
/// last since they often prefix a more specific sentence.
pub fn classify(message: &str) -> Option<OracleMessage> {
    classify_entity(message)
        .or_else(|| unrecognized(message))
        .or_else(|| undeclared(message))
        .or_else(|| unexpected_type(message))
        .or_else(|| context_attribute_not_found(message))
        .or_else(|| policy_offset(message))
        .or_else(|| found_at(message))
        .or_else(|| at_line(message))
}

/// Drop a `prefix ...: ` lead-in if present.
pub fn strip_prefix<'m>(message: &'m str, prefix: &str) -> &'m str {
    if !message.starts_with(prefix) {
        return message;
    }
    match message.find(": ") {
        Some(colon) => &message[colon + 2..],
        None => message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_found_at() {
        assert_eq!(found_at("unexpected token found at 12:15\n"), Some(OracleMessage::FoundAt { start: 12, end: 15 }));
        assert_eq!(found_at("x found at 7\n"), Some(OracleMessage::FoundAt { start: 7, end: 7 }));
        assert_eq!(found_at("found at 7"), None);
    }

    #[test]
    fn test_at_line() {
        assert_eq!(
            at_line("expected value at line 3 column 14"),
            Some(OracleMessage::AtLine { line: 3, column: 14 })
        );
        assert_eq!(at_line("at line  column 14"), None);
    }

    #[test]
    fn test_policy_offset() {
        assert_eq!(
            policy_offset("error at offset 44-53: bad"),
            Some(OracleMessage::PolicyOffset { start: 44, end: 53 })
        );
        assert_eq!(policy_offset("at offset 9: bad"), Some(OracleMessage::PolicyOffset { start: 9, end: 9 }));
    }

    #[test]
    fn test_unrecognized() {
        let message = r#"Unrecognized entity type NS::Usr, did you mean NS::User?"#;
        assert_eq!(
            unrecognized(message),
            Some(OracleMessage::Unrecognized {
                kind: UnrecognizedKind::EntityType,
                name: "NS::Usr".into(),
                suggestion: "NS::User".into(),
            })
        );
        let message = r#"Unrecognized action id NS::Action::"vew", did you mean NS::Action::"view"?"#;
        assert!(matches!(
            unrecognized(message),
            Some(OracleMessage::Unrecognized { kind: UnrecognizedKind::ActionId, .. })
        ));
    }

    #[rstest]
    #[case(r#"Undeclared entity types: {"NS::Grp", "Other"}"#, UndeclaredKind::EntityTypes, &["NS::Grp", "Other"])]
    #[case(r#"Undeclared common types: {"Addr"}"#, UndeclaredKind::CommonTypes, &["Addr"])]
    #[case(r#"Undeclared actions: {"NS::Action::\"read\""}"#, UndeclaredKind::Actions, &[r#"NS::Action::"read""#])]
    fn test_undeclared(#[case] message: &str, #[case] kind: UndeclaredKind, #[case] names: &[&str]) {
        let expected = OracleMessage::Undeclared {
            kind,
            names: names.iter().map(|n| SmolStr::new(n)).collect(),
        };
        assert_eq!(undeclared(message), Some(expected));
    }

    #[test]
    fn test_entity_messages() {
        let message = r#"Attribute "subjects" on PhotoApp::Photo::"a.jpg" shouldn't exist according to the schema"#;
        assert_eq!(
            classify(message),
            Some(OracleMessage::UnexpectedAttribute {
                uid: r#"PhotoApp::Photo::"a.jpg""#.into(),
                attribute: "subjects".into(),
            })
        );

        let message = r#"Expected NS::User::"alice" to have an attribute "age", but it didn't"#;
        assert!(matches!(
            classify(message),
            Some(OracleMessage::MissingAttribute { attribute: None, ref expected, .. }) if expected == "age"
        ));

        let message = r#"In attribute "address" on NS::User::"alice", expected the record to have an attribute "zip", but it didn't"#;
        assert!(matches!(
            classify(message),
            Some(OracleMessage::MissingAttribute { attribute: Some(ref a), .. }) if a == "address"
        ));

        let message = r#"In attribute "age" on NS::User::"alice", type mismatch: attribute was expected to have type long, but actually has type string"#;
        let classified = classify(message).unwrap();
        assert_eq!(classified.entity_uid().map(|u| u.as_str()), Some(r#"NS::User::"alice""#));

        let message = r#"NS::Usr::"alice" has type NS::Usr which is not declared in the schema"#;
        assert_eq!(
            classify(message),
            Some(OracleMessage::UndeclaredEntityType { uid: r#"NS::Usr::"alice""#.into() })
        );

        let message = r#"In parents field of NS::User::"alice", `NS::User::"alice"` is not allowed to have a parent of type NS::Photo according to the schema"#;
        assert_eq!(
            classify(message),
            Some(OracleMessage::ParentNotAllowed {
                uid: r#"NS::User::"alice""#.into(),
                parent_type: "NS::Photo".into(),
            })
        );
    }

    #[test]
    fn test_probe_messages() {
        let message = r#"Unexpected type. Expected {"type":"Boolean"} but saw {"type":"Entity","name":"NS::User"}"#;
        assert_eq!(
            unexpected_type(message),
            Some(OracleMessage::UnexpectedType { entity_type: "NS::User".into() })
        );
        let message = r#"attribute `__vscode__` in context for NS::Action::"view" not found"#;
        assert_eq!(
            context_attribute_not_found(message),
            Some(OracleMessage::ContextAttributeNotFound { action: r#"NS::Action::"view""#.into() })
        );
    }

    #[test]
    fn test_unknown_wording_is_none() {
        assert_eq!(classify("something entirely different"), None);
    }

    #[test]
    fn test_strip_prefix() {
        let message = "error while deserializing entities: Attribute \"x\" on A::\"b\" shouldn't exist";
        assert_eq!(strip_prefix(message, ENTITIES_PREFIX), "Attribute \"x\" on A::\"b\" shouldn't exist");
        assert_eq!(strip_prefix("plain", ENTITIES_PREFIX), "plain");
    }
}
