//! Namespace qualification and type-name normalization.
//!
//! Schema names are written relative to their namespace; everything the
//! index stores is fully qualified so that lookups never need scope
//! information.

use smol_str::{SmolStr, format_smolstr};

/// Primitive attribute kinds.
pub const PRIMITIVE_TYPES: [&str; 3] = ["String", "Long", "Boolean"];

/// Extension types and the constructor function that builds each.
pub const EXTENSION_TYPES: [(&str, &str); 4] = [
    ("ipaddr", "ip"),
    ("decimal", "decimal"),
    ("datetime", "datetime"),
    ("duration", "duration"),
];

pub fn is_primitive(name: &str) -> bool {
    PRIMITIVE_TYPES.contains(&name)
}

pub fn is_extension(name: &str) -> bool {
    EXTENSION_TYPES.iter().any(|(ty, _)| *ty == name)
}

/// Strip the `__cedar::` prefix and map `Bool` to `Boolean`.
pub fn normalize_builtin(name: &str) -> &str {
    let name = name.strip_prefix("__cedar::").unwrap_or(name);
    match name {
        "Bool" => "Boolean",
        other => other,
    }
}

/// Qualify `name` with namespace `ns` unless it is already qualified or
/// the namespace is empty.
pub fn qualify(ns: &str, name: &str) -> SmolStr {
    if ns.is_empty() || name.contains("::") {
        SmolStr::new(name)
    } else {
        format_smolstr!("{ns}::{name}")
    }
}

/// The action literal `Ns::Action::"id"` for an action declared in `ns`.
pub fn action_literal(ns: &str, id: &str) -> SmolStr {
    if ns.is_empty() {
        format_smolstr!("Action::\"{id}\"")
    } else {
        format_smolstr!("{ns}::Action::\"{id}\"")
    }
}

/// The action literal for a `memberOf` entry whose `type` may be absent.
pub fn member_of_literal(ns: &str, ty: Option<&str>, id: &str) -> SmolStr {
    match ty {
        Some(ty) => {
            let ty = qualify(ns, ty);
            format_smolstr!("{ty}::\"{id}\"")
        }
        None => action_literal(ns, id),
    }
}

/// The entity type of an entity literal: `NS::User::"a"` -> `NS::User`.
pub fn literal_type(literal: &str) -> Option<&str> {
    let quote = literal.find("::\"")?;
    Some(&literal[..quote])
}

/// Whether `name` is a valid identifier (used to decide between `.name` and
/// `["name"]` access).
pub fn is_ident(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first == '_' || unicode_ident::is_xid_start(first) => {}
        _ => return false,
    }
    chars.all(unicode_ident::is_xid_continue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("NS", "Group", "NS::Group")]
    #[case("", "Group", "Group")]
    #[case("NS", "Other::Group", "Other::Group")]
    fn test_qualify(#[case] ns: &str, #[case] name: &str, #[case] expected: &str) {
        assert_eq!(qualify(ns, name), expected);
    }

    #[test]
    fn test_action_literals() {
        assert_eq!(action_literal("NS", "view"), r#"NS::Action::"view""#);
        assert_eq!(action_literal("", "view"), r#"Action::"view""#);
        assert_eq!(member_of_literal("NS", Some("Action"), "all"), r#"NS::Action::"all""#);
    }

    #[test]
    fn test_normalize_builtin() {
        assert_eq!(normalize_builtin("Bool"), "Boolean");
        assert_eq!(normalize_builtin("__cedar::Long"), "Long");
        assert_eq!(normalize_builtin("NS::Addr"), "NS::Addr");
    }

    #[test]
    fn test_literal_type() {
        assert_eq!(literal_type(r#"NS::User::"alice""#), Some("NS::User"));
        assert_eq!(literal_type("principal"), None);
    }

    #[test]
    fn test_is_ident() {
        assert!(is_ident("name"));
        assert!(is_ident("_x1"));
        assert!(!is_ident("first name"));
        assert!(!is_ident("1st"));
        assert!(!is_ident(""));
    }
}
