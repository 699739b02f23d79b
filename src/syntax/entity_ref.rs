//! Entity-reference scanner.
//!
//! Recognizes `Ns::Type::"id"` and bare `Ns::Type` inside arbitrary text.
//! Every dialect indexer runs this over policy lines or decoded string
//! values to harvest type and action references.

use std::sync::LazyLock;

use regex::Regex;

static ENTITY_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"\b(?P<type>[_a-zA-Z][_a-zA-Z0-9]*(?:::[_a-zA-Z][_a-zA-Z0-9]*)*)(?P<id>::"(?:[^"\\]|\\.)*")?"#,
    )
    .expect("entity reference pattern is valid")
});

/// One reference found in scanned text. Offsets are byte offsets into the
/// scanned string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityRef<'a> {
    /// Type name, e.g. `NS::User` or `NS::Action`.
    pub type_name: &'a str,
    pub type_offset: usize,
    /// The quoted id including its quotes, e.g. `"alice"`.
    pub id: Option<&'a str>,
    pub id_offset: usize,
}

impl<'a> EntityRef<'a> {
    /// `Action` or `Ns::Action` with an id.
    pub fn is_action(&self) -> bool {
        self.id.is_some() && is_action_type(self.type_name)
    }

    /// The id without its quotes.
    pub fn id_value(&self) -> Option<&'a str> {
        self.id.map(|id| &id[1..id.len() - 1])
    }

    /// The full literal `Type::"id"`, or just the type name.
    pub fn literal(&self) -> String {
        match self.id {
            Some(id) => format!("{}::{}", self.type_name, id),
            None => self.type_name.to_string(),
        }
    }

    /// End offset of the whole match.
    pub fn end(&self) -> usize {
        match self.id {
            Some(id) => self.id_offset + id.len(),
            None => self.type_offset + self.type_name.len(),
        }
    }
}

/// Whether `type_name` names the action entity type of some namespace.
pub fn is_action_type(type_name: &str) -> bool {
    type_name == "Action" || type_name.ends_with("::Action")
}

/// Scan `text` for entity references.
///
/// A match is kept when it carries a quoted id, or when the type name is
/// namespace-qualified. Bare identifiers (`principal`, `when`) are not
/// references. Matches that begin inside a string literal are skipped so
/// that `"User::\"x\""` in policy text is not indexed twice.
pub fn scan(text: &str) -> Vec<EntityRef<'_>> {
    let mut refs = Vec::new();
    let mut quote_state = QuoteTracker::default();
    for caps in ENTITY_REF.captures_iter(text) {
        let Some(ty) = caps.name("type") else {
            continue;
        };
        if quote_state.inside_string(text, ty.start()) {
            continue;
        }
        let id = caps.name("id");
        if id.is_none() && !ty.as_str().contains("::") {
            continue;
        }
        refs.push(EntityRef {
            type_name: ty.as_str(),
            type_offset: ty.start(),
            id: id.map(|m| &m.as_str()[2..]),
            id_offset: id.map_or(0, |m| m.start() + 2),
        });
    }
    refs
}

/// Like [`scan`] but for text that is itself a decoded string value, where
/// every occurrence counts.
pub fn scan_value(text: &str) -> Vec<EntityRef<'_>> {
    ENTITY_REF
        .captures_iter(text)
        .filter_map(|caps| {
            let ty = caps.name("type")?;
            let id = caps.name("id");
            if id.is_none() && !ty.as_str().contains("::") {
                return None;
            }
            Some(EntityRef {
                type_name: ty.as_str(),
                type_offset: ty.start(),
                id: id.map(|m| &m.as_str()[2..]),
                id_offset: id.map_or(0, |m| m.start() + 2),
            })
        })
        .collect()
}

/// Incremental "is this offset inside a string literal" check. Offsets must
/// be queried in increasing order.
#[derive(Default)]
struct QuoteTracker {
    scanned: usize,
    in_string: bool,
    escaped: bool,
}

impl QuoteTracker {
    fn inside_string(&mut self, text: &str, offset: usize) -> bool {
        for byte in text.as_bytes()[self.scanned..offset].iter() {
            if self.escaped {
                self.escaped = false;
            } else if *byte == b'\\' && self.in_string {
                self.escaped = true;
            } else if *byte == b'"' {
                self.in_string = !self.in_string;
            }
        }
        self.scanned = offset;
        self.in_string
    }
}
