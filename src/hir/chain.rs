//! Property chains such as `principal.address["zip code"].city`.

use std::sync::LazyLock;

use regex::Regex;
use smol_str::SmolStr;

use super::schema::{AttributeMap, CompletionGraph};

/// Split a property chain into its segments. Bracket-quoted segments and
/// dotted segments normalize identically; a trailing `.` is dropped.
///
/// Only ever slices at ASCII delimiters, so any text is accepted.
pub fn split_property_chain(chain: &str) -> Vec<SmolStr> {
    let bytes = chain.as_bytes();
    let mut parts = Vec::new();
    let mut start = 0;
    let mut pos = 0;
    while pos < bytes.len() {
        match bytes[pos] {
            b'.' => {
                if start < pos {
                    parts.push(SmolStr::new(&chain[start..pos]));
                }
                pos += 1;
                start = pos;
            }
            b'[' if bytes.get(pos + 1) == Some(&b'"') => {
                if start < pos {
                    parts.push(SmolStr::new(&chain[start..pos]));
                }
                let open = pos + 2;
                let close = closing_quote(bytes, open);
                parts.push(unescape(&chain[open..close]));
                pos = (close + 1).min(bytes.len());
                if bytes.get(pos) == Some(&b']') {
                    pos += 1;
                }
                start = pos;
            }
            // the id of an entity literal may hold dots
            b'"' => pos = (closing_quote(bytes, pos + 1) + 1).min(bytes.len()),
            _ => pos += 1,
        }
    }
    if start < bytes.len() {
        parts.push(SmolStr::new(&chain[start..]));
    }
    parts
}

/// Index of the unescaped `"` closing a string opened before `from`, or the
/// end of the input.
fn closing_quote(bytes: &[u8], from: usize) -> usize {
    let mut pos = from;
    while pos < bytes.len() {
        match bytes[pos] {
            b'\\' => pos += 2,
            b'"' => return pos,
            _ => pos += 1,
        }
    }
    bytes.len()
}

fn unescape(text: &str) -> SmolStr {
    if !text.contains('\\') {
        return SmolStr::new(text);
    }
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.extend(chars.next()),
            c => out.push(c),
        }
    }
    SmolStr::from(out)
}

static TRAILING_CHAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?:\b(?:principal|resource|context|action)|(?:[_a-zA-Z][_a-zA-Z0-9]*::)+"(?:[^"\\]|\\.)*")(?:\.[_a-zA-Z][_a-zA-Z0-9]*|\["(?:[^"\\]|\\.)*"\])*\.?$"#,
    )
    .expect("trailing chain regex is valid")
});

/// The property chain `text` ends with, starting at a scope variable or an
/// entity literal.
pub fn trailing_property_chain(text: &str) -> Option<&str> {
    let found = TRAILING_CHAIN.find(text)?;
    // Scope names preceded by `.` are attributes, not the chain's root.
    if text[..found.start()].ends_with('.') {
        return None;
    }
    Some(found.as_str())
}

/// Where a property chain ends up.
#[derive(Clone, Copy, Debug, Default)]
pub struct ChainTarget<'g> {
    /// Description of the last attribute, `None` if any segment missed.
    pub last_type: Option<&'g SmolStr>,
    /// Shape to continue from when the last attribute is a record.
    pub completion: Option<&'g AttributeMap>,
}

/// Follow `segments[1..]` from `entity_type` through `graph`.
///
/// The first segment is the scope or literal the chain starts from and is
/// not looked up. Nested records are entered through their inline shape;
/// anything else re-enters the graph by name. A missing segment clears the
/// target and every later segment misses too.
pub fn traverse_property_chain<'g>(
    graph: &'g CompletionGraph,
    segments: &[SmolStr],
    entity_type: &str,
) -> ChainTarget<'g> {
    let mut target = ChainTarget {
        last_type: None,
        completion: graph.get(entity_type),
    };
    for segment in segments.iter().skip(1) {
        target = match target.completion.and_then(|node| node.get(segment)) {
            Some(attribute) => ChainTarget {
                last_type: Some(&attribute.description),
                completion: attribute
                    .children
                    .as_ref()
                    .or_else(|| graph.get(&attribute.description)),
            },
            None => ChainTarget::default(),
        };
    }
    target
}
