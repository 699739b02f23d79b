//! Hover for policy documents: the narrowed types of a scope variable,
//! the help entry of a built-in method, or the type at the end of a
//! property chain.

use smol_str::SmolStr;

use super::analysis::AnalysisHost;
use super::help::function_help;
use crate::base::{LineCol, Range};
use crate::hir::{Document, split_property_chain, trailing_property_chain, traverse_property_chain};
use crate::syntax::Dialect;

const SCOPE_VARIABLES: [&str; 4] = ["principal", "resource", "context", "action"];

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HoverResult {
    /// Markdown paragraphs.
    pub contents: Vec<String>,
    /// Span to highlight, when it differs from the word under the cursor.
    pub range: Option<Range>,
}

fn cedar_block(code: &str) -> String {
    format!("```cedar\n{code}\n```")
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Byte span of the identifier touching `col`.
fn word_at(line: &str, col: usize) -> Option<(usize, usize)> {
    let bytes = line.as_bytes();
    let col = col.min(bytes.len());
    let mut start = col;
    while start > 0 && is_word_byte(bytes[start - 1]) {
        start -= 1;
    }
    let mut end = col;
    while end < bytes.len() && is_word_byte(bytes[end]) {
        end += 1;
    }
    (start < end).then_some((start, end))
}

/// The property chain a hovered word completes, normalized so that
/// `x has name` and `x has "name"` read as `x["name"]`.
struct ChainHover {
    chain: String,
    word: String,
    start: usize,
    end: usize,
}

fn chain_hover(line: &str, start: usize, end: usize) -> Option<ChainHover> {
    let before = &line[..start];
    let word = &line[start..end];
    if before.ends_with('.') {
        return Some(ChainHover {
            chain: line[..end].to_owned(),
            word: word.to_owned(),
            start,
            end,
        });
    }
    if let Some(subject) = before.strip_suffix(" has ") {
        return Some(ChainHover {
            chain: format!("{subject}[\"{word}\"]"),
            word: word.to_owned(),
            start,
            end,
        });
    }

    // a quoted attribute name, possibly containing spaces
    let open = before.rfind('"')?;
    let close = end + line[end..].find('"')?;
    let word = &line[open + 1..close];
    let chain = if let Some(subject) = line[..open].strip_suffix(" has ") {
        format!("{subject}[\"{word}\"]")
    } else if line[..open].ends_with('[') && line[close + 1..].starts_with(']') {
        line[..close + 2].to_owned()
    } else {
        return None;
    };
    Some(ChainHover {
        chain,
        word: word.to_owned(),
        start: open + 1,
        end: close,
    })
}

impl AnalysisHost {
    pub async fn hover(&self, doc: &Document, pos: LineCol) -> Option<HoverResult> {
        if doc.dialect() != Some(Dialect::Policy) {
            return None;
        }
        let line = doc.line(pos.line)?;
        let (start, end) = word_at(line, pos.col as usize)?;
        let word = &line[start..end];
        let prev = line[..start].chars().next_back();
        let next = line[end..].chars().next();

        if !matches!(prev, Some('.' | '?')) && SCOPE_VARIABLES.contains(&word) {
            return self.variable_hover(doc, word, pos).await;
        }
        if next == Some('(') {
            if let Some(help) = function_help(word) {
                return Some(HoverResult {
                    contents: vec![help.signature.to_owned(), help.description.to_owned()],
                    range: None,
                });
            }
        }

        let hover = chain_hover(line, start, end)?;
        let chain = trailing_property_chain(&hover.chain)?;
        let properties = split_property_chain(chain);
        let range = Range::on_line(pos.line, hover.start as u32, (hover.end - hover.start) as u32);
        self.property_hover(doc, pos, &properties, &hover.word, range).await
    }

    async fn variable_hover(&self, doc: &Document, scope: &str, pos: LineCol) -> Option<HoverResult> {
        let (schema, _) = self.open_schema(&doc.uri).await?;
        let types = self.narrow_entity_types(&schema, scope, doc, pos).await;
        if types.is_empty() {
            return None;
        }
        Some(HoverResult {
            contents: types.iter().map(|t| cedar_block(t)).collect(),
            range: None,
        })
    }

    async fn property_hover(
        &self,
        doc: &Document,
        pos: LineCol,
        properties: &[SmolStr],
        word: &str,
        range: Range,
    ) -> Option<HoverResult> {
        let root = properties.first()?;
        let (schema, _) = self.open_schema(&doc.uri).await?;
        let types = self.narrow_entity_types(&schema, root, doc, pos).await;
        let index = self.schema_index(&schema).await;

        let contents: Vec<String> = types
            .iter()
            .filter_map(|entity_type| {
                let target = traverse_property_chain(&index.completions, properties, entity_type);
                let last_type = target.last_type?;
                Some(cedar_block(&format!("({entity_type}) {word}: {last_type}")))
            })
            .collect();
        (!contents.is_empty()).then_some(HoverResult {
            contents,
            range: Some(range),
        })
    }
}
