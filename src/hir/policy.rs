//! Policy-text indexer.
//!
//! A single forward pass over lines. Statements end at a `;` outside string
//! literals and comments, so several statements may share a line. Malformed
//! input never fails: an unterminated trailing statement is kept only when
//! its effect keyword was seen.

use std::sync::{Arc, LazyLock};

use indexmap::IndexSet;
use regex::Regex;
use smol_str::SmolStr;

use super::records::{PolicyRecord, RefTable};
use super::tokens::{SemanticToken, TokenModifiers, TokenType, push_qualified};
use crate::base::{LineCol, LineIndex, Range, TextSize};
use crate::syntax::entity_ref;

static ID_ANNOTATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*@id\s*\(\s*"((?:[^"\\]|\\.)*)"\s*\)"#).expect("id annotation pattern is valid")
});

static ANNOTATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@([_a-zA-Z][_a-zA-Z0-9]*)").expect("annotation pattern is valid"));

static EFFECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(permit|forbid)\b").expect("effect pattern is valid"));

/// Index of one policy-text document.
#[derive(Debug, Default)]
pub struct PolicyIndex {
    pub policies: Vec<Arc<PolicyRecord>>,
    /// Entity type references; action literals are in `refs.action_ids`.
    pub refs: RefTable,
    /// Annotation names in first-seen order, always containing `id`.
    pub annotation_names: IndexSet<SmolStr>,
    pub tokens: Vec<SemanticToken>,
}

impl PolicyIndex {
    /// The policy whose range contains `pos`.
    pub fn policy_at(&self, pos: LineCol) -> Option<&Arc<PolicyRecord>> {
        self.policies.iter().find(|p| p.range.contains(pos))
    }
}

/// Comment, string and statement-separator positions of one line.
struct LineScan {
    code_end: usize,
    strings: Vec<(usize, usize)>,
    semicolons: Vec<usize>,
}

impl LineScan {
    fn new(line: &str) -> Self {
        let bytes = line.as_bytes();
        let mut scan = LineScan {
            code_end: line.len(),
            strings: Vec::new(),
            semicolons: Vec::new(),
        };
        let mut open: Option<usize> = None;
        let mut i = 0;
        while i < bytes.len() {
            match (open, bytes[i]) {
                (Some(_), b'\\') => i += 1,
                (Some(start), b'"') => {
                    scan.strings.push((start, i + 1));
                    open = None;
                }
                (Some(_), _) => {}
                (None, b'"') => open = Some(i),
                (None, b'/') if bytes.get(i + 1) == Some(&b'/') => {
                    scan.code_end = i;
                    break;
                }
                (None, b';') => scan.semicolons.push(i),
                (None, _) => {}
            }
            i += 1;
        }
        if let Some(start) = open {
            scan.strings.push((start, scan.code_end));
        }
        scan
    }

    fn in_string(&self, offset: usize) -> bool {
        self.strings.iter().any(|&(start, end)| start <= offset && offset < end)
    }
}

struct Pending {
    start: LineCol,
    end: LineCol,
    id: Option<SmolStr>,
    id_checked: bool,
    effect: Option<Range>,
}

/// Index a policy-text document.
pub fn parse_policies(text: &str) -> PolicyIndex {
    let line_index = LineIndex::new(text);
    let mut index = PolicyIndex::default();
    index.annotation_names.insert(SmolStr::new_static("id"));
    let mut pending: Option<Pending> = None;

    for (line_no, line) in text.split('\n').enumerate() {
        let line_no = line_no as u32;
        let line = line.strip_suffix('\r').unwrap_or(line);
        let scan = LineScan::new(line);
        let code = &line[..scan.code_end];

        let mut seg_start = 0;
        let mut boundaries = scan.semicolons.iter().map(|&semi| semi + 1).peekable();
        loop {
            let closes = boundaries.peek().is_some();
            let seg_end = boundaries.next().unwrap_or(code.len());
            let segment = &code[seg_start..seg_end];

            if pending.is_none() && segment.trim().is_empty() {
                if !closes {
                    break;
                }
                seg_start = seg_end;
                continue;
            }

            let policy = pending.get_or_insert_with(|| {
                let col = if seg_start == 0 {
                    0
                } else {
                    seg_start + (segment.len() - segment.trim_start().len())
                };
                let start = LineCol::new(line_no, col as u32);
                Pending {
                    start,
                    end: start,
                    id: None,
                    id_checked: false,
                    effect: None,
                }
            });
            scan_segment(&mut index, policy, &scan, line_no, seg_start, segment);
            if !line[seg_start..].trim().is_empty() {
                policy.end = LineCol::new(line_no, line.len() as u32);
            }

            if closes {
                let rest_is_blank = code[seg_end..].trim().is_empty();
                let end_col = if rest_is_blank { line.len() } else { seg_end };
                if let Some(policy) = pending.take() {
                    close(&mut index, &line_index, text, policy, LineCol::new(line_no, end_col as u32));
                }
                seg_start = seg_end;
            } else {
                break;
            }
        }
    }

    if let Some(policy) = pending.take().filter(|p| p.effect.is_some()) {
        let end = policy.end;
        close(&mut index, &line_index, text, policy, end);
    }

    index
}

fn scan_segment(
    index: &mut PolicyIndex,
    policy: &mut Pending,
    scan: &LineScan,
    line_no: u32,
    seg_start: usize,
    segment: &str,
) {
    if !policy.id_checked && !segment.trim().is_empty() {
        policy.id_checked = true;
        if let Some(id) = ID_ANNOTATION.captures(segment).and_then(|c| c.get(1)) {
            policy.id = Some(SmolStr::new(id.as_str()));
        }
    }

    for caps in ANNOTATION.captures_iter(segment) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if scan.in_string(seg_start + whole.start()) {
            continue;
        }
        index.annotation_names.insert(SmolStr::new(name.as_str()));
        index.tokens.push(SemanticToken::new(
            Range::on_line(line_no, (seg_start + whole.start()) as u32, whole.len() as u32),
            TokenType::Macro,
            TokenModifiers::NONE,
        ));
    }

    if policy.effect.is_none() {
        policy.effect = EFFECT
            .find_iter(segment)
            .find(|m| !scan.in_string(seg_start + m.start()))
            .map(|m| Range::on_line(line_no, (seg_start + m.start()) as u32, m.len() as u32));
    }

    for found in entity_ref::scan(segment) {
        let type_col = (seg_start + found.type_offset) as u32;
        push_qualified(&mut index.tokens, line_no, type_col, found.type_name);
        if found.is_action() {
            let id_len = found.id.map_or(0, str::len) as u32;
            index.refs.push_action(
                found.literal(),
                Range::on_line(line_no, (seg_start + found.id_offset) as u32, id_len),
            );
        } else {
            index.refs.push_type(
                found.type_name,
                Range::on_line(line_no, type_col, found.type_name.len() as u32),
            );
        }
    }
}

fn close(index: &mut PolicyIndex, line_index: &LineIndex, text: &str, policy: Pending, end: LineCol) {
    let id = policy
        .id
        .unwrap_or_else(|| smol_str::format_smolstr!("policy{}", index.policies.len()));
    let effect_range = policy.effect.unwrap_or(Range::empty(policy.start));
    let slice = match (line_index.offset(policy.start), line_index.offset(end)) {
        (Some(from), Some(to)) if from <= to && to <= TextSize::of(text) => {
            &text[usize::from(from)..usize::from(to)]
        }
        _ => "",
    };
    index.policies.push(Arc::new(PolicyRecord::new(
        id,
        Range::new(policy.start, end),
        effect_range,
        slice,
    )));
}
