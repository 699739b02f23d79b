//! Completion for policy documents and entities JSON.
//!
//! Policy completion is prefix driven: the text of the current line up to
//! the cursor is matched against a handful of shapes (a trailing property
//! chain, a partial entity literal, a scope clause, an annotation) and
//! each shape produces its own items. Nothing here parses the policy.
//!
//! Entities JSON offers one whole-entity snippet per schema entity type
//! when the cursor sits directly inside an entity object.

use std::sync::LazyLock;

use regex::Regex;
use rustc_hash::FxHashSet;
use smol_str::SmolStr;

use super::analysis::AnalysisHost;
use super::help::function_help;
use crate::base::{LineCol, LineIndex, Range};
use crate::hir::resolve::{is_ident, is_primitive};
use crate::hir::{
    AttributeMap, Document, SchemaCollection, SchemaIndex, SnippetWriter, split_property_chain,
    trailing_property_chain, traverse_property_chain,
};
use crate::syntax::{Dialect, EntityNaming};

// [^\s"]* keeps the literal from spanning several calls.
static IP_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bip\("[^\s"]*"\)\.$"#).expect("ip call regex is valid"));
static DECIMAL_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bdecimal\("[^\s"]*"\)\.$"#).expect("decimal call regex is valid"));

static ENTITY_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\s|=|\[|\()(?P<entity>(?:[_a-zA-Z][_a-zA-Z0-9]*::)+)$").expect("entity prefix regex is valid")
});

static SCOPE_CLAUSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?P<element>principal|action|resource)(?:\s*==\s*|(?:\s+is\s+(?:[_a-zA-Z][_a-zA-Z0-9]*::)*[_a-zA-Z][_a-zA-Z0-9]*)?\s+in\s+\[?)(?P<trigger>.?)$",
    )
    .expect("scope clause regex is valid")
});

static IS_CLAUSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"\b(?P<element>(?:[_a-zA-Z][_a-zA-Z0-9]*::)*[_a-zA-Z][_a-zA-Z0-9]*::"[^"]*"|principal|resource)\s+is\s+(?P<trigger>.?)$"#,
    )
    .expect("is clause regex is valid")
});

// `principal i` is the start of `in`/`is`, not of `ip(`.
static SKIP_IP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:principal|action|resource)\s+i$").expect("skip regex is valid"));

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompletionKind {
    Function,
    Field,
    Variable,
    Class,
    Value,
    Property,
    Snippet,
    Struct,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompletionTrigger {
    /// Explicitly requested, or typed without a trigger character.
    Invoked,
    Character(char),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextEdit {
    pub range: Range,
    pub new_text: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletionItem {
    pub label: SmolStr,
    pub kind: CompletionKind,
    /// Shown right after the label, e.g. a signature.
    pub detail: Option<String>,
    /// Shown aligned right, e.g. the owning type.
    pub description: Option<String>,
    /// Snippet syntax; the label is inserted when absent.
    pub insert_text: Option<String>,
    /// Text replaced by the item.
    pub range: Range,
    pub additional_edits: Vec<TextEdit>,
}

impl CompletionItem {
    fn new(label: impl Into<SmolStr>, kind: CompletionKind, range: Range) -> Self {
        Self {
            label: label.into(),
            kind,
            detail: None,
            description: None,
            insert_text: None,
            range,
            additional_edits: Vec::new(),
        }
    }

    fn with_insert_text(mut self, snippet: impl Into<String>) -> Self {
        self.insert_text = Some(snippet.into());
        self
    }

    fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The text this item puts into the document.
    pub fn text(&self) -> &str {
        self.insert_text.as_deref().unwrap_or(self.label.as_str())
    }
}

// ============================================================================
// Item builders
// ============================================================================

fn function_item(range: Range, label: &str, snippet: &str) -> CompletionItem {
    let mut item = CompletionItem::new(label, CompletionKind::Function, range).with_insert_text(snippet);
    item.detail = function_help(label).map(|help| help.detail().to_owned());
    item
}

fn contains_items(range: Range) -> Vec<CompletionItem> {
    vec![
        function_item(range, "contains", "contains($1) $0"),
        function_item(range, "containsAll", "containsAll([$1]) $0"),
        function_item(range, "containsAny", "containsAny([$1]) $0"),
    ]
}

fn ipaddr_items(range: Range) -> Vec<CompletionItem> {
    vec![
        function_item(range, "isIpv4", "isIpv4() $0"),
        function_item(range, "isIpv6", "isIpv6() $0"),
        function_item(range, "isLoopback", "isLoopback() $0"),
        function_item(range, "isMulticast", "isMulticast() $0"),
        function_item(range, "isInRange", "isInRange($1) $0"),
    ]
}

fn decimal_items(range: Range) -> Vec<CompletionItem> {
    vec![
        function_item(range, "lessThan", "lessThan($1) $0"),
        function_item(range, "lessThanOrEqual", "lessThanOrEqual($1) $0"),
        function_item(range, "greaterThan", "greaterThan($1) $0"),
        function_item(range, "greaterThanOrEqual", "greaterThanOrEqual($1) $0"),
    ]
}

fn ip_constructor(range: Range) -> CompletionItem {
    function_item(range, "ip", r#"ip("${1:127.0.0.1}")$0"#)
}

fn decimal_constructor(range: Range) -> CompletionItem {
    function_item(range, "decimal", r#"decimal("${1:0.1234}")$0"#)
}

fn variable_item(range: Range, name: &str) -> CompletionItem {
    CompletionItem::new(name, CompletionKind::Variable, range)
}

fn invoke_items(range: Range) -> Vec<CompletionItem> {
    let mut items: Vec<_> = ["principal", "action", "resource", "context"]
        .into_iter()
        .map(|name| variable_item(range, name))
        .collect();
    items.push(ip_constructor(range));
    items.push(decimal_constructor(range));
    items
}

fn snippet_item(label: &str, description: &str, snippet: &str, range: Range) -> CompletionItem {
    CompletionItem::new(label, CompletionKind::Snippet, range)
        .with_description(description)
        .with_insert_text(snippet)
}

/// Statement skeletons offered for the first letter typed on a line.
fn statement_snippets(first: &str, range: Range) -> Vec<CompletionItem> {
    match first {
        "p" => vec![
            snippet_item(
                "permit",
                "permit when",
                "permit (principal, action, resource)\nwhen { ${0:Expr} };",
                range,
            ),
            snippet_item(
                "permit",
                "permit",
                "permit (\n    principal == ${1:Path}::\"${2:id}\",\n    action == Action::\"${3:id}\",\n    resource == ${4:Path}::\"${5:id}\"\n)$0;",
                range,
            ),
        ],
        "f" => vec![
            snippet_item(
                "forbid",
                "forbid when",
                "forbid (principal, action, resource)\nwhen { ${0:Expr} };",
                range,
            ),
            snippet_item(
                "forbid",
                "forbid unless",
                "forbid (principal, action, resource)\nunless { ${0:Expr} };",
                range,
            ),
        ],
        "w" => vec![snippet_item("when", "when condition", "when { ${0:Expr} }", range)],
        "u" => vec![snippet_item("unless", "unless condition", "unless { ${0:Expr} }", range)],
        _ => Vec::new(),
    }
}

/// Entity types, or actions when completing after `action`. Entity types
/// insert a literal skeleton unless only the type is wanted.
fn entity_items(schema: &SchemaIndex, element: &str, range: Range, type_only: bool) -> Vec<CompletionItem> {
    if element == "action" {
        return schema
            .records_in(SchemaCollection::Actions)
            .map(|record| CompletionItem::new(record.etype.clone(), CompletionKind::Value, range))
            .collect();
    }
    schema
        .records_in(SchemaCollection::EntityTypes)
        .map(|record| {
            let item = CompletionItem::new(record.etype.clone(), CompletionKind::Class, range);
            if type_only {
                item
            } else {
                item.with_insert_text(format!("{}::\"$1\"", record.etype))
            }
        })
        .collect()
}

/// One field per attribute. Names that are not identifiers are inserted
/// as `["name"]`, removing the `.` that triggered the completion.
fn attribute_items(pos: LineCol, owner: &str, attributes: &AttributeMap) -> Vec<CompletionItem> {
    let range = Range::empty(pos);
    attributes
        .iter()
        .map(|(key, attribute)| {
            let mut item = CompletionItem::new(key.clone(), CompletionKind::Field, range).with_description(owner);
            item.detail = Some(format!(": {}", attribute.description));
            if !is_ident(key) {
                item.insert_text = Some(format!("[\"{key}\"]"));
                if pos.col > 0 {
                    item.additional_edits.push(TextEdit {
                        range: Range::on_line(pos.line, pos.col - 1, 1),
                        new_text: String::new(),
                    });
                }
            }
            item
        })
        .collect()
}

fn trailing_range(pos: LineCol, trigger: &str) -> Range {
    let len = trigger.len() as u32;
    Range::on_line(pos.line, pos.col.saturating_sub(len), len.min(pos.col))
}

/// Whether `offset` lies directly inside a top-level object, ignoring
/// braces in strings.
fn is_top_level_object(text: &str, offset: usize) -> bool {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    for b in text.as_bytes().iter().take(offset) {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' => escaped = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => depth -= 1,
            _ => {}
        }
    }
    depth == 1
}

// ============================================================================
// Providers
// ============================================================================

impl AnalysisHost {
    /// Completion items at `pos`. Dialects without completion yield none.
    pub async fn completions(&self, doc: &Document, pos: LineCol, trigger: CompletionTrigger) -> Vec<CompletionItem> {
        match doc.dialect() {
            Some(Dialect::Policy) => {
                let Some(line) = doc.line(pos.line) else {
                    return Vec::new();
                };
                let split = (pos.col as usize).min(line.len());
                let Some((prefix, suffix)) = line.get(..split).zip(line.get(split..)) else {
                    return Vec::new();
                };
                match trigger {
                    CompletionTrigger::Character(c) => self.trigger_items(doc, pos, prefix, c).await,
                    CompletionTrigger::Invoked => self.invoked_items(doc, pos, prefix, suffix).await,
                }
            }
            Some(Dialect::Entities) => self.entity_snippets(doc, pos).await,
            _ => Vec::new(),
        }
    }

    async fn trigger_items(&self, doc: &Document, pos: LineCol, prefix: &str, trigger: char) -> Vec<CompletionItem> {
        let here = Range::empty(pos);
        match trigger {
            '.' => self.member_items(doc, pos, prefix).await,
            ':' if prefix.ends_with("::") => {
                let Some(caps) = ENTITY_PREFIX.captures(prefix) else {
                    return Vec::new();
                };
                let Some((schema, _)) = self.open_schema(&doc.uri).await else {
                    return Vec::new();
                };
                let index = self.schema_index(&schema).await;
                entity_items(&index, "", trailing_range(pos, &caps["entity"]), false)
            }
            '@' if prefix == "// @" => {
                vec![CompletionItem::new("@formatter:off", CompletionKind::Property, here).with_insert_text("formatter:off$0")]
            }
            '@' if prefix.trim() == "@" => self
                .policy_index(doc)
                .annotation_names
                .iter()
                .map(|name| {
                    CompletionItem::new(format!("@{name}"), CompletionKind::Property, here)
                        .with_insert_text(format!("{name}(\"$1\")$0"))
                })
                .collect(),
            '?' => {
                let before = prefix.strip_suffix('?').unwrap_or(prefix);
                match SCOPE_CLAUSE.captures(before) {
                    Some(caps) => {
                        let element = &caps["element"];
                        vec![
                            CompletionItem::new(format!("?{element}"), CompletionKind::Variable, here)
                                .with_insert_text(element),
                        ]
                    }
                    None => Vec::new(),
                }
            }
            _ => Vec::new(),
        }
    }

    /// Items after a `.`: extension methods on `ip(..)`/`decimal(..)`
    /// literals, attributes along a property chain, set methods after `]`.
    async fn member_items(&self, doc: &Document, pos: LineCol, prefix: &str) -> Vec<CompletionItem> {
        let here = Range::empty(pos);
        if prefix.ends_with(").") {
            if IP_CALL.is_match(prefix) {
                return ipaddr_items(here);
            }
            if DECIMAL_CALL.is_match(prefix) {
                return decimal_items(here);
            }
        }

        if let Some(chain) = trailing_property_chain(prefix) {
            let properties = split_property_chain(chain);
            if let (Some(root), Some((schema, _))) = (properties.first(), self.open_schema(&doc.uri).await) {
                let types = self.narrow_entity_types(&schema, root, doc, pos).await;
                let index = self.schema_index(&schema).await;
                let graph = &index.completions;
                if properties.len() == 1 {
                    return types
                        .iter()
                        .filter_map(|ty| graph.get(ty).map(|attrs| attribute_items(pos, ty, attrs)))
                        .flatten()
                        .collect();
                }

                let mut items = Vec::new();
                let mut seen = FxHashSet::default();
                for entity_type in &types {
                    let target = traverse_property_chain(graph, &properties, entity_type);
                    let Some(last_type) = target.last_type else {
                        continue;
                    };
                    if last_type == "Record" {
                        if let Some(attrs) = target.completion {
                            items.extend(attribute_items(pos, entity_type, attrs));
                        }
                    } else if seen.insert(last_type.clone()) {
                        if last_type.starts_with("Set<") {
                            items.extend(contains_items(here));
                        } else if last_type == "ipaddr" {
                            items.extend(ipaddr_items(here));
                        } else if last_type == "decimal" {
                            items.extend(decimal_items(here));
                        } else if !is_primitive(last_type) {
                            if let Some(attrs) = graph.get(last_type) {
                                items.extend(attribute_items(pos, last_type, attrs));
                            }
                        }
                    }
                }
                return items;
            }
        }

        if prefix.ends_with("].") {
            return contains_items(here);
        }
        Vec::new()
    }

    async fn invoked_items(&self, doc: &Document, pos: LineCol, prefix: &str, suffix: &str) -> Vec<CompletionItem> {
        let typed = Range::on_line(pos.line, pos.col.saturating_sub(1), pos.col.min(1));
        if prefix.chars().count() == 1 {
            return statement_snippets(prefix, typed);
        }

        let is_clause = IS_CLAUSE
            .captures(prefix)
            .filter(|caps| caps.get(0).is_some_and(|m| !prefix[..m.start()].ends_with('.')));
        let type_only = is_clause.is_some();
        if let Some(caps) = is_clause.or_else(|| SCOPE_CLAUSE.captures(prefix)) {
            if let Some((schema, _)) = self.open_schema(&doc.uri).await {
                let index = self.schema_index(&schema).await;
                let type_only = type_only || suffix.starts_with("::\"");
                return entity_items(&index, &caps["element"], trailing_range(pos, &caps["trigger"]), type_only);
            }
        }

        if prefix.ends_with(' ') {
            if let Some(subject) = prefix.strip_suffix(" has ") {
                return self.member_items(doc, pos, subject).await;
            }
            return invoke_items(Range::empty(pos));
        }

        let mut tail = prefix.chars().rev();
        let (Some(last), Some(penultimate)) = (tail.next(), tail.next()) else {
            return Vec::new();
        };
        if !matches!(penultimate, ' ' | '(' | '{' | '[') {
            return Vec::new();
        }
        match last {
            'p' => vec![variable_item(typed, "principal")],
            'a' => vec![variable_item(typed, "action")],
            'r' => vec![variable_item(typed, "resource")],
            'c' => vec![variable_item(typed, "context")],
            'i' if !SKIP_IP.is_match(prefix) => vec![ip_constructor(typed)],
            'd' => vec![decimal_constructor(typed)],
            _ => Vec::new(),
        }
    }

    /// Whole-entity snippets for every entity type of a valid schema.
    async fn entity_snippets(&self, doc: &Document, pos: LineCol) -> Vec<CompletionItem> {
        let Some(offset) = LineIndex::new(&doc.text).offset(pos) else {
            return Vec::new();
        };
        if !is_top_level_object(&doc.text, usize::from(offset)) {
            return Vec::new();
        }
        let Some((schema, _)) = self.open_schema(&doc.uri).await else {
            return Vec::new();
        };
        if !self.validate_schema_document(&schema, false).await {
            return Vec::new();
        }

        let index = self.schema_index(&schema).await;
        let entity_types: Vec<SmolStr> = index.entity_types().cloned().collect();
        let writer = SnippetWriter::new(&index.completions, &entity_types);
        let naming = EntityNaming::for_uri(&doc.uri);
        entity_types
            .iter()
            .map(|entity_type| {
                let entity = writer.entity(entity_type, &naming);
                // the surrounding braces are already in the document
                let body = entity
                    .strip_prefix('{')
                    .and_then(|e| e.strip_suffix('}'))
                    .unwrap_or(&entity);
                CompletionItem::new(entity_type.clone(), CompletionKind::Struct, Range::empty(pos))
                    .with_description(format!("\"{}\": {{ \"{}\": \"{entity_type}\", ...", naming.uid, naming.entity_type))
                    .with_insert_text(body)
            })
            .collect()
    }
}
