//! Type narrowing by probing the oracle.
//!
//! There is no schema-introspection call, so admissible types are recovered
//! by validating deliberately ill-typed throwaway policies and reading the
//! names back out of the errors. Using a scope variable as a `when`
//! condition yields one "unexpected type" error per entity type the scope
//! can take; reading an absent context attribute yields one "not found"
//! error per applicable action.

use std::sync::LazyLock;

use regex::Regex;
use smol_str::SmolStr;
use tracing::{debug, warn};

use super::messages::{self, OracleMessage};
use super::{SchemaSource, ValidationOracle};
use crate::hir::records::EntityTypes;

/// Probe head used when no policy head is available.
pub const DEFAULT_HEAD: &str = "permit (principal, action, resource)";

static EFFECT_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:permit|forbid)\s*\(").expect("effect regex is valid"));

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ProbeScope {
    Principal,
    Resource,
    Action,
}

impl ProbeScope {
    /// The condition placed in the probe's `when` clause.
    fn condition(self) -> &'static str {
        match self {
            Self::Principal => "principal",
            Self::Resource => "resource",
            Self::Action => "context.__vscode__",
        }
    }

    fn mine(self, error: &str) -> Option<SmolStr> {
        match self {
            Self::Action => match messages::context_attribute_not_found(error)? {
                OracleMessage::ContextAttributeNotFound { action } => Some(action),
                _ => None,
            },
            Self::Principal | Self::Resource => match messages::unexpected_type(error)? {
                OracleMessage::UnexpectedType { entity_type } => Some(entity_type),
                _ => None,
            },
        }
    }
}

/// Whether `pos` lies outside string literals and line comments.
fn is_code(text: &str, pos: usize) -> bool {
    let bytes = text.as_bytes();
    let mut in_string = false;
    let mut i = 0;
    while i < pos {
        match bytes[i] {
            b'\\' if in_string => i += 1,
            b'"' => in_string = !in_string,
            b'/' if !in_string && bytes.get(i + 1) == Some(&b'/') => {
                match text[i..].find('\n') {
                    Some(newline) if i + newline < pos => i += newline,
                    _ => return false,
                }
            }
            _ => {}
        }
        i += 1;
    }
    !in_string
}

/// The `permit (...)` / `forbid (...)` head of a policy, from the effect
/// keyword through its balanced closing parenthesis.
pub fn policy_head(policy: &str) -> Option<&str> {
    let open = EFFECT_OPEN.find_iter(policy).find(|m| is_code(policy, m.start()))?;
    let bytes = policy.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut i = open.end() - 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if in_string => i += 1,
            b'"' => in_string = !in_string,
            b'(' if !in_string => depth += 1,
            b')' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&policy[open.start()..=i]);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Entity types (or, for [`ProbeScope::Action`], action literals)
/// admissible in `scope` under `head`, sorted. Empty when the oracle fails
/// or its wording no longer matches.
pub async fn determine_entity_types(
    oracle: &dyn ValidationOracle,
    schema: &SchemaSource,
    scope: ProbeScope,
    head: &str,
) -> Vec<SmolStr> {
    let probe = format!("{head} when {{ {} }};", scope.condition());
    let outcome = match oracle.validate_policy(schema, &probe).await {
        Ok(outcome) => outcome,
        Err(err) => {
            warn!(?scope, error = %err, "narrowing probe failed");
            return Vec::new();
        }
    };
    if outcome.success {
        return Vec::new();
    }
    let mut types: Vec<SmolStr> = outcome.errors.iter().filter_map(|e| scope.mine(e)).collect();
    if types.is_empty() && !outcome.errors.is_empty() {
        warn!(
            ?scope,
            first = %outcome.errors[0],
            "narrowing probe errors matched no known message shape"
        );
    }
    types.sort();
    debug!(?scope, head, count = types.len(), "narrowed entity types");
    types
}

/// All three scopes under one head.
pub async fn determine_all(oracle: &dyn ValidationOracle, schema: &SchemaSource, head: &str) -> EntityTypes {
    EntityTypes {
        principals: determine_entity_types(oracle, schema, ProbeScope::Principal, head).await,
        resources: determine_entity_types(oracle, schema, ProbeScope::Resource, head).await,
        actions: determine_entity_types(oracle, schema, ProbeScope::Action, head).await,
    }
}
