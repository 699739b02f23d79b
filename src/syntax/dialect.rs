//! Document dialects and filename-based detection.

use crate::base::DocUri;

/// The kinds of document the index understands.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// Policy language text (`.cedar`).
    Policy,
    /// JSON-encoded policy set (`*.cedar.json`).
    PolicyJson,
    /// JSON-form schema.
    SchemaJson,
    /// Human-readable schema (`.cedarschema`).
    SchemaHuman,
    /// Entity collection.
    Entities,
    /// Template links.
    TemplateLinks,
    /// Authorization request.
    AuthRequest,
}

impl Dialect {
    /// Pick the dialect for a document from its file name.
    pub fn detect(uri: &DocUri) -> Option<Dialect> {
        Self::from_file_name(uri.file_name())
    }

    pub fn from_file_name(name: &str) -> Option<Dialect> {
        let name = name.to_ascii_lowercase();
        let dialect = if is_suffix_of(&name, "cedarschema.json") {
            Dialect::SchemaJson
        } else if name.ends_with(".cedarschema") {
            Dialect::SchemaHuman
        } else if is_suffix_of(&name, "cedarentities.json") || name == "avpentities.json" {
            Dialect::Entities
        } else if name == "cedartemplatelinks.json" || name == "cedarlinks.json" {
            Dialect::TemplateLinks
        } else if name == "cedarauth.json" || name == "cedarparc.json" {
            Dialect::AuthRequest
        } else if name.ends_with(".cedar.json") {
            Dialect::PolicyJson
        } else if name.ends_with(".cedar") {
            Dialect::Policy
        } else {
            return None;
        };
        Some(dialect)
    }

    pub fn is_schema(self) -> bool {
        matches!(self, Dialect::SchemaJson | Dialect::SchemaHuman)
    }

    pub fn is_json(self) -> bool {
        !matches!(self, Dialect::Policy | Dialect::SchemaHuman)
    }
}

/// `name` is exactly `suffix` or ends with `.suffix`.
fn is_suffix_of(name: &str, suffix: &str) -> bool {
    name == suffix
        || name
            .strip_suffix(suffix)
            .is_some_and(|rest| rest.ends_with('.'))
}

/// Key names used to encode entity uids in an entities document.
///
/// One vendor serializes entities with its own naming; the scheme is chosen
/// once per document from the file name.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EntityNaming {
    pub uid: &'static str,
    pub entity_type: &'static str,
    pub entity_id: &'static str,
    /// Wrapper key for entity references inside attribute values.
    pub entity_escape: &'static str,
    pub attrs: &'static str,
    pub parents: &'static str,
}

impl EntityNaming {
    pub const CEDAR: EntityNaming = EntityNaming {
        uid: "uid",
        entity_type: "type",
        entity_id: "id",
        entity_escape: "__entity",
        attrs: "attrs",
        parents: "parents",
    };

    pub const AVP: EntityNaming = EntityNaming {
        uid: "identifier",
        entity_type: "entityType",
        entity_id: "entityId",
        entity_escape: "entityIdentifier",
        attrs: "attributes",
        parents: "parents",
    };

    pub fn for_uri(uri: &DocUri) -> EntityNaming {
        if uri.file_name().eq_ignore_ascii_case("avpentities.json") {
            Self::AVP
        } else {
            Self::CEDAR
        }
    }
}

impl Default for EntityNaming {
    fn default() -> Self {
        Self::CEDAR
    }
}
