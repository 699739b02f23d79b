//! Finding the schema a document validates against.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::base::DocUri;
use crate::config::IndexConfig;
use crate::syntax::Dialect;

/// Where a located schema came from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SchemaOrigin {
    /// The only schema file in the document's folder.
    Folder,
    /// The only schema file at the workspace root.
    Workspace,
    /// `schema_file` from the configuration.
    Configured,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchemaLocation {
    pub uri: DocUri,
    pub origin: SchemaOrigin,
}

impl SchemaLocation {
    /// Informational note shown with a document's diagnostics.
    pub fn note(&self) -> Option<String> {
        let name = self.uri.file_name();
        match self.origin {
            SchemaOrigin::Folder => Some(format!("Validated with folder Cedar schema: {name}")),
            SchemaOrigin::Workspace => Some(format!("Validated with workspace Cedar schema: {name}")),
            SchemaOrigin::Configured => None,
        }
    }
}

/// Resolves documents to schema files on disk.
#[derive(Clone, Debug, Default)]
pub struct SchemaLocator {
    workspace_root: Option<PathBuf>,
    config: IndexConfig,
}

impl SchemaLocator {
    pub fn new(config: IndexConfig) -> Self {
        Self {
            workspace_root: None,
            config,
        }
    }

    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = Some(root.into());
        self
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Schema for `document`. Autodetection beats the configured file, but
    /// only when exactly one candidate exists in the folder searched.
    pub fn locate(&self, document: &DocUri) -> Option<SchemaLocation> {
        if self.config.autodetect_schema_file {
            let folder = document.to_file_path().and_then(|p| p.parent().map(Path::to_path_buf));
            if let Some(found) = folder.as_deref().and_then(single_schema_in) {
                return Some(SchemaLocation {
                    uri: DocUri::from_file_path(&found),
                    origin: SchemaOrigin::Folder,
                });
            }
            if let Some(found) = self.workspace_root.as_deref().and_then(single_schema_in) {
                return Some(SchemaLocation {
                    uri: DocUri::from_file_path(&found),
                    origin: SchemaOrigin::Workspace,
                });
            }
        }
        let root = self.workspace_root.as_ref()?;
        let configured = self.config.schema_file.as_ref()?;
        Some(SchemaLocation {
            uri: DocUri::from_file_path(&root.join(configured)),
            origin: SchemaOrigin::Configured,
        })
    }
}

/// Schema files directly inside `dir`, sorted by name.
pub fn schema_files_in(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        debug!(dir = %dir.display(), "schema folder unreadable");
        return Vec::new();
    };
    let mut found: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .and_then(Dialect::from_file_name)
                .is_some_and(Dialect::is_schema)
        })
        .collect();
    found.sort();
    found
}

fn single_schema_in(dir: &Path) -> Option<PathBuf> {
    let mut found = schema_files_in(dir);
    if found.len() == 1 { found.pop() } else { None }
}
