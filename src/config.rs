//! Index configuration, read from a TOML file.
//!
//! ```toml
//! schema_file = "policies/cedarschema.json"
//! autodetect_schema_file = true
//! probe_head = "permit (principal, action, resource)"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::oracle::DEFAULT_HEAD;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Workspace-relative schema used when autodetection finds nothing.
    pub schema_file: Option<PathBuf>,
    /// Look for a single schema file next to the document, then at the
    /// workspace root, before falling back to `schema_file`.
    pub autodetect_schema_file: bool,
    /// Policy head used for schema-level narrowing probes.
    pub probe_head: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            schema_file: None,
            autodetect_schema_file: true,
            probe_head: DEFAULT_HEAD.to_owned(),
        }
    }
}

impl IndexConfig {
    /// Load from `config_path`. A missing file is `Ok(None)`.
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| ConfigError::Io {
            path: config_path.to_path_buf(),
            source,
        })?;

        let config = Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: config_path.to_path_buf(),
            source,
        })?;
        Ok(Some(config))
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn with_schema_file(mut self, schema_file: impl Into<PathBuf>) -> Self {
        self.schema_file = Some(schema_file.into());
        self
    }

    pub fn with_autodetect(mut self, autodetect: bool) -> Self {
        self.autodetect_schema_file = autodetect;
        self
    }
}
