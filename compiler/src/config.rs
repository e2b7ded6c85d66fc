use std::fs;
use std::path::Path;
use serde::{Deserialize, Serialize};

use crate::error::BambamError;

pub const DEFAULT_SCHEMA_SUFFIX: &str = "Capn";
pub const DEFAULT_CAPN_IMPORT: &str = "github.com/glycerine/go-capnproto";

/// Settings for one generator run. Every field has a default, so a config
/// file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Appended to each record name to form its schema name.
    pub schema_suffix: String,
    /// Go package of the generated code; defaults to the input's package.
    pub go_package:    Option<String>,
    /// Value of `$Go.import`; defaults to the Go package name.
    pub go_import:     Option<String>,
    /// Schema file id; derived from the package and record names when unset.
    pub file_id:       Option<u64>,
    /// Import path of the capn runtime package.
    pub capn_import:   String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            schema_suffix: DEFAULT_SCHEMA_SUFFIX.to_string(),
            go_package:    None,
            go_import:     None,
            file_id:       None,
            capn_import:   DEFAULT_CAPN_IMPORT.to_string(),
        }
    }
}

impl GeneratorConfig {
    pub fn from_json(text: &str) -> Result<Self, BambamError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, BambamError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn package_for(&self, source_package: &str) -> String {
        self.go_package
            .clone()
            .unwrap_or_else(|| source_package.to_string())
    }

    pub fn import_for(&self, package: &str) -> String {
        self.go_import.clone().unwrap_or_else(|| package.to_string())
    }
}
