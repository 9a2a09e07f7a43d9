//! Engine configuration, read from a TOML file.
//!
//! ```toml
//! [assembly]
//! missing-plugin = "skip"
//! duplicate-field = "reject"
//!
//! [access]
//! mode = "allowlist"
//! plugins = ["text", "email"]
//!
//! [access.groups]
//! staff = ["db_store", "mail"]
//!
//! [media]
//! root = "media/formweave"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::access::AccessConfig;
use crate::error::{EngineError, EngineResult};

/// What the assembler does with an entry whose plugin is not registered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingPluginPolicy {
    /// Leave the entry out and record a warning.
    #[default]
    Skip,
    /// Fail the whole assembly.
    Abort,
}

/// What the assembler does when two elements produce the same field name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicateFieldPolicy {
    #[default]
    Reject,
    /// Keep the field of the later entry and record a warning.
    LastWins,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AssemblyConfig {
    pub missing_plugin: MissingPluginPolicy,
    pub duplicate_field: DuplicateFieldPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Directory element plugins store uploaded files under.
    pub root: PathBuf,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("media/formweave"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub assembly: AssemblyConfig,
    pub access: AccessConfig,
    pub media: MediaConfig,
}

impl EngineConfig {
    /// Loads configuration from `path`. Falls back to defaults when the file
    /// is missing or cannot be parsed.
    pub fn load_from(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            info!("No engine config found at {:?}, using defaults", path);
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(contents) => match Self::from_toml_str(&contents) {
                Ok(config) => {
                    info!("Loaded engine config from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!("{}. Falling back to defaults for {:?}.", e, path);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read engine config {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    pub fn from_toml_str(contents: &str) -> EngineResult<Self> {
        toml::from_str(contents).map_err(|e| EngineError::Config(e.to_string()))
    }

    pub fn with_assembly(mut self, assembly: AssemblyConfig) -> Self {
        self.assembly = assembly;
        self
    }

    pub fn with_access(mut self, access: AccessConfig) -> Self {
        self.access = access;
        self
    }

    pub fn with_media_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.media.root = root.into();
        self
    }
}
