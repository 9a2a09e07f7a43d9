//! Error types for the engine.

use formweave_storage::StorageError;
use thiserror::Error;

use crate::callbacks::CallbackStage;
use crate::plugin::PluginError;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("plugin not registered: {0}")]
    UnknownPlugin(String),

    #[error("plugin uid already registered: {0}")]
    DuplicateUid(String),

    /// The user may not use this plugin. Reported like a missing plugin so
    /// callers do not leak which plugins exist.
    #[error("plugin does not exist or you are not allowed to use this plugin: {uid}")]
    Entitlement { uid: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("the {name} plugin can be used only once in a form")]
    HandlerAlreadyAttached { uid: String, name: String },

    #[error("duplicate field name '{name}' in assembled form")]
    DuplicateFieldName { name: String },

    #[error("integrity conflict: {0}")]
    IntegrityConflict(String),

    #[error("form wizard '{0}' does not contain any forms")]
    EmptyWizard(String),

    #[error("invalid wizard state: {0}")]
    WizardState(String),

    #[error("callback '{callback}' failed at {stage:?}: {message}")]
    Callback {
        callback: String,
        stage: CallbackStage,
        message: String,
    },

    #[error("plugin '{uid}' failed: {source}")]
    Plugin {
        uid: String,
        #[source]
        source: PluginError,
    },

    #[error("plugin catalog already installed")]
    CatalogInstalled,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(StorageError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    /// Whether the caller should answer with a plain "not found".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::Entitlement { .. } | Self::UnknownPlugin(_)
        )
    }

    pub(crate) fn plugin(uid: &str, source: PluginError) -> Self {
        Self::Plugin {
            uid: uid.to_string(),
            source,
        }
    }
}

impl From<StorageError> for EngineError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(what) => Self::NotFound(what),
            StorageError::IntegrityConflict(detail) => Self::IntegrityConflict(detail),
            other => Self::Storage(other),
        }
    }
}
