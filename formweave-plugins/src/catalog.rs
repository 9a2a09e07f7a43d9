//! Registration of the built-in plugins.

use std::path::PathBuf;
use std::sync::Arc;

use formweave_engine::{CatalogBuilder, EngineResult, MediaConfig, PluginCatalog};
use formweave_storage::SubmissionStore;
use tracing::info;

use crate::elements::{FileElement, InputElement, InputKind, SelectElement, SliderElement};
use crate::handlers::{DbStoreHandler, HttpRepostHandler, MailHandler, Mailer};

/// Collaborators the built-in plugins need.
#[derive(Clone)]
pub struct Builtins {
    pub submissions: Arc<dyn SubmissionStore>,
    pub mailer: Arc<dyn Mailer>,
    pub media_root: PathBuf,
}

impl Builtins {
    pub fn new(submissions: Arc<dyn SubmissionStore>, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            submissions,
            mailer,
            media_root: MediaConfig::default().root,
        }
    }

    pub fn with_media_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.media_root = root.into();
        self
    }
}

/// Registers every built-in plugin. Fails if a uid is already taken.
pub fn register_builtins(builder: &mut CatalogBuilder, builtins: &Builtins) -> EngineResult<()> {
    for kind in InputKind::ALL {
        builder.element(InputElement::new(kind))?;
    }
    builder
        .element(SelectElement::new())?
        .element(SliderElement::new())?
        .element(FileElement::new(builtins.media_root.clone()))?;

    builder
        .handler(DbStoreHandler::new(Arc::clone(&builtins.submissions)))?
        .handler(MailHandler::new(Arc::clone(&builtins.mailer)))?
        .handler(HttpRepostHandler::new())?;

    builder
        .wizard_handler(DbStoreHandler::new(Arc::clone(&builtins.submissions)))?
        .wizard_handler(MailHandler::new(Arc::clone(&builtins.mailer)))?;

    info!(media_root = %builtins.media_root.display(), "Built-in plugins registered");
    Ok(())
}

/// A catalog holding only the built-in plugins.
pub fn default_catalog(builtins: &Builtins) -> EngineResult<PluginCatalog> {
    let mut builder = CatalogBuilder::new();
    register_builtins(&mut builder, builtins)?;
    Ok(builder.build())
}
