//! The set of all registered plugins and callbacks.
//!
//! Built once with [`CatalogBuilder`] and read-only afterwards. A process
//! may install one catalog globally with [`install_global`]; tests and tools
//! usually pass an owned catalog around instead.

use std::sync::{Arc, OnceLock};

use tracing::info;

use crate::callbacks::{CallbackRegistry, FormCallback};
use crate::error::{EngineError, EngineResult};
use crate::plugin::{ElementPlugin, HandlerPlugin, WizardHandlerPlugin};
use crate::registry::Registry;

pub struct PluginCatalog {
    elements: Registry<dyn ElementPlugin>,
    handlers: Registry<dyn HandlerPlugin>,
    wizard_handlers: Registry<dyn WizardHandlerPlugin>,
    callbacks: CallbackRegistry,
}

impl PluginCatalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::new()
    }

    pub fn elements(&self) -> &Registry<dyn ElementPlugin> {
        &self.elements
    }

    pub fn handlers(&self) -> &Registry<dyn HandlerPlugin> {
        &self.handlers
    }

    pub fn wizard_handlers(&self) -> &Registry<dyn WizardHandlerPlugin> {
        &self.wizard_handlers
    }

    pub fn callbacks(&self) -> &CallbackRegistry {
        &self.callbacks
    }
}

pub struct CatalogBuilder {
    elements: Registry<dyn ElementPlugin>,
    handlers: Registry<dyn HandlerPlugin>,
    wizard_handlers: Registry<dyn WizardHandlerPlugin>,
    callbacks: CallbackRegistry,
}

impl Default for CatalogBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self {
            elements: Registry::new("element"),
            handlers: Registry::new("handler"),
            wizard_handlers: Registry::new("wizard-handler"),
            callbacks: CallbackRegistry::new(),
        }
    }

    pub fn element(&mut self, plugin: impl ElementPlugin + 'static) -> EngineResult<&mut Self> {
        self.elements.register(Arc::new(plugin))?;
        Ok(self)
    }

    pub fn handler(&mut self, plugin: impl HandlerPlugin + 'static) -> EngineResult<&mut Self> {
        self.handlers.register(Arc::new(plugin))?;
        Ok(self)
    }

    pub fn wizard_handler(
        &mut self,
        plugin: impl WizardHandlerPlugin + 'static,
    ) -> EngineResult<&mut Self> {
        self.wizard_handlers.register(Arc::new(plugin))?;
        Ok(self)
    }

    /// Replaces an already registered element plugin with the same uid.
    pub fn override_element(&mut self, plugin: impl ElementPlugin + 'static) -> &mut Self {
        self.elements.register_override(Arc::new(plugin));
        self
    }

    pub fn override_handler(&mut self, plugin: impl HandlerPlugin + 'static) -> &mut Self {
        self.handlers.register_override(Arc::new(plugin));
        self
    }

    pub fn callback(&mut self, callback: impl FormCallback + 'static) -> &mut Self {
        self.callbacks.register(Arc::new(callback));
        self
    }

    pub fn build(self) -> PluginCatalog {
        info!(
            elements = self.elements.len(),
            handlers = self.handlers.len(),
            wizard_handlers = self.wizard_handlers.len(),
            "Plugin catalog built"
        );
        PluginCatalog {
            elements: self.elements,
            handlers: self.handlers,
            wizard_handlers: self.wizard_handlers,
            callbacks: self.callbacks,
        }
    }
}

static GLOBAL: OnceLock<Arc<PluginCatalog>> = OnceLock::new();

/// Installs the process-wide catalog. Only the first call succeeds.
pub fn install_global(catalog: PluginCatalog) -> EngineResult<Arc<PluginCatalog>> {
    let catalog = Arc::new(catalog);
    GLOBAL
        .set(Arc::clone(&catalog))
        .map_err(|_| EngineError::CatalogInstalled)?;
    Ok(catalog)
}

/// The process-wide catalog, if installed.
pub fn global() -> Option<Arc<PluginCatalog>> {
    GLOBAL.get().cloned()
}
