//! The engine facade: one catalog, one store and one configuration shared by
//! the request-scoped services.

use std::sync::Arc;

use formweave_storage::CompositionStore;

use crate::access::AccessPolicy;
use crate::assembler::FormAssembler;
use crate::catalog::PluginCatalog;
use crate::composer::Composer;
use crate::config::EngineConfig;
use crate::runner::HandlerRunner;
use crate::submission::FormProcessor;
use crate::transfer::Transfer;
use crate::wizard::WizardOrchestrator;

pub struct FormEngine {
    catalog: Arc<PluginCatalog>,
    store: Arc<dyn CompositionStore>,
    config: EngineConfig,
    policy: AccessPolicy,
}

impl FormEngine {
    pub fn new(
        catalog: Arc<PluginCatalog>,
        store: Arc<dyn CompositionStore>,
        config: EngineConfig,
    ) -> Self {
        let policy = AccessPolicy::new(&config.access);
        Self {
            catalog,
            store,
            config,
            policy,
        }
    }

    pub fn catalog(&self) -> &PluginCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &dyn CompositionStore {
        self.store.as_ref()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    pub fn assembler(&self) -> FormAssembler<'_> {
        FormAssembler::new(&self.catalog, self.config.assembly)
    }

    pub fn runner(&self) -> HandlerRunner<'_> {
        HandlerRunner::new(&self.catalog)
    }

    /// Rendering and submission of single forms.
    pub fn forms(&self) -> FormProcessor<'_> {
        FormProcessor::new(self)
    }

    pub fn wizards(&self) -> WizardOrchestrator<'_> {
        WizardOrchestrator::new(self)
    }

    /// Composition and entry lifecycle for form owners.
    pub fn composer(&self) -> Composer<'_> {
        Composer::new(self)
    }

    /// JSON import and export of form compositions.
    pub fn transfer(&self) -> Transfer<'_> {
        Transfer::new(self)
    }
}
