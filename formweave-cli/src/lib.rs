//! Checks form export documents against the built-in plugins and runs test
//! submissions through the full pipeline, all against an in-memory store.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use formweave_engine::{
    AssemblyWarning, EngineConfig, FormEngine, HandlerResponse, ImportReport, RequestContext,
    SubmissionOutcome, User,
};
use formweave_model::{CleanedData, FormInput};
use formweave_plugins::{Builtins, EmailMessage, MemoryOutbox, default_catalog};
use formweave_storage::{CompositionStore, MemoryStore};
use formweave_types::UserId;
use serde::Serialize;

/// What `check` found in an export document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckReport {
    pub name: String,
    pub slug: String,
    /// Field names in render order.
    pub fields: Vec<String>,
    pub handlers: Vec<String>,
    /// Import and assembly warnings.
    pub warnings: Vec<String>,
}

/// Result of a test submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmitReport {
    pub valid: bool,
    pub errors: BTreeMap<String, Vec<String>>,
    pub cleaned: Option<CleanedData>,
    pub responses: Vec<HandlerResponse>,
    pub warnings: Vec<String>,
    /// Mail the `mail` handlers would have sent.
    pub mails: Vec<EmailMessage>,
}

/// An engine over an in-memory store with the built-in plugins.
pub struct Workbench {
    engine: FormEngine,
    store: Arc<MemoryStore>,
    outbox: Arc<MemoryOutbox>,
    operator: User,
}

impl Workbench {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let store = Arc::new(MemoryStore::open_in_memory());
        let outbox = Arc::new(MemoryOutbox::new());
        let builtins = Builtins::new(store.clone(), outbox.clone())
            .with_media_root(config.media.root.clone());
        let catalog = default_catalog(&builtins).context("registering built-in plugins")?;
        let engine = FormEngine::new(Arc::new(catalog), store.clone(), config);
        Ok(Self {
            engine,
            store,
            outbox,
            operator: User::new(UserId::new()),
        })
    }

    pub fn engine(&self) -> &FormEngine {
        &self.engine
    }

    fn request(&self) -> RequestContext {
        RequestContext::for_user(self.operator.clone()).with_meta("source", "formweave-cli")
    }

    fn import(&self, export_json: &str) -> Result<ImportReport> {
        self.engine
            .transfer()
            .import_form_json(&self.operator, export_json)
            .context("importing form export")
    }

    /// Imports the export and assembles the resulting form.
    pub fn check(&self, export_json: &str) -> Result<CheckReport> {
        let import = self.import(export_json)?;
        let elements = self.store.elements(import.form.id)?;
        let assembled = self
            .engine
            .assembler()
            .assemble(&elements, None, &self.request())
            .context("assembling imported form")?;

        let mut warnings = import.warnings;
        warnings.extend(assembled.warnings().iter().map(describe));
        Ok(CheckReport {
            name: import.form.name,
            slug: import.form.slug.to_string(),
            fields: assembled
                .field_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
            handlers: import.handlers.into_iter().map(|h| h.plugin_uid).collect(),
            warnings,
        })
    }

    /// Imports the export and submits `data_json` to it.
    pub fn submit(&self, export_json: &str, data_json: &str) -> Result<SubmitReport> {
        let import = self.import(export_json)?;
        let data: serde_json::Value =
            serde_json::from_str(data_json).context("parsing submission data")?;
        if !data.is_object() {
            bail!("submission data must be a JSON object");
        }

        let outcome = self
            .engine
            .forms()
            .submit(import.form.slug.as_str(), &self.request(), FormInput::from_json(data))
            .context("running submission")?;

        let mut warnings = import.warnings;
        let report = match outcome {
            SubmissionOutcome::Submitted {
                form,
                report,
                warnings: assembly,
            } => {
                warnings.extend(assembly.iter().map(describe));
                warnings.extend(report.warnings());
                SubmitReport {
                    valid: true,
                    errors: BTreeMap::new(),
                    cleaned: form.into_cleaned_data(),
                    responses: report.responses,
                    warnings,
                    mails: self.outbox.sent(),
                }
            }
            SubmissionOutcome::Invalid {
                form,
                warnings: assembly,
            } => {
                warnings.extend(assembly.iter().map(describe));
                let mut errors = form.errors().clone();
                if !form.non_field_errors().is_empty() {
                    errors.insert("__all__".into(), form.non_field_errors().to_vec());
                }
                SubmitReport {
                    valid: false,
                    errors,
                    cleaned: None,
                    responses: Vec::new(),
                    warnings,
                    mails: Vec::new(),
                }
            }
        };
        Ok(report)
    }
}

fn describe(warning: &AssemblyWarning) -> String {
    match warning {
        AssemblyWarning::MissingPlugin { plugin_uid, .. } => {
            format!("Plugin {plugin_uid} is missing in the system.")
        }
        AssemblyWarning::InvalidPluginData {
            plugin_uid,
            message,
            ..
        } => format!("Element {plugin_uid} skipped: {message}."),
        AssemblyWarning::DuplicateField { name, .. } => {
            format!("Field {name} is defined more than once; the last definition is used.")
        }
    }
}
