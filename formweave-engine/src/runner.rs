//! Runs the handlers attached to a composition.
//!
//! Handlers run strictly in stored order. Every run happens inside an
//! isolating boundary: a [`HandlerFailure`], an unregistered uid or a panic
//! is recorded in the report and the next handler runs regardless.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use formweave_model::{
    CleanedData, ElementEntry, FormComposition, HandlerEntry, WizardComposition,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::catalog::PluginCatalog;
use crate::plugin::{
    FormHandlerContext, HandlerFailure, HandlerResult, RequestContext, StepData,
    WizardHandlerContext,
};

/// Payload returned by a successful handler.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandlerResponse {
    pub plugin_uid: String,
    pub name: String,
    pub payload: Value,
}

/// A handler that failed, was missing or panicked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandlerError {
    pub plugin_uid: String,
    pub name: String,
    pub message: String,
}

/// Outcome of one handler run, in handler order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HandlerReport {
    pub responses: Vec<HandlerResponse>,
    pub errors: Vec<HandlerError>,
}

impl HandlerReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Failures phrased as warnings for the submitting user.
    pub fn warnings(&self) -> Vec<String> {
        self.errors
            .iter()
            .map(|e| format!("Error occurred in {}: {}.", e.name, e.message))
            .collect()
    }

    fn record(&mut self, plugin_uid: &str, name: &str, result: HandlerResult) {
        match result {
            Ok(payload) => self.responses.push(HandlerResponse {
                plugin_uid: plugin_uid.to_string(),
                name: name.to_string(),
                payload,
            }),
            Err(failure) => {
                warn!(plugin_uid = %plugin_uid, error = %failure, "Handler failed");
                self.errors.push(HandlerError {
                    plugin_uid: plugin_uid.to_string(),
                    name: name.to_string(),
                    message: failure.message,
                });
            }
        }
    }
}

pub struct HandlerRunner<'a> {
    catalog: &'a PluginCatalog,
}

impl<'a> HandlerRunner<'a> {
    pub fn new(catalog: &'a PluginCatalog) -> Self {
        Self { catalog }
    }

    pub fn run_form_handlers(
        &self,
        composition: &FormComposition,
        request: &RequestContext,
        cleaned_data: &CleanedData,
        elements: &[ElementEntry],
        handlers: &[HandlerEntry],
    ) -> HandlerReport {
        let mut report = HandlerReport::default();
        for entry in handlers {
            let plugin = match self.catalog.handlers().get(&entry.plugin_uid) {
                Ok(plugin) => plugin,
                Err(_) => {
                    report.record(&entry.plugin_uid, &entry.plugin_uid, Err(unregistered(entry)));
                    continue;
                }
            };
            let ctx = FormHandlerContext {
                composition,
                request,
                plugin_data: &entry.plugin_data,
                cleaned_data,
                elements,
            };
            let result = isolate(|| plugin.run(ctx));
            report.record(&entry.plugin_uid, plugin.name(), result);
        }
        info!(
            composition = %composition.slug,
            succeeded = report.responses.len(),
            failed = report.errors.len(),
            "Form handlers finished"
        );
        report
    }

    pub fn run_wizard_handlers(
        &self,
        wizard: &WizardComposition,
        request: &RequestContext,
        steps: &[StepData],
        elements: &[ElementEntry],
        handlers: &[HandlerEntry],
    ) -> HandlerReport {
        let mut report = HandlerReport::default();
        for entry in handlers {
            let plugin = match self.catalog.wizard_handlers().get(&entry.plugin_uid) {
                Ok(plugin) => plugin,
                Err(_) => {
                    report.record(&entry.plugin_uid, &entry.plugin_uid, Err(unregistered(entry)));
                    continue;
                }
            };
            let ctx = WizardHandlerContext {
                wizard,
                request,
                plugin_data: &entry.plugin_data,
                steps,
                elements,
            };
            let result = isolate(|| plugin.run(ctx));
            report.record(&entry.plugin_uid, plugin.name(), result);
        }
        info!(
            wizard = %wizard.slug,
            succeeded = report.responses.len(),
            failed = report.errors.len(),
            "Wizard handlers finished"
        );
        report
    }
}

fn unregistered(entry: &HandlerEntry) -> HandlerFailure {
    HandlerFailure::new(format!("plugin '{}' is not registered", entry.plugin_uid))
}

fn isolate(run: impl FnOnce() -> HandlerResult) -> HandlerResult {
    panic::catch_unwind(AssertUnwindSafe(run))
        .unwrap_or_else(|payload| Err(HandlerFailure::new(panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("handler panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("handler panicked: {s}")
    } else {
        "handler panicked".to_string()
    }
}
