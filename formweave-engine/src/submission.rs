//! The single-form submission pipeline.
//!
//! 1. `BeforeValidation` callbacks
//! 2. validation; invalid forms go through `Invalid` callbacks and stop
//! 3. `ValidBeforeHandlers` callbacks
//! 4. element form-submission hooks
//! 5. `Valid` callbacks
//! 6. handlers, with failures collected as warnings
//! 7. `ValidAfterHandlers` callbacks

use formweave_model::{
    BoundForm, CleanedData, ElementEntry, FormComposition, FormInput, HandlerEntry,
};
use tracing::debug;

use crate::assembler::{AssembledForm, AssemblyWarning};
use crate::callbacks::CallbackStage;
use crate::catalog::PluginCatalog;
use crate::engine::FormEngine;
use crate::error::{EngineError, EngineResult};
use crate::plugin::RequestContext;
use crate::runner::HandlerReport;

/// A form ready to display.
#[derive(Debug, Clone)]
pub struct RenderedForm {
    pub composition: FormComposition,
    pub assembled: AssembledForm,
    pub form: BoundForm,
}

#[derive(Debug, Clone)]
pub enum SubmissionOutcome {
    /// The data was valid and handlers ran. Handler failures are in
    /// `report.errors`; the submission itself still succeeded.
    Submitted {
        form: BoundForm,
        report: HandlerReport,
        warnings: Vec<AssemblyWarning>,
    },
    /// Re-render `form`, which carries the per-field errors.
    Invalid {
        form: BoundForm,
        warnings: Vec<AssemblyWarning>,
    },
}

impl SubmissionOutcome {
    pub fn is_submitted(&self) -> bool {
        matches!(self, Self::Submitted { .. })
    }

    pub fn form(&self) -> &BoundForm {
        match self {
            Self::Submitted { form, .. } | Self::Invalid { form, .. } => form,
        }
    }

    pub fn report(&self) -> Option<&HandlerReport> {
        match self {
            Self::Submitted { report, .. } => Some(report),
            Self::Invalid { .. } => None,
        }
    }
}

pub struct FormProcessor<'a> {
    engine: &'a FormEngine,
}

impl<'a> FormProcessor<'a> {
    pub(crate) fn new(engine: &'a FormEngine) -> Self {
        Self { engine }
    }

    /// Loads a form the requester may see. Invisible forms read as missing.
    pub fn visible_form(&self, slug: &str, request: &RequestContext) -> EngineResult<FormComposition> {
        let composition = self.engine.store().get_form_by_slug(slug)?;
        if !composition.visible_to(request.user_id()) {
            return Err(EngineError::NotFound(format!("form {slug}")));
        }
        Ok(composition)
    }

    /// Assembles a form for display, prefilled with `initial`.
    pub fn render(
        &self,
        slug: &str,
        request: &RequestContext,
        initial: Option<&CleanedData>,
    ) -> EngineResult<RenderedForm> {
        let composition = self.visible_form(slug, request)?;
        let elements = self.engine.store().elements(composition.id)?;
        let assembled = self.engine.assembler().assemble(&elements, initial, request)?;
        let form = assembled.unbound();
        Ok(RenderedForm {
            composition,
            assembled,
            form,
        })
    }

    /// Validates `input` against the form called `slug` and runs its handlers.
    pub fn submit(
        &self,
        slug: &str,
        request: &RequestContext,
        input: FormInput,
    ) -> EngineResult<SubmissionOutcome> {
        let composition = self.visible_form(slug, request)?;
        let elements = self.engine.store().elements(composition.id)?;
        let handlers = self.engine.store().handlers(composition.id)?;
        self.process(&composition, &elements, &handlers, request, input)
    }

    /// Runs the pipeline over already loaded entries.
    ///
    /// Validity is decided once, after `BeforeValidation`. Errors that
    /// `ValidBeforeHandlers` or `Valid` callbacks add later do not stop the
    /// handlers: they receive the cleaned data without the rejected fields
    /// and the outcome is still `Submitted`. Reject a submission from
    /// `BeforeValidation` instead.
    pub fn process(
        &self,
        composition: &FormComposition,
        elements: &[ElementEntry],
        handlers: &[HandlerEntry],
        request: &RequestContext,
        input: FormInput,
    ) -> EngineResult<SubmissionOutcome> {
        let assembled = self.engine.assembler().assemble(elements, None, request)?;
        let warnings = assembled.warnings().to_vec();
        let callbacks = self.engine.catalog().callbacks();

        let mut form = assembled.bind(input);
        form = callbacks.fire(CallbackStage::BeforeValidation, composition, request, form)?;

        if !form.is_valid() {
            debug!(composition = %composition.slug, errors = form.errors().len(), "Submission invalid");
            let form = callbacks.fire(CallbackStage::Invalid, composition, request, form)?;
            return Ok(SubmissionOutcome::Invalid { form, warnings });
        }

        form = callbacks.fire(CallbackStage::ValidBeforeHandlers, composition, request, form)?;
        submit_plugin_form_data(self.engine.catalog(), elements, &mut form, request)?;
        form = callbacks.fire(CallbackStage::Valid, composition, request, form)?;

        let cleaned = form.cleaned_data().cloned().unwrap_or_default();
        let report = self.engine.runner().run_form_handlers(
            composition,
            request,
            &cleaned,
            elements,
            handlers,
        );

        form = callbacks.fire(CallbackStage::ValidAfterHandlers, composition, request, form)?;
        Ok(SubmissionOutcome::Submitted {
            form,
            report,
            warnings,
        })
    }
}

/// Lets every registered element plugin post-process the valid form.
/// Elements whose plugin is gone were already skipped at assembly.
pub(crate) fn submit_plugin_form_data(
    catalog: &PluginCatalog,
    elements: &[ElementEntry],
    form: &mut BoundForm,
    request: &RequestContext,
) -> EngineResult<()> {
    let mut ordered: Vec<&ElementEntry> = elements.iter().collect();
    ordered.sort_by_key(|e| e.position);
    for entry in ordered {
        let Ok(plugin) = catalog.elements().get(&entry.plugin_uid) else {
            continue;
        };
        plugin
            .submit_form_data(&entry.plugin_data, form, request)
            .map_err(|e| EngineError::plugin(&entry.plugin_uid, e))?;
    }
    Ok(())
}
