//! Multi-step wizards.
//!
//! A [`WizardSession`] records the state machine position and the raw input
//! of every submitted step. Sessions are plain serde values; keeping them
//! between requests is the caller's business. Steps and their elements are
//! reloaded from the store on every call.
//!
//! When the last step is submitted the session enters `Reviewing`: every
//! stored step is validated again against the current form. A step that no
//! longer validates moves the session to `RevalidationFailed(k)`. Otherwise
//! element submission hooks run per step, the wizard handlers run once over
//! the combined data and the session ends in `Done` with its data cleared.

use std::collections::BTreeMap;

use formweave_model::{BoundForm, ElementEntry, FormComposition, FormInput, WizardComposition};
use formweave_types::CompositionId;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::assembler::AssembledForm;
use crate::engine::FormEngine;
use crate::error::{EngineError, EngineResult};
use crate::plugin::{RequestContext, StepData};
use crate::runner::HandlerReport;
use crate::submission::submit_plugin_form_data;

/// Position of a session in the wizard. Step indices are zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "step", rename_all = "snake_case")]
pub enum WizardState {
    AwaitingStep(usize),
    Reviewing,
    Done,
    RevalidationFailed(usize),
}

/// Per-visitor wizard progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WizardSession {
    wizard_id: CompositionId,
    state: WizardState,
    /// Raw input of submitted steps, keyed by step form slug.
    step_data: BTreeMap<String, FormInput>,
}

impl WizardSession {
    pub fn new(wizard_id: CompositionId) -> Self {
        Self {
            wizard_id,
            state: WizardState::AwaitingStep(0),
            step_data: BTreeMap::new(),
        }
    }

    pub fn wizard_id(&self) -> CompositionId {
        self.wizard_id
    }

    pub fn state(&self) -> WizardState {
        self.state
    }

    /// The step waiting for input, if any.
    pub fn current_step(&self) -> Option<usize> {
        match self.state {
            WizardState::AwaitingStep(k) | WizardState::RevalidationFailed(k) => Some(k),
            WizardState::Reviewing | WizardState::Done => None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.state == WizardState::Done
    }

    pub fn stored_input(&self, form_slug: &str) -> Option<&FormInput> {
        self.step_data.get(form_slug)
    }

    pub fn stored_steps(&self) -> usize {
        self.step_data.len()
    }

    /// Returns to the previous step. Stored input is kept for prefilling.
    pub fn back(&mut self) -> EngineResult<usize> {
        match self.current_step() {
            Some(k) if k > 0 => {
                self.transition(WizardState::AwaitingStep(k - 1));
                Ok(k - 1)
            }
            Some(_) => Err(EngineError::WizardState("already at the first step".into())),
            None => Err(EngineError::WizardState(format!(
                "cannot go back while {:?}",
                self.state
            ))),
        }
    }

    /// Abandons the flow. Nothing has run yet, so only the data is dropped.
    pub fn reset(&mut self) {
        self.step_data.clear();
        self.transition(WizardState::AwaitingStep(0));
    }

    fn transition(&mut self, next: WizardState) {
        debug!(wizard_id = %self.wizard_id, from = ?self.state, to = ?next, "Wizard transition");
        self.state = next;
    }
}

/// The form of the current step, ready to display.
#[derive(Debug, Clone)]
pub struct StepView {
    pub index: usize,
    pub total: usize,
    pub composition: FormComposition,
    pub assembled: AssembledForm,
    pub form: BoundForm,
}

#[derive(Debug, Clone)]
pub enum StepOutcome {
    /// The step did not validate; re-render `form`.
    Invalid { step: usize, form: BoundForm },
    /// The step was stored; `step` is awaited next.
    Advanced { step: usize },
    /// A stored step no longer validates and must be redone.
    RevalidationFailed { step: usize, form: BoundForm },
    /// Handlers ran and the session is done.
    Completed {
        steps: Vec<StepData>,
        report: HandlerReport,
    },
}

struct LoadedStep {
    form: FormComposition,
    elements: Vec<ElementEntry>,
}

pub struct WizardOrchestrator<'a> {
    engine: &'a FormEngine,
}

impl<'a> WizardOrchestrator<'a> {
    pub(crate) fn new(engine: &'a FormEngine) -> Self {
        Self { engine }
    }

    /// Opens a new session for the wizard called `slug`.
    pub fn start(
        &self,
        slug: &str,
        request: &RequestContext,
    ) -> EngineResult<(WizardComposition, WizardSession)> {
        let wizard = self.engine.store().get_wizard_by_slug(slug)?;
        if !wizard.visible_to(request.user_id()) {
            return Err(EngineError::NotFound(format!("wizard {slug}")));
        }
        if self.engine.store().wizard_steps(wizard.id)?.is_empty() {
            return Err(EngineError::EmptyWizard(wizard.name));
        }
        info!(wizard = %wizard.slug, "Wizard session started");
        let session = WizardSession::new(wizard.id);
        Ok((wizard, session))
    }

    /// The form of the step the session waits for. Previously stored input
    /// is shown again; after a failed revalidation its errors are included.
    pub fn current_form(
        &self,
        session: &WizardSession,
        request: &RequestContext,
    ) -> EngineResult<StepView> {
        let Some(k) = session.current_step() else {
            return Err(EngineError::WizardState(format!(
                "no step awaits input while {:?}",
                session.state
            )));
        };
        let wizard = self.load_wizard(session, request)?;
        let mut steps = self.load_steps(&wizard)?;
        let total = steps.len();
        if k >= total {
            return Err(EngineError::WizardState(format!("step {k} does not exist")));
        }
        let step = steps.swap_remove(k);
        let assembled = self
            .engine
            .assembler()
            .assemble(&step.elements, None, request)?;
        let stored = session.stored_input(step.form.slug.as_str());
        let form = match (session.state, stored) {
            (WizardState::RevalidationFailed(_), Some(input)) => {
                let mut form = assembled.bind(input.clone());
                form.is_valid();
                form
            }
            (_, Some(input)) => assembled.schema().unbound(input.data.clone()),
            (_, None) => assembled.unbound(),
        };
        Ok(StepView {
            index: k,
            total,
            composition: step.form,
            assembled,
            form,
        })
    }

    /// Submits input for the awaited step.
    pub fn submit_step(
        &self,
        session: &mut WizardSession,
        request: &RequestContext,
        input: FormInput,
    ) -> EngineResult<StepOutcome> {
        let Some(k) = session.current_step() else {
            return Err(EngineError::WizardState(format!(
                "cannot submit a step while {:?}",
                session.state
            )));
        };
        let wizard = self.load_wizard(session, request)?;
        let steps = self.load_steps(&wizard)?;
        let Some(step) = steps.get(k) else {
            return Err(EngineError::WizardState(format!("step {k} does not exist")));
        };

        let assembled = self
            .engine
            .assembler()
            .assemble(&step.elements, None, request)?;
        let mut form = assembled.bind(input.clone());
        if !form.is_valid() {
            session.transition(WizardState::AwaitingStep(k));
            return Ok(StepOutcome::Invalid { step: k, form });
        }

        session
            .step_data
            .insert(step.form.slug.as_str().to_string(), input);
        if k + 1 < steps.len() {
            session.transition(WizardState::AwaitingStep(k + 1));
            return Ok(StepOutcome::Advanced { step: k + 1 });
        }

        session.transition(WizardState::Reviewing);
        self.finish(&wizard, &steps, session, request)
    }

    /// Retries the final review of a session left in `Reviewing`, e.g. after
    /// a storage error.
    pub fn review(
        &self,
        session: &mut WizardSession,
        request: &RequestContext,
    ) -> EngineResult<StepOutcome> {
        if session.state != WizardState::Reviewing {
            return Err(EngineError::WizardState(format!(
                "cannot review while {:?}",
                session.state
            )));
        }
        let wizard = self.load_wizard(session, request)?;
        let steps = self.load_steps(&wizard)?;
        self.finish(&wizard, &steps, session, request)
    }

    fn finish(
        &self,
        wizard: &WizardComposition,
        steps: &[LoadedStep],
        session: &mut WizardSession,
        request: &RequestContext,
    ) -> EngineResult<StepOutcome> {
        let assembler = self.engine.assembler();
        let mut valid = Vec::with_capacity(steps.len());
        for (j, step) in steps.iter().enumerate() {
            let assembled = assembler.assemble(&step.elements, None, request)?;
            let mut form = match session.stored_input(step.form.slug.as_str()) {
                Some(input) => assembled.bind(input.clone()),
                None => assembled.unbound(),
            };
            if !form.is_valid() {
                warn!(wizard = %wizard.slug, step = j, form = %step.form.slug, "Wizard step failed revalidation");
                session.transition(WizardState::RevalidationFailed(j));
                return Ok(StepOutcome::RevalidationFailed { step: j, form });
            }
            valid.push((step, form));
        }

        let mut step_data = Vec::with_capacity(valid.len());
        let mut elements = Vec::new();
        for (step, mut form) in valid {
            submit_plugin_form_data(self.engine.catalog(), &step.elements, &mut form, request)?;
            step_data.push(StepData {
                form_id: step.form.id,
                slug: step.form.slug.clone(),
                data: form.into_cleaned_data().unwrap_or_default(),
            });
            elements.extend(step.elements.iter().cloned());
        }

        let handlers = self.engine.store().handlers(wizard.id)?;
        let report = self.engine.runner().run_wizard_handlers(
            wizard,
            request,
            &step_data,
            &elements,
            &handlers,
        );

        session.step_data.clear();
        session.transition(WizardState::Done);
        info!(wizard = %wizard.slug, steps = step_data.len(), "Wizard completed");
        Ok(StepOutcome::Completed {
            steps: step_data,
            report,
        })
    }

    fn load_wizard(
        &self,
        session: &WizardSession,
        request: &RequestContext,
    ) -> EngineResult<WizardComposition> {
        let wizard = self.engine.store().get_wizard(session.wizard_id)?;
        if !wizard.visible_to(request.user_id()) {
            return Err(EngineError::NotFound(format!("wizard {}", wizard.slug)));
        }
        Ok(wizard)
    }

    fn load_steps(&self, wizard: &WizardComposition) -> EngineResult<Vec<LoadedStep>> {
        let store = self.engine.store();
        let steps = store.wizard_steps(wizard.id)?;
        if steps.is_empty() {
            return Err(EngineError::EmptyWizard(wizard.name.clone()));
        }
        steps
            .into_iter()
            .map(|step| -> EngineResult<LoadedStep> {
                let form = store.get_form(step.form_id)?;
                let elements = store.elements(form.id)?;
                Ok(LoadedStep { form, elements })
            })
            .collect()
    }
}
