//! Callbacks run at fixed stages of a form submission.
//!
//! Callbacks of one stage run in registration order. Each receives the form
//! returned by the previous one. Errors are not caught here; they abort the
//! submission and surface as [`EngineError::Callback`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use formweave_model::{BoundForm, FormComposition};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::plugin::RequestContext;

/// Pipeline stage a callback is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackStage {
    BeforeValidation,
    ValidBeforeHandlers,
    Valid,
    ValidAfterHandlers,
    Invalid,
}

/// Error returned by a callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackError(pub String);

impl fmt::Display for CallbackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for CallbackError {}

pub trait FormCallback: Send + Sync {
    fn name(&self) -> &str;

    fn stage(&self) -> CallbackStage;

    fn call(
        &self,
        composition: &FormComposition,
        request: &RequestContext,
        form: BoundForm,
    ) -> Result<BoundForm, CallbackError>;
}

/// Adapts a closure into a [`FormCallback`].
pub struct FnCallback<F> {
    name: String,
    stage: CallbackStage,
    func: F,
}

impl<F> FnCallback<F>
where
    F: Fn(&FormComposition, &RequestContext, BoundForm) -> Result<BoundForm, CallbackError>
        + Send
        + Sync,
{
    pub fn new(name: &str, stage: CallbackStage, func: F) -> Self {
        Self {
            name: name.into(),
            stage,
            func,
        }
    }
}

impl<F> FormCallback for FnCallback<F>
where
    F: Fn(&FormComposition, &RequestContext, BoundForm) -> Result<BoundForm, CallbackError>
        + Send
        + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn stage(&self) -> CallbackStage {
        self.stage
    }

    fn call(
        &self,
        composition: &FormComposition,
        request: &RequestContext,
        form: BoundForm,
    ) -> Result<BoundForm, CallbackError> {
        (self.func)(composition, request, form)
    }
}

#[derive(Default)]
pub struct CallbackRegistry {
    by_stage: HashMap<CallbackStage, Vec<Arc<dyn FormCallback>>>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, callback: Arc<dyn FormCallback>) {
        self.by_stage
            .entry(callback.stage())
            .or_default()
            .push(callback);
    }

    pub fn callbacks(&self, stage: CallbackStage) -> &[Arc<dyn FormCallback>] {
        self.by_stage.get(&stage).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Runs every callback of `stage`, threading the form through them.
    pub fn fire(
        &self,
        stage: CallbackStage,
        composition: &FormComposition,
        request: &RequestContext,
        mut form: BoundForm,
    ) -> EngineResult<BoundForm> {
        for callback in self.callbacks(stage) {
            debug!(callback = callback.name(), ?stage, "Running form callback");
            form = callback
                .call(composition, request, form)
                .map_err(|e| EngineError::Callback {
                    callback: callback.name().to_string(),
                    stage,
                    message: e.0,
                })?;
        }
        Ok(form)
    }
}
