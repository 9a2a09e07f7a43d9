//! The plugin contract.
//!
//! Every plugin has a [`PluginDescriptor`] and an optional configuration form.
//! The configuration form is bound when a user adds or edits an entry, then
//! serialized into the entry's [`PluginData`]. Three capabilities build on
//! [`Plugin`]:
//!
//! - [`ElementPlugin`]: turns plugin data into one field of an assembled form
//! - [`HandlerPlugin`]: acts on the validated data of a single form
//! - [`WizardHandlerPlugin`]: acts on the combined data of a finished wizard
//!
//! Handlers report failures as [`HandlerFailure`] values. They never abort the
//! run of the other handlers.

use std::collections::BTreeMap;
use std::fmt;

use formweave_model::{
    BoundForm, CleanedData, ElementEntry, FieldDefinition, FormComposition, FormInput, FormSchema,
    PluginData, PluginDescriptor, WizardComposition,
};
use formweave_types::{CompositionId, Slug, UserId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::access::User;

/// Failure of a plugin hook other than a handler run.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("invalid plugin data: {0}")]
    InvalidData(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for PluginError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidData(err.to_string())
    }
}

/// Decodes plugin data into a plugin's own typed configuration.
pub fn decode<T: DeserializeOwned>(data: &PluginData) -> Result<T, PluginError> {
    Ok(serde_json::from_value(Value::Object(data.clone()))?)
}

/// Encodes a plugin's typed configuration as plugin data.
pub fn encode<T: Serialize>(config: &T) -> Result<PluginData, PluginError> {
    match serde_json::to_value(config)? {
        Value::Object(map) => Ok(map),
        other => Err(PluginError::InvalidData(format!(
            "plugin data must be an object, got {other}"
        ))),
    }
}

/// A handler's report that it could not do its job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerFailure {
    pub message: String,
}

impl HandlerFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for HandlerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for HandlerFailure {}

impl From<PluginError> for HandlerFailure {
    fn from(err: PluginError) -> Self {
        Self::new(err.to_string())
    }
}

/// `Ok(payload)` on success. The payload is collected into the run report.
pub type HandlerResult = Result<Value, HandlerFailure>;

/// Who is submitting, plus request metadata handlers may record.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub user: Option<User>,
    /// Request headers or similar metadata, e.g. `remote-addr`.
    pub meta: BTreeMap<String, String>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_user(user: User) -> Self {
        Self {
            user: Some(user),
            meta: BTreeMap::new(),
        }
    }

    pub fn with_meta(mut self, key: &str, value: &str) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user.as_ref().map(|u| u.id)
    }
}

/// Behaviour shared by every plugin kind.
pub trait Plugin: Send + Sync {
    fn descriptor(&self) -> &PluginDescriptor;

    fn uid(&self) -> &str {
        &self.descriptor().uid
    }

    fn name(&self) -> &str {
        &self.descriptor().name
    }

    /// `None` means the plugin is not configurable and is stored with empty data.
    fn configuration_form(&self) -> Option<FormSchema> {
        None
    }

    /// Configuration form for a new entry, bound when `input` is given.
    fn initialise_create_form(&self, input: Option<FormInput>) -> Option<BoundForm> {
        let schema = self.configuration_form()?;
        Some(match input {
            Some(input) => schema.bind(input),
            None => schema.unbound(CleanedData::new()),
        })
    }

    /// Configuration form for an existing entry, prefilled with its data.
    fn initialise_edit_form(
        &self,
        input: Option<FormInput>,
        existing: &PluginData,
    ) -> Option<BoundForm> {
        let schema = self.configuration_form()?;
        Some(match input {
            Some(input) => schema.bind_with_initial(input, existing.clone()),
            None => schema.unbound(existing.clone()),
        })
    }

    /// Checks a field-valid configuration form against the other elements of
    /// the same composition. Problems are added to `form` as errors.
    fn validate(&self, form: &mut BoundForm, siblings: &[ElementEntry]) {
        let _ = (form, siblings);
    }

    /// Turns a valid configuration form into plugin data.
    fn serialize(&self, form: &BoundForm) -> Result<PluginData, PluginError> {
        Ok(form.cleaned_data().cloned().unwrap_or_default())
    }

    /// Releases out-of-band resources referenced by the data before the
    /// entry is removed. An error keeps the entry.
    fn on_delete(&self, data: &PluginData) -> Result<(), PluginError> {
        let _ = data;
        Ok(())
    }
}

/// A plugin contributing one input field to assembled forms.
pub trait ElementPlugin: Plugin {
    /// Builds the live field from stored plugin data.
    fn to_field(
        &self,
        data: &PluginData,
        position: i32,
        request: &RequestContext,
    ) -> Result<FieldDefinition, PluginError>;

    /// Runs after the submitted form is valid and before handlers. May
    /// rewrite the cleaned value of the element's field.
    fn submit_form_data(
        &self,
        data: &PluginData,
        form: &mut BoundForm,
        request: &RequestContext,
    ) -> Result<(), PluginError> {
        let _ = (data, form, request);
        Ok(())
    }
}

/// Everything a form handler sees for one submission.
#[derive(Debug, Clone, Copy)]
pub struct FormHandlerContext<'a> {
    pub composition: &'a FormComposition,
    pub request: &'a RequestContext,
    pub plugin_data: &'a PluginData,
    pub cleaned_data: &'a CleanedData,
    pub elements: &'a [ElementEntry],
}

/// A plugin acting on the validated data of a single form.
pub trait HandlerPlugin: Plugin {
    fn run(&self, ctx: FormHandlerContext<'_>) -> HandlerResult;
}

/// Cleaned data of one wizard step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepData {
    pub form_id: CompositionId,
    pub slug: Slug,
    pub data: CleanedData,
}

/// Everything a wizard handler sees when a wizard completes.
#[derive(Debug, Clone, Copy)]
pub struct WizardHandlerContext<'a> {
    pub wizard: &'a WizardComposition,
    pub request: &'a RequestContext,
    pub plugin_data: &'a PluginData,
    /// Step data in step order.
    pub steps: &'a [StepData],
    /// Elements of every step form, step by step.
    pub elements: &'a [ElementEntry],
}

impl WizardHandlerContext<'_> {
    /// All step data merged into one map. Later steps win on shared keys.
    pub fn merged_data(&self) -> CleanedData {
        let mut merged = CleanedData::new();
        for step in self.steps {
            for (key, value) in &step.data {
                merged.insert(key.clone(), value.clone());
            }
        }
        merged
    }
}

/// A plugin acting on the combined data of a completed wizard.
pub trait WizardHandlerPlugin: Plugin {
    fn run(&self, ctx: WizardHandlerContext<'_>) -> HandlerResult;
}
