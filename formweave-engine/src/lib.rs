//! Dynamic form assembly and plugin execution.
//!
//! A composition stores an ordered list of element entries and a list of
//! handler entries, each a plugin uid plus serialized plugin data. On every
//! request the engine:
//!
//! 1. resolves each element through the [`PluginCatalog`] and assembles a
//!    [`FormSchema`](formweave_model::FormSchema) ([`FormAssembler`])
//! 2. binds and validates submitted data, firing [`CallbackStage`] callbacks
//!    around validation ([`FormProcessor`])
//! 3. runs the handlers one by one, isolating each failure
//!    ([`HandlerRunner`])
//!
//! Wizards chain several forms and run their handlers once at the end
//! ([`WizardOrchestrator`]). Owners build compositions through the
//! [`Composer`] and move them between systems with [`Transfer`].

pub mod access;
pub mod assembler;
pub mod callbacks;
pub mod catalog;
pub mod composer;
pub mod config;
pub mod engine;
pub mod error;
pub mod plugin;
pub mod registry;
pub mod runner;
pub mod submission;
pub mod transfer;
pub mod wizard;

pub use access::{AccessConfig, AccessMode, AccessPolicy, User};
pub use assembler::{AssembledForm, AssemblyWarning, FieldSource, FormAssembler};
pub use callbacks::{CallbackError, CallbackRegistry, CallbackStage, FnCallback, FormCallback};
pub use catalog::{CatalogBuilder, PluginCatalog, global, install_global};
pub use composer::{Composer, EntryOutcome};
pub use config::{
    AssemblyConfig, DuplicateFieldPolicy, EngineConfig, MediaConfig, MissingPluginPolicy,
};
pub use engine::FormEngine;
pub use error::{EngineError, EngineResult};
pub use plugin::{
    ElementPlugin, FormHandlerContext, HandlerFailure, HandlerPlugin, HandlerResult, Plugin,
    PluginError, RequestContext, StepData, WizardHandlerContext, WizardHandlerPlugin, decode,
    encode,
};
pub use registry::{PluginGroup, Registry};
pub use runner::{HandlerError, HandlerReport, HandlerResponse, HandlerRunner};
pub use submission::{FormProcessor, RenderedForm, SubmissionOutcome};
pub use transfer::{ExportedElement, ExportedHandler, FormExport, ImportReport, Transfer};
pub use wizard::{StepOutcome, StepView, WizardOrchestrator, WizardSession, WizardState};
