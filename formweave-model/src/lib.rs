//! Core data model for formweave.
//!
//! Defines the types every formweave subsystem depends on:
//! - [`FormComposition`] / [`WizardComposition`]: persisted form and wizard blueprints
//! - [`ElementEntry`] / [`HandlerEntry`]: a plugin uid, its configuration and position
//! - [`PluginDescriptor`]: the immutable identity of a registered plugin
//! - [`FormSchema`] / [`FieldDefinition`]: a field list interpreted generically
//!   instead of a generated form type
//! - [`BoundForm`]: a schema bound to submitted [`FormInput`], with per-field
//!   errors and cleaned data after validation
//!
//! Plugin configuration ([`PluginData`]) is an opaque JSON object; each plugin
//! defines its own keys.

mod composition;
mod entry;
mod form;
mod schema;

pub use composition::{FormComposition, WizardComposition, WizardStep};
pub use entry::{ElementEntry, HandlerEntry, PluginData, PluginDescriptor};
pub use form::{BoundField, BoundForm, CleanedData, FormInput, UploadedFile, REQUIRED_MESSAGE};
pub use schema::{Choice, FieldDefinition, FieldKind, FormSchema, Validator, Widget};
