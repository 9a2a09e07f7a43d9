//! Builds a live form from stored element entries.
//!
//! Entries are visited in ascending position. Each is resolved through the
//! element registry and turned into a [`FieldDefinition`]; the resulting
//! [`FormSchema`] is interpreted generically at bind/validate time. Nothing
//! here is persisted; a form is assembled again on every request.

use formweave_model::{BoundForm, CleanedData, ElementEntry, FormInput, FormSchema};
use formweave_types::EntryId;
use tracing::{debug, warn};

use crate::catalog::PluginCatalog;
use crate::config::{AssemblyConfig, DuplicateFieldPolicy, MissingPluginPolicy};
use crate::error::{EngineError, EngineResult};
use crate::plugin::RequestContext;

/// A non-fatal problem met while assembling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssemblyWarning {
    /// The entry references a plugin that is no longer registered.
    MissingPlugin { entry_id: EntryId, plugin_uid: String },
    /// The entry's plugin data could not be turned into a field.
    InvalidPluginData {
        entry_id: EntryId,
        plugin_uid: String,
        message: String,
    },
    /// A later entry replaced the field of an earlier one.
    DuplicateField { name: String, dropped_entry: EntryId },
}

/// Which entry produced a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSource {
    pub entry_id: EntryId,
    pub plugin_uid: String,
    pub field_name: String,
}

/// A request-scoped form built from element entries.
#[derive(Debug, Clone)]
pub struct AssembledForm {
    schema: FormSchema,
    initial: CleanedData,
    sources: Vec<FieldSource>,
    warnings: Vec<AssemblyWarning>,
}

impl AssembledForm {
    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    /// Field names in position order.
    pub fn field_names(&self) -> Vec<&str> {
        self.schema.names()
    }

    /// Initial values supplied by the caller, limited to known fields.
    pub fn initial(&self) -> &CleanedData {
        &self.initial
    }

    pub fn sources(&self) -> &[FieldSource] {
        &self.sources
    }

    pub fn warnings(&self) -> &[AssemblyWarning] {
        &self.warnings
    }

    pub fn bind(&self, input: FormInput) -> BoundForm {
        self.schema.bind_with_initial(input, self.initial.clone())
    }

    pub fn unbound(&self) -> BoundForm {
        self.schema.unbound(self.initial.clone())
    }
}

pub struct FormAssembler<'a> {
    catalog: &'a PluginCatalog,
    config: AssemblyConfig,
}

impl<'a> FormAssembler<'a> {
    pub fn new(catalog: &'a PluginCatalog, config: AssemblyConfig) -> Self {
        Self { catalog, config }
    }

    /// Assembles `entries` into one form. `initial` values override the
    /// initials declared by the elements.
    pub fn assemble(
        &self,
        entries: &[ElementEntry],
        initial: Option<&CleanedData>,
        request: &RequestContext,
    ) -> EngineResult<AssembledForm> {
        let mut ordered: Vec<&ElementEntry> = entries.iter().collect();
        ordered.sort_by_key(|e| e.position);

        let mut schema = FormSchema::default();
        let mut sources: Vec<FieldSource> = Vec::new();
        let mut warnings = Vec::new();

        for entry in ordered {
            let plugin = match self.catalog.elements().get(&entry.plugin_uid) {
                Ok(plugin) => plugin,
                Err(err) => match self.config.missing_plugin {
                    MissingPluginPolicy::Abort => return Err(err),
                    MissingPluginPolicy::Skip => {
                        warn!(
                            plugin_uid = %entry.plugin_uid,
                            entry_id = %entry.id,
                            "Skipping element with unregistered plugin"
                        );
                        warnings.push(AssemblyWarning::MissingPlugin {
                            entry_id: entry.id,
                            plugin_uid: entry.plugin_uid.clone(),
                        });
                        continue;
                    }
                },
            };

            let field = match plugin.to_field(&entry.plugin_data, entry.position, request) {
                Ok(field) => field,
                Err(err) => match self.config.missing_plugin {
                    MissingPluginPolicy::Abort => {
                        return Err(EngineError::plugin(&entry.plugin_uid, err));
                    }
                    MissingPluginPolicy::Skip => {
                        warn!(
                            plugin_uid = %entry.plugin_uid,
                            entry_id = %entry.id,
                            error = %err,
                            "Skipping element with unusable plugin data"
                        );
                        warnings.push(AssemblyWarning::InvalidPluginData {
                            entry_id: entry.id,
                            plugin_uid: entry.plugin_uid.clone(),
                            message: err.to_string(),
                        });
                        continue;
                    }
                },
            };

            if schema.contains(&field.name) {
                match self.config.duplicate_field {
                    DuplicateFieldPolicy::Reject => {
                        return Err(EngineError::DuplicateFieldName { name: field.name });
                    }
                    DuplicateFieldPolicy::LastWins => {
                        schema.remove(&field.name);
                        if let Some(idx) = sources.iter().position(|s| s.field_name == field.name) {
                            let dropped = sources.remove(idx);
                            warn!(
                                field = %field.name,
                                dropped_entry = %dropped.entry_id,
                                "Duplicate field name, keeping the later element"
                            );
                            warnings.push(AssemblyWarning::DuplicateField {
                                name: field.name.clone(),
                                dropped_entry: dropped.entry_id,
                            });
                        }
                    }
                }
            }

            sources.push(FieldSource {
                entry_id: entry.id,
                plugin_uid: entry.plugin_uid.clone(),
                field_name: field.name.clone(),
            });
            schema.push(field);
        }

        let initial = initial
            .map(|values| {
                values
                    .iter()
                    .filter(|(name, _)| schema.contains(name))
                    .map(|(name, value)| (name.clone(), value.clone()))
                    .collect()
            })
            .unwrap_or_default();

        debug!(fields = schema.len(), warnings = warnings.len(), "Form assembled");
        Ok(AssembledForm {
            schema,
            initial,
            sources,
            warnings,
        })
    }
}
