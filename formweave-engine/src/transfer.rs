//! JSON import and export of form compositions.
//!
//! Export writes the composition settings with its element and handler
//! entries. Import always creates a new composition owned by the importing
//! user. Entries that cannot be restored are skipped with a warning; the
//! import itself still succeeds.

use chrono::Local;
use formweave_model::{ElementEntry, FormComposition, HandlerEntry, PluginData};
use formweave_types::{CompositionId, Slug};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{info, warn};

use crate::access::User;
use crate::composer::unique_slug;
use crate::engine::FormEngine;
use crate::error::{EngineError, EngineResult};

pub const MISSING_PLUGIN_DATA: &str = "Some essential plugin data missing in the JSON import.";

/// Exported element entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedElement {
    #[serde(default)]
    pub plugin_uid: Option<String>,
    #[serde(default)]
    pub position: Option<i32>,
    #[serde(default, deserialize_with = "plugin_data")]
    pub plugin_data: PluginData,
}

/// Exported handler entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedHandler {
    #[serde(default)]
    pub plugin_uid: Option<String>,
    #[serde(default, deserialize_with = "plugin_data")]
    pub plugin_data: PluginData,
}

/// The import/export document. Unknown keys are ignored on import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormExport {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub is_cloneable: bool,
    #[serde(default)]
    pub success_page_title: String,
    #[serde(default)]
    pub success_page_message: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub form_elements: Vec<ExportedElement>,
    #[serde(default)]
    pub form_handlers: Vec<ExportedHandler>,
}

impl FormExport {
    pub fn from_json(json: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> EngineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Plugin data is accepted both as an object and as a JSON-encoded string.
fn plugin_data<'de, D: Deserializer<'de>>(deserializer: D) -> Result<PluginData, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Object(PluginData),
        Encoded(String),
        Null(()),
    }

    match Repr::deserialize(deserializer)? {
        Repr::Object(map) => Ok(map),
        Repr::Encoded(s) if s.trim().is_empty() => Ok(PluginData::new()),
        Repr::Encoded(s) => serde_json::from_str(&s).map_err(serde::de::Error::custom),
        Repr::Null(()) => Ok(PluginData::new()),
    }
}

/// What an import created, plus the entries it had to skip.
#[derive(Debug, Clone)]
pub struct ImportReport {
    pub form: FormComposition,
    pub elements: Vec<ElementEntry>,
    pub handlers: Vec<HandlerEntry>,
    pub warnings: Vec<String>,
}

pub struct Transfer<'a> {
    engine: &'a FormEngine,
}

impl<'a> Transfer<'a> {
    pub(crate) fn new(engine: &'a FormEngine) -> Self {
        Self { engine }
    }

    /// Exports one of the user's forms. Visibility flags are always exported
    /// as `false`.
    pub fn export_form(&self, user: &User, form_id: CompositionId) -> EngineResult<FormExport> {
        let store = self.engine.store();
        let form = store.get_form(form_id)?;
        if form.owner != user.id {
            return Err(EngineError::NotFound(format!("form {form_id}")));
        }
        let form_elements = store
            .elements(form.id)?
            .into_iter()
            .map(|e| ExportedElement {
                plugin_uid: Some(e.plugin_uid),
                position: Some(e.position),
                plugin_data: e.plugin_data,
            })
            .collect();
        let form_handlers = store
            .handlers(form.id)?
            .into_iter()
            .map(|h| ExportedHandler {
                plugin_uid: Some(h.plugin_uid),
                plugin_data: h.plugin_data,
            })
            .collect();

        Ok(FormExport {
            name: form.name,
            slug: form.slug.to_string(),
            is_public: false,
            is_cloneable: false,
            success_page_title: form.success_page_title,
            success_page_message: form.success_page_message,
            action: form.action,
            form_elements,
            form_handlers,
        })
    }

    pub fn import_form_json(&self, user: &User, json: &str) -> EngineResult<ImportReport> {
        self.import_form(user, FormExport::from_json(json)?)
    }

    /// Creates a new form from an export document.
    pub fn import_form(&self, user: &User, doc: FormExport) -> EngineResult<ImportReport> {
        let store = self.engine.store();
        let catalog = self.engine.catalog();

        let base_name = if doc.name.trim().is_empty() {
            "Imported form"
        } else {
            doc.name.trim()
        };
        let name = format!(
            "{} (imported on {})",
            base_name,
            Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        let base_slug = Slug::parse(&doc.slug).unwrap_or_else(|_| Slug::from_name(base_name));

        let mut form = FormComposition::new(user.id, &name);
        form.slug = unique_slug(&base_slug, |s| Ok(store.form_slug_exists(s)?))?;
        form.is_public = doc.is_public;
        form.is_cloneable = doc.is_cloneable;
        form.success_page_title = doc.success_page_title;
        form.success_page_message = doc.success_page_message;
        form.action = doc.action;
        let form = store.insert_form(form)?;

        let mut warnings = Vec::new();
        let mut elements = Vec::new();
        for exported in doc.form_elements {
            let Some(uid) = exported.plugin_uid else {
                warn!(composition = %form.slug, "Skipping imported element without plugin uid");
                warnings.push(MISSING_PLUGIN_DATA.to_string());
                continue;
            };
            if !catalog.elements().contains(&uid) {
                warn!(plugin_uid = %uid, composition = %form.slug, "Skipping imported element of unregistered plugin");
                warnings.push(format!("Plugin {uid} is missing in the system."));
                continue;
            }
            let entry = match exported.position {
                Some(position) => {
                    let entry = ElementEntry::new(form.id, &uid, exported.plugin_data, position, user.id);
                    match store.insert_element(entry.clone()) {
                        Ok(entry) => entry,
                        Err(e) if e.is_conflict() => {
                            warn!(plugin_uid = %uid, position, "Imported element position taken, appending");
                            store.append_element(form.id, &uid, entry.plugin_data, user.id)?
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                None => store.append_element(form.id, &uid, exported.plugin_data, user.id)?,
            };
            elements.push(entry);
        }

        let mut handlers = Vec::new();
        for exported in doc.form_handlers {
            let Some(uid) = exported.plugin_uid else {
                warn!(composition = %form.slug, "Skipping imported handler without plugin uid");
                warnings.push(MISSING_PLUGIN_DATA.to_string());
                continue;
            };
            let plugin = match catalog.handlers().get(&uid) {
                Ok(plugin) => plugin,
                Err(_) => {
                    warn!(plugin_uid = %uid, composition = %form.slug, "Skipping imported handler of unregistered plugin");
                    warnings.push(format!("Plugin {uid} is missing in the system."));
                    continue;
                }
            };
            let single = !plugin.descriptor().allow_multiple;
            let entry = HandlerEntry::new(form.id, &uid, exported.plugin_data, user.id);
            match store.insert_handler(entry, single) {
                Ok(entry) => handlers.push(entry),
                Err(e) if e.is_conflict() => {
                    warn!(plugin_uid = %uid, composition = %form.slug, "Skipping repeated single-use handler");
                    warnings.push(format!(
                        "The {} plugin can be used only once in a form.",
                        plugin.name()
                    ));
                }
                Err(e) => return Err(e.into()),
            }
        }

        info!(
            composition = %form.slug,
            elements = elements.len(),
            handlers = handlers.len(),
            skipped = warnings.len(),
            "Form imported"
        );
        Ok(ImportReport {
            form,
            elements,
            handlers,
            warnings,
        })
    }
}
