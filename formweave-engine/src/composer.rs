//! Composition and entry lifecycle for form owners.
//!
//! Every operation acts on behalf of a [`User`]. Compositions the user does
//! not own and plugins the user may not use both read as "not found".
//! Adding or editing an entry binds the plugin's configuration form:
//! - without input, the unbound form is returned for display
//! - invalid input returns the form with its errors
//! - valid input is serialized into the entry's plugin data and saved
//!
//! Plugins without a configuration form are saved with empty data right away.

use formweave_model::{
    BoundForm, ElementEntry, FormComposition, FormInput, HandlerEntry, PluginData,
    WizardComposition, WizardStep,
};
use formweave_storage::{DeletedForm, DeletedWizard};
use formweave_types::{CompositionId, EntryId, Slug};
use tracing::{info, warn};

use crate::access::User;
use crate::engine::FormEngine;
use crate::error::{EngineError, EngineResult};
use crate::plugin::{ElementPlugin, HandlerPlugin, Plugin, WizardHandlerPlugin};
use crate::registry::{PluginGroup, Registry};

/// Result of an add or edit operation.
#[derive(Debug, Clone)]
pub enum EntryOutcome<T> {
    Saved(T),
    /// The plugin needs configuration; display this unbound form.
    NeedsConfiguration(BoundForm),
    /// The submitted configuration is invalid; display it with its errors.
    Invalid(BoundForm),
}

impl<T> EntryOutcome<T> {
    pub fn saved(self) -> Option<T> {
        match self {
            Self::Saved(value) => Some(value),
            Self::NeedsConfiguration(_) | Self::Invalid(_) => None,
        }
    }

    pub fn form(&self) -> Option<&BoundForm> {
        match self {
            Self::Saved(_) => None,
            Self::NeedsConfiguration(form) | Self::Invalid(form) => Some(form),
        }
    }
}

enum Configuration {
    Ready(PluginData),
    Pending(BoundForm),
    Invalid(BoundForm),
}

impl Configuration {
    fn resolve<P: ?Sized + Plugin>(
        plugin: &P,
        form: Option<BoundForm>,
        siblings: &[ElementEntry],
    ) -> EngineResult<Self> {
        let Some(mut form) = form else {
            return Ok(Self::Ready(PluginData::new()));
        };
        if !form.is_bound() {
            return Ok(Self::Pending(form));
        }
        if form.is_valid() {
            plugin.validate(&mut form, siblings);
        }
        if !form.is_valid() {
            return Ok(Self::Invalid(form));
        }
        let data = plugin
            .serialize(&form)
            .map_err(|e| EngineError::plugin(plugin.uid(), e))?;
        Ok(Self::Ready(data))
    }

    fn save<T>(
        self,
        save: impl FnOnce(PluginData) -> EngineResult<T>,
    ) -> EngineResult<EntryOutcome<T>> {
        match self {
            Self::Ready(data) => save(data).map(EntryOutcome::Saved),
            Self::Pending(form) => Ok(EntryOutcome::NeedsConfiguration(form)),
            Self::Invalid(form) => Ok(EntryOutcome::Invalid(form)),
        }
    }
}

/// Picks the first free slug among `base`, `base-2`, `base-3`, ...
pub(crate) fn unique_slug(
    base: &Slug,
    exists: impl Fn(&str) -> EngineResult<bool>,
) -> EngineResult<Slug> {
    if !exists(base.as_str())? {
        return Ok(base.clone());
    }
    let mut n = 2;
    loop {
        let candidate = base.with_suffix(n);
        if !exists(candidate.as_str())? {
            return Ok(candidate);
        }
        n += 1;
    }
}

pub struct Composer<'a> {
    engine: &'a FormEngine,
}

impl<'a> Composer<'a> {
    pub(crate) fn new(engine: &'a FormEngine) -> Self {
        Self { engine }
    }

    // ================================================================
    // Forms
    // ================================================================

    pub fn create_form(&self, user: &User, name: &str) -> EngineResult<FormComposition> {
        let store = self.engine.store();
        let mut form = FormComposition::new(user.id, name);
        form.slug = unique_slug(&form.slug, |s| Ok(store.form_slug_exists(s)?))?;
        let form = store.insert_form(form)?;
        info!(composition = %form.slug, "Form created");
        Ok(form)
    }

    /// Saves changed form settings. Id and owner cannot change.
    pub fn update_form(&self, user: &User, form: &FormComposition) -> EngineResult<()> {
        self.owned_form(user, form.id)?;
        if form.owner != user.id {
            return Err(EngineError::NotFound(format!("form {}", form.id)));
        }
        self.engine.store().update_form(form)?;
        Ok(())
    }

    pub fn list_forms(&self, user: &User) -> EngineResult<Vec<FormComposition>> {
        Ok(self.engine.store().list_forms(user.id)?)
    }

    /// Deletes a form with its entries. Cleanup hooks run afterwards; their
    /// failures are logged and do not bring the form back.
    pub fn delete_form(&self, user: &User, form_id: CompositionId) -> EngineResult<DeletedForm> {
        self.owned_form(user, form_id)?;
        let deleted = self.engine.store().delete_form(form_id)?;
        let catalog = self.engine.catalog();
        for entry in &deleted.elements {
            cleanup(catalog.elements(), &entry.plugin_uid, &entry.plugin_data);
        }
        for entry in &deleted.handlers {
            cleanup(catalog.handlers(), &entry.plugin_uid, &entry.plugin_data);
        }
        info!(composition = %deleted.form.slug, "Form deleted");
        Ok(deleted)
    }

    // ================================================================
    // Element entries
    // ================================================================

    /// Element plugins the user may add, grouped by category.
    pub fn available_elements(&self, user: &User) -> Vec<PluginGroup<'a, dyn ElementPlugin>> {
        self.engine
            .catalog()
            .elements()
            .get_for_user(user, self.engine.policy())
    }

    pub fn add_element(
        &self,
        user: &User,
        form_id: CompositionId,
        plugin_uid: &str,
        input: Option<FormInput>,
    ) -> EngineResult<EntryOutcome<ElementEntry>> {
        let form = self.owned_form(user, form_id)?;
        let plugin = self.allowed(self.engine.catalog().elements(), user, plugin_uid)?;
        let store = self.engine.store();
        let siblings = store.elements(form.id)?;

        Configuration::resolve(&**plugin, plugin.initialise_create_form(input), &siblings)?
            .save(|data| {
                let entry = store.append_element(form.id, plugin_uid, data, user.id)?;
                info!(
                    plugin_uid = %plugin_uid,
                    composition = %form.slug,
                    position = entry.position,
                    "Element added"
                );
                Ok(entry)
            })
    }

    pub fn edit_element(
        &self,
        user: &User,
        entry_id: EntryId,
        input: Option<FormInput>,
    ) -> EngineResult<EntryOutcome<ElementEntry>> {
        let store = self.engine.store();
        let mut entry = store.get_element(entry_id)?;
        self.owned_form(user, entry.composition_id)?;
        let plugin = self.allowed(self.engine.catalog().elements(), user, &entry.plugin_uid)?;
        let siblings: Vec<ElementEntry> = store
            .elements(entry.composition_id)?
            .into_iter()
            .filter(|e| e.id != entry.id)
            .collect();

        let Some(form) = plugin.initialise_edit_form(input, &entry.plugin_data) else {
            return Ok(EntryOutcome::Saved(entry));
        };
        Configuration::resolve(&**plugin, Some(form), &siblings)?.save(|data| {
            entry.plugin_data = data;
            store.update_element(&entry)?;
            info!(plugin_uid = %entry.plugin_uid, entry_id = %entry.id, "Element updated");
            Ok(entry)
        })
    }

    /// Runs the plugin's cleanup hook, then removes the entry. A failing hook
    /// keeps the entry.
    pub fn delete_element(&self, user: &User, entry_id: EntryId) -> EngineResult<ElementEntry> {
        let store = self.engine.store();
        let entry = store.get_element(entry_id)?;
        self.owned_form(user, entry.composition_id)?;
        release(self.engine.catalog().elements(), &entry.plugin_uid, &entry.plugin_data)?;
        let removed = store.delete_element(entry.id)?;
        info!(plugin_uid = %removed.plugin_uid, entry_id = %removed.id, "Element deleted");
        Ok(removed)
    }

    /// Rewrites element positions; all or nothing.
    pub fn reorder_elements(
        &self,
        user: &User,
        form_id: CompositionId,
        positions: &[(EntryId, i32)],
    ) -> EngineResult<()> {
        self.owned_form(user, form_id)?;
        self.engine.store().set_element_positions(form_id, positions)?;
        Ok(())
    }

    // ================================================================
    // Form handler entries
    // ================================================================

    /// Handler plugins the user may still attach to the form. Single-use
    /// handlers already attached are left out.
    pub fn available_handlers(
        &self,
        user: &User,
        form_id: CompositionId,
    ) -> EngineResult<Vec<PluginGroup<'a, dyn HandlerPlugin>>> {
        self.owned_form(user, form_id)?;
        let attached = self.engine.store().handlers(form_id)?;
        let groups = self
            .engine
            .catalog()
            .handlers()
            .get_for_user(user, self.engine.policy());
        Ok(without_attached_singles(groups, &attached))
    }

    pub fn add_handler(
        &self,
        user: &User,
        form_id: CompositionId,
        plugin_uid: &str,
        input: Option<FormInput>,
    ) -> EngineResult<EntryOutcome<HandlerEntry>> {
        let form = self.owned_form(user, form_id)?;
        let elements = self.engine.store().elements(form.id)?;
        self.attach(self.engine.catalog().handlers(), user, form.id, plugin_uid, input, &elements)
    }

    pub fn edit_handler(
        &self,
        user: &User,
        entry_id: EntryId,
        input: Option<FormInput>,
    ) -> EngineResult<EntryOutcome<HandlerEntry>> {
        let entry = self.engine.store().get_handler(entry_id)?;
        self.owned_form(user, entry.composition_id)?;
        let elements = self.engine.store().elements(entry.composition_id)?;
        self.reconfigure(self.engine.catalog().handlers(), user, entry, input, &elements)
    }

    pub fn delete_handler(&self, user: &User, entry_id: EntryId) -> EngineResult<HandlerEntry> {
        let entry = self.engine.store().get_handler(entry_id)?;
        self.owned_form(user, entry.composition_id)?;
        self.detach(self.engine.catalog().handlers(), entry)
    }

    // ================================================================
    // Wizards
    // ================================================================

    pub fn create_wizard(&self, user: &User, name: &str) -> EngineResult<WizardComposition> {
        let store = self.engine.store();
        let mut wizard = WizardComposition::new(user.id, name);
        wizard.slug = unique_slug(&wizard.slug, |s| Ok(store.wizard_slug_exists(s)?))?;
        let wizard = store.insert_wizard(wizard)?;
        info!(wizard = %wizard.slug, "Wizard created");
        Ok(wizard)
    }

    pub fn list_wizards(&self, user: &User) -> EngineResult<Vec<WizardComposition>> {
        Ok(self.engine.store().list_wizards(user.id)?)
    }

    pub fn delete_wizard(
        &self,
        user: &User,
        wizard_id: CompositionId,
    ) -> EngineResult<DeletedWizard> {
        self.owned_wizard(user, wizard_id)?;
        let deleted = self.engine.store().delete_wizard(wizard_id)?;
        for entry in &deleted.handlers {
            cleanup(
                self.engine.catalog().wizard_handlers(),
                &entry.plugin_uid,
                &entry.plugin_data,
            );
        }
        info!(wizard = %deleted.wizard.slug, "Wizard deleted");
        Ok(deleted)
    }

    /// Appends one of the user's forms as the last step.
    pub fn add_wizard_step(
        &self,
        user: &User,
        wizard_id: CompositionId,
        form_id: CompositionId,
    ) -> EngineResult<WizardStep> {
        let wizard = self.owned_wizard(user, wizard_id)?;
        let form = self.owned_form(user, form_id)?;
        let step = self.engine.store().append_wizard_step(wizard.id, form.id)?;
        info!(wizard = %wizard.slug, composition = %form.slug, position = step.position, "Wizard step added");
        Ok(step)
    }

    pub fn remove_wizard_step(
        &self,
        user: &User,
        wizard_id: CompositionId,
        step_id: EntryId,
    ) -> EngineResult<WizardStep> {
        self.owned_wizard(user, wizard_id)?;
        let store = self.engine.store();
        if !store.wizard_steps(wizard_id)?.iter().any(|s| s.id == step_id) {
            return Err(EngineError::NotFound(format!("wizard step {step_id}")));
        }
        Ok(store.delete_wizard_step(step_id)?)
    }

    pub fn available_wizard_handlers(
        &self,
        user: &User,
        wizard_id: CompositionId,
    ) -> EngineResult<Vec<PluginGroup<'a, dyn WizardHandlerPlugin>>> {
        self.owned_wizard(user, wizard_id)?;
        let attached = self.engine.store().handlers(wizard_id)?;
        let groups = self
            .engine
            .catalog()
            .wizard_handlers()
            .get_for_user(user, self.engine.policy());
        Ok(without_attached_singles(groups, &attached))
    }

    pub fn add_wizard_handler(
        &self,
        user: &User,
        wizard_id: CompositionId,
        plugin_uid: &str,
        input: Option<FormInput>,
    ) -> EngineResult<EntryOutcome<HandlerEntry>> {
        let wizard = self.owned_wizard(user, wizard_id)?;
        let registry = self.engine.catalog().wizard_handlers();
        self.attach(registry, user, wizard.id, plugin_uid, input, &[])
    }

    pub fn edit_wizard_handler(
        &self,
        user: &User,
        entry_id: EntryId,
        input: Option<FormInput>,
    ) -> EngineResult<EntryOutcome<HandlerEntry>> {
        let entry = self.engine.store().get_handler(entry_id)?;
        self.owned_wizard(user, entry.composition_id)?;
        self.reconfigure(self.engine.catalog().wizard_handlers(), user, entry, input, &[])
    }

    pub fn delete_wizard_handler(
        &self,
        user: &User,
        entry_id: EntryId,
    ) -> EngineResult<HandlerEntry> {
        let entry = self.engine.store().get_handler(entry_id)?;
        self.owned_wizard(user, entry.composition_id)?;
        self.detach(self.engine.catalog().wizard_handlers(), entry)
    }

    // ================================================================
    // Internals
    // ================================================================

    fn owned_form(&self, user: &User, id: CompositionId) -> EngineResult<FormComposition> {
        let form = self.engine.store().get_form(id)?;
        if form.owner != user.id {
            return Err(EngineError::NotFound(format!("form {id}")));
        }
        Ok(form)
    }

    fn owned_wizard(&self, user: &User, id: CompositionId) -> EngineResult<WizardComposition> {
        let wizard = self.engine.store().get_wizard(id)?;
        if wizard.owner != user.id {
            return Err(EngineError::NotFound(format!("wizard {id}")));
        }
        Ok(wizard)
    }

    fn allowed<'r, P: ?Sized + Plugin>(
        &self,
        registry: &'r Registry<P>,
        user: &User,
        uid: &str,
    ) -> EngineResult<&'r std::sync::Arc<P>> {
        registry.get_allowed(user, self.engine.policy(), uid)
    }

    fn attach<P: ?Sized + Plugin>(
        &self,
        registry: &Registry<P>,
        user: &User,
        composition_id: CompositionId,
        plugin_uid: &str,
        input: Option<FormInput>,
        elements: &[ElementEntry],
    ) -> EngineResult<EntryOutcome<HandlerEntry>> {
        let plugin = self.allowed(registry, user, plugin_uid)?;
        let store = self.engine.store();
        let single = !plugin.descriptor().allow_multiple;
        if single
            && store
                .handlers(composition_id)?
                .iter()
                .any(|h| h.plugin_uid == plugin_uid)
        {
            return Err(EngineError::HandlerAlreadyAttached {
                uid: plugin_uid.to_string(),
                name: plugin.name().to_string(),
            });
        }

        Configuration::resolve(&**plugin, plugin.initialise_create_form(input), elements)?
            .save(|data| {
                let entry = HandlerEntry::new(composition_id, plugin_uid, data, user.id);
                let entry = store.insert_handler(entry, single)?;
                info!(plugin_uid = %plugin_uid, composition_id = %composition_id, "Handler attached");
                Ok(entry)
            })
    }

    fn reconfigure<P: ?Sized + Plugin>(
        &self,
        registry: &Registry<P>,
        user: &User,
        mut entry: HandlerEntry,
        input: Option<FormInput>,
        elements: &[ElementEntry],
    ) -> EngineResult<EntryOutcome<HandlerEntry>> {
        let plugin = self.allowed(registry, user, &entry.plugin_uid)?;
        let Some(form) = plugin.initialise_edit_form(input, &entry.plugin_data) else {
            return Ok(EntryOutcome::Saved(entry));
        };
        let store = self.engine.store();
        Configuration::resolve(&**plugin, Some(form), elements)?.save(|data| {
            entry.plugin_data = data;
            store.update_handler(&entry)?;
            info!(plugin_uid = %entry.plugin_uid, entry_id = %entry.id, "Handler updated");
            Ok(entry)
        })
    }

    fn detach<P: ?Sized + Plugin>(
        &self,
        registry: &Registry<P>,
        entry: HandlerEntry,
    ) -> EngineResult<HandlerEntry> {
        release(registry, &entry.plugin_uid, &entry.plugin_data)?;
        let removed = self.engine.store().delete_handler(entry.id)?;
        info!(plugin_uid = %removed.plugin_uid, entry_id = %removed.id, "Handler detached");
        Ok(removed)
    }
}

/// Runs the cleanup hook of a registered plugin. Entries of unregistered
/// plugins have nothing to run and may be removed.
fn release<P: ?Sized + Plugin>(
    registry: &Registry<P>,
    uid: &str,
    data: &PluginData,
) -> EngineResult<()> {
    match registry.get(uid) {
        Ok(plugin) => plugin.on_delete(data).map_err(|e| EngineError::plugin(uid, e)),
        Err(_) => {
            warn!(plugin_uid = %uid, "Removing entry of unregistered plugin");
            Ok(())
        }
    }
}

/// Like [`release`], for entries already removed by a cascade.
fn cleanup<P: ?Sized + Plugin>(registry: &Registry<P>, uid: &str, data: &PluginData) {
    if let Err(e) = release(registry, uid, data) {
        warn!(plugin_uid = %uid, error = %e, "Cleanup after cascade delete failed");
    }
}

fn without_attached_singles<'r, P: ?Sized + Plugin>(
    groups: Vec<PluginGroup<'r, P>>,
    attached: &[HandlerEntry],
) -> Vec<PluginGroup<'r, P>> {
    groups
        .into_iter()
        .filter_map(|mut group| {
            group.plugins.retain(|p| {
                p.descriptor().allow_multiple || !attached.iter().any(|h| h.plugin_uid == p.uid())
            });
            (!group.plugins.is_empty()).then_some(group)
        })
        .collect()
}
