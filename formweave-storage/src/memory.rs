//! In-memory [`CompositionStore`] and [`SubmissionStore`].

use std::sync::{Mutex, MutexGuard};

use formweave_model::{
    ElementEntry, FormComposition, HandlerEntry, PluginData, WizardComposition, WizardStep,
};
use formweave_types::{CompositionId, EntryId, UserId};
use tracing::debug;

use crate::{
    CompositionStore, DeletedForm, DeletedWizard, SavedSubmission, StorageError, StorageResult,
    SubmissionStore,
};

#[derive(Default)]
struct Tables {
    forms: Vec<FormComposition>,
    elements: Vec<ElementEntry>,
    handlers: Vec<HandlerEntry>,
    wizards: Vec<WizardComposition>,
    steps: Vec<WizardStep>,
    submissions: Vec<SavedSubmission>,
}

impl Tables {
    fn next_element_position(&self, form_id: CompositionId) -> i32 {
        self.elements
            .iter()
            .filter(|e| e.composition_id == form_id)
            .map(|e| e.position)
            .max()
            .map_or(1, |max| max + 1)
    }

    fn position_taken(&self, form_id: CompositionId, position: i32, except: Option<EntryId>) -> bool {
        self.elements.iter().any(|e| {
            e.composition_id == form_id && e.position == position && Some(e.id) != except
        })
    }
}

/// All tables behind one mutex, so every operation is atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn open_in_memory() -> Self {
        Self::default()
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Tables>> {
        self.tables.lock().map_err(|_| StorageError::LockPoisoned)
    }
}

fn not_found(what: &str, id: impl std::fmt::Display) -> StorageError {
    StorageError::NotFound(format!("{what} {id}"))
}

impl CompositionStore for MemoryStore {
    fn insert_form(&self, form: FormComposition) -> StorageResult<FormComposition> {
        let mut t = self.lock()?;
        if t.forms.iter().any(|f| f.slug == form.slug) {
            return Err(StorageError::IntegrityConflict(format!(
                "form slug '{}' already exists",
                form.slug
            )));
        }
        t.forms.push(form.clone());
        Ok(form)
    }

    fn update_form(&self, form: &FormComposition) -> StorageResult<()> {
        let mut t = self.lock()?;
        if t.forms.iter().any(|f| f.slug == form.slug && f.id != form.id) {
            return Err(StorageError::IntegrityConflict(format!(
                "form slug '{}' already exists",
                form.slug
            )));
        }
        let slot = t
            .forms
            .iter_mut()
            .find(|f| f.id == form.id)
            .ok_or_else(|| not_found("form", form.id))?;
        *slot = form.clone();
        Ok(())
    }

    fn get_form(&self, id: CompositionId) -> StorageResult<FormComposition> {
        let t = self.lock()?;
        t.forms
            .iter()
            .find(|f| f.id == id)
            .cloned()
            .ok_or_else(|| not_found("form", id))
    }

    fn get_form_by_slug(&self, slug: &str) -> StorageResult<FormComposition> {
        let t = self.lock()?;
        t.forms
            .iter()
            .find(|f| f.slug.as_str() == slug)
            .cloned()
            .ok_or_else(|| not_found("form", slug))
    }

    fn form_slug_exists(&self, slug: &str) -> StorageResult<bool> {
        Ok(self.lock()?.forms.iter().any(|f| f.slug.as_str() == slug))
    }

    fn list_forms(&self, owner: UserId) -> StorageResult<Vec<FormComposition>> {
        let t = self.lock()?;
        Ok(t.forms.iter().filter(|f| f.owner == owner).cloned().collect())
    }

    fn delete_form(&self, id: CompositionId) -> StorageResult<DeletedForm> {
        let mut t = self.lock()?;
        let idx = t
            .forms
            .iter()
            .position(|f| f.id == id)
            .ok_or_else(|| not_found("form", id))?;
        let form = t.forms.remove(idx);

        let (elements, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut t.elements)
            .into_iter()
            .partition(|e| e.composition_id == id);
        t.elements = kept;
        let (handlers, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut t.handlers)
            .into_iter()
            .partition(|h| h.composition_id == id);
        t.handlers = kept;
        t.steps.retain(|s| s.form_id != id);

        let mut elements = elements;
        elements.sort_by_key(|e| e.position);
        debug!(form = %form.slug, elements = elements.len(), handlers = handlers.len(), "form deleted");
        Ok(DeletedForm {
            form,
            elements,
            handlers,
        })
    }

    fn elements(&self, form_id: CompositionId) -> StorageResult<Vec<ElementEntry>> {
        let t = self.lock()?;
        let mut out: Vec<ElementEntry> = t
            .elements
            .iter()
            .filter(|e| e.composition_id == form_id)
            .cloned()
            .collect();
        out.sort_by_key(|e| e.position);
        Ok(out)
    }

    fn get_element(&self, id: EntryId) -> StorageResult<ElementEntry> {
        let t = self.lock()?;
        t.elements
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or_else(|| not_found("element entry", id))
    }

    fn append_element(
        &self,
        form_id: CompositionId,
        plugin_uid: &str,
        plugin_data: PluginData,
        owner: UserId,
    ) -> StorageResult<ElementEntry> {
        let mut t = self.lock()?;
        if !t.forms.iter().any(|f| f.id == form_id) {
            return Err(not_found("form", form_id));
        }
        let position = t.next_element_position(form_id);
        let entry = ElementEntry::new(form_id, plugin_uid, plugin_data, position, owner);
        t.elements.push(entry.clone());
        Ok(entry)
    }

    fn insert_element(&self, entry: ElementEntry) -> StorageResult<ElementEntry> {
        let mut t = self.lock()?;
        if !t.forms.iter().any(|f| f.id == entry.composition_id) {
            return Err(not_found("form", entry.composition_id));
        }
        if t.position_taken(entry.composition_id, entry.position, None) {
            return Err(StorageError::IntegrityConflict(format!(
                "position {} already used in form {}",
                entry.position, entry.composition_id
            )));
        }
        t.elements.push(entry.clone());
        Ok(entry)
    }

    fn update_element(&self, entry: &ElementEntry) -> StorageResult<()> {
        let mut t = self.lock()?;
        if t.position_taken(entry.composition_id, entry.position, Some(entry.id)) {
            return Err(StorageError::IntegrityConflict(format!(
                "position {} already used in form {}",
                entry.position, entry.composition_id
            )));
        }
        let slot = t
            .elements
            .iter_mut()
            .find(|e| e.id == entry.id)
            .ok_or_else(|| not_found("element entry", entry.id))?;
        *slot = entry.clone();
        Ok(())
    }

    fn set_element_positions(
        &self,
        form_id: CompositionId,
        positions: &[(EntryId, i32)],
    ) -> StorageResult<()> {
        let mut t = self.lock()?;
        let mut next: Vec<ElementEntry> = t
            .elements
            .iter()
            .filter(|e| e.composition_id == form_id)
            .cloned()
            .collect();
        for (id, position) in positions {
            let entry = next
                .iter_mut()
                .find(|e| e.id == *id)
                .ok_or_else(|| not_found("element entry", id))?;
            entry.position = *position;
        }
        let mut seen: Vec<i32> = next.iter().map(|e| e.position).collect();
        seen.sort_unstable();
        if seen.windows(2).any(|w| w[0] == w[1]) {
            return Err(StorageError::IntegrityConflict(format!(
                "duplicate positions in form {form_id}"
            )));
        }
        for updated in next {
            if let Some(slot) = t.elements.iter_mut().find(|e| e.id == updated.id) {
                slot.position = updated.position;
            }
        }
        Ok(())
    }

    fn delete_element(&self, id: EntryId) -> StorageResult<ElementEntry> {
        let mut t = self.lock()?;
        let idx = t
            .elements
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| not_found("element entry", id))?;
        Ok(t.elements.remove(idx))
    }

    fn handlers(&self, composition_id: CompositionId) -> StorageResult<Vec<HandlerEntry>> {
        let t = self.lock()?;
        Ok(t.handlers
            .iter()
            .filter(|h| h.composition_id == composition_id)
            .cloned()
            .collect())
    }

    fn get_handler(&self, id: EntryId) -> StorageResult<HandlerEntry> {
        let t = self.lock()?;
        t.handlers
            .iter()
            .find(|h| h.id == id)
            .cloned()
            .ok_or_else(|| not_found("handler entry", id))
    }

    fn insert_handler(&self, entry: HandlerEntry, unique_uid: bool) -> StorageResult<HandlerEntry> {
        let mut t = self.lock()?;
        let parent_exists = t.forms.iter().any(|f| f.id == entry.composition_id)
            || t.wizards.iter().any(|w| w.id == entry.composition_id);
        if !parent_exists {
            return Err(not_found("composition", entry.composition_id));
        }
        if unique_uid
            && t.handlers.iter().any(|h| {
                h.composition_id == entry.composition_id && h.plugin_uid == entry.plugin_uid
            })
        {
            return Err(StorageError::IntegrityConflict(format!(
                "handler '{}' already attached to {}",
                entry.plugin_uid, entry.composition_id
            )));
        }
        t.handlers.push(entry.clone());
        Ok(entry)
    }

    fn update_handler(&self, entry: &HandlerEntry) -> StorageResult<()> {
        let mut t = self.lock()?;
        let slot = t
            .handlers
            .iter_mut()
            .find(|h| h.id == entry.id)
            .ok_or_else(|| not_found("handler entry", entry.id))?;
        *slot = entry.clone();
        Ok(())
    }

    fn delete_handler(&self, id: EntryId) -> StorageResult<HandlerEntry> {
        let mut t = self.lock()?;
        let idx = t
            .handlers
            .iter()
            .position(|h| h.id == id)
            .ok_or_else(|| not_found("handler entry", id))?;
        Ok(t.handlers.remove(idx))
    }

    fn insert_wizard(&self, wizard: WizardComposition) -> StorageResult<WizardComposition> {
        let mut t = self.lock()?;
        if t.wizards.iter().any(|w| w.slug == wizard.slug) {
            return Err(StorageError::IntegrityConflict(format!(
                "wizard slug '{}' already exists",
                wizard.slug
            )));
        }
        t.wizards.push(wizard.clone());
        Ok(wizard)
    }

    fn get_wizard(&self, id: CompositionId) -> StorageResult<WizardComposition> {
        let t = self.lock()?;
        t.wizards
            .iter()
            .find(|w| w.id == id)
            .cloned()
            .ok_or_else(|| not_found("wizard", id))
    }

    fn get_wizard_by_slug(&self, slug: &str) -> StorageResult<WizardComposition> {
        let t = self.lock()?;
        t.wizards
            .iter()
            .find(|w| w.slug.as_str() == slug)
            .cloned()
            .ok_or_else(|| not_found("wizard", slug))
    }

    fn wizard_slug_exists(&self, slug: &str) -> StorageResult<bool> {
        Ok(self.lock()?.wizards.iter().any(|w| w.slug.as_str() == slug))
    }

    fn list_wizards(&self, owner: UserId) -> StorageResult<Vec<WizardComposition>> {
        let t = self.lock()?;
        Ok(t.wizards.iter().filter(|w| w.owner == owner).cloned().collect())
    }

    fn delete_wizard(&self, id: CompositionId) -> StorageResult<DeletedWizard> {
        let mut t = self.lock()?;
        let idx = t
            .wizards
            .iter()
            .position(|w| w.id == id)
            .ok_or_else(|| not_found("wizard", id))?;
        let wizard = t.wizards.remove(idx);
        let (mut steps, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut t.steps)
            .into_iter()
            .partition(|s| s.wizard_id == id);
        t.steps = kept;
        steps.sort_by_key(|s| s.position);
        let (handlers, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut t.handlers)
            .into_iter()
            .partition(|h| h.composition_id == id);
        t.handlers = kept;
        Ok(DeletedWizard {
            wizard,
            steps,
            handlers,
        })
    }

    fn wizard_steps(&self, wizard_id: CompositionId) -> StorageResult<Vec<WizardStep>> {
        let t = self.lock()?;
        let mut out: Vec<WizardStep> = t
            .steps
            .iter()
            .filter(|s| s.wizard_id == wizard_id)
            .cloned()
            .collect();
        out.sort_by_key(|s| s.position);
        Ok(out)
    }

    fn append_wizard_step(
        &self,
        wizard_id: CompositionId,
        form_id: CompositionId,
    ) -> StorageResult<WizardStep> {
        let mut t = self.lock()?;
        if !t.wizards.iter().any(|w| w.id == wizard_id) {
            return Err(not_found("wizard", wizard_id));
        }
        if !t.forms.iter().any(|f| f.id == form_id) {
            return Err(not_found("form", form_id));
        }
        if t.steps.iter().any(|s| s.wizard_id == wizard_id && s.form_id == form_id) {
            return Err(StorageError::IntegrityConflict(format!(
                "form {form_id} is already a step of wizard {wizard_id}"
            )));
        }
        let position = t
            .steps
            .iter()
            .filter(|s| s.wizard_id == wizard_id)
            .map(|s| s.position)
            .max()
            .map_or(1, |max| max + 1);
        let step = WizardStep::new(wizard_id, form_id, position);
        t.steps.push(step.clone());
        Ok(step)
    }

    fn delete_wizard_step(&self, id: EntryId) -> StorageResult<WizardStep> {
        let mut t = self.lock()?;
        let idx = t
            .steps
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| not_found("wizard step", id))?;
        Ok(t.steps.remove(idx))
    }
}

impl SubmissionStore for MemoryStore {
    fn save_submission(&self, submission: SavedSubmission) -> StorageResult<()> {
        self.lock()?.submissions.push(submission);
        Ok(())
    }

    fn submissions(&self, composition_id: CompositionId) -> StorageResult<Vec<SavedSubmission>> {
        let t = self.lock()?;
        Ok(t.submissions
            .iter()
            .filter(|s| s.composition_id == composition_id)
            .cloned()
            .collect())
    }
}
