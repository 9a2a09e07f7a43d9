//! Persistence layer for formweave.
//!
//! The engine never talks to a database directly; it goes through the
//! [`CompositionStore`] and [`SubmissionStore`] traits. Implementations must
//! provide:
//!
//! - entries of a composition ordered by position (elements, wizard steps)
//!   or insertion order (handlers)
//! - atomic `max(position) + 1` on append
//! - uniqueness of (composition, position), of slugs, and of
//!   (composition, plugin uid) for single-use handlers
//! - cascade delete of entries when their composition is deleted
//!
//! [`MemoryStore`] is the reference implementation used by tests and tools.

mod error;
mod memory;
mod submission;

pub use error::{StorageError, StorageResult};
pub use memory::MemoryStore;
pub use submission::{SavedSubmission, SubmissionStore};

use formweave_model::{
    ElementEntry, FormComposition, HandlerEntry, PluginData, WizardComposition, WizardStep,
};
use formweave_types::{CompositionId, EntryId, UserId};

/// Everything removed by a cascading form delete.
#[derive(Debug, Clone)]
pub struct DeletedForm {
    pub form: FormComposition,
    pub elements: Vec<ElementEntry>,
    pub handlers: Vec<HandlerEntry>,
}

/// Everything removed by a cascading wizard delete.
#[derive(Debug, Clone)]
pub struct DeletedWizard {
    pub wizard: WizardComposition,
    pub steps: Vec<WizardStep>,
    pub handlers: Vec<HandlerEntry>,
}

/// Storage contract for compositions and their plugin entries.
pub trait CompositionStore: Send + Sync {
    // ── Forms ──
    /// Fails with `IntegrityConflict` when the slug is taken.
    fn insert_form(&self, form: FormComposition) -> StorageResult<FormComposition>;
    fn update_form(&self, form: &FormComposition) -> StorageResult<()>;
    fn get_form(&self, id: CompositionId) -> StorageResult<FormComposition>;
    fn get_form_by_slug(&self, slug: &str) -> StorageResult<FormComposition>;
    fn form_slug_exists(&self, slug: &str) -> StorageResult<bool>;
    fn list_forms(&self, owner: UserId) -> StorageResult<Vec<FormComposition>>;
    /// Removes the form, its entries and any wizard step pointing at it.
    fn delete_form(&self, id: CompositionId) -> StorageResult<DeletedForm>;

    // ── Element entries ──
    /// Elements of a form in ascending position order.
    fn elements(&self, form_id: CompositionId) -> StorageResult<Vec<ElementEntry>>;
    fn get_element(&self, id: EntryId) -> StorageResult<ElementEntry>;
    /// Inserts at `max(position) + 1` (1 for an empty form) in one step.
    fn append_element(
        &self,
        form_id: CompositionId,
        plugin_uid: &str,
        plugin_data: PluginData,
        owner: UserId,
    ) -> StorageResult<ElementEntry>;
    /// Inserts keeping the entry's position. Fails with `IntegrityConflict`
    /// when the position is taken.
    fn insert_element(&self, entry: ElementEntry) -> StorageResult<ElementEntry>;
    fn update_element(&self, entry: &ElementEntry) -> StorageResult<()>;
    /// Rewrites several positions at once; all or nothing.
    fn set_element_positions(
        &self,
        form_id: CompositionId,
        positions: &[(EntryId, i32)],
    ) -> StorageResult<()>;
    fn delete_element(&self, id: EntryId) -> StorageResult<ElementEntry>;

    // ── Handler entries (forms and wizards) ──
    /// Handlers of a composition in insertion order.
    fn handlers(&self, composition_id: CompositionId) -> StorageResult<Vec<HandlerEntry>>;
    fn get_handler(&self, id: EntryId) -> StorageResult<HandlerEntry>;
    /// With `unique_uid`, fails with `IntegrityConflict` if the composition
    /// already has a handler with the same plugin uid.
    fn insert_handler(&self, entry: HandlerEntry, unique_uid: bool) -> StorageResult<HandlerEntry>;
    fn update_handler(&self, entry: &HandlerEntry) -> StorageResult<()>;
    fn delete_handler(&self, id: EntryId) -> StorageResult<HandlerEntry>;

    // ── Wizards ──
    fn insert_wizard(&self, wizard: WizardComposition) -> StorageResult<WizardComposition>;
    fn get_wizard(&self, id: CompositionId) -> StorageResult<WizardComposition>;
    fn get_wizard_by_slug(&self, slug: &str) -> StorageResult<WizardComposition>;
    fn wizard_slug_exists(&self, slug: &str) -> StorageResult<bool>;
    fn list_wizards(&self, owner: UserId) -> StorageResult<Vec<WizardComposition>>;
    fn delete_wizard(&self, id: CompositionId) -> StorageResult<DeletedWizard>;
    /// Steps of a wizard in ascending position order.
    fn wizard_steps(&self, wizard_id: CompositionId) -> StorageResult<Vec<WizardStep>>;
    /// Appends a step at `max(position) + 1`. A form may appear once per wizard.
    fn append_wizard_step(
        &self,
        wizard_id: CompositionId,
        form_id: CompositionId,
    ) -> StorageResult<WizardStep>;
    fn delete_wizard_step(&self, id: EntryId) -> StorageResult<WizardStep>;
}
