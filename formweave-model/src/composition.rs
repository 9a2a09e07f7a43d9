use formweave_types::{CompositionId, EntryId, Slug, UserId};
use serde::{Deserialize, Serialize};

/// A named, persisted form blueprint. Owns an ordered set of element
/// entries and an unordered set of handler entries (kept by the store).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormComposition {
    pub id: CompositionId,
    pub name: String,
    pub slug: Slug,
    pub owner: UserId,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub is_cloneable: bool,
    #[serde(default)]
    pub success_page_title: String,
    #[serde(default)]
    pub success_page_message: String,
    /// Custom form action URL; empty means "submit to the form itself".
    #[serde(default)]
    pub action: String,
}

impl FormComposition {
    /// Creates a private form with a slug derived from `name`.
    pub fn new(owner: UserId, name: &str) -> Self {
        Self {
            id: CompositionId::new(),
            name: name.into(),
            slug: Slug::from_name(name),
            owner,
            is_public: false,
            is_cloneable: false,
            success_page_title: String::new(),
            success_page_message: String::new(),
            action: String::new(),
        }
    }

    /// Anonymous visitors only see public forms; users also see their own.
    pub fn visible_to(&self, user: Option<UserId>) -> bool {
        self.is_public || user == Some(self.owner)
    }
}

/// A multi-step flow chaining several form compositions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WizardComposition {
    pub id: CompositionId,
    pub name: String,
    pub slug: Slug,
    pub owner: UserId,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub success_page_title: String,
    #[serde(default)]
    pub success_page_message: String,
}

impl WizardComposition {
    pub fn new(owner: UserId, name: &str) -> Self {
        Self {
            id: CompositionId::new(),
            name: name.into(),
            slug: Slug::from_name(name),
            owner,
            is_public: false,
            success_page_title: String::new(),
            success_page_message: String::new(),
        }
    }

    pub fn visible_to(&self, user: Option<UserId>) -> bool {
        self.is_public || user == Some(self.owner)
    }
}

/// Binding of one form composition as a step of a wizard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WizardStep {
    pub id: EntryId,
    pub wizard_id: CompositionId,
    pub form_id: CompositionId,
    pub position: i32,
}

impl WizardStep {
    pub fn new(wizard_id: CompositionId, form_id: CompositionId, position: i32) -> Self {
        Self {
            id: EntryId::new(),
            wizard_id,
            form_id,
            position,
        }
    }
}
