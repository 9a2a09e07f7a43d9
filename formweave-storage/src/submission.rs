use formweave_model::CleanedData;
use formweave_types::{CompositionId, EntryId, UserId};
use serde::{Deserialize, Serialize};

use crate::StorageResult;

/// A stored form or wizard submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedSubmission {
    pub id: EntryId,
    pub composition_id: CompositionId,
    pub user: Option<UserId>,
    /// Field name → label, in field order.
    pub headers: serde_json::Map<String, serde_json::Value>,
    pub data: CleanedData,
    /// Unix milliseconds.
    pub created_at: i64,
}

impl SavedSubmission {
    pub fn new(
        composition_id: CompositionId,
        user: Option<UserId>,
        headers: serde_json::Map<String, serde_json::Value>,
        data: CleanedData,
    ) -> Self {
        Self {
            id: EntryId::new(),
            composition_id,
            user,
            headers,
            data,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Storage for submitted data, used by the storing handler plugins.
pub trait SubmissionStore: Send + Sync {
    fn save_submission(&self, submission: SavedSubmission) -> StorageResult<()>;
    /// Submissions of a composition, oldest first.
    fn submissions(&self, composition_id: CompositionId) -> StorageResult<Vec<SavedSubmission>>;
}
