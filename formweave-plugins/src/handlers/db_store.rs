use std::sync::Arc;

use formweave_engine::{
    FormHandlerContext, HandlerFailure, HandlerPlugin, HandlerResult, Plugin, WizardHandlerContext,
    WizardHandlerPlugin,
};
use formweave_model::{CleanedData, ElementEntry, PluginDescriptor};
use formweave_storage::{SavedSubmission, SubmissionStore};
use formweave_types::{CompositionId, UserId};
use serde_json::json;
use tracing::debug;

use super::field_labels;

/// Saves each submission through a [`SubmissionStore`]. Usable once per
/// composition.
pub struct DbStoreHandler {
    descriptor: PluginDescriptor,
    submissions: Arc<dyn SubmissionStore>,
}

impl DbStoreHandler {
    pub fn new(submissions: Arc<dyn SubmissionStore>) -> Self {
        Self {
            descriptor: PluginDescriptor::new("db_store", "DB store")
                .in_group("Storage")
                .single(),
            submissions,
        }
    }

    fn store(
        &self,
        composition_id: CompositionId,
        user: Option<UserId>,
        elements: &[ElementEntry],
        data: CleanedData,
    ) -> HandlerResult {
        let headers = field_labels(elements, &data);
        let submission = SavedSubmission::new(composition_id, user, headers, data);
        let id = submission.id;
        self.submissions
            .save_submission(submission)
            .map_err(|e| HandlerFailure::new(format!("could not store submission: {e}")))?;
        debug!(composition_id = %composition_id, submission_id = %id, "Submission stored");
        Ok(json!({ "submission_id": id.to_string() }))
    }
}

impl Plugin for DbStoreHandler {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }
}

impl HandlerPlugin for DbStoreHandler {
    fn run(&self, ctx: FormHandlerContext<'_>) -> HandlerResult {
        self.store(
            ctx.composition.id,
            ctx.request.user_id(),
            ctx.elements,
            ctx.cleaned_data.clone(),
        )
    }
}

impl WizardHandlerPlugin for DbStoreHandler {
    fn run(&self, ctx: WizardHandlerContext<'_>) -> HandlerResult {
        self.store(
            ctx.wizard.id,
            ctx.request.user_id(),
            ctx.elements,
            ctx.merged_data(),
        )
    }
}
