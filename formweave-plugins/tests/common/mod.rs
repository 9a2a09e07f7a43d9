#![allow(dead_code)]

use std::sync::Arc;

use formweave_engine::{EngineConfig, FormEngine, RequestContext, User};
use formweave_model::{ElementEntry, FormComposition, FormInput, HandlerEntry};
use formweave_plugins::{Builtins, MemoryOutbox, default_catalog};
use formweave_storage::MemoryStore;
use formweave_types::UserId;
use tempfile::TempDir;

pub struct Fixture {
    pub engine: FormEngine,
    pub store: Arc<MemoryStore>,
    pub outbox: Arc<MemoryOutbox>,
    pub media: TempDir,
    pub owner: User,
}

pub fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::open_in_memory());
    let outbox = Arc::new(MemoryOutbox::new());
    let media = tempfile::tempdir().unwrap();
    let builtins = Builtins::new(store.clone(), outbox.clone()).with_media_root(media.path());
    let catalog = default_catalog(&builtins).unwrap();
    let config = EngineConfig::default().with_media_root(media.path());
    let engine = FormEngine::new(Arc::new(catalog), store.clone(), config);
    Fixture {
        engine,
        store,
        outbox,
        media,
        owner: User::new(UserId::new()),
    }
}

impl Fixture {
    pub fn request(&self) -> RequestContext {
        RequestContext::for_user(self.owner.clone())
    }

    pub fn form(&self, name: &str) -> FormComposition {
        self.engine.composer().create_form(&self.owner, name).unwrap()
    }

    /// Adds a configured element, panicking if the configuration is rejected.
    pub fn element(&self, form: &FormComposition, uid: &str, config: FormInput) -> ElementEntry {
        let outcome = self
            .engine
            .composer()
            .add_element(&self.owner, form.id, uid, Some(config))
            .unwrap();
        match outcome.saved() {
            Some(entry) => entry,
            None => panic!("configuration of {uid} was rejected"),
        }
    }

    pub fn handler(&self, form: &FormComposition, uid: &str, config: Option<FormInput>) -> HandlerEntry {
        let outcome = self
            .engine
            .composer()
            .add_handler(&self.owner, form.id, uid, config)
            .unwrap();
        match outcome.saved() {
            Some(entry) => entry,
            None => panic!("configuration of {uid} was rejected"),
        }
    }
}

pub fn field(label: &str, name: &str, required: bool) -> FormInput {
    FormInput::new()
        .with("label", label)
        .with("name", name)
        .with("required", required)
}
