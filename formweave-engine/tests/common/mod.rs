//! Test plugins and fixtures shared by the engine integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use formweave_engine::*;
use formweave_model::*;
use formweave_storage::MemoryStore;
use formweave_types::UserId;
use serde::{Deserialize, Serialize};
use serde_json::json;

// ================================================================
// Element plugins
// ================================================================

#[derive(Debug, Serialize, Deserialize)]
struct FieldConfig {
    name: String,
    #[serde(default)]
    label: String,
    #[serde(default)]
    required: bool,
}

/// Configurable element producing one field of a fixed kind.
pub struct FieldElement {
    descriptor: PluginDescriptor,
    make: fn(&str, &str) -> FieldDefinition,
}

impl FieldElement {
    pub fn new(uid: &str, make: fn(&str, &str) -> FieldDefinition) -> Self {
        Self {
            descriptor: PluginDescriptor::new(uid, uid).in_group("Fields"),
            make,
        }
    }
}

impl Plugin for FieldElement {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    fn configuration_form(&self) -> Option<FormSchema> {
        Some(FormSchema::new(vec![
            FieldDefinition::text("name", "Name").required(true),
            FieldDefinition::text("label", "Label"),
            FieldDefinition::boolean("required", "Required"),
        ]))
    }

    fn validate(&self, form: &mut BoundForm, siblings: &[ElementEntry]) {
        let Some(name) = form.cleaned_data().and_then(|c| c.get("name")).cloned() else {
            return;
        };
        if siblings
            .iter()
            .any(|s| s.plugin_data.get("name") == Some(&name))
        {
            form.add_error(Some("name"), "Duplicate name.");
        }
    }

    fn on_delete(&self, data: &PluginData) -> Result<(), PluginError> {
        if data.get("locked") == Some(&json!(true)) {
            return Err(PluginError::Other("entry is locked".into()));
        }
        Ok(())
    }
}

impl ElementPlugin for FieldElement {
    fn to_field(
        &self,
        data: &PluginData,
        _position: i32,
        _request: &RequestContext,
    ) -> Result<FieldDefinition, PluginError> {
        let config: FieldConfig = decode(data)?;
        Ok((self.make)(&config.name, &config.label).required(config.required))
    }
}

/// Non-configurable element adding a hidden `token` field, upper-cased on
/// submission.
pub struct TokenElement {
    descriptor: PluginDescriptor,
}

impl TokenElement {
    pub fn new() -> Self {
        Self {
            descriptor: PluginDescriptor::new("token", "Token").in_group("Hidden"),
        }
    }
}

impl Plugin for TokenElement {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }
}

impl ElementPlugin for TokenElement {
    fn to_field(
        &self,
        _data: &PluginData,
        _position: i32,
        _request: &RequestContext,
    ) -> Result<FieldDefinition, PluginError> {
        Ok(FieldDefinition::hidden("token"))
    }

    fn submit_form_data(
        &self,
        _data: &PluginData,
        form: &mut BoundForm,
        _request: &RequestContext,
    ) -> Result<(), PluginError> {
        if let Some(cleaned) = form.cleaned_data_mut() {
            let upper = cleaned
                .get("token")
                .and_then(|v| v.as_str())
                .map(str::to_uppercase);
            if let Some(upper) = upper {
                cleaned.insert("token".into(), json!(upper));
            }
        }
        Ok(())
    }
}

// ================================================================
// Handler plugins
// ================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
    Succeed,
    Fail,
    Panic,
}

pub type Log = Arc<Mutex<Vec<String>>>;

/// Handler recording each run in a shared log.
pub struct RecordingHandler {
    descriptor: PluginDescriptor,
    behaviour: Behaviour,
    log: Log,
}

impl RecordingHandler {
    pub fn new(uid: &str, behaviour: Behaviour, log: Log) -> Self {
        Self {
            descriptor: PluginDescriptor::new(uid, &format!("{uid} handler")).in_group("Handlers"),
            behaviour,
            log,
        }
    }

    pub fn single(mut self) -> Self {
        self.descriptor = self.descriptor.single();
        self
    }

    fn act(&self, summary: String) -> HandlerResult {
        self.log
            .lock()
            .unwrap()
            .push(format!("{}:{}", self.descriptor.uid, summary));
        match self.behaviour {
            Behaviour::Succeed => Ok(json!({"handled_by": self.descriptor.uid})),
            Behaviour::Fail => Err(HandlerFailure::new("backend unavailable")),
            Behaviour::Panic => panic!("handler exploded"),
        }
    }
}

impl Plugin for RecordingHandler {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }
}

impl HandlerPlugin for RecordingHandler {
    fn run(&self, ctx: FormHandlerContext<'_>) -> HandlerResult {
        let keys: Vec<&str> = ctx.cleaned_data.keys().map(String::as_str).collect();
        self.act(keys.join(","))
    }
}

impl WizardHandlerPlugin for RecordingHandler {
    fn run(&self, ctx: WizardHandlerContext<'_>) -> HandlerResult {
        let merged = ctx.merged_data();
        let keys: Vec<&str> = merged.keys().map(String::as_str).collect();
        self.act(format!("{}steps:{}", ctx.steps.len(), keys.join(",")))
    }
}

// ================================================================
// Fixtures
// ================================================================

pub fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn logged(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

pub fn catalog(log: &Log) -> CatalogBuilder {
    let mut builder = PluginCatalog::builder();
    builder
        .element(FieldElement::new("text", FieldDefinition::text))
        .unwrap()
        .element(FieldElement::new("email", FieldDefinition::email))
        .unwrap()
        .element(FieldElement::new("integer", FieldDefinition::integer))
        .unwrap()
        .element(TokenElement::new())
        .unwrap()
        .handler(RecordingHandler::new("db_store", Behaviour::Succeed, log.clone()).single())
        .unwrap()
        .handler(RecordingHandler::new("mail", Behaviour::Succeed, log.clone()))
        .unwrap()
        .handler(RecordingHandler::new("broken", Behaviour::Fail, log.clone()))
        .unwrap()
        .handler(RecordingHandler::new("panicky", Behaviour::Panic, log.clone()))
        .unwrap()
        .wizard_handler(RecordingHandler::new("db_store", Behaviour::Succeed, log.clone()).single())
        .unwrap()
        .wizard_handler(RecordingHandler::new("broken", Behaviour::Fail, log.clone()))
        .unwrap();
    builder
}

pub struct Fixture {
    pub engine: FormEngine,
    pub store: Arc<MemoryStore>,
    pub log: Log,
    pub owner: User,
}

pub fn fixture() -> Fixture {
    fixture_with(EngineConfig::default(), |_| {})
}

pub fn fixture_with(config: EngineConfig, extend: impl FnOnce(&mut CatalogBuilder)) -> Fixture {
    let log = new_log();
    let mut builder = catalog(&log);
    extend(&mut builder);
    let store = Arc::new(MemoryStore::open_in_memory());
    let engine = FormEngine::new(Arc::new(builder.build()), store.clone(), config);
    Fixture {
        engine,
        store,
        log,
        owner: User::new(UserId::new()),
    }
}

pub fn field_data(name: &str, required: bool) -> PluginData {
    let mut data = PluginData::new();
    data.insert("name".into(), json!(name));
    data.insert("label".into(), json!(name.to_uppercase()));
    data.insert("required".into(), json!(required));
    data
}

pub fn config_input(name: &str, required: bool) -> FormInput {
    FormInput::new()
        .with("name", name)
        .with("label", name.to_uppercase())
        .with("required", required)
}

impl Fixture {
    pub fn request(&self) -> RequestContext {
        RequestContext::for_user(self.owner.clone())
    }

    /// Stores a form with the given `(uid, field name, required)` elements,
    /// in order, and the given handler uids.
    pub fn form(&self, name: &str, elements: &[(&str, &str, bool)], handlers: &[&str]) -> FormComposition {
        let form = self.engine.composer().create_form(&self.owner, name).unwrap();
        for (uid, field, required) in elements {
            self.store_element(&form, uid, field, *required);
        }
        for uid in handlers {
            formweave_storage::CompositionStore::insert_handler(
                self.store.as_ref(),
                HandlerEntry::new(form.id, uid, PluginData::new(), self.owner.id),
                false,
            )
            .unwrap();
        }
        form
    }

    pub fn store_element(&self, form: &FormComposition, uid: &str, field: &str, required: bool) -> ElementEntry {
        formweave_storage::CompositionStore::append_element(
            self.store.as_ref(),
            form.id,
            uid,
            field_data(field, required),
            self.owner.id,
        )
        .unwrap()
    }
}
