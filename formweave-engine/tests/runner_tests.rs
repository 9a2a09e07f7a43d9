mod common;

use common::*;
use formweave_engine::*;
use formweave_model::*;
use formweave_types::UserId;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;

fn handlers(composition: &FormComposition, uids: &[&str]) -> Vec<HandlerEntry> {
    uids.iter()
        .map(|uid| HandlerEntry::new(composition.id, uid, PluginData::new(), composition.owner))
        .collect()
}

fn cleaned() -> CleanedData {
    let mut data = CleanedData::new();
    data.insert("name".into(), json!("A"));
    data
}

// ================================================================
// Isolation
// ================================================================

#[test]
fn failure_does_not_stop_later_handlers() {
    let fx = fixture();
    let composition = FormComposition::new(UserId::new(), "Contact");
    let entries = handlers(&composition, &["db_store", "broken", "mail"]);

    let report = fx.engine.runner().run_form_handlers(
        &composition,
        &RequestContext::anonymous(),
        &cleaned(),
        &[],
        &entries,
    );

    let succeeded: Vec<&str> = report.responses.iter().map(|r| r.plugin_uid.as_str()).collect();
    assert_eq!(succeeded, vec!["db_store", "mail"]);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].plugin_uid, "broken");
    assert_eq!(report.errors[0].message, "backend unavailable");
    assert_eq!(logged(&fx.log), vec!["db_store:name", "broken:name", "mail:name"]);
}

#[test]
fn panics_are_caught_and_reported() {
    let fx = fixture();
    let composition = FormComposition::new(UserId::new(), "Contact");
    let entries = handlers(&composition, &["panicky", "mail"]);

    let report = fx.engine.runner().run_form_handlers(
        &composition,
        &RequestContext::anonymous(),
        &cleaned(),
        &[],
        &entries,
    );

    assert_eq!(report.responses.len(), 1);
    assert_eq!(report.errors[0].plugin_uid, "panicky");
    assert!(report.errors[0].message.contains("handler exploded"));
}

#[test]
fn unregistered_handler_is_recorded_as_error() {
    let fx = fixture();
    let composition = FormComposition::new(UserId::new(), "Contact");
    let entries = handlers(&composition, &["webhook_v1", "mail"]);

    let report = fx.engine.runner().run_form_handlers(
        &composition,
        &RequestContext::anonymous(),
        &cleaned(),
        &[],
        &entries,
    );

    assert_eq!(report.responses.len(), 1);
    assert_eq!(report.errors[0].plugin_uid, "webhook_v1");
    assert!(!report.is_clean());
    assert_eq!(
        report.warnings(),
        vec!["Error occurred in webhook_v1: plugin 'webhook_v1' is not registered.".to_string()]
    );
}

#[test]
fn wizard_handlers_see_all_steps() {
    let fx = fixture();
    let wizard = WizardComposition::new(UserId::new(), "Signup");
    let step = |slug: &str, key: &str| StepData {
        form_id: formweave_types::CompositionId::new(),
        slug: formweave_types::Slug::parse(slug).unwrap(),
        data: {
            let mut data = CleanedData::new();
            data.insert(key.into(), json!(1));
            data
        },
    };
    let steps = vec![step("one", "a"), step("two", "b")];
    let entries = vec![HandlerEntry::new(wizard.id, "db_store", PluginData::new(), wizard.owner)];

    let report = fx.engine.runner().run_wizard_handlers(
        &wizard,
        &RequestContext::anonymous(),
        &steps,
        &[],
        &entries,
    );
    assert!(report.is_clean());
    assert_eq!(report.responses[0].payload, json!({"handled_by": "db_store"}));
    assert_eq!(logged(&fx.log), vec!["db_store:2steps:a,b"]);
}

// ================================================================
// Properties
// ================================================================

fn handler_uid() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("mail"), Just("broken"), Just("panicky"), Just("missing")]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn every_handler_is_accounted_for(uids in prop::collection::vec(handler_uid(), 0..8)) {
        let fx = fixture();
        let composition = FormComposition::new(UserId::new(), "Contact");
        let entries = handlers(&composition, &uids);

        let report = fx.engine.runner().run_form_handlers(
            &composition,
            &RequestContext::anonymous(),
            &cleaned(),
            &[],
            &entries,
        );

        let expected_ok = uids.iter().filter(|u| **u == "mail").count();
        prop_assert_eq!(report.responses.len(), expected_ok);
        prop_assert_eq!(report.errors.len(), uids.len() - expected_ok);

        let failed: Vec<&str> = report.errors.iter().map(|e| e.plugin_uid.as_str()).collect();
        let expected_failed: Vec<&str> = uids.iter().copied().filter(|u| *u != "mail").collect();
        prop_assert_eq!(failed, expected_failed);
    }
}
