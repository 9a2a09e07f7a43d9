mod common;

use common::*;
use formweave_engine::*;
use formweave_storage::CompositionStore;
use formweave_types::UserId;
use pretty_assertions::assert_eq;
use serde_json::json;

// ================================================================
// Round trip
// ================================================================

#[test]
fn export_then_import_keeps_entries() {
    let fx = fixture();
    let mut form = fx.form(
        "Contact",
        &[("text", "name", true), ("email", "email", false)],
        &["db_store"],
    );
    form.is_public = true;
    form.success_page_title = "Thanks".into();
    fx.engine.composer().update_form(&fx.owner, &form).unwrap();

    let transfer = fx.engine.transfer();
    let export = transfer.export_form(&fx.owner, form.id).unwrap();
    assert!(!export.is_public);
    assert!(!export.is_cloneable);
    assert_eq!(export.form_elements.len(), 2);

    let importer = User::new(UserId::new());
    let json = export.to_json().unwrap();
    let report = transfer.import_form_json(&importer, &json).unwrap();

    assert!(report.warnings.is_empty());
    assert!(report.form.name.starts_with("Contact (imported on "));
    assert_eq!(report.form.slug.as_str(), "contact-2");
    assert_eq!(report.form.owner, importer.id);
    assert_eq!(report.form.success_page_title, "Thanks");

    let original = fx.store.elements(form.id).unwrap();
    let imported = fx.store.elements(report.form.id).unwrap();
    let shape = |entries: &[formweave_model::ElementEntry]| {
        entries
            .iter()
            .map(|e| (e.plugin_uid.clone(), e.position, e.plugin_data.clone()))
            .collect::<Vec<_>>()
    };
    assert_eq!(shape(&imported), shape(&original));
    assert!(imported.iter().all(|e| e.owner == importer.id));

    let handlers = fx.store.handlers(report.form.id).unwrap();
    assert_eq!(handlers.len(), 1);
    assert_eq!(handlers[0].plugin_uid, "db_store");
}

#[test]
fn foreign_form_cannot_be_exported() {
    let fx = fixture();
    let form = fx.form("Contact", &[], &[]);
    let err = fx
        .engine
        .transfer()
        .export_form(&User::new(UserId::new()), form.id)
        .unwrap_err();
    assert!(err.is_not_found());
}

// ================================================================
// Tolerant import
// ================================================================

#[test]
fn unregistered_element_is_skipped_with_warning() {
    let fx = fixture();
    let doc = json!({
        "name": "Survey",
        "slug": "survey",
        "form_elements": [
            {"plugin_uid": "text", "position": 1, "plugin_data": {"name": "a"}},
            {"plugin_uid": "retired_widget", "position": 2, "plugin_data": {}},
            {"plugin_uid": "email", "position": 3, "plugin_data": {"name": "b"}}
        ],
        "form_handlers": []
    });

    let report = fx
        .engine
        .transfer()
        .import_form_json(&fx.owner, &doc.to_string())
        .unwrap();
    assert_eq!(report.elements.len(), 2);
    assert_eq!(report.warnings, vec!["Plugin retired_widget is missing in the system.".to_string()]);
    assert_eq!(fx.store.elements(report.form.id).unwrap().len(), 2);
    assert_eq!(report.form.slug.as_str(), "survey");
}

#[test]
fn entries_without_uid_warn_about_missing_data() {
    let fx = fixture();
    let doc = json!({
        "name": "Survey",
        "form_elements": [{"position": 1, "plugin_data": {"name": "a"}}],
        "form_handlers": [{"plugin_data": {}}],
        "extra_key": "ignored"
    });
    let report = fx
        .engine
        .transfer()
        .import_form_json(&fx.owner, &doc.to_string())
        .unwrap();
    assert!(report.elements.is_empty());
    assert!(report.handlers.is_empty());
    assert_eq!(
        report.warnings,
        vec![
            "Some essential plugin data missing in the JSON import.".to_string(),
            "Some essential plugin data missing in the JSON import.".to_string(),
        ]
    );
}

#[test]
fn string_encoded_plugin_data_is_accepted() {
    let fx = fixture();
    let doc = json!({
        "name": "Legacy",
        "slug": "legacy",
        "form_elements": [
            {"plugin_uid": "text", "position": 1, "plugin_data": "{\"name\": \"a\", \"required\": true}"}
        ],
        "form_handlers": [{"plugin_uid": "mail", "plugin_data": ""}]
    });
    let report = fx
        .engine
        .transfer()
        .import_form_json(&fx.owner, &doc.to_string())
        .unwrap();
    assert_eq!(report.elements[0].plugin_data["required"], json!(true));
    assert!(report.handlers[0].plugin_data.is_empty());
}

#[test]
fn repeated_single_use_handler_is_skipped() {
    let fx = fixture();
    let doc = json!({
        "name": "Twice",
        "form_handlers": [
            {"plugin_uid": "db_store", "plugin_data": {}},
            {"plugin_uid": "db_store", "plugin_data": {}}
        ]
    });
    let report = fx
        .engine
        .transfer()
        .import_form_json(&fx.owner, &doc.to_string())
        .unwrap();
    assert_eq!(report.handlers.len(), 1);
    assert_eq!(report.warnings.len(), 1);
}

#[test]
fn malformed_document_is_an_error() {
    let fx = fixture();
    let err = fx
        .engine
        .transfer()
        .import_form_json(&fx.owner, "{not json")
        .unwrap_err();
    assert!(matches!(err, EngineError::Serialization(_)));
}
