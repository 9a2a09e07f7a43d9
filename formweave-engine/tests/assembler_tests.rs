mod common;

use common::*;
use formweave_engine::*;
use formweave_model::*;
use formweave_types::{CompositionId, UserId};
use pretty_assertions::assert_eq;
use serde_json::json;

fn entry(uid: &str, name: &str, position: i32) -> ElementEntry {
    ElementEntry::new(CompositionId::new(), uid, field_data(name, false), position, UserId::new())
}

fn config(missing: MissingPluginPolicy, duplicate: DuplicateFieldPolicy) -> EngineConfig {
    EngineConfig::default().with_assembly(AssemblyConfig {
        missing_plugin: missing,
        duplicate_field: duplicate,
    })
}

// ================================================================
// Ordering
// ================================================================

#[test]
fn fields_follow_ascending_position() {
    let fx = fixture();
    let entries = vec![
        entry("email", "email", 2),
        entry("text", "name", 1),
        entry("integer", "age", 10),
    ];
    let assembled = fx
        .engine
        .assembler()
        .assemble(&entries, None, &RequestContext::anonymous())
        .unwrap();
    assert_eq!(assembled.field_names(), vec!["name", "email", "age"]);
    assert!(assembled.warnings().is_empty());
    assert_eq!(assembled.sources()[0].entry_id, entries[1].id);
}

#[test]
fn element_config_shapes_the_field() {
    let fx = fixture();
    let mut e = entry("email", "contact", 1);
    e.plugin_data.insert("required".into(), json!(true));
    let assembled = fx
        .engine
        .assembler()
        .assemble(&[e], None, &RequestContext::anonymous())
        .unwrap();
    let field = assembled.schema().field("contact").unwrap();
    assert_eq!(field.kind, FieldKind::Email);
    assert_eq!(field.label, "CONTACT");
    assert!(field.required);
}

// ================================================================
// Stale plugin references
// ================================================================

#[test]
fn missing_plugin_is_skipped_with_warning() {
    let fx = fixture();
    let stale = entry("retired_widget", "old", 2);
    let entries = vec![entry("text", "name", 1), stale.clone(), entry("email", "email", 3)];
    let assembled = fx
        .engine
        .assembler()
        .assemble(&entries, None, &RequestContext::anonymous())
        .unwrap();
    assert_eq!(assembled.field_names(), vec!["name", "email"]);
    assert_eq!(
        assembled.warnings(),
        &[AssemblyWarning::MissingPlugin {
            entry_id: stale.id,
            plugin_uid: "retired_widget".into(),
        }]
    );
}

#[test]
fn missing_plugin_aborts_in_strict_mode() {
    let fx = fixture_with(
        config(MissingPluginPolicy::Abort, DuplicateFieldPolicy::Reject),
        |_| {},
    );
    let err = fx
        .engine
        .assembler()
        .assemble(&[entry("retired_widget", "old", 1)], None, &RequestContext::anonymous())
        .unwrap_err();
    assert!(matches!(err, EngineError::UnknownPlugin(uid) if uid == "retired_widget"));
}

#[test]
fn undecodable_plugin_data_is_skipped() {
    let fx = fixture();
    let broken = ElementEntry::new(
        CompositionId::new(),
        "text",
        PluginData::new(),
        1,
        UserId::new(),
    );
    let assembled = fx
        .engine
        .assembler()
        .assemble(&[broken.clone(), entry("email", "email", 2)], None, &RequestContext::anonymous())
        .unwrap();
    assert_eq!(assembled.field_names(), vec!["email"]);
    assert!(matches!(
        &assembled.warnings()[0],
        AssemblyWarning::InvalidPluginData { entry_id, .. } if *entry_id == broken.id
    ));
}

// ================================================================
// Duplicate field names
// ================================================================

#[test]
fn duplicate_field_names_are_rejected_by_default() {
    let fx = fixture();
    let err = fx
        .engine
        .assembler()
        .assemble(
            &[entry("text", "name", 1), entry("email", "name", 2)],
            None,
            &RequestContext::anonymous(),
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::DuplicateFieldName { name } if name == "name"));
}

#[test]
fn last_wins_keeps_the_later_field() {
    let fx = fixture_with(
        config(MissingPluginPolicy::Skip, DuplicateFieldPolicy::LastWins),
        |_| {},
    );
    let first = entry("text", "name", 1);
    let entries = vec![first.clone(), entry("integer", "age", 2), entry("email", "name", 3)];
    let assembled = fx
        .engine
        .assembler()
        .assemble(&entries, None, &RequestContext::anonymous())
        .unwrap();

    assert_eq!(assembled.field_names(), vec!["age", "name"]);
    assert_eq!(assembled.schema().field("name").unwrap().kind, FieldKind::Email);
    assert_eq!(
        assembled.warnings(),
        &[AssemblyWarning::DuplicateField {
            name: "name".into(),
            dropped_entry: first.id,
        }]
    );
}

// ================================================================
// Initial values
// ================================================================

#[test]
fn external_initial_values_are_limited_to_known_fields() {
    let fx = fixture();
    let mut initial = CleanedData::new();
    initial.insert("name".into(), json!("Ada"));
    initial.insert("unrelated".into(), json!(1));

    let assembled = fx
        .engine
        .assembler()
        .assemble(&[entry("text", "name", 1)], Some(&initial), &RequestContext::anonymous())
        .unwrap();
    let form = assembled.unbound();
    assert_eq!(form.value("name"), Some(&json!("Ada")));
    assert_eq!(assembled.initial().len(), 1);
}
