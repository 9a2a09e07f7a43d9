use formweave_model::{Choice, FieldDefinition, FieldKind, FormSchema, Validator, Widget};
use serde_json::json;

// ── FieldDefinition constructors ─────────────────────────────────

#[test]
fn text_field_defaults() {
    let f = FieldDefinition::text("name", "Name");
    assert_eq!(f.name, "name");
    assert_eq!(f.label, "Name");
    assert_eq!(f.kind, FieldKind::Text);
    assert_eq!(f.widget, Widget::TextInput);
    assert!(!f.required);
    assert!(f.initial.is_none());
}

#[test]
fn widgets_follow_kind() {
    assert_eq!(FieldDefinition::email("e", "E").widget, Widget::EmailInput);
    assert_eq!(FieldDefinition::integer("i", "I").widget, Widget::NumberInput);
    assert_eq!(FieldDefinition::boolean("b", "B").widget, Widget::CheckboxInput);
    assert_eq!(FieldDefinition::hidden("h").widget, Widget::HiddenInput);
    assert_eq!(FieldDefinition::file("f", "F").widget, Widget::FileInput);
    assert_eq!(FieldDefinition::textarea("t", "T").widget, Widget::Textarea { rows: 5 });
}

#[test]
fn builder_methods() {
    let f = FieldDefinition::integer("rating", "Rating")
        .required(true)
        .with_initial(5)
        .with_help("1 to 10")
        .with_widget(Widget::Range { min: 1, max: 10, step: 1 })
        .with_validator(Validator::MinValue(1));
    assert!(f.required);
    assert_eq!(f.initial, Some(json!(5)));
    assert_eq!(f.help_text, "1 to 10");
    assert_eq!(f.widget, Widget::Range { min: 1, max: 10, step: 1 });
    assert_eq!(f.validators, vec![Validator::MinValue(1)]);
}

// ── FormSchema ───────────────────────────────────────────────────

#[test]
fn schema_lookup_and_removal() {
    let mut schema = FormSchema::new(vec![
        FieldDefinition::text("a", "A"),
        FieldDefinition::text("b", "B"),
    ]);
    schema.push(FieldDefinition::text("c", "C"));
    assert_eq!(schema.names(), vec!["a", "b", "c"]);
    assert!(schema.contains("b"));

    let removed = schema.remove("b").unwrap();
    assert_eq!(removed.name, "b");
    assert_eq!(schema.names(), vec!["a", "c"]);
    assert_eq!(schema.len(), 2);
    assert!(schema.remove("zzz").is_none());
}

// ── JSON representation ──────────────────────────────────────────

#[test]
fn choice_kind_serializes_tagged() {
    let f = FieldDefinition::choice("topic", "Topic", vec![Choice::new("s", "Sales")]);
    let value = serde_json::to_value(&f.kind).unwrap();
    assert_eq!(
        value,
        json!({"type": "choice", "choices": [{"value": "s", "label": "Sales"}]})
    );
}

#[test]
fn field_definition_skips_empty_optionals() {
    let f = FieldDefinition::text("name", "Name");
    let value = serde_json::to_value(&f).unwrap();
    assert!(value.get("initial").is_none());
    assert!(value.get("help_text").is_none());
    assert!(value.get("validators").is_none());

    let back: FieldDefinition = serde_json::from_value(value).unwrap();
    assert_eq!(back, f);
}

#[test]
fn validator_check_ignores_mismatched_types() {
    assert!(Validator::MinLength(3).check(&json!(1)).is_ok());
    assert!(Validator::MaxValue(3).check(&json!("abcdef")).is_ok());
    assert!(Validator::MaxValue(3).check(&json!(4)).is_err());
}
