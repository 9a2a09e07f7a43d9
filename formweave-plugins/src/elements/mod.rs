//! Element plugins. Each contributes one field to an assembled form.
//!
//! All elements share the `label`, `name`, `help_text` and `required`
//! configuration keys; the field name must be unique within a composition.

mod file;
mod input;
mod select;
mod slider;

pub use file::FileElement;
pub use input::{InputElement, InputKind};
pub use select::SelectElement;
pub use slider::SliderElement;

use formweave_model::{BoundForm, ElementEntry, FieldDefinition, Validator};
use serde::Deserialize;
use serde_json::Value;

/// Configuration keys shared by every element.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct BaseConfig {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub help_text: String,
    #[serde(default)]
    pub required: bool,
}

impl BaseConfig {
    pub fn label(&self) -> &str {
        if self.label.is_empty() {
            &self.name
        } else {
            &self.label
        }
    }

    pub fn apply(&self, field: FieldDefinition) -> FieldDefinition {
        field.required(self.required).with_help(&self.help_text)
    }
}

pub(crate) fn base_fields() -> Vec<FieldDefinition> {
    vec![
        FieldDefinition::text("label", "Label").required(true),
        name_field(),
        FieldDefinition::text("help_text", "Help text"),
        FieldDefinition::boolean("required", "Required"),
    ]
}

pub(crate) fn name_field() -> FieldDefinition {
    FieldDefinition::text("name", "Name")
        .required(true)
        .with_validator(Validator::MaxLength(100))
        .with_help("Key of the submitted value. Letters, digits and underscores.")
}

/// Rejects malformed names and names already used by a sibling element.
pub(crate) fn check_name(form: &mut BoundForm, siblings: &[ElementEntry]) {
    let Some(name) = cleaned_str(form, "name").map(str::to_owned) else {
        return;
    };
    if !is_field_name(&name) {
        form.add_error(
            Some("name"),
            "Use letters, digits and underscores only, starting with a letter.",
        );
        return;
    }
    if siblings.iter().any(|e| e.data_str("name") == Some(name.as_str())) {
        form.add_error(
            Some("name"),
            format!("A field named \"{name}\" already exists in this form."),
        );
    }
}

fn is_field_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub(crate) fn cleaned_str<'a>(form: &'a BoundForm, key: &str) -> Option<&'a str> {
    form.cleaned_data()
        .and_then(|d| d.get(key))
        .and_then(Value::as_str)
}

pub(crate) fn cleaned_i64(form: &BoundForm, key: &str) -> Option<i64> {
    form.cleaned_data()
        .and_then(|d| d.get(key))
        .and_then(Value::as_i64)
}

/// Treats `null` and blank strings as "no initial value".
pub(crate) fn initial_value(value: Option<&Value>) -> Option<Value> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(v) => Some(v.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_names() {
        assert!(is_field_name("email"));
        assert!(is_field_name("first_name2"));
        assert!(!is_field_name("2nd"));
        assert!(!is_field_name("first name"));
        assert!(!is_field_name(""));
    }

    #[test]
    fn blank_initials_are_ignored() {
        assert_eq!(initial_value(Some(&Value::Null)), None);
        assert_eq!(initial_value(Some(&Value::from(""))), None);
        assert_eq!(initial_value(Some(&Value::from(0))), Some(Value::from(0)));
    }
}
