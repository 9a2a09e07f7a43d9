use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::form::{BoundForm, CleanedData, FormInput};

/// The value type a field accepts and cleans into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Textarea,
    Email,
    Integer,
    Boolean,
    Choice { choices: Vec<Choice> },
    Hidden,
    File,
}

impl FieldKind {
    /// Widget used when a field definition does not pick one explicitly.
    pub fn default_widget(&self) -> Widget {
        match self {
            Self::Text => Widget::TextInput,
            Self::Textarea => Widget::Textarea { rows: 5 },
            Self::Email => Widget::EmailInput,
            Self::Integer => Widget::NumberInput,
            Self::Boolean => Widget::CheckboxInput,
            Self::Choice { .. } => Widget::Select,
            Self::Hidden => Widget::HiddenInput,
            Self::File => Widget::FileInput,
        }
    }
}

/// One selectable option of a choice field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub value: String,
    pub label: String,
}

impl Choice {
    pub fn new(value: &str, label: &str) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Rendering hint for the rendering collaborator. Has no effect on cleaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Widget {
    TextInput,
    Textarea { rows: u16 },
    EmailInput,
    NumberInput,
    CheckboxInput,
    Select,
    RadioSelect,
    HiddenInput,
    FileInput,
    Range { min: i64, max: i64, step: i64 },
}

/// Extra checks run after a value has been coerced to its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Validator {
    MinLength(usize),
    MaxLength(usize),
    MinValue(i64),
    MaxValue(i64),
}

impl Validator {
    /// Checks a cleaned, non-empty value. Returns the error message on failure.
    pub fn check(&self, value: &Value) -> Result<(), String> {
        match (self, value) {
            (Self::MinLength(n), Value::String(s)) if s.chars().count() < *n => Err(format!(
                "Ensure this value has at least {} characters (it has {}).",
                n,
                s.chars().count()
            )),
            (Self::MaxLength(n), Value::String(s)) if s.chars().count() > *n => Err(format!(
                "Ensure this value has at most {} characters (it has {}).",
                n,
                s.chars().count()
            )),
            (Self::MinValue(n), Value::Number(v)) if v.as_i64().is_some_and(|v| v < *n) => Err(
                format!("Ensure this value is greater than or equal to {n}."),
            ),
            (Self::MaxValue(n), Value::Number(v)) if v.as_i64().is_some_and(|v| v > *n) => Err(
                format!("Ensure this value is less than or equal to {n}."),
            ),
            _ => Ok(()),
        }
    }
}

/// A single input field contributed by an element plugin, or declared by a
/// plugin's configuration form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Key in submitted data and cleaned data. Unique within one form.
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
    pub widget: Widget,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial: Option<Value>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub help_text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validators: Vec<Validator>,
}

impl FieldDefinition {
    fn simple(name: &str, label: &str, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            widget: kind.default_widget(),
            kind,
            required: false,
            initial: None,
            help_text: String::new(),
            validators: Vec::new(),
        }
    }

    /// Shorthand for a single-line text field.
    pub fn text(name: &str, label: &str) -> Self {
        Self::simple(name, label, FieldKind::Text)
    }

    /// Shorthand for a multi-line text field.
    pub fn textarea(name: &str, label: &str) -> Self {
        Self::simple(name, label, FieldKind::Textarea)
    }

    /// Shorthand for an e-mail field.
    pub fn email(name: &str, label: &str) -> Self {
        Self::simple(name, label, FieldKind::Email)
    }

    /// Shorthand for a whole-number field.
    pub fn integer(name: &str, label: &str) -> Self {
        Self::simple(name, label, FieldKind::Integer)
    }

    /// Shorthand for a checkbox.
    pub fn boolean(name: &str, label: &str) -> Self {
        Self::simple(name, label, FieldKind::Boolean)
    }

    /// Shorthand for a select box with fixed options.
    pub fn choice(name: &str, label: &str, choices: Vec<Choice>) -> Self {
        Self::simple(name, label, FieldKind::Choice { choices })
    }

    /// Shorthand for a hidden field.
    pub fn hidden(name: &str) -> Self {
        Self::simple(name, "", FieldKind::Hidden)
    }

    /// Shorthand for a file upload field.
    pub fn file(name: &str, label: &str) -> Self {
        Self::simple(name, label, FieldKind::File)
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_initial(mut self, initial: impl Into<Value>) -> Self {
        self.initial = Some(initial.into());
        self
    }

    pub fn with_help(mut self, help_text: &str) -> Self {
        self.help_text = help_text.into();
        self
    }

    pub fn with_widget(mut self, widget: Widget) -> Self {
        self.widget = widget;
        self
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }
}

/// An ordered list of fields, interpreted generically at bind/validate time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormSchema {
    fields: Vec<FieldDefinition>,
}

impl FormSchema {
    pub fn new(fields: Vec<FieldDefinition>) -> Self {
        Self { fields }
    }

    pub fn push(&mut self, field: FieldDefinition) {
        self.fields.push(field);
    }

    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Field names in iteration order.
    pub fn names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Removes the field called `name`, returning it.
    pub fn remove(&mut self, name: &str) -> Option<FieldDefinition> {
        let idx = self.fields.iter().position(|f| f.name == name)?;
        Some(self.fields.remove(idx))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Binds submitted data. Validation runs lazily on first `is_valid()`.
    pub fn bind(&self, input: FormInput) -> BoundForm {
        BoundForm::bound(self.clone(), input, CleanedData::new())
    }

    /// Binds submitted data with initial values used by the rendering side.
    pub fn bind_with_initial(&self, input: FormInput, initial: CleanedData) -> BoundForm {
        BoundForm::bound(self.clone(), input, initial)
    }

    /// An unbound form for display, prefilled with `initial`.
    pub fn unbound(&self, initial: CleanedData) -> BoundForm {
        BoundForm::unbound(self.clone(), initial)
    }
}
