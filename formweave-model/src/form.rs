use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::schema::{FieldDefinition, FieldKind, FormSchema};

/// Cleaned, typed values keyed by field name, in field order.
pub type CleanedData = Map<String, Value>;

pub const REQUIRED_MESSAGE: &str = "This field is required.";

/// A file submitted alongside form data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

impl UploadedFile {
    pub fn new(file_name: &str, content_type: &str, content: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            content: content.into(),
        }
    }
}

/// Raw submitted data: JSON values keyed by field name plus uploaded files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormInput {
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(default)]
    pub files: BTreeMap<String, UploadedFile>,
}

impl FormInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds input from a JSON object. Anything else yields empty input.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(data) => Self {
                data,
                files: BTreeMap::new(),
            },
            _ => Self::default(),
        }
    }

    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.data.insert(name.into(), value.into());
        self
    }

    pub fn with_file(mut self, name: &str, file: UploadedFile) -> Self {
        self.files.insert(name.into(), file);
        self
    }
}

/// A field together with its current value and errors, for rendering.
#[derive(Debug, Clone, Copy)]
pub struct BoundField<'a> {
    pub definition: &'a FieldDefinition,
    pub value: Option<&'a Value>,
    pub errors: &'a [String],
}

/// A [`FormSchema`] bound to submitted data (or unbound, for display).
///
/// Validation runs once, on the first call to [`BoundForm::is_valid`];
/// afterwards plugins and callbacks may add errors or adjust cleaned data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundForm {
    schema: FormSchema,
    input: Option<FormInput>,
    initial: CleanedData,
    errors: BTreeMap<String, Vec<String>>,
    non_field_errors: Vec<String>,
    cleaned: Option<CleanedData>,
}

impl BoundForm {
    pub(crate) fn bound(schema: FormSchema, input: FormInput, initial: CleanedData) -> Self {
        Self {
            schema,
            input: Some(input),
            initial,
            errors: BTreeMap::new(),
            non_field_errors: Vec::new(),
            cleaned: None,
        }
    }

    pub(crate) fn unbound(schema: FormSchema, initial: CleanedData) -> Self {
        Self {
            schema,
            input: None,
            initial,
            errors: BTreeMap::new(),
            non_field_errors: Vec::new(),
            cleaned: None,
        }
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn is_bound(&self) -> bool {
        self.input.is_some()
    }

    pub fn input(&self) -> Option<&FormInput> {
        self.input.as_ref()
    }

    /// Mutable access to the raw input. Only meaningful before validation;
    /// changes made afterwards are not re-cleaned.
    pub fn input_mut(&mut self) -> Option<&mut FormInput> {
        self.input.as_mut()
    }

    pub fn initial(&self) -> &CleanedData {
        &self.initial
    }

    /// Validates on first call. Unbound forms are never valid.
    pub fn is_valid(&mut self) -> bool {
        if self.input.is_none() {
            return false;
        }
        if self.cleaned.is_none() {
            self.full_clean();
        }
        self.errors.is_empty() && self.non_field_errors.is_empty()
    }

    fn full_clean(&mut self) {
        let Some(input) = self.input.as_ref() else {
            return;
        };
        let mut cleaned = CleanedData::new();
        let mut errors: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for field in self.schema.fields() {
            let raw = input.data.get(&field.name);
            match clean_field(field, raw, input) {
                Ok(value) => {
                    cleaned.insert(field.name.clone(), value);
                }
                Err(message) => errors.entry(field.name.clone()).or_default().push(message),
            }
        }
        self.cleaned = Some(cleaned);
        self.errors = errors;
    }

    /// Records an error. `None` records a form-wide error. A field error
    /// also drops that field from the cleaned data. A bound form is cleaned
    /// first so the error survives validation.
    pub fn add_error(&mut self, field: Option<&str>, message: impl Into<String>) {
        if self.input.is_some() && self.cleaned.is_none() {
            self.full_clean();
        }
        match field {
            Some(name) => {
                if let Some(cleaned) = self.cleaned.as_mut() {
                    cleaned.remove(name);
                }
                self.errors.entry(name.into()).or_default().push(message.into());
            }
            None => self.non_field_errors.push(message.into()),
        }
    }

    /// Per-field errors, keyed by field name.
    pub fn errors(&self) -> &BTreeMap<String, Vec<String>> {
        &self.errors
    }

    pub fn field_errors(&self, name: &str) -> &[String] {
        self.errors.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn non_field_errors(&self) -> &[String] {
        &self.non_field_errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty() || !self.non_field_errors.is_empty()
    }

    /// Cleaned data; `None` until validated.
    pub fn cleaned_data(&self) -> Option<&CleanedData> {
        self.cleaned.as_ref()
    }

    pub fn cleaned_data_mut(&mut self) -> Option<&mut CleanedData> {
        self.cleaned.as_mut()
    }

    pub fn into_cleaned_data(self) -> Option<CleanedData> {
        self.cleaned
    }

    /// The value shown for `name`: cleaned, then raw input, then initial,
    /// then the field's own initial.
    pub fn value(&self, name: &str) -> Option<&Value> {
        if let Some(v) = self.cleaned.as_ref().and_then(|c| c.get(name)) {
            return Some(v);
        }
        if let Some(v) = self.input.as_ref().and_then(|i| i.data.get(name)) {
            return Some(v);
        }
        if let Some(v) = self.initial.get(name) {
            return Some(v);
        }
        self.schema.field(name).and_then(|f| f.initial.as_ref())
    }

    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.input.as_ref().and_then(|i| i.files.get(name))
    }

    /// Fields in stable schema order with their value and errors.
    pub fn fields(&self) -> impl Iterator<Item = BoundField<'_>> {
        self.schema.fields().iter().map(move |definition| BoundField {
            definition,
            value: self.value(&definition.name),
            errors: self.field_errors(&definition.name),
        })
    }
}

fn is_empty_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        _ => false,
    }
}

fn empty_value(kind: &FieldKind) -> Value {
    match kind {
        FieldKind::Text | FieldKind::Textarea | FieldKind::Email | FieldKind::Hidden => {
            Value::String(String::new())
        }
        FieldKind::Choice { .. } => Value::String(String::new()),
        FieldKind::Boolean => Value::Bool(false),
        FieldKind::Integer | FieldKind::File => Value::Null,
    }
}

fn clean_field(field: &FieldDefinition, raw: Option<&Value>, input: &FormInput) -> Result<Value, String> {
    if let FieldKind::File = field.kind {
        return match input.files.get(&field.name) {
            Some(file) => Ok(serde_json::json!({
                "file_name": file.file_name,
                "content_type": file.content_type,
                "size": file.content.len(),
            })),
            None if field.required => Err(REQUIRED_MESSAGE.into()),
            None => Ok(Value::Null),
        };
    }

    if let FieldKind::Boolean = field.kind {
        let checked = to_bool(raw)?;
        if field.required && !checked {
            return Err(REQUIRED_MESSAGE.into());
        }
        return Ok(Value::Bool(checked));
    }

    if is_empty_value(raw) {
        if field.required {
            return Err(REQUIRED_MESSAGE.into());
        }
        return Ok(empty_value(&field.kind));
    }
    let Some(raw) = raw else {
        return Ok(empty_value(&field.kind));
    };

    let value = match &field.kind {
        FieldKind::Text | FieldKind::Textarea | FieldKind::Hidden => Value::String(to_text(raw)?),
        FieldKind::Email => {
            let text = to_text(raw)?;
            if !is_valid_email(&text) {
                return Err("Enter a valid email address.".into());
            }
            Value::String(text)
        }
        FieldKind::Integer => Value::from(to_integer(raw)?),
        FieldKind::Choice { choices } => {
            let text = to_text(raw)?;
            if !choices.iter().any(|c| c.value == text) {
                return Err(format!(
                    "Select a valid choice. {text} is not one of the available choices."
                ));
            }
            Value::String(text)
        }
        FieldKind::Boolean | FieldKind::File => empty_value(&field.kind),
    };

    for validator in &field.validators {
        validator.check(&value)?;
    }
    Ok(value)
}

fn to_text(raw: &Value) -> Result<String, String> {
    match raw {
        Value::String(s) => Ok(s.trim().to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err("Enter a valid value.".into()),
    }
}

fn to_integer(raw: &Value) -> Result<i64, String> {
    const MESSAGE: &str = "Enter a whole number.";
    match raw {
        Value::Number(n) => n.as_i64().ok_or_else(|| MESSAGE.to_string()),
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| MESSAGE.to_string()),
        _ => Err(MESSAGE.into()),
    }
}

fn to_bool(raw: Option<&Value>) -> Result<bool, String> {
    match raw {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::Number(n)) => Ok(n.as_i64().is_some_and(|n| n != 0)),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "" | "false" | "off" | "0" | "no" => Ok(false),
            "true" | "on" | "1" | "yes" => Ok(true),
            _ => Err("Enter a valid boolean.".into()),
        },
        Some(_) => Err("Enter a valid boolean.".into()),
    }
}

fn is_valid_email(text: &str) -> bool {
    let Some((local, domain)) = text.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') || text.chars().any(char::is_whitespace) {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|l| !l.is_empty())
}
