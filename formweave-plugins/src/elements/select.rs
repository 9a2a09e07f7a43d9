use std::collections::HashSet;

use formweave_engine::{ElementPlugin, Plugin, PluginError, RequestContext, decode};
use formweave_model::{
    BoundForm, Choice, ElementEntry, FieldDefinition, FormSchema, PluginData, PluginDescriptor,
};
use serde::Deserialize;

use super::{BaseConfig, base_fields, check_name, cleaned_str};

#[derive(Debug, Deserialize)]
struct SelectConfig {
    #[serde(flatten)]
    base: BaseConfig,
    choices: String,
    #[serde(default)]
    initial: String,
}

/// A select box. Choices are configured one per line, either `value` or
/// `value, label`.
pub struct SelectElement {
    descriptor: PluginDescriptor,
}

impl SelectElement {
    pub fn new() -> Self {
        Self {
            descriptor: PluginDescriptor::new("select", "Select").in_group("Choices"),
        }
    }
}

impl Default for SelectElement {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses the `choices` configuration text.
pub(crate) fn parse_choices(raw: &str) -> Vec<Choice> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| match line.split_once(',') {
            Some((value, label)) => Choice::new(value.trim(), label.trim()),
            None => Choice::new(line, line),
        })
        .collect()
}

impl Plugin for SelectElement {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    fn configuration_form(&self) -> Option<FormSchema> {
        let mut fields = base_fields();
        fields.push(
            FieldDefinition::textarea("choices", "Choices")
                .required(true)
                .with_help("One choice per line: `value` or `value, label`."),
        );
        fields.push(FieldDefinition::text("initial", "Initial"));
        Some(FormSchema::new(fields))
    }

    fn validate(&self, form: &mut BoundForm, siblings: &[ElementEntry]) {
        check_name(form, siblings);

        let choices = parse_choices(cleaned_str(form, "choices").unwrap_or_default());
        let mut seen = HashSet::new();
        if let Some(dup) = choices.iter().find(|c| !seen.insert(c.value.as_str())) {
            let message = format!("Choice value \"{}\" is used more than once.", dup.value);
            form.add_error(Some("choices"), message);
        }

        let initial = cleaned_str(form, "initial").unwrap_or_default();
        if !initial.is_empty() && !choices.iter().any(|c| c.value == initial) {
            let message = format!("Initial value \"{initial}\" is not one of the choices.");
            form.add_error(Some("initial"), message);
        }
    }
}

impl ElementPlugin for SelectElement {
    fn to_field(
        &self,
        data: &PluginData,
        _position: i32,
        _request: &RequestContext,
    ) -> Result<FieldDefinition, PluginError> {
        let config: SelectConfig = decode(data)?;
        let choices = parse_choices(&config.choices);
        if choices.is_empty() {
            return Err(PluginError::InvalidData(format!(
                "select '{}' has no choices",
                config.base.name
            )));
        }
        let mut field = config
            .base
            .apply(FieldDefinition::choice(&config.base.name, config.base.label(), choices));
        if !config.initial.is_empty() {
            field = field.with_initial(config.initial);
        }
        Ok(field)
    }
}
