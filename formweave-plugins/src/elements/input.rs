use formweave_engine::{ElementPlugin, Plugin, PluginError, RequestContext, decode};
use formweave_model::{
    BoundForm, ElementEntry, FieldDefinition, FormSchema, PluginData, PluginDescriptor, Validator,
};
use serde::Deserialize;
use serde_json::Value;

use super::{BaseConfig, base_fields, check_name, cleaned_i64, initial_value, name_field};

/// The single-value input elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Text,
    Textarea,
    Email,
    Integer,
    Boolean,
    Hidden,
}

impl InputKind {
    pub const ALL: [InputKind; 6] = [
        Self::Text,
        Self::Textarea,
        Self::Email,
        Self::Integer,
        Self::Boolean,
        Self::Hidden,
    ];

    pub fn uid(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Textarea => "textarea",
            Self::Email => "email",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Hidden => "hidden",
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::Textarea => "Textarea",
            Self::Email => "Email",
            Self::Integer => "Integer",
            Self::Boolean => "Boolean",
            Self::Hidden => "Hidden",
        }
    }

    fn group(self) -> &'static str {
        match self {
            Self::Text | Self::Textarea | Self::Email => "Text",
            Self::Integer => "Numbers",
            Self::Boolean => "Choices",
            Self::Hidden => "Other",
        }
    }
}

#[derive(Debug, Deserialize)]
struct InputConfig {
    #[serde(flatten)]
    base: BaseConfig,
    #[serde(default)]
    initial: Option<Value>,
    #[serde(default)]
    max_length: Option<usize>,
    #[serde(default)]
    min_value: Option<i64>,
    #[serde(default)]
    max_value: Option<i64>,
}

pub struct InputElement {
    descriptor: PluginDescriptor,
    kind: InputKind,
}

impl InputElement {
    pub fn new(kind: InputKind) -> Self {
        Self {
            descriptor: PluginDescriptor::new(kind.uid(), kind.name()).in_group(kind.group()),
            kind,
        }
    }

    pub fn kind(&self) -> InputKind {
        self.kind
    }
}

impl Plugin for InputElement {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    fn configuration_form(&self) -> Option<FormSchema> {
        let mut fields = match self.kind {
            InputKind::Hidden => vec![name_field()],
            _ => base_fields(),
        };
        match self.kind {
            InputKind::Text => {
                fields.push(FieldDefinition::text("initial", "Initial"));
                fields.push(
                    FieldDefinition::integer("max_length", "Max length")
                        .with_validator(Validator::MinValue(1)),
                );
            }
            InputKind::Textarea => fields.push(FieldDefinition::textarea("initial", "Initial")),
            InputKind::Email => fields.push(FieldDefinition::email("initial", "Initial")),
            InputKind::Integer => {
                fields.push(FieldDefinition::integer("initial", "Initial"));
                fields.push(FieldDefinition::integer("min_value", "Min value"));
                fields.push(FieldDefinition::integer("max_value", "Max value"));
            }
            InputKind::Boolean => fields.push(FieldDefinition::boolean("initial", "Checked")),
            InputKind::Hidden => fields.push(FieldDefinition::text("initial", "Value")),
        }
        Some(FormSchema::new(fields))
    }

    fn validate(&self, form: &mut BoundForm, siblings: &[ElementEntry]) {
        check_name(form, siblings);
        if self.kind != InputKind::Integer {
            return;
        }
        let min = cleaned_i64(form, "min_value");
        let max = cleaned_i64(form, "max_value");
        if let (Some(min), Some(max)) = (min, max)
            && max < min
        {
            form.add_error(
                Some("max_value"),
                "Max value should be greater than or equal to min value.",
            );
        }
        if let Some(initial) = cleaned_i64(form, "initial") {
            if min.is_some_and(|min| initial < min) {
                form.add_error(Some("initial"), "Initial should not be below min value.");
            } else if max.is_some_and(|max| initial > max) {
                form.add_error(Some("initial"), "Initial should not exceed max value.");
            }
        }
    }
}

impl ElementPlugin for InputElement {
    fn to_field(
        &self,
        data: &PluginData,
        _position: i32,
        _request: &RequestContext,
    ) -> Result<FieldDefinition, PluginError> {
        let config: InputConfig = decode(data)?;
        let base = &config.base;
        let mut field = match self.kind {
            InputKind::Text => FieldDefinition::text(&base.name, base.label()),
            InputKind::Textarea => FieldDefinition::textarea(&base.name, base.label()),
            InputKind::Email => FieldDefinition::email(&base.name, base.label()),
            InputKind::Integer => FieldDefinition::integer(&base.name, base.label()),
            InputKind::Boolean => FieldDefinition::boolean(&base.name, base.label()),
            InputKind::Hidden => FieldDefinition::hidden(&base.name),
        };
        if self.kind != InputKind::Hidden {
            field = base.apply(field);
        }
        if let Some(max) = config.max_length {
            field = field.with_validator(Validator::MaxLength(max));
        }
        if let Some(min) = config.min_value {
            field = field.with_validator(Validator::MinValue(min));
        }
        if let Some(max) = config.max_value {
            field = field.with_validator(Validator::MaxValue(max));
        }
        if let Some(initial) = initial_value(config.initial.as_ref()) {
            field = field.with_initial(initial);
        }
        Ok(field)
    }
}
