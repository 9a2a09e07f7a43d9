use formweave_engine::{ElementPlugin, Plugin, PluginError, RequestContext, decode};
use formweave_model::{
    BoundForm, ElementEntry, FieldDefinition, FormSchema, PluginData, PluginDescriptor, Validator,
    Widget,
};
use serde::Deserialize;

use super::{BaseConfig, base_fields, check_name, cleaned_i64};

pub const DEFAULT_MIN: i64 = 0;
pub const DEFAULT_MAX: i64 = 100;
pub const DEFAULT_STEP: i64 = 1;
pub const DEFAULT_INITIAL: i64 = 50;

#[derive(Debug, Deserialize)]
struct SliderConfig {
    #[serde(flatten)]
    base: BaseConfig,
    min_value: i64,
    max_value: i64,
    step: i64,
    #[serde(default)]
    initial: Option<i64>,
}

/// An integer picked on a range widget.
pub struct SliderElement {
    descriptor: PluginDescriptor,
}

impl SliderElement {
    pub fn new() -> Self {
        Self {
            descriptor: PluginDescriptor::new("slider", "Slider").in_group("Numbers"),
        }
    }
}

impl Default for SliderElement {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for SliderElement {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    fn configuration_form(&self) -> Option<FormSchema> {
        let mut fields = base_fields();
        fields.extend([
            FieldDefinition::integer("min_value", "Min value")
                .required(true)
                .with_initial(DEFAULT_MIN),
            FieldDefinition::integer("max_value", "Max value")
                .required(true)
                .with_initial(DEFAULT_MAX),
            FieldDefinition::integer("step", "Step")
                .required(true)
                .with_initial(DEFAULT_STEP)
                .with_validator(Validator::MinValue(1))
                .with_help("Step size"),
            FieldDefinition::integer("initial", "Initial").with_initial(DEFAULT_INITIAL),
        ]);
        Some(FormSchema::new(fields))
    }

    fn validate(&self, form: &mut BoundForm, siblings: &[ElementEntry]) {
        check_name(form, siblings);

        let (Some(min), Some(max), Some(step)) = (
            cleaned_i64(form, "min_value"),
            cleaned_i64(form, "max_value"),
            cleaned_i64(form, "step"),
        ) else {
            return;
        };
        if max < min {
            form.add_error(
                Some("max_value"),
                "Max value should be greater than or equal to min value.",
            );
        }
        // Bounds may span the whole i64 range.
        if i128::from(step) > i128::from(max) - i128::from(min) {
            form.add_error(
                Some("step"),
                "Step should not exceed the difference between max value and min value.",
            );
        }
        if let Some(initial) = cleaned_i64(form, "initial") {
            if initial > max {
                form.add_error(Some("initial"), "Initial should not exceed max value.");
            }
            if initial < min {
                form.add_error(Some("min_value"), "Initial should not be below min value.");
            }
        }
    }
}

impl ElementPlugin for SliderElement {
    fn to_field(
        &self,
        data: &PluginData,
        _position: i32,
        _request: &RequestContext,
    ) -> Result<FieldDefinition, PluginError> {
        let config: SliderConfig = decode(data)?;
        let base = &config.base;
        let field = FieldDefinition::integer(&base.name, base.label())
            .with_widget(Widget::Range {
                min: config.min_value,
                max: config.max_value,
                step: config.step,
            })
            .with_validator(Validator::MinValue(config.min_value))
            .with_validator(Validator::MaxValue(config.max_value))
            .with_initial(config.initial.unwrap_or(config.min_value));
        Ok(base.apply(field))
    }
}
