use std::time::Duration;

use formweave_engine::{
    FormHandlerContext, HandlerFailure, HandlerPlugin, HandlerResult, Plugin, decode,
};
use formweave_model::{
    BoundForm, ElementEntry, FieldDefinition, FormSchema, PluginDescriptor, Validator,
};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
const MAX_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Deserialize)]
struct RepostConfig {
    endpoint_url: String,
    #[serde(default)]
    timeout_secs: Option<u64>,
}

/// Posts the cleaned data of each submission as JSON to a configured URL.
pub struct HttpRepostHandler {
    descriptor: PluginDescriptor,
}

impl HttpRepostHandler {
    pub fn new() -> Self {
        Self {
            descriptor: PluginDescriptor::new("http_repost", "HTTP repost").in_group("Integrations"),
        }
    }
}

impl Default for HttpRepostHandler {
    fn default() -> Self {
        Self::new()
    }
}

fn is_http_url(url: &str) -> bool {
    ["http://", "https://"]
        .iter()
        .any(|scheme| url.len() > scheme.len() && url.starts_with(scheme))
}

impl Plugin for HttpRepostHandler {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    fn configuration_form(&self) -> Option<FormSchema> {
        Some(FormSchema::new(vec![
            FieldDefinition::text("endpoint_url", "Endpoint URL")
                .required(true)
                .with_validator(Validator::MaxLength(2048)),
            FieldDefinition::integer("timeout_secs", "Timeout (seconds)")
                .with_validator(Validator::MinValue(1))
                .with_validator(Validator::MaxValue(MAX_TIMEOUT_SECS as i64))
                .with_help("Defaults to 10 seconds."),
        ]))
    }

    fn validate(&self, form: &mut BoundForm, _siblings: &[ElementEntry]) {
        let valid = form
            .cleaned_data()
            .and_then(|d| d.get("endpoint_url"))
            .and_then(|v| v.as_str())
            .is_none_or(is_http_url);
        if !valid {
            form.add_error(Some("endpoint_url"), "Enter an http:// or https:// URL.");
        }
    }
}

impl HandlerPlugin for HttpRepostHandler {
    fn run(&self, ctx: FormHandlerContext<'_>) -> HandlerResult {
        let config: RepostConfig = decode(ctx.plugin_data)?;
        let timeout = config
            .timeout_secs
            .unwrap_or(DEFAULT_TIMEOUT_SECS)
            .clamp(1, MAX_TIMEOUT_SECS);

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout))
            .user_agent(concat!("formweave/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HandlerFailure::new(format!("http client: {e}")))?;

        let body = json!({
            "form": ctx.composition.slug.as_str(),
            "data": ctx.cleaned_data,
        });
        let resp = client
            .post(&config.endpoint_url)
            .json(&body)
            .send()
            .map_err(|e| HandlerFailure::new(format!("repost failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(HandlerFailure::new(format!(
                "HTTP {} from {}",
                status, config.endpoint_url
            )));
        }
        debug!(url = %config.endpoint_url, status = status.as_u16(), "Submission reposted");
        Ok(json!({ "status": status.as_u16() }))
    }
}
