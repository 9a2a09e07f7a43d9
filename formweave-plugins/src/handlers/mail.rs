use std::sync::{Arc, Mutex};

use formweave_engine::{
    FormHandlerContext, HandlerFailure, HandlerPlugin, HandlerResult, Plugin, WizardHandlerContext,
    WizardHandlerPlugin, decode,
};
use formweave_model::{
    BoundForm, CleanedData, ElementEntry, FieldDefinition, FormSchema, PluginDescriptor,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::info;

use super::{display_value, field_labels};

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("mail transport failed: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

/// Delivers mail for the `mail` handler.
pub trait Mailer: Send + Sync {
    fn send(&self, message: &EmailMessage) -> Result<(), MailError>;
}

/// Keeps sent messages in memory.
#[derive(Debug, Default)]
pub struct MemoryOutbox {
    sent: Mutex<Vec<EmailMessage>>,
}

impl MemoryOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

impl Mailer for MemoryOutbox {
    fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        self.sent
            .lock()
            .map_err(|e| MailError::Transport(e.to_string()))?
            .push(message.clone());
        Ok(())
    }
}

/// Writes messages to the log instead of delivering them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        info!(
            from = %message.from,
            to = ?message.to,
            subject = %message.subject,
            "Mail delivered to log"
        );
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct MailConfig {
    from_email: String,
    to_email: String,
    subject: String,
    #[serde(default)]
    body: String,
}

fn recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect()
}

fn looks_like_email(address: &str) -> bool {
    match address.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !address.contains(char::is_whitespace)
        }
        None => false,
    }
}

/// Mails every submission to a fixed list of recipients.
pub struct MailHandler {
    descriptor: PluginDescriptor,
    mailer: Arc<dyn Mailer>,
}

impl MailHandler {
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self {
            descriptor: PluginDescriptor::new("mail", "Mail").in_group("Notifications"),
            mailer,
        }
    }

    fn send(&self, config: MailConfig, elements: &[ElementEntry], data: &CleanedData) -> HandlerResult {
        let to = recipients(&config.to_email);
        if let Some(bad) = to.iter().find(|r| !looks_like_email(r)) {
            return Err(MailError::InvalidRecipient(bad.clone()).into());
        }

        let mut body = config.body;
        if !body.is_empty() {
            body.push_str("\n\n");
        }
        for (name, label) in field_labels(elements, data) {
            let value = data.get(&name).map(display_value).unwrap_or_default();
            let label = label.as_str().map(str::to_owned).unwrap_or(name);
            body.push_str(&format!("{label}: {value}\n"));
        }

        let message = EmailMessage {
            from: config.from_email,
            to,
            subject: config.subject,
            body,
        };
        self.mailer.send(&message)?;
        Ok(json!({ "recipients": message.to }))
    }
}

impl From<MailError> for HandlerFailure {
    fn from(err: MailError) -> Self {
        HandlerFailure::new(err.to_string())
    }
}

impl Plugin for MailHandler {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    fn configuration_form(&self) -> Option<FormSchema> {
        Some(FormSchema::new(vec![
            FieldDefinition::email("from_email", "From").required(true),
            FieldDefinition::text("to_email", "To")
                .required(true)
                .with_help("Separate addresses with commas."),
            FieldDefinition::text("subject", "Subject").required(true),
            FieldDefinition::textarea("body", "Body"),
        ]))
    }

    fn validate(&self, form: &mut BoundForm, _siblings: &[ElementEntry]) {
        let raw = form
            .cleaned_data()
            .and_then(|d| d.get("to_email"))
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        let invalid: Vec<String> = recipients(raw)
            .into_iter()
            .filter(|r| !looks_like_email(r))
            .collect();
        if !invalid.is_empty() {
            form.add_error(
                Some("to_email"),
                format!("Invalid addresses: {}.", invalid.join(", ")),
            );
        }
    }
}

impl HandlerPlugin for MailHandler {
    fn run(&self, ctx: FormHandlerContext<'_>) -> HandlerResult {
        let config: MailConfig = decode(ctx.plugin_data)?;
        self.send(config, ctx.elements, ctx.cleaned_data)
    }
}

impl WizardHandlerPlugin for MailHandler {
    fn run(&self, ctx: WizardHandlerContext<'_>) -> HandlerResult {
        let config: MailConfig = decode(ctx.plugin_data)?;
        self.send(config, ctx.elements, &ctx.merged_data())
    }
}
