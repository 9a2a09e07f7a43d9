//! Handler plugins. `db_store` and `mail` serve both single forms and
//! wizards; `http_repost` serves single forms only.

mod db_store;
mod http_repost;
mod mail;

pub use db_store::DbStoreHandler;
pub use http_repost::{DEFAULT_TIMEOUT_SECS, HttpRepostHandler};
pub use mail::{EmailMessage, LogMailer, MailError, MailHandler, Mailer, MemoryOutbox};

use formweave_model::{CleanedData, ElementEntry};
use serde_json::{Map, Value};

/// Field name to display label for every submitted field, in element order.
/// Elements without a label fall back to their field name.
pub(crate) fn field_labels(elements: &[ElementEntry], data: &CleanedData) -> Map<String, Value> {
    let mut labels = Map::new();
    for entry in elements {
        let Some(name) = entry.data_str("name") else {
            continue;
        };
        if !data.contains_key(name) || labels.contains_key(name) {
            continue;
        }
        let label = entry
            .data_str("label")
            .filter(|l| !l.is_empty())
            .unwrap_or(name);
        labels.insert(name.to_string(), Value::String(label.to_string()));
    }
    labels
}

/// Renders a cleaned value for people: strings as-is, `null` as empty.
pub(crate) fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
