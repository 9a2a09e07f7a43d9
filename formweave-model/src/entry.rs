use formweave_types::{CompositionId, EntryId, UserId};
use serde::{Deserialize, Serialize};

/// Serialized plugin configuration. Plugins define their own keys; the core
/// only relies on this being a JSON object.
pub type PluginData = serde_json::Map<String, serde_json::Value>;

/// Identity of a registered plugin. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    /// Stable identifier stored in entries (e.g. `"text"`, `"db_store"`).
    pub uid: String,
    /// Human-readable plugin name.
    pub name: String,
    /// Category label used when listing plugins for a user.
    pub group: String,
    /// Whether the plugin may be attached more than once to one composition.
    /// Only meaningful for handler plugins.
    pub allow_multiple: bool,
}

impl PluginDescriptor {
    /// Descriptor in the `"General"` group that allows multiple attachments.
    pub fn new(uid: &str, name: &str) -> Self {
        Self {
            uid: uid.into(),
            name: name.into(),
            group: "General".into(),
            allow_multiple: true,
        }
    }

    pub fn in_group(mut self, group: &str) -> Self {
        self.group = group.into();
        self
    }

    /// Restricts the plugin to a single attachment per composition.
    pub fn single(mut self) -> Self {
        self.allow_multiple = false;
        self
    }
}

/// A form element plugin attached to a form composition at a position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementEntry {
    pub id: EntryId,
    pub composition_id: CompositionId,
    pub plugin_uid: String,
    #[serde(default)]
    pub plugin_data: PluginData,
    pub position: i32,
    pub owner: UserId,
}

impl ElementEntry {
    pub fn new(
        composition_id: CompositionId,
        plugin_uid: &str,
        plugin_data: PluginData,
        position: i32,
        owner: UserId,
    ) -> Self {
        Self {
            id: EntryId::new(),
            composition_id,
            plugin_uid: plugin_uid.into(),
            plugin_data,
            position,
            owner,
        }
    }

    /// Extract a string value from `plugin_data`.
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.plugin_data.get(key).and_then(|v| v.as_str())
    }

    /// Extract a boolean value from `plugin_data`.
    pub fn data_bool(&self, key: &str) -> Option<bool> {
        self.plugin_data.get(key).and_then(|v| v.as_bool())
    }
}

/// A handler plugin attached to a form or wizard composition. Handlers run
/// in the order the store returns them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerEntry {
    pub id: EntryId,
    pub composition_id: CompositionId,
    pub plugin_uid: String,
    #[serde(default)]
    pub plugin_data: PluginData,
    pub owner: UserId,
}

impl HandlerEntry {
    pub fn new(
        composition_id: CompositionId,
        plugin_uid: &str,
        plugin_data: PluginData,
        owner: UserId,
    ) -> Self {
        Self {
            id: EntryId::new(),
            composition_id,
            plugin_uid: plugin_uid.into(),
            plugin_data,
            owner,
        }
    }

    /// Extract a string value from `plugin_data`.
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.plugin_data.get(key).and_then(|v| v.as_str())
    }
}
