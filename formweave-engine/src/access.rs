//! Plugin entitlements.
//!
//! Decides which plugins a user may attach to their compositions. The mode
//! follows the `[access]` section of the engine configuration:
//! - `unrestricted`: every registered plugin
//! - `allowlist`: only listed plugins, plus the grants of the user's groups
//! - `denylist`: every plugin except the listed ones
//!
//! Superusers bypass all restrictions.

use std::collections::{BTreeMap, HashSet};

use formweave_types::UserId;
use serde::{Deserialize, Serialize};

/// An authenticated user as seen by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub is_superuser: bool,
}

impl User {
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            groups: Vec::new(),
            is_superuser: false,
        }
    }

    pub fn in_group(mut self, group: &str) -> Self {
        self.groups.push(group.into());
        self
    }

    pub fn superuser(mut self) -> Self {
        self.is_superuser = true;
        self
    }
}

/// Access mode for plugin entitlements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    #[default]
    Unrestricted,
    Allowlist,
    Denylist,
}

/// The `[access]` configuration section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    pub mode: AccessMode,
    /// Allowed or denied plugin uids, depending on `mode`.
    pub plugins: Vec<String>,
    /// Extra plugin grants per user group. Only used in allowlist mode.
    pub groups: BTreeMap<String, Vec<String>>,
}

/// Enforces entitlement decisions.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    mode: AccessMode,
    plugins: HashSet<String>,
    groups: BTreeMap<String, HashSet<String>>,
}

impl AccessPolicy {
    pub fn new(config: &AccessConfig) -> Self {
        Self {
            mode: config.mode,
            plugins: config.plugins.iter().cloned().collect(),
            groups: config
                .groups
                .iter()
                .map(|(group, uids)| (group.clone(), uids.iter().cloned().collect()))
                .collect(),
        }
    }

    /// Policy that allows every plugin.
    pub fn unrestricted() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Check if `user` may use the plugin `uid`.
    pub fn is_plugin_allowed(&self, user: &User, uid: &str) -> bool {
        if user.is_superuser {
            return true;
        }
        match self.mode {
            AccessMode::Unrestricted => true,
            AccessMode::Allowlist => {
                self.plugins.contains(uid)
                    || user.groups.iter().any(|group| {
                        self.groups
                            .get(group)
                            .is_some_and(|grants| grants.contains(uid))
                    })
            }
            AccessMode::Denylist => !self.plugins.contains(uid),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(mode: AccessMode, plugins: &[&str]) -> AccessConfig {
        AccessConfig {
            mode,
            plugins: plugins.iter().map(|s| s.to_string()).collect(),
            groups: BTreeMap::new(),
        }
    }

    #[test]
    fn unrestricted_allows_everything() {
        let policy = AccessPolicy::unrestricted();
        assert!(policy.is_plugin_allowed(&User::new(UserId::new()), "anything"));
    }

    #[test]
    fn allowlist_only_allows_listed() {
        let policy = AccessPolicy::new(&config(AccessMode::Allowlist, &["text"]));
        let user = User::new(UserId::new());
        assert!(policy.is_plugin_allowed(&user, "text"));
        assert!(!policy.is_plugin_allowed(&user, "mail"));
    }

    #[test]
    fn allowlist_honours_group_grants() {
        let mut cfg = config(AccessMode::Allowlist, &[]);
        cfg.groups.insert("staff".into(), vec!["mail".into()]);
        let policy = AccessPolicy::new(&cfg);

        let staff = User::new(UserId::new()).in_group("staff");
        let guest = User::new(UserId::new()).in_group("guests");
        assert!(policy.is_plugin_allowed(&staff, "mail"));
        assert!(!policy.is_plugin_allowed(&guest, "mail"));
    }

    #[test]
    fn denylist_blocks_listed() {
        let policy = AccessPolicy::new(&config(AccessMode::Denylist, &["http_repost"]));
        let user = User::new(UserId::new());
        assert!(!policy.is_plugin_allowed(&user, "http_repost"));
        assert!(policy.is_plugin_allowed(&user, "text"));
    }

    #[test]
    fn superuser_bypasses_policy() {
        let policy = AccessPolicy::new(&config(AccessMode::Allowlist, &[]));
        let admin = User::new(UserId::new()).superuser();
        assert!(policy.is_plugin_allowed(&admin, "mail"));
    }
}
