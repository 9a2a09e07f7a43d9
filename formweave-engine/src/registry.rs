//! Uid-keyed plugin registry.
//!
//! Plugins are registered once at startup by explicit calls; afterwards the
//! registry is only read. Iteration follows registration order so listings
//! are stable across calls.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::access::{AccessPolicy, User};
use crate::error::{EngineError, EngineResult};
use crate::plugin::Plugin;

/// Plugins of one group, as listed to a user.
pub struct PluginGroup<'a, P: ?Sized> {
    pub group: &'a str,
    pub plugins: Vec<&'a Arc<P>>,
}

/// Registry of one plugin capability (elements, handlers or wizard handlers).
pub struct Registry<P: ?Sized> {
    kind: &'static str,
    plugins: Vec<Arc<P>>,
    index: HashMap<String, usize>,
}

impl<P: ?Sized + Plugin> Registry<P> {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            plugins: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Registers a plugin. Fails if its uid is already taken.
    pub fn register(&mut self, plugin: Arc<P>) -> EngineResult<()> {
        let uid = plugin.uid().to_string();
        if self.index.contains_key(&uid) {
            return Err(EngineError::DuplicateUid(uid));
        }
        info!(plugin_uid = %uid, kind = self.kind, "Plugin registered");
        self.index.insert(uid, self.plugins.len());
        self.plugins.push(plugin);
        Ok(())
    }

    /// Registers a plugin, replacing any plugin with the same uid in place.
    pub fn register_override(&mut self, plugin: Arc<P>) {
        let uid = plugin.uid().to_string();
        match self.index.get(&uid) {
            Some(&idx) => {
                warn!(plugin_uid = %uid, kind = self.kind, "Plugin registration overridden");
                self.plugins[idx] = plugin;
            }
            None => {
                info!(plugin_uid = %uid, kind = self.kind, "Plugin registered");
                self.index.insert(uid, self.plugins.len());
                self.plugins.push(plugin);
            }
        }
    }

    pub fn get(&self, uid: &str) -> EngineResult<&Arc<P>> {
        self.index
            .get(uid)
            .map(|&idx| &self.plugins[idx])
            .ok_or_else(|| EngineError::UnknownPlugin(uid.to_string()))
    }

    pub fn contains(&self, uid: &str) -> bool {
        self.index.contains_key(uid)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<P>> {
        self.plugins.iter()
    }

    pub fn uids(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.uid()).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// The plugin the user may use, if registered and allowed.
    pub fn get_allowed(&self, user: &User, policy: &AccessPolicy, uid: &str) -> EngineResult<&Arc<P>> {
        match self.get(uid) {
            Ok(plugin) if policy.is_plugin_allowed(user, uid) => Ok(plugin),
            _ => Err(EngineError::Entitlement {
                uid: uid.to_string(),
            }),
        }
    }

    /// Plugins the user may use, grouped by category. Groups appear in the
    /// order their first plugin was registered.
    pub fn get_for_user(&self, user: &User, policy: &AccessPolicy) -> Vec<PluginGroup<'_, P>> {
        let mut groups: Vec<PluginGroup<'_, P>> = Vec::new();
        for plugin in self
            .plugins
            .iter()
            .filter(|p| policy.is_plugin_allowed(user, p.uid()))
        {
            let group = plugin.descriptor().group.as_str();
            match groups.iter_mut().find(|g| g.group == group) {
                Some(existing) => existing.plugins.push(plugin),
                None => groups.push(PluginGroup {
                    group,
                    plugins: vec![plugin],
                }),
            }
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{AccessConfig, AccessMode};
    use formweave_model::PluginDescriptor;
    use formweave_types::UserId;

    struct Dummy(PluginDescriptor);

    impl Plugin for Dummy {
        fn descriptor(&self) -> &PluginDescriptor {
            &self.0
        }
    }

    fn dummy(uid: &str, group: &str) -> Arc<dyn Plugin> {
        Arc::new(Dummy(PluginDescriptor::new(uid, uid).in_group(group)))
    }

    #[test]
    fn duplicate_uid_is_rejected() {
        let mut registry: Registry<dyn Plugin> = Registry::new("element");
        registry.register(dummy("text", "Fields")).unwrap();
        let err = registry.register(dummy("text", "Fields")).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateUid(uid) if uid == "text"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn override_keeps_position() {
        let mut registry: Registry<dyn Plugin> = Registry::new("element");
        registry.register(dummy("a", "G")).unwrap();
        registry.register(dummy("b", "G")).unwrap();
        registry.register_override(dummy("a", "Other"));
        assert_eq!(registry.uids(), vec!["a", "b"]);
        assert_eq!(registry.get("a").unwrap().descriptor().group, "Other");
    }

    #[test]
    fn unknown_uid() {
        let registry: Registry<dyn Plugin> = Registry::new("handler");
        assert!(matches!(registry.get("nope"), Err(EngineError::UnknownPlugin(_))));
    }

    #[test]
    fn groups_follow_registration_order() {
        let mut registry: Registry<dyn Plugin> = Registry::new("element");
        for (uid, group) in [("text", "Fields"), ("img", "Content"), ("email", "Fields")] {
            registry.register(dummy(uid, group)).unwrap();
        }
        let user = User::new(UserId::new());
        let groups = registry.get_for_user(&user, &AccessPolicy::unrestricted());
        let listed: Vec<(&str, Vec<&str>)> = groups
            .iter()
            .map(|g| (g.group, g.plugins.iter().map(|p| p.uid()).collect()))
            .collect();
        assert_eq!(listed, vec![("Fields", vec!["text", "email"]), ("Content", vec!["img"])]);
    }

    #[test]
    fn disallowed_plugin_reads_as_entitlement_error() {
        let mut registry: Registry<dyn Plugin> = Registry::new("element");
        registry.register(dummy("text", "Fields")).unwrap();
        let policy = AccessPolicy::new(&AccessConfig {
            mode: AccessMode::Denylist,
            plugins: vec!["text".into()],
            ..Default::default()
        });
        let user = User::new(UserId::new());
        let err = registry.get_allowed(&user, &policy, "text").err().expect("expected error");
        assert!(err.is_not_found());
        assert!(registry.get_for_user(&user, &policy).is_empty());
    }
}
