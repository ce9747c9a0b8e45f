//! Process-wide settings caches.
//!
//! Every key space is explicit so tests (and hosts that reload
//! configuration) can clear them with [`SettingsCache::reset`]. All maps are
//! safe to share between concurrent requests.

use dashmap::{DashMap, DashSet};
use smol_str::SmolStr;
use std::sync::{Arc, LazyLock};

use mcefield_common::Settings;

use crate::config::AlignClasses;

static GLOBAL: LazyLock<SettingsCache> = LazyLock::new(SettingsCache::new);

#[derive(Debug, Default)]
pub struct SettingsCache {
    /// Loaded defaults, keyed by site and language.
    defaults: DashMap<SmolStr, Arc<Settings>>,
    /// Resolved settings diffs, keyed by caller-supplied cache key.
    settings: DashMap<SmolStr, Arc<Settings>>,
    /// Alignment classes, keyed by site.
    align_classes: DashMap<SmolStr, AlignClasses>,
    /// Language pack settings, keyed by site and language id.
    lang_settings: DashMap<SmolStr, Arc<Settings>>,
    /// Inline content-style namespaces already injected into the page head.
    injected: DashSet<SmolStr>,
}

impl SettingsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide instance.
    pub fn global() -> &'static SettingsCache {
        &GLOBAL
    }

    /// Drop every cached entry.
    pub fn reset(&self) {
        self.defaults.clear();
        self.settings.clear();
        self.align_classes.clear();
        self.lang_settings.clear();
        self.injected.clear();
        tracing::debug!("settings caches cleared");
    }

    pub fn defaults(&self, key: &str) -> Option<Arc<Settings>> {
        self.defaults.get(key).map(|entry| entry.value().clone())
    }

    /// Store defaults unless another caller got there first; returns the
    /// stored value either way.
    pub fn insert_defaults(&self, key: &str, defaults: Settings) -> Arc<Settings> {
        self.defaults
            .entry(SmolStr::new(key))
            .or_insert_with(|| Arc::new(defaults))
            .value()
            .clone()
    }

    pub fn settings(&self, key: &str) -> Option<Arc<Settings>> {
        self.settings.get(key).map(|entry| entry.value().clone())
    }

    pub fn insert_settings(&self, key: &str, settings: Settings) -> Arc<Settings> {
        self.settings
            .entry(SmolStr::new(key))
            .or_insert_with(|| Arc::new(settings))
            .value()
            .clone()
    }

    pub fn align_classes(&self, key: &str, load: impl FnOnce() -> AlignClasses) -> AlignClasses {
        self.align_classes
            .entry(SmolStr::new(key))
            .or_insert_with(load)
            .value()
            .clone()
    }

    pub fn lang_settings(&self, key: &str, load: impl FnOnce() -> Settings) -> Arc<Settings> {
        self.lang_settings
            .entry(SmolStr::new(key))
            .or_insert_with(|| Arc::new(load()))
            .value()
            .clone()
    }

    /// Mark an inline namespace as injected. Returns `true` the first time.
    pub fn mark_injected(&self, namespace: &str) -> bool {
        self.injected.insert(SmolStr::new(namespace))
    }

    /// Forget injected namespaces starting with `prefix`.
    pub fn forget_injected(&self, prefix: &str) {
        self.injected.retain(|namespace| !namespace.starts_with(prefix));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_writer_wins_until_reset() {
        let cache = SettingsCache::new();
        let mut first = Settings::new();
        first.insert("height".into(), json!(300));
        let mut second = Settings::new();
        second.insert("height".into(), json!(500));

        cache.insert_settings("body", first);
        let stored = cache.insert_settings("body", second.clone());
        assert_eq!(stored.get("height"), Some(&json!(300)));

        cache.reset();
        assert!(cache.settings("body").is_none());
        let stored = cache.insert_settings("body", second);
        assert_eq!(stored.get("height"), Some(&json!(500)));
    }

    #[test]
    fn injection_is_tracked_once() {
        let cache = SettingsCache::new();
        assert!(cache.mark_injected("body"));
        assert!(!cache.mark_injected("body"));
        cache.reset();
        assert!(cache.mark_injected("body"));

        cache.mark_injected("7/body");
        cache.mark_injected("8/body");
        cache.forget_injected("7/");
        assert!(cache.mark_injected("7/body"));
        assert!(!cache.mark_injected("8/body"));
    }
}
