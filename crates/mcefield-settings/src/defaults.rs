//! Process-wide editor defaults.

use std::sync::Arc;

use mcefield_common::{Settings, decode_settings, decode_settings_file, merge_settings};

use crate::cache::SettingsCache;
use crate::config::{AlignClasses, ModuleSettings, SiteContext};
use crate::lang::{PackIndex, language_settings};

const TEMPLATE: &str = include_str!("../assets/defaults.json");

/// Alignment classes for the site, with unset entries filled from the
/// built-in names.
pub fn align_classes(site: &SiteContext, cache: &SettingsCache) -> AlignClasses {
    cache.align_classes(&site.cache_key(), || {
        let fallback = AlignClasses::default();
        let Some(configured) = site.align.clone() else {
            return fallback;
        };
        let pick = |value: String, default: String| if value.is_empty() { default } else { value };
        AlignClasses {
            left: pick(configured.left, fallback.left),
            center: pick(configured.center, fallback.center),
            right: pick(configured.right, fallback.right),
            full: fallback.full,
        }
    })
}

/// Load defaults, looking for language packs in the module directory.
pub fn load_defaults(
    site: &SiteContext,
    module: &ModuleSettings,
    cache: &SettingsCache,
) -> Arc<Settings> {
    load_defaults_with(site, module, site.module_path.as_path(), cache)
}

/// Load defaults: the built-in template, then the module's defaults file,
/// then its inline defaults JSON, then language pack settings.
///
/// Cached per site and language for the life of `cache`.
pub fn load_defaults_with(
    site: &SiteContext,
    module: &ModuleSettings,
    packs: &(impl PackIndex + ?Sized),
    cache: &SettingsCache,
) -> Arc<Settings> {
    let language_id = site.language.as_ref().map_or(0, |l| l.id);
    let key = format!("{}#{language_id}", site.cache_key());
    if let Some(defaults) = cache.defaults(&key) {
        return defaults;
    }

    let align = align_classes(site, cache);
    let template = TEMPLATE
        .replace("{url}", &site.module_url)
        .replace("{alignleft}", &align.left)
        .replace("{aligncenter}", &align.center)
        .replace("{alignright}", &align.right)
        .replace("{alignfull}", &align.full);
    let mut defaults = decode_settings(&template, "defaults.json");

    if !module.defaults_file.is_empty() {
        let path = site
            .module_path
            .join(module.defaults_file.trim_start_matches('/'));
        let data = decode_settings_file(path, "default settings file for module");
        merge_settings(&mut defaults, data);
    }

    if !module.defaults_json.trim().is_empty() {
        let data = decode_settings(&module.defaults_json, "defaults JSON module setting");
        merge_settings(&mut defaults, data);
    }

    let lang = language_settings(site, module, packs, cache);
    merge_settings(&mut defaults, (*lang).clone());

    tracing::debug!(key = %key, count = defaults.len(), "loaded editor defaults");
    cache.insert_defaults(&key, defaults)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn template_placeholders_are_substituted() {
        let cache = SettingsCache::new();
        let site = SiteContext {
            align: Some(AlignClasses {
                left: "float-left".into(),
                center: String::new(),
                right: "float-right".into(),
                full: "ignored".into(),
            }),
            ..Default::default()
        };
        let defaults = load_defaults(&site, &ModuleSettings::default(), &cache);

        assert_eq!(
            defaults["external_plugins"]["pwlink"],
            json!("/site/modules/mcefield/plugins/pwlink.js")
        );
        assert_eq!(defaults["formats"]["alignleft"][1]["classes"], json!("float-left"));
        assert_eq!(defaults["formats"]["aligncenter"][1]["classes"], json!("align_center"));
        assert_eq!(defaults["formats"]["alignfull"][0]["classes"], json!("align_full"));
    }

    #[test]
    fn module_file_and_json_layer_over_template() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("my-defaults.json"),
            r#"{"height": 400, "toolbar": "bold"}"#,
        )
        .unwrap();
        let site = SiteContext {
            module_path: dir.path().to_path_buf(),
            ..Default::default()
        };
        let module = ModuleSettings {
            defaults_file: "/my-defaults.json".into(),
            defaults_json: r#"{"height": 450}"#.into(),
            ..Default::default()
        };
        let cache = SettingsCache::new();
        let defaults = load_defaults(&site, &module, &cache);

        assert_eq!(defaults["height"], json!(450));
        assert_eq!(defaults["toolbar"], json!("bold"));
        assert_eq!(defaults["skin"], json!("oxide"));

        let again = load_defaults(&site, &ModuleSettings::default(), &cache);
        assert!(Arc::ptr_eq(&defaults, &again));
    }
}
