//! Per-field settings resolution.
//!
//! Walks every key of the defaults, computes the field's effective value
//! and keeps it only when it loosely differs from the default. The result is
//! the smallest payload that reproduces the field's configuration when merged
//! over the defaults on the client.

use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

use mcefield_common::{FeatureSet, Settings, loose_eq};

use crate::cache::SettingsCache;
use crate::config::{FieldSettings, ModuleSettings, SiteContext};
use crate::css;
use crate::formats::{formats_from_value, formats_to_value};
use crate::names::has_name;

/// Everything a resolver may read for one field instance.
#[derive(Debug, Clone, Copy)]
pub struct FieldContext<'a> {
    pub field: &'a FieldSettings,
    pub module: &'a ModuleSettings,
    pub site: &'a SiteContext,
}

impl<'a> FieldContext<'a> {
    pub fn new(field: &'a FieldSettings, module: &'a ModuleSettings, site: &'a SiteContext) -> Self {
        Self {
            field,
            module,
            site,
        }
    }

    /// Raw value by option name: the field first, then the module.
    pub fn raw(&self, name: &str) -> Option<Value> {
        self.field
            .get(name)
            .cloned()
            .or_else(|| self.module.get(name))
    }

    fn flag(&self, feature: FeatureSet) -> Option<Value> {
        Some(Value::Bool(self.field.uses(feature)))
    }
}

/// Computes one setting. `None` leaves the key out of the result.
pub type ResolveFn = Box<dyn Fn(&FieldContext<'_>, &Settings) -> Option<Value> + Send + Sync>;

/// Registry of setting name to resolver. Names without an entry fall through
/// to [`FieldContext::raw`].
pub struct SettingResolvers {
    resolvers: HashMap<String, ResolveFn>,
}

impl std::fmt::Debug for SettingResolvers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.resolvers.keys().collect();
        names.sort();
        f.debug_struct("SettingResolvers")
            .field("names", &names)
            .finish()
    }
}

impl Default for SettingResolvers {
    fn default() -> Self {
        Self::builtin()
    }
}

impl SettingResolvers {
    pub fn empty() -> Self {
        Self {
            resolvers: HashMap::new(),
        }
    }

    /// Resolvers for the settings derived from features, module
    /// configuration and the allowed headlines.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register("menubar", |ctx, _| ctx.flag(FeatureSet::MENUBAR));
        registry.register("statusbar", |ctx, _| {
            if ctx.field.uses(FeatureSet::INLINE) {
                ctx.flag(FeatureSet::STATUSBAR)
            } else {
                Some(Value::Bool(true))
            }
        });
        registry.register("browser_spellcheck", |ctx, _| ctx.flag(FeatureSet::SPELLCHECK));
        registry.register("toolbar", |ctx, _| {
            if ctx.field.uses(FeatureSet::TOOLBAR) {
                ctx.raw("toolbar")
            } else {
                Some(Value::String(String::new()))
            }
        });
        registry.register("toolbar_sticky", |ctx, _| ctx.flag(FeatureSet::STICKYBARS));
        registry.register("content_css", |ctx, _| match ctx.module.content_css.as_str() {
            "custom" if ctx.module.content_css_url.is_empty() => None,
            "custom" => Some(Value::String(ctx.module.content_css_url.clone())),
            name => Some(Value::String(name.to_owned())),
        });
        registry.register("directionality", |ctx, _| {
            Some(Value::String(ctx.site.direction.clone()))
        });
        registry.register("style_formats", |ctx, defaults| {
            defaults
                .get("style_formats")
                .map(|formats| filter_heading_formats(formats, &ctx.field.headlines))
        });
        registry.register("block_formats", |ctx, defaults| {
            defaults
                .get("block_formats")
                .and_then(Value::as_str)
                .map(|list| Value::String(filter_block_formats(list, &ctx.field.headlines)))
        });
        registry
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        resolver: impl Fn(&FieldContext<'_>, &Settings) -> Option<Value> + Send + Sync + 'static,
    ) {
        self.resolvers.insert(name.into(), Box::new(resolver));
    }

    /// Effective value of `name` for the field.
    pub fn value(&self, name: &str, ctx: &FieldContext<'_>, defaults: &Settings) -> Option<Value> {
        match self.resolvers.get(name) {
            Some(resolve) => resolve(ctx, defaults),
            None => ctx.raw(name),
        }
    }
}

fn is_heading(tag: &str) -> bool {
    matches!(tag, "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

/// Drop `Headings` menu items whose format is not an allowed headline.
fn filter_heading_formats(formats: &Value, headlines: &[String]) -> Value {
    let mut formats = formats.clone();
    let Some(entries) = formats.as_array_mut() else {
        return formats;
    };
    let headings = entries
        .iter_mut()
        .find(|entry| entry.get("title").and_then(Value::as_str) == Some("Headings"));
    if let Some(Value::Array(items)) = headings.and_then(|h| h.get_mut("items")) {
        items.retain(|item| match item.get("format").and_then(Value::as_str) {
            Some(tag) if !tag.is_empty() => headlines.iter().any(|h| h == tag),
            _ => true,
        });
    }
    formats
}

/// Filter a `Name=tag;` list to allowed headlines, keeping other entries and
/// their order.
fn filter_block_formats(list: &str, headlines: &[String]) -> String {
    list.split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter(|entry| {
            let tag = entry.rsplit_once('=').map_or("", |(_, tag)| tag.trim());
            !is_heading(tag) || headlines.iter().any(|h| h == tag)
        })
        .map(|entry| format!("{entry};"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Computes settings diffs against the defaults.
#[derive(Debug)]
pub struct SettingsResolver<'c> {
    resolvers: SettingResolvers,
    cache: &'c SettingsCache,
}

impl<'c> SettingsResolver<'c> {
    pub fn new(cache: &'c SettingsCache) -> Self {
        Self::with_resolvers(SettingResolvers::builtin(), cache)
    }

    pub fn with_resolvers(resolvers: SettingResolvers, cache: &'c SettingsCache) -> Self {
        Self { resolvers, cache }
    }

    pub fn cache(&self) -> &'c SettingsCache {
        self.cache
    }

    /// Settings of the field that differ from `defaults`.
    ///
    /// With a non-empty `cache_key` the first result for that key is stored
    /// and returned to every later caller, whatever its inputs.
    pub fn resolve(
        &self,
        ctx: &FieldContext<'_>,
        defaults: &Settings,
        cache_key: Option<&str>,
    ) -> Settings {
        let cache_key = cache_key.filter(|key| !key.is_empty());
        if let Some(key) = cache_key
            && let Some(hit) = self.cache.settings(key)
        {
            return (*hit).clone();
        }

        let mut settings = Settings::new();
        for (name, default) in defaults {
            let Some(value) = self.resolvers.value(name, ctx, defaults) else {
                continue;
            };
            if !value.is_null() && !loose_eq(&value, default) {
                settings.insert(name.clone(), value);
            }
        }

        apply_skin(ctx, &mut settings, defaults);
        apply_plugins(ctx, &mut settings, defaults);

        let css = ctx.field.style_formats_css.trim();
        if defaults.contains_key("style_formats") && !css.is_empty() {
            apply_style_formats_css(css, &mut settings, defaults);
        }

        tracing::debug!(field = %ctx.field.name, keys = settings.len(), "resolved settings");

        match cache_key {
            Some(key) => (*self.cache.insert_settings(key, settings)).clone(),
            None => settings,
        }
    }
}

fn apply_skin(ctx: &FieldContext<'_>, settings: &mut Settings, defaults: &Settings) {
    let module = ctx.module;
    if module.skin == "custom" {
        settings.shift_remove("skin");
        let url = module.skin_url.trim_end_matches('/');
        if !url.is_empty() {
            let url = if url.contains("//") {
                url.to_owned()
            } else {
                ctx.site.root_absolute(url)
            };
            settings.insert("skin_url".to_owned(), Value::String(url));
        }
    } else {
        settings.shift_remove("skin_url");
        let skin = Value::String(module.skin.clone());
        match defaults.get("skin") {
            Some(default) if loose_eq(&skin, default) => {
                settings.shift_remove("skin");
            }
            _ => {
                settings.insert("skin".to_owned(), skin);
            }
        }
    }
}

pub(crate) fn plugin_basename(url: &str) -> &str {
    let file = url.rsplit('/').next().unwrap_or(url);
    file.strip_suffix(".js").unwrap_or(file)
}

fn apply_plugins(ctx: &FieldContext<'_>, settings: &mut Settings, defaults: &Settings) {
    if !ctx.field.ext_plugins.is_empty() {
        let mut plugins = defaults
            .get("external_plugins")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        for url in &ctx.field.ext_plugins {
            plugins.insert(plugin_basename(url).to_owned(), Value::String(url.clone()));
        }
        let plugins = Value::Object(plugins);
        if defaults
            .get("external_plugins")
            .is_none_or(|default| !loose_eq(&plugins, default))
        {
            settings.insert("external_plugins".to_owned(), plugins);
        }
    }

    let Some(default_plugins) = defaults.get("plugins") else {
        return;
    };
    let default_plugins = default_plugins.as_str().unwrap_or_default();
    let raw = ctx.raw("plugins");
    let plugins = match raw.as_ref().and_then(Value::as_str) {
        Some(list) if !list.trim().is_empty() => list,
        _ => default_plugins,
    };

    for (plugin, generic) in [("pwlink", "link"), ("pwimage", "image")] {
        if !has_name(plugins, plugin) {
            drop_plugin(settings, defaults, plugin, generic);
        }
    }

    let plugins = plugins.split_whitespace().collect::<Vec<_>>().join(" ");
    if plugins == default_plugins {
        settings.shift_remove("plugins");
    } else {
        settings.insert("plugins".to_owned(), Value::String(plugins));
    }
}

/// Remove an inactive plugin's script and point its menu items at the
/// generic tool.
fn drop_plugin(settings: &mut Settings, defaults: &Settings, plugin: &str, generic: &str) {
    let external = settings
        .get("external_plugins")
        .or_else(|| defaults.get("external_plugins"))
        .and_then(Value::as_object);
    if let Some(external) = external
        && external.contains_key(plugin)
    {
        let mut external = external.clone();
        external.shift_remove(plugin);
        settings.insert("external_plugins".to_owned(), Value::Object(external));
    }

    let menu = settings.get("menu").or_else(|| defaults.get("menu"));
    let items = menu
        .and_then(|menu| menu.pointer("/insert/items"))
        .and_then(Value::as_str);
    if let (Some(menu), Some(items)) = (menu, items)
        && items.contains(plugin)
    {
        let replaced = items.replace(plugin, generic);
        let mut menu = menu.clone();
        if let Some(slot) = menu.pointer_mut("/insert/items") {
            *slot = Value::String(replaced);
        }
        settings.insert("menu".to_owned(), menu);
    }
}

fn apply_style_formats_css(css: &str, settings: &mut Settings, defaults: &Settings) {
    let existing = settings
        .get("style_formats")
        .or_else(|| defaults.get("style_formats"))
        .map(formats_from_value)
        .unwrap_or_default();
    let content_style = settings
        .get("content_style")
        .or_else(|| defaults.get("content_style"))
        .and_then(Value::as_str)
        .unwrap_or_default();

    let compiled = css::compile(css, existing, content_style);
    settings.insert(
        "style_formats".to_owned(),
        formats_to_value(&compiled.style_formats),
    );
    settings.insert(
        "content_style".to_owned(),
        Value::String(compiled.content_style),
    );
}

/// Load add-settings: the field's settings file (relative to the site root)
/// then its inline settings JSON.
pub fn add_settings(field: &FieldSettings, site_root: &Path) -> Settings {
    let mut add = Settings::new();
    let file = field.settings_file.trim();
    if !file.is_empty() {
        let path = site_root.join(file.trim_start_matches('/'));
        add = mcefield_common::decode_settings_file(path, "settingsFile");
    }
    let inline = mcefield_common::decode_settings(&field.settings_json, "settingsJSON");
    mcefield_common::merge_settings(&mut add, inline);
    add
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InlineMode;
    use crate::defaults::load_defaults;
    use mcefield_common::merged;
    use serde_json::json;

    struct Fixture {
        cache: SettingsCache,
        module: ModuleSettings,
        site: SiteContext,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                cache: SettingsCache::new(),
                module: ModuleSettings::default(),
                site: SiteContext::default(),
            }
        }

        fn resolve(&self, field: &FieldSettings, key: Option<&str>) -> (Settings, Settings) {
            let defaults = load_defaults(&self.site, &self.module, &self.cache);
            let ctx = FieldContext::new(field, &self.module, &self.site);
            let diff = SettingsResolver::new(&self.cache).resolve(&ctx, &defaults, key);
            (diff, (*defaults).clone())
        }
    }

    #[test]
    fn untouched_field_has_empty_diff() {
        let fx = Fixture::new();
        let (diff, _) = fx.resolve(&FieldSettings::new("body"), None);
        assert!(diff.is_empty(), "unexpected diff: {diff:?}");
    }

    #[test]
    fn diff_never_repeats_a_default_and_round_trips() {
        let fx = Fixture::new();
        let mut field = FieldSettings::new("body");
        field.features = FeatureSet::field_default() - FeatureSet::MENUBAR;
        field.set("height", json!("500"));
        field.set("toolbar", json!("bold italic"));
        field.set("invalid_styles", json!("color"));
        field.headlines = vec!["h2".into(), "h3".into()];

        let (diff, defaults) = fx.resolve(&field, None);
        for (key, value) in &diff {
            if let Some(default) = defaults.get(key) {
                assert!(!loose_eq(value, default), "{key} repeats its default");
            }
        }

        let effective = merged(&defaults, &diff);
        assert_eq!(effective["menubar"], json!(false));
        assert_eq!(effective["toolbar"], json!("bold italic"));
        assert_eq!(effective["invalid_styles"], json!("color"));
        assert_eq!(effective["height"], json!(500));
        assert!(!diff.contains_key("height"));
        assert_eq!(
            effective["block_formats"],
            json!("Paragraph=p; Heading 2=h2; Heading 3=h3; Preformatted=pre;")
        );
        let headings: Vec<_> = effective["style_formats"][0]["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|item| item["format"].clone())
            .collect();
        assert_eq!(headings, [json!("h2"), json!("h3")]);
    }

    #[test]
    fn toolbar_blanked_without_feature_and_statusbar_follows_inline() {
        let fx = Fixture::new();
        let mut field = FieldSettings::new("body");
        field.features = FeatureSet::MENUBAR | FeatureSet::SPELLCHECK | FeatureSet::STICKYBARS;
        field.inline_mode = InlineMode::Inline;

        let (diff, _) = fx.resolve(&field, None);
        assert_eq!(diff.get("toolbar"), Some(&json!("")));
        assert_eq!(diff.get("statusbar"), Some(&json!(false)));
        assert!(!diff.contains_key("menubar"));
    }

    #[test]
    fn custom_skin_emits_absolute_url() {
        let mut fx = Fixture::new();
        fx.module.skin = "custom".into();
        fx.module.skin_url = "site/skins/mine/".into();
        let (diff, _) = fx.resolve(&FieldSettings::new("body"), None);
        assert_eq!(diff.get("skin_url"), Some(&json!("/site/skins/mine")));
        assert!(!diff.contains_key("skin"));

        let mut fx = Fixture::new();
        fx.module.skin = "oxide-dark".into();
        let (diff, _) = fx.resolve(&FieldSettings::new("body"), None);
        assert_eq!(diff.get("skin"), Some(&json!("oxide-dark")));
        assert!(!diff.contains_key("skin_url"));
    }

    #[test]
    fn inactive_pw_plugins_fall_back_to_generic_tools() {
        let fx = Fixture::new();
        let mut field = FieldSettings::new("body");
        field.set("plugins", json!("lists link pwimage"));
        field.ext_plugins = vec!["/site/plugins/charmap.js".into()];

        let (diff, _) = fx.resolve(&field, None);
        assert_eq!(diff.get("plugins"), Some(&json!("lists link pwimage")));
        assert_eq!(
            diff.get("external_plugins"),
            Some(&json!({
                "pwimage": "/site/modules/mcefield/plugins/pwimage.js",
                "charmap": "/site/plugins/charmap.js"
            }))
        );
        assert_eq!(
            diff["menu"]["insert"]["items"],
            json!("pwimage link | anchor hr table")
        );
    }

    #[test]
    fn style_formats_css_is_compiled_into_the_diff() {
        let fx = Fixture::new();
        let mut field = FieldSettings::new("body");
        field.style_formats_css = "#Blocks p.lead { font-size: 1.2em }".into();

        let (diff, _) = fx.resolve(&field, None);
        assert_eq!(
            diff.get("content_style"),
            Some(&json!("p.lead { font-size:1.2em; } "))
        );
        let blocks = &diff["style_formats"][1];
        assert_eq!(blocks["title"], json!("Blocks"));
        assert_eq!(blocks["items"][3]["title"], json!("p.lead"));
    }

    #[test]
    fn cache_key_memoizes_first_result() {
        let fx = Fixture::new();
        let mut first = FieldSettings::new("body");
        first.set("invalid_styles", json!("color"));
        let (diff, _) = fx.resolve(&first, Some("shared"));
        assert_eq!(diff.get("invalid_styles"), Some(&json!("color")));

        let (diff, _) = fx.resolve(&FieldSettings::new("other"), Some("shared"));
        assert_eq!(diff.get("invalid_styles"), Some(&json!("color")));

        let (diff, _) = fx.resolve(&FieldSettings::new("other"), Some(""));
        assert!(diff.is_empty());
    }

    #[test]
    fn custom_resolvers_extend_the_registry() {
        let fx = Fixture::new();
        let defaults = load_defaults(&fx.site, &fx.module, &fx.cache);
        let mut resolvers = SettingResolvers::builtin();
        resolvers.register("relative_urls", |_, _| Some(json!(true)));
        let field = FieldSettings::new("body");
        let ctx = FieldContext::new(&field, &fx.module, &fx.site);

        let diff = SettingsResolver::with_resolvers(resolvers, &fx.cache).resolve(&ctx, &defaults, None);
        assert_eq!(diff.get("relative_urls"), Some(&json!(true)));
    }

    #[test]
    fn add_settings_merge_file_then_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("custom.json"),
            r#"{"height": 200, "add_toolbar": "code"}"#,
        )
        .unwrap();
        let mut field = FieldSettings::new("body");
        field.settings_file = "/custom.json".into();
        field.settings_json = r#"{"height": 250}"#.into();

        let add = add_settings(&field, dir.path());
        assert_eq!(Value::Object(add), json!({"height": 250, "add_toolbar": "code"}));
    }
}
