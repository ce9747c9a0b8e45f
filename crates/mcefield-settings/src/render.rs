//! Per-page render preparation.
//!
//! [`RenderReady`] is created once per rendered page. The first field it
//! prepares also produces the bootstrap payload (prepared defaults, labels,
//! link options) and the page head styles. Every field then gets its wrapper
//! classes and `data-*` attributes, and its named configuration is registered
//! for the client.

use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use mcefield_common::{FeatureSet, Settings, merged};

use crate::add::apply_add_settings;
use crate::cache::SettingsCache;
use crate::config::{FieldSettings, InlineMode, ModuleSettings, PageContext, SiteContext};
use crate::defaults::load_defaults;
use crate::output::{content_css_url, prepare_for_output};
use crate::registry::{ConfigNameRegistry, DEFAULT_CONFIG, EditorLabels, LinkOptions};
use crate::resolve::{FieldContext, SettingsResolver, add_settings, plugin_basename};

static RENDER_IDS: AtomicU64 = AtomicU64::new(1);

const DIALOG_BUTTON: &str =
    ".tox-dialog .tox-button:not(.tox-button--secondary):not(.tox-button--icon)";

/// Settings that only make sense for a whole named configuration.
const CONFIG_ONLY: [&str; 3] = ["style_formats", "content_style", "content_css"];

/// Wrapper classes and attributes for one field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WrapperOutput {
    pub classes: Vec<String>,
    pub attrs: Vec<(String, String)>,
}

impl WrapperOutput {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        self.attrs.push((name.to_owned(), value.into()));
    }
}

pub struct RenderReady<'a> {
    module: &'a ModuleSettings,
    site: &'a SiteContext,
    resolver: SettingsResolver<'a>,
    registry: ConfigNameRegistry,
    render_id: u64,
    bootstrapped: bool,
    head: Vec<String>,
    stylesheets: Vec<String>,
}

impl std::fmt::Debug for RenderReady<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderReady")
            .field("render_id", &self.render_id)
            .field("bootstrapped", &self.bootstrapped)
            .field("configs", &self.registry.names().collect::<Vec<_>>())
            .finish()
    }
}

impl<'a> RenderReady<'a> {
    pub fn new(module: &'a ModuleSettings, site: &'a SiteContext, cache: &'a SettingsCache) -> Self {
        Self::with_resolver(module, site, SettingsResolver::new(cache))
    }

    pub fn with_resolver(
        module: &'a ModuleSettings,
        site: &'a SiteContext,
        resolver: SettingsResolver<'a>,
    ) -> Self {
        let registry = ConfigNameRegistry::new(
            EditorLabels::default(),
            LinkOptions::from_lines(&site.link_class_options),
            site.debug,
        );
        Self {
            module,
            site,
            resolver,
            registry,
            render_id: RENDER_IDS.fetch_add(1, Ordering::Relaxed),
            bootstrapped: false,
            head: Vec::new(),
            stylesheets: Vec::new(),
        }
    }

    /// Replace the plugin labels, e.g. with translations.
    pub fn with_labels(mut self, labels: EditorLabels) -> Self {
        self.registry.labels = labels;
        self
    }

    pub fn registry(&self) -> &ConfigNameRegistry {
        &self.registry
    }

    /// Bootstrap object for the client.
    pub fn bootstrap_json(&mut self) -> Value {
        self.bootstrap();
        self.registry.to_json()
    }

    /// Markup to add to the page head.
    pub fn head_markup(&self) -> &[String] {
        &self.head
    }

    /// Stylesheet URLs the page must load.
    pub fn stylesheets(&self) -> &[String] {
        &self.stylesheets
    }

    fn cache(&self) -> &'a SettingsCache {
        self.resolver.cache()
    }

    fn defaults(&self) -> Arc<Settings> {
        load_defaults(self.site, self.module, self.cache())
    }

    /// Register prepared defaults and add the page head styles. Runs once.
    pub fn bootstrap(&mut self) {
        if self.bootstrapped {
            return;
        }
        self.bootstrapped = true;

        let defaults = prepare_for_output((*self.defaults()).clone(), self.module, self.site);
        self.registry.register(DEFAULT_CONFIG, defaults);

        let skin = self.module.skin.as_str();
        let mut styles = Vec::new();
        if skin.contains("dark") && !self.module.content_css.contains("dark") {
            styles.push(
                "body .tox-collection__item-label > *:not(code):not(pre) { color: #eee !important; }"
                    .to_owned(),
            );
        }
        if !skin.is_empty() && skin != "custom" && self.site.admin_theme {
            styles.push(format!(
                "{DIALOG_BUTTON} {{ background-color: #3eb998; border-color: #3eb998; }}"
            ));
            styles.push(format!(
                "{DIALOG_BUTTON}:hover {{ background-color: #e83561; border-color: #e83561; }}"
            ));
        }
        if !styles.is_empty() && self.site.admin_theme {
            self.head.push(format!("<style>{}</style>", styles.join(" ")));
        }
        tracing::debug!(render = self.render_id, "editor bootstrap ready");
    }

    /// Prepare one field for rendering.
    pub fn render_ready(&mut self, field: &FieldSettings, page: &PageContext) -> WrapperOutput {
        self.bootstrap();

        let defaults = self.defaults();
        let mut field = field.clone();
        let mut out = WrapperOutput::default();

        let image_field = page
            .image_field
            .as_deref()
            .filter(|_| field.uses(FeatureSet::IMG_UPLOAD));
        match (page.page_id, image_field) {
            (Some(page_id), Some(image_field)) => {
                out.classes.push("InputfieldHasUpload".to_owned());
                out.set_attr("data-upload-page", page_id.to_string());
                out.set_attr("data-upload-field", image_field);
            }
            (None, _) => {
                let mut replace = vec![("pwimage", "image")];
                if !page.admin_template {
                    replace.push(("pwlink", "link"));
                }
                replace_tools(&mut field, &defaults, &replace);
            }
            _ => {}
        }

        if field.inline_mode.is_inline() {
            let url = content_css_url(field.get_str("content_css"), self.module, self.site);
            if !self.stylesheets.contains(&url) {
                self.stylesheets.push(url);
            }
        }

        let config_name = field.effective_config_name();
        let add = add_settings(&field, &self.site.root_path);
        let ctx = FieldContext::new(&field, self.module, self.site);

        let (mut data, content_style) = match config_name.as_deref() {
            Some(name) => {
                let key = format!("{}#{name}", self.site.cache_key());
                let mut diff = self.resolver.resolve(&ctx, &defaults, Some(&key));
                let mut base = merged(&defaults, &diff);
                let content_style = text(&base, "content_style");
                if !add.is_empty() {
                    apply_add_settings(&mut diff, add, &defaults);
                }
                if !self.registry.contains(name) {
                    let prepared = prepare_for_output(diff, self.module, self.site);
                    self.registry.register(name, prepared);
                }
                for key in CONFIG_ONLY {
                    base.shift_remove(key);
                }
                (self.resolver.resolve(&ctx, &base, None), content_style)
            }
            None => {
                let mut data = self.resolver.resolve(&ctx, &defaults, None);
                let content_style = text(&data, "content_style");
                if !add.is_empty() {
                    apply_add_settings(&mut data, add, &defaults);
                }
                (data, content_style)
            }
        };

        if field.inline_mode.is_inline() {
            if field.inline_mode != InlineMode::InlineFixed {
                data.shift_remove("height");
            }
            data.insert("inline".to_owned(), Value::Bool(true));
            if !content_style.is_empty() && self.site.admin_theme {
                let css_name = config_name
                    .clone()
                    .unwrap_or_else(|| short_hash(&content_style));
                out.classes.push(format!("tmcei-{css_name}"));
                let marker = format!("{}{css_name}", self.injection_prefix());
                if self.cache().mark_injected(&marker) {
                    self.head.push(format!(
                        "<style>{}</style>",
                        namespace_styles(&css_name, &content_style)
                    ));
                }
            }
        }

        let data = if data.is_empty() {
            data
        } else {
            prepare_for_output(data, self.module, self.site)
        };
        out.set_attr("data-configName", config_name.unwrap_or_default());
        out.set_attr("data-settings", Value::Object(data).to_string());
        out.set_attr("data-features", field.features.to_attr());

        tracing::debug!(field = %field.name, classes = ?out.classes, "field render ready");
        out
    }

    fn injection_prefix(&self) -> String {
        format!("{}/", self.render_id)
    }
}

impl Drop for RenderReady<'_> {
    fn drop(&mut self) {
        let prefix = self.injection_prefix();
        self.cache().forget_injected(&prefix);
    }
}

fn text(settings: &Settings, key: &str) -> String {
    settings
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned()
}

/// Four hex digits of the content hash followed by the content length.
fn short_hash(content: &str) -> String {
    let hash = blake3::hash(content.as_bytes()).to_hex();
    format!("{}{}", &hash[..4], content.len())
}

/// Scope every rule of `content_style` to an inline editor wrapper.
fn namespace_styles(css_name: &str, content_style: &str) -> String {
    let ns = format!(".tmcei-{css_name} .mce-content-body ");
    format!("{ns}{}{{}}", content_style.replace('}', &format!("}} {ns}")))
}

/// Swap page-bound tools for their generic versions.
fn replace_tools(field: &mut FieldSettings, defaults: &Settings, replace: &[(&str, &str)]) {
    for &(find, tool) in replace {
        for key in ["plugins", "toolbar", "contextmenu"] {
            let current = field
                .get(key)
                .or_else(|| defaults.get(key))
                .and_then(Value::as_str);
            let replaced = match current {
                Some(current) if current.contains(find) => current.replace(find, tool),
                _ => continue,
            };
            field.set(key, Value::String(replaced));
        }

        let external = field
            .get("external_plugins")
            .or_else(|| defaults.get("external_plugins"))
            .and_then(Value::as_object);
        if let Some(external) = external
            && external.contains_key(find)
        {
            let mut external = external.clone();
            external.shift_remove(find);
            field.set("external_plugins", Value::Object(external));
        }
        field.ext_plugins.retain(|url| plugin_basename(url) != find);
        tracing::debug!(field = %field.name, from = find, to = tool, "replaced tool");
    }
}
