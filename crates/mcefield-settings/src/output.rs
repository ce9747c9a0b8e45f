//! Final shaping of settings before they are handed to the client.

use serde_json::Value;

use mcefield_common::Settings;

use crate::config::{ModuleSettings, SiteContext};

/// URL of the content stylesheet for a `content_css` value.
///
/// An empty `content_css` falls back to the module setting.
pub fn content_css_url(content_css: &str, module: &ModuleSettings, site: &SiteContext) -> String {
    let default_url = format!("{}content_css/wire.css", site.module_full_url());
    let content_css = if content_css.is_empty() {
        module.content_css.as_str()
    } else {
        content_css
    };

    match content_css {
        "" | "wire" => default_url,
        "custom" => {
            let url = module.content_css_url.as_str();
            if url.contains('/') {
                site.root_absolute(url)
            } else {
                default_url
            }
        }
        file if file.contains('/') => site.root_absolute(file),
        name => {
            let name = name.strip_suffix(".css").unwrap_or(name);
            format!("{}content_css/{name}.css", site.module_full_url())
        }
    }
}

/// Convert settings into the form the editor expects: URLs made absolute,
/// height in pixels, separators after the style and block pickers.
pub fn prepare_for_output(
    mut settings: Settings,
    module: &ModuleSettings,
    site: &SiteContext,
) -> Settings {
    if let Some(value) = settings.get_mut("content_css") {
        let css = value.as_str().unwrap_or_default();
        *value = Value::String(content_css_url(css, module, site));
    }

    if let Some(Value::Object(plugins)) = settings.get_mut("external_plugins") {
        for url in plugins.values_mut() {
            if let Value::String(s) = url
                && !s.contains("//")
            {
                *s = site.root_absolute(s);
            }
        }
    }

    if let Some(height) = settings.get_mut("height") {
        let px = match &*height {
            Value::String(s) if s.ends_with("px") => s.clone(),
            Value::String(s) => format!("{s}px"),
            other => format!("{other}px"),
        };
        *height = Value::String(px);
    }

    if let Some(Value::String(toolbar)) = settings.get_mut("toolbar") {
        for tool in ["styles", "blocks"] {
            *toolbar = toolbar.replace(&format!("{tool} "), &format!("{tool} | "));
        }
    }

    settings
}
