use miette::{IntoDiagnostic, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::path::{Path, PathBuf};

use mcefield_common::{FeatureSet, Settings, read_settings_file};

use crate::markup::MarkupToggles;
use crate::names::{sanitize_names, sanitize_toolbar};

/// Module-wide configuration, shared by every field on the site.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleSettings {
    /// Skin name, or `custom` to load from `skin_url`.
    pub skin: String,
    pub skin_url: String,
    /// Content CSS basename, a root-relative file, or `custom`.
    pub content_css: String,
    pub content_css_url: String,
    /// Defaults file, relative to the module URL.
    pub defaults_file: String,
    /// Inline JSON merged over the defaults.
    pub defaults_json: String,
    /// Newline-separated plugin files fields may opt into.
    pub ext_plugin_options: String,
    /// Everything else, including `lang_<name>` language pack overrides.
    #[serde(flatten)]
    pub extra: Settings,
}

impl Default for ModuleSettings {
    fn default() -> Self {
        Self {
            skin: "oxide".to_owned(),
            skin_url: String::new(),
            content_css: "wire".to_owned(),
            content_css_url: String::new(),
            defaults_file: String::new(),
            defaults_json: String::new(),
            ext_plugin_options: String::new(),
            extra: Settings::new(),
        }
    }
}

impl ModuleSettings {
    /// Language pack configured for the named site language, if any.
    pub fn lang_override(&self, language: &str) -> Option<&str> {
        self.extra
            .get(&format!("lang_{language}"))
            .and_then(Value::as_str)
            .filter(|code| !code.is_empty())
    }

    /// Raw value by editor option name.
    pub fn get(&self, name: &str) -> Option<Value> {
        let text = |s: &str| Some(Value::String(s.to_owned()));
        match name {
            "skin" => text(&self.skin),
            "skin_url" => text(&self.skin_url),
            "content_css" => text(&self.content_css),
            "content_css_url" => text(&self.content_css_url),
            _ => self.extra.get(name).cloned(),
        }
    }
}

/// How the editor is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InlineMode {
    /// Boxed editor replacing a textarea.
    #[default]
    Regular,
    /// Editable block, grows with content.
    Inline,
    /// Editable block with a fixed height.
    InlineFixed,
}

impl InlineMode {
    pub fn is_inline(self) -> bool {
        self != InlineMode::Regular
    }

    pub fn as_int(self) -> u8 {
        match self {
            InlineMode::Regular => 0,
            InlineMode::Inline => 1,
            InlineMode::InlineFixed => 2,
        }
    }

    pub fn from_int(value: u64) -> Self {
        match value {
            0 => InlineMode::Regular,
            1 => InlineMode::Inline,
            _ => InlineMode::InlineFixed,
        }
    }
}

impl Serialize for InlineMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_int())
    }
}

impl<'de> Deserialize<'de> for InlineMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::from_int(u64::deserialize(deserializer)?))
    }
}

/// Per-field configuration.
///
/// Editor option values set on the field (`toolbar`, `plugins`, `height`,
/// ...) live in `values`; call [`FieldSettings::normalize`] after loading
/// them from untrusted JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldSettings {
    /// Field name, used as the configuration name by default.
    pub name: String,
    /// Explicit configuration name. `None` and `default` mean "use the field
    /// name"; an empty string disables named configuration.
    pub config_name: Option<String>,
    pub inline_mode: InlineMode,
    pub features: FeatureSet,
    pub toggles: MarkupToggles,
    /// Allowed headline tags, e.g. `h2`.
    pub headlines: Vec<String>,
    /// Settings file, relative to the site root.
    pub settings_file: String,
    pub settings_json: String,
    pub style_formats_css: String,
    /// Extra plugin files enabled for this field, root-relative.
    pub ext_plugins: Vec<String>,
    pub readonly: bool,
    #[serde(flatten)]
    pub values: Settings,
}

impl Default for FieldSettings {
    fn default() -> Self {
        Self {
            name: String::new(),
            config_name: None,
            inline_mode: InlineMode::Regular,
            features: FeatureSet::field_default(),
            toggles: MarkupToggles::default(),
            headlines: ["h1", "h2", "h3", "h4", "h5", "h6"]
                .into_iter()
                .map(str::to_owned)
                .collect(),
            settings_file: String::new(),
            settings_json: String::new(),
            style_formats_css: String::new(),
            ext_plugins: Vec::new(),
            readonly: false,
            values: Settings::new(),
        }
    }
}

impl FieldSettings {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set an editor option, sanitising name lists.
    ///
    /// A comma-separated toolbar is the legacy format and is ignored.
    pub fn set(&mut self, name: &str, value: Value) {
        let value = match (name, value) {
            ("toolbar", Value::String(s)) => match sanitize_toolbar(&s) {
                Some(clean) => Value::String(clean),
                None => return,
            },
            ("plugins" | "contextmenu" | "removed_menuitems", Value::String(s)) => {
                Value::String(sanitize_names(&s))
            }
            (_, value) => value,
        };
        self.values.insert(name.to_owned(), value);
    }

    /// Re-apply [`FieldSettings::set`] to every stored option.
    pub fn normalize(&mut self) {
        let values = std::mem::take(&mut self.values);
        for (name, value) in values {
            self.set(&name, value);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn get_str(&self, name: &str) -> &str {
        self.get(name).and_then(Value::as_str).unwrap_or_default()
    }

    /// Is the feature active? Inline follows the inline mode.
    pub fn uses(&self, feature: FeatureSet) -> bool {
        if feature == FeatureSet::INLINE {
            return self.inline_mode.is_inline();
        }
        self.features.contains(feature)
    }

    /// Effective configuration name for the client registry.
    pub fn effective_config_name(&self) -> Option<String> {
        match self.config_name.as_deref() {
            None | Some("default") if !self.name.is_empty() => Some(self.name.clone()),
            None | Some("default") | Some("") => None,
            Some(name) => Some(name.to_owned()),
        }
    }
}

/// Alignment classes substituted into the defaults template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignClasses {
    pub left: String,
    pub center: String,
    pub right: String,
    pub full: String,
}

impl Default for AlignClasses {
    fn default() -> Self {
        Self {
            left: "align_left".to_owned(),
            center: "align_center".to_owned(),
            right: "align_right".to_owned(),
            full: "align_full".to_owned(),
        }
    }
}

/// Active site language.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageContext {
    pub id: u64,
    pub name: String,
    pub is_default: bool,
    /// Locale string such as `de_DE.UTF-8`, or `C`.
    pub locale: String,
    /// Language code offered by the admin theme translation.
    pub admin_code: Option<String>,
}

/// Site-level facts the resolver needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteContext {
    /// Root URL, always ending in `/`.
    pub root_url: String,
    /// Filesystem root matching `root_url`.
    pub root_path: PathBuf,
    /// Module URL relative to the root URL, e.g. `/site/modules/mcefield/`.
    pub module_url: String,
    /// Module directory on disk.
    pub module_path: PathBuf,
    /// Admin URL, e.g. `/processwire/`.
    pub admin_url: String,
    /// `ltr` or `rtl` for the active locale.
    pub direction: String,
    pub language: Option<LanguageContext>,
    /// Configured alignment classes; unset ones fall back to defaults.
    pub align: Option<AlignClasses>,
    /// Newline-separated link class options offered by the link dialog.
    pub link_class_options: String,
    /// Newline-separated link target options.
    pub link_target_options: String,
    /// An admin theme is active and accepts head markup.
    pub admin_theme: bool,
    pub debug: bool,
}

impl Default for SiteContext {
    fn default() -> Self {
        Self {
            root_url: "/".to_owned(),
            root_path: PathBuf::from("."),
            module_url: "/site/modules/mcefield/".to_owned(),
            module_path: PathBuf::from("site/modules/mcefield"),
            admin_url: "/processwire/".to_owned(),
            direction: "ltr".to_owned(),
            language: None,
            align: None,
            link_class_options: String::new(),
            link_target_options: "_blank".to_owned(),
            admin_theme: true,
            debug: false,
        }
    }
}

impl SiteContext {
    /// Prefix a root-relative path with the root URL.
    pub fn root_absolute(&self, path: &str) -> String {
        format!("{}{}", self.root_url, path.trim_start_matches('/'))
    }

    /// Module URL including the root URL.
    pub fn module_full_url(&self) -> String {
        self.root_absolute(&self.module_url)
    }

    /// Key identifying this site in process-wide caches.
    pub fn cache_key(&self) -> String {
        format!("{}|{}", self.root_url, self.module_url)
    }
}

/// The page a field is rendered for.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PageContext {
    pub page_id: Option<u64>,
    /// First image field on the page's template accepting unlimited files.
    pub image_field: Option<String>,
    /// The page being rendered uses the admin template.
    pub admin_template: bool,
}

/// Loads configuration structs from `.json` files.
pub struct SettingsLoader {
    path: PathBuf,
}

impl SettingsLoader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Load and decode the file.
    pub fn load<T: DeserializeOwned>(&self) -> Result<T> {
        let property = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let map = read_settings_file(&self.path, &property)?;
        serde_json::from_value(Value::Object(map)).into_diagnostic()
    }

    pub fn module(&self) -> Result<ModuleSettings> {
        self.load()
    }

    pub fn field(&self) -> Result<FieldSettings> {
        let mut field: FieldSettings = self.load()?;
        field.normalize();
        Ok(field)
    }

    pub fn site(&self) -> Result<SiteContext> {
        self.load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn config_name_falls_back_to_field_name() {
        let mut field = FieldSettings::new("body");
        assert_eq!(field.effective_config_name().as_deref(), Some("body"));
        field.config_name = Some("default".into());
        assert_eq!(field.effective_config_name().as_deref(), Some("body"));
        field.config_name = Some("shared".into());
        assert_eq!(field.effective_config_name().as_deref(), Some("shared"));
        field.config_name = Some(String::new());
        assert_eq!(field.effective_config_name(), None);
    }

    #[test]
    fn set_sanitizes_name_lists() {
        let mut field = FieldSettings::new("body");
        field.set("toolbar", json!("bold  italic | <b>"));
        field.set("plugins", json!("lists\nlink"));
        field.set("toolbar", json!("Bold, Italic"));

        assert_eq!(field.get_str("toolbar"), "bold italic |");
        assert_eq!(field.get_str("plugins"), "lists link");
    }

    #[test]
    fn loads_field_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("body.json");
        std::fs::write(
            &path,
            r#"{
                "name": "body",
                "inline_mode": 2,
                "features": ["toolbar", "imgResize"],
                "toolbar": "bold\titalic",
                "height": 300
            }"#,
        )
        .unwrap();

        let field = SettingsLoader::new(&path).field().unwrap();
        assert_eq!(field.inline_mode, InlineMode::InlineFixed);
        assert!(field.uses(FeatureSet::INLINE));
        assert!(field.uses(FeatureSet::IMG_RESIZE));
        assert!(!field.uses(FeatureSet::MENUBAR));
        assert_eq!(field.get_str("toolbar"), "bold italic");
        assert_eq!(field.get("height"), Some(&json!(300)));
    }

    #[test]
    fn module_lang_overrides() {
        let module: ModuleSettings = serde_json::from_value(json!({
            "skin": "oxide-dark",
            "lang_german": "de"
        }))
        .unwrap();
        assert_eq!(module.skin, "oxide-dark");
        assert_eq!(module.content_css, "wire");
        assert_eq!(module.lang_override("german"), Some("de"));
        assert_eq!(module.lang_override("french"), None);
    }
}
