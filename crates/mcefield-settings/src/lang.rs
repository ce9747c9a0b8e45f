//! Editor language pack selection.

use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

use mcefield_common::Settings;

use crate::cache::SettingsCache;
use crate::config::{LanguageContext, ModuleSettings, SiteContext};

pub const DEFAULT_PACK: &str = "en_US";

/// Answers whether a language pack is installed.
pub trait PackIndex {
    fn has_pack(&self, code: &str) -> bool;
}

/// A module directory with packs under `langs/<code>.js`.
impl PackIndex for Path {
    fn has_pack(&self, code: &str) -> bool {
        !code.is_empty() && self.join("langs").join(format!("{code}.js")).is_file()
    }
}

impl PackIndex for [&str] {
    fn has_pack(&self, code: &str) -> bool {
        self.iter().any(|pack| *pack == code)
    }
}

/// Pick the language pack code for the active language.
pub fn pack_code(
    language: Option<&LanguageContext>,
    module: &ModuleSettings,
    packs: &(impl PackIndex + ?Sized),
) -> String {
    let Some(language) = language else {
        return DEFAULT_PACK.to_owned();
    };

    if let Some(code) = module.lang_override(&language.name) {
        return code.to_owned();
    }

    if !language.is_default && packs.has_pack(&language.name) {
        return language.name.clone();
    }

    if let Some(code) = language.admin_code.as_deref()
        && code != "en"
        && packs.has_pack(code)
    {
        return code.to_owned();
    }

    if language.locale != "C" {
        let locale = language
            .locale
            .split_once('.')
            .map_or(language.locale.as_str(), |(head, _)| head);
        if packs.has_pack(locale) {
            return locale.to_owned();
        }
        if let Some((short, _)) = locale.split_once('_')
            && packs.has_pack(short)
        {
            return short.to_owned();
        }
    }

    DEFAULT_PACK.to_owned()
}

/// Settings added to the defaults for the active language pack.
pub fn language_settings(
    site: &SiteContext,
    module: &ModuleSettings,
    packs: &(impl PackIndex + ?Sized),
    cache: &SettingsCache,
) -> Arc<Settings> {
    let Some(language) = site.language.as_ref() else {
        return Arc::new(Settings::new());
    };
    let key = format!("{}#{}", site.cache_key(), language.id);
    cache.lang_settings(&key, || {
        let code = pack_code(Some(language), module, packs);
        let mut settings = Settings::new();
        if code != DEFAULT_PACK {
            tracing::debug!(code = %code, language = %language.name, "using language pack");
            let url = format!("{}langs/{code}.js", site.module_full_url());
            settings.insert("language".to_owned(), Value::String(code));
            settings.insert("language_url".to_owned(), Value::String(url));
        }
        settings
    })
}
