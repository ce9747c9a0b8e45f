//! Client-side configuration: the page bootstrap payload and the per-wrapper
//! attributes, merged into the settings an engine is created with.

use serde::Deserialize;
use serde_json::Value;

use mcefield_common::{FeatureSet, Settings, decode_settings, is_truthy};

use crate::upload::UploadTarget;

/// Page bootstrap payload produced by the server.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Bootstrap {
    /// `default` plus one entry per registered configuration name.
    pub settings: Settings,
    pub labels: Settings,
    pub pwlink: Settings,
    pub debug: bool,
    /// Admin URL, used for upload and resize endpoints.
    #[serde(rename = "adminUrl")]
    pub admin_url: String,
}

impl Bootstrap {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn named(&self, name: &str) -> Option<&Settings> {
        self.settings.get(name).and_then(Value::as_object)
    }
}

/// Attributes read from a field wrapper.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WrapperData {
    pub config_name: String,
    /// Raw `data-settings` JSON.
    pub settings: Option<String>,
    pub features: FeatureSet,
    pub upload_page: Option<u64>,
    pub upload_field: Option<String>,
}

impl WrapperData {
    /// Where uploads go, when the upload feature is on and the wrapper names
    /// a page and image field.
    pub fn upload_target(&self) -> Option<UploadTarget> {
        if !self.features.contains(FeatureSet::IMG_UPLOAD) {
            return None;
        }
        match (self.upload_page, &self.upload_field) {
            (Some(page_id), Some(field)) if !field.is_empty() => Some(UploadTarget {
                page_id,
                field: field.clone(),
            }),
            _ => None,
        }
    }
}

/// Engine settings for one element: defaults, then the named configuration,
/// then the wrapper's own settings. Later sources win per key.
pub fn merge_config(bootstrap: &Bootstrap, data: &WrapperData) -> Settings {
    let mut settings = bootstrap.named("default").cloned().unwrap_or_default();

    match bootstrap.named(&data.config_name) {
        Some(named) => {
            for (key, value) in named {
                settings.insert(key.clone(), value.clone());
            }
        }
        None => {
            tracing::debug!(config = %data.config_name, "no registered settings for config name");
        }
    }

    if let Some(json) = data.settings.as_deref()
        && json.len() > 2
    {
        for (key, value) in decode_settings(json, "data-settings") {
            settings.insert(key, value);
        }
    }

    // Inline editors load their content CSS with the page.
    if settings.get("inline").is_some_and(is_truthy) {
        settings.insert("content_css".to_owned(), Value::Null);
    }

    settings
}
