//! Page-scoped bootstrap payload shared by every editor on the page.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use mcefield_common::Settings;

/// Name under which the prepared defaults are registered.
pub const DEFAULT_CONFIG: &str = "default";

/// Translatable strings used by the image and link plugins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorLabels {
    pub select_image: String,
    pub edit_image: String,
    pub caption_text: String,
    pub saving_image: String,
    pub cancel: String,
    pub insert_image: String,
    pub select_another_image: String,
    pub insert_link: String,
    pub edit_link: String,
}

impl Default for EditorLabels {
    fn default() -> Self {
        Self {
            select_image: "Select image".to_owned(),
            edit_image: "Edit image".to_owned(),
            caption_text: "Your caption text here".to_owned(),
            saving_image: "Saving image".to_owned(),
            cancel: "Cancel".to_owned(),
            insert_image: "Insert image".to_owned(),
            select_another_image: "Select another".to_owned(),
            insert_link: "Insert link".to_owned(),
            edit_link: "Edit link".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkOptions {
    /// Comma-separated class names offered by the link dialog.
    pub class_options: String,
}

impl LinkOptions {
    /// Parse newline-separated options, dropping `+` markers.
    pub fn from_lines(lines: &str) -> Self {
        let class_options = lines
            .lines()
            .map(|line| line.trim_matches(|c| c == '+' || c == ' ' || c == '\t'))
            .filter(|option| !option.is_empty())
            .collect::<Vec<_>>()
            .join(",");
        Self { class_options }
    }
}

/// Named settings diffs plus the strings the client plugins need.
///
/// The first payload registered under a name wins for the whole page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigNameRegistry {
    pub settings: Settings,
    pub labels: EditorLabels,
    pub pwlink: LinkOptions,
    pub debug: bool,
}

impl ConfigNameRegistry {
    pub fn new(labels: EditorLabels, pwlink: LinkOptions, debug: bool) -> Self {
        Self {
            settings: Settings::new(),
            labels,
            pwlink,
            debug,
        }
    }

    /// Store `payload` under `name` unless the name is taken.
    /// Returns whether it was stored.
    pub fn register(&mut self, name: &str, payload: Settings) -> bool {
        if self.settings.contains_key(name) {
            tracing::debug!(config = name, "config name already registered");
            return false;
        }
        self.settings.insert(name.to_owned(), Value::Object(payload));
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.settings.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Settings> {
        self.settings.get(name).and_then(Value::as_object)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.settings.keys().map(String::as_str)
    }

    /// The bootstrap object consumed by the client.
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "settings": self.settings,
            "labels": self.labels,
            "pwlink": self.pwlink,
            "debug": self.debug,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Settings {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn first_registration_wins() {
        let mut registry = ConfigNameRegistry::default();
        assert!(registry.register(DEFAULT_CONFIG, payload(json!({"height": "500px"}))));
        assert!(registry.register("body", payload(json!({"toolbar": "bold"}))));
        assert!(!registry.register("body", payload(json!({"toolbar": "italic"}))));

        assert_eq!(registry.get("body").unwrap()["toolbar"], json!("bold"));
        assert_eq!(registry.names().collect::<Vec<_>>(), [DEFAULT_CONFIG, "body"]);
    }

    #[test]
    fn link_class_options_are_joined() {
        let options = LinkOptions::from_lines("+button\n external + \n\nnofollow");
        assert_eq!(options.class_options, "button,external,nofollow");
    }

    #[test]
    fn bootstrap_shape() {
        let mut registry =
            ConfigNameRegistry::new(EditorLabels::default(), LinkOptions::from_lines("btn"), true);
        registry.register(DEFAULT_CONFIG, Settings::new());

        insta::assert_snapshot!(serde_json::to_string_pretty(&registry.to_json()).unwrap(), @r#"
        {
          "settings": {
            "default": {}
          },
          "labels": {
            "selectImage": "Select image",
            "editImage": "Edit image",
            "captionText": "Your caption text here",
            "savingImage": "Saving image",
            "cancel": "Cancel",
            "insertImage": "Insert image",
            "selectAnotherImage": "Select another",
            "insertLink": "Insert link",
            "editLink": "Edit link"
          },
          "pwlink": {
            "classOptions": "btn"
          },
          "debug": true
        }
        "#);
    }
}
