//! Cleaning of submitted editor markup.

use bitflags::bitflags;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::LazyLock;

use mcefield_common::FeatureSet;

use crate::config::FieldSettings;
use crate::names::has_name;

bitflags! {
    /// Markup cleaning toggles, stored as their integer values.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MarkupToggles: u8 {
        /// Convert `<div>` to `<p>`.
        const CLEAN_DIV = 2;
        /// Remove empty paragraphs.
        const CLEAN_P = 4;
        /// Convert non-breaking spaces to regular spaces.
        const CLEAN_NBSP = 8;
    }
}

impl Default for MarkupToggles {
    fn default() -> Self {
        Self::all()
    }
}

impl Serialize for MarkupToggles {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter().map(|flag| flag.bits()))
    }
}

impl<'de> Deserialize<'de> for MarkupToggles {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let values = Vec::<u8>::deserialize(deserializer)?;
        Ok(values
            .into_iter()
            .fold(Self::empty(), |acc, bits| acc | Self::from_bits_truncate(bits)))
    }
}

/// Options passed to the purifier for one value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurifyOptions {
    /// Link targets the purifier keeps, e.g. `_blank`.
    pub allowed_frame_targets: Vec<String>,
    /// Keep `id` attributes; needed by the anchor tool.
    pub enable_id: bool,
}

/// HTML sanitizer applied to submitted markup when the `purifier` feature is
/// active.
pub trait Purifier {
    fn purify(&self, html: &str, options: &PurifyOptions) -> String;
}

/// Submitted form values.
pub trait InputData {
    fn value(&self, name: &str) -> Option<&str>;
}

impl InputData for std::collections::HashMap<String, String> {
    fn value(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

static DIV_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)\s*(</?)div[^><]*>\s*").expect("valid regex"));

/// Parse newline-separated link target options, dropping `+` default markers.
pub fn link_targets(options: &str) -> Vec<String> {
    options
        .lines()
        .map(|line| line.trim().trim_matches('+').to_owned())
        .filter(|line| !line.is_empty())
        .collect()
}

/// Clean a value sent to or from the editor.
pub fn purify_value(
    value: &str,
    field: &FieldSettings,
    purifier: Option<&dyn Purifier>,
    link_target_options: &str,
) -> String {
    let mut value = value.replace("\r\n", "\n").replace('\r', "\n");
    if value.is_empty() {
        return value;
    }

    if field.uses(FeatureSet::PURIFIER) {
        match purifier {
            Some(purifier) => {
                let options = PurifyOptions {
                    allowed_frame_targets: link_targets(link_target_options),
                    enable_id: has_name(field.get_str("toolbar"), "anchor"),
                };
                value = purifier.purify(&value, &options);
            }
            None => tracing::warn!(field = %field.name, "purifier feature active but no purifier available"),
        }
    }

    let mut value = apply_toggles(&value, field.toggles);
    value.retain(|c| c != '\u{2028}');
    value
}

/// Apply the markup cleaning toggles.
pub fn apply_toggles(value: &str, toggles: MarkupToggles) -> String {
    let mut value = value.to_owned();

    if toggles.contains(MarkupToggles::CLEAN_DIV) && value.contains("<div") {
        value = DIV_TAG.replace_all(&value, "${1}p>").into_owned();
        while value.contains("<p><p>") || value.contains("</p></p>") {
            value = value.replace("<p><p>", "<p>").replace("</p></p>", "</p>");
        }
    }

    if toggles.contains(MarkupToggles::CLEAN_P) {
        for empty in [
            "<p><br /></p>",
            "<p><br></p>",
            "<p>&nbsp;</p>",
            "<p>\u{a0}</p>",
            "<p></p>",
            "<p> </p>",
        ] {
            value = value.replace(empty, "");
        }
    }

    if toggles.contains(MarkupToggles::CLEAN_NBSP) {
        value = value
            .replace("&nbsp;", " ")
            .replace("&NBSP;", " ")
            .replace('\u{a0}', " ");
    }

    value
}

/// Accept a submitted value for the field.
///
/// Inline editors submit under `Inputfield_<name>`. Returns the cleaned value
/// only when it differs from `current` and the field is writable.
pub fn process_input(
    field: &FieldSettings,
    input: &impl InputData,
    current: &str,
    purifier: Option<&dyn Purifier>,
    link_target_options: &str,
) -> Option<String> {
    let key = if field.inline_mode.is_inline() {
        format!("Inputfield_{}", field.name)
    } else {
        field.name.clone()
    };
    let submitted = input.value(&key)?;
    if field.readonly || submitted == current {
        return None;
    }
    let cleaned = purify_value(submitted, field, purifier, link_target_options);
    (cleaned != current).then_some(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InlineMode;
    use std::collections::HashMap;

    struct StripScripts;

    impl Purifier for StripScripts {
        fn purify(&self, html: &str, options: &PurifyOptions) -> String {
            assert_eq!(options.allowed_frame_targets, ["_blank"]);
            html.replace("<script>x</script>", "")
        }
    }

    #[test]
    fn divs_become_paragraphs() {
        let out = apply_toggles(
            "<div class='x'>\n<div>one</div>\n</div>",
            MarkupToggles::CLEAN_DIV,
        );
        assert_eq!(out, "<p>one</p>");
    }

    #[test]
    fn empty_paragraphs_and_nbsp() {
        let out = apply_toggles(
            "<p>a&nbsp;b</p><p>&nbsp;</p><p></p>",
            MarkupToggles::CLEAN_P | MarkupToggles::CLEAN_NBSP,
        );
        assert_eq!(out, "<p>a b</p>");

        let untouched = apply_toggles("<div>x</div><p></p>", MarkupToggles::empty());
        assert_eq!(untouched, "<div>x</div><p></p>");
    }

    #[test]
    fn toggles_serialize_as_integers() {
        let json = serde_json::to_string(&MarkupToggles::default()).unwrap();
        assert_eq!(json, "[2,4,8]");
        let parsed: MarkupToggles = serde_json::from_str("[8, 2]").unwrap();
        assert_eq!(parsed, MarkupToggles::CLEAN_DIV | MarkupToggles::CLEAN_NBSP);
    }

    #[test]
    fn process_input_reads_inline_name_and_purifies() {
        let mut field = FieldSettings::new("body");
        field.inline_mode = InlineMode::Inline;
        let input = HashMap::from([(
            "Inputfield_body".to_owned(),
            "<p>hi</p>\r\n<script>x</script>\u{2028}".to_owned(),
        )]);

        let out = process_input(&field, &input, "", Some(&StripScripts), "_blank\n");
        assert_eq!(out.as_deref(), Some("<p>hi</p>\n"));
    }

    #[test]
    fn readonly_or_unchanged_input_is_ignored() {
        let mut field = FieldSettings::new("body");
        let input = HashMap::from([("body".to_owned(), "<p>same</p>".to_owned())]);
        assert_eq!(process_input(&field, &input, "<p>same</p>", None, ""), None);

        field.readonly = true;
        assert_eq!(process_input(&field, &input, "<p>old</p>", None, ""), None);
    }
}
