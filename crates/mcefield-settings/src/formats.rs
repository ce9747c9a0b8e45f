//! Style-format menu entries and the title-based merge.

use mcefield_common::Settings;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry of the editor's `style_formats` menu.
///
/// Either a submenu (`title` + `items`) or a leaf matching an element by
/// `inline`, `block` or `selector`. Keys the editor understands but this type
/// does not model (`format`, `attributes`, ...) pass through in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleFormat {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<StyleFormat>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub styles: Option<Settings>,
    #[serde(flatten)]
    pub extra: Settings,
}

impl StyleFormat {
    pub fn submenu(title: impl Into<String>, items: Vec<StyleFormat>) -> Self {
        Self {
            title: Some(title.into()),
            items: Some(items),
            ..Default::default()
        }
    }

    pub fn is_submenu(&self) -> bool {
        self.items.is_some()
    }

    fn title(&self) -> Option<&str> {
        self.title.as_deref().filter(|t| !t.is_empty())
    }
}

/// Decode a `style_formats` value, dropping entries that are not objects.
pub fn formats_from_value(value: &Value) -> Vec<StyleFormat> {
    let Value::Array(entries) = value else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| match serde_json::from_value(entry.clone()) {
            Ok(format) => Some(format),
            Err(err) => {
                tracing::debug!(error = %err, "skipping malformed style format");
                None
            }
        })
        .collect()
}

pub fn formats_to_value(formats: &[StyleFormat]) -> Value {
    serde_json::to_value(formats).unwrap_or(Value::Array(Vec::new()))
}

/// Merge `add` into `existing` by title.
///
/// Titles are unique afterwards. Two submenus with the same title union their
/// items, existing first. Any other collision replaces the existing entry in
/// place. New titles append. Untitled entries are dropped.
pub fn merge_style_formats(existing: Vec<StyleFormat>, add: Vec<StyleFormat>) -> Vec<StyleFormat> {
    let mut merged: Vec<StyleFormat> = Vec::with_capacity(existing.len() + add.len());

    let mut upsert = |format: StyleFormat, union: bool| {
        let Some(title) = format.title().map(str::to_owned) else {
            return;
        };
        match merged
            .iter_mut()
            .find(|f| f.title.as_deref() == Some(title.as_str()))
        {
            Some(slot) if union && slot.is_submenu() && format.is_submenu() => {
                if let (Some(items), Some(more)) = (slot.items.as_mut(), format.items) {
                    items.extend(more);
                }
            }
            Some(slot) => *slot = format,
            None => merged.push(format),
        }
    };

    for format in existing {
        upsert(format, false);
    }
    for format in add {
        upsert(format, true);
    }
    merged
}

/// [`merge_style_formats`] over raw `style_formats` values.
pub fn merge_style_format_values(existing: &Value, add: &Value) -> Value {
    formats_to_value(&merge_style_formats(
        formats_from_value(existing),
        formats_from_value(add),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn leaf(title: &str, inline: &str) -> StyleFormat {
        StyleFormat {
            title: Some(title.into()),
            inline: Some(inline.into()),
            ..Default::default()
        }
    }

    #[test]
    fn same_title_submenus_union_items() {
        let existing = vec![StyleFormat::submenu("A", vec![leaf("y", "span")])];
        let add = vec![StyleFormat::submenu("A", vec![leaf("x", "em")])];

        let merged = merge_style_formats(existing, add);
        assert_eq!(merged.len(), 1);
        let titles: Vec<_> = merged[0]
            .items
            .iter()
            .flatten()
            .filter_map(|f| f.title.as_deref())
            .collect();
        assert_eq!(titles, ["y", "x"]);
    }

    #[test]
    fn new_titles_append_and_collisions_replace() {
        let existing = vec![leaf("Red", "span"), leaf("Blue", "span")];
        let add = vec![leaf("Red", "strong"), leaf("Green", "em")];

        let merged = merge_style_formats(existing, add);
        let summary: Vec<_> = merged
            .iter()
            .map(|f| (f.title.clone().unwrap(), f.inline.clone().unwrap()))
            .collect();
        assert_eq!(
            summary,
            [
                ("Red".to_owned(), "strong".to_owned()),
                ("Blue".to_owned(), "span".to_owned()),
                ("Green".to_owned(), "em".to_owned()),
            ]
        );
    }

    #[test]
    fn untitled_entries_are_dropped() {
        let merged = merge_style_format_values(
            &json!([{"title": "Keep", "inline": "b"}, {"inline": "i"}]),
            &json!([{"title": "", "block": "p"}, "junk"]),
        );
        assert_eq!(merged, json!([{"title": "Keep", "inline": "b"}]));
    }

    #[test]
    fn extra_keys_pass_through() {
        let formats = formats_from_value(&json!([
            {"title": "Heading 1", "format": "h1"}
        ]));
        assert_eq!(formats[0].extra.get("format"), Some(&json!("h1")));
        assert_eq!(
            formats_to_value(&formats),
            json!([{"title": "Heading 1", "format": "h1"}])
        );
    }
}
