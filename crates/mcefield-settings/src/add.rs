//! `add_<name>` directives from settings files and settings JSON.
//!
//! A plain key replaces the setting. An `add_` key appends to the value the
//! setting already has (in the resolved settings, else in the defaults):
//! strings are joined with a space, lists and mappings gain the new entries.

use serde_json::{Map, Value};

use mcefield_common::Settings;

use crate::formats::merge_style_format_values;

const ADD_PREFIX: &str = "add_";

fn is_index(key: &str) -> bool {
    !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit())
}

fn next_index(map: &Map<String, Value>) -> usize {
    map.keys()
        .filter_map(|key| key.parse::<usize>().ok())
        .map(|index| index + 1)
        .max()
        .unwrap_or(0)
}

fn list_to_map(items: Vec<Value>) -> Map<String, Value> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, value)| (index.to_string(), value))
        .collect()
}

/// Append into a mapping: index keys append, other keys overwrite.
fn append_entries(map: &mut Map<String, Value>, entries: Vec<(String, Value)>) {
    for (key, value) in entries {
        if is_index(&key) {
            let index = next_index(map);
            map.insert(index.to_string(), value);
        } else {
            map.insert(key, value);
        }
    }
}

/// Combine an existing value with an `add_` value.
pub fn append_value(value: Value, add: Value) -> Value {
    match (value, add) {
        (Value::String(mut base), Value::String(more)) => {
            base.push(' ');
            base.push_str(&more);
            Value::String(base)
        }
        (Value::Array(mut base), Value::Array(more)) => {
            base.extend(more);
            Value::Array(base)
        }
        (Value::Array(mut base), Value::Object(more)) if more.keys().all(|k| is_index(k)) => {
            base.extend(more.into_iter().map(|(_, v)| v));
            Value::Array(base)
        }
        (Value::Array(base), Value::Object(more)) => {
            let mut map = list_to_map(base);
            append_entries(&mut map, more.into_iter().collect());
            Value::Object(map)
        }
        (Value::Object(mut base), Value::Array(more)) => {
            let entries = more.into_iter().map(|v| ("0".to_owned(), v)).collect();
            append_entries(&mut base, entries);
            Value::Object(base)
        }
        (Value::Object(mut base), Value::Object(more)) => {
            append_entries(&mut base, more.into_iter().collect());
            Value::Object(base)
        }
        (_, add) => add,
    }
}

/// Apply `add` to `settings`.
///
/// `add_style_formats` merges into the style-format tree by title. Other
/// `add_<name>` keys append to `<name>`; when neither `settings` nor
/// `defaults` has `<name>` the directive becomes a plain `<name>` setting.
/// Everything is then merged over `settings`.
pub fn apply_add_settings(settings: &mut Settings, mut add: Settings, defaults: &Settings) {
    if let Some(formats) = add.shift_remove("add_style_formats") {
        let existing = settings
            .get("style_formats")
            .or_else(|| defaults.get("style_formats"))
            .cloned()
            .unwrap_or(Value::Array(Vec::new()));
        settings.insert(
            "style_formats".to_owned(),
            merge_style_format_values(&existing, &formats),
        );
    }

    let keys: Vec<String> = add
        .keys()
        .filter(|key| key.starts_with(ADD_PREFIX))
        .cloned()
        .collect();
    for key in keys {
        let Some(add_value) = add.shift_remove(&key) else {
            continue;
        };
        let name = &key[ADD_PREFIX.len()..];
        let value = match settings.get(name).or_else(|| defaults.get(name)) {
            Some(existing) => append_value(existing.clone(), add_value),
            None => add_value,
        };
        tracing::debug!(setting = name, "applied add-setting");
        add.insert(name.to_owned(), value);
    }

    mcefield_common::merge_settings(settings, add);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings(value: Value) -> Settings {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn strings_append_with_a_space() {
        let defaults = settings(json!({"toolbar": "bold italic"}));
        let mut resolved = Settings::new();
        apply_add_settings(&mut resolved, settings(json!({"add_toolbar": "underline"})), &defaults);
        assert_eq!(resolved["toolbar"], json!("bold italic underline"));
    }

    #[test]
    fn resolved_value_takes_precedence_over_default() {
        let defaults = settings(json!({"plugins": "lists"}));
        let mut resolved = settings(json!({"plugins": "lists table"}));
        apply_add_settings(&mut resolved, settings(json!({"add_plugins": "code"})), &defaults);
        assert_eq!(resolved["plugins"], json!("lists table code"));
    }

    #[test]
    fn index_keys_append_and_named_keys_overwrite() {
        let defaults = settings(json!({
            "list": ["a", "b"],
            "map": {"alignleft": "L", "custom": "C"}
        }));
        let mut resolved = Settings::new();
        apply_add_settings(
            &mut resolved,
            settings(json!({
                "add_list": ["c"],
                "add_map": {"custom": "C2", "0": "N"}
            })),
            &defaults,
        );
        assert_eq!(resolved["list"], json!(["a", "b", "c"]));
        assert_eq!(
            resolved["map"],
            json!({"alignleft": "L", "custom": "C2", "0": "N"})
        );
        assert_eq!(
            append_value(json!(["a"]), json!({"k": "v"})),
            json!({"0": "a", "k": "v"})
        );
    }

    #[test]
    fn unknown_base_becomes_plain_setting() {
        let mut resolved = Settings::new();
        apply_add_settings(
            &mut resolved,
            settings(json!({"add_paste_as_text": true, "height": 300})),
            &Settings::new(),
        );
        assert_eq!(Value::Object(resolved), json!({"height": 300, "paste_as_text": true}));
    }

    #[test]
    fn add_style_formats_merges_by_title() {
        let defaults = settings(json!({
            "style_formats": [{"title": "Blocks", "items": [{"title": "Paragraph", "format": "p"}]}]
        }));
        let mut resolved = Settings::new();
        apply_add_settings(
            &mut resolved,
            settings(json!({
                "add_style_formats": [
                    {"title": "Blocks", "items": [{"title": "Note", "block": "aside"}]},
                    {"title": "Marker", "inline": "mark"}
                ]
            })),
            &defaults,
        );
        assert_eq!(
            resolved["style_formats"],
            json!([
                {"title": "Blocks", "items": [
                    {"title": "Paragraph", "format": "p"},
                    {"title": "Note", "block": "aside"}
                ]},
                {"title": "Marker", "inline": "mark"}
            ])
        );
    }
}
