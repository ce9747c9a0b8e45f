//! JSON settings decoding.
//!
//! Settings arrive as inline JSON (module or field configuration) or as
//! `.json` files. Both paths share the same rules: blank input is an empty
//! mapping, anything that fails to decode is logged and treated as empty.

use std::path::Path;

use serde_json::Value;

use crate::error::{FieldError, ParseError};

/// Ordered mapping of editor option name to value.
pub type Settings = serde_json::Map<String, Value>;

/// Parse a JSON object into settings.
///
/// Blank input and an empty JSON array both decode to an empty mapping.
pub fn parse_settings(json: &str, property: &str) -> crate::Result<Settings> {
    let json = json.trim();
    if json.is_empty() {
        return Ok(Settings::new());
    }
    let value: Value =
        serde_json::from_str(json).map_err(|e| ParseError::json(e, property, json))?;
    match value {
        Value::Object(map) => Ok(map),
        Value::Array(items) if items.is_empty() => Ok(Settings::new()),
        _ => Err(FieldError::NotAnObject {
            property: property.to_owned(),
        }),
    }
}

/// Read and parse a `.json` settings file.
pub fn read_settings_file(path: impl AsRef<Path>, property: &str) -> crate::Result<Settings> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(FieldError::MissingFile {
            property: property.to_owned(),
            path: path.to_path_buf(),
        });
    }
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => {}
        _ => {
            return Err(FieldError::BadExtension {
                property: property.to_owned(),
                path: path.to_path_buf(),
            });
        }
    }
    let json = std::fs::read_to_string(path)?;
    parse_settings(&json, property)
}

/// Like [`parse_settings`], but logs failures and falls back to an empty mapping.
pub fn decode_settings(json: &str, property: &str) -> Settings {
    parse_settings(json, property).unwrap_or_else(|err| {
        tracing::warn!(property, error = %err, "ignoring invalid settings JSON");
        Settings::new()
    })
}

/// Like [`read_settings_file`], but logs failures and falls back to an empty mapping.
pub fn decode_settings_file(path: impl AsRef<Path>, property: &str) -> Settings {
    read_settings_file(path, property).unwrap_or_else(|err| {
        tracing::warn!(property, error = %err, "ignoring settings file");
        Settings::new()
    })
}

/// Shallow merge: keys in `over` replace keys in `base`.
pub fn merge_settings(base: &mut Settings, over: Settings) {
    for (key, value) in over {
        base.insert(key, value);
    }
}

/// Shallow merge into a clone of `base`.
pub fn merged(base: &Settings, over: &Settings) -> Settings {
    let mut out = base.clone();
    merge_settings(&mut out, over.clone());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn blank_and_empty_array_are_empty() {
        assert!(parse_settings("   ", "settingsJSON").unwrap().is_empty());
        assert!(parse_settings("[]", "settingsJSON").unwrap().is_empty());
    }

    #[test]
    fn scalar_is_not_an_object() {
        let err = parse_settings("42", "settingsJSON").unwrap_err();
        assert!(matches!(err, FieldError::NotAnObject { .. }));
    }

    #[test]
    fn invalid_json_falls_back_to_empty() {
        assert!(decode_settings("{height: 100}", "settingsJSON").is_empty());
    }

    #[test]
    fn reads_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, r#"{{"height": 250, "add_toolbar": "code"}}"#).unwrap();

        let settings = read_settings_file(&path, "settingsFile").unwrap();
        assert_eq!(settings.get("height"), Some(&json!(250)));
        assert_eq!(settings.get("add_toolbar"), Some(&json!("code")));
    }

    #[test]
    fn rejects_missing_and_wrong_extension() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(matches!(
            read_settings_file(&missing, "settingsFile"),
            Err(FieldError::MissingFile { .. })
        ));

        let txt = dir.path().join("custom.txt");
        std::fs::write(&txt, "{}").unwrap();
        assert!(matches!(
            read_settings_file(&txt, "settingsFile"),
            Err(FieldError::BadExtension { .. })
        ));
        assert!(decode_settings_file(&txt, "settingsFile").is_empty());
    }

    #[test]
    fn merge_is_shallow_and_ordered() {
        let mut base = parse_settings(r#"{"a": 1, "b": {"x": 1}}"#, "t").unwrap();
        let over = parse_settings(r#"{"b": {"y": 2}, "c": 3}"#, "t").unwrap();
        merge_settings(&mut base, over);

        assert_eq!(Value::Object(base), json!({"a": 1, "b": {"y": 2}, "c": 3}));
    }
}
