//! Bootstrap payload embedded in the page.

use js_sys::Reflect;
use serde::Deserialize;
use wasm_bindgen::prelude::*;

use mcefield_editor_browser::Bootstrap;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Urls {
    admin: String,
}

fn lookup(path: &[&str]) -> Option<JsValue> {
    let mut value: JsValue = js_sys::global().into();
    for key in path {
        value = Reflect::get(&value, &JsValue::from_str(key)).ok()?;
        if value.is_undefined() || value.is_null() {
            return None;
        }
    }
    Some(value)
}

/// Decode a bootstrap payload from a JS object.
pub fn decode(value: JsValue) -> Result<Bootstrap, serde_wasm_bindgen::Error> {
    serde_wasm_bindgen::from_value(value)
}

/// Read `ProcessWire.config.InputfieldTinyMCE`, taking the admin URL from
/// `ProcessWire.config.urls` when the payload does not carry one.
pub fn read_bootstrap() -> Bootstrap {
    let mut bootstrap = match lookup(&["ProcessWire", "config", "InputfieldTinyMCE"]).map(decode) {
        Some(Ok(bootstrap)) => bootstrap,
        Some(Err(err)) => {
            tracing::warn!(error = %err, "invalid editor bootstrap payload");
            Bootstrap::default()
        }
        None => {
            tracing::debug!("no editor bootstrap payload on the page");
            Bootstrap::default()
        }
    };

    if bootstrap.admin_url.is_empty()
        && let Some(urls) = lookup(&["ProcessWire", "config", "urls"])
    {
        let urls: Urls = serde_wasm_bindgen::from_value(urls).unwrap_or_default();
        bootstrap.admin_url = urls.admin;
    }
    bootstrap
}
