//! Fetch a resized image variant from the server.

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::Response;

use mcefield_editor_core::ResizeResponse;

fn describe(value: JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

/// GET the resize URL and decode `{src, width, height}`.
pub async fn fetch_resize(url: &str) -> Result<ResizeResponse, String> {
    let window = web_sys::window().ok_or_else(|| "no window".to_owned())?;
    let response: Response = JsFuture::from(window.fetch_with_str(url))
        .await
        .map_err(describe)?
        .dyn_into()
        .map_err(describe)?;
    if !response.ok() {
        return Err(format!("HTTP Error: {}", response.status()));
    }
    let text = JsFuture::from(response.text().map_err(describe)?)
        .await
        .map_err(describe)?
        .as_string()
        .unwrap_or_default();
    serde_json::from_str(&text).map_err(|err| format!("{err}: {text}"))
}
