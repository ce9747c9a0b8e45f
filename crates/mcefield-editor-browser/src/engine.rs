//! Bindings to the editing engine global (`tinymce`).
//!
//! Only the handful of calls the runtime makes are bound. Lookups go through
//! `catch` imports so a page without the engine loaded logs instead of
//! throwing.

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(catch, js_namespace = tinymce, js_name = init)]
    fn engine_init(settings: &JsValue) -> Result<js_sys::Promise, JsValue>;

    #[wasm_bindgen(catch, js_namespace = tinymce, js_name = get)]
    fn engine_get(id: &str) -> Result<JsValue, JsValue>;

    /// A constructed editor instance.
    #[derive(Debug, Clone)]
    pub type EngineEditor;

    #[wasm_bindgen(method, getter)]
    pub fn id(this: &EngineEditor) -> String;

    #[wasm_bindgen(method)]
    pub fn on(this: &EngineEditor, name: &str, callback: &js_sys::Function);

    #[wasm_bindgen(method)]
    pub fn off(this: &EngineEditor, name: &str, callback: &js_sys::Function);

    #[wasm_bindgen(method)]
    pub fn destroy(this: &EngineEditor);

    #[wasm_bindgen(method, js_name = getBody)]
    pub fn body(this: &EngineEditor) -> Option<web_sys::HtmlElement>;

    #[wasm_bindgen(method, getter)]
    pub fn selection(this: &EngineEditor) -> EngineSelection;

    #[wasm_bindgen(method, getter)]
    pub fn dom(this: &EngineEditor) -> EngineDom;

    #[derive(Debug, Clone)]
    pub type EngineSelection;

    #[wasm_bindgen(method, js_name = getNode)]
    pub fn node(this: &EngineSelection) -> Option<web_sys::Element>;

    #[derive(Debug, Clone)]
    pub type EngineDom;

    #[wasm_bindgen(method, js_name = setAttrib)]
    pub fn set_attrib(this: &EngineDom, element: &web_sys::Element, name: &str, value: &str);

    /// Payload of an engine notification (`ExecCommand`, `ObjectResized`, ...).
    #[derive(Debug, Clone)]
    pub type EngineEvent;

    #[wasm_bindgen(method, getter)]
    pub fn command(this: &EngineEvent) -> Option<String>;

    #[wasm_bindgen(method, getter)]
    pub fn value(this: &EngineEvent) -> JsValue;

    #[wasm_bindgen(method, getter)]
    pub fn target(this: &EngineEvent) -> Option<web_sys::Element>;

    #[wasm_bindgen(method, getter)]
    pub fn width(this: &EngineEvent) -> Option<f64>;

    /// Image handed to the upload handler.
    #[derive(Debug, Clone)]
    pub type BlobInfo;

    #[wasm_bindgen(method)]
    pub fn filename(this: &BlobInfo) -> String;

    #[wasm_bindgen(method)]
    pub fn blob(this: &BlobInfo) -> web_sys::Blob;
}

/// Start constructing editors for a settings object.
pub fn init(settings: &JsValue) -> Result<js_sys::Promise, JsValue> {
    engine_init(settings)
}

/// The live editor for an element id, if any.
pub fn get(id: &str) -> Option<EngineEditor> {
    match engine_get(id) {
        Ok(value) if !value.is_null() && !value.is_undefined() => Some(value.unchecked_into()),
        Ok(_) => None,
        Err(err) => {
            tracing::warn!(id, error = ?err, "editing engine is not available");
            None
        }
    }
}
