//! Page-facing functions.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;

use mcefield_editor_browser::{Bootstrap, EditorState, ElementId, Runtime};

use crate::{logging, page};

thread_local! {
    static RUNTIME: RefCell<Option<Rc<Runtime>>> = const { RefCell::new(None) };
}

fn install(bootstrap: Bootstrap) -> Rc<Runtime> {
    logging::install(bootstrap.debug);
    let runtime = Runtime::new(bootstrap, gloo_utils::document());
    runtime.start();
    RUNTIME.with(|slot| *slot.borrow_mut() = Some(runtime.clone()));
    runtime
}

/// The page runtime, created from the page bootstrap on first use.
fn runtime() -> Rc<Runtime> {
    if let Some(runtime) = RUNTIME.with(|slot| slot.borrow().clone()) {
        return runtime;
    }
    install(page::read_bootstrap())
}

fn ids(list: Vec<String>) -> Vec<ElementId> {
    list.into_iter().map(ElementId::from).collect()
}

/// Replace the page runtime with one built from an explicit bootstrap
/// payload `{settings, labels, pwlink, debug, adminUrl}`. Call it before
/// registering observers; the previous runtime's observers are dropped.
#[wasm_bindgen]
pub fn configure(bootstrap: JsValue) -> Result<(), JsError> {
    let bootstrap = page::decode(bootstrap)
        .map_err(|err| JsError::new(&format!("Invalid bootstrap: {err}")))?;
    install(bootstrap);
    Ok(())
}

/// Initialize an editor by id or selector. Returns `false` when the element
/// cannot be found.
///
/// ```js
/// init('#my-textarea');
/// ```
#[wasm_bindgen]
pub fn init(target: &str) -> bool {
    runtime().init(target).is_success()
}

/// Destroy the given editors. Elements that are not loaded are skipped.
#[wasm_bindgen]
pub fn destroy(ids_to_destroy: Vec<String>) {
    runtime().destroy(ids(ids_to_destroy));
}

/// Destroy and re-initialize the given editors.
#[wasm_bindgen]
pub fn reset(ids_to_reset: Vec<String>) {
    runtime().reset(ids(ids_to_reset));
}

#[wasm_bindgen(js_name = isInitializing)]
pub fn is_initializing(id: &str) -> bool {
    runtime().is_initializing(id)
}

#[wasm_bindgen(js_name = isLoaded)]
pub fn is_loaded(id: &str) -> bool {
    runtime().state(id) == EditorState::Loaded
}

/// Add a setup callback, called with the editor before it renders.
#[wasm_bindgen(js_name = onSetup)]
pub fn on_setup(callback: js_sys::Function) {
    runtime().observers().on_setup(callback);
}

/// Add a config callback, called with `(settings, element, wrapper)`.
#[wasm_bindgen(js_name = onConfig)]
pub fn on_config(callback: js_sys::Function) {
    runtime().observers().on_config(callback);
}

/// Add a ready callback, called with the editor once it is initialized.
#[wasm_bindgen(js_name = onReady)]
pub fn on_ready(callback: js_sys::Function) {
    runtime().observers().on_ready(callback);
}

/// Add a command callback, called with `(editor, command, value)`.
#[wasm_bindgen(js_name = onCommand)]
pub fn on_command(callback: js_sys::Function) {
    runtime().observers().on_command(callback);
}
