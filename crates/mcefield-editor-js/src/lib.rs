//! WASM bindings for mcefield editors.
//!
//! Exposes the page-facing API (`init`, `destroy`, `reset`, observer
//! registration) over a single runtime per page. The runtime reads its
//! bootstrap payload from `ProcessWire.config.InputfieldTinyMCE` unless
//! [`configure`] supplies one.

mod api;
mod logging;
mod page;

pub use api::*;

use wasm_bindgen::prelude::*;

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
}
