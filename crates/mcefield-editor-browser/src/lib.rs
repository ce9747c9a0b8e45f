//! Browser DOM layer for mcefield editors.
//!
//! Carries out the controller's effects against the live document and the
//! editing engine. It assumes a `wasm32-unknown-unknown` target environment.
//!
//! # Architecture
//!
//! - `dom`: `EditorHost` over `web_sys::Document`, class and event helpers
//! - `engine`: bindings to the `tinymce` global
//! - `events`: delegated document events mapped to controller events
//! - `runtime`: controller, observers, timers and per-engine wiring
//! - `upload`, `resize`: the two server round trips
//!
//! This crate re-exports `mcefield-editor-core` for convenience.

pub use mcefield_editor_core;
pub use mcefield_editor_core::*;

pub mod dom;
pub mod engine;
pub mod events;
pub mod resize;
pub mod runtime;
pub mod upload;

pub use dom::{DomHost, dispatch, is_visible};
pub use events::{DOCUMENT_EVENTS, document_event};
pub use runtime::{Observers, Runtime};
pub use upload::{UPLOAD_EVENT, rejection, upload_image};
