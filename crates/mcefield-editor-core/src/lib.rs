//! mcefield-editor-core: editor lifecycle logic without DOM dependencies.
//!
//! This crate provides:
//! - `Controller`, the per-element state machine (lazy, initializing, loaded)
//! - `EditorHost`, the document queries the controller relies on
//! - Client-side config merging, image resize and upload helpers
//!
//! The browser crate implements `EditorHost` over the live document and
//! carries out the returned `Effect`s.

pub mod align;
pub mod config;
pub mod controller;
pub mod error;
pub mod host;
pub mod image;
pub mod types;
pub mod upload;

pub use align::enforce_single_align;
pub use config::{Bootstrap, WrapperData, merge_config};
pub use controller::{
    Controller, DocumentEvent, Effect, EngineConfig, Event, INIT_GRACE, INPUT_DEBOUNCE,
    InitOutcome, ResizedObject, TimerKind,
};
pub use error::{ControllerError, UploadError};
pub use host::EditorHost;
pub use image::{ResizeResponse, is_hidpi, original_src, resize_url};
pub use mcefield_common::{FeatureSet, Settings};
pub use smol_str::SmolStr;
pub use types::{EditorClass, EditorState, ElementId, ElementRef, wrapper_id};
pub use upload::{UploadTarget, classify_response, progress_percent};
