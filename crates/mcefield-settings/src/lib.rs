//! Server-side settings for the mcefield rich-text field.
//!
//! Loads the editor defaults, computes each field's minimal settings diff,
//! compiles style-format CSS and prepares the wrapper attributes and page
//! bootstrap payload consumed by the browser controller.

pub mod add;
pub mod cache;
pub mod config;
pub mod css;
pub mod defaults;
pub mod formats;
pub mod lang;
pub mod markup;
pub mod names;
pub mod output;
pub mod registry;
pub mod render;
pub mod resolve;

pub use crate::add::apply_add_settings;
pub use crate::cache::SettingsCache;
pub use crate::config::{
    FieldSettings, InlineMode, ModuleSettings, PageContext, SettingsLoader, SiteContext,
};
pub use crate::defaults::load_defaults;
pub use crate::formats::{StyleFormat, merge_style_formats};
pub use crate::markup::{MarkupToggles, Purifier, process_input, purify_value};
pub use crate::output::prepare_for_output;
pub use crate::registry::ConfigNameRegistry;
pub use crate::render::{RenderReady, WrapperOutput};
pub use crate::resolve::{FieldContext, SettingResolvers, SettingsResolver};

pub use mcefield_common::{FeatureSet, FieldError, Settings};
