//! Shared types for the mcefield editor field.
//!
//! Settings decoding, loose value comparison and the feature-flag set used by
//! both the server-side resolver and the client controller.

pub mod error;
pub mod features;
pub mod json;
pub mod loose;

#[cfg(feature = "telemetry")]
pub mod telemetry;

pub use crate::error::{FieldError, ParseError};
pub use crate::features::FeatureSet;
pub use crate::json::{
    Settings, decode_settings, decode_settings_file, merge_settings, merged, parse_settings,
    read_settings_file,
};
pub use crate::loose::{is_truthy, loose_eq};

/// Result alias for configuration loading.
pub type Result<T, E = FieldError> = std::result::Result<T, E>;
