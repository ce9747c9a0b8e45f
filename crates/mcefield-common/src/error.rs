//! Error types for mcefield configuration handling.
//!
//! Configuration problems never abort a render pass: callers log them and
//! fall back to an empty settings mapping. The types still carry enough
//! context (property name, file path, JSON source location) to render a
//! useful diagnostic.

use miette::{Diagnostic, NamedSource, SourceOffset, SourceSpan};
use std::path::PathBuf;

/// Main error type for settings loading and decoding.
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum FieldError {
    /// JSON could not be parsed
    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    /// A settings file named in configuration does not exist
    #[error("{property} - file does not exist - {}", path.display())]
    #[diagnostic(
        code(mcefield::config::missing_file),
        help("paths are resolved relative to the site root or module URL")
    )]
    MissingFile { property: String, path: PathBuf },

    /// A settings file does not use the `.json` extension
    #[error("{property} - file extension is not .json - {}", path.display())]
    #[diagnostic(code(mcefield::config::bad_extension))]
    BadExtension { property: String, path: PathBuf },

    /// JSON parsed, but the top level is not an object
    #[error("{property} - expected a JSON object")]
    #[diagnostic(code(mcefield::config::not_an_object))]
    NotAnObject { property: String },

    /// IO error
    #[error(transparent)]
    #[diagnostic(code(mcefield::io))]
    Io(#[from] std::io::Error),
}

/// JSON parse error with source code location information
#[derive(thiserror::Error, Debug, Diagnostic)]
#[error("error decoding JSON for property \"{property}\" - {message}")]
#[diagnostic(code(mcefield::parse::json))]
pub struct ParseError {
    property: String,
    message: String,
    #[source]
    cause: serde_json::Error,
    #[source_code]
    src: NamedSource<String>,
    #[label("here")]
    err_location: SourceSpan,
    #[help]
    advice: Option<String>,
}

impl ParseError {
    /// Build from a serde_json error, pointing at the failing line/column of `source`.
    pub fn json(err: serde_json::Error, property: &str, source: &str) -> Self {
        let (line, column) = (err.line(), err.column());
        let offset = if line == 0 {
            SourceOffset::from(0)
        } else {
            SourceOffset::from_location(source, line, column)
        };
        let advice = match err.classify() {
            serde_json::error::Category::Eof => {
                Some("the JSON ends early; check for a missing closing brace".to_owned())
            }
            serde_json::error::Category::Syntax => {
                Some("keys and strings must use double quotes; trailing commas are not allowed".to_owned())
            }
            _ => None,
        };
        Self {
            property: property.to_owned(),
            message: err.to_string(),
            cause: err,
            src: NamedSource::new(property, source.to_owned()),
            err_location: SourceSpan::new(offset, 0),
            advice,
        }
    }

    /// Name of the property whose JSON failed to decode.
    pub fn property(&self) -> &str {
        &self.property
    }

    /// 1-based line and column reported by the JSON parser.
    pub fn line_col(&self) -> (usize, usize) {
        (self.cause.line(), self.cause.column())
    }
}
