use miette::Diagnostic;

/// Errors from the lifecycle controller. Each one is local to one element.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum ControllerError {
    #[error("cannot find element to init editor: {target}")]
    #[diagnostic(
        code(mcefield::editor::not_found),
        help("the element id or selector did not match anything in the document")
    )]
    NotFound { target: String },

    #[error("editor {id} failed to initialize: {reason}")]
    #[diagnostic(code(mcefield::editor::engine_failed))]
    EngineFailed { id: String, reason: String },
}

/// Reasons an image upload is rejected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum UploadError {
    /// Upload refused; the file should be dropped from the pending list.
    #[error("HTTP Error: {status}")]
    #[diagnostic(code(mcefield::upload::forbidden))]
    Forbidden { status: u16 },

    #[error("HTTP Error: {status}")]
    #[diagnostic(code(mcefield::upload::http))]
    Http { status: u16 },

    #[error("Image upload failed due to a XHR Transport error. Code: {status}")]
    #[diagnostic(code(mcefield::upload::transport))]
    Transport { status: u16 },

    #[error("Invalid JSON in response: {body}")]
    #[diagnostic(code(mcefield::upload::invalid_response))]
    InvalidResponse { body: String },
}

impl UploadError {
    /// Should the editor drop the file instead of keeping it pending?
    pub fn remove(&self) -> bool {
        matches!(self, UploadError::Forbidden { .. })
    }
}
