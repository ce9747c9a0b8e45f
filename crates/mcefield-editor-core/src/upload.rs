//! Image upload request and response handling.

use serde::Deserialize;

use crate::error::UploadError;

/// Page and image field that receive uploads for an editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub page_id: u64,
    pub field: String,
}

impl UploadTarget {
    /// Endpoint the file is posted to.
    pub fn url(&self, admin_url: &str) -> String {
        format!(
            "{admin_url}page/edit/?id={}&InputfieldFileAjax=1&ckeupload=1",
            self.page_id
        )
    }

    /// Id of the image field wrapper notified about the upload.
    pub fn field_wrapper_id(&self) -> String {
        format!("wrap_Inputfield_{}", self.field)
    }
}

#[derive(Deserialize)]
struct UploadResponse {
    url: String,
}

/// Upload progress as a 0-100 percentage.
pub fn progress_percent(loaded: f64, total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    (loaded / total * 100.0).clamp(0.0, 100.0)
}

/// Interpret a finished upload request. Returns the stored image URL.
pub fn classify_response(status: u16, body: &str) -> Result<String, UploadError> {
    match status {
        403 => Err(UploadError::Forbidden { status }),
        200..=299 => serde_json::from_str::<UploadResponse>(body)
            .map(|response| response.url)
            .map_err(|_| UploadError::InvalidResponse {
                body: body.to_owned(),
            }),
        _ => Err(UploadError::Http { status }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_endpoint() {
        let target = UploadTarget {
            page_id: 1042,
            field: "images".into(),
        };
        assert_eq!(
            target.url("/processwire/"),
            "/processwire/page/edit/?id=1042&InputfieldFileAjax=1&ckeupload=1"
        );
        assert_eq!(target.field_wrapper_id(), "wrap_Inputfield_images");
    }

    #[test]
    fn response_classification() {
        assert_eq!(
            classify_response(200, r#"{"url": "/site/assets/files/1042/a.jpg", "size": 10}"#),
            Ok("/site/assets/files/1042/a.jpg".to_owned())
        );

        let forbidden = classify_response(403, "").unwrap_err();
        assert!(forbidden.remove());
        assert_eq!(forbidden.to_string(), "HTTP Error: 403");

        let failed = classify_response(500, "oops").unwrap_err();
        assert!(!failed.remove());
        assert_eq!(failed, UploadError::Http { status: 500 });

        assert_eq!(
            classify_response(200, "null"),
            Err(UploadError::InvalidResponse {
                body: "null".into()
            })
        );
        assert!(classify_response(201, r#"{"error": "nope"}"#).is_err());
    }

    #[test]
    fn progress_is_a_percentage() {
        assert_eq!(progress_percent(50.0, 200.0), 25.0);
        assert_eq!(progress_percent(10.0, 0.0), 0.0);
    }
}
