//! Image upload bridge.
//!
//! The engine hands over a blob and a progress callback. A credentialed
//! request is prepared here and passed to the page's image field in a
//! `pwimageupload` event; that field sends the file. The returned promise
//! settles from the request's outcome.

use gloo_events::EventListener;
use js_sys::{Object, Promise, Reflect};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{ProgressEvent, XmlHttpRequest};

use mcefield_editor_core::{UploadError, UploadTarget, classify_response, progress_percent};

use crate::dom::{DomHost, dispatch};
use crate::engine::BlobInfo;

/// Event the image field receives with `{name, file, xhr}`.
pub const UPLOAD_EVENT: &str = "pwimageupload";

/// Value an upload promise is rejected with.
pub fn rejection(err: &UploadError) -> JsValue {
    let message = JsValue::from_str(&err.to_string());
    if !err.remove() {
        return message;
    }
    let object = Object::new();
    let _ = Reflect::set(&object, &"message".into(), &message);
    let _ = Reflect::set(&object, &"remove".into(), &JsValue::TRUE);
    object.into()
}

/// Upload one image for the engine's `images_upload_handler`.
pub fn upload_image(
    host: &DomHost,
    target: &UploadTarget,
    admin_url: &str,
    blob_info: &BlobInfo,
    progress: js_sys::Function,
) -> Promise {
    let url = target.url(admin_url);
    let field = host.element(&target.field_wrapper_id());
    let name = blob_info.filename();
    let file = blob_info.blob();

    Promise::new(&mut |resolve, reject| {
        let Some(field) = field.as_ref() else {
            tracing::warn!(field = %target.field, "image field for uploads not found");
            let _ = reject.call1(
                &JsValue::NULL,
                &JsValue::from_str(&format!("Image field not found: {}", target.field)),
            );
            return;
        };
        if let Err(err) = start(field, &url, &name, &file, progress.clone(), resolve, reject.clone()) {
            let _ = reject.call1(&JsValue::NULL, &err);
        }
    })
}

fn start(
    field: &web_sys::Element,
    url: &str,
    name: &str,
    file: &web_sys::Blob,
    progress: js_sys::Function,
    resolve: js_sys::Function,
    reject: js_sys::Function,
) -> Result<(), JsValue> {
    let xhr = XmlHttpRequest::new()?;
    xhr.set_with_credentials(true);

    let upload = xhr.upload()?;
    EventListener::new(&upload, "progress", move |event| {
        if let Some(event) = event.dyn_ref::<ProgressEvent>() {
            let percent = progress_percent(event.loaded(), event.total());
            let _ = progress.call1(&JsValue::NULL, &JsValue::from_f64(percent));
        }
    })
    .forget();

    xhr.open("POST", url)?;

    let request = xhr.clone();
    let (on_load_resolve, on_load_reject) = (resolve.clone(), reject.clone());
    EventListener::once(&xhr, "load", move |_| {
        let status = request.status().unwrap_or(0);
        let body = request.response_text().ok().flatten().unwrap_or_default();
        match classify_response(status, &body) {
            Ok(location) => {
                tracing::debug!(url = %location, "image uploaded");
                let _ = on_load_resolve.call1(&JsValue::NULL, &JsValue::from_str(&location));
            }
            Err(err) => {
                tracing::warn!(error = %err, "image upload rejected");
                let _ = on_load_reject.call1(&JsValue::NULL, &rejection(&err));
            }
        }
    })
    .forget();

    let request = xhr.clone();
    EventListener::once(&xhr, "error", move |_| {
        let err = UploadError::Transport {
            status: request.status().unwrap_or(0),
        };
        tracing::warn!(error = %err, "image upload failed");
        let _ = reject.call1(&JsValue::NULL, &rejection(&err));
    })
    .forget();

    let detail = Object::new();
    Reflect::set(&detail, &"name".into(), &JsValue::from_str(name))?;
    Reflect::set(&detail, &"file".into(), file)?;
    Reflect::set(&detail, &"xhr".into(), &xhr)?;
    dispatch(field, UPLOAD_EVENT, Some(&detail))?;
    Ok(())
}
