//! Delegated document events.
//!
//! One listener per event name on the document; each maps the raw event to a
//! [`DocumentEvent`] for the controller.

use wasm_bindgen::JsCast;
use web_sys::{CustomEvent, Element};

use mcefield_editor_core::{DocumentEvent, EditorClass};

use crate::dom::{DomHost, FIELD_SELECTOR, WRAPPER_SELECTOR};

/// Events that start a not-yet-loaded inline editor.
pub const INTERACT_EVENTS: [&str; 4] = ["click", "mouseover", "focusin", "touchstart"];

/// Every document event name the runtime listens for.
pub const DOCUMENT_EVENTS: [&str; 11] = [
    "click",
    "mouseover",
    "focusin",
    "touchstart",
    "image-edit",
    "sort-stop",
    "reload",
    "reloaded",
    "sortstop",
    "clicklangtab",
    "wiretabclick",
];

fn closest(target: &Element, selector: &str) -> Option<Element> {
    target.closest(selector).ok().flatten()
}

/// Map a raw document event to a controller event.
pub fn document_event(name: &str, event: &web_sys::Event, host: &DomHost) -> Option<DocumentEvent> {
    let target: Element = event.target()?.dyn_into().ok()?;

    if INTERACT_EVENTS.contains(&name) {
        let selector = format!(
            ".{}:not(.{})",
            EditorClass::Inline.as_str(),
            EditorClass::Loaded.as_str()
        );
        let editor = closest(&target, &selector)?;
        let id = editor.id();
        return (!id.is_empty()).then(|| DocumentEvent::Interact { target: id.into() });
    }

    match name {
        "image-edit" => Some(DocumentEvent::ImageEdit {
            field: host.container_key(&closest(&target, FIELD_SELECTOR)?),
        }),
        "sort-stop" => Some(DocumentEvent::FieldSortStop {
            field: host.container_key(&closest(&target, FIELD_SELECTOR)?),
        }),
        "reload" => Some(DocumentEvent::Reload {
            wrapper: host.container_key(&closest(&target, WRAPPER_SELECTOR)?),
        }),
        "reloaded" => Some(DocumentEvent::Reloaded {
            wrapper: host.container_key(&closest(&target, WRAPPER_SELECTOR)?),
        }),
        "sortstop" => Some(DocumentEvent::SortStop {
            container: host.container_key(&target),
        }),
        "clicklangtab" | "wiretabclick" => {
            // The new tab travels in the event detail when the sender provides it.
            let tab = event
                .dyn_ref::<CustomEvent>()
                .and_then(|event| event.detail().dyn_into::<Element>().ok())
                .unwrap_or(target);
            Some(DocumentEvent::TabActivated {
                tab: host.container_key(&tab),
            })
        }
        _ => None,
    }
}
