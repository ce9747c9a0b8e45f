//! [`EditorHost`] over the live document.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use smol_str::{SmolStr, format_smolstr};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CustomEvent, CustomEventInit, Document, Element, HtmlElement};

use mcefield_editor_core::{
    EditorClass, EditorHost, ElementId, ElementRef, FeatureSet, WrapperData,
};

/// Field wrapper class.
pub const WRAPPER_SELECTOR: &str = ".Inputfield";

/// Editor field wrapper class, target of `image-edit` and `sort-stop`.
pub const FIELD_SELECTOR: &str = ".InputfieldTinyMCE";

pub struct DomHost {
    document: Document,
    /// Containers without an id, keyed for the length of one dispatch.
    anonymous: RefCell<HashMap<ElementId, Element>>,
    next_anonymous: Cell<u32>,
}

impl DomHost {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            anonymous: RefCell::new(HashMap::new()),
            next_anonymous: Cell::new(0),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn element(&self, id: &str) -> Option<Element> {
        if let Some(element) = self.anonymous.borrow().get(id) {
            return Some(element.clone());
        }
        self.document.get_element_by_id(id)
    }

    /// Key for a container element. Elements without an id get a temporary
    /// key, valid until [`clear_anonymous`](Self::clear_anonymous).
    pub fn container_key(&self, element: &Element) -> ElementId {
        let id = element.id();
        if !id.is_empty() {
            return SmolStr::new(id);
        }
        let n = self.next_anonymous.get();
        self.next_anonymous.set(n.wrapping_add(1));
        let key = format_smolstr!("#anonymous-container-{n}");
        self.anonymous.borrow_mut().insert(key.clone(), element.clone());
        key
    }

    pub fn clear_anonymous(&self) {
        self.anonymous.borrow_mut().clear();
    }

    pub fn add_class(&self, id: &str, class: EditorClass) {
        if let Some(element) = self.element(id) {
            if let Err(err) = element.class_list().add_1(class.as_str()) {
                tracing::debug!(id, class = class.as_str(), error = ?err, "cannot add class");
            }
        }
    }

    pub fn remove_class(&self, id: &str, class: EditorClass) {
        if let Some(element) = self.element(id) {
            if let Err(err) = element.class_list().remove_1(class.as_str()) {
                tracing::debug!(id, class = class.as_str(), error = ?err, "cannot remove class");
            }
        }
    }

    /// Dispatch a bubbling event on an element.
    pub fn trigger(&self, id: &str, name: &str, detail: Option<&JsValue>) -> Result<bool, JsValue> {
        let Some(element) = self.element(id) else {
            tracing::debug!(id, event = name, "no element to notify");
            return Ok(false);
        };
        dispatch(&element, name, detail)
    }
}

/// Dispatch a bubbling custom event.
pub fn dispatch(target: &Element, name: &str, detail: Option<&JsValue>) -> Result<bool, JsValue> {
    let init = CustomEventInit::new();
    init.set_bubbles(true);
    if let Some(detail) = detail {
        init.set_detail(detail);
    }
    let event = CustomEvent::new_with_event_init_dict(name, &init)?;
    target.dispatch_event(&event)
}

/// Rendered and taking up space, the same test as jQuery's `:visible`.
pub fn is_visible(element: &Element) -> bool {
    if let Some(html) = element.dyn_ref::<HtmlElement>()
        && (html.offset_width() > 0 || html.offset_height() > 0)
    {
        return true;
    }
    element.get_client_rects().length() > 0
}

impl EditorHost for DomHost {
    fn resolve(&self, target: &ElementRef) -> Option<ElementId> {
        match target {
            ElementRef::Id(id) => self.document.get_element_by_id(id).map(|_| id.clone()),
            ElementRef::Selector(selector) => {
                let element = self.document.query_selector(selector).ok().flatten()?;
                let id = element.id();
                if id.is_empty() {
                    tracing::warn!(selector = %selector, "editor element has no id");
                    return None;
                }
                Some(SmolStr::new(id))
            }
        }
    }

    fn is_visible(&self, id: &ElementId) -> bool {
        self.element(id).is_some_and(|element| is_visible(&element))
    }

    fn is_inline(&self, id: &ElementId) -> bool {
        self.element(id)
            .is_some_and(|element| element.class_list().contains(EditorClass::Inline.as_str()))
    }

    fn exists(&self, id: &ElementId) -> bool {
        self.element(id).is_some()
    }

    fn closest_wrapper(&self, id: &ElementId) -> Option<ElementId> {
        let wrapper = self.element(id)?.closest(WRAPPER_SELECTOR).ok().flatten()?;
        let id = wrapper.id();
        (!id.is_empty()).then(|| SmolStr::new(id))
    }

    fn wrapper_data(&self, wrapper: &ElementId) -> WrapperData {
        let Some(element) = self.element(wrapper) else {
            return WrapperData::default();
        };
        WrapperData {
            config_name: element.get_attribute("data-configName").unwrap_or_default(),
            settings: element.get_attribute("data-settings"),
            features: element
                .get_attribute("data-features")
                .map(|list| FeatureSet::parse_list(&list))
                .unwrap_or_default(),
            upload_page: element
                .get_attribute("data-upload-page")
                .and_then(|page| page.trim().parse().ok()),
            upload_field: element.get_attribute("data-upload-field"),
        }
    }

    fn editors_within(&self, container: &ElementId) -> Vec<ElementId> {
        let Some(element) = self.element(container) else {
            return Vec::new();
        };
        let selector = format!(".{}", EditorClass::Editor.as_str());
        let Ok(nodes) = element.query_selector_all(&selector) else {
            return Vec::new();
        };
        (0..nodes.length())
            .filter_map(|i| nodes.item(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .map(|element| element.id())
            .filter(|id| !id.is_empty())
            .map(SmolStr::new)
            .collect()
    }
}
