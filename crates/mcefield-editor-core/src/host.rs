//! Document queries the controller needs answered.
//!
//! The browser layer implements this over the live DOM; tests use an
//! in-memory fake. Queries never mutate: every change the controller wants is
//! returned as an [`Effect`](crate::Effect).

use crate::config::WrapperData;
use crate::types::{ElementId, ElementRef};

pub trait EditorHost {
    /// Id of the element a reference points to, if it exists.
    fn resolve(&self, target: &ElementRef) -> Option<ElementId>;

    /// Is the element currently rendered and visible?
    fn is_visible(&self, id: &ElementId) -> bool;

    /// Is the element an inline-mode editor?
    fn is_inline(&self, id: &ElementId) -> bool;

    /// Does an element with this id exist?
    fn exists(&self, id: &ElementId) -> bool;

    /// Nearest ancestor field wrapper of an element.
    fn closest_wrapper(&self, id: &ElementId) -> Option<ElementId>;

    /// Attributes of a field wrapper.
    fn wrapper_data(&self, wrapper: &ElementId) -> WrapperData;

    /// Editor elements inside a container, in document order.
    fn editors_within(&self, container: &ElementId) -> Vec<ElementId>;
}
