//! Element identity and lifecycle state.

use smol_str::SmolStr;
use std::fmt;

/// DOM id of an editor element (textarea or inline div).
pub type ElementId = SmolStr;

/// How a caller names the element to initialize.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ElementRef {
    /// Bare element id.
    Id(ElementId),
    /// CSS selector, e.g. `#Inputfield_body` or `.my-editor`.
    Selector(SmolStr),
}

impl ElementRef {
    /// Strings starting with `#` or `.` are selectors, anything else an id.
    pub fn parse(target: &str) -> Self {
        if target.starts_with('#') || target.starts_with('.') {
            ElementRef::Selector(SmolStr::new(target))
        } else {
            ElementRef::Id(SmolStr::new(target))
        }
    }

    pub fn id(id: impl Into<ElementId>) -> Self {
        ElementRef::Id(id.into())
    }

    /// Selector matching this reference.
    pub fn selector(&self) -> SmolStr {
        match self {
            ElementRef::Id(id) => smol_str::format_smolstr!("#{id}"),
            ElementRef::Selector(selector) => selector.clone(),
        }
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementRef::Id(id) => f.write_str(id),
            ElementRef::Selector(selector) => f.write_str(selector),
        }
    }
}

impl From<&str> for ElementRef {
    fn from(target: &str) -> Self {
        Self::parse(target)
    }
}

/// Lifecycle state of one editor element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditorState {
    /// No engine; not deferred.
    #[default]
    Unloaded,
    /// Deferred until visible or interacted with.
    Lazy,
    /// Engine construction in flight.
    Initializing,
    /// Engine constructed and wired.
    Loaded,
}

/// Marker classes kept in sync on editor elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditorClass {
    Lazy,
    Inline,
    Normal,
    Loaded,
    Editor,
}

impl EditorClass {
    pub const fn as_str(self) -> &'static str {
        match self {
            EditorClass::Lazy => "InputfieldTinyMCELazy",
            EditorClass::Inline => "InputfieldTinyMCEInline",
            EditorClass::Normal => "InputfieldTinyMCENormal",
            EditorClass::Loaded => "InputfieldTinyMCELoaded",
            EditorClass::Editor => "InputfieldTinyMCEEditor",
        }
    }
}

/// Wrapper id for an editor id, by naming convention.
pub fn wrapper_id(element_id: &str) -> ElementId {
    if element_id.starts_with("Inputfield_") {
        smol_str::format_smolstr!("wrap_{element_id}")
    } else {
        smol_str::format_smolstr!("wrap_Inputfield_{element_id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ids_and_selectors() {
        assert_eq!(ElementRef::parse("body"), ElementRef::Id("body".into()));
        assert_eq!(
            ElementRef::parse("#Inputfield_body"),
            ElementRef::Selector("#Inputfield_body".into())
        );
        assert_eq!(ElementRef::parse(".editor").selector(), ".editor");
        assert_eq!(ElementRef::parse("body").selector(), "#body");
    }

    #[test]
    fn wrapper_naming() {
        assert_eq!(wrapper_id("Inputfield_body"), "wrap_Inputfield_body");
        assert_eq!(wrapper_id("body_repeater1042"), "wrap_Inputfield_body_repeater1042");
    }
}
