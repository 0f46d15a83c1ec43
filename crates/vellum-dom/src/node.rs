//! DOM Node
//!
//! Links between nodes are [`NodeId`] handles into the owning [`DomTree`]
//! arena, never references.
//!
//! [`DomTree`]: crate::DomTree

use crate::{ElementKind, NodeId};

/// DOM Node - Core structure
#[derive(Debug, Clone)]
pub struct Node {
    /// Parent node (None for the document node)
    pub parent: Option<NodeId>,
    /// First child
    pub first_child: Option<NodeId>,
    /// Last child (for O(1) append)
    pub last_child: Option<NodeId>,
    /// Previous sibling
    pub prev_sibling: Option<NodeId>,
    /// Next sibling
    pub next_sibling: Option<NodeId>,
    /// Node-specific data
    pub data: NodeData,
}

impl Node {
    pub(crate) fn with_data(data: NodeData) -> Self {
        Self {
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            data,
        }
    }

    /// Check if this is an element
    #[inline]
    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element(_))
    }

    /// Check if this is text (words or whitespace)
    #[inline]
    pub fn is_text(&self) -> bool {
        matches!(self.data, NodeData::Text(_))
    }

    /// Get element data if this is an element
    #[inline]
    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Get mutable element data
    #[inline]
    pub fn as_element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Get text data if this is a text node
    #[inline]
    pub fn as_text(&self) -> Option<&TextData> {
        match &self.data {
            NodeData::Text(t) => Some(t),
            _ => None,
        }
    }
}

/// Node-specific data
#[derive(Debug, Clone)]
pub enum NodeData {
    /// Document root
    Document,
    /// Element
    Element(ElementData),
    /// Word run or whitespace run
    Text(TextData),
    /// Comment
    Comment(String),
}

/// Element-specific data
#[derive(Debug, Clone)]
pub struct ElementData {
    /// Lowercase tag name
    pub tag: String,
    /// Behaviour class of the tag
    pub kind: ElementKind,
    /// Attributes in source order
    pub attrs: Vec<Attribute>,
    /// Cached id attribute
    pub id: Option<String>,
    /// Cached class list
    pub classes: Vec<String>,
    /// Dynamic pseudo-class state
    pub state: ElementState,
}

impl ElementData {
    pub fn new(tag: &str) -> Self {
        let tag = tag.to_ascii_lowercase();
        Self {
            kind: ElementKind::from_tag(&tag),
            tag,
            attrs: Vec::new(),
            id: None,
            classes: Vec::new(),
            state: ElementState::default(),
        }
    }

    /// Get an attribute value
    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .map(|a| a.value.as_str())
    }

    /// Check for an attribute
    pub fn has_attr(&self, name: &str) -> bool {
        self.get_attr(name).is_some()
    }

    /// Set an attribute, keeping the id/class caches in sync
    pub fn set_attr(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        match name.as_str() {
            "id" => self.id = Some(value.to_string()),
            "class" => {
                self.classes = value.split_whitespace().map(str::to_string).collect();
            }
            _ => {}
        }

        if let Some(attr) = self.attrs.iter_mut().find(|a| a.name == name) {
            attr.value = value.to_string();
            return;
        }
        self.attrs.push(Attribute { name, value: value.to_string() });
    }

    /// Check class membership
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

/// Attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// Text node data
#[derive(Debug, Clone)]
pub struct TextData {
    pub content: String,
    /// Whitespace runs are kept apart from word runs so layout can collapse
    /// or preserve them according to `white-space`.
    pub is_whitespace: bool,
}

/// Element interaction states
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementState {
    pub hover: bool,
    pub active: bool,
    pub focus: bool,
    /// Host-defined pseudo states, matched by `:name`
    pub custom: Vec<String>,
}

impl ElementState {
    /// Check a custom pseudo state
    pub fn has_custom(&self, name: &str) -> bool {
        self.custom.iter().any(|s| s.eq_ignore_ascii_case(name))
    }

    /// Set or clear a custom pseudo state; returns true if it changed
    pub fn set_custom(&mut self, name: &str, on: bool) -> bool {
        let present = self.has_custom(name);
        if on && !present {
            self.custom.push(name.to_ascii_lowercase());
            true
        } else if !on && present {
            self.custom.retain(|s| !s.eq_ignore_ascii_case(name));
            true
        } else {
            false
        }
    }
}
