//! Vellum DOM - Document Object Model
//!
//! Arena-backed element tree. Nodes refer to each other through [`NodeId`]
//! handles, so the parent link is never an owning reference and a handle
//! cannot keep a node alive after its tree is dropped.

mod geometry;
mod kind;
mod node;
mod tree;

pub use geometry::{EdgeSizes, Rect};
pub use kind::ElementKind;
pub use node::{Attribute, ElementData, ElementState, Node, NodeData, TextData};
pub use tree::{Ancestors, Children, Descendants, DomTree};

/// Node identifier (index into the tree arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Document node ID
    pub const ROOT: NodeId = NodeId(0);

    /// Arena index of this node
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}
