//! DOM Tree (arena-based allocation)

use crate::{ElementData, ElementKind, Node, NodeData, NodeId, TextData};

/// Arena-based DOM tree
///
/// Slot 0 always holds the document node. Nodes are never removed, so a
/// `NodeId` handed out by a tree stays valid for that tree's lifetime.
#[derive(Debug, Clone)]
pub struct DomTree {
    nodes: Vec<Node>,
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DomTree {
    /// Create a tree holding only the document node
    pub fn new() -> Self {
        Self { nodes: vec![Node::with_data(NodeData::Document)] }
    }

    /// Document node
    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::with_data(data));
        id
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeData::Element(ElementData::new(tag)))
    }

    /// Create a detached text node; runs made only of whitespace are flagged
    pub fn create_text(&mut self, content: &str) -> NodeId {
        let is_whitespace = content.chars().all(|c| c.is_ascii_whitespace());
        self.push(NodeData::Text(TextData { content: content.to_string(), is_whitespace }))
    }

    /// Create a detached comment
    pub fn create_comment(&mut self, content: &str) -> NodeId {
        self.push(NodeData::Comment(content.to_string()))
    }

    /// Append `child` as the last child of `parent`
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if parent == child || parent.index() >= self.nodes.len() || child.index() >= self.nodes.len() {
            return;
        }
        let prev = self.nodes[parent.index()].last_child;

        {
            let node = &mut self.nodes[child.index()];
            node.parent = Some(parent);
            node.prev_sibling = prev;
            node.next_sibling = None;
        }
        if let Some(prev) = prev {
            self.nodes[prev.index()].next_sibling = Some(child);
        }

        let parent_node = &mut self.nodes[parent.index()];
        if parent_node.first_child.is_none() {
            parent_node.first_child = Some(child);
        }
        parent_node.last_child = Some(child);
    }

    /// Get a node by ID
    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Get a mutable node by ID
    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    /// Element data of `id`, if it is an element
    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.get(id).and_then(Node::as_element)
    }

    /// Mutable element data of `id`
    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        self.get_mut(id).and_then(Node::as_element_mut)
    }

    /// Tag name of an element
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.tag.as_str())
    }

    /// Element kind, `None` for non-elements
    pub fn kind(&self, id: NodeId) -> Option<ElementKind> {
        self.element(id).map(|e| e.kind)
    }

    /// Parent of a node
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Iterate over children as `(id, node)` pairs
    pub fn children(&self, parent: NodeId) -> Children<'_> {
        Children {
            tree: self,
            next: self.get(parent).and_then(|n| n.first_child),
        }
    }

    /// Iterate from the parent of `id` up to the document node
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors { tree: self, next: self.parent(id) }
    }

    /// Preorder walk of the subtree below `id` (excluding `id`)
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let stack = self.child_ids_rev(id);
        Descendants { tree: self, stack }
    }

    fn child_ids_rev(&self, id: NodeId) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.children(id).map(|(cid, _)| cid).collect();
        ids.reverse();
        ids
    }

    /// Nearest preceding sibling that is an element
    pub fn prev_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut cur = self.get(id)?.prev_sibling;
        while let Some(sib) = cur {
            let node = self.get(sib)?;
            if node.is_element() {
                return Some(sib);
            }
            cur = node.prev_sibling;
        }
        None
    }

    /// Nearest following sibling that is an element
    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut cur = self.get(id)?.next_sibling;
        while let Some(sib) = cur {
            let node = self.get(sib)?;
            if node.is_element() {
                return Some(sib);
            }
            cur = node.next_sibling;
        }
        None
    }

    /// Concatenated text of all text descendants
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for desc in self.descendants(id) {
            if let Some(text) = self.get(desc).and_then(Node::as_text) {
                out.push_str(&text.content);
            }
        }
        out
    }

    /// First element in document order with the given tag
    pub fn find_first(&self, tag: &str) -> Option<NodeId> {
        self.descendants(NodeId::ROOT)
            .find(|&id| self.tag(id).is_some_and(|t| t.eq_ignore_ascii_case(tag)))
    }

    /// Every element in document order with the given tag
    pub fn find_all(&self, tag: &str) -> Vec<NodeId> {
        self.descendants(NodeId::ROOT)
            .filter(|&id| self.tag(id).is_some_and(|t| t.eq_ignore_ascii_case(tag)))
            .collect()
    }

    /// Number of nodes in the tree (document node included)
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Only the document node exists
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }
}

/// Child iterator
pub struct Children<'a> {
    tree: &'a DomTree,
    next: Option<NodeId>,
}

impl<'a> Iterator for Children<'a> {
    type Item = (NodeId, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        let node = self.tree.get(id)?;
        self.next = node.next_sibling;
        Some((id, node))
    }
}

/// Ancestor iterator
pub struct Ancestors<'a> {
    tree: &'a DomTree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.next?;
        self.next = self.tree.parent(id);
        Some(id)
    }
}

/// Preorder descendant iterator
pub struct Descendants<'a> {
    tree: &'a DomTree,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack.extend(self.tree.child_ids_rev(id));
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (DomTree, NodeId, NodeId, NodeId) {
        let mut tree = DomTree::new();
        let div = tree.create_element("div");
        let p = tree.create_element("p");
        let text = tree.create_text("hello");
        tree.append_child(tree.root(), div);
        tree.append_child(div, p);
        tree.append_child(p, text);
        (tree, div, p, text)
    }

    #[test]
    fn test_append_links_siblings() {
        let mut tree = DomTree::new();
        let parent = tree.create_element("ul");
        let a = tree.create_element("li");
        let b = tree.create_element("li");
        tree.append_child(parent, a);
        tree.append_child(parent, b);

        let node = tree.get(parent).unwrap();
        assert_eq!(node.first_child, Some(a));
        assert_eq!(node.last_child, Some(b));
        assert_eq!(tree.get(a).unwrap().next_sibling, Some(b));
        assert_eq!(tree.get(b).unwrap().prev_sibling, Some(a));
        assert_eq!(tree.parent(b), Some(parent));
    }

    #[test]
    fn test_ancestors_reach_root() {
        let (tree, div, p, text) = sample();
        let chain: Vec<_> = tree.ancestors(text).collect();
        assert_eq!(chain, vec![p, div, NodeId::ROOT]);
    }

    #[test]
    fn test_descendants_preorder() {
        let (tree, div, p, text) = sample();
        let all: Vec<_> = tree.descendants(tree.root()).collect();
        assert_eq!(all, vec![div, p, text]);
        assert_eq!(tree.text_content(div), "hello");
        assert_eq!(tree.find_first("P"), Some(p));
    }

    #[test]
    fn test_element_siblings_skip_text() {
        let mut tree = DomTree::new();
        let a = tree.create_element("span");
        let ws = tree.create_text("  ");
        let b = tree.create_element("span");
        for id in [a, ws, b] {
            tree.append_child(tree.root(), id);
        }
        assert!(tree.get(ws).unwrap().as_text().unwrap().is_whitespace);
        assert_eq!(tree.next_element_sibling(a), Some(b));
        assert_eq!(tree.prev_element_sibling(b), Some(a));
        assert_eq!(tree.prev_element_sibling(a), None);
    }
}
