//! Pointer interaction
//!
//! Hit testing over the laid-out boxes and the `:hover`/`:active` state
//! bookkeeping that drives restyling.

use std::collections::{HashMap, HashSet};

use vellum_css::Overflow;
use vellum_dom::{DomTree, ElementState, NodeId, Rect};
use vellum_layout::{BoxType, LayoutBox, LayoutBoxId, LayoutTree};

/// Element under `(x, y)`, in document coordinates.
///
/// Boxes are tried from the top of the paint order down; text and other
/// anonymous boxes resolve to the nearest element.
pub fn hit_test(dom: &DomTree, tree: &LayoutTree, x: f32, y: f32) -> Option<NodeId> {
    let order = vellum_render::paint_order(tree);
    let hit = order.iter().rev().copied().find(|id| contains(&tree[*id], x, y) && !clipped_out(tree, *id, x, y))?;

    let mut next = Some(hit);
    while let Some(id) = next {
        if let Some(node) = tree[id].dom_node {
            if dom.element(node).is_some() {
                return Some(node);
            }
            if let Some(parent) = dom.parent(node).filter(|p| dom.element(*p).is_some()) {
                return Some(parent);
            }
        }
        next = tree[id].parent;
    }
    None
}

fn contains(b: &LayoutBox, x: f32, y: f32) -> bool {
    match b.box_type {
        BoxType::Inline | BoxType::Text | BoxType::LineBreak if !b.fragments.is_empty() => {
            b.fragments.iter().any(|f| f.rect.contains(x, y))
        }
        _ => b.bounds().contains(x, y),
    }
}

/// True when an ancestor with hidden overflow cuts the point away
fn clipped_out(tree: &LayoutTree, id: LayoutBoxId, x: f32, y: f32) -> bool {
    let mut next = tree[id].parent;
    while let Some(ancestor) = next {
        let b = &tree[ancestor];
        if b.is_element_box() && b.style.overflow != Overflow::Visible && !b.dimensions.padding_box().contains(x, y) {
            return true;
        }
        next = b.parent;
    }
    false
}

/// Hovered and pressed elements of one document
#[derive(Debug, Default)]
pub struct PointerState {
    hovered: Option<NodeId>,
    pressed: Option<NodeId>,
    cursor: Option<String>,
}

impl PointerState {
    pub fn hovered(&self) -> Option<NodeId> {
        self.hovered
    }

    pub fn pressed(&self) -> Option<NodeId> {
        self.pressed
    }

    /// Move hover to `target`; returns the elements whose state changed
    pub fn set_hover(&mut self, dom: &mut DomTree, target: Option<NodeId>) -> Vec<NodeId> {
        if self.hovered == target {
            return Vec::new();
        }
        self.hovered = target;
        update_chain(dom, target, |state, on| {
            let changed = state.hover != on;
            state.hover = on;
            changed
        })
    }

    /// Press on `target`; returns the elements whose state changed
    pub fn press(&mut self, dom: &mut DomTree, target: Option<NodeId>) -> Vec<NodeId> {
        self.pressed = target;
        update_chain(dom, target, |state, on| {
            let changed = state.active != on;
            state.active = on;
            changed
        })
    }

    /// Release the pointer; returns the element that was pressed and the
    /// elements whose state changed
    pub fn release(&mut self, dom: &mut DomTree) -> (Option<NodeId>, Vec<NodeId>) {
        let pressed = self.pressed.take();
        let changed = update_chain(dom, None, |state, on| {
            let changed = state.active != on;
            state.active = on;
            changed
        });
        (pressed, changed)
    }

    /// Remember the last cursor; true when it differs
    pub fn set_cursor(&mut self, cursor: &str) -> bool {
        if self.cursor.as_deref() == Some(cursor) {
            return false;
        }
        self.cursor = Some(cursor.to_string());
        true
    }
}

/// Set a state flag on `target` and its ancestors, clear it everywhere
/// else
fn update_chain<F>(dom: &mut DomTree, target: Option<NodeId>, mut apply: F) -> Vec<NodeId>
where
    F: FnMut(&mut ElementState, bool) -> bool,
{
    let chain: HashSet<NodeId> = match target {
        Some(node) => std::iter::once(node).chain(dom.ancestors(node)).collect(),
        None => HashSet::new(),
    };
    let nodes: Vec<NodeId> = dom.descendants(dom.root()).collect();
    let mut changed = Vec::new();
    for node in nodes {
        let on = chain.contains(&node);
        if let Some(elem) = dom.element_mut(node)
            && apply(&mut elem.state, on)
        {
            changed.push(node);
        }
    }
    changed
}

/// The `<a href>` that `node` is inside of, with its href
pub fn enclosing_anchor(dom: &DomTree, node: NodeId) -> Option<(NodeId, &str)> {
    std::iter::once(node).chain(dom.ancestors(node)).find_map(|n| {
        let elem = dom.element(n)?;
        if elem.tag == "a" {
            elem.get_attr("href").map(|href| (n, href))
        } else {
            None
        }
    })
}

/// Rectangles to repaint after a restyle: the old and new bounds of every
/// node whose style changed or whose geometry moved
pub fn changed_rects(
    old_bounds: &HashMap<NodeId, Rect>,
    new_bounds: &HashMap<NodeId, Rect>,
    restyled: &HashSet<NodeId>,
) -> Vec<Rect> {
    let mut rects = Vec::new();
    let nodes: HashSet<&NodeId> = old_bounds.keys().chain(new_bounds.keys()).collect();
    for node in nodes {
        let old = old_bounds.get(node);
        let new = new_bounds.get(node);
        if restyled.contains(node) || old != new {
            rects.extend(old.copied());
            rects.extend(new.copied());
        }
    }
    rects
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nested() -> (DomTree, NodeId, NodeId, NodeId) {
        let mut dom = DomTree::new();
        let html = dom.create_element("html");
        let a = dom.create_element("a");
        let b = dom.create_element("b");
        let root = dom.root();
        dom.append_child(root, html);
        dom.append_child(html, a);
        dom.append_child(html, b);
        (dom, html, a, b)
    }

    #[test]
    fn test_hover_moves_along_chain() {
        let (mut dom, html, a, b) = nested();
        let mut state = PointerState::default();
        let changed = state.set_hover(&mut dom, Some(a));
        assert_eq!(changed.len(), 2);
        assert!(dom.element(html).unwrap().state.hover);

        let changed = state.set_hover(&mut dom, Some(b));
        assert_eq!(changed, vec![a, b]);
        assert!(!dom.element(a).unwrap().state.hover);
        assert!(dom.element(html).unwrap().state.hover);

        assert!(state.set_hover(&mut dom, Some(b)).is_empty());
    }

    #[test]
    fn test_press_and_release() {
        let (mut dom, _, a, _) = nested();
        let mut state = PointerState::default();
        state.press(&mut dom, Some(a));
        assert!(dom.element(a).unwrap().state.active);
        let (pressed, changed) = state.release(&mut dom);
        assert_eq!(pressed, Some(a));
        assert_eq!(changed.len(), 2);
        assert!(!dom.element(a).unwrap().state.active);
    }

    #[test]
    fn test_changed_rects_include_old_and_new() {
        let node_a = NodeId::ROOT;
        let old = HashMap::from([(node_a, Rect::new(0.0, 0.0, 10.0, 10.0))]);
        let new = HashMap::from([(node_a, Rect::new(0.0, 0.0, 20.0, 10.0))]);
        let rects = changed_rects(&old, &new, &HashSet::new());
        assert_eq!(rects.len(), 2);
        assert!(changed_rects(&old, &old, &HashSet::new()).is_empty());
    }

    #[test]
    fn test_cursor_only_reported_on_change() {
        let mut state = PointerState::default();
        assert!(state.set_cursor("pointer"));
        assert!(!state.set_cursor("pointer"));
        assert!(state.set_cursor("auto"));
    }
}
