//! Layout Tree
//!
//! Arena of boxes in document pixel coordinates, rebuilt on every layout
//! pass. Boxes refer to each other through [`LayoutBoxId`] handles.

use std::collections::HashMap;
use std::ops::{Index, IndexMut};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use vellum_css::{BorderSide, ComputedStyle, Display, ListStylePosition, ListStyleType, PseudoElement};
use vellum_dom::{NodeId, Rect};

use crate::{BoxDimensions, Font};

/// Layout box identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayoutBoxId(pub(crate) u32);

impl LayoutBoxId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Type of layout box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoxType {
    /// Block container (block, list-item, anonymous block)
    Block,
    /// Non-replaced inline element
    Inline,
    /// Atomic inline block container
    InlineBlock,
    /// Run of text; its style is the parent element's
    Text,
    /// `<br>`
    LineBreak,
    /// Replaced image
    Image,
    /// List item marker
    Marker,
    Table,
    TableRowGroup,
    TableRow,
    TableCell,
    TableCaption,
    TableColumn,
}

/// What a box draws besides background and borders
#[derive(Debug, Clone, PartialEq)]
pub enum BoxContent {
    None,
    Text(String),
    Image { url: String },
    Marker(ListMarker),
}

/// Generated list marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListMarker {
    pub kind: ListStyleType,
    pub position: ListStylePosition,
    /// Ordinal of the list item
    pub ordinal: i32,
    /// Text for counting styles (`"3."`)
    pub text: Option<String>,
    /// `list-style-image`
    pub image: Option<String>,
}

/// One line's piece of an inline or text box
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    /// Border box of the piece (content area for text)
    pub rect: Rect,
    /// Absolute y of the baseline
    pub baseline: f32,
    /// Text drawn by this piece; empty for inline boxes
    pub text: String,
    /// Carries the box's start edge (left border, padding, margin)
    pub start_edge: bool,
    pub end_edge: bool,
}

/// A box in the layout tree
#[derive(Debug, Clone)]
pub struct LayoutBox {
    pub box_type: BoxType,
    /// Element or text node that generated the box; `None` for anonymous boxes
    pub dom_node: Option<NodeId>,
    pub pseudo: Option<PseudoElement>,
    pub style: Arc<ComputedStyle>,
    pub dimensions: BoxDimensions,
    /// Used borders, top, right, bottom, left
    pub borders: [BorderSide; 4],
    pub content: BoxContent,
    pub fragments: Vec<Fragment>,
    pub font: Option<Font>,
    /// Baselines of the first and last line boxes inside
    pub first_baseline: Option<f32>,
    pub last_baseline: Option<f32>,
    /// Where an absolutely positioned box would have been in normal flow
    pub static_position: Option<(f32, f32)>,
    pub parent: Option<LayoutBoxId>,
    pub children: Vec<LayoutBoxId>,
}

impl LayoutBox {
    pub fn new(box_type: BoxType, style: Arc<ComputedStyle>, dom_node: Option<NodeId>) -> Self {
        let borders = [style.border_top, style.border_right, style.border_bottom, style.border_left];
        Self {
            box_type,
            dom_node,
            pseudo: None,
            style,
            dimensions: BoxDimensions::default(),
            borders,
            content: BoxContent::None,
            fragments: Vec::new(),
            font: None,
            first_baseline: None,
            last_baseline: None,
            static_position: None,
            parent: None,
            children: Vec::new(),
        }
    }

    /// Generated by an element (or pseudo-element) rather than by text or
    /// as a marker; only these boxes honour their own position and float
    pub fn is_element_box(&self) -> bool {
        !matches!(self.box_type, BoxType::Text | BoxType::LineBreak | BoxType::Marker)
    }

    /// Floated or absolutely positioned
    pub fn is_out_of_flow(&self) -> bool {
        self.is_element_box() && (self.style.is_floating() || self.style.position.is_out_of_flow())
    }

    /// Takes part in an inline formatting context
    pub fn is_inline_level(&self) -> bool {
        match self.box_type {
            BoxType::Inline | BoxType::InlineBlock | BoxType::Text | BoxType::LineBreak => true,
            BoxType::Image => self.style.display.is_inline_level(),
            BoxType::Table => self.style.display == Display::InlineTable,
            BoxType::Marker => self.style.list_style_position == ListStylePosition::Inside,
            _ => false,
        }
    }

    /// Laid out as a unit inside a line
    pub fn is_atomic_inline(&self) -> bool {
        matches!(self.box_type, BoxType::InlineBlock | BoxType::Image | BoxType::Table)
            && self.is_inline_level()
    }

    /// Area used for painting and hit-testing
    pub fn bounds(&self) -> Rect {
        match self.box_type {
            BoxType::Inline | BoxType::Text | BoxType::LineBreak if !self.fragments.is_empty() => self
                .fragments
                .iter()
                .skip(1)
                .fold(self.fragments[0].rect, |acc, f| acc.union(&f.rect)),
            BoxType::Marker | BoxType::Text | BoxType::LineBreak => self.dimensions.content,
            _ => self.dimensions.border_box(),
        }
    }
}

/// Layout tree
#[derive(Debug, Default)]
pub struct LayoutTree {
    boxes: Vec<LayoutBox>,
    root: Option<LayoutBoxId>,
    fixed: Vec<LayoutBoxId>,
    width: f32,
    height: f32,
}

impl LayoutTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_box(&mut self, layout_box: LayoutBox) -> LayoutBoxId {
        let id = LayoutBoxId(self.boxes.len() as u32);
        self.boxes.push(layout_box);
        id
    }

    pub fn append_child(&mut self, parent: LayoutBoxId, child: LayoutBoxId) {
        self.boxes[child.index()].parent = Some(parent);
        self.boxes[parent.index()].children.push(child);
    }

    /// Replace the child list of `parent`, re-parenting every new child
    pub(crate) fn set_children(&mut self, parent: LayoutBoxId, children: Vec<LayoutBoxId>) {
        for child in &children {
            self.boxes[child.index()].parent = Some(parent);
        }
        self.boxes[parent.index()].children = children;
    }

    pub fn root(&self) -> Option<LayoutBoxId> {
        self.root
    }

    pub(crate) fn set_root(&mut self, root: LayoutBoxId) {
        self.root = Some(root);
    }

    pub fn get(&self, id: LayoutBoxId) -> Option<&LayoutBox> {
        self.boxes.get(id.index())
    }

    pub fn get_mut(&mut self, id: LayoutBoxId) -> Option<&mut LayoutBox> {
        self.boxes.get_mut(id.index())
    }

    pub fn children(&self, id: LayoutBoxId) -> &[LayoutBoxId] {
        self.get(id).map(|b| b.children.as_slice()).unwrap_or(&[])
    }

    /// Boxes reachable from the root, parents before children
    pub fn descendants(&self, id: LayoutBoxId) -> Vec<LayoutBoxId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev());
        }
        out
    }

    /// Every box in the rendered tree
    pub fn iter(&self) -> impl Iterator<Item = (LayoutBoxId, &LayoutBox)> {
        self.root
            .map(|root| self.descendants(root))
            .unwrap_or_default()
            .into_iter()
            .map(move |id| (id, &self.boxes[id.index()]))
    }

    /// Number of allocated boxes
    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Move a box, everything inside it and its line fragments
    pub fn translate_subtree(&mut self, id: LayoutBoxId, dx: f32, dy: f32) {
        if dx == 0.0 && dy == 0.0 {
            return;
        }
        for next in self.descendants(id) {
            let b = &mut self.boxes[next.index()];
            b.dimensions.content = b.dimensions.content.translate(dx, dy);
            for fragment in &mut b.fragments {
                fragment.rect = fragment.rect.translate(dx, dy);
                fragment.baseline += dy;
            }
            b.first_baseline = b.first_baseline.map(|y| y + dy);
            b.last_baseline = b.last_baseline.map(|y| y + dy);
            b.static_position = b.static_position.map(|(x, y)| (x + dx, y + dy));
        }
    }

    /// `position: fixed` boxes, in tree order
    pub fn fixed_boxes(&self) -> &[LayoutBoxId] {
        &self.fixed
    }

    pub(crate) fn set_fixed(&mut self, fixed: Vec<LayoutBoxId>) {
        self.fixed = fixed;
    }

    /// Document width after layout
    pub fn width(&self) -> f32 {
        self.width
    }

    /// Document height after layout
    pub fn height(&self) -> f32 {
        self.height
    }

    pub(crate) fn set_extent(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
    }

    /// Boxes generated by `node`, including text and pseudo-element boxes
    pub fn boxes_for_node(&self, node: NodeId) -> Vec<LayoutBoxId> {
        self.iter().filter(|(_, b)| b.dom_node == Some(node)).map(|(id, _)| id).collect()
    }

    /// Union of the bounds of every box per generating node
    pub fn bounds_by_node(&self) -> HashMap<NodeId, Rect> {
        let mut out: HashMap<NodeId, Rect> = HashMap::new();
        for (_, b) in self.iter() {
            let Some(node) = b.dom_node else { continue };
            let bounds = b.bounds();
            out.entry(node).and_modify(|r| *r = r.union(&bounds)).or_insert(bounds);
        }
        out
    }
}

impl Index<LayoutBoxId> for LayoutTree {
    type Output = LayoutBox;

    fn index(&self, id: LayoutBoxId) -> &LayoutBox {
        &self.boxes[id.index()]
    }
}

impl IndexMut<LayoutBoxId> for LayoutTree {
    fn index_mut(&mut self, id: LayoutBoxId) -> &mut LayoutBox {
        &mut self.boxes[id.index()]
    }
}
