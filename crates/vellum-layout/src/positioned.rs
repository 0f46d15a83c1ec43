//! Absolute, fixed and relative positioning

use std::collections::HashSet;

use vellum_css::{Length, Position};
use vellum_dom::Rect;

use crate::engine::{Containing, Layouter, WidthMode};
use crate::{BoxType, LayoutBoxId};

/// Used `left`, `right`, `top`, `bottom`; `None` for `auto`
#[derive(Debug, Clone, Copy)]
struct Insets {
    left: Option<f32>,
    right: Option<f32>,
    top: Option<f32>,
    bottom: Option<f32>,
}

impl Layouter<'_> {
    fn insets(&mut self, id: LayoutBoxId, width: f32, height: f32) -> Insets {
        let inset = self.tree[id].style.inset;
        let mut side = |l: Length, base: f32| (!l.is_auto()).then(|| self.px(id, l, base));
        Insets {
            left: side(inset.left, width),
            right: side(inset.right, width),
            top: side(inset.top, height),
            bottom: side(inset.bottom, height),
        }
    }

    /// Padding box of the nearest positioned ancestor, or the initial
    /// containing block
    fn absolute_containing_block(&self, id: LayoutBoxId) -> Rect {
        let icb = Rect::new(0.0, 0.0, self.width, self.viewport.height);
        if self.tree[id].style.position == Position::Fixed {
            return icb;
        }
        let mut next = self.tree[id].parent;
        while let Some(ancestor) = next {
            let b = &self.tree[ancestor];
            if b.is_element_box() && b.style.position.is_positioned() {
                return match b.box_type {
                    BoxType::Inline => b.bounds(),
                    _ => b.dimensions.padding_box(),
                };
            }
            next = b.parent;
        }
        icb
    }

    /// Lay out every queued absolutely positioned box. Boxes found inside
    /// them join the queue and are placed after their containing block.
    pub(crate) fn layout_absolutes(&mut self) {
        let mut done = HashSet::new();
        while let Some(id) = self.absolutes.pop_front() {
            if done.insert(id) {
                self.layout_absolute(id);
            }
        }
    }

    fn layout_absolute(&mut self, id: LayoutBoxId) {
        let area = self.absolute_containing_block(id);
        let cb = Containing::from_rect(area);
        let insets = self.insets(id, area.width, area.height);
        let auto = self.resolve_edges(id, area.width);
        let dims = self.tree[id].dimensions;
        let box_extra = dims.padding.horizontal() + dims.border.horizontal();
        let is_image = self.tree[id].box_type == BoxType::Image;

        let mode = match (self.specified_width(id, area.width), insets.left, insets.right) {
            _ if is_image || self.tree[id].box_type == BoxType::Table => WidthMode::ShrinkToFit,
            (Some(w), _, _) => WidthMode::BorderBox(w + box_extra),
            (None, Some(left), Some(right)) => {
                WidthMode::BorderBox((area.width - left - right - dims.margin.horizontal()).max(box_extra))
            }
            (None, left, right) => {
                let avail = area.width - left.unwrap_or(0.0) - right.unwrap_or(0.0) - dims.horizontal_extra();
                let (min, pref) = self.content_widths(id);
                let w = self.clamp_width(id, pref.min(avail.max(0.0)).max(min), area.width);
                WidthMode::BorderBox(w + box_extra)
            }
        };

        let height = match (insets.top, insets.bottom) {
            (Some(top), Some(bottom)) if self.tree[id].style.height.is_auto() && !is_image => {
                let fill = area.height - top - bottom - dims.vertical_extra();
                Some(self.clamp_height(id, fill.max(0.0), &cb))
            }
            _ => None,
        };

        let local = Containing { x: 0.0, y: 0.0, width: area.width, height: Some(area.height) };
        let mut size = self.layout_detached(id, &local, mode, height);

        // Auto margins centre a box pinned on both sides
        if let (Some(left), Some(right)) = (insets.left, insets.right)
            && (auto.0 || auto.1)
        {
            let border_width = self.tree[id].dimensions.border_box().width;
            let free = area.width - left - right - border_width;
            let dims = &mut self.tree[id].dimensions;
            let (old_left, old_right) = (dims.margin.left, dims.margin.right);
            match auto {
                (true, true) if free >= 0.0 => {
                    dims.margin.left = free / 2.0;
                    dims.margin.right = free / 2.0;
                }
                (true, false) => dims.margin.left = free - dims.margin.right,
                (false, true) | (true, true) => dims.margin.right = free - dims.margin.left,
                (false, false) => {}
            }
            let shift = dims.margin.left - old_left;
            size.width += dims.margin.left + dims.margin.right - old_left - old_right;
            self.tree.translate_subtree(id, shift, 0.0);
        }

        let (static_x, static_y) = self.tree[id].static_position.unwrap_or((area.x, area.y));
        let x = match (insets.left, insets.right) {
            (Some(left), _) => area.x + left,
            (None, Some(right)) => area.right() - right - size.width,
            (None, None) => static_x,
        };
        let y = match (insets.top, insets.bottom) {
            (Some(top), _) => area.y + top,
            (None, Some(bottom)) => area.bottom() - bottom - size.height,
            (None, None) => static_y,
        };
        self.tree.translate_subtree(id, x, y);
        tracing::trace!(box_id = id.index(), x, y, width = size.width, height = size.height, "absolute placed");
    }

    /// Shift `position: relative` boxes and their contents by their
    /// offsets once everything else is placed
    pub(crate) fn apply_relative_offsets(&mut self) {
        let relative: Vec<LayoutBoxId> = self
            .tree
            .iter()
            .filter(|(_, b)| b.is_element_box() && b.style.position == Position::Relative)
            .map(|(id, _)| id)
            .collect();
        for id in relative {
            let parent = self.tree[id].parent.map(|p| self.tree[p].dimensions.content);
            let area = parent.unwrap_or(Rect::new(0.0, 0.0, self.width, self.viewport.height));
            let insets = self.insets(id, area.width, area.height);
            let dx = insets.left.or(insets.right.map(|r| -r)).unwrap_or(0.0);
            let dy = insets.top.or(insets.bottom.map(|b| -b)).unwrap_or(0.0);
            self.tree.translate_subtree(id, dx, dy);
        }
    }
}
