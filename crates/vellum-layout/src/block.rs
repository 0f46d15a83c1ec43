//! Block formatting: vertical flow, margin collapsing, floats and list
//! markers

use vellum_css::Clear;
use vellum_dom::Rect;

use crate::engine::{Containing, Layouter, WidthMode, is_zero};
use crate::floats::FloatContext;
use crate::markers::bullet_rect;
use crate::{BoxContent, BoxType, LayoutBoxId, Size};

/// Set of adjoining margins. Positive and negative parts collapse
/// separately: the result is the largest positive plus the most negative.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct MarginStrut {
    positive: f32,
    negative: f32,
}

impl MarginStrut {
    pub(crate) fn new(margin: f32) -> Self {
        if margin >= 0.0 {
            Self { positive: margin, negative: 0.0 }
        } else {
            Self { positive: 0.0, negative: margin }
        }
    }

    pub(crate) fn adjoin(self, other: MarginStrut) -> Self {
        Self { positive: self.positive.max(other.positive), negative: self.negative.min(other.negative) }
    }

    pub(crate) fn resolve(self) -> f32 {
        self.positive + self.negative
    }
}

/// Outcome of placing one in-flow block
struct Flow {
    /// Bottom border edge
    bottom: f32,
    /// Margins that may still collapse with what follows
    bottom_margin: MarginStrut,
    /// Empty box whose top and bottom margins collapsed together
    collapsed_through: bool,
}

impl Layouter<'_> {
    /// Lay out the children of a block container whose content box is
    /// `cb`. Returns the bottom of the last in-flow content and the
    /// margins hanging below it.
    pub(crate) fn layout_contents(
        &mut self,
        id: LayoutBoxId,
        cb: &Containing,
        floats: &mut FloatContext,
        skip_first_margin: bool,
    ) -> (f32, MarginStrut) {
        if self.has_block_children(id) {
            let result = self.layout_block_children(id, cb, floats, skip_first_margin);
            self.propagate_baselines(id);
            result
        } else {
            (self.layout_inline(id, floats), MarginStrut::default())
        }
    }

    pub(crate) fn has_block_children(&self, id: LayoutBoxId) -> bool {
        self.tree.children(id).iter().any(|c| {
            let b = &self.tree[*c];
            !b.is_inline_level() && !b.is_out_of_flow() && b.box_type != BoxType::Marker
        })
    }

    fn layout_block_children(
        &mut self,
        id: LayoutBoxId,
        cb: &Containing,
        floats: &mut FloatContext,
        skip_first_margin: bool,
    ) -> (f32, MarginStrut) {
        let mut cursor = cb.y;
        let mut pending = MarginStrut::default();
        let mut skip = skip_first_margin;

        for child in self.tree.children(id).to_vec() {
            let b = &self.tree[child];
            if b.box_type == BoxType::Marker {
                continue;
            }
            if b.is_element_box() && b.style.position.is_out_of_flow() {
                self.tree[child].static_position = Some((cb.x, cursor + pending.resolve()));
                self.absolutes.push_back(child);
                continue;
            }
            if b.is_element_box() && b.style.is_floating() {
                self.layout_float(child, cb, floats, cursor + pending.resolve());
                continue;
            }

            let top = if skip { MarginStrut::default() } else { self.effective_top_margin(child, cb.width) };
            skip = false;
            let mut y = cursor + pending.adjoin(top).resolve();
            let clear = self.tree[child].style.clear;
            if let Some(clearance) = floats.clearance(clear) {
                y = y.max(clearance);
            }

            let flow = self.layout_flow_block(child, cb, y, floats);
            if flow.collapsed_through {
                pending = pending.adjoin(top).adjoin(flow.bottom_margin);
            } else {
                cursor = flow.bottom;
                pending = flow.bottom_margin;
            }
        }
        (cursor, pending)
    }

    /// Place an in-flow block-level box with its top border edge at `y`
    fn layout_flow_block(&mut self, id: LayoutBoxId, cb: &Containing, y: f32, floats: &mut FloatContext) -> Flow {
        let b = &self.tree[id];
        let detached = b.style.establishes_bfc() || matches!(b.box_type, BoxType::Table | BoxType::Image);
        if detached {
            return self.layout_flow_detached(id, cb, y, floats);
        }

        let auto = self.resolve_edges(id, cb.width);
        let dims = self.tree[id].dimensions;
        let width = match self.specified_width(id, cb.width) {
            Some(w) => w,
            None => self.clamp_width(id, (cb.width - dims.horizontal_extra()).max(0.0), cb.width),
        };
        self.apply_auto_margins(id, cb.width, width, auto);

        let skip_first = self.collapses_top(id);
        let dims = &mut self.tree[id].dimensions;
        dims.content.width = width;
        dims.content.x = cb.x + dims.margin.left + dims.border.left + dims.padding.left;
        dims.content.y = y + dims.border.top + dims.padding.top;
        let content = dims.content;
        let own_bottom = MarginStrut::new(dims.margin.bottom);

        let specified = self.specified_height(id, cb);
        let inner = Containing { x: content.x, y: content.y, width, height: specified };
        let (bottom, pending) = self.layout_contents(id, &inner, floats, skip_first);

        let (height, bottom_margin, collapsed_bottom) = match specified {
            Some(h) => (h, own_bottom, false),
            None if self.collapses_bottom(id) => {
                let auto_height = (bottom - content.y).max(0.0);
                let height = self.clamp_height(id, auto_height, cb);
                if height == auto_height {
                    (height, pending.adjoin(own_bottom), true)
                } else {
                    (height, own_bottom, false)
                }
            }
            None => {
                let auto_height = (bottom + pending.resolve() - content.y).max(0.0);
                (self.clamp_height(id, auto_height, cb), own_bottom, false)
            }
        };

        self.tree[id].dimensions.content.height = height;
        self.place_marker(id);

        let dims = self.tree[id].dimensions;
        let has_lines = self.tree[id].first_baseline.is_some();
        Flow {
            bottom: dims.border_box().bottom(),
            bottom_margin,
            collapsed_through: skip_first && collapsed_bottom && height == 0.0 && bottom <= content.y && !has_lines,
        }
    }

    /// Block-level box that starts a new formatting context: laid out on
    /// its own, then moved beside the floats at `y`
    fn layout_flow_detached(&mut self, id: LayoutBoxId, cb: &Containing, y: f32, floats: &mut FloatContext) -> Flow {
        let (left, right) = floats.band(y, 0.0, cb.x, cb.x + cb.width);
        let mode = if self.tree[id].box_type == BoxType::Table { WidthMode::ShrinkToFit } else { WidthMode::Fill };
        let local = Containing { x: 0.0, y: 0.0, width: right - left, height: cb.height };
        let size = self.layout_detached(id, &local, mode, None);
        let margin = self.tree[id].dimensions.margin;
        self.tree.translate_subtree(id, left, y - margin.top);
        Flow {
            bottom: y - margin.top + size.height - margin.bottom,
            bottom_margin: MarginStrut::new(margin.bottom),
            collapsed_through: false,
        }
    }

    /// Lay out a float and place it no higher than `y`
    pub(crate) fn layout_float(&mut self, id: LayoutBoxId, cb: &Containing, floats: &mut FloatContext, y: f32) {
        let local = Containing { x: 0.0, y: 0.0, width: cb.width, height: cb.height };
        let size = self.layout_detached(id, &local, WidthMode::ShrinkToFit, None);
        self.place_float(id, size, cb, floats, y);
    }

    /// Move a float laid out at the origin to its place in `floats`
    pub(crate) fn place_float(&mut self, id: LayoutBoxId, size: Size, cb: &Containing, floats: &mut FloatContext, y: f32) {
        let style = self.style(id);
        let y = floats.clearance(style.clear).map_or(y, |c| y.max(c));
        let (x, y) = floats.place(style.float, size.width, size.height, y, cb.x, cb.x + cb.width);
        self.tree.translate_subtree(id, x, y);
    }

    /// Top margin of a block after collapsing with its first in-flow
    /// descendants
    fn effective_top_margin(&mut self, id: LayoutBoxId, cb_width: f32) -> MarginStrut {
        let margin = self.tree[id].style.margin.top;
        let mut strut = MarginStrut::new(self.px(id, margin, cb_width));
        if self.collapses_top(id)
            && let Some(first) = self.first_in_flow_child(id)
            && self.tree[first].style.clear == Clear::None
        {
            strut = strut.adjoin(self.effective_top_margin(first, cb_width));
        }
        strut
    }

    fn first_in_flow_child(&self, id: LayoutBoxId) -> Option<LayoutBoxId> {
        if !self.has_block_children(id) {
            return None;
        }
        self.tree.children(id).iter().copied().find(|c| {
            let b = &self.tree[*c];
            b.box_type != BoxType::Marker && !b.is_out_of_flow()
        })
    }

    /// Top margin adjoins the first child's
    fn collapses_top(&self, id: LayoutBoxId) -> bool {
        let b = &self.tree[id];
        b.box_type == BoxType::Block
            && !b.style.establishes_bfc()
            && self.tree.root() != Some(id)
            && b.borders[0].used_width() == 0.0
            && is_zero(b.style.padding.top)
    }

    /// Bottom margin adjoins the last child's
    fn collapses_bottom(&self, id: LayoutBoxId) -> bool {
        let b = &self.tree[id];
        b.box_type == BoxType::Block
            && !b.style.establishes_bfc()
            && self.tree.root() != Some(id)
            && b.borders[2].used_width() == 0.0
            && is_zero(b.style.padding.bottom)
            && b.style.height.is_auto()
    }

    fn propagate_baselines(&mut self, id: LayoutBoxId) {
        let in_flow: Vec<LayoutBoxId> = self
            .tree
            .children(id)
            .iter()
            .copied()
            .filter(|c| {
                let b = &self.tree[*c];
                !b.is_out_of_flow() && b.box_type != BoxType::Marker
            })
            .collect();
        let first = in_flow.iter().find_map(|c| self.tree[*c].first_baseline);
        let last = in_flow.iter().rev().find_map(|c| self.tree[*c].last_baseline);
        let b = &mut self.tree[id];
        b.first_baseline = first;
        b.last_baseline = last;
    }

    /// Position an outside list marker against the item's first line
    pub(crate) fn place_marker(&mut self, item: LayoutBoxId) {
        let marker = self.tree.children(item).iter().copied().find(|c| {
            let b = &self.tree[*c];
            b.box_type == BoxType::Marker && !b.is_inline_level()
        });
        let Some(marker) = marker else { return };
        let BoxContent::Marker(data) = self.tree[marker].content.clone() else { return };

        let content = self.tree[item].dimensions.content;
        let font = self.font(marker);
        let baseline = self.tree[item].first_baseline.unwrap_or(content.y + font.metrics.ascent);
        let space = self.fonts.text_width(self.host, &font, " ");

        let image = data.image.as_deref().and_then(|url| self.image_size(url));
        let rect = if let Some(size) = image {
            Rect::new(content.x - size.width - space, baseline - size.height, size.width, size.height)
        } else if let Some(text) = &data.text {
            let width = self.fonts.text_width(self.host, &font, text);
            let height = font.metrics.ascent + font.metrics.descent;
            Rect::new(content.x - space - width, baseline - font.metrics.ascent, width, height)
        } else {
            bullet_rect(content.x - font.size, baseline, &font)
        };

        let b = &mut self.tree[marker];
        b.dimensions.content = rect;
        b.first_baseline = Some(baseline);
        b.last_baseline = Some(baseline);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_margin_strut() {
        let strut = MarginStrut::new(20.0).adjoin(MarginStrut::new(30.0));
        assert_eq!(strut.resolve(), 30.0);
        let mixed = strut.adjoin(MarginStrut::new(-10.0)).adjoin(MarginStrut::new(-5.0));
        assert_eq!(mixed.resolve(), 20.0);
        assert_eq!(MarginStrut::new(-4.0).adjoin(MarginStrut::default()).resolve(), -4.0);
    }
}
