//! Layout pass driver and shared box-sizing helpers

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use vellum_css::{BoxSizing, ComputedStyle, Length, LengthContext, Position};
use vellum_dom::{DomTree, EdgeSizes, Rect};

use crate::floats::FloatContext;
use crate::{BoxContent, BoxType, Font, FontCache, ImageCache, LayoutBoxId, LayoutContext, LayoutHost, LayoutTree, Size};

/// Containing block of the boxes being laid out
#[derive(Debug, Clone, Copy)]
pub(crate) struct Containing {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    /// Only known when the height does not depend on content
    pub height: Option<f32>,
}

impl Containing {
    pub(crate) fn from_rect(rect: Rect) -> Self {
        Self { x: rect.x, y: rect.y, width: rect.width, height: Some(rect.height) }
    }
}

/// How a box laid out on its own picks its width when `width` is `auto`
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum WidthMode {
    /// Fill the containing block
    Fill,
    ShrinkToFit,
    /// Border box width imposed from outside (table cells)
    BorderBox(f32),
}

pub(crate) struct Layouter<'a> {
    pub(crate) tree: &'a mut LayoutTree,
    pub(crate) dom: &'a DomTree,
    pub(crate) host: &'a dyn LayoutHost,
    pub(crate) fonts: &'a mut FontCache,
    pub(crate) images: &'a mut ImageCache,
    load_images: bool,
    pub(crate) viewport: Rect,
    pub(crate) px_per_pt: f32,
    /// Layout width of the document
    pub(crate) width: f32,
    /// Content-box min/max-content widths, valid for one pass
    pub(crate) intrinsic: HashMap<LayoutBoxId, (f32, f32)>,
    /// Absolutely positioned boxes waiting for their containing block
    pub(crate) absolutes: VecDeque<LayoutBoxId>,
}

impl<'a> Layouter<'a> {
    pub(crate) fn new(tree: &'a mut LayoutTree, dom: &'a DomTree, cx: &'a mut LayoutContext<'_>) -> Self {
        let host = cx.host;
        Self {
            tree,
            dom,
            host,
            fonts: &mut *cx.fonts,
            images: &mut *cx.images,
            load_images: cx.load_images,
            viewport: host.viewport(),
            px_per_pt: host.pt_to_px(1.0),
            width: 0.0,
            intrinsic: HashMap::new(),
            absolutes: VecDeque::new(),
        }
    }

    pub(crate) fn run(mut self, width: f32) {
        self.width = width;
        let Some(root) = self.tree.root() else {
            self.tree.set_extent(width, 0.0);
            return;
        };

        let icb = Containing { x: 0.0, y: 0.0, width, height: Some(self.viewport.height) };
        let size = self.layout_detached(root, &icb, WidthMode::Fill, None);
        self.layout_absolutes();
        self.apply_relative_offsets();

        let mut extent = Rect::new(0.0, 0.0, width.max(size.width), size.height);
        for (_, b) in self.tree.iter() {
            if b.is_element_box() && b.style.position == Position::Absolute {
                extent = extent.union(&b.dimensions.margin_box());
            }
        }
        let fixed = self
            .tree
            .iter()
            .filter(|(_, b)| b.is_element_box() && b.style.position == Position::Fixed)
            .map(|(id, _)| id)
            .collect();
        self.tree.set_fixed(fixed);
        self.tree.set_extent(extent.right().max(width), extent.bottom());
    }

    /// Length context for `style` with the host's point size
    pub(crate) fn length_ctx(&mut self, id: LayoutBoxId, percent_base: f32) -> LengthContext {
        let font = self.font(id);
        let style = &self.tree[id].style;
        LengthContext {
            em: style.font_size,
            ex: font.metrics.x_height,
            percent_base,
            px_per_pt: self.px_per_pt,
        }
    }

    pub(crate) fn px(&mut self, id: LayoutBoxId, length: Length, percent_base: f32) -> f32 {
        let ctx = self.length_ctx(id, percent_base);
        length.to_px(&ctx)
    }

    /// Font of a box, requested from the host on first use
    pub(crate) fn font(&mut self, id: LayoutBoxId) -> Font {
        if let Some(font) = self.tree[id].font {
            return font;
        }
        let style = Arc::clone(&self.tree[id].style);
        let font = self.fonts.font(self.host, &style);
        self.tree[id].font = Some(font);
        font
    }

    pub(crate) fn style(&self, id: LayoutBoxId) -> Arc<ComputedStyle> {
        Arc::clone(&self.tree[id].style)
    }

    /// Resolve margins, borders and padding against `cb_width`. Auto
    /// margins become zero; the returned flags say which horizontal ones
    /// were auto.
    pub(crate) fn resolve_edges(&mut self, id: LayoutBoxId, cb_width: f32) -> (bool, bool) {
        let style = self.style(id);
        let ctx = self.length_ctx(id, cb_width);
        let edge = |l: Length| l.to_px(&ctx);
        let margin = EdgeSizes {
            top: edge(style.margin.top),
            right: edge(style.margin.right),
            bottom: edge(style.margin.bottom),
            left: edge(style.margin.left),
        };
        let padding = EdgeSizes {
            top: edge(style.padding.top).max(0.0),
            right: edge(style.padding.right).max(0.0),
            bottom: edge(style.padding.bottom).max(0.0),
            left: edge(style.padding.left).max(0.0),
        };
        let [top, right, bottom, left] = self.tree[id].borders.map(|b| b.used_width());
        let dims = &mut self.tree[id].dimensions;
        dims.margin = margin;
        dims.padding = padding;
        dims.border = EdgeSizes { top, right, bottom, left };
        (style.margin.left.is_auto(), style.margin.right.is_auto())
    }

    /// Used content width from `width`, `box-sizing` and min/max; `None`
    /// when `width` is auto
    pub(crate) fn specified_width(&mut self, id: LayoutBoxId, cb_width: f32) -> Option<f32> {
        let style = self.style(id);
        if style.width.is_auto() {
            return None;
        }
        let mut w = self.px(id, style.width, cb_width);
        if style.box_sizing == BoxSizing::BorderBox {
            let dims = &self.tree[id].dimensions;
            w -= dims.padding.horizontal() + dims.border.horizontal();
        }
        Some(self.clamp_width(id, w.max(0.0), cb_width))
    }

    pub(crate) fn clamp_width(&mut self, id: LayoutBoxId, width: f32, cb_width: f32) -> f32 {
        let style = self.style(id);
        let extra = self.sizing_extra(id, &style, true);
        let mut w = width;
        let unresolved = style.max_width.is_percent() && cb_width <= 0.0;
        if style.max_width.predefined().is_none() && !unresolved {
            w = w.min(self.px(id, style.max_width, cb_width) - extra);
        }
        w.max(self.px(id, style.min_width, cb_width) - extra).max(0.0)
    }

    /// Used content height from `height`; `None` when it depends on content
    pub(crate) fn specified_height(&mut self, id: LayoutBoxId, cb: &Containing) -> Option<f32> {
        let style = self.style(id);
        if style.height.is_auto() || (style.height.is_percent() && cb.height.is_none()) {
            return None;
        }
        let h = self.px(id, style.height, cb.height.unwrap_or(0.0)) - self.sizing_extra(id, &style, false);
        Some(self.clamp_height(id, h.max(0.0), cb))
    }

    pub(crate) fn clamp_height(&mut self, id: LayoutBoxId, height: f32, cb: &Containing) -> f32 {
        let style = self.style(id);
        let extra = self.sizing_extra(id, &style, false);
        let base = cb.height.unwrap_or(0.0);
        let percent_unknown = |l: Length| l.is_percent() && cb.height.is_none();
        let mut h = height;
        if style.max_height.predefined().is_none() && !percent_unknown(style.max_height) {
            h = h.min(self.px(id, style.max_height, base) - extra);
        }
        if !percent_unknown(style.min_height) {
            h = h.max(self.px(id, style.min_height, base) - extra);
        }
        h.max(0.0)
    }

    /// Padding and border that `box-sizing: border-box` lengths include
    fn sizing_extra(&self, id: LayoutBoxId, style: &ComputedStyle, horizontal: bool) -> f32 {
        if style.box_sizing != BoxSizing::BorderBox {
            return 0.0;
        }
        let dims = &self.tree[id].dimensions;
        if horizontal {
            dims.padding.horizontal() + dims.border.horizontal()
        } else {
            dims.padding.vertical() + dims.border.vertical()
        }
    }

    /// Split the space left beside a box of content width `width` between
    /// its auto margins
    pub(crate) fn apply_auto_margins(&mut self, id: LayoutBoxId, cb_width: f32, width: f32, auto: (bool, bool)) {
        let dims = &mut self.tree[id].dimensions;
        let used = width + dims.padding.horizontal() + dims.border.horizontal();
        let free = cb_width - used - dims.margin.horizontal();
        match auto {
            (true, true) => {
                let half = (cb_width - used).max(0.0) / 2.0;
                dims.margin.left = half;
                dims.margin.right = half;
            }
            (true, false) => dims.margin.left = (free + dims.margin.left).max(0.0),
            (false, true) => dims.margin.right = free + dims.margin.right,
            (false, false) => {}
        }
    }

    /// Natural size of an image; pending and failed loads have none
    pub(crate) fn image_size(&mut self, url: &str) -> Option<Size> {
        let state = if self.load_images { Some(self.images.resolve(self.host, url)) } else { self.images.get(url) };
        state.and_then(|s| s.size())
    }

    /// Size of a replaced image box
    pub(crate) fn replaced_size(&mut self, id: LayoutBoxId, cb: &Containing) -> Size {
        let url = match &self.tree[id].content {
            BoxContent::Image { url } if !url.is_empty() => Some(url.clone()),
            _ => None,
        };
        let natural = url.and_then(|url| self.image_size(&url));
        let style = self.style(id);
        let width = self.specified_width(id, cb.width);
        let height = self.specified_height(id, cb);
        let size = match (width, height, natural) {
            (Some(w), Some(h), _) => Size::new(w, h),
            (Some(w), None, Some(n)) if n.width > 0.0 => Size::new(w, w * n.height / n.width),
            (None, Some(h), Some(n)) if n.height > 0.0 => Size::new(h * n.width / n.height, h),
            (Some(w), None, _) => Size::new(w, 0.0),
            (None, Some(h), _) => Size::new(0.0, h),
            (None, None, Some(n)) => {
                let w = self.clamp_width(id, n.width, cb.width);
                let h = if n.width > 0.0 { w * n.height / n.width } else { n.height };
                Size::new(w, self.clamp_height(id, h, cb))
            }
            (None, None, None) => Size::new(0.0, 0.0),
        };
        tracing::trace!(box_id = id.index(), ?size, display = ?style.display, "replaced size");
        size
    }

    /// Lay out a box that does not take part in its parent's margin
    /// collapsing or float context, with its margin box at the origin.
    /// Returns the margin box size; the caller moves the box into place.
    pub(crate) fn layout_detached(
        &mut self,
        id: LayoutBoxId,
        cb: &Containing,
        mode: WidthMode,
        height: Option<f32>,
    ) -> Size {
        let box_type = self.tree[id].box_type;
        if box_type == BoxType::Table {
            return self.layout_table(id, cb, mode);
        }

        let auto = self.resolve_edges(id, cb.width);
        if box_type == BoxType::TableCell {
            self.tree[id].dimensions.margin = EdgeSizes::ZERO;
        }

        if box_type == BoxType::Image {
            let size = self.replaced_size(id, cb);
            if mode == WidthMode::Fill {
                self.apply_auto_margins(id, cb.width, size.width, auto);
            }
            let dims = &mut self.tree[id].dimensions;
            dims.content.width = size.width;
            dims.content.height = size.height;
            dims.set_margin_origin(0.0, 0.0);
            let margin_box = dims.margin_box();
            return Size::new(margin_box.width, margin_box.height);
        }

        let dims = self.tree[id].dimensions;
        let avail = (cb.width - dims.horizontal_extra()).max(0.0);
        let width = match self.specified_width(id, cb.width) {
            Some(w) => {
                if mode == WidthMode::Fill {
                    self.apply_auto_margins(id, cb.width, w, auto);
                }
                w
            }
            None => {
                let w = match mode {
                    WidthMode::Fill => avail,
                    WidthMode::ShrinkToFit => {
                        let (min, pref) = self.content_widths(id);
                        pref.min(avail).max(min)
                    }
                    WidthMode::BorderBox(w) => (w - dims.padding.horizontal() - dims.border.horizontal()).max(0.0),
                };
                self.clamp_width(id, w, cb.width)
            }
        };

        let fixed_height = height.or_else(|| self.specified_height(id, cb));
        let dims = &mut self.tree[id].dimensions;
        dims.content.width = width;
        dims.set_margin_origin(0.0, 0.0);
        let content = dims.content;

        let inner = Containing { x: content.x, y: content.y, width, height: fixed_height };
        let mut floats = FloatContext::new();
        let (bottom, pending) = self.layout_contents(id, &inner, &mut floats, false);
        let mut content_height = bottom + pending.resolve() - content.y;
        if let Some(float_bottom) = floats.bottom() {
            content_height = content_height.max(float_bottom - content.y);
        }
        let content_height = match fixed_height {
            Some(h) => h,
            None => self.clamp_height(id, content_height.max(0.0), cb),
        };
        self.tree[id].dimensions.content.height = content_height;
        self.place_marker(id);

        let margin_box = self.tree[id].dimensions.margin_box();
        Size::new(margin_box.width, margin_box.height)
    }
}

/// True for lengths that are zero in any unit
pub(crate) fn is_zero(length: Length) -> bool {
    matches!(length, Length::Value(v, _) if v == 0.0)
}
