//! Paint Dispatch
//!
//! Walks a layout tree in CSS 2.1 Appendix E order and turns every box
//! into [`Surface`] calls. Each positioned box is painted as a layer:
//! its own background, negative `z-index` layers, block backgrounds,
//! floats, inline content, then the remaining layers by `z-index`.

use vellum_css::{BorderSide, ComputedStyle, Length, LengthUnit, Overflow, Position, Visibility};
use vellum_dom::{EdgeSizes, Rect};
use vellum_layout::{BoxContent, BoxType, Font, FontHandle, Fragment, LayoutBox, LayoutBoxId, LayoutTree};

use crate::surface::{
    BackgroundPaint, BorderEdge, BorderSegment, DecorationKind, DecorationLine, MarkerPaint, PositionComponent,
    Radii, Surface, TextRun,
};

/// Paint `tree` with document point `(0, 0)` at `offset` on the surface.
/// Boxes outside `clip` are skipped. Returns the number of surface calls.
pub fn paint<S: Surface + ?Sized>(tree: &LayoutTree, surface: &mut S, offset: (f32, f32), clip: Option<Rect>) -> usize {
    let Some(root) = tree.root() else { return 0 };
    let mut painter = Painter { tree, surface, dx: offset.0, dy: offset.1, clip, canvas_owner: None, calls: 0, order: None };
    painter.canvas_owner = painter.paint_canvas(root);
    painter.paint_layer(root);
    tracing::debug!(commands = painter.calls, "paint done");
    painter.calls
}

/// Visible boxes in the order [`paint`] draws them, bottom-most first.
/// A box may appear more than once; its last position counts.
pub fn paint_order(tree: &LayoutTree) -> Vec<LayoutBoxId> {
    let Some(root) = tree.root() else { return Vec::new() };
    let mut surface = NullSurface;
    let mut painter =
        Painter { tree, surface: &mut surface, dx: 0.0, dy: 0.0, clip: None, canvas_owner: None, calls: 0, order: Some(Vec::new()) };
    painter.canvas_owner = painter.paint_canvas(root);
    painter.paint_layer(root);
    painter.order.unwrap_or_default()
}

struct NullSurface;

impl Surface for NullSurface {
    fn fill_background(&mut self, _: &BackgroundPaint) {}
    fn draw_border_segment(&mut self, _: &BorderSegment) {}
    fn draw_text(&mut self, _: &TextRun) {}
    fn draw_decoration(&mut self, _: &DecorationLine) {}
    fn draw_image(&mut self, _: &str, _: Rect) {}
    fn draw_list_marker(&mut self, _: &MarkerPaint) {}
    fn push_clip(&mut self, _: Rect, _: Radii) {}
    fn pop_clip(&mut self) {}
}

struct Painter<'a, S: Surface + ?Sized> {
    tree: &'a LayoutTree,
    surface: &'a mut S,
    dx: f32,
    dy: f32,
    clip: Option<Rect>,
    /// Box whose background became the canvas background
    canvas_owner: Option<LayoutBoxId>,
    calls: usize,
    /// Boxes visited, when collecting paint order
    order: Option<Vec<LayoutBoxId>>,
}

fn has_background(style: &ComputedStyle) -> bool {
    !style.background.color.is_transparent() || style.background.image.is_some()
}

fn position_component(length: Length, style: &ComputedStyle) -> PositionComponent {
    match length {
        Length::Value(v, LengthUnit::Percent) => PositionComponent::Percent(v),
        _ => PositionComponent::Px(length.to_px(&style.length_context(0.0))),
    }
}

fn background_position(style: &ComputedStyle) -> (PositionComponent, PositionComponent) {
    let (x, y) = style.background.position;
    (position_component(x, style), position_component(y, style))
}

fn creates_layer(b: &LayoutBox) -> bool {
    b.is_element_box() && b.style.position.is_positioned()
}

fn clips_overflow(b: &LayoutBox) -> bool {
    b.is_element_box() && b.style.overflow != Overflow::Visible
}

impl<S: Surface + ?Sized> Painter<'_, S> {
    fn shift(&self, rect: Rect) -> Rect {
        rect.translate(self.dx, self.dy)
    }

    fn record(&mut self, id: LayoutBoxId) {
        if let Some(order) = &mut self.order {
            order.push(id);
        }
    }

    fn visible(&self, rect: Rect) -> bool {
        self.clip.is_none_or(|clip| clip.intersects(&rect))
    }

    /// Canvas background from the root element, or from `<body>` when the
    /// root has none. Returns the box whose background was used.
    fn paint_canvas(&mut self, root: LayoutBoxId) -> Option<LayoutBoxId> {
        let tree = self.tree;
        let owner = if has_background(&tree[root].style) {
            Some(root)
        } else {
            tree.children(root)
                .iter()
                .copied()
                .find(|c| {
                    let b = &tree[*c];
                    b.box_type == BoxType::Block && b.dom_node.is_some() && b.pseudo.is_none()
                })
                .filter(|c| has_background(&tree[*c].style))
        }?;
        let style = &tree[owner].style;
        let document = Rect::new(0.0, 0.0, tree.width(), tree.height());
        let rect = match self.clip {
            Some(clip) => clip.union(&self.shift(document)),
            None => self.shift(document),
        };
        let background = BackgroundPaint {
            rect,
            origin: self.shift(tree[root].dimensions.padding_box()),
            color: style.background.color,
            image: style.background.image.clone(),
            repeat: style.background.repeat,
            position: background_position(style),
            radii: [0.0; 4],
            is_root: true,
        };
        self.surface.fill_background(&background);
        self.calls += 1;
        Some(owner)
    }

    /// Paint a positioned box, or the root, with everything that belongs
    /// to its layer
    fn paint_layer(&mut self, id: LayoutBoxId) {
        let tree = self.tree;
        let mut layers = Vec::new();
        for child in tree.children(id) {
            self.collect_layers(*child, &mut layers);
        }
        let z = |l: &LayoutBoxId| tree[*l].style.z_index.unwrap_or(0);
        let mut negative: Vec<LayoutBoxId> = layers.iter().copied().filter(|l| z(l) < 0).collect();
        let mut rest: Vec<LayoutBoxId> = layers.iter().copied().filter(|l| z(l) >= 0).collect();
        negative.sort_by_key(z);
        rest.sort_by_key(z);

        self.paint_box_decorations(id);
        let clipped = self.push_overflow_clip(id);
        for layer in negative {
            self.paint_child_layer(id, layer);
        }
        self.paint_contents(id);
        for layer in rest {
            self.paint_child_layer(id, layer);
        }
        if clipped {
            self.pop_clip();
        }
    }

    /// Clips from overflow boxes between a layer and its parent layer.
    /// Only relatively positioned layers are inside them.
    fn paint_child_layer(&mut self, parent: LayoutBoxId, layer: LayoutBoxId) {
        let tree = self.tree;
        let mut pushed = 0;
        if tree[layer].style.position == Position::Relative {
            let mut clips = Vec::new();
            let mut next = tree[layer].parent;
            while let Some(ancestor) = next.filter(|a| *a != parent) {
                if clips_overflow(&tree[ancestor]) {
                    clips.push(ancestor);
                }
                next = tree[ancestor].parent;
            }
            for ancestor in clips.into_iter().rev() {
                if self.push_overflow_clip(ancestor) {
                    pushed += 1;
                }
            }
        }
        self.paint_layer(layer);
        for _ in 0..pushed {
            self.pop_clip();
        }
    }

    fn collect_layers(&self, id: LayoutBoxId, out: &mut Vec<LayoutBoxId>) {
        let tree = self.tree;
        if creates_layer(&tree[id]) {
            out.push(id);
            return;
        }
        for child in tree.children(id) {
            self.collect_layers(*child, out);
        }
    }

    /// Everything inside `id` that is not a separate layer, in the order
    /// blocks, floats, inline content
    fn paint_contents(&mut self, id: LayoutBoxId) {
        let tree = self.tree;
        let children = tree.children(id);
        for child in children {
            self.paint_blocks(*child);
        }
        for child in children {
            self.paint_floats(*child);
        }
        for child in children {
            self.paint_inlines(*child);
        }
    }

    /// Float or inline-block: painted as one unit, but its positioned
    /// descendants stay in the enclosing layer
    fn paint_atomic(&mut self, id: LayoutBoxId) {
        self.paint_box_decorations(id);
        let clipped = self.push_overflow_clip(id);
        self.paint_contents(id);
        if clipped {
            self.pop_clip();
        }
        if self.tree[id].box_type == BoxType::Image {
            self.paint_image(id);
        }
    }

    fn is_atomic(b: &LayoutBox) -> bool {
        b.is_element_box() && (b.style.is_floating() || b.is_atomic_inline()) && b.box_type != BoxType::Image
    }

    fn paint_blocks(&mut self, id: LayoutBoxId) {
        let tree = self.tree;
        let b = &tree[id];
        if creates_layer(b) || Self::is_atomic(b) || b.is_inline_level() || (b.is_element_box() && b.style.is_floating()) {
            return;
        }
        if matches!(b.box_type, BoxType::Text | BoxType::LineBreak | BoxType::Marker) {
            return;
        }
        self.paint_box_decorations(id);
        let clipped = self.push_overflow_clip(id);
        for child in tree.children(id) {
            self.paint_blocks(*child);
        }
        if clipped {
            self.pop_clip();
        }
    }

    fn paint_floats(&mut self, id: LayoutBoxId) {
        let tree = self.tree;
        let b = &tree[id];
        if creates_layer(b) || (b.is_atomic_inline() && !b.style.is_floating()) {
            return;
        }
        if b.is_element_box() && b.style.is_floating() {
            self.paint_atomic(id);
            return;
        }
        let clipped = self.push_overflow_clip(id);
        for child in tree.children(id) {
            self.paint_floats(*child);
        }
        if clipped {
            self.pop_clip();
        }
    }

    fn paint_inlines(&mut self, id: LayoutBoxId) {
        let tree = self.tree;
        let b = &tree[id];
        if creates_layer(b) || (b.is_element_box() && b.style.is_floating()) {
            return;
        }
        if Self::is_atomic(b) {
            self.paint_atomic(id);
            return;
        }
        match b.box_type {
            BoxType::Text => {
                self.paint_text(id);
                return;
            }
            BoxType::Marker => {
                self.paint_marker(id);
                return;
            }
            BoxType::Image => {
                if b.is_inline_level() {
                    self.paint_box_decorations(id);
                }
                self.paint_image(id);
                return;
            }
            BoxType::Inline => self.paint_inline_fragments(id),
            _ => {}
        }
        let clipped = self.push_overflow_clip(id);
        for child in tree.children(id) {
            self.paint_inlines(*child);
        }
        if clipped {
            self.pop_clip();
        }
    }

    fn push_overflow_clip(&mut self, id: LayoutBoxId) -> bool {
        let tree = self.tree;
        let b = &tree[id];
        if !clips_overflow(b) {
            return false;
        }
        let rect = self.shift(b.dimensions.padding_box());
        self.surface.push_clip(rect, b.style.border_radius);
        self.calls += 1;
        true
    }

    fn pop_clip(&mut self) {
        self.surface.pop_clip();
        self.calls += 1;
    }

    /// Background and borders of a block-level or atomic box
    fn paint_box_decorations(&mut self, id: LayoutBoxId) {
        let tree = self.tree;
        let b = &tree[id];
        if !b.is_element_box() || b.box_type == BoxType::Inline || b.style.visibility != Visibility::Visible {
            return;
        }
        self.record(id);
        let with_background = self.canvas_owner != Some(id);
        self.paint_decorations(b, b.dimensions.border_box(), (true, true), with_background);
    }

    fn paint_decorations(&mut self, b: &LayoutBox, border_box: Rect, edges: (bool, bool), with_background: bool) {
        let (start_edge, end_edge) = edges;
        let rect = self.shift(border_box);
        if !self.visible(rect) {
            return;
        }
        let style = &b.style;
        if with_background && has_background(style) {
            let padding = b.dimensions.padding_box();
            let background = BackgroundPaint {
                rect,
                origin: self.shift(Rect::new(
                    border_box.x + b.dimensions.border.left,
                    border_box.y + b.dimensions.border.top,
                    padding.width,
                    padding.height,
                )),
                color: style.background.color,
                image: style.background.image.clone(),
                repeat: style.background.repeat,
                position: background_position(style),
                radii: style.border_radius,
                is_root: false,
            };
            self.surface.fill_background(&background);
            self.calls += 1;
        }

        let [top, right, bottom, left] = b.borders;
        let sides: [(BorderEdge, BorderSide, bool); 4] = [
            (BorderEdge::Top, top, true),
            (BorderEdge::Right, right, end_edge),
            (BorderEdge::Bottom, bottom, true),
            (BorderEdge::Left, left, start_edge),
        ];
        let widths = EdgeSizes {
            top: top.used_width(),
            right: if end_edge { right.used_width() } else { 0.0 },
            bottom: bottom.used_width(),
            left: if start_edge { left.used_width() } else { 0.0 },
        };
        for (edge, side, present) in sides {
            if !present || !side.is_visible() {
                continue;
            }
            let segment =
                BorderSegment { edge, border_box: rect, widths, style: side.style, color: side.color, radii: style.border_radius };
            self.surface.draw_border_segment(&segment);
            self.calls += 1;
        }
    }

    /// One background and border piece per line the inline box touches
    fn paint_inline_fragments(&mut self, id: LayoutBoxId) {
        let tree = self.tree;
        let b = &tree[id];
        if b.style.visibility != Visibility::Visible {
            return;
        }
        self.record(id);
        for fragment in &b.fragments {
            self.paint_decorations(b, fragment.rect, (fragment.start_edge, fragment.end_edge), true);
        }
    }

    fn paint_text(&mut self, id: LayoutBoxId) {
        let tree = self.tree;
        let b = &tree[id];
        if b.style.visibility != Visibility::Visible {
            return;
        }
        self.record(id);
        let font = b.font;
        for fragment in &b.fragments {
            let rect = self.shift(fragment.rect);
            if fragment.text.is_empty() || !self.visible(rect) {
                continue;
            }
            let run = TextRun {
                text: fragment.text.clone(),
                font: font.map_or(FontHandle::FALLBACK, |f| f.handle),
                rect,
                baseline: fragment.baseline + self.dy,
                color: b.style.color,
            };
            self.surface.draw_text(&run);
            self.calls += 1;
            if let Some(font) = font {
                self.paint_text_decorations(b, fragment, &font);
            }
        }
    }

    fn paint_text_decorations(&mut self, b: &LayoutBox, fragment: &Fragment, font: &Font) {
        let decoration = b.style.text_decoration;
        let thickness = font.decoration_thickness();
        let baseline = fragment.baseline;
        let lines = [
            (decoration.underline, DecorationKind::Underline, baseline + thickness),
            (decoration.overline, DecorationKind::Overline, baseline - font.metrics.ascent),
            (decoration.line_through, DecorationKind::LineThrough, baseline - font.metrics.x_height / 2.0),
        ];
        for (on, kind, y) in lines {
            if !on {
                continue;
            }
            let line = DecorationLine {
                kind,
                rect: self.shift(Rect::new(fragment.rect.x, y, fragment.rect.width, thickness)),
                style: decoration.style,
                color: decoration.color,
            };
            self.surface.draw_decoration(&line);
            self.calls += 1;
        }
    }

    fn paint_image(&mut self, id: LayoutBoxId) {
        let tree = self.tree;
        let b = &tree[id];
        let BoxContent::Image { url } = &b.content else { return };
        let rect = self.shift(b.dimensions.content);
        if url.is_empty() || rect.is_empty() || b.style.visibility != Visibility::Visible || !self.visible(rect) {
            return;
        }
        self.record(id);
        self.surface.draw_image(url, rect);
        self.calls += 1;
    }

    fn paint_marker(&mut self, id: LayoutBoxId) {
        let tree = self.tree;
        let b = &tree[id];
        let BoxContent::Marker(data) = &b.content else { return };
        let rect = self.shift(b.dimensions.content);
        if b.style.visibility != Visibility::Visible || rect.is_empty() || !self.visible(rect) {
            return;
        }
        self.record(id);
        let marker = MarkerPaint {
            kind: data.kind,
            rect,
            color: b.style.color,
            text: data.text.clone(),
            image: data.image.clone(),
            font: b.font.map_or(FontHandle::FALLBACK, |f| f.handle),
            baseline: b.first_baseline.unwrap_or(rect.bottom() - self.dy) + self.dy,
        };
        self.surface.draw_list_marker(&marker);
        self.calls += 1;
    }
}
