//! Inline Layout
//!
//! Inline formatting context: white-space processing, greedy line
//! breaking around floats, horizontal alignment and baseline-relative
//! vertical alignment. Text becomes one fragment per text box per line;
//! inline boxes get one fragment per line they touch.

use std::collections::HashMap;
use std::rc::Rc;

use vellum_css::{TextAlign, VerticalAlign};
use vellum_dom::Rect;

use crate::engine::{Containing, Layouter, WidthMode};
use crate::floats::FloatContext;
use crate::markers::bullet_rect;
use crate::{BoxContent, BoxType, Font, Fragment, LayoutBoxId, Size};

/// Spaces a preserved tab advances by
const TAB_SPACES: usize = 8;
/// Slack when comparing widths
const EPSILON: f32 = 0.01;

/// Whether atomic inlines are laid out or only measured
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum CollectMode {
    Layout,
    Intrinsic,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ItemKind {
    Word(String),
    Space { text: String, collapsible: bool },
    /// Left margin, border and padding of an inline box
    Start,
    End,
    /// Laid out on its own at the origin; `baseline` is measured from the
    /// top margin edge
    Atomic { height: f32, baseline: f32, min: f32 },
    /// Forced line break
    Break,
    Float { min: f32 },
    Absolute,
    Marker,
}

/// One unit of inline content
#[derive(Debug, Clone)]
pub(crate) struct InlineItem {
    pub owner: LayoutBoxId,
    /// Inline boxes enclosing the item, outermost first
    pub ancestors: Rc<[LayoutBoxId]>,
    pub kind: ItemKind,
    pub width: f32,
    /// A line may break after this item
    pub wraps: bool,
}

impl InlineItem {
    /// Gives the line it sits on a height
    fn is_content(&self) -> bool {
        match &self.kind {
            ItemKind::Word(_) | ItemKind::Atomic { .. } | ItemKind::Break | ItemKind::Marker => true,
            ItemKind::Space { collapsible, .. } => !collapsible,
            ItemKind::Start | ItemKind::End => self.width > 0.0,
            ItemKind::Float { .. } | ItemKind::Absolute => false,
        }
    }

    fn is_collapsible_space(&self) -> bool {
        matches!(self.kind, ItemKind::Space { collapsible: true, .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum ChunkKind {
    Content,
    Break,
    Float,
    Absolute,
}

/// Items between two break opportunities
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Chunk {
    pub start: usize,
    pub end: usize,
    pub kind: ChunkKind,
    pub width: f32,
    /// Min-content width, trailing spaces excluded
    pub min: f32,
    /// Width of trailing spaces that hang at a line end
    pub trailing: f32,
}

/// Split items into unbreakable chunks
pub(crate) fn chunk_items(items: &[InlineItem]) -> Vec<Chunk> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut has_content = false;

    let close = |out: &mut Vec<Chunk>, start: usize, end: usize, kind: ChunkKind| {
        if start >= end {
            return;
        }
        let slice = &items[start..end];
        let width = slice.iter().map(|i| i.width).sum::<f32>();
        let trailing = slice.iter().rev().take_while(|i| matches!(i.kind, ItemKind::Space { .. })).map(|i| i.width).sum();
        let min = slice
            .iter()
            .map(|i| match i.kind {
                ItemKind::Atomic { min, .. } | ItemKind::Float { min } => min,
                _ => i.width,
            })
            .sum::<f32>()
            - trailing;
        out.push(Chunk { start, end, kind, width, min, trailing });
    };

    for (i, item) in items.iter().enumerate() {
        let single = match item.kind {
            ItemKind::Break => Some(ChunkKind::Break),
            ItemKind::Float { .. } => Some(ChunkKind::Float),
            ItemKind::Absolute => Some(ChunkKind::Absolute),
            _ => None,
        };
        if let Some(kind) = single {
            close(&mut out, start, i, ChunkKind::Content);
            close(&mut out, i, i + 1, kind);
            start = i + 1;
            has_content = false;
            continue;
        }
        if matches!(item.kind, ItemKind::Atomic { .. }) && item.wraps && has_content {
            close(&mut out, start, i, ChunkKind::Content);
            start = i;
            has_content = false;
        }
        if item.is_content() {
            has_content = true;
        }
        if item.wraps {
            close(&mut out, start, i + 1, ChunkKind::Content);
            start = i + 1;
            has_content = false;
        }
    }
    close(&mut out, start, items.len(), ChunkKind::Content);
    out
}

/// Raise of a box's baseline above its parent's for `vertical-align`;
/// `above` and `below` are the box's extent around its own baseline
pub(crate) fn valign_raise(align: VerticalAlign, above: f32, below: f32, parent: &Font) -> f32 {
    match align {
        VerticalAlign::Baseline | VerticalAlign::Top | VerticalAlign::Bottom => 0.0,
        VerticalAlign::Sub => -0.2 * parent.size,
        VerticalAlign::Super => 0.35 * parent.size,
        VerticalAlign::TextTop => parent.metrics.ascent - above,
        VerticalAlign::TextBottom => below - parent.metrics.descent,
        VerticalAlign::Middle => parent.metrics.x_height / 2.0 - (above - below) / 2.0,
    }
}

/// Collection state while walking an inline formatting context
struct Collector {
    mode: CollectMode,
    /// Percentage base for inline box edges
    width: f32,
    items: Vec<InlineItem>,
    open: Vec<LayoutBoxId>,
    path: Rc<[LayoutBoxId]>,
    /// Previous item was collapsible white space, or we are at line start
    after_space: bool,
    /// Previous item was part of a word
    in_word: bool,
}

impl Collector {
    fn push(&mut self, owner: LayoutBoxId, kind: ItemKind, width: f32, wraps: bool) {
        self.items.push(InlineItem { owner, ancestors: Rc::clone(&self.path), kind, width, wraps });
    }
}

#[derive(Debug, Clone, Copy)]
struct Placed {
    item: usize,
    x: f32,
    width: f32,
}

/// A line being filled
#[derive(Debug)]
struct LineBox {
    y: f32,
    left: f32,
    right: f32,
    indent: f32,
    placed: Vec<Placed>,
    width: f32,
    has_content: bool,
}

impl LineBox {
    fn available(&self) -> f32 {
        self.right - self.left - self.indent
    }

    fn push(&mut self, index: usize, item: &InlineItem) {
        let collapsed = item.is_collapsible_space() && !self.has_content;
        let width = if collapsed { 0.0 } else { item.width };
        self.placed.push(Placed { item: index, x: self.width, width });
        self.width += width;
        if item.is_content() {
            self.has_content = true;
        }
    }
}

/// Per-container state shared by its lines
struct InlineFormattingContext {
    container: LayoutBoxId,
    content: Rect,
    items: Vec<InlineItem>,
    strut: (f32, f32),
    align: TextAlign,
    indent: f32,
    /// Cumulative baseline shift per box
    shifts: HashMap<LayoutBoxId, f32>,
    lines: usize,
}

impl InlineFormattingContext {
    fn strut_height(&self) -> f32 {
        self.strut.0 + self.strut.1
    }

    fn open_line(&self, floats: &FloatContext, y: f32) -> LineBox {
        let (left, right) = floats.band(y, self.strut_height(), self.content.x, self.content.right());
        LineBox {
            y,
            left,
            right,
            indent: if self.lines == 0 { self.indent } else { 0.0 },
            placed: Vec::new(),
            width: 0.0,
            has_content: false,
        }
    }

    /// Move an unfinished line down to `y`, keeping what it holds
    fn move_line(&self, line: &mut LineBox, floats: &FloatContext, y: f32) {
        let (left, right) = floats.band(y, self.strut_height(), self.content.x, self.content.right());
        line.y = y;
        line.left = left;
        line.right = right;
    }
}

/// Consecutive text of one box on one line
struct TextRun {
    owner: LayoutBoxId,
    x: f32,
    right: f32,
    text: String,
}

impl Layouter<'_> {
    /// Line-height box of a box's font around its baseline
    pub(crate) fn half_leading(&mut self, id: LayoutBoxId) -> (f32, f32) {
        let font = self.font(id);
        let style = &self.tree[id].style;
        let line_height = style.line_height.resolve(style.font_size, font.metrics.height);
        let leading = (line_height - font.metrics.ascent - font.metrics.descent) / 2.0;
        (font.metrics.ascent + leading, font.metrics.descent + leading)
    }

    /// Inline content of `container` as a flat item list
    pub(crate) fn inline_items(&mut self, container: LayoutBoxId, mode: CollectMode, width: f32) -> Vec<InlineItem> {
        let mut c = Collector {
            mode,
            width,
            items: Vec::new(),
            open: Vec::new(),
            path: Rc::from(Vec::new()),
            after_space: true,
            in_word: false,
        };
        self.collect_children(container, &mut c);
        c.items
    }

    fn collect_children(&mut self, parent: LayoutBoxId, c: &mut Collector) {
        let wraps = self.tree[parent].style.white_space.wraps();
        for child in self.tree.children(parent).to_vec() {
            let b = &self.tree[child];
            let box_type = b.box_type;
            if b.is_element_box() && b.style.position.is_out_of_flow() {
                c.push(child, ItemKind::Absolute, 0.0, false);
                continue;
            }
            if b.is_element_box() && b.style.is_floating() {
                let (width, min) = match c.mode {
                    CollectMode::Intrinsic => {
                        let (min, pref) = self.outer_widths(child);
                        (pref, min)
                    }
                    CollectMode::Layout => (0.0, 0.0),
                };
                c.push(child, ItemKind::Float { min }, width, false);
                continue;
            }
            let is_atomic = b.is_atomic_inline();
            let inline_marker = box_type == BoxType::Marker && b.is_inline_level();
            match box_type {
                BoxType::Text => self.collect_text(child, c),
                BoxType::LineBreak => {
                    c.push(child, ItemKind::Break, 0.0, false);
                    c.after_space = true;
                    c.in_word = false;
                }
                BoxType::Inline => {
                    self.resolve_edges(child, c.width);
                    let dims = self.tree[child].dimensions;
                    let start = dims.margin.left + dims.border.left + dims.padding.left;
                    let end = dims.margin.right + dims.border.right + dims.padding.right;
                    c.push(child, ItemKind::Start, start, false);
                    c.open.push(child);
                    c.path = Rc::from(c.open.as_slice());
                    self.collect_children(child, c);
                    c.open.pop();
                    c.path = Rc::from(c.open.as_slice());
                    c.push(child, ItemKind::End, end, false);
                }
                BoxType::Marker if inline_marker => {
                    let width = self.inline_marker_width(child);
                    c.push(child, ItemKind::Marker, width, false);
                    c.after_space = true;
                    c.in_word = false;
                }
                BoxType::Marker => {}
                _ if is_atomic => {
                    self.collect_atomic(child, c, wraps);
                }
                _ => {
                    tracing::debug!(box_id = child.index(), ?box_type, "block-level box in inline content");
                    self.collect_atomic(child, c, wraps);
                }
            }
        }
    }

    fn collect_atomic(&mut self, id: LayoutBoxId, c: &mut Collector, wraps: bool) {
        let kind_and_width = match c.mode {
            CollectMode::Intrinsic => {
                let (min, pref) = self.outer_widths(id);
                (ItemKind::Atomic { height: 0.0, baseline: 0.0, min }, pref)
            }
            CollectMode::Layout => {
                let cb = Containing { x: 0.0, y: 0.0, width: c.width, height: None };
                let size = self.layout_detached(id, &cb, WidthMode::ShrinkToFit, None);
                let baseline = self.atomic_baseline(id, size);
                (ItemKind::Atomic { height: size.height, baseline, min: size.width }, size.width)
            }
        };
        let (kind, width) = kind_and_width;
        c.push(id, kind, width, wraps);
        c.after_space = false;
        c.in_word = false;
    }

    /// Baseline of an atomic inline laid out at the origin, from its top
    /// margin edge
    fn atomic_baseline(&self, id: LayoutBoxId, size: Size) -> f32 {
        let b = &self.tree[id];
        let own = match b.box_type {
            BoxType::InlineBlock if b.style.overflow == vellum_css::Overflow::Visible => b.last_baseline,
            BoxType::Table => b.first_baseline,
            _ => None,
        };
        own.unwrap_or(size.height)
    }

    fn collect_text(&mut self, id: LayoutBoxId, c: &mut Collector) {
        let BoxContent::Text(text) = &self.tree[id].content else { return };
        let text = text.clone();
        let style = self.style(id);
        let font = self.font(id);
        let ws = style.white_space;
        let wraps = ws.wraps();
        let space = self.fonts.text_width(self.host, &font, " ");

        let mut word = String::new();
        for ch in text.chars() {
            match ch {
                '\n' if ws.preserves_newlines() => {
                    self.push_word(id, c, &mut word, &font);
                    c.push(id, ItemKind::Break, 0.0, false);
                    c.after_space = ws.collapses_spaces();
                    c.in_word = false;
                }
                ' ' | '\t' | '\n' | '\r' | '\x0c' if ws.collapses_spaces() => {
                    self.push_word(id, c, &mut word, &font);
                    if !c.after_space {
                        c.push(id, ItemKind::Space { text: " ".to_string(), collapsible: true }, space, wraps);
                        c.after_space = true;
                    }
                    c.in_word = false;
                }
                ' ' | '\t' => {
                    self.push_word(id, c, &mut word, &font);
                    let count = if ch == '\t' { TAB_SPACES } else { 1 };
                    let run = " ".repeat(count);
                    let extends = c.items.last_mut().filter(|last| last.owner == id);
                    match extends {
                        Some(InlineItem { kind: ItemKind::Space { text, collapsible: false }, width, .. }) => {
                            text.push_str(&run);
                            *width += space * count as f32;
                        }
                        _ => c.push(id, ItemKind::Space { text: run, collapsible: false }, space * count as f32, wraps),
                    }
                    c.after_space = false;
                    c.in_word = false;
                }
                '\r' => {}
                _ => word.push(ch),
            }
        }
        self.push_word(id, c, &mut word, &font);
    }

    fn push_word(&mut self, id: LayoutBoxId, c: &mut Collector, word: &mut String, font: &Font) {
        if word.is_empty() {
            return;
        }
        let transform = self.tree[id].style.text_transform;
        let text = transform.apply(word, !c.in_word);
        let width = self.fonts.text_width(self.host, font, &text);
        c.push(id, ItemKind::Word(text), width, false);
        c.after_space = false;
        c.in_word = true;
        word.clear();
    }

    fn inline_marker_width(&mut self, id: LayoutBoxId) -> f32 {
        let font = self.font(id);
        let space = self.fonts.text_width(self.host, &font, " ");
        let BoxContent::Marker(marker) = self.tree[id].content.clone() else { return 0.0 };
        if let Some(size) = marker.image.as_deref().and_then(|url| self.image_size(url)) {
            return size.width + space;
        }
        match &marker.text {
            Some(text) => self.fonts.text_width(self.host, &font, text) + space,
            None => font.size / 3.0 + space,
        }
    }

    /// Min-content and max-content widths of inline content
    pub(crate) fn inline_content_widths(&mut self, container: LayoutBoxId) -> (f32, f32) {
        let items = self.inline_items(container, CollectMode::Intrinsic, 0.0);
        let (mut min, mut pref) = (0.0f32, 0.0f32);
        let (mut line, mut trailing) = (0.0f32, 0.0f32);
        for chunk in chunk_items(&items) {
            match chunk.kind {
                ChunkKind::Break => {
                    pref = pref.max(line - trailing);
                    line = 0.0;
                    trailing = 0.0;
                }
                ChunkKind::Absolute => {}
                ChunkKind::Content | ChunkKind::Float => {
                    min = min.max(chunk.min);
                    line += chunk.width;
                    trailing = chunk.trailing;
                }
            }
        }
        (min, pref.max(line - trailing))
    }

    /// Lay out the inline content of a block container into line boxes.
    /// Returns the bottom of the last line.
    pub(crate) fn layout_inline(&mut self, container: LayoutBoxId, floats: &mut FloatContext) -> f32 {
        let content = self.tree[container].dimensions.content;
        let items = self.inline_items(container, CollectMode::Layout, content.width);
        if items.is_empty() {
            return content.y;
        }
        let chunks = chunk_items(&items);
        let style = self.style(container);
        let indent = self.px(container, style.text_indent, content.width);
        let strut = self.half_leading(container);
        let mut ifc = InlineFormattingContext {
            container,
            content,
            items,
            strut,
            align: style.text_align,
            indent,
            shifts: HashMap::new(),
            lines: 0,
        };
        let cb = Containing { x: content.x, y: content.y, width: content.width, height: None };
        let mut deferred: Vec<(LayoutBoxId, Size)> = Vec::new();
        let mut line = ifc.open_line(floats, content.y);

        for chunk in &chunks {
            match chunk.kind {
                ChunkKind::Break => {
                    line.push(chunk.start, &ifc.items[chunk.start]);
                    let y = self.finish_line(&mut ifc, line, true);
                    self.place_deferred(&mut deferred, &cb, floats, y);
                    line = ifc.open_line(floats, y);
                }
                ChunkKind::Absolute => {
                    let owner = ifc.items[chunk.start].owner;
                    let x = line.left + line.indent + line.width;
                    self.tree[owner].static_position = Some((x, line.y));
                    self.absolutes.push_back(owner);
                }
                ChunkKind::Float => {
                    let owner = ifc.items[chunk.start].owner;
                    let local = Containing { x: 0.0, y: 0.0, width: content.width, height: None };
                    let size = self.layout_detached(owner, &local, WidthMode::ShrinkToFit, None);
                    if !line.has_content || line.width + size.width <= line.available() + EPSILON {
                        let y = line.y;
                        self.place_float(owner, size, &cb, floats, y);
                        ifc.move_line(&mut line, floats, y);
                    } else {
                        deferred.push((owner, size));
                    }
                }
                ChunkKind::Content => {
                    let needed = chunk.width - chunk.trailing;
                    if line.has_content && line.width + needed > line.available() + EPSILON {
                        let y = self.finish_line(&mut ifc, line, false);
                        self.place_deferred(&mut deferred, &cb, floats, y);
                        line = ifc.open_line(floats, y);
                    }
                    while !line.has_content && needed > line.available() + EPSILON {
                        match floats.next_bottom(line.y, ifc.strut_height()) {
                            Some(next) if next > line.y => ifc.move_line(&mut line, floats, next),
                            _ => break,
                        }
                    }
                    for index in chunk.start..chunk.end {
                        line.push(index, &ifc.items[index]);
                    }
                }
            }
        }

        let bottom = if line.placed.is_empty() { line.y } else { self.finish_line(&mut ifc, line, true) };
        self.place_deferred(&mut deferred, &cb, floats, bottom);
        tracing::trace!(box_id = container.index(), lines = ifc.lines, "inline content laid out");
        bottom
    }

    fn place_deferred(&mut self, deferred: &mut Vec<(LayoutBoxId, Size)>, cb: &Containing, floats: &mut FloatContext, y: f32) {
        for (id, size) in deferred.drain(..) {
            self.place_float(id, size, cb, floats, y);
        }
    }

    /// Cumulative baseline raise of `id` relative to the container
    fn baseline_shift(&mut self, shifts: &mut HashMap<LayoutBoxId, f32>, container: LayoutBoxId, id: LayoutBoxId) -> f32 {
        if id == container {
            return 0.0;
        }
        if let Some(shift) = shifts.get(&id) {
            return *shift;
        }
        let Some(parent) = self.tree[id].parent else { return 0.0 };
        let mut shift = self.baseline_shift(shifts, container, parent);
        if self.tree[id].box_type == BoxType::Inline {
            let (above, below) = self.half_leading(id);
            let parent_font = self.font(parent);
            shift += valign_raise(self.tree[id].style.vertical_align, above, below, &parent_font);
        }
        shifts.insert(id, shift);
        shift
    }

    /// Align the items of a finished line and emit fragments. `end` lines
    /// (last or before a forced break) are never justified. Returns the
    /// top of the next line.
    fn finish_line(&mut self, ifc: &mut InlineFormattingContext, mut line: LineBox, end: bool) -> f32 {
        for placed in line.placed.iter_mut().rev() {
            match &ifc.items[placed.item].kind {
                ItemKind::Start | ItemKind::End => continue,
                ItemKind::Space { collapsible: true, .. } => placed.width = 0.0,
                _ => break,
            }
        }
        if !line.has_content {
            return line.y;
        }

        let used: f32 = line.placed.iter().map(|p| p.width).sum();
        let free = line.available() - used;
        let is_gap = |p: &Placed, items: &[InlineItem]| p.width > 0.0 && items[p.item].is_collapsible_space();
        let gaps = line.placed.iter().filter(|p| is_gap(p, &ifc.items)).count();
        let justify = ifc.align == TextAlign::Justify && !end && free > 0.0 && gaps > 0;
        let extra = if justify { free / gaps as f32 } else { 0.0 };
        let offset = match ifc.align {
            TextAlign::Right => free,
            TextAlign::Center => free / 2.0,
            TextAlign::Left | TextAlign::Justify => 0.0,
        }
        .max(0.0);
        let mut x = line.left + line.indent + offset;
        for p in &mut line.placed {
            p.x = x;
            if justify && is_gap(p, &ifc.items) {
                p.width += extra;
            }
            x += p.width;
        }

        // vertical metrics: line box around the strut and every item
        let (mut above, mut below) = ifc.strut;
        let mut shifts = Vec::with_capacity(line.placed.len());
        let mut line_relative = Vec::new();
        for p in &line.placed {
            let item = &ifc.items[p.item];
            let owner = item.owner;
            let parent = self.tree[owner].parent.unwrap_or(ifc.container);
            let chain = self.baseline_shift(&mut ifc.shifts, ifc.container, parent);
            match &item.kind {
                ItemKind::Space { .. } if p.width == 0.0 => shifts.push(chain),
                ItemKind::Word(_) | ItemKind::Space { .. } | ItemKind::Marker | ItemKind::Break => {
                    let (a, b) = self.half_leading(owner);
                    above = above.max(a + chain);
                    below = below.max(b - chain);
                    shifts.push(chain);
                }
                ItemKind::Atomic { height, baseline, .. } => {
                    let align = self.tree[owner].style.vertical_align;
                    if matches!(align, VerticalAlign::Top | VerticalAlign::Bottom) {
                        line_relative.push((*height, align));
                        shifts.push(0.0);
                    } else {
                        let parent_font = self.font(parent);
                        let raise = chain + valign_raise(align, *baseline, height - baseline, &parent_font);
                        above = above.max(baseline + raise);
                        below = below.max(height - baseline - raise);
                        shifts.push(raise);
                    }
                }
                _ => shifts.push(chain),
            }
        }
        for (h, align) in line_relative {
            if above + below < h {
                if align == VerticalAlign::Top {
                    below = h - above;
                } else {
                    above = h - below;
                }
            }
        }
        let line_height = above + below;
        let baseline = line.y + above;

        let mut run: Option<TextRun> = None;
        for (p, shift) in line.placed.iter().zip(&shifts) {
            let item = &ifc.items[p.item];
            let owner = item.owner;
            match &item.kind {
                ItemKind::Word(text) | ItemKind::Space { text, .. } => {
                    if p.width == 0.0 || (justify && item.is_collapsible_space()) {
                        continue;
                    }
                    match &mut run {
                        Some(r) if r.owner == owner && !(justify && r.right < p.x - EPSILON) => {
                            r.text.push_str(text);
                            r.right = p.x + p.width;
                        }
                        _ => {
                            if let Some(done) = run.take() {
                                self.emit_text(done, baseline, &mut ifc.shifts, ifc.container);
                            }
                            run = Some(TextRun { owner, x: p.x, right: p.x + p.width, text: text.clone() });
                        }
                    }
                    continue;
                }
                ItemKind::Atomic { height, baseline: own, .. } => {
                    let top = match self.tree[owner].style.vertical_align {
                        VerticalAlign::Top => line.y,
                        VerticalAlign::Bottom => line.y + line_height - height,
                        _ => baseline - shift - own,
                    };
                    self.tree.translate_subtree(owner, p.x, top);
                }
                ItemKind::Marker => self.place_inline_marker(owner, p.x, baseline - shift),
                ItemKind::Break if self.tree[owner].box_type == BoxType::LineBreak => {
                    let font = self.font(owner);
                    let y = baseline - shift - font.metrics.ascent;
                    let rect = Rect::new(p.x, y, 0.0, font.metrics.ascent + font.metrics.descent);
                    self.tree[owner].fragments.push(Fragment {
                        rect,
                        baseline: baseline - shift,
                        text: String::new(),
                        start_edge: true,
                        end_edge: true,
                    });
                }
                _ => {}
            }
            if let Some(done) = run.take() {
                self.emit_text(done, baseline, &mut ifc.shifts, ifc.container);
            }
        }
        if let Some(done) = run.take() {
            self.emit_text(done, baseline, &mut ifc.shifts, ifc.container);
        }

        self.emit_inline_boxes(ifc, &line, baseline);

        let b = &mut self.tree[ifc.container];
        b.first_baseline.get_or_insert(baseline);
        b.last_baseline = Some(baseline);
        ifc.lines += 1;
        line.y + line_height
    }

    fn emit_text(&mut self, run: TextRun, baseline: f32, shifts: &mut HashMap<LayoutBoxId, f32>, container: LayoutBoxId) {
        let font = self.font(run.owner);
        let parent = self.tree[run.owner].parent.unwrap_or(container);
        let baseline = baseline - self.baseline_shift(shifts, container, parent);
        let rect = Rect::new(
            run.x,
            baseline - font.metrics.ascent,
            run.right - run.x,
            font.metrics.ascent + font.metrics.descent,
        );
        let b = &mut self.tree[run.owner];
        b.dimensions.content = if b.fragments.is_empty() { rect } else { b.dimensions.content.union(&rect) };
        b.fragments.push(Fragment { rect, baseline, text: run.text, start_edge: true, end_edge: true });
    }

    /// One fragment for every inline box with content on the line
    fn emit_inline_boxes(&mut self, ifc: &mut InlineFormattingContext, line: &LineBox, baseline: f32) {
        let mut boxes: Vec<LayoutBoxId> = Vec::new();
        for p in &line.placed {
            let item = &ifc.items[p.item];
            let own = matches!(item.kind, ItemKind::Start | ItemKind::End).then_some(item.owner);
            for id in item.ancestors.iter().copied().chain(own) {
                if !boxes.contains(&id) {
                    boxes.push(id);
                }
            }
        }

        for id in boxes {
            let dims = self.tree[id].dimensions;
            let (mut left, mut right) = (f32::MAX, f32::MIN);
            let (mut start_edge, mut end_edge) = (false, false);
            for p in &line.placed {
                let item = &ifc.items[p.item];
                match item.kind {
                    ItemKind::Start if item.owner == id => {
                        left = left.min(p.x + dims.margin.left);
                        right = right.max(p.x + p.width);
                        start_edge = true;
                    }
                    ItemKind::End if item.owner == id => {
                        left = left.min(p.x);
                        right = right.max(p.x + p.width - dims.margin.right);
                        end_edge = true;
                    }
                    _ if item.ancestors.contains(&id) => {
                        left = left.min(p.x);
                        right = right.max(p.x + p.width);
                    }
                    _ => {}
                }
            }
            if left > right {
                continue;
            }
            let font = self.font(id);
            let shifted = baseline - self.baseline_shift(&mut ifc.shifts, ifc.container, id);
            let top = shifted - font.metrics.ascent - dims.padding.top - dims.border.top;
            let height = font.metrics.ascent
                + font.metrics.descent
                + dims.padding.vertical()
                + dims.border.vertical();
            let rect = Rect::new(left, top, right - left, height);
            let b = &mut self.tree[id];
            b.dimensions.content = if b.fragments.is_empty() { rect } else { b.dimensions.content.union(&rect) };
            b.fragments.push(Fragment { rect, baseline: shifted, text: String::new(), start_edge, end_edge });
        }
    }

    fn place_inline_marker(&mut self, id: LayoutBoxId, x: f32, baseline: f32) {
        let font = self.font(id);
        let BoxContent::Marker(marker) = self.tree[id].content.clone() else { return };
        let image = marker.image.as_deref().and_then(|url| self.image_size(url));
        let rect = match (image, &marker.text) {
            (Some(size), _) => Rect::new(x, baseline - size.height, size.width, size.height),
            (None, Some(text)) => {
                let width = self.fonts.text_width(self.host, &font, text);
                Rect::new(x, baseline - font.metrics.ascent, width, font.metrics.ascent + font.metrics.descent)
            }
            (None, None) => bullet_rect(x, baseline, &font),
        };
        let b = &mut self.tree[id];
        b.dimensions.content = rect;
        b.first_baseline = Some(baseline);
        b.last_baseline = Some(baseline);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FontHandle;
    use crate::FontMetrics;

    fn item(kind: ItemKind, width: f32, wraps: bool) -> InlineItem {
        InlineItem { owner: LayoutBoxId(0), ancestors: Rc::from(Vec::new()), kind, width, wraps }
    }

    fn word(text: &str) -> InlineItem {
        item(ItemKind::Word(text.to_string()), text.len() as f32 * 10.0, false)
    }

    fn space() -> InlineItem {
        item(ItemKind::Space { text: " ".to_string(), collapsible: true }, 5.0, true)
    }

    #[test]
    fn test_chunks_break_after_spaces() {
        let items = vec![word("ab"), space(), word("c"), word("de"), space(), item(ItemKind::Break, 0.0, false), word("f")];
        let chunks = chunk_items(&items);
        let spans: Vec<(usize, usize, ChunkKind)> = chunks.iter().map(|c| (c.start, c.end, c.kind)).collect();
        assert_eq!(
            spans,
            vec![
                (0, 2, ChunkKind::Content),
                (2, 5, ChunkKind::Content),
                (5, 6, ChunkKind::Break),
                (6, 7, ChunkKind::Content)
            ]
        );
        assert_eq!(chunks[1].width, 35.0);
        assert_eq!(chunks[1].trailing, 5.0);
        assert_eq!(chunks[1].min, 30.0);
    }

    #[test]
    fn test_atomic_is_a_break_opportunity() {
        let atomic = item(ItemKind::Atomic { height: 10.0, baseline: 10.0, min: 4.0 }, 20.0, true);
        let chunks = chunk_items(&[word("ab"), atomic, word("c")]);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1].min, 4.0);
    }

    #[test]
    fn test_nowrap_spaces_do_not_break() {
        let fixed = item(ItemKind::Space { text: " ".to_string(), collapsible: true }, 5.0, false);
        let chunks = chunk_items(&[word("ab"), fixed, word("cd")]);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].width, 45.0);
    }

    #[test]
    fn test_valign_raise() {
        let parent = Font { handle: FontHandle(0), metrics: FontMetrics::approximate(20.0), size: 20.0 };
        assert_eq!(valign_raise(VerticalAlign::Baseline, 10.0, 2.0, &parent), 0.0);
        assert_eq!(valign_raise(VerticalAlign::Super, 10.0, 2.0, &parent), 7.0);
        assert_eq!(valign_raise(VerticalAlign::Sub, 10.0, 2.0, &parent), -4.0);
        assert_eq!(valign_raise(VerticalAlign::TextTop, 10.0, 2.0, &parent), 6.0);
        assert_eq!(valign_raise(VerticalAlign::TextBottom, 10.0, 2.0, &parent), -2.0);
        // 20x20 box centred 5px above the baseline
        assert_eq!(valign_raise(VerticalAlign::Middle, 20.0, 0.0, &parent), -5.0);
    }
}
