//! Document - parsed markup with its styles and layout
//!
//! Owns the element tree, the resolved styles and the last layout. The host
//! is shared with the embedder through an `Rc`; a document is used from one
//! thread at a time.

use std::collections::HashSet;
use std::rc::Rc;
use std::sync::Arc;

use vellum_css::{ComputedStyle, CssParser, MediaType, StyleMap, StyleResolver, Stylesheet};
use vellum_dom::{DomTree, NodeId, Rect};
use vellum_html::{ParseError, ParseOutput};
use vellum_layout::{FontCache, ImageCache, LayoutContext, LayoutTree, RequestId, Size, layout_document};
use vellum_render::{DirtyRegion, Surface};

use crate::host::Session;
use crate::interaction::{self, PointerState};
use crate::{Context, DocumentHost, EngineError};

/// A loaded document
pub struct Document {
    host: Rc<dyn DocumentHost>,
    context: Arc<Context>,
    dom: DomTree,
    parse_errors: Vec<ParseError>,
    resolver: StyleResolver,
    styles: StyleMap,
    layout: LayoutTree,
    fonts: FontCache,
    images: ImageCache,
    title: Option<String>,
    base_url: String,
    /// Width passed to the last `render`
    last_width: Option<f32>,
    needs_layout: bool,
    pointer: PointerState,
}

impl Document {
    /// Parse markup. `user_css` is applied after the document's own sheets.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(markup: &str, host: Rc<dyn DocumentHost>, user_css: Option<&str>, context: Arc<Context>) -> Self {
        let parsed = vellum_html::parse(markup);
        Self::from_parsed(parsed, host, user_css, context)
    }

    /// Parse encoded markup. `charset` is the declared encoding label;
    /// `None` means UTF-8.
    pub fn from_bytes(
        bytes: &[u8],
        charset: Option<&str>,
        host: Rc<dyn DocumentHost>,
        user_css: Option<&str>,
        context: Arc<Context>,
    ) -> Result<Self, EngineError> {
        let label = charset.map(|c| c.trim().to_ascii_lowercase());
        let parsed = match label.as_deref() {
            None | Some("utf-8" | "utf8" | "unicode-1-1-utf-8" | "us-ascii" | "ascii") => vellum_html::parse_bytes(bytes),
            Some("iso-8859-1" | "iso8859-1" | "latin1" | "l1") => {
                let text: String = bytes.iter().map(|b| char::from(*b)).collect();
                vellum_html::parse(&text)
            }
            Some(other) => return Err(EngineError::UnsupportedCharset(other.to_string())),
        };
        Ok(Self::from_parsed(parsed, host, user_css, context))
    }

    fn from_parsed(parsed: ParseOutput, host: Rc<dyn DocumentHost>, user_css: Option<&str>, context: Arc<Context>) -> Self {
        let config = context.config();
        let resolver = StyleResolver::new(Arc::clone(context.master())).with_default_font(&config.font_family, config.font_size);
        let mut doc = Self {
            host,
            context,
            dom: parsed.tree,
            parse_errors: parsed.errors,
            resolver,
            styles: StyleMap::default(),
            layout: LayoutTree::new(),
            fonts: FontCache::new(),
            images: ImageCache::new(),
            title: None,
            base_url: String::new(),
            last_width: None,
            needs_layout: true,
            pointer: PointerState::default(),
        };
        doc.read_head();
        doc.collect_stylesheets();
        if let Some(css) = user_css {
            let sheet = doc.parse_css(css, "");
            doc.resolver.add_author_sheet(Arc::new(sheet));
        }
        doc.restyle();
        tracing::debug!(
            nodes = doc.dom.len(),
            errors = doc.parse_errors.len(),
            sheets = doc.resolver.author_sheets().len(),
            "document created"
        );
        doc
    }

    /// `<title>` and `<base href>`
    fn read_head(&mut self) {
        if let Some(title) = self.dom.find_first("title") {
            let text = self.dom.text_content(title);
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            self.host.set_caption(&text);
            self.title = Some(text);
        }
        let href = self.dom.find_first("base").and_then(|b| self.dom.element(b)).and_then(|e| e.get_attr("href"));
        if let Some(href) = href {
            self.base_url = self.host.resolve_url("", href);
            self.host.set_base_url(&self.base_url);
            self.resolver.set_base_url(&self.base_url);
        }
    }

    /// `<style>` text and `<link rel=stylesheet>` sheets, in document order
    fn collect_stylesheets(&mut self) {
        let mut sources = Vec::new();
        for node in self.dom.descendants(self.dom.root()) {
            let Some(elem) = self.dom.element(node) else { continue };
            let media = elem.get_attr("media").map(str::to_string);
            match elem.tag.as_str() {
                "style" => sources.push((self.dom.text_content(node), self.base_url.clone(), media)),
                "link" if self.context.config().follow_links => {
                    let is_sheet = elem
                        .get_attr("rel")
                        .is_some_and(|rel| rel.split_whitespace().any(|r| r.eq_ignore_ascii_case("stylesheet")));
                    let Some(href) = elem.get_attr("href").filter(|_| is_sheet) else { continue };
                    let url = self.host.resolve_url(&self.base_url, href);
                    match self.host.fetch_stylesheet(&url) {
                        Some(css) => sources.push((css, url, media)),
                        None => tracing::warn!(url, "linked stylesheet unavailable"),
                    }
                }
                _ => {}
            }
        }
        for (css, base, media) in sources {
            let css = match media.as_deref().map(str::trim) {
                Some(media) if !media.is_empty() && !media.eq_ignore_ascii_case("all") => format!("@media {media} {{\n{css}\n}}"),
                _ => css,
            };
            let sheet = self.parse_css(&css, &base);
            self.resolver.add_author_sheet(Arc::new(sheet));
        }
    }

    fn parse_css(&self, css: &str, base_url: &str) -> Stylesheet {
        let session = Session { host: &*self.host, media_type: self.media_type() };
        CssParser::new().with_host(&session).with_base_url(base_url).parse(css)
    }

    fn media_type(&self) -> MediaType {
        MediaType::parse(&self.context.config().media_type)
    }

    fn restyle(&mut self) {
        let session = Session { host: &*self.host, media_type: self.media_type() };
        self.styles = self.resolver.compute_tree(&self.dom, &session);
        self.needs_layout = true;
    }

    fn relayout(&mut self, width: f32) {
        let session = Session { host: &*self.host, media_type: self.media_type() };
        let mut cx = LayoutContext {
            host: &session,
            fonts: &mut self.fonts,
            images: &mut self.images,
            load_images: self.context.config().load_images,
            base_url: &self.base_url,
        };
        self.layout = layout_document(&self.dom, &self.styles, width, &mut cx);
        self.last_width = Some(width);
        self.needs_layout = false;
    }

    /// Add an author stylesheet after the existing ones
    pub fn add_stylesheet(&mut self, css: &str) {
        let sheet = self.parse_css(css, &self.base_url);
        self.resolver.add_author_sheet(Arc::new(sheet));
        self.restyle();
    }

    /// Lay the document out in `max_width` pixels; returns the used width
    pub fn render(&mut self, max_width: f32) -> f32 {
        self.relayout(max_width);
        self.layout.width()
    }

    /// Paint the last layout with the document origin at `(x, y)` on the
    /// surface. Call [`Document::render`] first.
    pub fn draw(&self, surface: &mut dyn Surface, x: f32, y: f32, clip: Option<Rect>) -> usize {
        vellum_render::paint(&self.layout, surface, (x, y), clip)
    }

    pub fn width(&self) -> f32 {
        self.layout.width()
    }

    pub fn height(&self) -> f32 {
        self.layout.height()
    }

    /// True after something invalidated the last layout
    pub fn needs_layout(&self) -> bool {
        self.needs_layout
    }

    /// Border boxes of `position: fixed` elements
    pub fn fixed_boxes(&self) -> Vec<Rect> {
        self.layout.fixed_boxes().iter().map(|id| self.layout[*id].bounds()).collect()
    }

    /// Element at a document point
    pub fn hit_test(&self, x: f32, y: f32) -> Option<NodeId> {
        interaction::hit_test(&self.dom, &self.layout, x, y)
    }

    pub fn on_pointer_move(&mut self, x: f32, y: f32) -> DirtyRegion {
        let target = self.hit_test(x, y);
        let changed = self.pointer.set_hover(&mut self.dom, target);
        let region = self.refresh(&changed);
        self.update_cursor();
        region
    }

    pub fn on_pointer_down(&mut self, x: f32, y: f32) -> DirtyRegion {
        let target = self.hit_test(x, y);
        let mut changed = self.pointer.set_hover(&mut self.dom, target);
        changed.extend(self.pointer.press(&mut self.dom, target));
        self.refresh(&changed)
    }

    /// Release; a press and release inside the same link reports a click
    pub fn on_pointer_up(&mut self, x: f32, y: f32) -> DirtyRegion {
        let target = self.hit_test(x, y);
        let (pressed, changed) = self.pointer.release(&mut self.dom);
        let pressed_anchor = pressed.and_then(|p| interaction::enclosing_anchor(&self.dom, p));
        let released_anchor = target.and_then(|t| interaction::enclosing_anchor(&self.dom, t));
        if let (Some((anchor, href)), Some((released, _))) = (pressed_anchor, released_anchor)
            && anchor == released
        {
            let url = self.host.resolve_url(&self.base_url, href);
            tracing::debug!(url, "anchor clicked");
            self.host.on_anchor_click(&url, anchor);
        }
        self.refresh(&changed)
    }

    pub fn on_pointer_leave(&mut self) -> DirtyRegion {
        let mut changed = self.pointer.set_hover(&mut self.dom, None);
        changed.extend(self.pointer.release(&mut self.dom).1);
        let region = self.refresh(&changed);
        self.update_cursor();
        region
    }

    fn update_cursor(&mut self) {
        let cursor = self
            .pointer
            .hovered()
            .and_then(|node| self.styles.style(node))
            .map_or("auto", |style| style.cursor.as_str())
            .to_string();
        if self.pointer.set_cursor(&cursor) {
            self.host.set_cursor(&cursor);
        }
    }

    /// Restyle after a state change and report what has to be repainted
    fn refresh(&mut self, state_changed: &[NodeId]) -> DirtyRegion {
        let mut region = DirtyRegion::new();
        if state_changed.is_empty() {
            return region;
        }
        let pending_layout = self.needs_layout;
        let old_styles = std::mem::take(&mut self.styles);
        self.restyle();

        let restyled: HashSet<NodeId> = self
            .dom
            .descendants(self.dom.root())
            .filter(|node| {
                let owner = if self.dom.element(*node).is_some() { Some(*node) } else { self.dom.parent(*node) };
                owner.is_some_and(|owner| !same_styles(&old_styles, &self.styles, owner))
            })
            .collect();
        if restyled.is_empty() {
            self.needs_layout = pending_layout;
            return region;
        }

        let canvas_changed = self.canvas_background_changed(&old_styles);
        let old_canvas = self.canvas_rect();
        let old_bounds = self.layout.bounds_by_node();
        if let Some(width) = self.last_width {
            self.relayout(width);
        }
        let new_bounds = self.layout.bounds_by_node();
        if canvas_changed {
            region.add(old_canvas);
            region.add(self.canvas_rect());
        }
        for rect in interaction::changed_rects(&old_bounds, &new_bounds, &restyled) {
            region.add(rect);
        }
        region.fuse();
        tracing::debug!(restyled = restyled.len(), rects = region.rects().len(), "pointer state restyled");
        region
    }

    /// Root or body background differs; either one can paint the canvas
    fn canvas_background_changed(&self, old_styles: &StyleMap) -> bool {
        [self.dom.find_first("html"), self.dom.find_first("body")].into_iter().flatten().any(|node| {
            let before = old_styles.style(node).map(|s| &s.background);
            let after = self.styles.style(node).map(|s| &s.background);
            before != after
        })
    }

    fn canvas_rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.layout.width(), self.layout.height())
    }

    /// Finish a pending image; the next `render` uses its size
    pub fn complete_image(&mut self, request: RequestId, size: Size) -> bool {
        let known = self.images.complete(request, size);
        if known {
            self.needs_layout = true;
        }
        known
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn dom(&self) -> &DomTree {
        &self.dom
    }

    pub fn layout(&self) -> &LayoutTree {
        &self.layout
    }

    pub fn style(&self, node: NodeId) -> Option<&Arc<ComputedStyle>> {
        self.styles.style(node)
    }

    /// Border box union of every box `node` generated
    pub fn element_rect(&self, node: NodeId) -> Option<Rect> {
        self.layout
            .boxes_for_node(node)
            .into_iter()
            .map(|id| self.layout[id].bounds())
            .reduce(|a, b| a.union(&b))
    }

    /// First element with the given `id` attribute
    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.dom
            .descendants(self.dom.root())
            .find(|node| self.dom.element(*node).is_some_and(|e| e.id.as_deref() == Some(id)))
    }

    pub fn parse_errors(&self) -> &[ParseError] {
        &self.parse_errors
    }
}

fn same_styles(old: &StyleMap, new: &StyleMap, node: NodeId) -> bool {
    let (before, after) = (old.get(node), new.get(node));
    let (Some(old), Some(new)) = (before, after) else {
        return before.is_none() && after.is_none();
    };
    let same = |a: &Arc<ComputedStyle>, b: &Arc<ComputedStyle>| Arc::ptr_eq(a, b) || a == b;
    let same_pseudo = |a: &Option<Arc<ComputedStyle>>, b: &Option<Arc<ComputedStyle>>| match (a, b) {
        (Some(a), Some(b)) => same(a, b),
        (None, None) => true,
        _ => false,
    };
    same(&old.style, &new.style) && same_pseudo(&old.before, &new.before) && same_pseudo(&old.after, &new.after)
}
