//! Vellum Layout Engine
//!
//! CSS 2.1 visual formatting over a styled element tree: box generation,
//! block flow with margin collapsing and floats, inline line breaking,
//! tables, positioning and list markers. The result is a [`LayoutTree`] in
//! document pixel coordinates.

mod block;
mod box_model;
mod builder;
mod engine;
mod floats;
mod fonts;
mod host;
mod images;
mod inline;
mod intrinsic;
mod layout_tree;
mod markers;
mod positioned;
mod table;

pub use box_model::{BoxDimensions, Size};
pub use fonts::{Font, FontCache, FontDescription, FontHandle, FontMetrics};
pub use host::{HeadlessHost, ImageStatus, LayoutHost, RequestId};
pub use images::{ImageCache, ImageState};
pub use layout_tree::{BoxContent, BoxType, Fragment, LayoutBox, LayoutBoxId, LayoutTree, ListMarker};
pub use markers::marker_text;
pub use table::{CellSpan, ColumnWidths, distribute_columns};

use vellum_css::{StyleHost, StyleMap};
use vellum_dom::DomTree;

/// Per-document state carried between layout passes
pub struct LayoutContext<'a> {
    pub host: &'a dyn LayoutHost,
    pub fonts: &'a mut FontCache,
    pub images: &'a mut ImageCache,
    /// Ask the host for `<img>` and `list-style-image` sizes
    pub load_images: bool,
    /// Base for relative image URLs
    pub base_url: &'a str,
}

/// Lay out `dom` at `width` pixels. The result depends only on the inputs,
/// so repeating a pass at the same width gives the same tree.
pub fn layout_document(dom: &DomTree, styles: &StyleMap, width: f32, cx: &mut LayoutContext<'_>) -> LayoutTree {
    let style_host: &dyn StyleHost = cx.host;
    let mut tree = builder::build(dom, styles, style_host, cx.base_url);
    engine::Layouter::new(&mut tree, dom, cx).run(width);
    tracing::debug!(boxes = tree.len(), width, height = tree.height(), "layout done");
    tree
}
