//! Comprehensive tests for vellum-layout
//!
//! Whole documents through parse, cascade and layout with the headless
//! host (every glyph is half the font size wide).

use std::sync::Arc;

use vellum_css::{CssParser, MASTER_CSS, StyleResolver, parse_stylesheet};
use vellum_dom::{NodeId, Rect};
use vellum_html::{ParseOutput, parse};
use vellum_layout::{
    BoxContent, BoxType, ColumnWidths, FontCache, HeadlessHost, ImageCache, LayoutBoxId, LayoutContext,
    LayoutTree, Size, distribute_columns, layout_document,
};

fn layout_with(markup: &str, css: &str, width: f32, host: &HeadlessHost) -> (ParseOutput, LayoutTree) {
    let doc = parse(markup);
    let mut resolver = StyleResolver::new(Arc::new(parse_stylesheet(MASTER_CSS)));
    resolver.add_author_sheet(Arc::new(CssParser::new().parse(css)));
    let styles = resolver.compute_tree(&doc.tree, host);
    let mut fonts = FontCache::new();
    let mut images = ImageCache::new();
    let mut cx = LayoutContext { host, fonts: &mut fonts, images: &mut images, load_images: true, base_url: "" };
    let tree = layout_document(&doc.tree, &styles, width, &mut cx);
    (doc, tree)
}

fn layout(markup: &str, css: &str, width: f32) -> (ParseOutput, LayoutTree) {
    layout_with(markup, css, width, &HeadlessHost::new())
}

fn by_id(doc: &ParseOutput, id: &str) -> NodeId {
    doc.tree
        .descendants(doc.tree.root())
        .find(|n| doc.tree.element(*n).and_then(|e| e.get_attr("id")) == Some(id))
        .unwrap()
}

fn element_box(doc: &ParseOutput, tree: &LayoutTree, id: &str) -> LayoutBoxId {
    let node = by_id(doc, id);
    tree.boxes_for_node(node).into_iter().find(|b| tree[*b].box_type != BoxType::Text).unwrap()
}

fn border_box(doc: &ParseOutput, tree: &LayoutTree, id: &str) -> Rect {
    tree[element_box(doc, tree, id)].dimensions.border_box()
}

/// Distinct baselines of the text inside an element
fn lines(doc: &ParseOutput, tree: &LayoutTree, id: &str) -> Vec<f32> {
    let start = element_box(doc, tree, id);
    let mut baselines: Vec<f32> = tree
        .descendants(start)
        .into_iter()
        .filter(|b| tree[*b].box_type == BoxType::Text)
        .flat_map(|b| tree[b].fragments.iter().map(|f| f.baseline).collect::<Vec<_>>())
        .collect();
    baselines.sort_by(f32::total_cmp);
    baselines.dedup();
    baselines
}

const RESET: &str = "body { margin: 0 }";

#[test]
fn test_percentage_width() {
    let (doc, tree) = layout("<div id=a style='width: 50%'>x</div>", RESET, 400.0);
    assert_eq!(tree[element_box(&doc, &tree, "a")].dimensions.content.width, 200.0);
    assert_eq!(tree.width(), 400.0);
}

#[test]
fn test_body_margin_and_block_stacking() {
    let (doc, tree) = layout("<div id=a style='height: 30px'></div><div id=b style='height: 20px'></div>", "", 300.0);
    let a = border_box(&doc, &tree, "a");
    let b = border_box(&doc, &tree, "b");
    assert_eq!(a, Rect::new(8.0, 8.0, 284.0, 30.0));
    assert_eq!(b.y, 38.0);
    assert_eq!(tree.height(), 66.0);
}

#[test]
fn test_sibling_margins_collapse() {
    let css = "body { margin: 0 } div { height: 10px } #a { margin-bottom: 20px } #b { margin-top: 30px }";
    let (doc, tree) = layout("<div id=a></div><div id=b></div>", css, 200.0);
    let a = border_box(&doc, &tree, "a");
    let b = border_box(&doc, &tree, "b");
    assert_eq!(b.y - a.bottom(), 30.0);
}

#[test]
fn test_parent_child_margins_collapse() {
    let css = "body { margin: 0 } #outer { margin-top: 10px } #inner { margin-top: 25px; height: 5px }";
    let (doc, tree) = layout("<div id=outer><div id=inner></div></div>", css, 200.0);
    let outer = border_box(&doc, &tree, "outer");
    let inner = border_box(&doc, &tree, "inner");
    assert_eq!(outer.y, 25.0);
    assert_eq!(inner.y, 25.0);
    assert_eq!(outer.height, 5.0);
}

#[test]
fn test_padding_blocks_margin_collapse() {
    let css = "body { margin: 0 } #outer { padding-top: 1px } #inner { margin-top: 25px; height: 5px }";
    let (doc, tree) = layout("<div id=outer><div id=inner></div></div>", css, 200.0);
    let outer = border_box(&doc, &tree, "outer");
    let inner = border_box(&doc, &tree, "inner");
    assert_eq!(outer.y, 0.0);
    assert_eq!(inner.y, 26.0);
}

#[test]
fn test_auto_margins_center() {
    let (doc, tree) = layout("<div id=a style='width: 100px; margin: 0 auto'></div>", RESET, 300.0);
    assert_eq!(border_box(&doc, &tree, "a").x, 100.0);
}

#[test]
fn test_text_wraps_at_width() {
    // 16px font: 8px per glyph; each word is 32px
    let (doc, tree) = layout("<p id=p style='width: 100px'>aaaa bbbb cccc dddd</p>", RESET, 400.0);
    assert_eq!(lines(&doc, &tree, "p").len(), 2);
}

#[test]
fn test_nowrap_keeps_one_line() {
    let (doc, tree) =
        layout("<p id=p style='width: 100px; white-space: nowrap'>aaaa bbbb cccc dddd</p>", RESET, 400.0);
    assert_eq!(lines(&doc, &tree, "p").len(), 1);
}

#[test]
fn test_br_forces_line() {
    let (doc, tree) = layout("<p id=p>a<br>b</p>", RESET, 400.0);
    assert_eq!(lines(&doc, &tree, "p").len(), 2);
}

#[test]
fn test_text_align_center() {
    let (doc, tree) = layout("<p id=p style='text-align: center; width: 100px'>abcd</p>", RESET, 400.0);
    let p = element_box(&doc, &tree, "p");
    let text = tree.descendants(p).into_iter().find(|b| tree[*b].box_type == BoxType::Text).unwrap();
    let fragment = &tree[text].fragments[0];
    assert_eq!(fragment.rect.x, 34.0);
    assert_eq!(fragment.rect.width, 32.0);
}

#[test]
fn test_float_pushes_text_aside() {
    let markup = "<div id=f style='float: left; width: 100px; height: 50px'></div><p id=p>words</p>";
    let (doc, tree) = layout(markup, "body { margin: 0 } p { margin: 0 }", 400.0);
    let f = border_box(&doc, &tree, "f");
    assert_eq!(f, Rect::new(0.0, 0.0, 100.0, 50.0));
    let p = element_box(&doc, &tree, "p");
    let text = tree.descendants(p).into_iter().find(|b| tree[*b].box_type == BoxType::Text).unwrap();
    assert!(tree[text].fragments[0].rect.x >= 100.0);
}

#[test]
fn test_right_float_and_clear() {
    let markup = "<div id=f style='float: right; width: 60px; height: 40px'></div><div id=c style='clear: both; height: 5px'></div>";
    let (doc, tree) = layout(markup, RESET, 300.0);
    assert_eq!(border_box(&doc, &tree, "f").x, 240.0);
    assert_eq!(border_box(&doc, &tree, "c").y, 40.0);
}

#[test]
fn test_floats_expand_bfc_root() {
    let markup = "<div id=box style='overflow: hidden'><div style='float: left; width: 10px; height: 70px'></div></div>";
    let (doc, tree) = layout(markup, RESET, 300.0);
    assert_eq!(border_box(&doc, &tree, "box").height, 70.0);
}

#[test]
fn test_inline_block_shrinks_to_fit() {
    let (doc, tree) = layout("<p><span id=s style='display: inline-block'>abc</span></p>", RESET, 400.0);
    assert_eq!(tree[element_box(&doc, &tree, "s")].dimensions.content.width, 24.0);
}

#[test]
fn test_table_columns_fill_width() {
    let markup = "<table id=t style='width: 400px; border-spacing: 0'><tr>\
        <td id=a>a</td><td id=b>much longer content in here</td></tr></table>";
    let (doc, tree) = layout(markup, RESET, 600.0);
    let a = border_box(&doc, &tree, "a");
    let b = border_box(&doc, &tree, "b");
    assert!((a.width + b.width - 400.0).abs() < 0.01);
    assert!(b.width > a.width);
    assert_eq!(a.right(), b.x);
    assert_eq!(a.height, b.height);
    assert_eq!(border_box(&doc, &tree, "t").width, 400.0);
}

#[test]
fn test_table_shrinks_to_content() {
    let markup = "<table id=t style='border-spacing: 0'><tr><td id=a style='padding: 0'>abcd</td></tr></table>";
    let (doc, tree) = layout(markup, RESET, 600.0);
    assert_eq!(border_box(&doc, &tree, "t").width, 32.0);
}

#[test]
fn test_table_colspan_and_rowspan() {
    let markup = "<table style='border-spacing: 0'>\
        <tr><td id=wide colspan=2>x</td><td id=tall rowspan=2>y</td></tr>\
        <tr><td id=c1>a</td><td id=c2>b</td></tr></table>";
    let (doc, tree) = layout(markup, RESET, 600.0);
    let wide = border_box(&doc, &tree, "wide");
    let c1 = border_box(&doc, &tree, "c1");
    let c2 = border_box(&doc, &tree, "c2");
    let tall = border_box(&doc, &tree, "tall");
    assert!((wide.width - (c1.width + c2.width)).abs() < 0.01);
    assert_eq!(tall.height, wide.height + c1.height);
    assert_eq!(tall.x, c2.right());
}

#[test]
fn test_table_header_group_first() {
    let markup = "<table><tfoot><tr><td id=f>f</td></tr></tfoot><tbody><tr><td id=b>b</td></tr></tbody>\
        <thead><tr><td id=h>h</td></tr></thead></table>";
    let (doc, tree) = layout(markup, RESET, 600.0);
    let h = border_box(&doc, &tree, "h");
    let b = border_box(&doc, &tree, "b");
    let f = border_box(&doc, &tree, "f");
    assert!(h.y < b.y && b.y < f.y);
}

#[test]
fn test_collapsed_borders_share_edges() {
    let markup = "<table style='border-collapse: collapse'><tr>\
        <td id=a style='border: 1px solid; padding: 0'>a</td>\
        <td id=b style='border: 3px solid; padding: 0'>b</td></tr></table>";
    let (doc, tree) = layout(markup, RESET, 600.0);
    let a = element_box(&doc, &tree, "a");
    let b = element_box(&doc, &tree, "b");
    assert_eq!(tree[a].borders[1].width, 3.0);
    assert_eq!(tree[b].borders[3].used_width(), 0.0);
    assert_eq!(tree[a].dimensions.border_box().right(), tree[b].dimensions.border_box().x);
}

#[test]
fn test_caption_above_table() {
    let markup = "<table id=t><caption id=c>title</caption><tr><td id=a>a</td></tr></table>";
    let (doc, tree) = layout(markup, RESET, 600.0);
    let caption = border_box(&doc, &tree, "c");
    let cell = border_box(&doc, &tree, "a");
    assert!(caption.bottom() <= cell.y);
}

#[test]
fn test_absolute_against_positioned_ancestor() {
    let markup = "<div id=outer style='position: relative; width: 200px; height: 100px; margin-left: 20px'>\
        <div id=abs style='position: absolute; right: 10px; top: 5px; width: 50px; height: 10px'></div></div>";
    let (doc, tree) = layout(markup, RESET, 400.0);
    let abs = border_box(&doc, &tree, "abs");
    assert_eq!(abs, Rect::new(160.0, 5.0, 50.0, 10.0));
}

#[test]
fn test_absolute_does_not_take_space() {
    let markup = "<div id=abs style='position: absolute; height: 50px'>x</div><div id=next style='height: 5px'></div>";
    let (doc, tree) = layout(markup, RESET, 400.0);
    assert_eq!(border_box(&doc, &tree, "next").y, 0.0);
    assert_eq!(border_box(&doc, &tree, "abs").y, 0.0);
}

#[test]
fn test_relative_offset() {
    let (doc, tree) = layout("<div id=r style='position: relative; left: 10px; top: 4px; height: 5px'></div>", RESET, 400.0);
    let r = border_box(&doc, &tree, "r");
    assert_eq!((r.x, r.y), (10.0, 4.0));
}

#[test]
fn test_fixed_boxes_listed() {
    let (doc, tree) = layout("<div id=f style='position: fixed; bottom: 0; height: 10px'>x</div>", RESET, 400.0);
    let f = element_box(&doc, &tree, "f");
    assert_eq!(tree.fixed_boxes(), &[f]);
    assert_eq!(tree[f].dimensions.border_box().bottom(), 600.0);
}

#[test]
fn test_images_sized_from_host() {
    let host = HeadlessHost::new().with_image("a.png", Size::new(30.0, 20.0)).with_pending_image("b.png");
    let markup = "<p><img id=a src=a.png><img id=half src=a.png width=15><img id=b src=b.png></p>";
    let (doc, tree) = layout_with(markup, RESET, 400.0, &host);
    assert_eq!(border_box(&doc, &tree, "a").width, 30.0);
    let half = border_box(&doc, &tree, "half");
    assert_eq!((half.width, half.height), (15.0, 10.0));
    let pending = border_box(&doc, &tree, "b");
    assert_eq!((pending.width, pending.height), (0.0, 0.0));
    assert!(matches!(&tree[element_box(&doc, &tree, "b")].content, BoxContent::Image { url } if url == "b.png"));
}

#[test]
fn test_list_marker_outside_item() {
    let (doc, tree) = layout("<ul><li id=li>item</li></ul>", RESET, 400.0);
    let li = element_box(&doc, &tree, "li");
    let marker = tree.children(li).iter().copied().find(|b| tree[*b].box_type == BoxType::Marker).unwrap();
    let marker_rect = tree[marker].dimensions.content;
    assert!(marker_rect.right() <= tree[li].dimensions.content.x);
    assert!(marker_rect.width > 0.0);
}

#[test]
fn test_display_none_generates_nothing() {
    let (doc, tree) = layout("<div id=gone style='display: none'>x</div>", RESET, 400.0);
    assert!(tree.boxes_for_node(by_id(&doc, "gone")).is_empty());
}

#[test]
fn test_layout_is_repeatable() {
    let markup = "<h1>Title</h1><p>Some <b>bold</b> text that wraps around <img src=x.png width=40 height=40> \
        an image</p><table><tr><td>a</td><td>b</td></tr></table><ul><li>one<li>two</ul>";
    let (_, first) = layout(markup, "", 250.0);
    let (_, second) = layout(markup, "", 250.0);
    assert_eq!(first.bounds_by_node(), second.bounds_by_node());
    assert_eq!(first.height(), second.height());
}

#[test]
fn test_narrow_width_grows_height() {
    let markup = "<p>The quick brown fox jumps over the lazy dog again and again</p>";
    let (_, wide) = layout(markup, "", 800.0);
    let (_, narrow) = layout(markup, "", 150.0);
    assert!(narrow.height() > wide.height());
}

#[test]
fn test_distribute_columns_public() {
    let cols = [
        ColumnWidths { min: 50.0, pref: 100.0, fixed: None, percent: None },
        ColumnWidths { min: 50.0, pref: 300.0, fixed: None, percent: None },
    ];
    let widths = distribute_columns(&cols, 800.0);
    assert_eq!(widths, vec![200.0, 600.0]);
}
