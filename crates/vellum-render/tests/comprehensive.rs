//! Comprehensive tests for vellum-render
//!
//! Documents are laid out with the headless host and painted into a
//! recording display list.

use std::sync::Arc;

use vellum_css::{Color, CssParser, MASTER_CSS, StyleResolver, parse_stylesheet};
use vellum_dom::Rect;
use vellum_html::parse;
use vellum_layout::{FontCache, HeadlessHost, ImageCache, LayoutContext, LayoutTree, Size, layout_document};
use vellum_render::{BorderEdge, DecorationKind, DisplayList, PaintCommand, paint};

fn layout_with(markup: &str, css: &str, host: &HeadlessHost) -> LayoutTree {
    let doc = parse(markup);
    let mut resolver = StyleResolver::new(Arc::new(parse_stylesheet(MASTER_CSS)));
    resolver.add_author_sheet(Arc::new(CssParser::new().parse(css)));
    let styles = resolver.compute_tree(&doc.tree, host);
    let mut fonts = FontCache::new();
    let mut images = ImageCache::new();
    let mut cx = LayoutContext { host, fonts: &mut fonts, images: &mut images, load_images: true, base_url: "" };
    layout_document(&doc.tree, &styles, 400.0, &mut cx)
}

fn record(markup: &str, css: &str) -> DisplayList {
    let tree = layout_with(markup, css, &HeadlessHost::new());
    let mut list = DisplayList::new();
    paint(&tree, &mut list, (0.0, 0.0), None);
    list
}

fn background_colors(list: &DisplayList) -> Vec<Color> {
    list.commands()
        .iter()
        .filter_map(|c| match c {
            PaintCommand::Background(b) if !b.is_root => Some(b.color),
            _ => None,
        })
        .collect()
}

const RED: Color = Color::rgb(255, 0, 0);
const BLUE: Color = Color::rgb(0, 0, 255);
const GREEN: Color = Color::rgb(0, 128, 0);

#[test]
fn test_background_and_borders() {
    let list = record("<div style='background: red; border: 2px solid blue; height: 10px'></div>", "body { margin: 0 }");
    assert_eq!(background_colors(&list), vec![RED]);
    let edges: Vec<BorderEdge> = list
        .commands()
        .iter()
        .filter_map(|c| match c {
            PaintCommand::Border(b) => Some(b.edge),
            _ => None,
        })
        .collect();
    assert_eq!(edges, vec![BorderEdge::Top, BorderEdge::Right, BorderEdge::Bottom, BorderEdge::Left]);
    let PaintCommand::Background(bg) = &list.commands()[0] else { panic!("background first") };
    assert_eq!(bg.rect, Rect::new(0.0, 0.0, 400.0, 14.0));
}

#[test]
fn test_text_runs_and_decorations() {
    let list = record("<p>hello <u>world</u></p>", "");
    let texts: Vec<&str> = list.texts().collect();
    assert_eq!(texts.concat().split_whitespace().collect::<Vec<_>>(), vec!["hello", "world"]);
    let underlines = list
        .commands()
        .iter()
        .filter(|c| matches!(c, PaintCommand::Decoration(d) if d.kind == DecorationKind::Underline))
        .count();
    assert_eq!(underlines, 1);
}

#[test]
fn test_block_backgrounds_before_floats() {
    let markup = "<div style='float: left; width: 50px; height: 50px; background: red'></div>\
        <div style='height: 20px; background: blue'></div>";
    let list = record(markup, "");
    assert_eq!(background_colors(&list), vec![BLUE, RED]);
}

#[test]
fn test_positioned_boxes_by_z_index() {
    let markup = "<div style='position: absolute; z-index: 2; background: red; width: 5px; height: 5px'></div>\
        <div style='position: absolute; z-index: 1; background: blue; width: 5px; height: 5px'></div>\
        <div style='position: absolute; z-index: -1; background: green; width: 5px; height: 5px'></div>";
    let list = record(markup, "");
    assert_eq!(background_colors(&list), vec![GREEN, BLUE, RED]);
}

#[test]
fn test_positioned_after_in_flow() {
    let markup = "<div style='position: relative; background: red; height: 5px'></div>\
        <div style='background: blue; height: 5px'></div>";
    let list = record(markup, "");
    assert_eq!(background_colors(&list), vec![BLUE, RED]);
}

#[test]
fn test_hidden_parent_visible_child() {
    let markup = "<div style='visibility: hidden; background: red'>gone <span style='visibility: visible'>shown</span></div>";
    let list = record(markup, "");
    assert!(background_colors(&list).is_empty());
    let texts: Vec<&str> = list.texts().map(str::trim).filter(|t| !t.is_empty()).collect();
    assert_eq!(texts, vec!["shown"]);
}

#[test]
fn test_overflow_clip_balanced() {
    let list = record("<div style='overflow: hidden; height: 10px'>clipped text</div>", "");
    let pushes = list.commands().iter().filter(|c| matches!(c, PaintCommand::PushClip { .. })).count();
    let pops = list.commands().iter().filter(|c| matches!(c, PaintCommand::PopClip)).count();
    assert_eq!(pushes, 1);
    assert_eq!(pops, 1);
    let first_text = list.commands().iter().position(|c| matches!(c, PaintCommand::Text(_))).unwrap();
    let push = list.commands().iter().position(|c| matches!(c, PaintCommand::PushClip { .. })).unwrap();
    assert!(push < first_text);
}

#[test]
fn test_clip_skips_boxes_outside() {
    let tree = layout_with("<p>far away</p>", "", &HeadlessHost::new());
    let mut list = DisplayList::new();
    paint(&tree, &mut list, (0.0, 0.0), Some(Rect::new(0.0, 5000.0, 100.0, 100.0)));
    assert_eq!(list.texts().count(), 0);
}

#[test]
fn test_offset_shifts_everything() {
    let tree = layout_with("<div style='background: red; height: 10px'></div>", "body { margin: 0 }", &HeadlessHost::new());
    let mut list = DisplayList::new();
    paint(&tree, &mut list, (100.0, 50.0), None);
    let PaintCommand::Background(bg) = &list.commands()[0] else { panic!("background first") };
    assert_eq!(bg.rect, Rect::new(100.0, 50.0, 400.0, 10.0));
}

#[test]
fn test_body_background_fills_canvas() {
    let list = record("<p>x</p>", "body { background: green }");
    let PaintCommand::Background(bg) = &list.commands()[0] else { panic!("canvas first") };
    assert!(bg.is_root);
    assert_eq!(bg.color, GREEN);
    assert!(background_colors(&list).is_empty());
}

#[test]
fn test_images_and_markers() {
    let host = HeadlessHost::new().with_image("a.png", Size::new(20.0, 10.0));
    let tree = layout_with("<ul><li>item</li></ul><img src=a.png>", "", &host);
    let mut list = DisplayList::new();
    paint(&tree, &mut list, (0.0, 0.0), None);
    assert!(list.commands().iter().any(|c| matches!(c, PaintCommand::Image { url, rect } if url == "a.png" && rect.width == 20.0)));
    assert!(list.commands().iter().any(|c| matches!(c, PaintCommand::Marker(_))));
}

#[test]
fn test_display_list_serializes() {
    let list = record("<p style='background: blue'>text</p>", "");
    let json = serde_json::to_string(&list).unwrap();
    let back: DisplayList = serde_json::from_str(&json).unwrap();
    assert_eq!(back, list);
}

#[test]
fn test_repaint_is_identical() {
    let tree = layout_with("<h1>Title</h1><p>Body <b>text</b></p>", "", &HeadlessHost::new());
    let mut first = DisplayList::new();
    let mut second = DisplayList::new();
    let count = paint(&tree, &mut first, (0.0, 0.0), None);
    paint(&tree, &mut second, (0.0, 0.0), None);
    assert_eq!(first, second);
    assert_eq!(count, first.len());
}

#[test]
fn test_paint_order_puts_positioned_last() {
    let markup = "<div style='position: absolute; width: 10px; height: 10px'></div><div style='height: 10px'></div>";
    let tree = layout_with(markup, "", &HeadlessHost::new());
    let order = vellum_render::paint_order(&tree);
    let last = order.last().copied().unwrap();
    assert!(tree[last].style.position.is_positioned());
    assert!(order.iter().any(|id| tree[*id].box_type == vellum_layout::BoxType::Block && !tree[*id].style.position.is_positioned()));
}
