//! End-to-end tests for vellum-engine
//!
//! A recording host wraps the headless host and keeps every notification
//! the document sends back.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use vellum_engine::css::{Color, MediaFeatures, StyleHost};
use vellum_engine::dom::{NodeId, Rect};
use vellum_engine::layout::{FontDescription, FontHandle, FontMetrics, ImageStatus};
use vellum_engine::{
    Config, Context, DisplayList, Document, DocumentHost, EngineError, HeadlessHost, LayoutHost, PaintCommand, RequestId,
    Size,
};

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Caption(String),
    BaseUrl(String),
    Click(String, NodeId),
    Cursor(String),
}

struct RecordingHost {
    inner: HeadlessHost,
    events: RefCell<Vec<Event>>,
}

impl RecordingHost {
    fn new(inner: HeadlessHost) -> Rc<Self> {
        Rc::new(Self { inner, events: RefCell::new(Vec::new()) })
    }

    fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }
}

impl StyleHost for RecordingHost {
    fn fetch_stylesheet(&self, url: &str) -> Option<String> {
        self.inner.fetch_stylesheet(url)
    }

    fn media_features(&self) -> MediaFeatures {
        self.inner.media_features()
    }
}

impl LayoutHost for RecordingHost {
    fn create_font(&self, desc: &FontDescription) -> Option<(FontHandle, FontMetrics)> {
        self.inner.create_font(desc)
    }

    fn text_width(&self, text: &str, font: FontHandle) -> f32 {
        self.inner.text_width(text, font)
    }

    fn load_image(&self, url: &str) -> ImageStatus {
        self.inner.load_image(url)
    }

    fn viewport(&self) -> Rect {
        self.inner.viewport()
    }
}

impl DocumentHost for RecordingHost {
    fn set_caption(&self, caption: &str) {
        self.events.borrow_mut().push(Event::Caption(caption.to_string()));
    }

    fn set_base_url(&self, url: &str) {
        self.events.borrow_mut().push(Event::BaseUrl(url.to_string()));
    }

    fn on_anchor_click(&self, url: &str, anchor: NodeId) {
        self.events.borrow_mut().push(Event::Click(url.to_string(), anchor));
    }

    fn set_cursor(&self, cursor: &str) {
        self.events.borrow_mut().push(Event::Cursor(cursor.to_string()));
    }
}

fn context() -> Arc<Context> {
    Arc::new(Context::default())
}

fn document(markup: &str, host: &Rc<RecordingHost>) -> Document {
    let host: Rc<dyn DocumentHost> = host.clone();
    let mut doc = Document::from_str(markup, host, Some("body { margin: 0 }"), context());
    doc.render(400.0);
    doc
}

#[test]
fn test_render_is_idempotent() {
    let host = RecordingHost::new(HeadlessHost::new());
    let mut doc = document("<h1>Title</h1><p>Some <b>bold</b> text</p><table><tr><td>a</td><td>b</td></tr></table>", &host);
    let first: Vec<Rect> = doc.layout().iter().map(|(_, b)| b.dimensions.border_box()).collect();
    let width = doc.render(400.0);
    let second: Vec<Rect> = doc.layout().iter().map(|(_, b)| b.dimensions.border_box()).collect();
    assert_eq!(first, second);
    assert_eq!(width, 400.0);
}

#[test]
fn test_percentage_width() {
    let host = RecordingHost::new(HeadlessHost::new());
    let doc = document("<div id=half style='width: 50%'>x</div>", &host);
    let half = doc.element_by_id("half").unwrap();
    assert_eq!(doc.element_rect(half).unwrap().width, 200.0);
}

#[test]
fn test_title_and_base_reported() {
    let host = RecordingHost::new(HeadlessHost::new());
    let doc = document(
        "<html><head><title>  My   page </title><base href='http://example.com/docs/'></head><body></body></html>",
        &host,
    );
    assert_eq!(doc.title(), Some("My page"));
    assert_eq!(doc.base_url(), "http://example.com/docs/");
    let events = host.events();
    assert!(events.contains(&Event::Caption("My page".into())));
    assert!(events.contains(&Event::BaseUrl("http://example.com/docs/".into())));
}

#[test]
fn test_style_and_link_sheets_apply() {
    let host = RecordingHost::new(HeadlessHost::new().with_stylesheet("http://example.com/site.css", "p { color: red }"));
    let doc = document(
        "<head><base href='http://example.com/'><link rel=stylesheet href=site.css>\
         <style>em { color: blue }</style></head><p id=p>x <em id=em>y</em></p>",
        &host,
    );
    let p = doc.element_by_id("p").unwrap();
    let em = doc.element_by_id("em").unwrap();
    assert_eq!(doc.style(p).unwrap().color, Color::rgb(255, 0, 0));
    assert_eq!(doc.style(em).unwrap().color, Color::rgb(0, 0, 255));
}

#[test]
fn test_print_only_sheet_ignored_on_screen() {
    let host = RecordingHost::new(HeadlessHost::new());
    let doc = document("<style media=print>p { color: red }</style><p id=p>x</p>", &host);
    let p = doc.element_by_id("p").unwrap();
    assert_eq!(doc.style(p).unwrap().color, Color::BLACK);

    let config = Config { media_type: "print".into(), ..Config::default() };
    let dyn_host: Rc<dyn DocumentHost> = host.clone();
    let doc = Document::from_str("<style media=print>p { color: red }</style><p id=p>x</p>", dyn_host, None, Arc::new(Context::new(config)));
    let p = doc.element_by_id("p").unwrap();
    assert_eq!(doc.style(p).unwrap().color, Color::rgb(255, 0, 0));
}

#[test]
fn test_user_css_wins_ties() {
    let host = RecordingHost::new(HeadlessHost::new());
    let dyn_host: Rc<dyn DocumentHost> = host.clone();
    let doc = Document::from_str("<style>p { color: red }</style><p id=p>x</p>", dyn_host, Some("p { color: green }"), context());
    let p = doc.element_by_id("p").unwrap();
    assert_eq!(doc.style(p).unwrap().color, Color::rgb(0, 128, 0));
}

#[test]
fn test_add_stylesheet_restyles() {
    let host = RecordingHost::new(HeadlessHost::new());
    let mut doc = document("<div id=d>x</div>", &host);
    doc.add_stylesheet("#d { height: 77px }");
    assert!(doc.needs_layout());
    doc.render(400.0);
    let d = doc.element_by_id("d").unwrap();
    assert_eq!(doc.element_rect(d).unwrap().height, 77.0);
}

#[test]
fn test_hit_test_prefers_topmost_sibling() {
    let host = RecordingHost::new(HeadlessHost::new());
    let doc = document(
        "<div id=a style='position: absolute; left: 0; top: 0; width: 50px; height: 50px'></div>\
         <div id=b style='position: absolute; left: 25px; top: 25px; width: 50px; height: 50px'></div>",
        &host,
    );
    assert_eq!(doc.hit_test(30.0, 30.0), doc.element_by_id("b"));
    assert_eq!(doc.hit_test(10.0, 10.0), doc.element_by_id("a"));
}

#[test]
fn test_hit_test_honours_z_index() {
    let host = RecordingHost::new(HeadlessHost::new());
    let doc = document(
        "<div id=a style='position: absolute; z-index: 5; width: 50px; height: 50px'></div>\
         <div id=b style='position: absolute; width: 50px; height: 50px'></div>",
        &host,
    );
    assert_eq!(doc.hit_test(10.0, 10.0), doc.element_by_id("a"));
}

#[test]
fn test_hit_test_text_maps_to_element() {
    let host = RecordingHost::new(HeadlessHost::new());
    let doc = document("<p style='margin: 0'>plain <span id=s>inner</span></p>", &host);
    // "plain " is 6 glyphs of 8px
    assert_eq!(doc.hit_test(50.0, 5.0), doc.element_by_id("s"));
    assert_eq!(doc.hit_test(5.0, 5.0), doc.dom().find_first("p"));
}

#[test]
fn test_hover_region_covers_both_elements() {
    let host = RecordingHost::new(HeadlessHost::new());
    let mut doc = document(
        "<style>div:hover { padding-left: 10px; background: yellow }</style>\
         <div id=a style='height: 20px'>A</div><div id=b style='height: 20px'>B</div>",
        &host,
    );
    let a = doc.element_by_id("a").unwrap();
    let b = doc.element_by_id("b").unwrap();

    let a_before = doc.element_rect(a).unwrap();
    let region = doc.on_pointer_move(5.0, 5.0);
    let a_hovered = doc.element_rect(a).unwrap();
    assert!(region.covers(&a_before) || region.bounds().is_some_and(|r| r.contains_rect(&a_before)));
    assert_eq!(doc.style(a).unwrap().background.color, Color::rgb(255, 255, 0));

    let b_before = doc.element_rect(b).unwrap();
    let region = doc.on_pointer_move(5.0, 25.0);
    let a_after = doc.element_rect(a).unwrap();
    let b_after = doc.element_rect(b).unwrap();
    for rect in [a_hovered, a_after, b_before, b_after] {
        assert!(region.rects().iter().any(|r| r.contains_rect(&rect)), "{rect:?} not covered by {:?}", region.rects());
    }
    assert!(!doc.dom().element(a).unwrap().state.hover);
    assert!(doc.dom().element(b).unwrap().state.hover);
}

#[test]
fn test_move_without_style_change_is_clean() {
    let host = RecordingHost::new(HeadlessHost::new());
    let mut doc = document("<div style='height: 20px'>A</div><div style='height: 20px'>B</div>", &host);
    assert!(doc.on_pointer_move(5.0, 5.0).is_empty());
    assert!(doc.on_pointer_move(5.0, 25.0).is_empty());
}

#[test]
fn test_body_hover_repaints_whole_canvas() {
    let host = RecordingHost::new(HeadlessHost::new());
    let dyn_host: Rc<dyn DocumentHost> = host.clone();
    let mut doc = Document::from_str(
        "<style>body:hover { background: yellow }</style><div style='height: 20px'>A</div>",
        dyn_host,
        None,
        context(),
    );
    doc.render(400.0);
    let region = doc.on_pointer_move(20.0, 15.0);

    let mut list = DisplayList::new();
    doc.draw(&mut list, 0.0, 0.0, None);
    let canvas = list
        .commands()
        .iter()
        .find_map(|c| match c {
            PaintCommand::Background(b) if b.is_root => Some(b.rect),
            _ => None,
        })
        .unwrap();
    assert!(canvas.contains(0.0, 0.0));
    assert!(region.covers(&canvas), "{canvas:?} not covered by {:?}", region.rects());
}

#[test]
fn test_pending_layout_survives_neutral_move() {
    let host = RecordingHost::new(HeadlessHost::new());
    let mut doc = document("<div style='height: 20px'>A</div>", &host);
    doc.add_stylesheet("div { height: 77px }");
    assert!(doc.needs_layout());
    assert!(doc.on_pointer_move(10.0, 10.0).is_empty());
    assert!(doc.needs_layout());
    doc.render(400.0);
    assert!(!doc.needs_layout());
}

#[test]
fn test_anchor_click_resolves_url() {
    let host = RecordingHost::new(HeadlessHost::new());
    let mut doc = document(
        "<head><base href='http://example.com/a/'></head><p style='margin: 0'><a id=link href='next.html'>go</a></p>",
        &host,
    );
    doc.on_pointer_down(3.0, 5.0);
    doc.on_pointer_up(3.0, 5.0);
    let link = doc.element_by_id("link").unwrap();
    assert!(host.events().contains(&Event::Click("http://example.com/a/next.html".into(), link)));
}

#[test]
fn test_release_outside_link_is_not_a_click() {
    let host = RecordingHost::new(HeadlessHost::new());
    let mut doc = document("<p style='margin: 0'><a href='x.html'>go</a></p><div style='height: 50px'></div>", &host);
    doc.on_pointer_down(3.0, 5.0);
    doc.on_pointer_up(3.0, 40.0);
    assert!(!host.events().iter().any(|e| matches!(e, Event::Click(..))));
}

#[test]
fn test_active_state_restyles() {
    let host = RecordingHost::new(HeadlessHost::new());
    let mut doc = document("<style>p:active { color: red }</style><p id=p style='margin: 0'>press</p>", &host);
    let p = doc.element_by_id("p").unwrap();
    let region = doc.on_pointer_down(3.0, 5.0);
    assert!(!region.is_empty());
    assert_eq!(doc.style(p).unwrap().color, Color::rgb(255, 0, 0));
    doc.on_pointer_up(3.0, 5.0);
    assert_eq!(doc.style(p).unwrap().color, Color::BLACK);
}

#[test]
fn test_cursor_follows_hovered_element() {
    let host = RecordingHost::new(HeadlessHost::new());
    let mut doc = document("<p style='margin: 0'><a href='x'>link</a> text</p>", &host);
    doc.on_pointer_move(3.0, 5.0);
    doc.on_pointer_move(60.0, 5.0);
    doc.on_pointer_leave();
    let cursors: Vec<Event> = host.events().into_iter().filter(|e| matches!(e, Event::Cursor(_))).collect();
    assert_eq!(cursors, vec![Event::Cursor("pointer".into()), Event::Cursor("auto".into())]);
}

#[test]
fn test_pending_image_completes() {
    let host = RecordingHost::new(HeadlessHost::new().with_pending_image("late.png"));
    let mut doc = document("<img id=i src='late.png'>", &host);
    let img = doc.element_by_id("i").unwrap();
    assert_eq!(doc.element_rect(img).unwrap().width, 0.0);

    let requests = host.inner.requests();
    assert_eq!(requests.len(), 1);
    assert!(!doc.complete_image(RequestId(999), Size::new(1.0, 1.0)));
    assert!(doc.complete_image(requests[0].0, Size::new(40.0, 30.0)));
    assert!(doc.needs_layout());
    doc.render(400.0);
    let rect = doc.element_rect(img).unwrap();
    assert_eq!((rect.width, rect.height), (40.0, 30.0));
}

#[test]
fn test_fixed_boxes_reported() {
    let host = RecordingHost::new(HeadlessHost::new());
    let doc = document("<div style='position: fixed; top: 0; left: 0; width: 100px; height: 20px'></div><p>x</p>", &host);
    assert_eq!(doc.fixed_boxes(), vec![Rect::new(0.0, 0.0, 100.0, 20.0)]);
}

#[test]
fn test_draw_records_commands() {
    let host = RecordingHost::new(HeadlessHost::new());
    let doc = document("<p style='background: blue'>hello</p>", &host);
    let mut list = DisplayList::new();
    let calls = doc.draw(&mut list, 10.0, 20.0, None);
    assert_eq!(calls, list.len());
    assert!(list.commands().iter().any(|c| matches!(c, PaintCommand::Text(run) if run.text.trim() == "hello")));
    assert!(list.bounds().is_some_and(|b| b.x >= 10.0 && b.y >= 20.0));
}

#[test]
fn test_from_bytes_charsets() {
    let host = RecordingHost::new(HeadlessHost::new());
    let dyn_host: Rc<dyn DocumentHost> = host.clone();
    let doc = Document::from_bytes(b"<p id=p>caf\xe9</p>", Some("ISO-8859-1"), dyn_host, None, context()).unwrap();
    let p = doc.element_by_id("p").unwrap();
    assert_eq!(doc.dom().text_content(p), "caf\u{e9}");

    let dyn_host: Rc<dyn DocumentHost> = host.clone();
    let doc = Document::from_bytes("<p id=p>caf\u{e9}</p>".as_bytes(), None, dyn_host, None, context()).unwrap();
    let p = doc.element_by_id("p").unwrap();
    assert_eq!(doc.dom().text_content(p), "caf\u{e9}");

    let dyn_host: Rc<dyn DocumentHost> = host.clone();
    let err = Document::from_bytes(b"<p>x</p>", Some("shift_jis"), dyn_host, None, context()).err();
    assert_eq!(err, Some(EngineError::UnsupportedCharset("shift_jis".into())));
}

#[test]
fn test_broken_markup_still_renders() {
    let host = RecordingHost::new(HeadlessHost::new());
    let doc = document("<p>unclosed <b>bold <!-- comment with no end", &host);
    assert!(!doc.parse_errors().is_empty());
    assert!(doc.height() > 0.0);
}

#[test]
fn test_context_shared_across_threads() {
    let context = context();
    let handles: Vec<_> = (0..2)
        .map(|i| {
            let context = Arc::clone(&context);
            std::thread::spawn(move || {
                let host: Rc<dyn DocumentHost> = Rc::new(HeadlessHost::new());
                let mut doc = Document::from_str(&format!("<p>thread {i}</p>"), host, None, context);
                doc.render(300.0)
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), 300.0);
    }
}
