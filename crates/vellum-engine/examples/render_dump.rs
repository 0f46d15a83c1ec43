//! Example: lay out an HTML file and dump its paint commands
//!
//! ```text
//! cargo run -p vellum-engine --example render_dump -- page.html [width] [out.png]
//! ```
//!
//! Without a file a small built-in page is used. Set `RUST_LOG=debug` to see
//! the pipeline stages.

use std::rc::Rc;
use std::sync::Arc;

use anyhow::Context as _;
use tracing_subscriber::EnvFilter;
use vellum_engine::css::Color;
use vellum_engine::{Config, Context, DisplayList, Document, DocumentHost, HeadlessHost, PixmapSurface};

const SAMPLE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>Vellum sample</title>
  <style>
    body { font-family: serif; background: #fafafa }
    .note { border: 2px dashed #888; padding: 8px; width: 60% }
    td { border: 1px solid #ccc }
  </style>
</head>
<body>
  <h1>Hello, Vellum</h1>
  <p class="note">A <a href="next.html">link</a> inside a <b>note</b>.</p>
  <ul><li>first</li><li>second</li></ul>
  <table><tr><td>a</td><td>longer cell</td></tr></table>
</body>
</html>"#;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let mut args = std::env::args().skip(1);
    let markup = match args.next() {
        Some(path) => std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?,
        None => SAMPLE.to_string(),
    };
    let width: f32 = match args.next() {
        Some(w) => w.parse().with_context(|| format!("invalid width {w:?}"))?,
        None => 800.0,
    };
    let png = args.next();

    let context = Arc::new(Context::new(Config::default()));
    let host: Rc<dyn DocumentHost> = Rc::new(HeadlessHost::new().with_viewport(width, 600.0));
    let mut doc = Document::from_str(&markup, host, None, context);
    let used = doc.render(width);
    eprintln!("vellum {}: {:?} laid out at {used}x{}", vellum_engine::VERSION, doc.title(), doc.height());

    let mut list = DisplayList::new();
    doc.draw(&mut list, 0.0, 0.0, None);
    println!("{}", serde_json::to_string_pretty(&list)?);

    if let Some(path) = png {
        let (w, h) = (doc.width().ceil() as u32, doc.height().ceil().max(1.0) as u32);
        let mut surface = PixmapSurface::new(w, h, Color::WHITE).context("document too large to rasterize")?;
        list.replay(&mut surface);
        surface.into_pixmap().save_png(&path).with_context(|| format!("writing {path}"))?;
        eprintln!("wrote {path}");
    }
    Ok(())
}
