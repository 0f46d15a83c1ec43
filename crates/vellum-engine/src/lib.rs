//! Vellum Engine
//!
//! Embeddable HTML/CSS document engine. A [`Document`] parses markup,
//! resolves styles against a shared [`Context`], lays out to a width and
//! paints onto any [`Surface`]. Fonts, images, stylesheets fetched by URL
//! and the final pixels all belong to the [`DocumentHost`].
//!
//! # Example
//! ```rust,ignore
//! use std::{rc::Rc, sync::Arc};
//! use vellum_engine::{Context, Document, DisplayList, HeadlessHost};
//!
//! let context = Arc::new(Context::default());
//! let mut doc = Document::from_str("<p>Hello</p>", Rc::new(HeadlessHost::new()), None, context);
//! doc.render(800.0);
//! let mut list = DisplayList::new();
//! doc.draw(&mut list, 0.0, 0.0, None);
//! ```

mod config;
mod context;
mod document;
mod error;
mod host;
pub mod interaction;

pub use config::Config;
pub use context::Context;
pub use document::Document;
pub use error::EngineError;
pub use host::DocumentHost;

pub use vellum_layout::{HeadlessHost, LayoutHost, RequestId, Size};
pub use vellum_render::{DirtyRegion, DisplayList, PaintCommand, PixmapSurface, Surface};

// Re-export sub-crates for advanced usage
pub use vellum_css as css;
pub use vellum_dom as dom;
pub use vellum_html as html;
pub use vellum_layout as layout;
pub use vellum_render as render;

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
