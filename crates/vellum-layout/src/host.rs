//! Host capabilities needed during layout

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use vellum_css::{MediaFeatures, StyleHost};
use vellum_dom::Rect;

use crate::{FontDescription, FontHandle, FontMetrics, Size};

/// Token for an image the host is still loading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub u64);

/// Answer to an image request
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImageStatus {
    Ready(Size),
    /// Completed later through `Document::complete_image`
    Pending(RequestId),
    Failed,
}

/// Layout-side host interface
pub trait LayoutHost: StyleHost {
    /// Create a font; `None` makes layout fall back to approximate metrics
    fn create_font(&self, desc: &FontDescription) -> Option<(FontHandle, FontMetrics)>;

    /// Advance width of `text` in `font`
    fn text_width(&self, text: &str, font: FontHandle) -> f32;

    fn load_image(&self, _url: &str) -> ImageStatus {
        ImageStatus::Failed
    }

    /// Visible area, the containing block of fixed boxes
    fn viewport(&self) -> Rect {
        Rect::new(0.0, 0.0, 800.0, 600.0)
    }
}

/// Deterministic host for tests and offline rendering.
///
/// Every glyph advances half the font size; ascent is 0.8 and descent 0.2
/// of the size.
#[derive(Debug)]
pub struct HeadlessHost {
    viewport: Size,
    fonts: RefCell<Vec<f32>>,
    images: HashMap<String, Size>,
    pending: HashSet<String>,
    sheets: HashMap<String, String>,
    next_request: Cell<u64>,
    requests: RefCell<Vec<(RequestId, String)>>,
}

impl Default for HeadlessHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessHost {
    pub fn new() -> Self {
        Self {
            viewport: Size::new(800.0, 600.0),
            fonts: RefCell::new(Vec::new()),
            images: HashMap::new(),
            pending: HashSet::new(),
            sheets: HashMap::new(),
            next_request: Cell::new(1),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn with_viewport(mut self, width: f32, height: f32) -> Self {
        self.viewport = Size::new(width, height);
        self
    }

    /// Image that is immediately available
    pub fn with_image(mut self, url: &str, size: Size) -> Self {
        self.images.insert(url.to_string(), size);
        self
    }

    /// Image whose load never finishes on its own
    pub fn with_pending_image(mut self, url: &str) -> Self {
        self.pending.insert(url.to_string());
        self
    }

    /// Stylesheet served to `@import` and `<link>`
    pub fn with_stylesheet(mut self, url: &str, css: &str) -> Self {
        self.sheets.insert(url.to_string(), css.to_string());
        self
    }

    /// Pending image requests issued so far
    pub fn requests(&self) -> Vec<(RequestId, String)> {
        self.requests.borrow().clone()
    }
}

impl StyleHost for HeadlessHost {
    fn fetch_stylesheet(&self, url: &str) -> Option<String> {
        self.sheets.get(url).cloned()
    }

    fn media_features(&self) -> MediaFeatures {
        MediaFeatures {
            width: self.viewport.width,
            height: self.viewport.height,
            device_width: self.viewport.width,
            device_height: self.viewport.height,
            ..MediaFeatures::default()
        }
    }
}

impl LayoutHost for HeadlessHost {
    fn create_font(&self, desc: &FontDescription) -> Option<(FontHandle, FontMetrics)> {
        let mut fonts = self.fonts.borrow_mut();
        fonts.push(desc.size);
        Some((FontHandle(fonts.len() as u64 - 1), FontMetrics::approximate(desc.size)))
    }

    fn text_width(&self, text: &str, font: FontHandle) -> f32 {
        let size = usize::try_from(font.0)
            .ok()
            .and_then(|i| self.fonts.borrow().get(i).copied())
            .unwrap_or(16.0);
        text.chars().count() as f32 * size * 0.5
    }

    fn load_image(&self, url: &str) -> ImageStatus {
        if let Some(size) = self.images.get(url) {
            return ImageStatus::Ready(*size);
        }
        if self.pending.contains(url) {
            let id = RequestId(self.next_request.get());
            self.next_request.set(id.0 + 1);
            self.requests.borrow_mut().push((id, url.to_string()));
            return ImageStatus::Pending(id);
        }
        ImageStatus::Failed
    }

    fn viewport(&self) -> Rect {
        Rect::new(0.0, 0.0, self.viewport.width, self.viewport.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_images() {
        let host = HeadlessHost::new()
            .with_image("a.png", Size::new(10.0, 20.0))
            .with_pending_image("b.png");
        assert_eq!(host.load_image("a.png"), ImageStatus::Ready(Size::new(10.0, 20.0)));
        assert_eq!(host.load_image("b.png"), ImageStatus::Pending(RequestId(1)));
        assert_eq!(host.load_image("c.png"), ImageStatus::Failed);
        assert_eq!(host.requests(), vec![(RequestId(1), "b.png".to_string())]);
    }

    #[test]
    fn test_viewport_feeds_media_features() {
        let host = HeadlessHost::new().with_viewport(320.0, 480.0);
        assert_eq!(host.media_features().width, 320.0);
        assert_eq!(host.viewport(), Rect::new(0.0, 0.0, 320.0, 480.0));
    }
}
