//! Document host interface

use vellum_css::{Color, MediaFeatures, MediaType, StyleHost};
use vellum_dom::{NodeId, Rect};
use vellum_layout::{FontDescription, FontHandle, FontMetrics, HeadlessHost, ImageStatus, LayoutHost};

/// Host of a whole document: layout capabilities plus the notifications a
/// document sends back. Every notification defaults to doing nothing.
pub trait DocumentHost: LayoutHost {
    /// Text of the document's `<title>`
    fn set_caption(&self, _caption: &str) {}

    /// Href of the document's `<base>`, already resolved
    fn set_base_url(&self, _url: &str) {}

    /// A link was clicked
    fn on_anchor_click(&self, _url: &str, _anchor: NodeId) {}

    /// Cursor of the element under the pointer
    fn set_cursor(&self, _cursor: &str) {}
}

impl DocumentHost for HeadlessHost {}

/// Host view used while styling and laying out: everything goes to the
/// document host, except the media type which comes from the config
pub(crate) struct Session<'a> {
    pub host: &'a dyn DocumentHost,
    pub media_type: MediaType,
}

impl StyleHost for Session<'_> {
    fn fetch_stylesheet(&self, url: &str) -> Option<String> {
        self.host.fetch_stylesheet(url)
    }

    fn resolve_url(&self, base: &str, url: &str) -> String {
        self.host.resolve_url(base, url)
    }

    fn resolve_color_name(&self, name: &str) -> Option<Color> {
        self.host.resolve_color_name(name)
    }

    fn pt_to_px(&self, pt: f32) -> f32 {
        self.host.pt_to_px(pt)
    }

    fn media_features(&self) -> MediaFeatures {
        MediaFeatures { media_type: self.media_type.clone(), ..self.host.media_features() }
    }

    fn language(&self) -> String {
        self.host.language()
    }
}

impl LayoutHost for Session<'_> {
    fn create_font(&self, desc: &FontDescription) -> Option<(FontHandle, FontMetrics)> {
        self.host.create_font(desc)
    }

    fn text_width(&self, text: &str, font: FontHandle) -> f32 {
        self.host.text_width(text, font)
    }

    fn load_image(&self, url: &str) -> ImageStatus {
        self.host.load_image(url)
    }

    fn viewport(&self) -> Rect {
        self.host.viewport()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_overrides_media_type() {
        let host = HeadlessHost::new().with_viewport(320.0, 200.0);
        let session = Session { host: &host, media_type: MediaType::Print };
        let features = session.media_features();
        assert_eq!(features.media_type, MediaType::Print);
        assert_eq!(features.width, 320.0);
    }
}
