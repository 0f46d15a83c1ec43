//! Engine Configuration

use serde::{Deserialize, Serialize};

/// Document defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Font family of the root element
    pub font_family: String,

    /// Font size of the root element, in pixels
    pub font_size: f32,

    /// Media type matched by `@media` and `<link media>`
    pub media_type: String,

    /// Ask the host for image sizes
    pub load_images: bool,

    /// Fetch `<link rel=stylesheet>` sheets through the host
    pub follow_links: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            font_family: vellum_css::DEFAULT_FONT_FAMILY.to_string(),
            font_size: 16.0,
            media_type: "screen".to_string(),
            load_images: true,
            follow_links: true,
        }
    }
}
