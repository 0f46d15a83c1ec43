//! CSS Box Model

use serde::{Deserialize, Serialize};
use vellum_dom::{EdgeSizes, Rect};

/// Box dimensions in document pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoxDimensions {
    pub content: Rect,
    pub padding: EdgeSizes,
    pub border: EdgeSizes,
    pub margin: EdgeSizes,
}

impl BoxDimensions {
    /// Get the area covered by content + padding
    pub fn padding_box(&self) -> Rect {
        self.content.expand(&self.padding)
    }

    /// Get the area covered by content + padding + border
    pub fn border_box(&self) -> Rect {
        self.padding_box().expand(&self.border)
    }

    /// Get the area covered by content + padding + border + margin
    pub fn margin_box(&self) -> Rect {
        self.border_box().expand(&self.margin)
    }

    /// Horizontal space taken outside the content box
    pub fn horizontal_extra(&self) -> f32 {
        self.padding.horizontal() + self.border.horizontal() + self.margin.horizontal()
    }

    /// Vertical space taken outside the content box
    pub fn vertical_extra(&self) -> f32 {
        self.padding.vertical() + self.border.vertical() + self.margin.vertical()
    }

    /// Place the content box so the border box starts at `(x, y)`
    pub fn set_border_origin(&mut self, x: f32, y: f32) {
        self.content.x = x + self.border.left + self.padding.left;
        self.content.y = y + self.border.top + self.padding.top;
    }

    /// Place the content box so the margin box starts at `(x, y)`
    pub fn set_margin_origin(&mut self, x: f32, y: f32) {
        self.set_border_origin(x + self.margin.left, y + self.margin.top);
    }
}

/// Width and height of a replaced element or image
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_boxes() {
        let mut dims = BoxDimensions {
            content: Rect::new(0.0, 0.0, 100.0, 50.0),
            padding: EdgeSizes::all(5.0),
            border: EdgeSizes::all(1.0),
            margin: EdgeSizes { top: 10.0, right: 0.0, bottom: 10.0, left: 20.0 },
        };
        dims.set_margin_origin(0.0, 0.0);
        assert_eq!(dims.content.x, 26.0);
        assert_eq!(dims.content.y, 16.0);
        assert_eq!(dims.border_box(), Rect::new(20.0, 10.0, 112.0, 62.0));
        assert_eq!(dims.margin_box().height, 82.0);
        assert_eq!(dims.horizontal_extra(), 32.0);
    }
}
