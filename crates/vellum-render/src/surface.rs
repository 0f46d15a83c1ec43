//! Drawing primitives the paint walk emits
//!
//! Every rectangle is in surface coordinates: document pixels shifted by
//! the offset given to [`crate::paint`].

use serde::{Deserialize, Serialize};
use vellum_css::{BackgroundRepeat, BorderStyle, Color, DecorationStyle, ListStyleType};
use vellum_dom::{EdgeSizes, Rect};
use vellum_layout::FontHandle;

/// Corner radii: top-left, top-right, bottom-right, bottom-left
pub type Radii = [f32; 4];

/// One axis of `background-position`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PositionComponent {
    Px(f32),
    /// Percentage of the free space (area minus image size)
    Percent(f32),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundPaint {
    /// Area to cover
    pub rect: Rect,
    /// Padding box, the origin of `background-position`
    pub origin: Rect,
    pub color: Color,
    /// Absolute image URL
    pub image: Option<String>,
    pub repeat: BackgroundRepeat,
    pub position: (PositionComponent, PositionComponent),
    pub radii: Radii,
    /// Canvas background propagated from the root or body element
    pub is_root: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BorderEdge {
    Top,
    Right,
    Bottom,
    Left,
}

/// One visible border edge
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BorderSegment {
    pub edge: BorderEdge,
    pub border_box: Rect,
    /// Widths of all four edges, for corner joins
    pub widths: EdgeSizes,
    pub style: BorderStyle,
    pub color: Color,
    pub radii: Radii,
}

impl BorderSegment {
    /// Area covered by the edge, ignoring corner joins
    pub fn band(&self) -> Rect {
        let b = self.border_box;
        let w = self.widths;
        match self.edge {
            BorderEdge::Top => Rect::new(b.x, b.y, b.width, w.top),
            BorderEdge::Right => Rect::new(b.right() - w.right, b.y, w.right, b.height),
            BorderEdge::Bottom => Rect::new(b.x, b.bottom() - w.bottom, b.width, w.bottom),
            BorderEdge::Left => Rect::new(b.x, b.y, w.left, b.height),
        }
    }
}

/// Text of one box on one line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    pub font: FontHandle,
    /// Content area of the run
    pub rect: Rect,
    pub baseline: f32,
    pub color: Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DecorationKind {
    Underline,
    Overline,
    LineThrough,
}

/// Decoration line under, over or through a text run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecorationLine {
    pub kind: DecorationKind,
    /// Full extent of the line, height is its thickness
    pub rect: Rect,
    pub style: DecorationStyle,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerPaint {
    pub kind: ListStyleType,
    pub rect: Rect,
    pub color: Color,
    /// Counter text for numbered styles
    pub text: Option<String>,
    /// `list-style-image`, drawn instead of the bullet
    pub image: Option<String>,
    pub font: FontHandle,
    pub baseline: f32,
}

/// Drawing target supplied by the host
pub trait Surface {
    fn fill_background(&mut self, background: &BackgroundPaint);

    fn draw_border_segment(&mut self, segment: &BorderSegment);

    fn draw_text(&mut self, run: &TextRun);

    fn draw_decoration(&mut self, line: &DecorationLine);

    /// Draw a loaded image scaled into `rect`
    fn draw_image(&mut self, url: &str, rect: Rect);

    fn draw_list_marker(&mut self, marker: &MarkerPaint);

    /// Restrict drawing to `rect` until the matching `pop_clip`
    fn push_clip(&mut self, rect: Rect, radii: Radii);

    fn pop_clip(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_border_bands() {
        let segment = BorderSegment {
            edge: BorderEdge::Right,
            border_box: Rect::new(10.0, 10.0, 100.0, 50.0),
            widths: EdgeSizes { top: 1.0, right: 4.0, bottom: 1.0, left: 2.0 },
            style: BorderStyle::Solid,
            color: Color::BLACK,
            radii: [0.0; 4],
        };
        assert_eq!(segment.band(), Rect::new(106.0, 10.0, 4.0, 50.0));
        let bottom = BorderSegment { edge: BorderEdge::Bottom, ..segment };
        assert_eq!(bottom.band(), Rect::new(10.0, 59.0, 100.0, 1.0));
    }
}
