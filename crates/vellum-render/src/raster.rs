//! CPU raster surface backed by a tiny-skia pixmap
//!
//! Draws backgrounds, borders, decorations and list bullets. Glyphs and
//! decoded images belong to the host: text runs are skipped and images
//! show as a light placeholder.

use tiny_skia::{FillRule, Mask, Paint, PathBuilder, Pixmap, Stroke, StrokeDash, Transform};
use vellum_css::{BorderStyle, Color, DecorationStyle, ListStyleType};
use vellum_dom::Rect;

use crate::surface::{BackgroundPaint, BorderEdge, BorderSegment, DecorationLine, MarkerPaint, Radii, Surface, TextRun};

const PLACEHOLDER: Color = Color::rgb(0xdd, 0xdd, 0xdd);

/// Surface that rasterizes into an RGBA pixmap
pub struct PixmapSurface {
    pixmap: Pixmap,
    /// Clip rectangles, innermost last, already intersected
    clips: Vec<Rect>,
    mask: Option<Mask>,
}

fn paint_for(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color.r, color.g, color.b, color.a);
    paint.anti_alias = true;
    paint
}

fn to_skia(rect: Rect) -> Option<tiny_skia::Rect> {
    tiny_skia::Rect::from_xywh(rect.x, rect.y, rect.width, rect.height)
}

impl PixmapSurface {
    /// `None` when the size is zero or too large
    pub fn new(width: u32, height: u32, background: Color) -> Option<Self> {
        let mut pixmap = Pixmap::new(width, height)?;
        pixmap.fill(tiny_skia::Color::from_rgba8(background.r, background.g, background.b, background.a));
        Some(Self { pixmap, clips: Vec::new(), mask: None })
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn into_pixmap(self) -> Pixmap {
        self.pixmap
    }

    /// Unpremultiplied color at a pixel
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        let p = self.pixmap.pixel(x, y)?.demultiply();
        Some(Color::rgba(p.red(), p.green(), p.blue(), p.alpha()))
    }

    fn rebuild_mask(&mut self) {
        self.mask = self.clips.last().and_then(|clip| {
            let mut mask = Mask::new(self.pixmap.width(), self.pixmap.height())?;
            if let Some(path) = to_skia(*clip).map(PathBuilder::from_rect) {
                mask.fill_path(&path, FillRule::Winding, false, Transform::identity());
            }
            Some(mask)
        });
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        if color.is_transparent() {
            return;
        }
        if let Some(rect) = to_skia(rect) {
            self.pixmap.fill_rect(rect, &paint_for(color), Transform::identity(), self.mask.as_ref());
        }
    }

    fn fill_polygon(&mut self, points: &[(f32, f32)], color: Color) {
        let mut pb = PathBuilder::new();
        for (i, (x, y)) in points.iter().enumerate() {
            if i == 0 {
                pb.move_to(*x, *y);
            } else {
                pb.line_to(*x, *y);
            }
        }
        pb.close();
        if let Some(path) = pb.finish() {
            self.pixmap.fill_path(&path, &paint_for(color), FillRule::Winding, Transform::identity(), self.mask.as_ref());
        }
    }

    /// Straight line along the middle of `band`, dashed or dotted
    fn stroke_band(&mut self, band: Rect, horizontal: bool, dash: Option<(f32, f32)>, color: Color) {
        let mut pb = PathBuilder::new();
        let width = if horizontal {
            let y = band.y + band.height / 2.0;
            pb.move_to(band.x, y);
            pb.line_to(band.right(), y);
            band.height
        } else {
            let x = band.x + band.width / 2.0;
            pb.move_to(x, band.y);
            pb.line_to(x, band.bottom());
            band.width
        };
        let Some(path) = pb.finish() else { return };
        let mut stroke = Stroke { width, ..Stroke::default() };
        if let Some((on, off)) = dash {
            stroke.dash = StrokeDash::new(vec![on, off], 0.0);
        }
        self.pixmap.stroke_path(&path, &paint_for(color), &stroke, Transform::identity(), self.mask.as_ref());
    }
}

impl Surface for PixmapSurface {
    fn fill_background(&mut self, background: &BackgroundPaint) {
        self.fill_rect(background.rect, background.color);
    }

    fn draw_border_segment(&mut self, segment: &BorderSegment) {
        let b = segment.border_box;
        let w = segment.widths;
        let band = segment.band();
        let horizontal = matches!(segment.edge, BorderEdge::Top | BorderEdge::Bottom);
        let thickness = if horizontal { band.height } else { band.width };
        match segment.style {
            BorderStyle::Dashed => self.stroke_band(band, horizontal, Some((thickness * 3.0, thickness * 2.0)), segment.color),
            BorderStyle::Dotted => self.stroke_band(band, horizontal, Some((thickness, thickness)), segment.color),
            BorderStyle::None | BorderStyle::Hidden => {}
            _ => {
                // Trapezoid mitred at the corners
                let (l, t, r, bt) = (b.x, b.y, b.right(), b.bottom());
                let points = match segment.edge {
                    BorderEdge::Top => [(l, t), (r, t), (r - w.right, t + w.top), (l + w.left, t + w.top)],
                    BorderEdge::Right => [(r, t), (r, bt), (r - w.right, bt - w.bottom), (r - w.right, t + w.top)],
                    BorderEdge::Bottom => [(r, bt), (l, bt), (l + w.left, bt - w.bottom), (r - w.right, bt - w.bottom)],
                    BorderEdge::Left => [(l, bt), (l, t), (l + w.left, t + w.top), (l + w.left, bt - w.bottom)],
                };
                self.fill_polygon(&points, segment.color);
            }
        }
    }

    fn draw_text(&mut self, _run: &TextRun) {}

    fn draw_decoration(&mut self, line: &DecorationLine) {
        match line.style {
            DecorationStyle::Dashed => self.stroke_band(line.rect, true, Some((line.rect.height * 3.0, line.rect.height * 2.0)), line.color),
            DecorationStyle::Dotted => self.stroke_band(line.rect, true, Some((line.rect.height, line.rect.height)), line.color),
            _ => self.fill_rect(line.rect, line.color),
        }
    }

    fn draw_image(&mut self, _url: &str, rect: Rect) {
        self.fill_rect(rect, PLACEHOLDER);
    }

    fn draw_list_marker(&mut self, marker: &MarkerPaint) {
        if marker.image.is_some() {
            self.fill_rect(marker.rect, PLACEHOLDER);
            return;
        }
        let r = marker.rect;
        let (cx, cy, radius) = (r.x + r.width / 2.0, r.y + r.height / 2.0, r.width.min(r.height) / 2.0);
        match marker.kind {
            ListStyleType::Disc => {
                if let Some(path) = PathBuilder::from_circle(cx, cy, radius) {
                    let paint = paint_for(marker.color);
                    self.pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), self.mask.as_ref());
                }
            }
            ListStyleType::Circle => {
                if let Some(path) = PathBuilder::from_circle(cx, cy, (radius - 0.5).max(0.5)) {
                    let stroke = Stroke { width: 1.0, ..Stroke::default() };
                    let paint = paint_for(marker.color);
                    self.pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), self.mask.as_ref());
                }
            }
            ListStyleType::Square => self.fill_rect(r, marker.color),
            // Counter text is a glyph run, drawn by the host
            _ => {}
        }
    }

    fn push_clip(&mut self, rect: Rect, _radii: Radii) {
        let clip = match self.clips.last() {
            Some(outer) => outer.intersection(&rect).unwrap_or(Rect::new(rect.x, rect.y, 0.0, 0.0)),
            None => rect,
        };
        self.clips.push(clip);
        self.rebuild_mask();
    }

    fn pop_clip(&mut self) {
        self.clips.pop();
        self.rebuild_mask();
    }
}
