//! Floats within one block formatting context

use vellum_css::{Clear, Float};
use vellum_dom::Rect;

#[derive(Debug, Clone, Copy)]
struct PlacedFloat {
    /// Margin box, document coordinates
    rect: Rect,
    side: Float,
}

/// Floats placed so far in a block formatting context
#[derive(Debug, Default)]
pub(crate) struct FloatContext {
    floats: Vec<PlacedFloat>,
}

impl FloatContext {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn overlapping(&self, y: f32, height: f32) -> impl Iterator<Item = &PlacedFloat> {
        let bottom = y + height.max(0.0);
        self.floats
            .iter()
            .filter(move |f| f.rect.bottom() > y && (f.rect.y < bottom || (height <= 0.0 && f.rect.y <= y)))
    }

    /// Horizontal extent left free by floats for the band `[y, y + height)`
    /// within `[left, right]`
    pub(crate) fn band(&self, y: f32, height: f32, left: f32, right: f32) -> (f32, f32) {
        let (mut l, mut r) = (left, right);
        for f in self.overlapping(y, height) {
            match f.side {
                Float::Left => l = l.max(f.rect.right()),
                Float::Right => r = r.min(f.rect.x),
                Float::None => {}
            }
        }
        (l, r.max(l))
    }

    /// Place a float whose margin box is `width` × `height` no higher than
    /// `y`; returns the margin box origin
    pub(crate) fn place(&mut self, side: Float, width: f32, height: f32, y: f32, left: f32, right: f32) -> (f32, f32) {
        // A float never starts above an earlier one
        let mut y = self.floats.last().map_or(y, |f| y.max(f.rect.y));
        loop {
            let (l, r) = self.band(y, height, left, right);
            let next_bottom = self.overlapping(y, height).map(|f| f.rect.bottom()).fold(f32::INFINITY, f32::min);
            if r - l + 0.01 >= width || !next_bottom.is_finite() {
                let x = if side == Float::Right { r - width } else { l };
                self.floats.push(PlacedFloat { rect: Rect::new(x, y, width, height), side });
                tracing::trace!(x, y, width, height, ?side, "float placed");
                return (x, y);
            }
            y = next_bottom;
        }
    }

    /// Nearest float bottom below `y` among the floats beside the band
    pub(crate) fn next_bottom(&self, y: f32, height: f32) -> Option<f32> {
        self.overlapping(y, height).map(|f| f.rect.bottom()).reduce(f32::min)
    }

    /// Lowest float bottom on the sides named by `clear`
    pub(crate) fn clearance(&self, clear: Clear) -> Option<f32> {
        self.floats
            .iter()
            .filter(|f| match clear {
                Clear::None => false,
                Clear::Left => f.side == Float::Left,
                Clear::Right => f.side == Float::Right,
                Clear::Both => true,
            })
            .map(|f| f.rect.bottom())
            .reduce(f32::max)
    }

    /// Lowest float bottom overall
    pub(crate) fn bottom(&self) -> Option<f32> {
        self.floats.iter().map(|f| f.rect.bottom()).reduce(f32::max)
    }
}
