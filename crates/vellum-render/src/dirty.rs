//! Redraw regions
//!
//! Collects the rectangles that changed between two paints and merges
//! overlapping or nearby ones. Merging only ever grows the covered area.

use serde::{Deserialize, Serialize};
use vellum_dom::Rect;

/// Merge tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionConfig {
    /// Gap below which two rectangles are merged
    pub distance_threshold: f32,
    /// Largest extra area a merge may add, relative to the merged pair
    pub max_overdraw_ratio: f32,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self { distance_threshold: 20.0, max_overdraw_ratio: 0.5 }
    }
}

fn area(rect: &Rect) -> f32 {
    rect.width.max(0.0) * rect.height.max(0.0)
}

/// Gap between two rectangles on each axis, zero when they overlap
fn gap(a: &Rect, b: &Rect) -> (f32, f32) {
    let dx = (b.x - a.right()).max(a.x - b.right()).max(0.0);
    let dy = (b.y - a.bottom()).max(a.y - b.bottom()).max(0.0);
    (dx, dy)
}

/// Set of rectangles needing a redraw
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirtyRegion {
    rects: Vec<Rect>,
    config: FusionConfig,
}

impl DirtyRegion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FusionConfig) -> Self {
        Self { rects: Vec::new(), config }
    }

    /// Add a rectangle; empty ones are ignored
    pub fn add(&mut self, rect: Rect) {
        if rect.width > 0.0 || rect.height > 0.0 {
            self.rects.push(rect);
        }
    }

    pub fn extend(&mut self, other: &DirtyRegion) {
        self.rects.extend_from_slice(&other.rects);
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    /// Smallest rectangle covering the region
    pub fn bounds(&self) -> Option<Rect> {
        self.rects.iter().copied().reduce(|a, b| a.union(&b))
    }

    /// True when some rectangle of the region covers `rect` entirely
    pub fn covers(&self, rect: &Rect) -> bool {
        self.rects.iter().any(|r| r.contains_rect(rect))
    }

    fn should_merge(&self, a: &Rect, b: &Rect) -> bool {
        if a.intersects(b) {
            return true;
        }
        let (dx, dy) = gap(a, b);
        if dx > self.config.distance_threshold || dy > self.config.distance_threshold {
            return false;
        }
        let combined = area(a) + area(b);
        let overdraw = area(&a.union(b)) - combined;
        combined > 0.0 && overdraw / combined <= self.config.max_overdraw_ratio
    }

    /// Merge rectangles until no pair qualifies
    pub fn fuse(&mut self) {
        let before = self.rects.len();
        let mut changed = true;
        while changed {
            changed = false;
            let mut i = 0;
            while i < self.rects.len() {
                let mut j = i + 1;
                while j < self.rects.len() {
                    if self.should_merge(&self.rects[i], &self.rects[j]) {
                        self.rects[i] = self.rects[i].union(&self.rects[j]);
                        self.rects.remove(j);
                        changed = true;
                    } else {
                        j += 1;
                    }
                }
                i += 1;
            }
        }
        tracing::trace!(before, after = self.rects.len(), "dirty rects fused");
    }

    pub fn into_rects(self) -> Vec<Rect> {
        self.rects
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlapping_rects_merge() {
        let mut region = DirtyRegion::new();
        region.add(Rect::new(0.0, 0.0, 50.0, 50.0));
        region.add(Rect::new(25.0, 25.0, 50.0, 50.0));
        region.fuse();
        assert_eq!(region.rects(), &[Rect::new(0.0, 0.0, 75.0, 75.0)]);
    }

    #[test]
    fn test_distant_rects_stay_apart() {
        let mut region = DirtyRegion::new();
        region.add(Rect::new(0.0, 0.0, 10.0, 10.0));
        region.add(Rect::new(500.0, 500.0, 10.0, 10.0));
        region.fuse();
        assert_eq!(region.rects().len(), 2);
        assert_eq!(region.bounds(), Some(Rect::new(0.0, 0.0, 510.0, 510.0)));
    }

    #[test]
    fn test_fusion_never_loses_area() {
        let inputs = [
            Rect::new(0.0, 0.0, 30.0, 10.0),
            Rect::new(35.0, 0.0, 30.0, 10.0),
            Rect::new(0.0, 100.0, 5.0, 5.0),
        ];
        let mut region = DirtyRegion::new();
        for r in inputs {
            region.add(r);
        }
        region.fuse();
        assert!(inputs.iter().all(|r| region.covers(r)));
        assert_eq!(region.rects().len(), 2);
    }

    #[test]
    fn test_empty_rects_ignored() {
        let mut region = DirtyRegion::new();
        region.add(Rect::new(5.0, 5.0, 0.0, 0.0));
        assert!(region.is_empty());
    }
}
