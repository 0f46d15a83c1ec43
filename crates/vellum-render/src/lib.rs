//! Vellum Render - Paint dispatch
//!
//! Turns a laid-out box tree into an ordered stream of drawing calls on a
//! host [`Surface`]. Also provides a recording [`DisplayList`], a CPU
//! [`PixmapSurface`] and [`DirtyRegion`] bookkeeping for partial redraws.

mod dirty;
mod display_list;
mod paint;
mod raster;
mod surface;

pub use dirty::{DirtyRegion, FusionConfig};
pub use display_list::{DisplayList, PaintCommand};
pub use paint::{paint, paint_order};
pub use raster::PixmapSurface;
pub use surface::{
    BackgroundPaint, BorderEdge, BorderSegment, DecorationKind, DecorationLine, MarkerPaint, PositionComponent, Radii,
    Surface, TextRun,
};
