//! Min-content and max-content widths used for shrink-to-fit sizing and
//! table columns

use crate::engine::{Containing, Layouter};
use crate::{BoxType, LayoutBoxId};

impl Layouter<'_> {
    /// Content-box `(min, max)` widths, cached for the pass
    pub(crate) fn content_widths(&mut self, id: LayoutBoxId) -> (f32, f32) {
        if let Some(widths) = self.intrinsic.get(&id) {
            return *widths;
        }
        let box_type = self.tree[id].box_type;
        let widths = match box_type {
            BoxType::Image => {
                let cb = Containing { x: 0.0, y: 0.0, width: 0.0, height: None };
                let size = self.replaced_size(id, &cb);
                (size.width, size.width)
            }
            BoxType::Table => self.table_widths(id),
            _ if self.has_block_children(id) => {
                let (mut min, mut pref) = (0.0f32, 0.0f32);
                for child in self.tree.children(id).to_vec() {
                    let b = &self.tree[child];
                    if b.box_type == BoxType::Marker || (b.is_element_box() && b.style.position.is_out_of_flow()) {
                        continue;
                    }
                    let (child_min, child_pref) = self.outer_widths(child);
                    min = min.max(child_min);
                    pref = pref.max(child_pref);
                }
                (min, pref)
            }
            _ => self.inline_content_widths(id),
        };
        let widths = (widths.0, widths.1.max(widths.0));
        self.intrinsic.insert(id, widths);
        widths
    }

    /// Margin-box `(min, max)` widths. Percentages count as zero.
    pub(crate) fn outer_widths(&mut self, id: LayoutBoxId) -> (f32, f32) {
        let (content_min, content_pref) = self.content_widths(id);
        self.resolve_edges(id, 0.0);
        let extra = self.tree[id].dimensions.horizontal_extra();
        let style = self.style(id);
        let (min, pref) = match self.specified_width(id, 0.0) {
            Some(w) if !style.width.is_percent() => (w, w),
            _ => (self.clamp_width(id, content_min, 0.0), self.clamp_width(id, content_pref, 0.0)),
        };
        (min + extra, pref + extra)
    }
}
