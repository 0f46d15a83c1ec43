//! CSS Table Layout
//!
//! Automatic table layout: a slot grid built from rows and cells with
//! their spans, column widths from cell min/max widths and `<col>`
//! widths, row heights from laid-out cells, separated or collapsed
//! borders, and captions above the table box.

use std::ops::Range;

use vellum_css::{BorderCollapse, BorderSide, Display, VerticalAlign};
use vellum_dom::Rect;

use crate::engine::{Containing, Layouter, WidthMode};
use crate::{BoxType, LayoutBoxId, Size};

/// Largest accepted `colspan`, `rowspan` or `span`
const MAX_SPAN: usize = 1000;

/// Table cell spanning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellSpan {
    pub colspan: usize,
    pub rowspan: usize,
}

impl CellSpan {
    pub fn single() -> Self {
        Self { colspan: 1, rowspan: 1 }
    }
}

#[derive(Debug, Clone, Copy)]
struct GridCell {
    id: LayoutBoxId,
    row: usize,
    col: usize,
    span: CellSpan,
}

/// Column box with the first column it covers
#[derive(Debug, Clone, Copy)]
struct GridColumn {
    id: LayoutBoxId,
    start: usize,
    span: usize,
}

/// Table structure for layout
#[derive(Debug, Default)]
struct TableStructure {
    captions: Vec<LayoutBoxId>,
    columns: Vec<GridColumn>,
    /// Column groups with the columns they hold
    column_groups: Vec<(LayoutBoxId, Range<usize>)>,
    /// Row groups in display order (header first, footer last)
    groups: Vec<(LayoutBoxId, Range<usize>)>,
    rows: Vec<LayoutBoxId>,
    cells: Vec<GridCell>,
    num_cols: usize,
}

impl TableStructure {
    /// Cell index per slot, `None` for empty slots
    fn slots(&self) -> Vec<Vec<Option<usize>>> {
        let mut slots = vec![vec![None; self.num_cols]; self.rows.len()];
        for (i, cell) in self.cells.iter().enumerate() {
            for row in slots.iter_mut().skip(cell.row).take(cell.span.rowspan) {
                for slot in row.iter_mut().skip(cell.col).take(cell.span.colspan) {
                    *slot = Some(i);
                }
            }
        }
        slots
    }
}

/// Column constraints gathered from cells and `<col>` elements
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ColumnWidths {
    pub min: f32,
    pub pref: f32,
    /// Fixed `width`
    pub fixed: Option<f32>,
    /// Percentage `width`
    pub percent: Option<f32>,
}

impl ColumnWidths {
    fn desired(&self, table_width: f32) -> f32 {
        self.fixed
            .or(self.percent.map(|p| p * table_width / 100.0))
            .unwrap_or(self.pref)
            .max(self.min)
    }

    fn is_auto(&self) -> bool {
        self.fixed.is_none() && self.percent.is_none()
    }
}

/// Split `available` between columns. Every column gets at least its
/// minimum; when the desired widths fit, auto columns share the rest in
/// proportion to their max-content widths, otherwise each column grows
/// from its minimum in proportion to how much more it wants.
pub fn distribute_columns(columns: &[ColumnWidths], available: f32) -> Vec<f32> {
    let min_sum: f32 = columns.iter().map(|c| c.min).sum();
    if available <= min_sum {
        return columns.iter().map(|c| c.min).collect();
    }
    let desired: Vec<f32> = columns.iter().map(|c| c.desired(available)).collect();
    let desired_sum: f32 = desired.iter().sum();

    if desired_sum <= available {
        let mut widths = desired;
        let extra = available - desired_sum;
        let auto: Vec<usize> = (0..columns.len()).filter(|i| columns[*i].is_auto()).collect();
        let targets = if auto.is_empty() { (0..columns.len()).collect() } else { auto };
        let weight_sum: f32 = targets.iter().map(|i| widths[*i]).sum();
        for i in &targets {
            widths[*i] += if weight_sum > 0.0 {
                extra * widths[*i] / weight_sum
            } else {
                extra / targets.len() as f32
            };
        }
        widths
    } else {
        let flex: f32 = desired.iter().zip(columns).map(|(d, c)| d - c.min).sum();
        desired
            .iter()
            .zip(columns)
            .map(|(d, c)| c.min + (available - min_sum) * (d - c.min) / flex)
            .collect()
    }
}

/// Wider border wins; ties keep `a`
fn wider(a: BorderSide, b: BorderSide) -> BorderSide {
    if b.used_width() > a.used_width() { b } else { a }
}

impl Layouter<'_> {
    fn span_attr(&self, id: LayoutBoxId, name: &str, default: usize) -> usize {
        self.tree[id]
            .dom_node
            .and_then(|node| self.dom.element(node))
            .and_then(|el| el.get_attr(name))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .map_or(default, |v| v.min(MAX_SPAN))
    }

    fn table_structure(&self, table: LayoutBoxId) -> TableStructure {
        let mut s = TableStructure::default();
        let mut head = Vec::new();
        let mut body = Vec::new();
        let mut foot = Vec::new();

        for child in self.tree.children(table).iter().copied() {
            let b = &self.tree[child];
            match b.box_type {
                BoxType::TableCaption => s.captions.push(child),
                BoxType::TableColumn => {
                    let first = s.num_cols;
                    let cols: Vec<LayoutBoxId> = self
                        .tree
                        .children(child)
                        .iter()
                        .copied()
                        .filter(|c| self.tree[*c].box_type == BoxType::TableColumn)
                        .collect();
                    if cols.is_empty() {
                        let span = self.span_attr(child, "span", 1).max(1);
                        s.columns.push(GridColumn { id: child, start: s.num_cols, span });
                        s.num_cols += span;
                    } else {
                        for col in cols {
                            let span = self.span_attr(col, "span", 1).max(1);
                            s.columns.push(GridColumn { id: col, start: s.num_cols, span });
                            s.num_cols += span;
                        }
                        s.column_groups.push((child, first..s.num_cols));
                    }
                }
                BoxType::TableRowGroup => match b.style.display {
                    Display::TableHeaderGroup => head.push(child),
                    Display::TableFooterGroup => foot.push(child),
                    _ => body.push(child),
                },
                _ => {}
            }
        }

        let mut occupied: Vec<Vec<bool>> = Vec::new();
        for group in head.into_iter().chain(body).chain(foot) {
            let first = s.rows.len();
            s.rows.extend(self.tree.children(group).iter().copied().filter(|r| self.tree[*r].box_type == BoxType::TableRow));
            let end = s.rows.len();
            occupied.resize(end, Vec::new());
            for r in first..end {
                let mut col = 0;
                for cell in self.tree.children(s.rows[r]).iter().copied() {
                    if self.tree[cell].box_type != BoxType::TableCell {
                        continue;
                    }
                    while occupied[r].get(col).copied().unwrap_or(false) {
                        col += 1;
                    }
                    let colspan = self.span_attr(cell, "colspan", 1).max(1);
                    let rowspan = match self.span_attr(cell, "rowspan", 1) {
                        0 => end - r,
                        n => n.min(end - r),
                    };
                    for row in occupied.iter_mut().skip(r).take(rowspan) {
                        if row.len() < col + colspan {
                            row.resize(col + colspan, false);
                        }
                        row[col..col + colspan].fill(true);
                    }
                    s.cells.push(GridCell { id: cell, row: r, col, span: CellSpan { colspan, rowspan } });
                    col += colspan;
                }
            }
            s.groups.push((group, first..end));
        }
        s.num_cols = s.num_cols.max(occupied.iter().map(Vec::len).max().unwrap_or(0));
        s
    }

    /// Resolve collapsed borders: the wider of two adjoining borders is
    /// kept by one cell, outer edges take the table border, and the table
    /// itself draws none
    fn collapse_borders(&mut self, table: LayoutBoxId, s: &TableStructure) {
        let outer = self.tree[table].borders;
        let slots = s.slots();
        let none = BorderSide::default();
        for (i, cell) in s.cells.iter().enumerate() {
            let right_col = cell.col + cell.span.colspan;
            let below_row = cell.row + cell.span.rowspan;
            let right = slots[cell.row].get(right_col).copied().flatten().filter(|j| *j != i);
            let below = slots.get(below_row).and_then(|row| row[cell.col]).filter(|j| *j != i);

            let mut borders = self.tree[cell.id].borders;
            match right {
                Some(j) => {
                    let neighbour = s.cells[j].id;
                    borders[1] = wider(borders[1], self.tree[neighbour].borders[3]);
                    self.tree[neighbour].borders[3] = none;
                }
                None => borders[1] = wider(borders[1], outer[1]),
            }
            match below {
                Some(j) => {
                    let neighbour = s.cells[j].id;
                    borders[2] = wider(borders[2], self.tree[neighbour].borders[0]);
                    self.tree[neighbour].borders[0] = none;
                }
                None => borders[2] = wider(borders[2], outer[2]),
            }
            if cell.col == 0 {
                borders[3] = wider(borders[3], outer[3]);
            }
            if cell.row == 0 {
                borders[0] = wider(borders[0], outer[0]);
            }
            self.tree[cell.id].borders = borders;
        }
        self.tree[table].borders = [none; 4];
    }

    /// Border-box widths of a cell
    fn cell_widths(&mut self, cell: LayoutBoxId) -> (f32, f32) {
        let (min, pref) = self.content_widths(cell);
        self.resolve_edges(cell, 0.0);
        let dims = self.tree[cell].dimensions;
        let extra = dims.padding.horizontal() + dims.border.horizontal();
        (min + extra, pref + extra)
    }

    fn column_widths(&mut self, s: &TableStructure, spacing: f32) -> Vec<ColumnWidths> {
        let mut cols = vec![ColumnWidths::default(); s.num_cols];

        for column in &s.columns {
            let style = self.style(column.id);
            if style.width.is_auto() {
                continue;
            }
            for col in cols.iter_mut().skip(column.start).take(column.span) {
                if style.width.is_percent() {
                    col.percent = Some(self.px(column.id, style.width, 100.0));
                } else {
                    col.fixed = Some(self.px(column.id, style.width, 0.0));
                }
            }
        }

        let mut spanning = Vec::new();
        for cell in &s.cells {
            if cell.span.colspan > 1 {
                spanning.push(*cell);
                continue;
            }
            let (min, pref) = self.cell_widths(cell.id);
            let style = self.style(cell.id);
            let col = &mut cols[cell.col];
            col.min = col.min.max(min);
            col.pref = col.pref.max(pref);
            if style.width.is_percent() {
                let percent = self.px(cell.id, style.width, 100.0);
                let col = &mut cols[cell.col];
                col.percent = Some(col.percent.map_or(percent, |p| p.max(percent)));
            } else if !style.width.is_auto() {
                let dims = self.tree[cell.id].dimensions;
                let fixed = self.specified_width(cell.id, 0.0).unwrap_or(0.0)
                    + dims.padding.horizontal()
                    + dims.border.horizontal();
                let col = &mut cols[cell.col];
                col.fixed = Some(col.fixed.map_or(fixed, |f| f.max(fixed)));
            }
        }

        spanning.sort_by_key(|c| c.span.colspan);
        for cell in spanning {
            let (min, pref) = self.cell_widths(cell.id);
            let range = cell.col..(cell.col + cell.span.colspan).min(s.num_cols);
            let n = range.len().max(1) as f32;
            let gaps = spacing * (range.len().saturating_sub(1)) as f32;
            let spanned_min: f32 = cols[range.clone()].iter().map(|c| c.min).sum::<f32>() + gaps;
            let spanned_pref: f32 = cols[range.clone()].iter().map(|c| c.pref).sum::<f32>() + gaps;
            for col in &mut cols[range] {
                if min > spanned_min {
                    col.min += (min - spanned_min) / n;
                }
                if pref > spanned_pref {
                    col.pref += (pref - spanned_pref) / n;
                }
            }
        }

        for col in &mut cols {
            col.pref = col.pref.max(col.min);
            if let Some(fixed) = col.fixed {
                col.pref = col.pref.max(fixed);
            }
        }
        cols
    }

    fn spacing(&self, table: LayoutBoxId) -> (f32, f32) {
        let style = &self.tree[table].style;
        match style.border_collapse {
            BorderCollapse::Collapse => (0.0, 0.0),
            BorderCollapse::Separate => style.border_spacing,
        }
    }

    /// Content-box `(min, max)` widths of a table
    pub(crate) fn table_widths(&mut self, table: LayoutBoxId) -> (f32, f32) {
        let s = self.table_structure(table);
        if self.tree[table].style.border_collapse == BorderCollapse::Collapse {
            self.collapse_borders(table, &s);
        }
        let (h, _) = self.spacing(table);
        let cols = self.column_widths(&s, h);
        let gaps = if s.num_cols == 0 { 0.0 } else { h * (s.num_cols + 1) as f32 };
        let min: f32 = cols.iter().map(|c| c.min).sum::<f32>() + gaps;
        let pref: f32 = cols.iter().map(|c| c.pref).sum::<f32>() + gaps;
        (min, pref)
    }

    /// Lay out a table and its captions with the margin box at the origin.
    /// Captions sit above the table box inside the returned size.
    pub(crate) fn layout_table(&mut self, table: LayoutBoxId, cb: &Containing, mode: WidthMode) -> Size {
        let s = self.table_structure(table);
        if self.tree[table].style.border_collapse == BorderCollapse::Collapse {
            self.collapse_borders(table, &s);
        }
        let auto = self.resolve_edges(table, cb.width);
        let (h_spacing, v_spacing) = self.spacing(table);
        let cols = self.column_widths(&s, h_spacing);
        let gaps = if s.num_cols == 0 { 0.0 } else { h_spacing * (s.num_cols + 1) as f32 };
        let min_width: f32 = cols.iter().map(|c| c.min).sum::<f32>() + gaps;

        let dims = self.tree[table].dimensions;
        let inner_extra = dims.padding.horizontal() + dims.border.horizontal();
        let avail = (cb.width - dims.horizontal_extra()).max(0.0);
        let width = match (self.specified_width(table, cb.width), mode) {
            (Some(w), _) => w.max(min_width),
            (None, WidthMode::BorderBox(w)) => (w - inner_extra).max(min_width),
            (None, _) => {
                let desired: f32 = cols.iter().map(|c| c.desired((avail - gaps).max(0.0))).sum::<f32>() + gaps;
                desired.min(avail).max(min_width)
            }
        };
        if !matches!(mode, WidthMode::BorderBox(_)) {
            self.apply_auto_margins(table, cb.width, width, auto);
        }
        let widths = distribute_columns(&cols, (width - gaps).max(0.0));

        // captions stack above the table box
        let margin = self.tree[table].dimensions.margin;
        let caption_width = width + inner_extra;
        let mut captions_height = 0.0;
        for caption in s.captions.iter().copied() {
            let local = Containing { x: 0.0, y: 0.0, width: caption_width, height: None };
            let size = self.layout_detached(caption, &local, WidthMode::Fill, None);
            self.tree.translate_subtree(caption, margin.left, margin.top + captions_height);
            captions_height += size.height;
        }

        let dims = &mut self.tree[table].dimensions;
        dims.content.width = width;
        dims.set_margin_origin(0.0, captions_height);
        let content = dims.content;

        let mut col_x = Vec::with_capacity(s.num_cols);
        let mut x = content.x + h_spacing;
        for w in &widths {
            col_x.push(x);
            x += w + h_spacing;
        }
        let span_width = |col: usize, span: usize| -> f32 {
            let end = (col + span).min(widths.len());
            widths[col..end].iter().sum::<f32>() + h_spacing * end.saturating_sub(col + 1) as f32
        };

        // cells at their column widths; rows as tall as their cells
        let mut heights = Vec::with_capacity(s.cells.len());
        for cell in &s.cells {
            let w = span_width(cell.col, cell.span.colspan);
            let local = Containing { x: 0.0, y: 0.0, width: w, height: None };
            let size = self.layout_detached(cell.id, &local, WidthMode::BorderBox(w), None);
            heights.push(size.height);
        }
        let mut row_heights = vec![0.0f32; s.rows.len()];
        for (r, row) in s.rows.iter().enumerate() {
            let none = Containing { x: 0.0, y: 0.0, width, height: None };
            if let Some(h) = self.specified_height(*row, &none) {
                row_heights[r] = h;
            }
        }
        for (cell, h) in s.cells.iter().zip(&heights) {
            if cell.span.rowspan == 1 {
                row_heights[cell.row] = row_heights[cell.row].max(*h);
            }
        }
        for (cell, h) in s.cells.iter().zip(&heights) {
            if cell.span.rowspan > 1 {
                let rows = cell.row..cell.row + cell.span.rowspan;
                let spanned = row_heights[rows.clone()].iter().sum::<f32>() + v_spacing * (cell.span.rowspan - 1) as f32;
                if *h > spanned {
                    row_heights[rows.end - 1] += h - spanned;
                }
            }
        }

        let rows_total = if s.rows.is_empty() {
            0.0
        } else {
            row_heights.iter().sum::<f32>() + v_spacing * (s.rows.len() + 1) as f32
        };
        let outer = Containing { x: 0.0, y: 0.0, width: cb.width, height: cb.height };
        let content_height = match self.specified_height(table, &outer) {
            Some(h) if h > rows_total && !row_heights.is_empty() => {
                let extra = (h - rows_total) / row_heights.len() as f32;
                row_heights.iter_mut().for_each(|r| *r += extra);
                h
            }
            Some(h) => h.max(rows_total),
            None => rows_total,
        };

        let mut row_y = Vec::with_capacity(s.rows.len());
        let mut y = content.y + v_spacing;
        for h in &row_heights {
            row_y.push(y);
            y += h + v_spacing;
        }

        for (cell, h) in s.cells.iter().zip(&heights) {
            let rows = cell.row..cell.row + cell.span.rowspan;
            let full = row_heights[rows].iter().sum::<f32>() + v_spacing * (cell.span.rowspan - 1) as f32;
            self.tree.translate_subtree(cell.id, col_x[cell.col], row_y[cell.row]);
            let extra = full - h;
            self.tree[cell.id].dimensions.content.height += extra;
            let shift = match self.tree[cell.id].style.vertical_align {
                VerticalAlign::Middle => extra / 2.0,
                VerticalAlign::Bottom => extra,
                _ => 0.0,
            };
            if shift > 0.0 {
                for child in self.tree.children(cell.id).to_vec() {
                    self.tree.translate_subtree(child, 0.0, shift);
                }
                let b = &mut self.tree[cell.id];
                b.first_baseline = b.first_baseline.map(|y| y + shift);
                b.last_baseline = b.last_baseline.map(|y| y + shift);
            }
        }

        let inner_width = (width - 2.0 * h_spacing).max(0.0);
        for (r, row) in s.rows.iter().enumerate() {
            self.tree[*row].dimensions.content = Rect::new(content.x + h_spacing, row_y[r], inner_width, row_heights[r]);
        }
        for (group, range) in &s.groups {
            let rect = match (range.start < range.end).then(|| (row_y[range.start], row_y[range.end - 1] + row_heights[range.end - 1])) {
                Some((top, bottom)) => Rect::new(content.x + h_spacing, top, inner_width, bottom - top),
                None => Rect::new(content.x + h_spacing, content.y, inner_width, 0.0),
            };
            self.tree[*group].dimensions.content = rect;
        }
        let grid_height = (rows_total - 2.0 * v_spacing).max(0.0);
        for column in &s.columns {
            let (x, w) = match col_x.get(column.start) {
                Some(x) => (*x, span_width(column.start, column.span)),
                None => (content.x, 0.0),
            };
            self.tree[column.id].dimensions.content = Rect::new(x, content.y + v_spacing, w, grid_height);
        }
        for (group, range) in &s.column_groups {
            let rect = s
                .columns
                .iter()
                .filter(|c| range.contains(&c.start))
                .map(|c| self.tree[c.id].dimensions.content)
                .reduce(|a, b| a.union(&b))
                .unwrap_or(Rect::new(content.x, content.y, 0.0, 0.0));
            self.tree[*group].dimensions.content = rect;
        }

        let baseline = s.cells.iter().filter(|c| c.row == 0).find_map(|c| self.tree[c.id].first_baseline);
        let b = &mut self.tree[table];
        b.dimensions.content.height = content_height;
        b.first_baseline = baseline;
        b.last_baseline = baseline;
        let border_box = b.dimensions.border_box();
        tracing::trace!(
            box_id = table.index(),
            cols = s.num_cols,
            rows = s.rows.len(),
            width = border_box.width,
            "table laid out"
        );
        Size::new(
            border_box.width + margin.horizontal(),
            captions_height + border_box.height + margin.vertical(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auto(min: f32, pref: f32) -> ColumnWidths {
        ColumnWidths { min, pref, fixed: None, percent: None }
    }

    #[test]
    fn test_columns_shrink_between_min_and_pref() {
        let widths = distribute_columns(&[auto(50.0, 100.0), auto(50.0, 300.0)], 200.0);
        assert!((widths[0] - 200.0 / 3.0).abs() < 0.01);
        assert!((widths[1] - 400.0 / 3.0).abs() < 0.01);
    }

    #[test]
    fn test_extra_space_goes_to_auto_columns() {
        let fixed = ColumnWidths { min: 10.0, pref: 10.0, fixed: Some(100.0), percent: None };
        let widths = distribute_columns(&[fixed, auto(20.0, 100.0), auto(20.0, 300.0)], 800.0);
        assert_eq!(widths, vec![100.0, 175.0, 525.0]);
    }

    #[test]
    fn test_never_below_minimum() {
        let widths = distribute_columns(&[auto(80.0, 90.0), auto(70.0, 200.0)], 100.0);
        assert_eq!(widths, vec![80.0, 70.0]);
    }

    #[test]
    fn test_percent_columns() {
        let half = ColumnWidths { min: 0.0, pref: 10.0, fixed: None, percent: Some(50.0) };
        let widths = distribute_columns(&[half, auto(0.0, 10.0)], 400.0);
        assert_eq!(widths, vec![200.0, 200.0]);
    }
}
