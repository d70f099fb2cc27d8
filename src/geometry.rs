//! Grid geometry - resolves cut lines to pixel positions and enumerates cells.

use crate::lines::{Axis, LineModel};
use serde::Serialize;

/// Map a line percentage onto an axis of `dimension` pixels.
pub fn percent_to_pixel(percent: f64, dimension: u32) -> f64 {
    percent / 100.0 * dimension as f64
}

/// Sorted cut positions along one axis, always bounded by `0` and `dimension`.
#[derive(Clone, Debug, PartialEq)]
pub struct CutSet {
    positions: Vec<f64>,
}

impl CutSet {
    pub fn new(percents: &[f64], dimension: u32) -> Self {
        let mut positions: Vec<f64> = percents
            .iter()
            .map(|&p| percent_to_pixel(p, dimension))
            .chain([0.0, dimension as f64])
            .collect();
        positions.sort_by(f64::total_cmp);
        // Exact repeats only; near-repeats are left to the degeneracy filter
        positions.dedup();
        Self { positions }
    }

    pub fn positions(&self) -> &[f64] {
        &self.positions
    }

    /// Adjacent `(start, length)` pairs.
    pub fn spans(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.positions.windows(2).map(|w| (w[0], w[1] - w[0]))
    }
}

/// One rectangular source region. `row`/`col` index the cut pair it spans.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
    pub src_x: f64,
    pub src_y: f64,
    pub src_w: f64,
    pub src_h: f64,
}

/// Whole-pixel source rectangle for a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Cell {
    /// Snap to whole source pixels. Neighbouring cells share their rounded edges.
    pub fn pixel_rect(&self) -> PixelRect {
        let x0 = self.src_x.round() as u32;
        let y0 = self.src_y.round() as u32;
        let x1 = (self.src_x + self.src_w).round() as u32;
        let y1 = (self.src_y + self.src_h).round() as u32;
        PixelRect {
            x: x0,
            y: y0,
            width: x1.saturating_sub(x0).max(1),
            height: y1.saturating_sub(y0).max(1),
        }
    }

    /// Output filename, 1-based: `slice_{row}_{col}.png`.
    pub fn file_name(&self) -> String {
        format!("slice_{}_{}.png", self.row + 1, self.col + 1)
    }
}

/// Enumerate the non-degenerate cells of a `width` × `height` image, row-major.
///
/// Horizontal lines cut against the height, vertical lines against the width.
/// Cells narrower or shorter than one pixel are dropped.
pub fn compute_cells(lines: &LineModel, width: u32, height: u32) -> Vec<Cell> {
    let rows = CutSet::new(lines.lines(Axis::Horizontal), height);
    let cols = CutSet::new(lines.lines(Axis::Vertical), width);

    let mut cells = Vec::new();
    for (row, (src_y, src_h)) in rows.spans().enumerate() {
        if src_h < 1.0 {
            continue;
        }
        for (col, (src_x, src_w)) in cols.spans().enumerate() {
            if src_w < 1.0 {
                continue;
            }
            cells.push(Cell { row, col, src_x, src_y, src_w, src_h });
        }
    }

    tracing::debug!(
        rows = rows.positions().len() - 1,
        cols = cols.positions().len() - 1,
        cells = cells.len(),
        "computed slice grid for {}x{}",
        width,
        height
    );
    cells
}
