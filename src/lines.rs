//! User-placed cut lines, stored as percentages of the image extent.

use serde::{Deserialize, Serialize};

/// Orientation of a cut line. Horizontal lines split rows, vertical lines split columns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    pub fn toggled(self) -> Self {
        match self {
            Axis::Horizontal => Axis::Vertical,
            Axis::Vertical => Axis::Horizontal,
        }
    }
}

/// Clamp to [0, 100]; NaN collapses to 0.
pub fn clamp_percent(percent: f64) -> f64 {
    if percent.is_nan() {
        0.0
    } else {
        percent.clamp(0.0, 100.0)
    }
}

/// Editable set of cut lines per axis.
///
/// No deduplication or ordering is enforced here. Coincident lines are
/// legal and are resolved when cells are computed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LineModel {
    horizontal: Vec<f64>,
    vertical: Vec<f64>,
}

impl LineModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evenly spaced layout producing `rows` × `cols` cells.
    pub fn grid(rows: u32, cols: u32) -> Self {
        let spaced = |parts: u32| -> Vec<f64> {
            (1..parts.max(1))
                .map(|i| i as f64 * 100.0 / parts as f64)
                .collect()
        };
        Self {
            horizontal: spaced(rows),
            vertical: spaced(cols),
        }
    }

    /// Append a line and return its index within the axis list.
    pub fn add_line(&mut self, axis: Axis, percent: f64) -> usize {
        let list = self.list_mut(axis);
        list.push(clamp_percent(percent));
        list.len() - 1
    }

    /// Remove by index. A stale index is ignored.
    pub fn remove_line(&mut self, axis: Axis, index: usize) -> Option<f64> {
        let list = self.list_mut(axis);
        (index < list.len()).then(|| list.remove(index))
    }

    /// Reposition a line while dragging. Returns false for a stale index.
    pub fn move_line(&mut self, axis: Axis, index: usize, percent: f64) -> bool {
        match self.list_mut(axis).get_mut(index) {
            Some(slot) => {
                *slot = clamp_percent(percent);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.horizontal.clear();
        self.vertical.clear();
    }

    pub fn lines(&self, axis: Axis) -> &[f64] {
        match axis {
            Axis::Horizontal => &self.horizontal,
            Axis::Vertical => &self.vertical,
        }
    }

    pub fn len(&self) -> usize {
        self.horizontal.len() + self.vertical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.horizontal.is_empty() && self.vertical.is_empty()
    }

    fn list_mut(&mut self, axis: Axis) -> &mut Vec<f64> {
        match axis {
            Axis::Horizontal => &mut self.horizontal,
            Axis::Vertical => &mut self.vertical,
        }
    }
}
