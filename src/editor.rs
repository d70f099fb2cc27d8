//! Pointer-driven line editing: click to add, drag to move.
//!
//! The editor is a two-state machine (`Idle` / `Dragging`). A click that
//! arrives within [`CLICK_SUPPRESS_MS`] of a drag ending is the drag's own
//! trailing click and does not add a line.

use crate::lines::{clamp_percent, Axis, LineModel};

pub const CLICK_SUPPRESS_MS: f64 = 250.0;

/// Distance in screen pixels within which a pointer grabs a line handle.
pub const HANDLE_TOLERANCE_PX: f64 = 6.0;

/// Screen-space box the image is displayed in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { left, top, width, height }
    }

    /// Pointer position as a line percent for `axis`, clamped to the box.
    pub fn percent_at(&self, axis: Axis, x: f64, y: f64) -> f64 {
        let (offset, extent) = match axis {
            Axis::Horizontal => (y - self.top, self.height),
            Axis::Vertical => (x - self.left, self.width),
        };
        if extent <= 0.0 {
            return 0.0;
        }
        clamp_percent(offset / extent * 100.0)
    }

    fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.left && x <= self.left + self.width && y >= self.top && y <= self.top + self.height
    }

    fn screen_offset(&self, axis: Axis, percent: f64) -> f64 {
        match axis {
            Axis::Horizontal => self.top + percent / 100.0 * self.height,
            Axis::Vertical => self.left + percent / 100.0 * self.width,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging { axis: Axis, index: usize },
}

#[derive(Clone, Debug)]
pub struct LineEditor {
    mode: Axis,
    state: DragState,
    suppress_until: f64,
}

impl Default for LineEditor {
    fn default() -> Self {
        Self {
            mode: Axis::Horizontal,
            state: DragState::Idle,
            suppress_until: f64::NEG_INFINITY,
        }
    }
}

impl LineEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Axis a click on empty canvas adds a line on.
    pub fn mode(&self) -> Axis {
        self.mode
    }

    pub fn set_mode(&mut self, axis: Axis) {
        self.mode = axis;
    }

    pub fn toggle_mode(&mut self) -> Axis {
        self.mode = self.mode.toggled();
        self.mode
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    /// Nearest line handle within [`HANDLE_TOLERANCE_PX`] of the pointer.
    pub fn hit_test(&self, lines: &LineModel, bounds: &Bounds, x: f64, y: f64) -> Option<(Axis, usize)> {
        if !bounds.contains(x, y) {
            return None;
        }
        [Axis::Horizontal, Axis::Vertical]
            .into_iter()
            .flat_map(|axis| {
                let pointer = match axis {
                    Axis::Horizontal => y,
                    Axis::Vertical => x,
                };
                lines.lines(axis).iter().enumerate().map(move |(index, &percent)| {
                    let distance = (bounds.screen_offset(axis, percent) - pointer).abs();
                    (axis, index, distance)
                })
            })
            .filter(|&(_, _, distance)| distance <= HANDLE_TOLERANCE_PX)
            .min_by(|a, b| a.2.total_cmp(&b.2))
            .map(|(axis, index, _)| (axis, index))
    }

    /// Idle -> Dragging when the pointer lands on a handle.
    pub fn pointer_down(&mut self, lines: &LineModel, bounds: &Bounds, x: f64, y: f64) -> bool {
        if self.state != DragState::Idle {
            return false;
        }
        match self.hit_test(lines, bounds, x, y) {
            Some((axis, index)) => {
                self.state = DragState::Dragging { axis, index };
                true
            }
            None => false,
        }
    }

    /// Move the grabbed line. Returns false when not dragging.
    pub fn pointer_move(&mut self, lines: &mut LineModel, bounds: &Bounds, x: f64, y: f64) -> bool {
        match self.state {
            DragState::Dragging { axis, index } => {
                lines.move_line(axis, index, bounds.percent_at(axis, x, y))
            }
            DragState::Idle => false,
        }
    }

    /// Dragging -> Idle, opening the click suppression window.
    pub fn pointer_up(&mut self, now_ms: f64) {
        if let DragState::Dragging { .. } = self.state {
            self.state = DragState::Idle;
            self.suppress_until = now_ms + CLICK_SUPPRESS_MS;
        }
    }

    /// Click on the canvas. Adds a line on the current mode's axis unless
    /// a drag is active or just ended. Returns the new line's index.
    pub fn click(
        &mut self,
        lines: &mut LineModel,
        bounds: &Bounds,
        x: f64,
        y: f64,
        now_ms: f64,
    ) -> Option<usize> {
        if self.state != DragState::Idle || now_ms < self.suppress_until {
            return None;
        }
        if !bounds.contains(x, y) {
            return None;
        }
        let axis = self.mode;
        Some(lines.add_line(axis, bounds.percent_at(axis, x, y)))
    }

    /// Back to Idle, e.g. when the image is replaced mid-drag.
    pub fn reset(&mut self) {
        self.state = DragState::Idle;
        self.suppress_until = f64::NEG_INFINITY;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> Bounds {
        Bounds::new(10.0, 20.0, 400.0, 200.0)
    }

    #[test]
    fn click_adds_on_current_axis() {
        let mut lines = LineModel::new();
        let mut editor = LineEditor::new();
        assert_eq!(editor.click(&mut lines, &bounds(), 110.0, 70.0, 0.0), Some(0));
        assert_eq!(lines.lines(Axis::Horizontal), &[25.0]);

        editor.toggle_mode();
        editor.click(&mut lines, &bounds(), 110.0, 70.0, 1.0);
        assert_eq!(lines.lines(Axis::Vertical), &[25.0]);
    }

    #[test]
    fn drag_moves_and_clamps() {
        let mut lines = LineModel::new();
        lines.add_line(Axis::Vertical, 50.0);
        let mut editor = LineEditor::new();

        assert!(editor.pointer_down(&lines, &bounds(), 212.0, 100.0));
        assert_eq!(editor.state(), DragState::Dragging { axis: Axis::Vertical, index: 0 });

        assert!(editor.pointer_move(&mut lines, &bounds(), 310.0, 100.0));
        assert_eq!(lines.lines(Axis::Vertical), &[75.0]);

        editor.pointer_move(&mut lines, &bounds(), 9000.0, 100.0);
        assert_eq!(lines.lines(Axis::Vertical), &[100.0]);
    }

    #[test]
    fn click_after_drag_is_suppressed() {
        let mut lines = LineModel::new();
        lines.add_line(Axis::Horizontal, 50.0);
        let mut editor = LineEditor::new();

        editor.pointer_down(&lines, &bounds(), 100.0, 120.0);
        editor.pointer_move(&mut lines, &bounds(), 100.0, 170.0);
        editor.pointer_up(1000.0);
        assert_eq!(editor.state(), DragState::Idle);

        assert_eq!(editor.click(&mut lines, &bounds(), 100.0, 170.0, 1010.0), None);
        assert_eq!(lines.len(), 1);

        let later = 1000.0 + CLICK_SUPPRESS_MS;
        assert!(editor.click(&mut lines, &bounds(), 100.0, 170.0, later).is_some());
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn pointer_down_off_handle_stays_idle() {
        let mut lines = LineModel::new();
        lines.add_line(Axis::Horizontal, 50.0);
        let mut editor = LineEditor::new();
        assert!(!editor.pointer_down(&lines, &bounds(), 100.0, 40.0));
        assert!(!editor.pointer_move(&mut lines, &bounds(), 100.0, 60.0));
        assert_eq!(lines.lines(Axis::Horizontal), &[50.0]);
    }

    #[test]
    fn hit_test_prefers_closest_handle() {
        let mut lines = LineModel::new();
        lines.add_line(Axis::Vertical, 50.0); // x = 210
        lines.add_line(Axis::Horizontal, 50.0); // y = 120
        let editor = LineEditor::new();
        assert_eq!(editor.hit_test(&lines, &bounds(), 214.0, 121.0), Some((Axis::Horizontal, 0)));
        assert_eq!(editor.hit_test(&lines, &bounds(), 211.0, 125.0), Some((Axis::Vertical, 0)));
        assert_eq!(editor.hit_test(&lines, &bounds(), 300.0, 60.0), None);
    }

    #[test]
    fn click_outside_bounds_is_ignored() {
        let mut lines = LineModel::new();
        let mut editor = LineEditor::new();
        assert_eq!(editor.click(&mut lines, &bounds(), 0.0, 0.0, 0.0), None);
        assert!(lines.is_empty());
    }
}
