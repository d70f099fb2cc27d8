// Property-based tests for slice geometry and canvas layout.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::BTreeSet;

use gridslice::render::canvas_layout;
use gridslice::{compute_cells, Axis, Cell, LineModel, RenderOptions, SCALE};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Any percent, including out-of-range values that must clamp.
fn arb_percent() -> impl Strategy<Value = f64> {
    prop_oneof![
        6 => 0.0..=100.0f64,
        1 => Just(0.0),
        1 => Just(100.0),
        1 => -50.0..150.0f64,
    ]
}

fn arb_lines() -> impl Strategy<Value = LineModel> {
    (
        prop::collection::vec(arb_percent(), 0..6),
        prop::collection::vec(arb_percent(), 0..6),
    )
        .prop_map(|(h, v)| build(&h, &v))
}

/// Lines at multiples of 12.5% on an image whose sides are multiples of 8,
/// so every cut lands exactly on an integer pixel.
fn arb_aligned() -> impl Strategy<Value = (Vec<u32>, Vec<u32>, u32, u32)> {
    (
        prop::collection::vec(0u32..=8, 0..6),
        prop::collection::vec(0u32..=8, 0..6),
        1u32..=50,
        1u32..=50,
    )
}

fn eighths(steps: &[u32]) -> Vec<f64> {
    steps.iter().map(|&k| k as f64 * 12.5).collect()
}

fn build(h: &[f64], v: &[f64]) -> LineModel {
    let mut lines = LineModel::new();
    for &p in h {
        lines.add_line(Axis::Horizontal, p);
    }
    for &p in v {
        lines.add_line(Axis::Vertical, p);
    }
    lines
}

fn distinct_cuts(steps: &[u32]) -> usize {
    steps.iter().copied().chain([0, 8]).collect::<BTreeSet<_>>().len()
}

fn overlaps(a: &Cell, b: &Cell) -> bool {
    a.src_x < b.src_x + b.src_w
        && b.src_x < a.src_x + a.src_w
        && a.src_y < b.src_y + b.src_h
        && b.src_y < a.src_y + a.src_h
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn cell_count_is_bounded(lines in arb_lines(), w in 1u32..2000, h in 1u32..2000) {
        let cells = compute_cells(&lines, w, h);
        let bound = (lines.lines(Axis::Horizontal).len() + 1) * (lines.lines(Axis::Vertical).len() + 1);
        prop_assert!(cells.len() <= bound);
        prop_assert!(cells.iter().all(|c| c.src_w >= 1.0 && c.src_h >= 1.0));
    }

    #[test]
    fn cell_count_is_exact_without_coincidences((hp, vp, kw, kh) in arb_aligned()) {
        let cells = compute_cells(&build(&eighths(&hp), &eighths(&vp)), kw * 8, kh * 8);

        let rows = distinct_cuts(&hp) - 1;
        let cols = distinct_cuts(&vp) - 1;
        prop_assert_eq!(cells.len(), rows * cols);
        let no_coincidence = rows == hp.len() + 1 && cols == vp.len() + 1;
        prop_assert_eq!(cells.len() == (hp.len() + 1) * (vp.len() + 1), no_coincidence);
    }

    #[test]
    fn cells_tile_the_image((hp, vp, kw, kh) in arb_aligned()) {
        let (w, ht) = (kw * 8, kh * 8);
        let cells = compute_cells(&build(&eighths(&hp), &eighths(&vp)), w, ht);

        let area: f64 = cells.iter().map(|c| c.src_w * c.src_h).sum();
        prop_assert_eq!(area, (w * ht) as f64);
        for (i, a) in cells.iter().enumerate() {
            prop_assert!(a.src_x >= 0.0 && a.src_x + a.src_w <= w as f64);
            prop_assert!(a.src_y >= 0.0 && a.src_y + a.src_h <= ht as f64);
            for b in &cells[i + 1..] {
                prop_assert!(!overlaps(a, b));
            }
        }
    }

    #[test]
    fn boundary_lines_add_no_cells(lines in arb_lines(), w in 1u32..2000, h in 1u32..2000, edge in prop_oneof![Just(0.0), Just(100.0)]) {
        let before = compute_cells(&lines, w, h).len();
        let mut edged = lines.clone();
        edged.add_line(Axis::Horizontal, edge);
        edged.add_line(Axis::Vertical, edge);
        prop_assert_eq!(compute_cells(&edged, w, h).len(), before);
    }

    #[test]
    fn geometry_is_deterministic(lines in arb_lines(), w in 1u32..2000, h in 1u32..2000) {
        prop_assert_eq!(compute_cells(&lines, w, h), compute_cells(&lines, w, h));
    }

    #[test]
    fn square_canvases_are_square(lines in arb_lines(), w in 1u32..2000, h in 1u32..2000) {
        let options = RenderOptions::default().with_force_square(true);
        for cell in compute_cells(&lines, w, h) {
            let layout = canvas_layout(&cell, &options);
            prop_assert_eq!(layout.canvas_width, layout.canvas_height);
            prop_assert_eq!(layout.canvas_width % SCALE, 0);
            prop_assert!(layout.offset_x + layout.content_width <= layout.canvas_width);
            prop_assert!(layout.offset_y + layout.content_height <= layout.canvas_height);
        }
    }
}
