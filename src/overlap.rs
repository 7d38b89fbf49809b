//! Overlap resolution between panel rectangles.
//!
//! A bounded relaxation: every pass visits each unordered pair in index order
//! and pushes overlapping rectangles apart along the axis that needs the
//! smaller move. The result is deterministic for a given input order but is
//! not an optimal packing.

use crate::model::{Panel, Rect};
use glam::Vec2;
use log::{debug, info, warn};

pub const MAX_PASSES: usize = 100;
/// Extra gap left between two rectangles after they are pushed apart.
pub const SEPARATION_PADDING: f32 = 10.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolveOutcome {
    pub passes: usize,
    pub displacements: usize,
    /// False when the pass cap was hit with overlaps still present.
    pub converged: bool,
}

pub fn rects_overlap(a: &Rect, b: &Rect) -> bool {
    !(a.right() <= b.left() || b.right() <= a.left() || a.bottom() <= b.top() || b.bottom() <= a.top())
}

pub fn panels_overlap(a: &Panel, b: &Panel) -> bool {
    rects_overlap(&a.rect(), &b.rect())
}

/// Penetration depth on each axis: the smaller of the two ways the rectangles
/// could be pulled apart.
pub fn overlap_depth(a: &Rect, b: &Rect) -> Vec2 {
    Vec2::new(
        (a.right() - b.left()).min(b.right() - a.left()),
        (a.bottom() - b.top()).min(b.bottom() - a.top()),
    )
}

/// Axis to separate along. Ties go to Y.
pub fn separation_axis(depth: Vec2) -> Axis {
    if depth.x < depth.y {
        Axis::X
    } else {
        Axis::Y
    }
}

/// Separates overlapping panels in place.
pub fn resolve_overlaps(panels: &mut [Panel]) -> ResolveOutcome {
    let mut displacements = 0;

    for pass in 1..=MAX_PASSES {
        let moved = resolve_pass(panels);
        displacements += moved;
        debug!("[RESOLVE] pass {}: {} displacements", pass, moved);

        if moved == 0 {
            if displacements > 0 {
                info!("[RESOLVE] separated {} overlaps in {} passes", displacements, pass);
            }
            return ResolveOutcome { passes: pass, displacements, converged: true };
        }
    }

    warn!(
        "[RESOLVE] gave up after {} passes, {} panels may still overlap",
        MAX_PASSES,
        panels.len()
    );
    ResolveOutcome { passes: MAX_PASSES, displacements, converged: false }
}

fn resolve_pass(panels: &mut [Panel]) -> usize {
    let mut moved = 0;

    for i in 0..panels.len() {
        for j in (i + 1)..panels.len() {
            if !panels_overlap(&panels[i], &panels[j]) {
                continue;
            }
            let a = panels[i].rect();
            let b = panels[j].rect();

            let depth = overlap_depth(&a, &b);
            let axis = separation_axis(depth);
            let (overlap, a_first) = match axis {
                Axis::X => (depth.x, a.left() <= b.left()),
                Axis::Y => (depth.y, a.top() <= b.top()),
            };
            let push = (overlap + SEPARATION_PADDING) / 2.0;
            let step = match axis {
                Axis::X => Vec2::new(push, 0.0),
                Axis::Y => Vec2::new(0.0, push),
            };
            let (a_step, b_step) = if a_first { (-step, step) } else { (step, -step) };

            let a_pos = panels[i].position + a_step;
            let b_pos = panels[j].position + b_step;
            panels[i].set_position(a_pos);
            panels[j].set_position(b_pos);
            moved += 1;
        }
    }

    moved
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_panel(id: &str, x: f32, y: f32, w: f32, h: f32) -> Panel {
        Panel::new(id, Vec2::new(x, y), Vec2::new(w, h), 0)
    }

    fn assert_no_overlaps(panels: &[Panel]) {
        for i in 0..panels.len() {
            for j in (i + 1)..panels.len() {
                assert!(
                    !panels_overlap(&panels[i], &panels[j]),
                    "{} at {:?} still overlaps {} at {:?}",
                    panels[i].id,
                    panels[i].position,
                    panels[j].id,
                    panels[j].position
                );
            }
        }
    }

    #[test]
    fn test_disjoint_and_touching_rects_do_not_overlap() {
        let a = create_test_panel("a", 0.0, 0.0, 80.0, 120.0);
        let far = create_test_panel("far", 500.0, 500.0, 80.0, 120.0);
        let touching = create_test_panel("touch", 80.0, 0.0, 80.0, 120.0);
        assert!(!panels_overlap(&a, &far));
        assert!(!panels_overlap(&a, &touching), "shared edge is not overlap");
    }

    #[test]
    fn test_one_unit_of_shared_area_overlaps() {
        let a = create_test_panel("a", 0.0, 0.0, 80.0, 120.0);
        let b = create_test_panel("b", 79.0, 119.0, 80.0, 120.0);
        assert!(panels_overlap(&a, &b));
        assert!(panels_overlap(&b, &a), "predicate is symmetric");
    }

    #[test]
    fn test_overlap_depth_and_axis() {
        let a = Rect::from_min_size(Vec2::ZERO, Vec2::new(100.0, 100.0));
        let b = Rect::from_min_size(Vec2::new(90.0, 50.0), Vec2::new(100.0, 100.0));
        let depth = overlap_depth(&a, &b);
        assert_eq!(depth, Vec2::new(10.0, 50.0));
        assert_eq!(separation_axis(depth), Axis::X);
        assert_eq!(separation_axis(Vec2::new(20.0, 20.0)), Axis::Y, "ties go to Y");
    }

    #[test]
    fn test_pair_pushed_apart_along_smaller_axis() {
        let mut panels = vec![
            create_test_panel("a", 100.0, 100.0, 80.0, 120.0),
            create_test_panel("b", 170.0, 110.0, 80.0, 120.0),
        ];
        let outcome = resolve_overlaps(&mut panels);

        assert!(outcome.converged);
        assert_eq!(outcome.displacements, 1);
        // x overlap is 10, so each moves (10 + 10) / 2 = 10 apart
        assert_eq!(panels[0].position, Vec2::new(90.0, 100.0));
        assert_eq!(panels[1].position, Vec2::new(180.0, 110.0));
        assert_no_overlaps(&panels);
    }

    #[test]
    fn test_order_is_preserved_when_second_is_first() {
        let mut panels = vec![
            create_test_panel("right", 170.0, 100.0, 80.0, 120.0),
            create_test_panel("left", 100.0, 100.0, 80.0, 120.0),
        ];
        resolve_overlaps(&mut panels);
        assert!(panels[1].position.x < panels[0].position.x, "left panel stays on the left");
        assert_no_overlaps(&panels);
    }

    #[test]
    fn test_clamped_at_origin_still_converges() {
        let mut panels = vec![
            create_test_panel("a", 0.0, 0.0, 80.0, 80.0),
            create_test_panel("b", 0.0, 0.0, 80.0, 80.0),
            create_test_panel("c", 5.0, 5.0, 80.0, 80.0),
        ];
        let outcome = resolve_overlaps(&mut panels);
        assert!(outcome.converged, "stacked panels separate within the pass cap");
        assert_no_overlaps(&panels);
        for p in &panels {
            assert!(p.position.x >= 0.0 && p.position.y >= 0.0);
        }
    }

    #[test]
    fn test_dense_cluster_converges() {
        let mut panels: Vec<Panel> = (0..6)
            .map(|i| {
                let x = 200.0 + (i % 3) as f32 * 40.0;
                let y = 200.0 + (i / 3) as f32 * 50.0;
                create_test_panel(&format!("p{}", i), x, y, 80.0, 120.0)
            })
            .collect();
        let outcome = resolve_overlaps(&mut panels);
        assert!(outcome.converged);
        assert_no_overlaps(&panels);
    }

    #[test]
    fn test_non_overlapping_input_is_untouched() {
        let mut panels = vec![
            create_test_panel("a", 0.0, 0.0, 80.0, 120.0),
            create_test_panel("b", 100.0, 0.0, 80.0, 120.0),
        ];
        let outcome = resolve_overlaps(&mut panels);
        assert_eq!(outcome, ResolveOutcome { passes: 1, displacements: 0, converged: true });
        assert_eq!(panels[1].position, Vec2::new(100.0, 0.0));
    }

    #[test]
    fn test_pass_cap_reports_non_convergence() {
        let mut panels: Vec<Panel> = (0..20)
            .map(|i| create_test_panel(&format!("p{}", i), 0.0, 0.0, 80.0, 120.0))
            .collect();
        let outcome = resolve_overlaps(&mut panels);
        assert!(!outcome.converged, "a 20-deep stack at the origin cannot be separated");
        assert_eq!(outcome.passes, MAX_PASSES);
        assert!(outcome.displacements > 0);
        for p in &panels {
            assert!(p.position.x >= 0.0 && p.position.y >= 0.0);
        }
    }

    #[test]
    fn test_empty_set() {
        let outcome = resolve_overlaps(&mut []);
        assert!(outcome.converged);
    }
}
