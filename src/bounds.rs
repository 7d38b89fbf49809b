//! Rotation-aware bounding boxes.
//!
//! Quarter turns are modeled by swapping width and height (see
//! [`Panel::effective_size`]) and are drawn without a rotation transform.
//! Any other angle is drawn as the nominal rectangle rotated about the center
//! of its effective square, so its footprint comes from the rotated-rectangle
//! formula applied to the nominal size. The two paths never stack.

use crate::model::{Panel, Rect};
use glam::Vec2;

/// Margin added around the panels when sizing the canvas.
pub const CANVAS_MARGIN: f32 = 50.0;
pub const MIN_CANVAS_SIZE: Vec2 = Vec2::new(400.0, 300.0);
/// Gap between the pointer and the tooltip.
pub const TOOLTIP_OFFSET: f32 = 12.0;

/// Width and height of the axis-aligned footprint actually covered by the panel.
pub fn bounding_size(panel: &Panel) -> Vec2 {
    if panel.is_right_angle() {
        return panel.effective_size();
    }
    let theta = (panel.rotation_degrees() as f32).to_radians();
    let (sin, cos) = (theta.sin().abs(), theta.cos().abs());
    let w = panel.nominal_size.x;
    let h = panel.nominal_size.y;
    Vec2::new(w * cos + h * sin, w * sin + h * cos)
}

/// Footprint centered on the panel's effective rectangle.
pub fn bounding_box(panel: &Panel) -> Rect {
    Rect::from_center_size(panel.rect().center(), bounding_size(panel))
}

/// Corners of the panel outline in layout units, for drawing. Right angles give
/// the effective rectangle; other angles give the rotated nominal rectangle.
pub fn outline(panel: &Panel) -> [Vec2; 4] {
    let rect = panel.rect();
    if panel.is_right_angle() {
        return [
            rect.min,
            Vec2::new(rect.max.x, rect.min.y),
            rect.max,
            Vec2::new(rect.min.x, rect.max.y),
        ];
    }

    let center = rect.center();
    let half = panel.nominal_size / 2.0;
    let rotation = Vec2::from_angle((panel.rotation_degrees() as f32).to_radians());
    [
        Vec2::new(-half.x, -half.y),
        Vec2::new(half.x, -half.y),
        Vec2::new(half.x, half.y),
        Vec2::new(-half.x, half.y),
    ]
    .map(|corner| center + rotation.rotate(corner))
}

/// Index of the topmost panel whose footprint contains `point`. Later panels
/// are drawn on top, so they win.
pub fn hit_test(panels: &[Panel], point: Vec2) -> Option<usize> {
    panels
        .iter()
        .enumerate()
        .rev()
        .find(|(_, p)| bounding_box(p).contains(point))
        .map(|(i, _)| i)
}

/// Size of the layout plane needed to show every panel.
pub fn canvas_extent(panels: &[Panel]) -> Vec2 {
    let far = panels
        .iter()
        .map(|p| bounding_box(p).max)
        .fold(Vec2::ZERO, Vec2::max);
    (far + Vec2::splat(CANVAS_MARGIN)).max(MIN_CANVAS_SIZE)
}

/// Top-left corner for a tooltip of `size` next to `pointer`, kept inside a
/// screen of `screen` size. The tooltip sits below-right of the pointer and
/// flips to the other side on any axis where it would overflow.
pub fn tooltip_position(pointer: Vec2, size: Vec2, screen: Vec2) -> Vec2 {
    let place = |p: f32, s: f32, limit: f32| -> f32 {
        let after = p + TOOLTIP_OFFSET;
        let pos = if after + s > limit { p - TOOLTIP_OFFSET - s } else { after };
        pos.min(limit - s).max(0.0)
    };
    Vec2::new(place(pointer.x, size.x, screen.x), place(pointer.y, size.y, screen.y))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-3;

    fn create_test_panel(x: f32, y: f32, rotation: i64) -> Panel {
        Panel::new("p", Vec2::new(x, y), Vec2::new(80.0, 120.0), rotation)
    }

    #[test]
    fn test_right_angles_use_effective_size() {
        for rot in [0, 90, 180, 270] {
            let p = create_test_panel(0.0, 0.0, rot);
            assert_eq!(bounding_size(&p), p.effective_size(), "rotation {}", rot);
        }
    }

    #[test]
    fn test_arbitrary_angle_formula() {
        let p = create_test_panel(0.0, 0.0, 30);
        let s = bounding_size(&p);
        let (sin, cos) = (0.5_f32, 3.0_f32.sqrt() / 2.0);
        assert!((s.x - (80.0 * cos + 120.0 * sin)).abs() < EPS);
        assert!((s.y - (80.0 * sin + 120.0 * cos)).abs() < EPS);
    }

    #[test]
    fn test_bounding_box_shares_center() {
        let p = create_test_panel(100.0, 100.0, 45);
        let bb = bounding_box(&p);
        assert!((bb.center() - p.rect().center()).length() < EPS);
    }

    #[test]
    fn test_outline_of_rotated_panel_fits_in_bounding_box() {
        let p = create_test_panel(200.0, 200.0, 20);
        let bb = bounding_box(&p);
        for corner in outline(&p) {
            assert!(corner.x >= bb.min.x - EPS && corner.x <= bb.max.x + EPS);
            assert!(corner.y >= bb.min.y - EPS && corner.y <= bb.max.y + EPS);
        }
    }

    #[test]
    fn test_outline_of_quarter_turn_is_effective_rect() {
        let p = create_test_panel(10.0, 20.0, 90);
        let corners = outline(&p);
        assert_eq!(corners[0], Vec2::new(10.0, 20.0));
        assert_eq!(corners[2], Vec2::new(130.0, 100.0));
    }

    #[test]
    fn test_hit_test_prefers_topmost() {
        let panels = vec![create_test_panel(0.0, 0.0, 0), create_test_panel(40.0, 0.0, 0)];
        assert_eq!(hit_test(&panels, Vec2::new(50.0, 10.0)), Some(1));
        assert_eq!(hit_test(&panels, Vec2::new(10.0, 10.0)), Some(0));
        assert_eq!(hit_test(&panels, Vec2::new(500.0, 500.0)), None);
    }

    #[test]
    fn test_canvas_extent() {
        let panels = vec![create_test_panel(500.0, 400.0, 90)];
        assert_eq!(canvas_extent(&panels), Vec2::new(670.0, 530.0));
        assert_eq!(canvas_extent(&[]), MIN_CANVAS_SIZE);
    }

    #[test]
    fn test_tooltip_below_right_when_room() {
        let pos = tooltip_position(Vec2::new(100.0, 100.0), Vec2::new(150.0, 60.0), Vec2::new(800.0, 600.0));
        assert_eq!(pos, Vec2::new(112.0, 112.0));
    }

    #[test]
    fn test_tooltip_flips_near_edges() {
        let screen = Vec2::new(800.0, 600.0);
        let pos = tooltip_position(Vec2::new(780.0, 590.0), Vec2::new(150.0, 60.0), screen);
        assert_eq!(pos, Vec2::new(618.0, 518.0));
    }

    #[test]
    fn test_tooltip_never_leaves_screen() {
        let pos = tooltip_position(Vec2::new(50.0, 20.0), Vec2::new(300.0, 200.0), Vec2::new(320.0, 210.0));
        assert!(pos.x >= 0.0 && pos.y >= 0.0);
        assert!(pos.x + 300.0 <= 320.0 + EPS);
    }
}
