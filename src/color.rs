/// Peak wattage assumed for the color scale when no reading matched a panel.
pub const DEFAULT_MAX_POWER: f64 = 400.0;
/// Lowest green used for any nonzero output, so a trickle is still visible.
pub const MIN_GREEN: f64 = 30.0;

/// Maps a power reading onto a black-to-green scale.
///
/// Zero (or a zero scale) is black; anything above zero starts at
/// [`MIN_GREEN`] and reaches full green at `max_power`.
pub fn color_for_power(power: f64, max_power: f64) -> [u8; 3] {
    if max_power <= 0.0 || power <= 0.0 || !power.is_finite() {
        return [0, 0, 0];
    }
    let ratio = (power / max_power).min(1.0);
    let green = (MIN_GREEN + (255.0 - MIN_GREEN) * ratio).floor();
    [0, green as u8, 0]
}

/// Label color that stays readable over a panel fill.
pub fn label_color(fill: [u8; 3]) -> [u8; 3] {
    if fill[1] > 150 {
        [0, 0, 0]
    } else {
        [230, 230, 230]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_power_is_black() {
        assert_eq!(color_for_power(0.0, 400.0), [0, 0, 0]);
        assert_eq!(color_for_power(0.0, 0.0), [0, 0, 0]);
        assert_eq!(color_for_power(250.0, 0.0), [0, 0, 0], "zero scale is black");
    }

    #[test]
    fn test_full_power_is_full_green() {
        assert_eq!(color_for_power(400.0, 400.0), [0, 255, 0]);
        assert_eq!(color_for_power(900.0, 400.0), [0, 255, 0], "ratio is capped at 1");
    }

    #[test]
    fn test_trickle_is_visible() {
        let [_, g, _] = color_for_power(0.001, 400.0);
        assert_eq!(g, 30);
    }

    #[test]
    fn test_green_is_monotonic() {
        let mut last = 0;
        for w in (1..=400).step_by(7) {
            let [r, g, b] = color_for_power(w as f64, 400.0);
            assert_eq!((r, b), (0, 0));
            assert!(g >= last, "green dropped at {} W", w);
            last = g;
        }
    }

    #[test]
    fn test_midpoint() {
        // 30 + 225 * 0.5 = 142.5
        assert_eq!(color_for_power(200.0, 400.0), [0, 142, 0]);
    }

    #[test]
    fn test_label_contrast() {
        assert_eq!(label_color([0, 255, 0]), [0, 0, 0]);
        assert_eq!(label_color([0, 0, 0]), [230, 230, 230]);
    }
}
